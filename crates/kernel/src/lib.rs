//! Sieve Kernel Library
//!
//! Turns REST query parameters (field selection, filters, pagination, sort,
//! search) into a validated, backend-agnostic query specification, and
//! applies it to a backend through an adapter.
//! The command line entry point is the `sieve` binary.

pub mod adapter;
pub mod config;
pub mod error;
pub mod query;
pub mod schema;

pub use adapter::{BackendAdapter, SeaQueryAdapter};
pub use config::Config;
pub use error::{ErrorKind, ErrorReport, InputError, SchemaError, SpecError};
pub use query::{QuerySpecification, RequestInput, SpecificationAggregator};
pub use schema::{Capability, ComponentRegistry, ResourceSchema, SchemaDefinition};
