//! Query specification engine.
//!
//! This module provides:
//! - RequestInput: raw parameters from a query string or JSON body
//! - One parser per capability: FieldSelector, ResourceFilter,
//!   OffsetPaginator, ResourceSort, ResourceSearch
//! - SpecificationAggregator: runs the enabled parsers and merges results
//! - Types: QuerySpecification, FilterPredicate, SortSpec, etc.

mod aggregator;
mod field_selector;
mod filter;
mod input;
mod paginator;
mod search;
mod sort;
pub mod types;

pub use aggregator::SpecificationAggregator;
pub use field_selector::FieldSelector;
pub use filter::ResourceFilter;
pub use input::RequestInput;
pub use paginator::OffsetPaginator;
pub use search::ResourceSearch;
pub use sort::ResourceSort;
pub use types::{
    FieldKind, FieldNode, FieldSelection, FilterOperator, FilterPredicate, FilterValue,
    PaginationWindow, PredicateValue, QuerySpecification, SearchSpec, SortDirection, SortSpec,
    ValueShape, ValueType,
};

use crate::error::ErrorReport;
use crate::schema::Capability;

/// A parser for one query capability.
///
/// Parsers are pure functions of the request input and the schema they were
/// created with. They never fail: problems are recorded into `errors` and the
/// parser returns whatever part of the input was valid.
pub trait CapabilityParser {
    /// IR fragment this parser produces.
    type Output;

    /// Capability this parser implements.
    fn capability(&self) -> Capability;

    /// Parse the capability's parameters from the request.
    fn parse(&self, input: &RequestInput, errors: &mut ErrorReport) -> Self::Output;
}
