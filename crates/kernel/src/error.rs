//! Validation and schema error types.
//!
//! Capability parsers never fail: they record [`SpecError`]s into the
//! per-request [`ErrorReport`] and keep going. Problems with the schema
//! itself are construction-time failures and surface as [`SchemaError`].

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

use crate::schema::Capability;

/// Kind of validation failure recorded by a capability parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Field selection expression is syntactically broken.
    InvalidFieldSelection,
    /// Filter targets a field the resource does not declare as filterable.
    UnknownFieldReference,
    /// Operator token is unknown or not allowed for the field.
    InvalidFilterOperator,
    /// Filter value does not have the shape its operator requires.
    InvalidFilterValueShape,
    /// Limit or offset is negative, non-numeric, or out of bounds.
    InvalidPaginationValue,
    /// Sort field is not in the sortable allow-list.
    InvalidSortField,
    /// Sort direction is neither `asc` nor `desc`.
    InvalidSortDirection,
    /// Search target is not an allow-listed field or condition.
    InvalidSearchTarget,
}

/// A single structured validation error.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{capability} `{field}`: {message}")]
pub struct SpecError {
    /// Capability whose parser rejected the input.
    pub capability: Capability,
    /// Offending field, or the request parameter name when no field applies.
    pub field: String,
    /// Error classification.
    pub kind: ErrorKind,
    /// Human-readable detail.
    pub message: String,
}

/// Union of every validation error found while building one specification.
///
/// Errors keep the order they were recorded in. Serialized output is grouped
/// by capability, then by field, so reports are stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorReport {
    errors: Vec<SpecError>,
}

/// Serialized form of one entry inside a grouped report.
#[derive(Serialize)]
struct ReportEntry<'a> {
    kind: ErrorKind,
    message: &'a str,
}

impl ErrorReport {
    /// Create an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a validation error.
    pub fn record(
        &mut self,
        capability: Capability,
        field: impl Into<String>,
        kind: ErrorKind,
        message: impl Into<String>,
    ) {
        let error = SpecError {
            capability,
            field: field.into(),
            kind,
            message: message.into(),
        };
        tracing::debug!(
            capability = %error.capability,
            field = %error.field,
            kind = ?error.kind,
            "{}",
            error.message
        );
        self.errors.push(error);
    }

    /// Append every error from another report.
    pub fn merge(&mut self, other: ErrorReport) {
        self.errors.extend(other.errors);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Iterate over errors in the order they were recorded.
    pub fn iter(&self) -> impl Iterator<Item = &SpecError> {
        self.errors.iter()
    }

    /// Errors recorded by one capability.
    pub fn for_capability(&self, capability: Capability) -> impl Iterator<Item = &SpecError> {
        self.errors
            .iter()
            .filter(move |e| e.capability == capability)
    }

    /// Errors recorded against one field of one capability.
    pub fn for_field<'a>(
        &'a self,
        capability: Capability,
        field: &'a str,
    ) -> impl Iterator<Item = &'a SpecError> {
        self.for_capability(capability)
            .filter(move |e| e.field == field)
    }

    /// Whether any error of the given kind was recorded.
    pub fn has_kind(&self, kind: ErrorKind) -> bool {
        self.errors.iter().any(|e| e.kind == kind)
    }

    /// Errors grouped by capability, then by field.
    fn grouped(&self) -> BTreeMap<Capability, BTreeMap<&str, Vec<ReportEntry<'_>>>> {
        let mut grouped: BTreeMap<Capability, BTreeMap<&str, Vec<ReportEntry<'_>>>> =
            BTreeMap::new();
        for error in &self.errors {
            grouped
                .entry(error.capability)
                .or_default()
                .entry(error.field.as_str())
                .or_default()
                .push(ReportEntry {
                    kind: error.kind,
                    message: &error.message,
                });
        }
        grouped
    }
}

impl Serialize for ErrorReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.grouped().serialize(serializer)
    }
}

impl<'a> IntoIterator for &'a ErrorReport {
    type Item = &'a SpecError;
    type IntoIter = std::slice::Iter<'a, SpecError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

/// Errors raised while loading or building a resource schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("field `{0}` is declared more than once")]
    DuplicateField(String),

    #[error("invalid field name `{0}`")]
    InvalidFieldName(String),

    #[error("search target `{0}` does not resolve to any field")]
    EmptySearchTarget(String),

    #[error("default search target `{0}` is not a declared search target")]
    UnknownDefaultSearchTarget(String),

    #[error("default sort field `{0}` is not sortable")]
    UnsortableDefaultField(String),

    #[error("failed to read schema file {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported schema file format: {0}")]
    UnsupportedFormat(String),

    #[error("invalid YAML schema")]
    Yaml(#[from] serde_yml::Error),

    #[error("invalid JSON schema")]
    Json(#[from] serde_json::Error),

    #[error("invalid TOML schema")]
    Toml(#[from] toml::de::Error),
}

/// Errors raised while decoding request input.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("request parameters must be a JSON object")]
    NotAnObject,

    #[error("invalid JSON request body")]
    Json(#[from] serde_json::Error),
}
