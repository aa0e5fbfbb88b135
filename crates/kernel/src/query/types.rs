//! Query specification types.
//!
//! The backend-agnostic intermediate representation produced from request
//! parameters:
//! - FieldSelection: tree of selected atomic and nested fields
//! - FilterPredicate: field, closed-set operator, shaped value
//! - PaginationWindow / SortSpec / SearchSpec
//! - QuerySpecification: everything above plus the error report

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ErrorReport;

/// Root namespace token for field paths.
pub const ROOT_NAMESPACE: &str = "$";

/// Separator between namespace segments.
pub const NAMESPACE_SEPARATOR: char = '.';

/// Join a namespace and a field name into a full path (`$.address.city`).
pub fn join_path(namespace: &str, name: &str) -> String {
    format!("{namespace}{NAMESPACE_SEPARATOR}{name}")
}

// ---------------------------------------------------------------------------
// Field selection
// ---------------------------------------------------------------------------

/// Whether a field is directly selectable or only groups other fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Atomic,
    Nested,
}

/// A selected field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldNode {
    pub name: String,
    pub kind: FieldKind,
    /// Selected children; always empty for atomic fields.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FieldNode>,
}

impl FieldNode {
    pub fn is_atomic(&self) -> bool {
        self.kind == FieldKind::Atomic
    }
}

/// Selected fields under the implicit root namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldSelection {
    fields: Vec<FieldNode>,
}

impl FieldSelection {
    /// Selected fields directly under `namespace` (`$`, `$.address`, ...).
    ///
    /// Unknown namespaces yield nothing. The iterator borrows the selection,
    /// so it can be requested again for the same or another namespace.
    pub fn fields<'a>(
        &'a self,
        namespace: &str,
    ) -> impl Iterator<Item = &'a FieldNode> + use<'a> {
        self.children_of(namespace).into_iter().flatten()
    }

    /// Look up a selected node by full path.
    pub fn node(&self, path: &str) -> Option<&FieldNode> {
        let mut segments = path_segments(path)?;
        let first = segments.next()?;
        let mut node = self.fields.iter().find(|n| n.name == first)?;
        for segment in segments {
            node = node.children.iter().find(|n| n.name == segment)?;
        }
        Some(node)
    }

    /// Names of the atomic fields selected at the root, in selection order.
    ///
    /// Nested fields are structural and never become columns.
    pub fn atomic_fields(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|node| node.is_atomic())
            .map(|node| node.name.clone())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Insert a path, merging with already selected prefixes.
    pub(crate) fn insert(&mut self, path: &[(String, FieldKind)]) {
        let mut level = &mut self.fields;
        for (name, kind) in path {
            let index = match level.iter().position(|node| node.name == *name) {
                Some(index) => index,
                None => {
                    level.push(FieldNode {
                        name: name.clone(),
                        kind: *kind,
                        children: Vec::new(),
                    });
                    level.len() - 1
                }
            };
            level = &mut level[index].children;
        }
    }

    fn children_of(&self, namespace: &str) -> Option<std::slice::Iter<'_, FieldNode>> {
        if namespace == ROOT_NAMESPACE {
            return Some(self.fields.iter());
        }
        self.node(namespace).map(|node| node.children.iter())
    }
}

/// Segments of a `$.a.b` path, without the root token.
fn path_segments(path: &str) -> Option<std::str::Split<'_, char>> {
    let rest = path
        .strip_prefix(ROOT_NAMESPACE)?
        .strip_prefix(NAMESPACE_SEPARATOR)?;
    Some(rest.split(NAMESPACE_SEPARATOR))
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

/// Comparison operators for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    /// Equality (a list value matches any element).
    #[serde(alias = "=")]
    Eq,
    /// Inequality.
    #[serde(alias = "!=")]
    Ne,
    /// Greater than.
    #[serde(alias = ">")]
    Gt,
    /// Greater than or equal.
    #[serde(alias = ">=")]
    Gte,
    /// Less than.
    #[serde(alias = "<")]
    Lt,
    /// Less than or equal.
    #[serde(alias = "<=")]
    Lte,
    /// Value in list.
    In,
    /// Value not in list.
    NotIn,
    /// Inclusive range, bounds in the order given.
    Between,
    /// Outside an inclusive range.
    NotBetween,
    /// Substring match (LIKE %value%).
    Contains,
}

/// Value shape an operator requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueShape {
    /// Scalar or list, passed through as given.
    Any,
    /// Non-empty list.
    List,
    /// Exactly two elements.
    Pair,
    /// Scalar string.
    Text,
}

impl FilterOperator {
    pub const ALL: [FilterOperator; 11] = [
        FilterOperator::Eq,
        FilterOperator::Ne,
        FilterOperator::Gt,
        FilterOperator::Gte,
        FilterOperator::Lt,
        FilterOperator::Lte,
        FilterOperator::In,
        FilterOperator::NotIn,
        FilterOperator::Between,
        FilterOperator::NotBetween,
        FilterOperator::Contains,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FilterOperator::Eq => "eq",
            FilterOperator::Ne => "ne",
            FilterOperator::Gt => "gt",
            FilterOperator::Gte => "gte",
            FilterOperator::Lt => "lt",
            FilterOperator::Lte => "lte",
            FilterOperator::In => "in",
            FilterOperator::NotIn => "not_in",
            FilterOperator::Between => "between",
            FilterOperator::NotBetween => "not_between",
            FilterOperator::Contains => "contains",
        }
    }

    /// Value shape this operator accepts.
    pub fn shape(self) -> ValueShape {
        match self {
            FilterOperator::In | FilterOperator::NotIn => ValueShape::List,
            FilterOperator::Between | FilterOperator::NotBetween => ValueShape::Pair,
            FilterOperator::Contains => ValueShape::Text,
            _ => ValueShape::Any,
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned for operator tokens outside the closed set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown filter operator `{0}`")]
pub struct UnknownOperator(pub String);

impl FromStr for FilterOperator {
    type Err = UnknownOperator;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let operator = match token.trim().to_ascii_lowercase().as_str() {
            "eq" | "=" | "==" => FilterOperator::Eq,
            "ne" | "!=" | "<>" => FilterOperator::Ne,
            "gt" | ">" => FilterOperator::Gt,
            "gte" | ">=" => FilterOperator::Gte,
            "lt" | "<" => FilterOperator::Lt,
            "lte" | "<=" => FilterOperator::Lte,
            "in" => FilterOperator::In,
            "not_in" => FilterOperator::NotIn,
            "between" => FilterOperator::Between,
            "not_between" => FilterOperator::NotBetween,
            "contains" => FilterOperator::Contains,
            _ => return Err(UnknownOperator(token.to_string())),
        };
        Ok(operator)
    }
}

/// Declared type of a filterable field, used to coerce textual input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Integer,
    Float,
    Boolean,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValueType::String => "string",
            ValueType::Integer => "integer",
            ValueType::Float => "float",
            ValueType::Boolean => "boolean",
        })
    }
}

/// Scalar filter value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FilterValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl FilterValue {
    /// Convert a JSON scalar. Null, arrays, and objects are not scalars.
    /// Neither are integers outside the `i64` range, which a float could
    /// not hold exactly.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Bool(b) => Some(FilterValue::Boolean(*b)),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Some(FilterValue::Integer(i)),
                None if n.is_f64() => n.as_f64().map(FilterValue::Float),
                None => None,
            },
            serde_json::Value::String(s) => Some(FilterValue::String(s.clone())),
            _ => None,
        }
    }

    /// Coerce into the declared type. Returns `None` when the value cannot
    /// be read as that type.
    pub fn coerce(self, value_type: ValueType) -> Option<Self> {
        match (value_type, self) {
            (ValueType::String, FilterValue::String(s)) => Some(FilterValue::String(s)),
            (ValueType::String, other) => Some(FilterValue::String(other.to_string())),
            (ValueType::Integer, FilterValue::Integer(i)) => Some(FilterValue::Integer(i)),
            (ValueType::Integer, FilterValue::String(s)) => {
                s.trim().parse().ok().map(FilterValue::Integer)
            }
            (ValueType::Float, FilterValue::Float(f)) => Some(FilterValue::Float(f)),
            (ValueType::Float, FilterValue::Integer(i)) => Some(FilterValue::Float(i as f64)),
            (ValueType::Float, FilterValue::String(s)) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(FilterValue::Float),
            (ValueType::Boolean, FilterValue::Boolean(b)) => Some(FilterValue::Boolean(b)),
            (ValueType::Boolean, FilterValue::String(s)) => {
                match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "1" => Some(FilterValue::Boolean(true)),
                    "false" | "0" => Some(FilterValue::Boolean(false)),
                    _ => None,
                }
            }
            (ValueType::Boolean, FilterValue::Integer(i)) if i == 0 || i == 1 => {
                Some(FilterValue::Boolean(i == 1))
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FilterValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Boolean(b) => write!(f, "{b}"),
            FilterValue::Integer(i) => write!(f, "{i}"),
            FilterValue::Float(v) => write!(f, "{v}"),
            FilterValue::String(s) => f.write_str(s),
        }
    }
}

/// Validated predicate value, shaped for its operator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PredicateValue {
    Scalar(FilterValue),
    List(Vec<FilterValue>),
    /// Two bounds, kept in the order the client gave them.
    Range(FilterValue, FilterValue),
}

/// One filter condition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterPredicate {
    /// Target field (dot path).
    pub field: String,
    pub operator: FilterOperator,
    pub value: PredicateValue,
}

// ---------------------------------------------------------------------------
// Pagination, sorting, search
// ---------------------------------------------------------------------------

/// Limit/offset window. `None` means the client did not set the value;
/// `Some(0)` is a real, meaningful value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PaginationWindow {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl PaginationWindow {
    pub fn is_unset(&self) -> bool {
        self.limit.is_none() && self.offset.is_none()
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            _ => Err(format!("unknown sort direction `{token}`")),
        }
    }
}

/// Sort specification. A missing field means no ordering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SortSpec {
    pub field: Option<String>,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: Some(field.into()),
            direction,
        }
    }

    /// Sort field, if one is set and non-empty.
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref().filter(|f| !f.is_empty())
    }

    pub fn is_noop(&self) -> bool {
        self.field().is_none()
    }
}

/// Free-text search over one target condition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchSpec {
    /// Target name as requested (a field or a named composite condition).
    pub target: String,
    /// Fields the target resolves to.
    pub fields: Vec<String>,
    pub value: String,
}

impl SearchSpec {
    pub fn is_noop(&self) -> bool {
        self.target.is_empty() || self.fields.is_empty() || self.value.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Specification
// ---------------------------------------------------------------------------

/// Query specification built for one request.
///
/// Each part is `None` when its capability is not enabled for the resource.
/// The specification is read-only once built; adapters consume it by value
/// through [`QuerySpecification::apply_to`](crate::adapter).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QuerySpecification {
    pub(crate) fields: Option<FieldSelection>,
    pub(crate) filters: Vec<FilterPredicate>,
    pub(crate) pagination: Option<PaginationWindow>,
    pub(crate) sort: Option<SortSpec>,
    pub(crate) search: Option<SearchSpec>,
    pub(crate) errors: ErrorReport,
}

impl QuerySpecification {
    pub fn fields(&self) -> Option<&FieldSelection> {
        self.fields.as_ref()
    }

    /// Filter predicates in declaration order.
    pub fn filters(&self) -> &[FilterPredicate] {
        &self.filters
    }

    pub fn pagination(&self) -> Option<&PaginationWindow> {
        self.pagination.as_ref()
    }

    pub fn sort(&self) -> Option<&SortSpec> {
        self.sort.as_ref()
    }

    pub fn search(&self) -> Option<&SearchSpec> {
        self.search.as_ref()
    }

    pub fn errors(&self) -> &ErrorReport {
        &self.errors
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}
