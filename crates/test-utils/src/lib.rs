//! Sieve test utilities.
//!
//! Helpers for integration testing: schema fixtures, a request builder,
//! a recording backend adapter, and assertion utilities for error reports.

use serde_json::{Map, Value};
use sieve_kernel::query::types::{FilterPredicate, PaginationWindow, SearchSpec, SortSpec};
use sieve_kernel::{BackendAdapter, RequestInput, ResourceSchema, SchemaDefinition};

/// Schema for a `people` resource exercising every capability.
///
/// - fields: id, name, email, age, status, address{city, zip}
/// - filters: age (integer), status (eq/ne/in/not_in), name (eq/contains),
///   address.city (any)
/// - pagination: max_limit 100
/// - sort: name, age
/// - search: name, email, `keyword` over both (default)
pub const PEOPLE_SCHEMA_YAML: &str = r#"
resource: people
fields:
  - id
  - name
  - email
  - age
  - status
  - name: address
    children: [city, zip]
filters:
  age:
    type: integer
  status:
    operators: [eq, ne, in, not_in]
  name:
    operators: [eq, contains]
  address.city: {}
pagination:
  max_limit: 100
sort:
  fields: [name, age]
search:
  fields: [name, email]
  targets:
    keyword: [name, email]
  default_target: keyword
"#;

/// The [`PEOPLE_SCHEMA_YAML`] schema, built.
pub fn people_schema() -> ResourceSchema {
    build(SchemaDefinition::from_yaml_str(PEOPLE_SCHEMA_YAML).and_then(SchemaDefinition::build))
}

/// Minimal schema: atomic `id, name, age`, `age` filterable, `name`
/// sortable, pagination without a bound.
pub fn minimal_schema() -> ResourceSchema {
    build(
        SchemaDefinition::new("people")
            .with_field("id")
            .with_field("name")
            .with_field("age")
            .with_filter("age", sieve_kernel::schema::FilterDeclaration::any())
            .with_pagination(None)
            .with_sort(&["name"])
            .build(),
    )
}

fn build(result: Result<ResourceSchema, sieve_kernel::SchemaError>) -> ResourceSchema {
    match result {
        Ok(schema) => schema,
        Err(e) => panic!("test schema is invalid: {e}"),
    }
}

/// Builder for request parameters in the JSON form.
#[derive(Debug, Clone, Default)]
pub struct RequestBuilder {
    params: Map<String, Value>,
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the field selection expression.
    pub fn select(self, expression: &str) -> Self {
        self.param("select", expression)
    }

    /// Add a tagged filter (`{op, value}`) for a field.
    pub fn filter(mut self, field: &str, operator: &str, value: Value) -> Self {
        let filters = self
            .params
            .entry("filter")
            .or_insert_with(|| Value::Object(Map::new()));
        if let Some(filters) = filters.as_object_mut() {
            filters.insert(
                field.to_string(),
                serde_json::json!({"op": operator, "value": value}),
            );
        }
        self
    }

    pub fn limit(self, limit: impl Into<Value>) -> Self {
        self.param("limit", limit)
    }

    pub fn offset(self, offset: impl Into<Value>) -> Self {
        self.param("offset", offset)
    }

    /// Set the sort in the object form.
    pub fn sort(self, field: &str, direction: &str) -> Self {
        self.param("sort", serde_json::json!({"field": field, "dir": direction}))
    }

    /// Set a search in the object form.
    pub fn search(self, target: &str, value: &str) -> Self {
        self.param("search", serde_json::json!({"target": target, "value": value}))
    }

    /// Set an arbitrary parameter.
    pub fn param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    pub fn build(self) -> RequestInput {
        RequestInput::from(self.params)
    }
}

/// One call received by a [`RecordingAdapter`].
#[derive(Debug, Clone, PartialEq)]
pub enum AdapterCall {
    Select(Vec<String>),
    Filter(FilterPredicate),
    Paginate(PaginationWindow),
    Sort(SortSpec),
    Search(SearchSpec),
}

/// Backend adapter that records what it is asked to apply.
#[derive(Debug, Default)]
pub struct RecordingAdapter {
    pub calls: Vec<AdapterCall>,
}

impl RecordingAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BackendAdapter for RecordingAdapter {
    fn apply_field_selection(&mut self, fields: &[String]) {
        self.calls.push(AdapterCall::Select(fields.to_vec()));
    }

    fn apply_filter(&mut self, predicate: &FilterPredicate) {
        self.calls.push(AdapterCall::Filter(predicate.clone()));
    }

    fn apply_pagination(&mut self, window: &PaginationWindow) {
        self.calls.push(AdapterCall::Paginate(*window));
    }

    fn apply_sort(&mut self, sort: &SortSpec) {
        self.calls.push(AdapterCall::Sort(sort.clone()));
    }

    fn apply_search(&mut self, search: &SearchSpec) {
        self.calls.push(AdapterCall::Search(search.clone()));
    }
}

/// Assertion helpers for error reports and rendered SQL.
pub mod assert {
    use sieve_kernel::{Capability, ErrorKind, ErrorReport};

    /// Assert that exactly one error was recorded for a capability and
    /// field, and that it has the given kind.
    pub fn single_error(
        report: &ErrorReport,
        capability: Capability,
        field: &str,
        kind: ErrorKind,
    ) {
        let matching: Vec<_> = report.for_field(capability, field).collect();
        assert_eq!(
            matching.len(),
            1,
            "Expected one {capability} error for '{field}', got: {matching:?}"
        );
        assert_eq!(
            matching[0].kind, kind,
            "Expected {kind:?} for '{field}', got: {:?}",
            matching[0]
        );
    }

    /// Assert that a report is empty.
    pub fn no_errors(report: &ErrorReport) {
        assert!(report.is_empty(), "Expected no errors, got: {report:?}");
    }

    /// Assert that a string contains a substring.
    pub fn contains(haystack: &str, needle: &str) {
        assert!(
            haystack.contains(needle),
            "Expected string to contain '{needle}'\nActual: {haystack}"
        );
    }

    /// Assert that a string does not contain a substring.
    pub fn not_contains(haystack: &str, needle: &str) {
        assert!(
            !haystack.contains(needle),
            "Expected string to NOT contain '{needle}'\nActual: {haystack}"
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use sieve_kernel::Capability;

    #[test]
    fn people_schema_enables_everything() {
        let schema = people_schema();
        for capability in Capability::ALL {
            assert!(schema.registry().is_enabled(capability), "{capability}");
        }
        assert_eq!(schema.max_limit(), Some(100));
    }

    #[test]
    fn request_builder() {
        let input = RequestBuilder::new()
            .select("id")
            .filter("age", "gte", 18.into())
            .filter("status", "in", serde_json::json!(["a"]))
            .limit(5)
            .sort("name", "desc")
            .build();

        assert_eq!(input.get("select"), Some(&Value::from("id")));
        assert_eq!(
            input.get("filter").and_then(Value::as_object).map(Map::len),
            Some(2)
        );
        assert_eq!(input.get("limit"), Some(&Value::from(5)));
        assert!(input.contains("sort"));
    }

    #[test]
    fn assertions() {
        assert::contains("hello world", "world");
        assert::not_contains("hello world", "foo");
        assert::no_errors(&sieve_kernel::ErrorReport::new());
    }
}
