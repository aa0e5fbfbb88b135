//! Resource schema declarations.
//!
//! A [`SchemaDefinition`] is the serde form of a resource API: which fields
//! exist (with nesting), what may be filtered, sorted and searched, and the
//! pagination bounds. Each optional section enables one capability.
//!
//! ```yaml
//! resource: people
//! table: people
//! fields:
//!   - id
//!   - name
//!   - name: address
//!     children: [city, zip]
//! filters:
//!   age: { operators: [eq, between], type: integer }
//!   status: {}
//! pagination:
//!   max_limit: 100
//! sort:
//!   fields: [name, age]
//!   default: { field: name, direction: asc }
//! search:
//!   fields: [name]
//!   targets:
//!     keyword: [name, email]
//!   default_target: keyword
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::ResourceSchema;
use crate::error::SchemaError;
use crate::query::types::{FilterOperator, SortDirection, ValueType};

/// Declarative definition of one resource API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaDefinition {
    /// Resource name, used in logs.
    pub resource: String,

    /// Backing table for SQL adapters (defaults to the resource name).
    #[serde(default)]
    pub table: Option<String>,

    /// Request parameter names.
    #[serde(default)]
    pub params: ParamNames,

    /// Selectable fields. Enables field selection.
    #[serde(default)]
    pub fields: Option<Vec<FieldDeclaration>>,

    /// Filterable fields by dot path. Enables filtering.
    #[serde(default)]
    pub filters: Option<BTreeMap<String, FilterDeclaration>>,

    /// Enables offset pagination.
    #[serde(default)]
    pub pagination: Option<PaginationDeclaration>,

    /// Enables sorting.
    #[serde(default)]
    pub sort: Option<SortDeclaration>,

    /// Enables search.
    #[serde(default)]
    pub search: Option<SearchDeclaration>,
}

/// Names of the request parameters each capability reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamNames {
    #[serde(default = "default_select")]
    pub select: String,
    #[serde(default = "default_filter")]
    pub filter: String,
    #[serde(default = "default_limit")]
    pub limit: String,
    #[serde(default = "default_offset")]
    pub offset: String,
    #[serde(default = "default_sort")]
    pub sort: String,
    #[serde(default = "default_search")]
    pub search: String,
}

fn default_select() -> String {
    "select".to_string()
}
fn default_filter() -> String {
    "filter".to_string()
}
fn default_limit() -> String {
    "limit".to_string()
}
fn default_offset() -> String {
    "offset".to_string()
}
fn default_sort() -> String {
    "sort".to_string()
}
fn default_search() -> String {
    "search".to_string()
}

impl Default for ParamNames {
    fn default() -> Self {
        Self {
            select: default_select(),
            filter: default_filter(),
            limit: default_limit(),
            offset: default_offset(),
            sort: default_sort(),
            search: default_search(),
        }
    }
}

/// A declared field: a bare name is atomic, a name with children is nested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldDeclaration {
    Atomic(String),
    Nested {
        name: String,
        children: Vec<FieldDeclaration>,
    },
}

impl FieldDeclaration {
    pub fn atomic(name: impl Into<String>) -> Self {
        FieldDeclaration::Atomic(name.into())
    }

    pub fn nested(name: impl Into<String>, children: Vec<FieldDeclaration>) -> Self {
        FieldDeclaration::Nested {
            name: name.into(),
            children,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            FieldDeclaration::Atomic(name) | FieldDeclaration::Nested { name, .. } => name,
        }
    }
}

/// Filter rules for one field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterDeclaration {
    /// Allowed operators; empty allows every operator.
    #[serde(default)]
    pub operators: Vec<FilterOperator>,

    /// Declared value type; textual input is coerced to it.
    #[serde(default, rename = "type")]
    pub value_type: Option<ValueType>,
}

impl FilterDeclaration {
    /// Any operator, untyped values.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn with_operators(operators: &[FilterOperator]) -> Self {
        Self {
            operators: operators.to_vec(),
            value_type: None,
        }
    }

    pub fn typed(mut self, value_type: ValueType) -> Self {
        self.value_type = Some(value_type);
        self
    }
}

/// Offset pagination bounds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationDeclaration {
    /// Largest accepted limit. Larger requests are rejected, never clamped.
    #[serde(default)]
    pub max_limit: Option<u64>,
}

/// Sortable fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortDeclaration {
    #[serde(default)]
    pub fields: Vec<String>,

    /// Applied when the request carries no sort.
    #[serde(default)]
    pub default: Option<DefaultSort>,
}

/// Default ordering for a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultSort {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

/// Search targets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchDeclaration {
    /// Fields searchable on their own; each is a target named after itself.
    #[serde(default)]
    pub fields: Vec<String>,

    /// Named composite conditions matching any of their fields.
    #[serde(default)]
    pub targets: BTreeMap<String, Vec<String>>,

    /// Target used when the request gives only a search value.
    #[serde(default)]
    pub default_target: Option<String>,
}

impl SchemaDefinition {
    /// Start a definition with no capabilities enabled.
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            ..Default::default()
        }
    }

    /// Load a definition from a YAML, JSON or TOML file (chosen by extension).
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "yaml" | "yml" => Self::from_yaml_str(&content),
            "json" => Self::from_json_str(&content),
            "toml" => Self::from_toml_str(&content),
            other => Err(SchemaError::UnsupportedFormat(other.to_string())),
        }
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, SchemaError> {
        Ok(serde_yml::from_str(content)?)
    }

    pub fn from_json_str(content: &str) -> Result<Self, SchemaError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, SchemaError> {
        Ok(toml::from_str(content)?)
    }

    /// Set the backing table.
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Override request parameter names.
    pub fn with_params(mut self, params: ParamNames) -> Self {
        self.params = params;
        self
    }

    /// Declare an atomic field (enables field selection).
    pub fn with_field(self, name: impl Into<String>) -> Self {
        self.with_field_declaration(FieldDeclaration::atomic(name))
    }

    /// Declare a nested field with atomic children (enables field selection).
    pub fn with_nested(self, name: impl Into<String>, children: &[&str]) -> Self {
        let children = children
            .iter()
            .map(|child| FieldDeclaration::atomic(*child))
            .collect();
        self.with_field_declaration(FieldDeclaration::nested(name, children))
    }

    pub fn with_field_declaration(mut self, declaration: FieldDeclaration) -> Self {
        self.fields.get_or_insert_with(Vec::new).push(declaration);
        self
    }

    /// Declare a filterable field (enables filtering).
    pub fn with_filter(mut self, field: impl Into<String>, rules: FilterDeclaration) -> Self {
        self.filters
            .get_or_insert_with(BTreeMap::new)
            .insert(field.into(), rules);
        self
    }

    /// Enable offset pagination.
    pub fn with_pagination(mut self, max_limit: Option<u64>) -> Self {
        self.pagination = Some(PaginationDeclaration { max_limit });
        self
    }

    /// Declare sortable fields (enables sorting).
    pub fn with_sort(mut self, fields: &[&str]) -> Self {
        let sort = self.sort.get_or_insert_with(SortDeclaration::default);
        sort.fields
            .extend(fields.iter().map(|field| field.to_string()));
        self
    }

    /// Set the default ordering (enables sorting).
    pub fn with_default_sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        let sort = self.sort.get_or_insert_with(SortDeclaration::default);
        sort.default = Some(DefaultSort {
            field: field.into(),
            direction,
        });
        self
    }

    /// Declare a searchable field (enables search).
    pub fn with_search_field(mut self, field: impl Into<String>) -> Self {
        self.search
            .get_or_insert_with(SearchDeclaration::default)
            .fields
            .push(field.into());
        self
    }

    /// Declare a named search condition over several fields (enables search).
    pub fn with_search_target(mut self, name: impl Into<String>, fields: &[&str]) -> Self {
        self.search
            .get_or_insert_with(SearchDeclaration::default)
            .targets
            .insert(
                name.into(),
                fields.iter().map(|field| field.to_string()).collect(),
            );
        self
    }

    /// Set the target used for bare search values (enables search).
    pub fn with_default_search_target(mut self, target: impl Into<String>) -> Self {
        self.search
            .get_or_insert_with(SearchDeclaration::default)
            .default_target = Some(target.into());
        self
    }

    /// Fill in `max_limit` for a pagination section that declares none.
    pub fn with_fallback_max_limit(mut self, max_limit: Option<u64>) -> Self {
        if let Some(pagination) = self.pagination.as_mut()
            && pagination.max_limit.is_none()
        {
            pagination.max_limit = max_limit;
        }
        self
    }

    /// Validate the definition and build the read-only schema.
    pub fn build(self) -> Result<ResourceSchema, SchemaError> {
        ResourceSchema::from_definition(self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn param_names_default() {
        let params = ParamNames::default();
        assert_eq!(params.select, "select");
        assert_eq!(params.filter, "filter");
        assert_eq!(params.limit, "limit");
        assert_eq!(params.offset, "offset");
        assert_eq!(params.sort, "sort");
        assert_eq!(params.search, "search");
    }

    #[test]
    fn yaml_definition() {
        let yaml = r#"
resource: people
fields:
  - id
  - name: address
    children: [city, zip]
filters:
  age: { operators: [eq, between], type: integer }
  status: {}
pagination:
  max_limit: 50
sort:
  fields: [name]
  default: { field: name, direction: desc }
search:
  targets:
    keyword: [name, email]
  default_target: keyword
params:
  select: fields
"#;
        let def = SchemaDefinition::from_yaml_str(yaml).unwrap();

        assert_eq!(def.resource, "people");
        assert_eq!(def.params.select, "fields");
        assert_eq!(def.params.filter, "filter");

        let fields = def.fields.unwrap();
        assert_eq!(fields[0], FieldDeclaration::atomic("id"));
        assert_eq!(
            fields[1],
            FieldDeclaration::nested(
                "address",
                vec![
                    FieldDeclaration::atomic("city"),
                    FieldDeclaration::atomic("zip")
                ]
            )
        );

        let filters = def.filters.unwrap();
        assert_eq!(
            filters["age"].operators,
            vec![FilterOperator::Eq, FilterOperator::Between]
        );
        assert_eq!(filters["age"].value_type, Some(ValueType::Integer));
        assert!(filters["status"].operators.is_empty());

        assert_eq!(def.pagination.unwrap().max_limit, Some(50));
        let sort = def.sort.unwrap();
        assert_eq!(sort.default.unwrap().direction, SortDirection::Desc);
        assert_eq!(def.search.unwrap().default_target.as_deref(), Some("keyword"));
    }

    #[test]
    fn json_and_toml_definitions() {
        let json = r#"{"resource": "tags", "sort": {"fields": ["label"]}}"#;
        let def = SchemaDefinition::from_json_str(json).unwrap();
        assert_eq!(def.sort.unwrap().fields, vec!["label".to_string()]);
        assert!(def.fields.is_none());

        let toml = r#"
resource = "tags"

[pagination]
max_limit = 25
"#;
        let def = SchemaDefinition::from_toml_str(toml).unwrap();
        assert_eq!(def.pagination.unwrap().max_limit, Some(25));
    }

    #[test]
    fn unsupported_extension() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        std::fs::write(file.path(), "resource = x").unwrap();
        let err = SchemaDefinition::from_path(file.path()).unwrap_err();
        assert!(matches!(err, SchemaError::UnsupportedFormat(ext) if ext == "ini"));
    }

    #[test]
    fn missing_file() {
        let err = SchemaDefinition::from_path("/nonexistent/sieve/schema.yaml").unwrap_err();
        assert!(matches!(err, SchemaError::Io { .. }));
    }

    #[test]
    fn fallback_max_limit_only_fills_gaps() {
        let def = SchemaDefinition::new("people")
            .with_pagination(None)
            .with_fallback_max_limit(Some(200));
        assert_eq!(def.pagination.unwrap().max_limit, Some(200));

        let def = SchemaDefinition::new("people")
            .with_pagination(Some(10))
            .with_fallback_max_limit(Some(200));
        assert_eq!(def.pagination.unwrap().max_limit, Some(10));

        let def = SchemaDefinition::new("people").with_fallback_max_limit(Some(200));
        assert!(def.pagination.is_none());
    }

    #[test]
    fn builder_enables_sections() {
        let def = SchemaDefinition::new("people")
            .with_field("id")
            .with_nested("address", &["city"])
            .with_filter("age", FilterDeclaration::any().typed(ValueType::Integer))
            .with_sort(&["name"])
            .with_search_field("name");

        assert_eq!(def.fields.as_ref().map(Vec::len), Some(2));
        assert!(def.filters.is_some());
        assert!(def.sort.is_some());
        assert!(def.search.is_some());
        assert!(def.pagination.is_none());
    }
}
