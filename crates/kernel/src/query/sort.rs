//! Sort parsing.
//!
//! Accepted forms: `{"field": "name", "dir": "desc"}` (`direction` is also
//! read), `"name"`, `"-name"` and `"name:desc"`. A request without a sort
//! falls back to the schema's default ordering, if any.

use serde_json::{Map, Value};

use super::CapabilityParser;
use super::input::RequestInput;
use super::types::{SortDirection, SortSpec};
use crate::error::{ErrorKind, ErrorReport};
use crate::schema::{Capability, ResourceSchema};

/// Parses the sort parameter against the sortable allow-list.
pub struct ResourceSort<'a> {
    schema: &'a ResourceSchema,
}

impl<'a> ResourceSort<'a> {
    pub fn new(schema: &'a ResourceSchema) -> Self {
        Self { schema }
    }

    fn fallback(&self) -> SortSpec {
        self.schema.default_sort().cloned().unwrap_or_default()
    }

    fn from_text(&self, text: &str, errors: &mut ErrorReport) -> SortSpec {
        let text = text.trim();
        if text.is_empty() {
            return self.fallback();
        }

        let (field, direction) = match text.strip_prefix('-') {
            Some(field) => (field, Some("desc")),
            None => match text.split_once(':') {
                Some((field, direction)) => (field, Some(direction)),
                None => (text, None),
            },
        };
        let field = field.trim();
        if field.is_empty() {
            return self.fallback();
        }
        self.validated(field, direction, errors)
    }

    fn from_object(&self, entries: &Map<String, Value>, errors: &mut ErrorReport) -> SortSpec {
        let key = &self.schema.params().sort;
        let field = match entries.get("field") {
            None | Some(Value::Null) => "",
            Some(Value::String(field)) => field.trim(),
            Some(other) => {
                errors.record(
                    Capability::Sort,
                    key,
                    ErrorKind::InvalidSortField,
                    format!("sort field must be a string, got {other}"),
                );
                return SortSpec::default();
            }
        };
        if field.is_empty() {
            return self.fallback();
        }

        let direction = entries.get("direction").or_else(|| entries.get("dir"));
        match direction {
            None | Some(Value::Null) => self.validated(field, None, errors),
            Some(Value::String(direction)) => self.validated(field, Some(direction), errors),
            Some(other) => {
                errors.record(
                    Capability::Sort,
                    field,
                    ErrorKind::InvalidSortDirection,
                    format!("sort direction must be a string, got {other}"),
                );
                SortSpec::default()
            }
        }
    }

    /// Check the field against the allow-list and parse the direction.
    /// Both problems are reported when both are present. A blank direction
    /// counts as omitted.
    fn validated(
        &self,
        field: &str,
        direction: Option<&str>,
        errors: &mut ErrorReport,
    ) -> SortSpec {
        let mut valid = true;

        if !self.schema.is_sortable(field) {
            errors.record(
                Capability::Sort,
                field,
                ErrorKind::InvalidSortField,
                format!("`{field}` is not sortable"),
            );
            valid = false;
        }

        let direction = direction.map(str::trim).filter(|d| !d.is_empty());
        let direction = match direction.map(str::parse::<SortDirection>) {
            None => SortDirection::default(),
            Some(Ok(direction)) => direction,
            Some(Err(message)) => {
                errors.record(Capability::Sort, field, ErrorKind::InvalidSortDirection, message);
                valid = false;
                SortDirection::default()
            }
        };

        if valid {
            SortSpec::new(field, direction)
        } else {
            SortSpec::default()
        }
    }
}

impl CapabilityParser for ResourceSort<'_> {
    type Output = SortSpec;

    fn capability(&self) -> Capability {
        Capability::Sort
    }

    fn parse(&self, input: &RequestInput, errors: &mut ErrorReport) -> SortSpec {
        let key = &self.schema.params().sort;
        match input.get(key) {
            None | Some(Value::Null) => self.fallback(),
            Some(Value::String(text)) => self.from_text(text, errors),
            Some(Value::Object(entries)) => self.from_object(entries, errors),
            Some(other) => {
                errors.record(
                    Capability::Sort,
                    key,
                    ErrorKind::InvalidSortField,
                    format!("expected a sort field or object, got {other}"),
                );
                SortSpec::default()
            }
        }
    }
}
