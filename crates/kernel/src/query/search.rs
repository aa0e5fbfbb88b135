//! Free-text search parsing.

use serde_json::{Map, Value};

use super::CapabilityParser;
use super::input::RequestInput;
use super::types::SearchSpec;
use crate::error::{ErrorKind, ErrorReport};
use crate::schema::{Capability, ResourceSchema};

/// Parses the search parameter into a target and value.
///
/// The object form names its target (`{"target": "keyword", "value": "ali"}`,
/// `condition` is accepted for `target`). A bare string searches the schema's
/// default target. Blank values produce no search and no error; any other
/// value is kept as sent.
pub struct ResourceSearch<'a> {
    schema: &'a ResourceSchema,
}

impl<'a> ResourceSearch<'a> {
    pub fn new(schema: &'a ResourceSchema) -> Self {
        Self { schema }
    }

    fn resolve(
        &self,
        target: Option<&str>,
        value: &str,
        errors: &mut ErrorReport,
    ) -> Option<SearchSpec> {
        if value.trim().is_empty() {
            return None;
        }

        let key = &self.schema.params().search;
        let Some(target) = target
            .map(str::trim)
            .filter(|target| !target.is_empty())
            .or_else(|| self.schema.default_search_target())
        else {
            errors.record(
                Capability::Search,
                key,
                ErrorKind::InvalidSearchTarget,
                "search has no target and the resource declares no default",
            );
            return None;
        };

        match self.schema.search_target(target) {
            Some(fields) => Some(SearchSpec {
                target: target.to_string(),
                fields: fields.to_vec(),
                value: value.to_string(),
            }),
            None => {
                errors.record(
                    Capability::Search,
                    target,
                    ErrorKind::InvalidSearchTarget,
                    format!("`{target}` is not a search target"),
                );
                None
            }
        }
    }

    fn from_object(
        &self,
        entries: &Map<String, Value>,
        errors: &mut ErrorReport,
    ) -> Option<SearchSpec> {
        let key = &self.schema.params().search;
        let target = match entries.get("target").or_else(|| entries.get("condition")) {
            None | Some(Value::Null) => None,
            Some(Value::String(target)) => Some(target.as_str()),
            Some(other) => {
                errors.record(
                    Capability::Search,
                    key,
                    ErrorKind::InvalidSearchTarget,
                    format!("search target must be a string, got {other}"),
                );
                return None;
            }
        };

        let value = match entries.get("value") {
            None | Some(Value::Null) => return None,
            Some(Value::String(value)) => value.clone(),
            Some(value @ (Value::Number(_) | Value::Bool(_))) => value.to_string(),
            Some(other) => {
                errors.record(
                    Capability::Search,
                    target.unwrap_or(key.as_str()),
                    ErrorKind::InvalidSearchTarget,
                    format!("search value must be text, got {other}"),
                );
                return None;
            }
        };

        self.resolve(target, &value, errors)
    }
}

impl CapabilityParser for ResourceSearch<'_> {
    type Output = Option<SearchSpec>;

    fn capability(&self) -> Capability {
        Capability::Search
    }

    fn parse(&self, input: &RequestInput, errors: &mut ErrorReport) -> Option<SearchSpec> {
        let key = &self.schema.params().search;
        match input.get(key)? {
            Value::Null => None,
            Value::String(value) => self.resolve(None, value, errors),
            Value::Object(entries) => self.from_object(entries, errors),
            other => {
                errors.record(
                    Capability::Search,
                    key,
                    ErrorKind::InvalidSearchTarget,
                    format!("expected a search string or object, got {other}"),
                );
                None
            }
        }
    }
}
