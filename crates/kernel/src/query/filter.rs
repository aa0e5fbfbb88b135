//! Filter parsing.
//!
//! The filter parameter maps fields to operator-tagged values. Accepted
//! forms, which may be mixed:
//!
//! ```json
//! {"age": {"op": "between", "value": [18, 30]}}
//! {"age": {"gte": 18, "lt": 65}}
//! {"status": "active"}
//! [{"field": "age", "op": "in", "value": [1, 2]}]
//! ```
//!
//! Predicates keep declaration order. A malformed filter is reported and
//! left out; the remaining filters are still parsed.

use serde_json::{Map, Value};

use super::CapabilityParser;
use super::input::RequestInput;
use super::types::{FilterOperator, FilterPredicate, FilterValue, PredicateValue, ValueShape};
use crate::error::{ErrorKind, ErrorReport};
use crate::schema::{Capability, FilterRule, ResourceSchema};

/// Keys that mark the `{op, value}` form.
const OPERATOR_KEYS: [&str; 2] = ["op", "operator"];

/// Parses the filter parameter into predicates.
pub struct ResourceFilter<'a> {
    schema: &'a ResourceSchema,
}

impl<'a> ResourceFilter<'a> {
    pub fn new(schema: &'a ResourceSchema) -> Self {
        Self { schema }
    }

    /// Parse all filters declared for one field.
    fn parse_field(
        &self,
        field: &str,
        spec: &Value,
        predicates: &mut Vec<FilterPredicate>,
        errors: &mut ErrorReport,
    ) {
        match spec {
            Value::Object(entries) if is_tagged(entries) => {
                let token = OPERATOR_KEYS.iter().find_map(|key| entries.get(*key));
                let value = entries.get("value");
                match token.and_then(Value::as_str) {
                    Some(token) => predicates.extend(self.parse_entry(field, token, value, errors)),
                    None => errors.record(
                        Capability::Filter,
                        field,
                        ErrorKind::InvalidFilterOperator,
                        "filter operator must be a string",
                    ),
                }
            }
            Value::Object(entries) => {
                for (token, value) in entries {
                    predicates.extend(self.parse_entry(field, token, Some(value), errors));
                }
            }
            scalar_or_list => {
                predicates.extend(self.parse_entry(field, "eq", Some(scalar_or_list), errors));
            }
        }
    }

    /// Validate one `(field, operator, value)` triple.
    fn parse_entry(
        &self,
        field: &str,
        token: &str,
        value: Option<&Value>,
        errors: &mut ErrorReport,
    ) -> Option<FilterPredicate> {
        let Some(rule) = self.schema.filter_rule(field) else {
            errors.record(
                Capability::Filter,
                field,
                ErrorKind::UnknownFieldReference,
                format!("`{field}` is not filterable"),
            );
            return None;
        };

        let operator = match token.parse::<FilterOperator>() {
            Ok(operator) if rule.allows(operator) => operator,
            Ok(operator) => {
                errors.record(
                    Capability::Filter,
                    field,
                    ErrorKind::InvalidFilterOperator,
                    format!("operator `{operator}` is not allowed for `{field}`"),
                );
                return None;
            }
            Err(e) => {
                errors.record(
                    Capability::Filter,
                    field,
                    ErrorKind::InvalidFilterOperator,
                    e.to_string(),
                );
                return None;
            }
        };

        let Some(value) = value else {
            errors.record(
                Capability::Filter,
                field,
                ErrorKind::InvalidFilterValueShape,
                format!("`{operator}` filter has no value"),
            );
            return None;
        };

        match shape_value(operator, value, rule) {
            Ok(value) => Some(FilterPredicate {
                field: field.to_string(),
                operator,
                value,
            }),
            Err(message) => {
                errors.record(
                    Capability::Filter,
                    field,
                    ErrorKind::InvalidFilterValueShape,
                    message,
                );
                None
            }
        }
    }
}

impl CapabilityParser for ResourceFilter<'_> {
    type Output = Vec<FilterPredicate>;

    fn capability(&self) -> Capability {
        Capability::Filter
    }

    fn parse(&self, input: &RequestInput, errors: &mut ErrorReport) -> Vec<FilterPredicate> {
        let key = &self.schema.params().filter;
        let mut predicates = Vec::new();

        match input.get(key) {
            None | Some(Value::Null) => {}
            Some(Value::Object(fields)) => {
                for (field, spec) in fields {
                    self.parse_field(field, spec, &mut predicates, errors);
                }
            }
            Some(Value::Array(entries)) => {
                for entry in entries {
                    let field = entry.get("field").and_then(Value::as_str);
                    match field {
                        Some(field) if entry.as_object().is_some_and(is_tagged) => {
                            self.parse_field(field, entry, &mut predicates, errors);
                        }
                        _ => errors.record(
                            Capability::Filter,
                            key,
                            ErrorKind::InvalidFilterValueShape,
                            format!("expected {{field, op, value}}, got {entry}"),
                        ),
                    }
                }
            }
            Some(other) => errors.record(
                Capability::Filter,
                key,
                ErrorKind::InvalidFilterValueShape,
                format!("expected a filter object or list, got {other}"),
            ),
        }

        predicates
    }
}

fn is_tagged(entries: &Map<String, Value>) -> bool {
    OPERATOR_KEYS.iter().any(|key| entries.contains_key(*key))
}

/// Check a raw value against the operator's required shape and coerce its
/// elements to the field's declared type.
fn shape_value(
    operator: FilterOperator,
    value: &Value,
    rule: &FilterRule,
) -> Result<PredicateValue, String> {
    match (operator.shape(), value) {
        (ValueShape::List, Value::Array(items)) if !items.is_empty() => {
            Ok(PredicateValue::List(scalars(items, rule)?))
        }
        (ValueShape::List, _) => Err(format!("`{operator}` expects a non-empty list")),

        (ValueShape::Pair, Value::Array(items)) if items.len() == 2 => {
            Ok(PredicateValue::Range(scalar(&items[0], rule)?, scalar(&items[1], rule)?))
        }
        (ValueShape::Pair, _) => Err(format!("`{operator}` expects exactly two values")),

        (ValueShape::Text, Value::String(text)) => {
            Ok(PredicateValue::Scalar(FilterValue::String(text.clone())))
        }
        (ValueShape::Text, _) => Err(format!("`{operator}` expects a string")),

        (ValueShape::Any, Value::Array(items)) => Ok(PredicateValue::List(scalars(items, rule)?)),
        (ValueShape::Any, value) => Ok(PredicateValue::Scalar(scalar(value, rule)?)),
    }
}

fn scalars(items: &[Value], rule: &FilterRule) -> Result<Vec<FilterValue>, String> {
    items.iter().map(|item| scalar(item, rule)).collect()
}

fn scalar(value: &Value, rule: &FilterRule) -> Result<FilterValue, String> {
    let scalar = FilterValue::from_json(value)
        .ok_or_else(|| format!("`{value}` is not a supported scalar value"))?;
    match rule.value_type() {
        Some(value_type) => scalar
            .coerce(value_type)
            .ok_or_else(|| format!("{value} is not a valid {value_type}")),
        None => Ok(scalar),
    }
}
