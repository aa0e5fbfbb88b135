//! Offset pagination.

use serde_json::Value;

use super::CapabilityParser;
use super::input::RequestInput;
use super::types::PaginationWindow;
use crate::error::{ErrorKind, ErrorReport};
use crate::schema::{Capability, ResourceSchema};

/// Parses `limit` and `offset` into a [`PaginationWindow`].
///
/// Both values are optional. A missing parameter, `null`, or a blank string
/// leaves the value unset; `0` is kept as `Some(0)`.
pub struct OffsetPaginator<'a> {
    schema: &'a ResourceSchema,
}

impl<'a> OffsetPaginator<'a> {
    pub fn new(schema: &'a ResourceSchema) -> Self {
        Self { schema }
    }
}

impl CapabilityParser for OffsetPaginator<'_> {
    type Output = PaginationWindow;

    fn capability(&self) -> Capability {
        Capability::OffsetPaginator
    }

    fn parse(&self, input: &RequestInput, errors: &mut ErrorReport) -> PaginationWindow {
        let params = self.schema.params();
        let limit = read_count(input.get(&params.limit), &params.limit, errors);
        let offset = read_count(input.get(&params.offset), &params.offset, errors);

        let limit = match (limit, self.schema.max_limit()) {
            (Some(limit), Some(max)) if limit > max => {
                errors.record(
                    Capability::OffsetPaginator,
                    &params.limit,
                    ErrorKind::InvalidPaginationValue,
                    format!("limit {limit} exceeds the maximum of {max}"),
                );
                None
            }
            (limit, _) => limit,
        };

        PaginationWindow { limit, offset }
    }
}

/// Read a non-negative integer parameter.
fn read_count(value: Option<&Value>, key: &str, errors: &mut ErrorReport) -> Option<u64> {
    let value = value?;
    let parsed = match value {
        Value::Null => return None,
        Value::String(text) if text.trim().is_empty() => return None,
        Value::String(text) => text.trim().parse::<u64>().ok(),
        Value::Number(number) => number.as_u64(),
        _ => None,
    };

    if parsed.is_none() {
        errors.record(
            Capability::OffsetPaginator,
            key,
            ErrorKind::InvalidPaginationValue,
            format!("`{key}` must be a non-negative integer, got {value}"),
        );
    }
    parsed
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::schema::SchemaDefinition;
    use serde_json::json;

    fn paginate(schema: &ResourceSchema, input: RequestInput) -> (PaginationWindow, ErrorReport) {
        let mut errors = ErrorReport::new();
        let window = OffsetPaginator::new(schema).parse(&input, &mut errors);
        (window, errors)
    }

    fn schema(max_limit: Option<u64>) -> ResourceSchema {
        SchemaDefinition::new("people")
            .with_pagination(max_limit)
            .build()
            .unwrap()
    }

    #[test]
    fn strings_and_numbers() {
        let schema = schema(None);
        let (window, errors) = paginate(
            &schema,
            RequestInput::new().with("limit", "10").with("offset", 20),
        );
        assert!(errors.is_empty());
        assert_eq!(window.limit, Some(10));
        assert_eq!(window.offset, Some(20));
    }

    #[test]
    fn zero_is_not_unset() {
        let schema = schema(None);
        let (zero, _) = paginate(
            &schema,
            RequestInput::new().with("limit", "0").with("offset", 0),
        );
        let (unset, _) = paginate(&schema, RequestInput::new());

        assert_eq!(zero.limit, Some(0));
        assert_eq!(zero.offset, Some(0));
        assert!(unset.is_unset());
        assert_ne!(zero, unset);
    }

    #[test]
    fn blank_and_null_are_unset() {
        let schema = schema(None);
        let (window, errors) = paginate(
            &schema,
            RequestInput::new()
                .with("limit", "  ")
                .with("offset", Value::Null),
        );
        assert!(errors.is_empty());
        assert!(window.is_unset());
    }

    #[test]
    fn invalid_values_reported_per_key() {
        let schema = schema(None);
        let bad_values = [
            json!("-1"),
            json!(-1),
            json!("1.5"),
            json!(2.5),
            json!("ten"),
            json!([1]),
            json!(true),
        ];
        for bad in bad_values {
            let (window, errors) =
                paginate(&schema, RequestInput::new().with("offset", bad.clone()));
            assert_eq!(window.offset, None, "{bad}");
            assert_eq!(errors.len(), 1, "{bad}");

            let error = errors.iter().next().unwrap();
            assert_eq!(error.kind, ErrorKind::InvalidPaginationValue);
            assert_eq!(error.field, "offset");
        }
    }

    #[test]
    fn both_invalid_values_reported() {
        let schema = schema(None);
        let (_, errors) = paginate(
            &schema,
            RequestInput::new().with("limit", "x").with("offset", "-5"),
        );
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn max_limit_rejects_without_clamping() {
        let schema = schema(Some(50));
        let (window, errors) = paginate(&schema, RequestInput::new().with("limit", 51));
        assert_eq!(window.limit, None);
        assert!(errors.has_kind(ErrorKind::InvalidPaginationValue));

        let (window, errors) = paginate(&schema, RequestInput::new().with("limit", 50));
        assert_eq!(window.limit, Some(50));
        assert!(errors.is_empty());
    }

    #[test]
    fn custom_parameter_names() {
        let params = crate::schema::ParamNames {
            limit: "per_page".to_string(),
            offset: "skip".to_string(),
            ..Default::default()
        };
        let schema = SchemaDefinition::new("people")
            .with_params(params)
            .with_pagination(None)
            .build()
            .unwrap();

        let (window, errors) = paginate(
            &schema,
            RequestInput::new()
                .with("per_page", "5")
                .with("skip", "bad")
                .with("limit", "9"),
        );
        assert_eq!(window.limit, Some(5));
        assert_eq!(window.offset, None);
        assert_eq!(errors.iter().next().unwrap().field, "skip");
    }
}
