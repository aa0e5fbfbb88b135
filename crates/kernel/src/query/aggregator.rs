//! Specification aggregation.
//!
//! Runs every parser the resource enables, once, and merges the results and
//! their errors into one [`QuerySpecification`].

use tracing::debug;

use super::CapabilityParser;
use super::field_selector::FieldSelector;
use super::filter::ResourceFilter;
use super::input::RequestInput;
use super::paginator::OffsetPaginator;
use super::search::ResourceSearch;
use super::sort::ResourceSort;
use super::types::QuerySpecification;
use crate::error::ErrorReport;
use crate::schema::{Capability, ComponentRegistry, ResourceSchema};

/// Builds the query specification for one request.
///
/// All parsing happens in [`new`](Self::new); the accessors only hand out
/// the result, so building twice yields identical output.
pub struct SpecificationAggregator<'a> {
    schema: &'a ResourceSchema,
    specification: QuerySpecification,
}

impl<'a> SpecificationAggregator<'a> {
    pub fn new(schema: &'a ResourceSchema, input: &RequestInput) -> Self {
        let registry = schema.registry();
        let mut errors = ErrorReport::new();
        let mut specification = QuerySpecification::default();

        if registry.is_enabled(Capability::FieldSelector) {
            specification.fields = Some(run(&FieldSelector::new(schema), input, &mut errors));
        }
        if registry.is_enabled(Capability::Filter) {
            specification.filters = run(&ResourceFilter::new(schema), input, &mut errors);
        }
        if registry.is_enabled(Capability::OffsetPaginator) {
            specification.pagination =
                Some(run(&OffsetPaginator::new(schema), input, &mut errors));
        }
        if registry.is_enabled(Capability::Sort) {
            specification.sort = Some(run(&ResourceSort::new(schema), input, &mut errors));
        }
        if registry.is_enabled(Capability::Search) {
            specification.search = run(&ResourceSearch::new(schema), input, &mut errors);
        }

        for capability in Capability::ALL {
            if !registry.is_enabled(capability) {
                ignore_disabled(schema, capability, input);
            }
        }

        debug!(
            resource = %schema.resource(),
            fields = specification.fields.as_ref().map_or(0, |f| f.atomic_fields().len()),
            filters = specification.filters.len(),
            sorted = specification.sort.as_ref().is_some_and(|s| !s.is_noop()),
            searched = specification.search.is_some(),
            errors = errors.len(),
            "query specification built"
        );

        specification.errors = errors;
        Self {
            schema,
            specification,
        }
    }

    pub fn schema(&self) -> &ResourceSchema {
        self.schema
    }

    pub fn registry(&self) -> &ComponentRegistry {
        self.schema.registry()
    }

    /// All validation errors for the request. Never fails; an empty report
    /// means the request is valid.
    pub fn validate(&self) -> ErrorReport {
        self.specification.errors.clone()
    }

    /// The specification, including any errors. Callers decide whether a
    /// non-empty error report rejects the request.
    pub fn build_specification(&self) -> QuerySpecification {
        self.specification.clone()
    }

    pub fn into_specification(self) -> QuerySpecification {
        self.specification
    }
}

fn run<P: CapabilityParser>(
    parser: &P,
    input: &RequestInput,
    errors: &mut ErrorReport,
) -> P::Output {
    let before = errors.len();
    let output = parser.parse(input, errors);
    if errors.len() > before {
        debug!(
            capability = %parser.capability(),
            errors = errors.len() - before,
            "capability input rejected"
        );
    }
    output
}

/// Log input addressed to a capability the resource does not enable.
fn ignore_disabled(schema: &ResourceSchema, capability: Capability, input: &RequestInput) {
    let params = schema.params();
    let keys = match capability {
        Capability::FieldSelector => vec![&params.select],
        Capability::Filter => vec![&params.filter],
        Capability::OffsetPaginator => vec![&params.limit, &params.offset],
        Capability::Sort => vec![&params.sort],
        Capability::Search => vec![&params.search],
    };
    for key in keys.into_iter().filter(|key| input.contains(key)) {
        debug!(
            resource = %schema.resource(),
            capability = %capability,
            param = %key,
            "ignoring parameter for disabled capability"
        );
    }
}
