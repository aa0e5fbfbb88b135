#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Query specification integration tests.
//!
//! Builds specifications from JSON and query-string requests against the
//! shared fixture schemas and checks the IR and error report.

use serde_json::json;
use sieve_kernel::query::types::{
    FieldKind, FilterOperator, FilterValue, PaginationWindow, PredicateValue, SortDirection,
    SortSpec, ValueType,
};
use sieve_kernel::schema::FilterDeclaration;
use sieve_kernel::{
    Capability, ErrorKind, RequestInput, SchemaDefinition, SchemaError, SpecificationAggregator,
};
use sieve_test_utils::{RequestBuilder, assert, minimal_schema, people_schema};

// -------------------------------------------------------------------------
// End-to-end requests
// -------------------------------------------------------------------------

#[test]
fn full_request_produces_expected_ir() {
    let schema = minimal_schema();
    let input = RequestBuilder::new()
        .select("$.id,name")
        .filter("age", "between", json!([18, 30]))
        .limit(10)
        .offset(20)
        .sort("name", "desc")
        .build();

    let aggregator = SpecificationAggregator::new(&schema, &input);
    assert::no_errors(&aggregator.validate());

    let spec = aggregator.build_specification();
    assert_eq!(spec.fields().unwrap().atomic_fields(), vec!["id", "name"]);
    assert_eq!(spec.filters().len(), 1);
    assert_eq!(spec.filters()[0].operator, FilterOperator::Between);
    assert_eq!(
        spec.filters()[0].value,
        PredicateValue::Range(FilterValue::Integer(18), FilterValue::Integer(30))
    );
    assert_eq!(
        spec.pagination(),
        Some(&PaginationWindow {
            limit: Some(10),
            offset: Some(20)
        })
    );
    assert_eq!(spec.sort(), Some(&SortSpec::new("name", SortDirection::Desc)));
}

#[test]
fn in_with_scalar_is_a_shape_error() {
    let schema = people_schema();
    let input = RequestBuilder::new()
        .filter("status", "in", json!("active"))
        .build();

    let spec = SpecificationAggregator::new(&schema, &input).into_specification();
    assert!(spec.filters().is_empty());
    assert_eq!(spec.errors().len(), 1);
    assert::single_error(
        spec.errors(),
        Capability::Filter,
        "status",
        ErrorKind::InvalidFilterValueShape,
    );
}

#[test]
fn query_string_request() {
    let schema = people_schema();
    let input = RequestInput::from_query_string(
        "select=id,address{city}&filter[age][between][]=18&filter[age][between][]=30\
         &filter[status][in][]=active&filter[status][in][]=pending\
         &limit=25&offset=0&sort=-age&search=smith",
    );

    let spec = SpecificationAggregator::new(&schema, &input).into_specification();
    assert::no_errors(spec.errors());

    let fields = spec.fields().unwrap();
    assert_eq!(fields.atomic_fields(), vec!["id"]);
    assert_eq!(fields.node("$.address").unwrap().kind, FieldKind::Nested);

    let age = &spec.filters()[0];
    assert_eq!(age.field, "age");
    assert_eq!(
        age.value,
        PredicateValue::Range(FilterValue::Integer(18), FilterValue::Integer(30))
    );
    let status = &spec.filters()[1];
    assert_eq!(status.operator, FilterOperator::In);

    assert_eq!(
        spec.pagination(),
        Some(&PaginationWindow {
            limit: Some(25),
            offset: Some(0)
        })
    );
    assert_eq!(spec.sort(), Some(&SortSpec::new("age", SortDirection::Desc)));

    let search = spec.search().unwrap();
    assert_eq!(search.target, "keyword");
    assert_eq!(search.fields, vec!["name", "email"]);
}

#[test]
fn every_problem_is_reported() {
    let schema = people_schema();
    let input = RequestInput::from_query_string(
        "filter[status][in]=active&filter[age][between][]=1&filter[password]=x\
         &filter[name][in][]=a&limit=500&offset=-1&sort=email:desc\
         &search[target]=bio&search[value]=x",
    );

    let report = SpecificationAggregator::new(&schema, &input).validate();

    assert::single_error(&report, Capability::Filter, "status", ErrorKind::InvalidFilterValueShape);
    assert::single_error(&report, Capability::Filter, "age", ErrorKind::InvalidFilterValueShape);
    assert::single_error(&report, Capability::Filter, "password", ErrorKind::UnknownFieldReference);
    assert::single_error(&report, Capability::Filter, "name", ErrorKind::InvalidFilterOperator);
    assert::single_error(
        &report,
        Capability::OffsetPaginator,
        "limit",
        ErrorKind::InvalidPaginationValue,
    );
    assert::single_error(
        &report,
        Capability::OffsetPaginator,
        "offset",
        ErrorKind::InvalidPaginationValue,
    );
    assert::single_error(&report, Capability::Sort, "email", ErrorKind::InvalidSortField);
    assert::single_error(&report, Capability::Search, "bio", ErrorKind::InvalidSearchTarget);
    assert_eq!(report.len(), 8);
}

#[test]
fn blank_sort_direction_defaults_to_ascending() {
    let schema = people_schema();
    for query in ["sort[field]=name&sort[dir]=", "sort=name:"] {
        let spec = SpecificationAggregator::new(&schema, &RequestInput::from_query_string(query))
            .into_specification();
        assert::no_errors(spec.errors());
        assert_eq!(spec.sort(), Some(&SortSpec::new("name", SortDirection::Asc)), "{query}");
    }
}

#[test]
fn non_finite_float_filters_are_rejected() {
    let schema = SchemaDefinition::new("people")
        .with_field("score")
        .with_filter("score", FilterDeclaration::any().typed(ValueType::Float))
        .build()
        .unwrap();
    let input = RequestInput::from_query_string("filter[score][gte]=NaN&filter[score][lt]=inf");

    let spec = SpecificationAggregator::new(&schema, &input).into_specification();
    assert!(spec.filters().is_empty());
    assert_eq!(spec.errors().len(), 2);
    assert!(spec.errors().has_kind(ErrorKind::InvalidFilterValueShape));
    assert_eq!(spec, spec.clone());
}

#[test]
fn undeclared_selection_is_dropped_without_error() {
    let schema = people_schema();
    let input = RequestBuilder::new()
        .select("id,password,address.country,name")
        .build();

    let spec = SpecificationAggregator::new(&schema, &input).into_specification();
    assert::no_errors(spec.errors());
    assert_eq!(spec.fields().unwrap().atomic_fields(), vec!["id", "name"]);
}

#[test]
fn selection_order_follows_request_and_deduplicates() {
    let schema = people_schema();
    let input = RequestBuilder::new().select("email,id,email,name").build();

    let spec = SpecificationAggregator::new(&schema, &input).into_specification();
    assert_eq!(
        spec.fields().unwrap().atomic_fields(),
        vec!["email", "id", "name"]
    );
}

// -------------------------------------------------------------------------
// Determinism and serialization
// -------------------------------------------------------------------------

#[test]
fn building_is_deterministic() {
    let schema = people_schema();
    let query = "filter[status][in][]=a&filter[age][gte]=3&filter[password]=1&limit=x&sort=name";

    let first = SpecificationAggregator::new(&schema, &RequestInput::from_query_string(query))
        .into_specification();
    let second = SpecificationAggregator::new(&schema, &RequestInput::from_query_string(query))
        .into_specification();

    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn error_report_serializes_by_capability_and_field() {
    let schema = people_schema();
    let input = RequestBuilder::new()
        .filter("status", "in", json!("x"))
        .param("limit", "-1")
        .build();

    let report = SpecificationAggregator::new(&schema, &input).validate();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["filter"]["status"][0]["kind"], "InvalidFilterValueShape");
    assert_eq!(json["offset_paginator"]["limit"][0]["kind"], "InvalidPaginationValue");
}

#[test]
fn specification_serializes_ir() {
    let schema = minimal_schema();
    let input = RequestBuilder::new()
        .select("id")
        .filter("age", "in", json!([1, 2]))
        .limit(0)
        .build();

    let spec = SpecificationAggregator::new(&schema, &input).into_specification();
    let json = serde_json::to_value(&spec).unwrap();

    assert_eq!(json["fields"], json!([{"name": "id", "kind": "atomic"}]));
    assert_eq!(
        json["filters"],
        json!([{"field": "age", "operator": "in", "value": [1, 2]}])
    );
    assert_eq!(json["pagination"], json!({"limit": 0, "offset": null}));
    assert_eq!(json["errors"], json!({}));
}

// -------------------------------------------------------------------------
// Schema loading
// -------------------------------------------------------------------------

#[test]
fn schema_files_in_every_format() {
    let dir = tempfile::tempdir().unwrap();

    let yaml = dir.path().join("people.yaml");
    std::fs::write(&yaml, sieve_test_utils::PEOPLE_SCHEMA_YAML).unwrap();

    let json_path = dir.path().join("people.json");
    std::fs::write(
        &json_path,
        r#"{"resource": "people", "fields": ["id"], "sort": {"fields": ["id"]}}"#,
    )
    .unwrap();

    let toml_path = dir.path().join("people.toml");
    std::fs::write(
        &toml_path,
        "resource = \"people\"\nfields = [\"id\"]\n\n[pagination]\nmax_limit = 5\n",
    )
    .unwrap();

    let from_yaml = SchemaDefinition::from_path(&yaml).unwrap().build().unwrap();
    assert_eq!(from_yaml.resource(), "people");
    assert!(from_yaml.registry().is_enabled(Capability::Search));

    let from_json = SchemaDefinition::from_path(&json_path).unwrap().build().unwrap();
    assert!(from_json.is_sortable("id"));
    assert!(!from_json.registry().is_enabled(Capability::Filter));

    let from_toml = SchemaDefinition::from_path(&toml_path).unwrap().build().unwrap();
    assert_eq!(from_toml.max_limit(), Some(5));
}

#[test]
fn missing_schema_file() {
    let err = SchemaDefinition::from_path("/nonexistent/people.yaml").unwrap_err();
    assert!(matches!(err, SchemaError::Io { .. }));
}

#[test]
fn fallback_max_limit_applies_only_when_unset() {
    let schema = SchemaDefinition::new("people")
        .with_pagination(None)
        .with_fallback_max_limit(Some(10))
        .build()
        .unwrap();
    assert_eq!(schema.max_limit(), Some(10));

    let schema = SchemaDefinition::new("people")
        .with_pagination(Some(3))
        .with_fallback_max_limit(Some(10))
        .build()
        .unwrap();
    assert_eq!(schema.max_limit(), Some(3));

    let schema = SchemaDefinition::new("people")
        .with_fallback_max_limit(Some(10))
        .build()
        .unwrap();
    assert!(!schema.registry().is_enabled(Capability::OffsetPaginator));
}

#[test]
fn custom_parameter_names_from_yaml() {
    let definition = SchemaDefinition::from_yaml_str(
        "resource: people\n\
         params:\n  select: fields\n  limit: per_page\n\
         fields: [id]\n\
         pagination: {}\n",
    )
    .unwrap();
    let schema = definition.build().unwrap();

    let input = RequestInput::from_query_string("fields=id&per_page=4&select=nope");
    let spec = SpecificationAggregator::new(&schema, &input).into_specification();

    assert_eq!(spec.fields().unwrap().atomic_fields(), vec!["id"]);
    assert_eq!(spec.pagination().unwrap().limit, Some(4));
    assert_eq!(schema.params().filter, "filter");
}

#[test]
fn shared_schema_serves_concurrent_requests() {
    let schema = std::sync::Arc::new(people_schema());

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let schema = std::sync::Arc::clone(&schema);
            std::thread::spawn(move || {
                let input = RequestBuilder::new().limit(i).build();
                SpecificationAggregator::new(&schema, &input)
                    .into_specification()
                    .pagination()
                    .and_then(|p| p.limit)
            })
        })
        .collect();

    let limits: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(limits, vec![Some(0), Some(1), Some(2), Some(3)]);
}
