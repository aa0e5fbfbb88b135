//! Backend adapters.
//!
//! A [`BackendAdapter`] turns a validated [`QuerySpecification`] into
//! operations on a concrete query target. The core never depends on a
//! backend; [`SeaQueryAdapter`] is the bundled SQL implementation.

mod query_builder;

pub use query_builder::SeaQueryAdapter;

use crate::query::types::{
    FilterPredicate, PaginationWindow, QuerySpecification, SearchSpec, SortSpec,
};

/// Applies specification parts to a query target.
///
/// Methods are called at most once per part, in a fixed order: field
/// selection, filters (in declaration order), pagination, sort, search.
/// Each is only called for capabilities the resource enables.
pub trait BackendAdapter {
    /// Select the given root-level atomic columns. An empty slice means the
    /// request selected nothing and the adapter should select everything.
    fn apply_field_selection(&mut self, fields: &[String]);

    fn apply_filter(&mut self, predicate: &FilterPredicate);

    /// Apply limit and offset. Unset values must not be emitted; `Some(0)`
    /// must be.
    fn apply_pagination(&mut self, window: &PaginationWindow);

    /// Order by the spec's field. A spec without a field is a no-op.
    fn apply_sort(&mut self, sort: &SortSpec);

    /// Match the value as a substring of any of the target's fields.
    fn apply_search(&mut self, search: &SearchSpec);
}

impl QuerySpecification {
    /// Hand every part of the specification to an adapter, consuming it.
    ///
    /// Validation errors are not checked here; rejecting an invalid request
    /// is up to the caller.
    pub fn apply_to<A: BackendAdapter + ?Sized>(self, adapter: &mut A) {
        tracing::debug!(
            filters = self.filters.len(),
            errors = self.errors.len(),
            "applying query specification"
        );

        if let Some(fields) = &self.fields {
            adapter.apply_field_selection(&fields.atomic_fields());
        }
        for predicate in &self.filters {
            adapter.apply_filter(predicate);
        }
        if let Some(window) = &self.pagination {
            adapter.apply_pagination(window);
        }
        if let Some(sort) = &self.sort {
            adapter.apply_sort(sort);
        }
        if let Some(search) = &self.search {
            adapter.apply_search(search);
        }
    }
}
