//! SQL adapter using SeaQuery.
//!
//! Builds a Postgres `SELECT` over the resource's table with support for:
//! - Column selection (`*` when nothing is selected)
//! - Every filter operator, including list and range forms
//! - LIMIT/OFFSET, ORDER BY
//! - Substring search across one or more columns

use sea_query::{
    Alias, Asterisk, Cond, Expr, ExprTrait, Order, PostgresQueryBuilder, Query, SelectStatement,
    SimpleExpr, Values,
};

use super::BackendAdapter;
use crate::query::types::{
    FilterOperator, FilterPredicate, FilterValue, NAMESPACE_SEPARATOR, PaginationWindow,
    PredicateValue, SearchSpec, SortDirection, SortSpec,
};
use crate::schema::ResourceSchema;

/// Collects specification parts into a SeaQuery `SelectStatement`.
pub struct SeaQueryAdapter {
    table: String,
    query: SelectStatement,
    has_columns: bool,
}

impl SeaQueryAdapter {
    /// Create an adapter selecting from `table`.
    pub fn new(table: impl Into<String>) -> Self {
        let table = table.into();
        let mut query = Query::select();
        query.from(Alias::new(&table));
        Self {
            table,
            query,
            has_columns: false,
        }
    }

    /// Create an adapter for a schema's backing table.
    pub fn for_schema(schema: &ResourceSchema) -> Self {
        Self::new(schema.table())
    }

    /// The statement built so far.
    pub fn statement(&self) -> SelectStatement {
        let mut query = self.query.clone();
        if !self.has_columns {
            query.column((Alias::new(&self.table), Asterisk));
        }
        query
    }

    /// Render Postgres SQL with values inlined.
    pub fn to_sql(&self) -> String {
        self.statement().to_string(PostgresQueryBuilder)
    }

    /// Render parameterised Postgres SQL and its bound values.
    pub fn build(&self) -> (String, Values) {
        self.statement().build(PostgresQueryBuilder)
    }

    /// Column reference for a field. `address.city` maps to the `city`
    /// column of the `address` table alias; plain names use the base table.
    fn column_ref(&self, field: &str) -> (Alias, Alias) {
        match field.rsplit_once(NAMESPACE_SEPARATOR) {
            Some((table, column)) => (Alias::new(table), Alias::new(column)),
            None => (Alias::new(&self.table), Alias::new(field)),
        }
    }

    fn column(&self, field: &str) -> SimpleExpr {
        Expr::col(self.column_ref(field)).into()
    }

    /// Build a single filter condition.
    fn build_filter_condition(&self, predicate: &FilterPredicate) -> Option<SimpleExpr> {
        let column = self.column(&predicate.field);

        match (predicate.operator, &predicate.value) {
            (FilterOperator::Eq | FilterOperator::In, PredicateValue::Scalar(value)) => {
                Some(column.eq(sql_value(value)))
            }
            (FilterOperator::Eq | FilterOperator::In, PredicateValue::List(values)) => {
                Some(column.is_in(values.iter().map(sql_value)))
            }
            (FilterOperator::Ne | FilterOperator::NotIn, PredicateValue::Scalar(value)) => {
                Some(column.ne(sql_value(value)))
            }
            (FilterOperator::Ne | FilterOperator::NotIn, PredicateValue::List(values)) => {
                Some(column.is_not_in(values.iter().map(sql_value)))
            }
            (
                FilterOperator::Gt | FilterOperator::Gte | FilterOperator::Lt | FilterOperator::Lte,
                PredicateValue::Scalar(value),
            ) => Some(compare(predicate.operator, column, value)),
            // Matches when the comparison holds for any listed value.
            (
                FilterOperator::Gt | FilterOperator::Gte | FilterOperator::Lt | FilterOperator::Lte,
                PredicateValue::List(values),
            ) => {
                let cond = values.iter().fold(Cond::any(), |cond, value| {
                    cond.add(compare(predicate.operator, column.clone(), value))
                });
                Some(cond.into())
            }
            (FilterOperator::Between, PredicateValue::Range(low, high)) => {
                Some(column.between(sql_value(low), sql_value(high)))
            }
            (FilterOperator::NotBetween, PredicateValue::Range(low, high)) => {
                Some(column.not_between(sql_value(low), sql_value(high)))
            }
            (FilterOperator::Contains, PredicateValue::Scalar(value)) => {
                Some(column.like(contains_pattern(&value.to_string())))
            }
            (operator, value) => {
                tracing::error!(
                    field = %predicate.field,
                    operator = %operator,
                    value = ?value,
                    "filter value does not fit its operator; restricting results"
                );
                // Restrict rather than widen results.
                Some(Expr::cust("FALSE"))
            }
        }
    }
}

impl BackendAdapter for SeaQueryAdapter {
    fn apply_field_selection(&mut self, fields: &[String]) {
        for field in fields {
            let column = (Alias::new(&self.table), Alias::new(field));
            self.query.column(column);
            self.has_columns = true;
        }
    }

    fn apply_filter(&mut self, predicate: &FilterPredicate) {
        if let Some(condition) = self.build_filter_condition(predicate) {
            self.query.and_where(condition);
        }
    }

    fn apply_pagination(&mut self, window: &PaginationWindow) {
        if let Some(limit) = window.limit {
            self.query.limit(limit);
        }
        if let Some(offset) = window.offset {
            self.query.offset(offset);
        }
    }

    fn apply_sort(&mut self, sort: &SortSpec) {
        let Some(field) = sort.field() else {
            return;
        };
        let order = match sort.direction {
            SortDirection::Asc => Order::Asc,
            SortDirection::Desc => Order::Desc,
        };
        let column = self.column_ref(field);
        self.query.order_by(column, order);
    }

    fn apply_search(&mut self, search: &SearchSpec) {
        if search.is_noop() {
            return;
        }
        let pattern = contains_pattern(&search.value);
        let cond = search.fields.iter().fold(Cond::any(), |cond, field| {
            cond.add(self.column(field).like(pattern.as_str()))
        });
        self.query.and_where(cond.into());
    }
}

fn compare(operator: FilterOperator, column: SimpleExpr, value: &FilterValue) -> SimpleExpr {
    let value = sql_value(value);
    match operator {
        FilterOperator::Gt => column.gt(value),
        FilterOperator::Gte => column.gte(value),
        FilterOperator::Lt => column.lt(value),
        _ => column.lte(value),
    }
}

fn sql_value(value: &FilterValue) -> sea_query::Value {
    match value {
        FilterValue::Boolean(b) => (*b).into(),
        FilterValue::Integer(i) => (*i).into(),
        FilterValue::Float(f) => (*f).into(),
        FilterValue::String(s) => s.clone().into(),
    }
}

fn contains_pattern(value: &str) -> String {
    format!("%{}%", escape_like_wildcards(value))
}

/// Escape SQL LIKE wildcard characters (`%`, `_`, `\`) in a value.
fn escape_like_wildcards(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
