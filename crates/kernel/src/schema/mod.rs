//! Resource schemas.
//!
//! This module provides:
//! - SchemaDefinition: serde declaration of a resource API
//! - ResourceSchema: validated, read-only form used by the parsers
//! - FieldTree: declared field structure indexed by full path
//! - ComponentRegistry: enabled capabilities

mod definition;
mod field_tree;
mod registry;

use std::collections::{BTreeMap, BTreeSet};

pub use definition::{
    DefaultSort, FieldDeclaration, FilterDeclaration, PaginationDeclaration, ParamNames,
    SchemaDefinition, SearchDeclaration, SortDeclaration,
};
pub use field_tree::FieldTree;
pub use registry::{Capability, ComponentRegistry};

use crate::error::SchemaError;
use crate::query::types::{FilterOperator, SortSpec, ValueType};

/// Filter rules for one field, resolved from its declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterRule {
    operators: Option<BTreeSet<FilterOperator>>,
    value_type: Option<ValueType>,
}

impl FilterRule {
    /// Whether the operator is on this field's allow-list.
    pub fn allows(&self, operator: FilterOperator) -> bool {
        self.operators
            .as_ref()
            .is_none_or(|allowed| allowed.contains(&operator))
    }

    pub fn value_type(&self) -> Option<ValueType> {
        self.value_type
    }
}

impl From<FilterDeclaration> for FilterRule {
    fn from(declaration: FilterDeclaration) -> Self {
        let operators = (!declaration.operators.is_empty())
            .then(|| declaration.operators.into_iter().collect());
        Self {
            operators,
            value_type: declaration.value_type,
        }
    }
}

/// Validated, read-only resource schema.
///
/// Built once and shared (typically behind an `Arc`) by every request for
/// the resource; nothing mutates it after construction.
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    resource: String,
    table: String,
    params: ParamNames,
    registry: ComponentRegistry,
    fields: FieldTree,
    filters: BTreeMap<String, FilterRule>,
    max_limit: Option<u64>,
    sortable: BTreeSet<String>,
    default_sort: Option<SortSpec>,
    search_targets: BTreeMap<String, Vec<String>>,
    default_search_target: Option<String>,
}

impl ResourceSchema {
    /// Validate a definition and resolve its capability set.
    pub fn from_definition(definition: SchemaDefinition) -> Result<Self, SchemaError> {
        let SchemaDefinition {
            resource,
            table,
            params,
            fields,
            filters,
            pagination,
            sort,
            search,
        } = definition;

        let mut capabilities = Vec::new();

        let fields = match fields {
            Some(declarations) => {
                capabilities.push(Capability::FieldSelector);
                FieldTree::from_declarations(&declarations)?
            }
            None => FieldTree::default(),
        };

        let filters = match filters {
            Some(declarations) => {
                capabilities.push(Capability::Filter);
                declarations
                    .into_iter()
                    .map(|(field, declaration)| (field, FilterRule::from(declaration)))
                    .collect()
            }
            None => BTreeMap::new(),
        };

        let max_limit = match pagination {
            Some(declaration) => {
                capabilities.push(Capability::OffsetPaginator);
                declaration.max_limit
            }
            None => None,
        };

        let (sortable, default_sort) = match sort {
            Some(declaration) => {
                capabilities.push(Capability::Sort);
                let sortable: BTreeSet<String> = declaration.fields.into_iter().collect();
                let default_sort = match declaration.default {
                    Some(default) if !sortable.contains(&default.field) => {
                        return Err(SchemaError::UnsortableDefaultField(default.field));
                    }
                    Some(default) => Some(SortSpec::new(default.field, default.direction)),
                    None => None,
                };
                (sortable, default_sort)
            }
            None => (BTreeSet::new(), None),
        };

        let (search_targets, default_search_target) = match search {
            Some(declaration) => {
                capabilities.push(Capability::Search);
                resolve_search_targets(declaration)?
            }
            None => (BTreeMap::new(), None),
        };

        let registry = ComponentRegistry::from_capabilities(capabilities);
        tracing::debug!(
            resource = %resource,
            capabilities = ?registry.enabled().collect::<Vec<_>>(),
            fields = fields.len(),
            "resource schema built"
        );

        Ok(Self {
            table: table.unwrap_or_else(|| resource.clone()),
            resource,
            params,
            registry,
            fields,
            filters,
            max_limit,
            sortable,
            default_sort,
            search_targets,
            default_search_target,
        })
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Backing table for SQL adapters.
    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn params(&self) -> &ParamNames {
        &self.params
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    pub fn fields(&self) -> &FieldTree {
        &self.fields
    }

    /// Filter rules for a field, if it is filterable.
    pub fn filter_rule(&self, field: &str) -> Option<&FilterRule> {
        self.filters.get(field)
    }

    pub fn max_limit(&self) -> Option<u64> {
        self.max_limit
    }

    pub fn is_sortable(&self, field: &str) -> bool {
        self.sortable.contains(field)
    }

    pub fn default_sort(&self) -> Option<&SortSpec> {
        self.default_sort.as_ref()
    }

    /// Fields a search target resolves to.
    pub fn search_target(&self, target: &str) -> Option<&[String]> {
        self.search_targets.get(target).map(Vec::as_slice)
    }

    pub fn default_search_target(&self) -> Option<&str> {
        self.default_search_target.as_deref()
    }
}

type SearchTargets = (BTreeMap<String, Vec<String>>, Option<String>);

fn resolve_search_targets(declaration: SearchDeclaration) -> Result<SearchTargets, SchemaError> {
    let mut targets: BTreeMap<String, Vec<String>> = declaration
        .fields
        .into_iter()
        .map(|field| (field.clone(), vec![field]))
        .collect();

    for (name, fields) in declaration.targets {
        if fields.is_empty() {
            return Err(SchemaError::EmptySearchTarget(name));
        }
        targets.insert(name, fields);
    }

    if let Some(default) = &declaration.default_target
        && !targets.contains_key(default)
    {
        return Err(SchemaError::UnknownDefaultSearchTarget(default.clone()));
    }

    Ok((targets, declaration.default_target))
}
