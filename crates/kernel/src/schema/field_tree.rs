//! Declared field structure, stored as an arena indexed by full path.
//!
//! Built once per schema so per-request lookups (`$.address.city`) are a
//! single hash probe instead of a walk over the declaration.

use std::collections::HashMap;

use super::definition::FieldDeclaration;
use crate::error::SchemaError;
use crate::query::types::{FieldKind, ROOT_NAMESPACE, join_path};

#[derive(Debug, Clone)]
struct FieldEntry {
    name: String,
    children: Vec<usize>,
}

/// Arena of declared fields. Index 0 is the implicit root namespace.
#[derive(Debug, Clone)]
pub struct FieldTree {
    entries: Vec<FieldEntry>,
    by_path: HashMap<String, usize>,
}

impl Default for FieldTree {
    fn default() -> Self {
        let mut by_path = HashMap::new();
        by_path.insert(ROOT_NAMESPACE.to_string(), 0);
        Self {
            entries: vec![FieldEntry {
                name: ROOT_NAMESPACE.to_string(),
                children: Vec::new(),
            }],
            by_path,
        }
    }
}

/// Field names must be non-empty and free of path and selection syntax.
pub(crate) fn is_valid_field_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 128
        && !name
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '.' | ',' | '{' | '}' | '$'))
}

impl FieldTree {
    /// Build the arena from declarations.
    pub fn from_declarations(declarations: &[FieldDeclaration]) -> Result<Self, SchemaError> {
        let mut tree = Self::default();
        for declaration in declarations {
            tree.insert(0, ROOT_NAMESPACE, declaration)?;
        }
        Ok(tree)
    }

    fn insert(
        &mut self,
        parent: usize,
        namespace: &str,
        declaration: &FieldDeclaration,
    ) -> Result<(), SchemaError> {
        let name = declaration.name();
        if !is_valid_field_name(name) {
            return Err(SchemaError::InvalidFieldName(name.to_string()));
        }

        let path = join_path(namespace, name);
        if self.by_path.contains_key(&path) {
            return Err(SchemaError::DuplicateField(path));
        }

        let index = self.entries.len();
        self.entries.push(FieldEntry {
            name: name.to_string(),
            children: Vec::new(),
        });
        self.by_path.insert(path.clone(), index);
        self.entries[parent].children.push(index);

        if let FieldDeclaration::Nested { children, .. } = declaration {
            for child in children {
                self.insert(index, &path, child)?;
            }
        }
        Ok(())
    }

    /// Structure of the field at a full path, or `None` if undeclared.
    ///
    /// A field is nested when the schema declares children for it.
    pub fn structure(&self, path: &str) -> Option<FieldKind> {
        if path == ROOT_NAMESPACE {
            return None;
        }
        let entry = &self.entries[*self.by_path.get(path)?];
        Some(if entry.children.is_empty() {
            FieldKind::Atomic
        } else {
            FieldKind::Nested
        })
    }

    pub fn contains(&self, path: &str) -> bool {
        self.structure(path).is_some()
    }

    /// Declared child names under a namespace, in declaration order.
    pub fn children<'a>(&'a self, namespace: &str) -> impl Iterator<Item = &'a str> + use<'a> {
        self.by_path
            .get(namespace)
            .map(|index| self.entries[*index].children.iter())
            .into_iter()
            .flatten()
            .map(|child| self.entries[*child].name.as_str())
    }

    /// Number of declared fields, excluding the root.
    pub fn len(&self) -> usize {
        self.entries.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn people_fields() -> Vec<FieldDeclaration> {
        vec![
            FieldDeclaration::atomic("id"),
            FieldDeclaration::atomic("name"),
            FieldDeclaration::nested(
                "address",
                vec![
                    FieldDeclaration::atomic("city"),
                    FieldDeclaration::nested("geo", vec![FieldDeclaration::atomic("lat")]),
                ],
            ),
        ]
    }

    #[test]
    fn structure_lookup() {
        let tree = FieldTree::from_declarations(&people_fields()).unwrap();

        assert_eq!(tree.structure("$.id"), Some(FieldKind::Atomic));
        assert_eq!(tree.structure("$.address"), Some(FieldKind::Nested));
        assert_eq!(tree.structure("$.address.city"), Some(FieldKind::Atomic));
        assert_eq!(tree.structure("$.address.geo"), Some(FieldKind::Nested));
        assert_eq!(tree.structure("$.address.geo.lat"), Some(FieldKind::Atomic));
        assert_eq!(tree.structure("$.email"), None);
        assert_eq!(tree.structure("$"), None);
        assert_eq!(tree.len(), 6);
    }

    #[test]
    fn children_in_declaration_order() {
        let tree = FieldTree::from_declarations(&people_fields()).unwrap();

        let root: Vec<&str> = tree.children("$").collect();
        assert_eq!(root, vec!["id", "name", "address"]);

        let address: Vec<&str> = tree.children("$.address").collect();
        assert_eq!(address, vec!["city", "geo"]);

        assert_eq!(tree.children("$.nope").count(), 0);
    }

    #[test]
    fn duplicate_siblings_rejected() {
        let declarations = vec![FieldDeclaration::atomic("id"), FieldDeclaration::atomic("id")];
        let err = FieldTree::from_declarations(&declarations).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateField(path) if path == "$.id"));
    }

    #[test]
    fn same_name_in_different_namespaces_allowed() {
        let declarations = vec![
            FieldDeclaration::atomic("name"),
            FieldDeclaration::nested("owner", vec![FieldDeclaration::atomic("name")]),
        ];
        assert!(FieldTree::from_declarations(&declarations).is_ok());
    }

    #[test]
    fn invalid_names_rejected() {
        for bad in ["", "a.b", "a b", "$", "x{y}"] {
            let err = FieldTree::from_declarations(&[FieldDeclaration::atomic(bad)]).unwrap_err();
            assert!(matches!(err, SchemaError::InvalidFieldName(_)), "{bad:?}");
        }
    }
}
