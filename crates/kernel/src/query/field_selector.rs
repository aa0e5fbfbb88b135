//! Field selection parsing.
//!
//! Accepts comma separated dot paths rooted at `$` (`$.id,name,address.city`)
//! with optional brace grouping (`address{city,zip}`), or a list of such
//! expressions. Paths that the schema does not declare are dropped without
//! an error.

use serde_json::Value;
use tracing::debug;

use super::CapabilityParser;
use super::input::RequestInput;
use super::types::{FieldKind, FieldSelection, NAMESPACE_SEPARATOR, ROOT_NAMESPACE, join_path};
use crate::error::{ErrorKind, ErrorReport};
use crate::schema::{Capability, ResourceSchema};

/// Parses the field selection parameter against the declared field tree.
pub struct FieldSelector<'a> {
    schema: &'a ResourceSchema,
}

impl<'a> FieldSelector<'a> {
    pub fn new(schema: &'a ResourceSchema) -> Self {
        Self { schema }
    }

    /// Resolve one path against the schema. Returns `None` if any segment
    /// is undeclared.
    fn resolve(&self, segments: &[String]) -> Option<Vec<(String, FieldKind)>> {
        let mut namespace = ROOT_NAMESPACE.to_string();
        let mut resolved = Vec::with_capacity(segments.len());
        for segment in segments {
            namespace = join_path(&namespace, segment);
            let kind = self.schema.fields().structure(&namespace)?;
            resolved.push((segment.clone(), kind));
        }
        Some(resolved)
    }

    fn select_expression(
        &self,
        expression: &str,
        selection: &mut FieldSelection,
        errors: &mut ErrorReport,
    ) {
        let paths = match parse_selection(expression) {
            Ok(paths) => paths,
            Err(message) => {
                errors.record(
                    Capability::FieldSelector,
                    &self.schema.params().select,
                    ErrorKind::InvalidFieldSelection,
                    message,
                );
                return;
            }
        };

        for path in paths {
            match self.resolve(&path) {
                Some(resolved) => selection.insert(&resolved),
                None => debug!(
                    resource = %self.schema.resource(),
                    path = %path.join("."),
                    "skipping undeclared field"
                ),
            }
        }
    }
}

impl CapabilityParser for FieldSelector<'_> {
    type Output = FieldSelection;

    fn capability(&self) -> Capability {
        Capability::FieldSelector
    }

    fn parse(&self, input: &RequestInput, errors: &mut ErrorReport) -> FieldSelection {
        let key = &self.schema.params().select;
        let mut selection = FieldSelection::default();

        match input.get(key) {
            None | Some(Value::Null) => {}
            Some(Value::String(expression)) => {
                self.select_expression(expression, &mut selection, errors);
            }
            Some(Value::Array(items)) => {
                for item in items {
                    match item.as_str() {
                        Some(expression) => {
                            self.select_expression(expression, &mut selection, errors);
                        }
                        None => errors.record(
                            Capability::FieldSelector,
                            key,
                            ErrorKind::InvalidFieldSelection,
                            format!("expected a field path, got {item}"),
                        ),
                    }
                }
            }
            Some(other) => errors.record(
                Capability::FieldSelector,
                key,
                ErrorKind::InvalidFieldSelection,
                format!("expected a field selection string or list, got {other}"),
            ),
        }

        selection
    }
}

/// Split a selection expression into paths of segments.
///
/// `$.id,address{city,geo.lat}` yields `[id]`, `[address, city]`,
/// `[address, geo, lat]`. Empty items are skipped.
fn parse_selection(expression: &str) -> Result<Vec<Vec<String>>, String> {
    let mut paths = Vec::new();
    // Prefix segments for each open brace group; the bottom entry is the root.
    let mut groups: Vec<Vec<String>> = vec![Vec::new()];
    let mut current = String::new();
    let mut group_closed = false;

    for (position, c) in expression.char_indices() {
        match c {
            ',' => {
                flush(&mut current, &groups, &mut paths)?;
                group_closed = false;
            }
            '{' => {
                let prefix = group_prefix(&current, &groups)?
                    .ok_or_else(|| format!("group without a field name at {position}"))?;
                current.clear();
                groups.push(prefix);
            }
            '}' => {
                flush(&mut current, &groups, &mut paths)?;
                if groups.len() == 1 {
                    return Err(format!("unexpected `}}` at {position}"));
                }
                groups.pop();
                group_closed = true;
            }
            // Whitespace only separates items; inside a name it is kept.
            c if c.is_whitespace() && (current.is_empty() || group_closed) => {}
            c => {
                if group_closed {
                    return Err(format!("expected `,` after group at {position}"));
                }
                current.push(c);
            }
        }
    }

    flush(&mut current, &groups, &mut paths)?;
    if groups.len() > 1 {
        return Err("unclosed `{` in field selection".to_string());
    }
    Ok(paths)
}

/// Full segment list for the pending item, or `None` if it is empty.
fn group_prefix(current: &str, groups: &[Vec<String>]) -> Result<Option<Vec<String>>, String> {
    let current = current.trim_end();
    if current.is_empty() {
        return Ok(None);
    }

    let mut segments: Vec<&str> = current.split(NAMESPACE_SEPARATOR).collect();
    if groups.len() == 1 && segments.first() == Some(&ROOT_NAMESPACE) {
        segments.remove(0);
    }
    if segments.iter().any(|segment| segment.is_empty()) {
        return Err(format!("empty path segment in `{current}`"));
    }
    if segments.is_empty() {
        return Ok(None);
    }

    let mut path = groups.last().cloned().unwrap_or_default();
    path.extend(segments.into_iter().map(str::to_string));
    Ok(Some(path))
}

fn flush(
    current: &mut String,
    groups: &[Vec<String>],
    paths: &mut Vec<Vec<String>>,
) -> Result<(), String> {
    if let Some(path) = group_prefix(current.as_str(), groups)? {
        paths.push(path);
    }
    current.clear();
    Ok(())
}
