//! Raw request parameters.
//!
//! Parameters arrive either as a JSON object or as a URL query string. Query
//! strings use bracket notation for nesting:
//!
//! ```text
//! select=id,name&filter[age][between][]=18&filter[age][between][]=30&limit=10
//! ```
//!
//! decodes to
//!
//! ```json
//! {"select": "id,name", "filter": {"age": {"between": ["18", "30"]}}, "limit": "10"}
//! ```
//!
//! When a scalar key repeats, the last occurrence wins.

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::InputError;

/// Request parameters keyed by name, in the order they were given.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestInput {
    params: Map<String, Value>,
}

impl RequestInput {
    /// Empty input.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a JSON object.
    pub fn from_json(value: Value) -> Result<Self, InputError> {
        match value {
            Value::Object(params) => Ok(Self { params }),
            _ => Err(InputError::NotAnObject),
        }
    }

    /// Parse a JSON request body.
    pub fn from_json_str(body: &str) -> Result<Self, InputError> {
        Self::from_json(serde_json::from_str(body)?)
    }

    /// Decode a URL query string (leading `?` optional).
    pub fn from_query_string(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut params = Map::new();

        for pair in query.split('&').filter(|pair| !pair.is_empty()) {
            let (raw_key, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = decode_component(raw_key);
            let Some(path) = parse_key_path(&key) else {
                debug!(key = %key, "ignoring malformed query parameter");
                continue;
            };
            insert_path(&mut params, &path, decode_component(raw_value));
        }

        Self { params }
    }

    /// Set a parameter, replacing any previous value.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.params
    }
}

impl From<Map<String, Value>> for RequestInput {
    fn from(params: Map<String, Value>) -> Self {
        Self { params }
    }
}

/// Percent-decode one query component, treating `+` as a space.
fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

/// Split `filter[age][between][]` into `["filter", "age", "between", ""]`.
///
/// Returns `None` for keys without a base name or with unbalanced brackets.
fn parse_key_path(key: &str) -> Option<Vec<String>> {
    let Some(open) = key.find('[') else {
        return (!key.is_empty()).then(|| vec![key.to_string()]);
    };

    let base = &key[..open];
    if base.is_empty() {
        return None;
    }

    let mut path = vec![base.to_string()];
    let mut rest = &key[open..];
    while !rest.is_empty() {
        let inner = rest.strip_prefix('[')?;
        let close = inner.find(']')?;
        path.push(inner[..close].to_string());
        rest = &inner[close + 1..];
    }
    Some(path)
}

/// Insert a decoded value at a key path. A trailing empty segment appends to
/// a list; a type conflict with an earlier parameter is resolved in favour of
/// the later one.
fn insert_path(params: &mut Map<String, Value>, path: &[String], value: String) {
    let Some((head, rest)) = path.split_first() else {
        return;
    };

    match rest {
        [] => {
            params.insert(head.clone(), Value::String(value));
        }
        [last] if last.is_empty() => {
            let entry = params
                .entry(head.clone())
                .or_insert_with(|| Value::Array(Vec::new()));
            match entry {
                Value::Array(items) => items.push(Value::String(value)),
                other => *other = Value::Array(vec![Value::String(value)]),
            }
        }
        _ => {
            let entry = params
                .entry(head.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(child) = entry {
                insert_path(child, rest, value);
            }
        }
    }
}
