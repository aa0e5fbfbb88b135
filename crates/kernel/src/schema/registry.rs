//! Component registry: which query capabilities a resource exposes.
//!
//! The capability set is resolved once, when a schema is built, from the
//! sections the definition declares. Lookups are pure.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An optional query feature a resource may enable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    FieldSelector,
    Filter,
    OffsetPaginator,
    Sort,
    Search,
}

impl Capability {
    /// Every capability, in the order the aggregator runs them.
    pub const ALL: [Capability; 5] = [
        Capability::FieldSelector,
        Capability::Filter,
        Capability::OffsetPaginator,
        Capability::Sort,
        Capability::Search,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Capability::FieldSelector => "field_selector",
            Capability::Filter => "filter",
            Capability::OffsetPaginator => "offset_paginator",
            Capability::Sort => "sort",
            Capability::Search => "search",
        }
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static set of enabled capabilities for one resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComponentRegistry {
    enabled: u8,
}

impl ComponentRegistry {
    /// Registry with nothing enabled.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with exactly the given capabilities enabled.
    pub fn from_capabilities(capabilities: impl IntoIterator<Item = Capability>) -> Self {
        let enabled = capabilities
            .into_iter()
            .fold(0u8, |acc, capability| acc | capability.bit());
        Self { enabled }
    }

    /// Whether a capability parser is configured for this resource.
    pub fn is_enabled(&self, capability: Capability) -> bool {
        self.enabled & capability.bit() != 0
    }

    /// Enabled capabilities in run order.
    pub fn enabled(&self) -> impl Iterator<Item = Capability> + '_ {
        Capability::ALL
            .into_iter()
            .filter(|capability| self.is_enabled(*capability))
    }

    pub fn is_empty(&self) -> bool {
        self.enabled == 0
    }
}
