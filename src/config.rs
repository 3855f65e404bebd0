//! Parser configuration.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Default limit for nested includes.
pub const DEFAULT_MAX_INCLUDE_DEPTH: usize = 64;

/// Options shared by every parse run of a [`Parser`](crate::Parser).
///
/// Deserializable from any serde format; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserOptions {
    /// Global attributes, consulted after the attributes defined by the document itself.
    pub attributes: HashMap<String, String>,
    /// Maximum nesting of `include::` macros before parsing fails.
    pub max_include_depth: usize,
    /// Encoding handed to the content resolver when an include has no `encoding` option.
    pub default_encoding: Option<String>,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            attributes: HashMap::new(),
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
            default_encoding: None,
        }
    }
}

impl ParserOptions {
    /// Add or replace a global attribute.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Change the include nesting limit.
    #[must_use]
    pub fn with_max_include_depth(mut self, depth: usize) -> Self {
        self.max_include_depth = depth;
        self
    }

    /// Change the encoding passed to the resolver by default.
    #[must_use]
    pub fn with_default_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.default_encoding = Some(encoding.into());
        self
    }
}
