//! Method patterns for request handler registration.
//!
//! A pattern ending in `*` matches every method starting with the text before
//! it. Anything else must match exactly. Patterns are parsed once, at
//! registration.

use std::fmt;

use tether_core::constants::WILDCARD;

/// A parsed method pattern.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum MethodPattern {
    /// Matches one method name.
    Exact(String),
    /// Matches every method name starting with the prefix.
    PrefixWildcard(String),
}

impl MethodPattern {
    /// Parse a registration pattern.
    pub fn parse(pattern: &str) -> Self {
        match pattern.strip_suffix(WILDCARD) {
            Some(prefix) => Self::PrefixWildcard(prefix.to_owned()),
            None => Self::Exact(pattern.to_owned()),
        }
    }

    /// Whether `method` is matched by this pattern.
    pub fn matches(&self, method: &str) -> bool {
        match self {
            Self::Exact(name) => name == method,
            Self::PrefixWildcard(prefix) => method.starts_with(prefix.as_str()),
        }
    }
}

impl From<&str> for MethodPattern {
    fn from(pattern: &str) -> Self {
        Self::parse(pattern)
    }
}

impl fmt::Display for MethodPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(name) => f.write_str(name),
            Self::PrefixWildcard(prefix) => write!(f, "{prefix}{WILDCARD}"),
        }
    }
}
