//! Branded ID newtypes for type safety.
//!
//! The transport juggles two kinds of string identity: the stable name the
//! application picked for a remote peer, and the URL currently serving it.
//! Both are newtype wrappers around `String` so they cannot be mixed up.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! branded_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create from an existing string value.
            #[must_use]
            pub fn from_string(s: String) -> Self {
                Self(s)
            }

            /// Return the inner string as a slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume self and return the inner `String`.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

branded_id! {
    /// Application-stable identifier for a remote peer.
    ///
    /// Chosen by the caller and unchanged across reconnects, even when the
    /// physical address serving it changes.
    LogicalEndpoint
}

branded_id! {
    /// Concrete transport URL currently used to reach a [`LogicalEndpoint`].
    PhysicalAddress
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_string() {
        let id = LogicalEndpoint::from_string("ws-agent".to_owned());
        assert_eq!(id.as_str(), "ws-agent");
    }

    #[test]
    fn from_str_ref() {
        let addr = PhysicalAddress::from("ws://localhost:8080/api");
        assert_eq!(addr.as_str(), "ws://localhost:8080/api");
    }

    #[test]
    fn deref_to_str() {
        let id = LogicalEndpoint::from("hello");
        let s: &str = &id;
        assert_eq!(s, "hello");
    }

    #[test]
    fn display() {
        let addr = PhysicalAddress::from("ws://h/p?token=abc");
        assert_eq!(format!("{addr}"), "ws://h/p?token=abc");
    }

    #[test]
    fn into_string() {
        let id = LogicalEndpoint::from("convert");
        let s: String = id.into();
        assert_eq!(s, "convert");
    }

    #[test]
    fn serde_is_transparent() {
        let id = LogicalEndpoint::from("agent");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"agent\"");
        let back: LogicalEndpoint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn hash_and_eq() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        let addr = PhysicalAddress::from("same");
        let _ = set.insert(addr.clone());
        let _ = set.insert(addr);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn into_inner() {
        let id = LogicalEndpoint::from("inner-test");
        assert_eq!(id.into_inner(), "inner-test");
    }
}
