//! Type-safe event type name.
//!
//! [`EventType`] is a newtype around the native event name (`"click"`,
//! `"keydown"`, ...) so it cannot be confused with a pool name.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::MuxError;

/// Name of a native event type.
///
/// Used as the key of a pool's handler table and, together with a
/// [`crate::source::Phase`], of the multiplexer's binding registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventType(String);

impl EventType {
    /// Creates a validated `EventType`.
    ///
    /// # Errors
    ///
    /// Returns [`MuxError::EmptyIdentifier`] if `name` is empty or only
    /// whitespace.
    pub fn new(name: impl Into<String>) -> Result<Self, MuxError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(MuxError::EmptyIdentifier { kind: "event type" });
        }
        Ok(Self(name))
    }

    /// Returns the event name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the name is empty or only whitespace.
    ///
    /// Only reachable through the unchecked `From` conversions.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EventType {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EventType {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for EventType {
    fn from(name: String) -> Self {
        Self(name)
    }
}
