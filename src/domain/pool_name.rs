//! Name of a handler pool.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::MuxError;

/// Caller-chosen name identifying a group of handlers.
///
/// Pools are the unit of bulk add/remove: every handler registered under
/// the same `PoolName` lives in one pool of the multiplexer's registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoolName(String);

impl PoolName {
    /// Creates a validated `PoolName`.
    ///
    /// # Errors
    ///
    /// Returns [`MuxError::EmptyIdentifier`] if `name` is empty or only
    /// whitespace.
    pub fn new(name: impl Into<String>) -> Result<Self, MuxError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(MuxError::EmptyIdentifier { kind: "pool name" });
        }
        Ok(Self(name))
    }

    /// Returns the pool name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the name is empty or only whitespace.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for PoolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PoolName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PoolName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for PoolName {
    fn from(name: String) -> Self {
        Self(name)
    }
}
