//! Multiplexer error types with stable numeric codes.
//!
//! [`MuxError`] is the central error type for the crate. Only registration
//! and configuration can fail; removal is always a no-op on unknown input.

use crate::domain::EventType;

/// Error enum for handler registration and configuration.
///
/// # Error Code Ranges
///
/// | Range     | Category      |
/// |-----------|---------------|
/// | 1000–1999 | Validation    |
/// | 2000–2999 | Native source |
/// | 3000–3999 | Configuration |
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MuxError {
    /// A pool name or event type was empty or whitespace only.
    #[error("{kind} must not be empty")]
    EmptyIdentifier {
        /// Which identifier was empty (`"pool name"`, `"event type"`).
        kind: &'static str,
    },

    /// `add_handlers` was called with an empty handler list.
    #[error("at least one handler is required")]
    NoHandlers,

    /// The native source does not recognize the event type.
    #[error("event type not supported by the native source: {0}")]
    UnsupportedEventType(EventType),

    /// A configuration variable held an unrecognized value.
    #[error("invalid value for {key}: {value:?}")]
    InvalidConfig {
        /// Environment variable name.
        key: &'static str,
        /// The rejected raw value.
        value: String,
    },
}

impl MuxError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::EmptyIdentifier { .. } => 1001,
            Self::NoHandlers => 1002,
            Self::UnsupportedEventType(_) => 2001,
            Self::InvalidConfig { .. } => 3001,
        }
    }
}
