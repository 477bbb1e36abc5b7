//! Multiplexer configuration loaded from environment variables.
//!
//! All settings have defaults; `MuxConfig::from_env` only overrides what is
//! set (directly or through a `.env` file read by `dotenvy`).
//!
//! | Variable                 | Values                       | Default  |
//! |--------------------------|------------------------------|----------|
//! | `MUX_REBIND_POLICY`      | `always`, `skip-unchanged`   | `always` |
//! | `MUX_DUPLICATE_HANDLERS` | `ignore`, `allow`            | `ignore` |

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::DuplicatePolicy;
use crate::error::MuxError;

/// How the multiplexer refreshes a native binding after a mutation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RebindPolicy {
    /// Detach and re-attach the listener on every add/remove.
    #[default]
    Always,
    /// Leave the listener alone when interest in its event type is
    /// unchanged; attach or detach only on a transition.
    SkipUnchanged,
}

impl FromStr for RebindPolicy {
    type Err = MuxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "always" => Ok(Self::Always),
            "skip-unchanged" | "skip_unchanged" => Ok(Self::SkipUnchanged),
            _ => Err(MuxError::InvalidConfig {
                key: "MUX_REBIND_POLICY",
                value: s.to_string(),
            }),
        }
    }
}

/// Per-multiplexer configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MuxConfig {
    /// Native binding refresh strategy.
    pub rebind_policy: RebindPolicy,

    /// Duplicate-handler policy handed to every pool the multiplexer
    /// creates.
    pub duplicate_policy: DuplicatePolicy,
}

impl MuxConfig {
    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`MuxError::InvalidConfig`] if a variable is set to an
    /// unrecognized value.
    pub fn from_env() -> Result<Self, MuxError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            rebind_policy: parse_env("MUX_REBIND_POLICY")?.unwrap_or_default(),
            duplicate_policy: parse_env("MUX_DUPLICATE_HANDLERS")?.unwrap_or_default(),
        })
    }

    /// Sets the rebind policy.
    #[must_use]
    pub const fn with_rebind_policy(mut self, policy: RebindPolicy) -> Self {
        self.rebind_policy = policy;
        self
    }

    /// Sets the duplicate-handler policy.
    #[must_use]
    pub const fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }
}

/// Parses an environment variable as `T`. A missing or empty variable is
/// `Ok(None)`; a value `T` rejects is an error.
fn parse_env<T>(key: &str) -> Result<Option<T>, MuxError>
where
    T: FromStr<Err = MuxError>,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw.parse().map(Some),
        _ => Ok(None),
    }
}
