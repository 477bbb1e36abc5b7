//! Native binding records.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::EventType;
use crate::source::{ListenerId, NativeListener, Phase};

/// Key of the binding registry: one native listener per event type and
/// phase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BindingKey {
    /// Native event type.
    pub event_type: EventType,
    /// Propagation phase the listener is attached for.
    pub phase: Phase,
}

impl BindingKey {
    /// Creates a key for `event_type` in `phase`.
    #[must_use]
    pub const fn new(event_type: EventType, phase: Phase) -> Self {
        Self { event_type, phase }
    }
}

impl fmt::Display for BindingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.event_type, self.phase)
    }
}

/// Record of a native listener currently attached to the source.
#[derive(Debug)]
pub struct Binding<E> {
    /// The attached listener; the same handle is passed back on detach.
    pub listener: NativeListener<E>,
    /// When the listener was attached.
    pub bound_at: DateTime<Utc>,
}

impl<E> Binding<E> {
    /// Records `listener` as attached now.
    #[must_use]
    pub fn new(listener: NativeListener<E>) -> Self {
        Self {
            listener,
            bound_at: Utc::now(),
        }
    }

    /// Identity of the attached listener.
    #[must_use]
    pub const fn listener_id(&self) -> ListenerId {
        self.listener.id()
    }
}
