//! Native event source contract.
//!
//! An [`EventSource`] is the external object (typically a UI element) that
//! natively attaches listeners and fires events to them. The multiplexer
//! only ever attaches [`NativeListener`]s it created itself, and always
//! detaches before re-attaching, so sources never see a double add from it.

pub mod memory;

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::domain::EventType;

pub use memory::MemorySource;

/// Propagation phase a listener is attached for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Listener runs while the event bubbles up (`useCapture = false`).
    #[default]
    Bubble,
    /// Listener runs while the event is captured down (`useCapture = true`).
    Capture,
}

impl Phase {
    /// Maps a DOM-style `useCapture` flag to a phase.
    #[must_use]
    pub const fn from_capture(use_capture: bool) -> Self {
        if use_capture {
            Self::Capture
        } else {
            Self::Bubble
        }
    }

    /// Returns `true` for [`Phase::Capture`].
    #[must_use]
    pub const fn is_capture(self) -> bool {
        matches!(self, Self::Capture)
    }
}

impl From<bool> for Phase {
    fn from(use_capture: bool) -> Self {
        Self::from_capture(use_capture)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bubble => f.write_str("bubble"),
            Self::Capture => f.write_str("capture"),
        }
    }
}

/// Identity of a native listener handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListenerId(uuid::Uuid);

impl ListenerId {
    /// Creates a new random `ListenerId` (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for ListenerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque listener handle attached to a native source.
///
/// Sources compare listeners by [`NativeListener::id`] when detaching.
pub struct NativeListener<E> {
    id: ListenerId,
    callback: Rc<dyn Fn(&E)>,
}

impl<E> NativeListener<E> {
    /// Wraps `callback` in a listener with a fresh id.
    pub fn new(callback: impl Fn(&E) + 'static) -> Self {
        Self {
            id: ListenerId::new(),
            callback: Rc::new(callback),
        }
    }

    /// Returns the listener's identity.
    #[must_use]
    pub const fn id(&self) -> ListenerId {
        self.id
    }

    /// Delivers `event` to the listener.
    pub fn invoke(&self, event: &E) {
        (self.callback)(event);
    }
}

impl<E> Clone for NativeListener<E> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            callback: Rc::clone(&self.callback),
        }
    }
}

impl<E> fmt::Debug for NativeListener<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeListener")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// A native event source the multiplexer attaches listeners to.
///
/// The source is owned by the caller; the multiplexer holds whatever `S`
/// it is given, which is usually `&T` or `Rc<T>` (both implement this
/// trait when `T` does).
pub trait EventSource<E> {
    /// Attaches `listener` for `event_type` in `phase`.
    fn add_listener(&self, event_type: &EventType, listener: &NativeListener<E>, phase: Phase);

    /// Detaches `listener`. Detaching an unknown listener is a no-op.
    fn remove_listener(&self, event_type: &EventType, listener: &NativeListener<E>, phase: Phase);

    /// Returns whether the source can fire `event_type` at all.
    fn supports(&self, _event_type: &EventType) -> bool {
        true
    }
}

impl<E, T: EventSource<E> + ?Sized> EventSource<E> for &T {
    fn add_listener(&self, event_type: &EventType, listener: &NativeListener<E>, phase: Phase) {
        (**self).add_listener(event_type, listener, phase);
    }

    fn remove_listener(&self, event_type: &EventType, listener: &NativeListener<E>, phase: Phase) {
        (**self).remove_listener(event_type, listener, phase);
    }

    fn supports(&self, event_type: &EventType) -> bool {
        (**self).supports(event_type)
    }
}

impl<E, T: EventSource<E> + ?Sized> EventSource<E> for Rc<T> {
    fn add_listener(&self, event_type: &EventType, listener: &NativeListener<E>, phase: Phase) {
        (**self).add_listener(event_type, listener, phase);
    }

    fn remove_listener(&self, event_type: &EventType, listener: &NativeListener<E>, phase: Phase) {
        (**self).remove_listener(event_type, listener, phase);
    }

    fn supports(&self, event_type: &EventType) -> bool {
        (**self).supports(event_type)
    }
}
