//! Callback handlers and their identity.
//!
//! Closures cannot be compared, so every [`Handler`] carries a
//! [`HandlerId`] minted when it is created. Clones share the id, which is
//! what removal matches on.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

/// Unique identifier of a handler callback.
///
/// Wraps a UUID v4. Generated once by [`Handler::new`] and shared by every
/// clone of that handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandlerId(uuid::Uuid);

impl HandlerId {
    /// Creates a new random `HandlerId` (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for HandlerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A callback invoked with each event dispatched to its pool.
///
/// Cheap to clone (reference-counted). Equality is identity: two handlers
/// are equal iff they share a [`HandlerId`].
pub struct Handler<E> {
    id: HandlerId,
    callback: Rc<dyn Fn(&E)>,
}

impl<E> Handler<E> {
    /// Wraps `callback` in a new handler with a fresh id.
    pub fn new(callback: impl Fn(&E) + 'static) -> Self {
        Self {
            id: HandlerId::new(),
            callback: Rc::new(callback),
        }
    }

    /// Returns the handler's identity.
    #[must_use]
    pub const fn id(&self) -> HandlerId {
        self.id
    }

    /// Invokes the callback.
    pub fn call(&self, event: &E) {
        (self.callback)(event);
    }
}

impl<E> Clone for Handler<E> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            callback: Rc::clone(&self.callback),
        }
    }
}

impl<E> PartialEq for Handler<E> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<E> Eq for Handler<E> {}

impl<E> fmt::Debug for Handler<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler").field("id", &self.id).finish_non_exhaustive()
    }
}
