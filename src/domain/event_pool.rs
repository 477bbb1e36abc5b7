//! Handler pools: named groups of callbacks keyed by event type and phase.
//!
//! A handler registered for the capture phase and one registered for the
//! bubble phase of the same event type live in separate lists, so each
//! fires only from the native listener of its own phase.
//!
//! [`HandlerPool`] is the contract the multiplexer consumes. Updates take
//! the pool by value and return its new state, so an implementation may
//! mutate in place or build a fresh value; the multiplexer stores whatever
//! comes back. [`EventPool`] is the default implementation.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{BindingKey, Handler, PoolName};
use crate::error::MuxError;

/// What a pool does when a handler already registered for an event type
/// is added again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Keep the existing registration; the handler fires once per event.
    #[default]
    Ignore,
    /// Register it again; the handler fires once per registration.
    Allow,
}

impl FromStr for DuplicatePolicy {
    type Err = MuxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ignore" => Ok(Self::Ignore),
            "allow" => Ok(Self::Allow),
            _ => Err(MuxError::InvalidConfig {
                key: "MUX_DUPLICATE_HANDLERS",
                value: s.to_string(),
            }),
        }
    }
}

/// Contract for a named group of handlers.
pub trait HandlerPool<E>: Clone {
    /// Creates a pool seeded with `handlers` for `key`.
    fn create_by_type(
        name: PoolName,
        key: BindingKey,
        handlers: Vec<Handler<E>>,
        policy: DuplicatePolicy,
    ) -> Self;

    /// The pool's name.
    fn name(&self) -> &PoolName;

    /// Returns the pool with `handlers` merged into `key`'s list.
    #[must_use]
    fn add_handlers(self, key: &BindingKey, handlers: Vec<Handler<E>>) -> Self;

    /// Returns the pool with `handlers` removed from `key`'s list.
    ///
    /// Handlers that are not registered are ignored.
    #[must_use]
    fn remove_handlers(self, key: &BindingKey, handlers: &[Handler<E>]) -> Self;

    /// `true` iff at least one handler is registered for any key.
    fn has_handlers(&self) -> bool;

    /// `true` iff at least one handler is registered for `key`.
    fn has_handlers_for(&self, key: &BindingKey) -> bool;

    /// Total number of registrations across all keys.
    fn handler_count(&self) -> usize;

    /// Invokes every handler registered for `key`, in registration order.
    /// No-op when none are registered.
    fn dispatch_event(&self, key: &BindingKey, event: &E);
}

/// Default [`HandlerPool`] implementation.
///
/// The handler table is shared copy-on-write, so cloning a pool (as the
/// multiplexer does for every fan-out) never copies handler lists, and
/// updating a pool never disturbs clones taken earlier.
pub struct EventPool<E> {
    name: PoolName,
    policy: DuplicatePolicy,
    handlers: Rc<HashMap<BindingKey, Vec<Handler<E>>>>,
}

impl<E> EventPool<E> {
    /// Keys that currently have handlers, sorted by event type then phase.
    #[must_use]
    pub fn keys(&self) -> Vec<&BindingKey> {
        let mut keys: Vec<&BindingKey> = self.handlers.keys().collect();
        keys.sort();
        keys
    }

    /// Handlers registered for `key`, in registration order.
    #[must_use]
    pub fn handlers_for(&self, key: &BindingKey) -> &[Handler<E>] {
        self.handlers
            .get(key)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// The duplicate policy the pool was created with.
    #[must_use]
    pub const fn policy(&self) -> DuplicatePolicy {
        self.policy
    }
}

impl<E> HandlerPool<E> for EventPool<E> {
    fn create_by_type(
        name: PoolName,
        key: BindingKey,
        handlers: Vec<Handler<E>>,
        policy: DuplicatePolicy,
    ) -> Self {
        let pool = Self {
            name,
            policy,
            handlers: Rc::new(HashMap::new()),
        };
        pool.add_handlers(&key, handlers)
    }

    fn name(&self) -> &PoolName {
        &self.name
    }

    fn add_handlers(mut self, key: &BindingKey, handlers: Vec<Handler<E>>) -> Self {
        if handlers.is_empty() {
            return self;
        }
        let policy = self.policy;
        let list = Rc::make_mut(&mut self.handlers)
            .entry(key.clone())
            .or_default();
        for handler in handlers {
            if policy == DuplicatePolicy::Ignore && list.contains(&handler) {
                continue;
            }
            list.push(handler);
        }
        self
    }

    fn remove_handlers(mut self, key: &BindingKey, handlers: &[Handler<E>]) -> Self {
        let affected = self
            .handlers
            .get(key)
            .is_some_and(|list| list.iter().any(|h| handlers.contains(h)));
        if !affected {
            return self;
        }
        let table = Rc::make_mut(&mut self.handlers);
        if let Some(list) = table.get_mut(key) {
            list.retain(|h| !handlers.contains(h));
            if list.is_empty() {
                table.remove(key);
            }
        }
        self
    }

    fn has_handlers(&self) -> bool {
        self.handlers.values().any(|list| !list.is_empty())
    }

    fn has_handlers_for(&self, key: &BindingKey) -> bool {
        self.handlers
            .get(key)
            .is_some_and(|list| !list.is_empty())
    }

    fn handler_count(&self) -> usize {
        self.handlers.values().map(Vec::len).sum()
    }

    fn dispatch_event(&self, key: &BindingKey, event: &E) {
        for handler in self.handlers_for(key) {
            handler.call(event);
        }
    }
}

impl<E> Clone for EventPool<E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            policy: self.policy,
            handlers: Rc::clone(&self.handlers),
        }
    }
}

impl<E> fmt::Debug for EventPool<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventPool")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .field("keys", &self.keys())
            .field("handler_count", &self.handler_count())
            .finish()
    }
}
