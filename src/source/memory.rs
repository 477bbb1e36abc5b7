//! In-memory native event source.
//!
//! [`MemorySource`] behaves like a DOM element's listener list: listeners
//! are kept per event type and phase in attach order, adding the same
//! listener twice is idempotent and removing an unknown one is a no-op.
//! Useful for headless hosts and for exercising a multiplexer in tests.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;

use super::{EventSource, NativeListener, Phase};
use crate::domain::EventType;

#[derive(Debug)]
struct Attached<E> {
    event_type: EventType,
    phase: Phase,
    listener: NativeListener<E>,
}

/// Single-threaded in-memory event source.
#[derive(Debug)]
pub struct MemorySource<E> {
    listeners: RefCell<Vec<Attached<E>>>,
    supported: Option<HashSet<EventType>>,
    add_calls: Cell<usize>,
    remove_calls: Cell<usize>,
}

impl<E> MemorySource<E> {
    /// Creates a source that accepts every event type.
    #[must_use]
    pub fn new() -> Self {
        Self {
            listeners: RefCell::new(Vec::new()),
            supported: None,
            add_calls: Cell::new(0),
            remove_calls: Cell::new(0),
        }
    }

    /// Creates a source that only recognizes the given event types.
    #[must_use]
    pub fn with_supported<I, T>(types: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<EventType>,
    {
        Self {
            supported: Some(types.into_iter().map(Into::into).collect()),
            ..Self::new()
        }
    }

    /// Fires `event` at every listener attached for `event_type`.
    ///
    /// Capture-phase listeners run before bubble-phase ones, each group in
    /// attach order. The listener list is snapshotted first: a listener
    /// attached while the event is being delivered waits for the next
    /// event, and one detached before its turn is skipped.
    ///
    /// Returns the number of listeners invoked.
    pub fn fire(&self, event_type: &EventType, event: &E) -> usize {
        let snapshot: Vec<(Phase, NativeListener<E>)> = {
            let listeners = self.listeners.borrow();
            let capture = listeners
                .iter()
                .filter(|a| a.phase == Phase::Capture && &a.event_type == event_type);
            let bubble = listeners
                .iter()
                .filter(|a| a.phase == Phase::Bubble && &a.event_type == event_type);
            capture
                .chain(bubble)
                .map(|a| (a.phase, a.listener.clone()))
                .collect()
        };
        let mut invoked = 0;
        for (phase, listener) in &snapshot {
            if !self.is_attached(event_type, listener, *phase) {
                continue;
            }
            listener.invoke(event);
            invoked += 1;
        }
        invoked
    }

    fn is_attached(&self, event_type: &EventType, listener: &NativeListener<E>, phase: Phase) -> bool {
        self.listeners.borrow().iter().any(|a| {
            a.listener.id() == listener.id() && a.phase == phase && &a.event_type == event_type
        })
    }

    /// Number of listeners attached for `event_type` in `phase`.
    #[must_use]
    pub fn listener_count(&self, event_type: &EventType, phase: Phase) -> usize {
        self.listeners
            .borrow()
            .iter()
            .filter(|a| a.phase == phase && &a.event_type == event_type)
            .count()
    }

    /// Total number of attached listeners across all types and phases.
    #[must_use]
    pub fn total_listeners(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Number of `add_listener` calls received so far.
    #[must_use]
    pub fn add_calls(&self) -> usize {
        self.add_calls.get()
    }

    /// Number of `remove_listener` calls received so far.
    #[must_use]
    pub fn remove_calls(&self) -> usize {
        self.remove_calls.get()
    }
}

impl<E> Default for MemorySource<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EventSource<E> for MemorySource<E> {
    fn add_listener(&self, event_type: &EventType, listener: &NativeListener<E>, phase: Phase) {
        self.add_calls.set(self.add_calls.get() + 1);
        if !self.is_attached(event_type, listener, phase) {
            self.listeners.borrow_mut().push(Attached {
                event_type: event_type.clone(),
                phase,
                listener: listener.clone(),
            });
        }
    }

    fn remove_listener(&self, event_type: &EventType, listener: &NativeListener<E>, phase: Phase) {
        self.remove_calls.set(self.remove_calls.get() + 1);
        self.listeners.borrow_mut().retain(|a| {
            !(a.listener.id() == listener.id() && a.phase == phase && &a.event_type == event_type)
        });
    }

    fn supports(&self, event_type: &EventType) -> bool {
        self.supported
            .as_ref()
            .is_none_or(|types| types.contains(event_type))
    }
}
