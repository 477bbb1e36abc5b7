//! Serializable view of a multiplexer's registries.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{Binding, BindingKey, EventType, HandlerPool, PoolName, PoolSlot};
use crate::source::{ListenerId, Phase};

/// Point-in-time copy of a multiplexer's pools and bindings.
#[derive(Debug, Clone, Serialize)]
pub struct MuxSnapshot {
    /// Pools in registration (fan-out) order.
    pub pools: Vec<PoolSummary>,
    /// Native bindings sorted by event type then phase.
    pub bindings: Vec<BindingSummary>,
}

impl MuxSnapshot {
    /// Returns `true` if nothing is registered or bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pools.is_empty() && self.bindings.is_empty()
    }
}

/// Lightweight summary of one pool.
#[derive(Debug, Clone, Serialize)]
pub struct PoolSummary {
    /// Pool name.
    pub name: PoolName,
    /// Registrations across all event types.
    pub handler_count: usize,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last state replacement.
    pub last_modified_at: DateTime<Utc>,
}

impl PoolSummary {
    pub(crate) fn from_slot<E, P: HandlerPool<E>>(slot: &PoolSlot<P>) -> Self {
        Self {
            name: slot.pool.name().clone(),
            handler_count: slot.pool.handler_count(),
            created_at: slot.created_at,
            last_modified_at: slot.last_modified_at,
        }
    }
}

/// Lightweight summary of one native binding.
#[derive(Debug, Clone, Serialize)]
pub struct BindingSummary {
    /// Bound event type.
    pub event_type: EventType,
    /// Bound phase.
    pub phase: Phase,
    /// Identity of the attached native listener.
    pub listener_id: ListenerId,
    /// When the listener was attached.
    pub bound_at: DateTime<Utc>,
}

impl<E> From<(&BindingKey, &Binding<E>)> for BindingSummary {
    fn from((key, binding): (&BindingKey, &Binding<E>)) -> Self {
        Self {
            event_type: key.event_type.clone(),
            phase: key.phase,
            listener_id: binding.listener_id(),
            bound_at: binding.bound_at,
        }
    }
}
