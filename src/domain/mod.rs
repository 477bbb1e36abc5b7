//! Domain layer: identifiers, handlers, pools and binding records.
//!
//! This module contains the types the multiplexer is built from: event
//! type and pool names, handler callbacks with identity, the handler pool
//! contract with its default implementation, the ordered pool registry,
//! and the record of a native listener binding.

pub mod binding;
pub mod event_pool;
pub mod event_type;
pub mod handler;
pub mod pool_name;
pub mod pool_registry;

pub use binding::{Binding, BindingKey};
pub use event_pool::{DuplicatePolicy, EventPool, HandlerPool};
pub use event_type::EventType;
pub use handler::{Handler, HandlerId};
pub use pool_name::PoolName;
pub use pool_registry::{PoolRegistry, PoolSlot, SlotChange};
