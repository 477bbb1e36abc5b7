//! Service layer: the listener multiplexer.
//!
//! [`DispatchMultiplexer`] coordinates the pool registry and the native
//! binding registry on top of one [`crate::source::EventSource`].

pub mod multiplexer;
pub mod snapshot;

pub use multiplexer::{DispatchMultiplexer, WeakMultiplexer};
pub use snapshot::{BindingSummary, MuxSnapshot, PoolSummary};
