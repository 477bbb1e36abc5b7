//! # listener-mux
//!
//! Multiplexes named groups of event handlers ("pools") onto a single
//! native event source, keeping **at most one** native listener attached
//! per event type and phase no matter how many pools are interested.
//!
//! The native source is anything implementing [`source::EventSource`]
//! (a UI element binding, a message pump, or the in-memory
//! [`source::MemorySource`]). Pools follow the [`domain::HandlerPool`]
//! contract; [`domain::EventPool`] is the default.
//!
//! ## Architecture
//!
//! ```text
//! Application code
//!     │  add_handlers / remove_handlers
//!     ├── DispatchMultiplexer (service/)
//!     │       ├── PoolRegistry ── EventPool … (domain/)
//!     │       └── bindings: one NativeListener per (type, phase)
//!     │
//!     └── EventSource (source/) ── fires ──► fan-out to every pool
//! ```
//!
//! ## Example
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! use listener_mux::domain::{EventType, Handler};
//! use listener_mux::service::DispatchMultiplexer;
//! use listener_mux::source::{MemorySource, Phase};
//!
//! let source = Rc::new(MemorySource::<u32>::new());
//! let mux = DispatchMultiplexer::new(Rc::clone(&source));
//!
//! let clicks = Rc::new(Cell::new(0));
//! let sink = Rc::clone(&clicks);
//! let on_click = Handler::new(move |_: &u32| sink.set(sink.get() + 1));
//!
//! mux.add_handlers("toolbar", "click", vec![on_click.clone()], Phase::Bubble)?;
//! mux.add_handlers("analytics", "click", vec![on_click.clone()], Phase::Bubble)?;
//! assert_eq!(source.listener_count(&EventType::from("click"), Phase::Bubble), 1);
//!
//! source.fire(&EventType::from("click"), &1);
//! assert_eq!(clicks.get(), 2);
//!
//! mux.remove_handlers("toolbar", "click", &[on_click.clone()], Phase::Bubble);
//! mux.remove_handlers("analytics", "click", &[on_click], Phase::Bubble);
//! assert!(!mux.has_handlers());
//! # Ok::<(), listener_mux::error::MuxError>(())
//! ```

pub mod config;
pub mod domain;
pub mod error;
pub mod service;
pub mod source;

pub use config::{MuxConfig, RebindPolicy};
pub use domain::{DuplicatePolicy, EventPool, EventType, Handler, HandlerPool, PoolName};
pub use error::MuxError;
pub use service::{DispatchMultiplexer, MuxSnapshot, WeakMultiplexer};
pub use source::{EventSource, MemorySource, NativeListener, Phase};
