//! Listener multiplexer: many named pools, one native listener per event
//! type and phase.
//!
//! Every add/remove recomputes whether any pool is still interested in
//! the affected event type and phase, and attaches or detaches the single
//! native listener accordingly. The listener fans each fired event out to every
//! registered pool in registration order.
//!
//! # Reentrancy
//!
//! All state sits behind `RefCell`s that are never borrowed while a
//! handler runs. Fan-out iterates a snapshot of the pool registry taken
//! when the event arrives, so a handler may add or remove handlers on the
//! same multiplexer: the change applies from the next event on.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use super::snapshot::{BindingSummary, MuxSnapshot, PoolSummary};
use crate::config::{MuxConfig, RebindPolicy};
use crate::domain::{
    Binding, BindingKey, EventPool, EventType, Handler, HandlerPool, PoolName, PoolRegistry,
    SlotChange,
};
use crate::error::MuxError;
use crate::source::{EventSource, NativeListener, Phase};

type SharedPools<P> = Rc<RefCell<PoolRegistry<P>>>;

struct Inner<E, S: EventSource<E>, P> {
    source: S,
    config: MuxConfig,
    pools: SharedPools<P>,
    bindings: RefCell<HashMap<BindingKey, Binding<E>>>,
}

impl<E, S: EventSource<E>, P> Drop for Inner<E, S, P> {
    fn drop(&mut self) {
        let bindings = self.bindings.get_mut();
        if bindings.is_empty() {
            return;
        }
        tracing::debug!(bindings = bindings.len(), "multiplexer dropped, detaching listeners");
        for (key, binding) in bindings.drain() {
            self.source
                .remove_listener(&key.event_type, &binding.listener, key.phase);
        }
    }
}

/// Multiplexes named handler pools onto one native event source.
///
/// The handle is cheap to clone; clones share the same registries. Handlers
/// that need to mutate the multiplexer should capture a
/// [`WeakMultiplexer`] (see [`DispatchMultiplexer::downgrade`]) rather than
/// a clone, since a clone stored in a handler keeps the multiplexer alive.
///
/// Dropping the last handle detaches every native listener.
pub struct DispatchMultiplexer<E, S: EventSource<E>, P = EventPool<E>> {
    inner: Rc<Inner<E, S, P>>,
}

impl<E: 'static, S: EventSource<E>> DispatchMultiplexer<E, S> {
    /// Creates a multiplexer over `source` with the default configuration
    /// and [`EventPool`] pools.
    #[must_use]
    pub fn new(source: S) -> Self {
        Self::with_config(source, MuxConfig::default())
    }

    /// Creates a multiplexer over `source` with [`EventPool`] pools.
    #[must_use]
    pub fn with_config(source: S, config: MuxConfig) -> Self {
        Self::from_parts(source, config)
    }
}

impl<E, S, P> DispatchMultiplexer<E, S, P>
where
    E: 'static,
    S: EventSource<E>,
    P: HandlerPool<E> + 'static,
{
    /// Creates a multiplexer with a custom [`HandlerPool`] implementation.
    #[must_use]
    pub fn from_parts(source: S, config: MuxConfig) -> Self {
        Self {
            inner: Rc::new(Inner {
                source,
                config,
                pools: Rc::new(RefCell::new(PoolRegistry::new())),
                bindings: RefCell::new(HashMap::new()),
            }),
        }
    }

    /// Registers `handlers` for `event_type` in the pool named `pool_name`,
    /// creating the pool if it does not exist yet.
    ///
    /// Afterwards exactly one native listener is attached for
    /// `event_type` in `phase`. Re-adding handlers that are already
    /// registered is a merge, not an error; what a duplicate does is the
    /// pool's [`crate::domain::DuplicatePolicy`].
    ///
    /// # Errors
    ///
    /// - [`MuxError::EmptyIdentifier`] if the pool name or event type is
    ///   blank.
    /// - [`MuxError::NoHandlers`] if `handlers` is empty.
    /// - [`MuxError::UnsupportedEventType`] if the source does not support
    ///   `event_type`.
    ///
    /// Nothing is changed when an error is returned.
    pub fn add_handlers(
        &self,
        pool_name: impl Into<PoolName>,
        event_type: impl Into<EventType>,
        handlers: Vec<Handler<E>>,
        phase: impl Into<Phase>,
    ) -> Result<(), MuxError> {
        let pool_name = pool_name.into();
        let event_type = event_type.into();
        if pool_name.is_blank() {
            return Err(MuxError::EmptyIdentifier { kind: "pool name" });
        }
        if event_type.is_blank() {
            return Err(MuxError::EmptyIdentifier { kind: "event type" });
        }
        if handlers.is_empty() {
            return Err(MuxError::NoHandlers);
        }
        if !self.inner.source.supports(&event_type) {
            tracing::warn!(pool = %pool_name, %event_type, "event type not supported by source");
            return Err(MuxError::UnsupportedEventType(event_type));
        }

        let key = BindingKey::new(event_type, phase.into());
        let policy = self.inner.config.duplicate_policy;
        let count = handlers.len();
        let change = self.inner.pools.borrow_mut().update(&pool_name, |current| {
            Some(match current {
                Some(pool) => pool.add_handlers(&key, handlers),
                None => P::create_by_type(pool_name.clone(), key.clone(), handlers, policy),
            })
        });
        if change == SlotChange::Created {
            tracing::info!(pool = %pool_name, "pool created");
        }
        tracing::debug!(
            pool = %pool_name,
            event_type = %key.event_type,
            phase = %key.phase,
            handlers = count,
            "handlers added"
        );

        if self.rebinds_always() {
            self.detach(&key);
        }
        self.reconcile(&key);
        Ok(())
    }

    /// Removes `handlers` for `event_type` from the pool named `pool_name`.
    ///
    /// A pool left without any handler is dropped from the registry. The
    /// native listener for `event_type` in `phase` stays attached only if
    /// some remaining pool still handles `event_type` in `phase`.
    ///
    /// Removing from an unknown pool, or removing handlers that are not
    /// registered, is a no-op.
    pub fn remove_handlers(
        &self,
        pool_name: impl Into<PoolName>,
        event_type: impl Into<EventType>,
        handlers: &[Handler<E>],
        phase: impl Into<Phase>,
    ) {
        let pool_name = pool_name.into();
        let key = BindingKey::new(event_type.into(), phase.into());

        let change = self.inner.pools.borrow_mut().update(&pool_name, |current| {
            current
                .map(|pool| pool.remove_handlers(&key, handlers))
                .filter(|pool| pool.has_handlers())
        });
        match change {
            SlotChange::Untouched => return,
            SlotChange::Removed => tracing::info!(pool = %pool_name, "pool removed"),
            SlotChange::Created | SlotChange::Updated => {}
        }
        tracing::debug!(
            pool = %pool_name,
            event_type = %key.event_type,
            phase = %key.phase,
            handlers = handlers.len(),
            "handlers removed"
        );

        if self.rebinds_always() {
            self.detach(&key);
        }
        self.reconcile(&key);
    }

    /// Returns `true` if at least one native listener is attached.
    #[must_use]
    pub fn has_handlers(&self) -> bool {
        !self.inner.bindings.borrow().is_empty()
    }

    /// Returns `true` if a native listener is attached for `event_type` in
    /// `phase`.
    #[must_use]
    pub fn is_bound(&self, event_type: impl Into<EventType>, phase: impl Into<Phase>) -> bool {
        let key = BindingKey::new(event_type.into(), phase.into());
        self.inner.bindings.borrow().contains_key(&key)
    }

    /// Number of native listeners currently attached.
    #[must_use]
    pub fn binding_count(&self) -> usize {
        self.inner.bindings.borrow().len()
    }

    /// Pool names in registration (fan-out) order.
    #[must_use]
    pub fn pool_names(&self) -> Vec<PoolName> {
        self.inner.pools.borrow().names()
    }

    /// Number of registered pools.
    #[must_use]
    pub fn pool_count(&self) -> usize {
        self.inner.pools.borrow().len()
    }

    /// Returns `true` if a pool named `pool_name` is registered.
    #[must_use]
    pub fn has_pool(&self, pool_name: impl Into<PoolName>) -> bool {
        self.inner.pools.borrow().contains(&pool_name.into())
    }

    /// Returns a copy of the current state of the pool named `pool_name`.
    #[must_use]
    pub fn pool(&self, pool_name: impl Into<PoolName>) -> Option<P> {
        self.inner.pools.borrow().get(&pool_name.into()).cloned()
    }

    /// Returns a serializable view of the pools and bindings.
    #[must_use]
    pub fn snapshot(&self) -> MuxSnapshot {
        let pools = self
            .inner
            .pools
            .borrow()
            .iter()
            .map(PoolSummary::from_slot::<E, P>)
            .collect();
        let mut bindings: Vec<BindingSummary> = self
            .inner
            .bindings
            .borrow()
            .iter()
            .map(BindingSummary::from)
            .collect();
        bindings.sort_by(|a, b| (&a.event_type, a.phase).cmp(&(&b.event_type, b.phase)));
        MuxSnapshot { pools, bindings }
    }

    /// Detaches every native listener and drops every pool.
    pub fn clear(&self) {
        let bindings = std::mem::take(&mut *self.inner.bindings.borrow_mut());
        for (key, binding) in bindings {
            self.inner
                .source
                .remove_listener(&key.event_type, &binding.listener, key.phase);
        }
        self.inner.pools.borrow_mut().clear();
        tracing::debug!("multiplexer cleared");
    }

    /// The configuration the multiplexer was built with.
    #[must_use]
    pub fn config(&self) -> &MuxConfig {
        &self.inner.config
    }

    /// The wrapped native source.
    #[must_use]
    pub fn source(&self) -> &S {
        &self.inner.source
    }

    /// Creates a non-owning handle, suitable for capture inside handlers.
    #[must_use]
    pub fn downgrade(&self) -> WeakMultiplexer<E, S, P> {
        WeakMultiplexer {
            inner: Rc::downgrade(&self.inner),
        }
    }

    fn rebinds_always(&self) -> bool {
        self.inner.config.rebind_policy == RebindPolicy::Always
    }

    /// Brings the binding for `key` in line with current pool interest.
    fn reconcile(&self, key: &BindingKey) {
        let interested = self
            .inner
            .pools
            .borrow()
            .any(|pool| pool.has_handlers_for(key));
        let bound = self.inner.bindings.borrow().contains_key(key);
        match (bound, interested) {
            (false, true) => self.attach(key),
            (true, false) => self.detach(key),
            (true, true) | (false, false) => {}
        }
    }

    fn attach(&self, key: &BindingKey) {
        let listener = fan_out(Rc::downgrade(&self.inner.pools), key.clone());
        self.inner
            .source
            .add_listener(&key.event_type, &listener, key.phase);
        tracing::debug!(
            event_type = %key.event_type,
            phase = %key.phase,
            listener = %listener.id(),
            "native listener attached"
        );
        self.inner
            .bindings
            .borrow_mut()
            .insert(key.clone(), Binding::new(listener));
    }

    fn detach(&self, key: &BindingKey) {
        let removed = self.inner.bindings.borrow_mut().remove(key);
        if let Some(binding) = removed {
            self.inner
                .source
                .remove_listener(&key.event_type, &binding.listener, key.phase);
            tracing::debug!(
                event_type = %key.event_type,
                phase = %key.phase,
                listener = %binding.listener_id(),
                "native listener detached"
            );
        }
    }
}

/// Builds the native listener for `key`.
///
/// It holds the pool registry weakly: once the multiplexer is gone the
/// listener does nothing.
fn fan_out<E, P>(pools: Weak<RefCell<PoolRegistry<P>>>, key: BindingKey) -> NativeListener<E>
where
    E: 'static,
    P: HandlerPool<E> + 'static,
{
    NativeListener::new(move |event: &E| {
        let Some(registry) = pools.upgrade() else {
            return;
        };
        let snapshot = registry.borrow().snapshot();
        tracing::trace!(%key, pools = snapshot.len(), "fan-out");
        for pool in &snapshot {
            pool.dispatch_event(&key, event);
        }
    })
}

impl<E, S: EventSource<E>, P> Clone for DispatchMultiplexer<E, S, P> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<E, S: EventSource<E>, P> fmt::Debug for DispatchMultiplexer<E, S, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut bound: Vec<String> = self
            .inner
            .bindings
            .borrow()
            .keys()
            .map(ToString::to_string)
            .collect();
        bound.sort();
        f.debug_struct("DispatchMultiplexer")
            .field("config", &self.inner.config)
            .field("pools", &self.inner.pools.borrow().names())
            .field("bindings", &bound)
            .finish_non_exhaustive()
    }
}

/// Non-owning handle to a [`DispatchMultiplexer`].
pub struct WeakMultiplexer<E, S: EventSource<E>, P = EventPool<E>> {
    inner: Weak<Inner<E, S, P>>,
}

impl<E, S: EventSource<E>, P> WeakMultiplexer<E, S, P> {
    /// Returns the multiplexer if it is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<DispatchMultiplexer<E, S, P>> {
        self.inner.upgrade().map(|inner| DispatchMultiplexer { inner })
    }
}

impl<E, S: EventSource<E>, P> Clone for WeakMultiplexer<E, S, P> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<E, S: EventSource<E>, P> fmt::Debug for WeakMultiplexer<E, S, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakMultiplexer")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::DuplicatePolicy;
    use crate::source::MemorySource;
    use std::panic::{AssertUnwindSafe, catch_unwind};

    type Source = Rc<MemorySource<u32>>;
    type Mux = DispatchMultiplexer<u32, Source>;
    type Log = Rc<RefCell<Vec<String>>>;

    const BUBBLE: Phase = Phase::Bubble;

    fn setup() -> (Source, Mux) {
        setup_with(MuxConfig::default())
    }

    fn setup_with(config: MuxConfig) -> (Source, Mux) {
        let source = Rc::new(MemorySource::new());
        let mux = DispatchMultiplexer::with_config(Rc::clone(&source), config);
        (source, mux)
    }

    fn recorder(log: &Log, tag: &'static str) -> Handler<u32> {
        let log = Rc::clone(log);
        Handler::new(move |n: &u32| log.borrow_mut().push(format!("{tag}:{n}")))
    }

    fn add(mux: &Mux, pool: &str, ty: &str, handlers: &[&Handler<u32>]) {
        let handlers = handlers.iter().map(|h| (*h).clone()).collect();
        let Ok(()) = mux.add_handlers(pool, ty, handlers, BUBBLE) else {
            panic!("add_handlers failed");
        };
    }

    fn click() -> EventType {
        EventType::from("click")
    }

    #[test]
    fn first_add_attaches_one_listener() {
        let (source, mux) = setup();
        let log = Log::default();
        add(&mux, "A", "click", &[&recorder(&log, "h1")]);

        assert!(mux.has_handlers());
        assert!(mux.is_bound("click", BUBBLE));
        assert_eq!(source.listener_count(&click(), BUBBLE), 1);
        assert_eq!(source.add_calls(), 1);
        assert_eq!(source.remove_calls(), 0);
    }

    #[test]
    fn second_pool_rebinds_without_duplicating() {
        let (source, mux) = setup();
        let log = Log::default();
        add(&mux, "A", "click", &[&recorder(&log, "h1")]);
        add(&mux, "B", "click", &[&recorder(&log, "h2")]);

        assert_eq!(mux.binding_count(), 1);
        assert_eq!(source.listener_count(&click(), BUBBLE), 1);
        assert_eq!(source.add_calls(), 2);
        assert_eq!(source.remove_calls(), 1);
    }

    #[test]
    fn fan_out_reaches_every_handler_in_pool_order() {
        let (source, mux) = setup();
        let log = Log::default();
        add(&mux, "P1", "click", &[&recorder(&log, "h1"), &recorder(&log, "h2")]);
        add(&mux, "P2", "click", &[&recorder(&log, "h3")]);

        assert_eq!(source.fire(&click(), &7), 1);
        assert_eq!(*log.borrow(), vec!["h1:7", "h2:7", "h3:7"]);
    }

    #[test]
    fn fan_out_order_survives_pool_updates() {
        let (source, mux) = setup();
        let log = Log::default();
        add(&mux, "P1", "click", &[&recorder(&log, "a")]);
        add(&mux, "P2", "click", &[&recorder(&log, "b")]);
        add(&mux, "P1", "click", &[&recorder(&log, "c")]);

        source.fire(&click(), &1);
        assert_eq!(*log.borrow(), vec!["a:1", "c:1", "b:1"]);
    }

    #[test]
    fn removal_shrinks_registry_and_keeps_binding() {
        let (source, mux) = setup();
        let log = Log::default();
        let h1 = recorder(&log, "h1");
        add(&mux, "P1", "click", &[&h1]);
        add(&mux, "P2", "click", &[&recorder(&log, "h2")]);

        mux.remove_handlers("P1", "click", &[h1], BUBBLE);

        assert!(mux.is_bound("click", BUBBLE));
        assert_eq!(mux.pool_names(), vec![PoolName::from("P2")]);
        source.fire(&click(), &2);
        assert_eq!(*log.borrow(), vec!["h2:2"]);
    }

    #[test]
    fn removing_last_interest_detaches() {
        let (source, mux) = setup();
        let log = Log::default();
        let h = recorder(&log, "h");
        add(&mux, "A", "click", &[&h]);

        mux.remove_handlers("A", "click", &[h], BUBBLE);

        assert!(!mux.has_handlers());
        assert!(!mux.is_bound("click", BUBBLE));
        assert_eq!(mux.pool_count(), 0);
        assert_eq!(source.total_listeners(), 0);
        assert_eq!(source.fire(&click(), &3), 0);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn interest_in_other_types_keeps_pool_alive() {
        let (source, mux) = setup();
        let log = Log::default();
        let on_click = recorder(&log, "click");
        add(&mux, "A", "click", &[&on_click]);
        add(&mux, "A", "keydown", &[&recorder(&log, "key")]);

        mux.remove_handlers("A", "click", &[on_click], BUBBLE);

        assert!(mux.has_pool("A"));
        assert!(!mux.is_bound("click", BUBBLE));
        assert!(mux.is_bound("keydown", BUBBLE));
        assert_eq!(source.listener_count(&EventType::from("keydown"), BUBBLE), 1);
    }

    #[test]
    fn removal_is_idempotent() {
        let (source, mux) = setup();
        let log = Log::default();
        let h1 = recorder(&log, "h1");
        add(&mux, "A", "click", &[&h1]);
        add(&mux, "B", "click", &[&recorder(&log, "h2")]);

        mux.remove_handlers("A", "click", std::slice::from_ref(&h1), BUBBLE);
        let names = mux.pool_names();
        let bound = mux.binding_count();
        let calls = (source.add_calls(), source.remove_calls());

        mux.remove_handlers("A", "click", std::slice::from_ref(&h1), BUBBLE);
        mux.remove_handlers("ghost", "click", &[h1], BUBBLE);
        mux.remove_handlers("B", "scroll", &[recorder(&log, "x")], BUBBLE);

        assert_eq!(mux.pool_names(), names);
        assert_eq!(mux.binding_count(), bound);
        assert_eq!(source.listener_count(&click(), BUBBLE), 1);
        // nothing was bound for the repeated keys, so no native calls either
        assert_eq!((source.add_calls(), source.remove_calls()), calls);
    }

    #[test]
    fn removal_from_unknown_pool_touches_nothing() {
        let (source, mux) = setup();
        mux.remove_handlers("ghost", "click", &[], BUBBLE);
        assert_eq!(source.add_calls(), 0);
        assert_eq!(source.remove_calls(), 0);
        assert!(mux.snapshot().is_empty());
    }

    #[test]
    fn re_registration_round_trip() {
        let (source, mux) = setup();
        let log = Log::default();
        let h = recorder(&log, "h");
        add(&mux, "A", "click", &[&h]);
        mux.remove_handlers("A", "click", std::slice::from_ref(&h), BUBBLE);
        add(&mux, "A", "click", &[&h]);

        assert_eq!(mux.binding_count(), 1);
        assert_eq!(mux.pool_names(), vec![PoolName::from("A")]);
        assert_eq!(source.total_listeners(), 1);
        let Some(pool) = mux.pool("A") else {
            panic!("pool A missing");
        };
        let key = BindingKey::new(click(), BUBBLE);
        assert_eq!(pool.handlers_for(&key), std::slice::from_ref(&h));

        source.fire(&click(), &4);
        assert_eq!(*log.borrow(), vec!["h:4"]);
    }

    #[test]
    fn single_binding_invariant_holds_through_churn() {
        let (source, mux) = setup();
        let log = Log::default();
        let handlers: Vec<Handler<u32>> = ["a", "b", "c"]
            .into_iter()
            .map(|t| recorder(&log, t))
            .collect();
        let types = ["click", "keydown"];
        let pools = ["P1", "P2"];

        for step in 0..24usize {
            let pool = pools.get(step % 2).copied().unwrap_or("P1");
            let ty = types.get((step / 2) % 2).copied().unwrap_or("click");
            let Some(h) = handlers.get(step % 3) else {
                panic!("handler index out of range");
            };
            if step % 5 < 3 {
                add(&mux, pool, ty, &[h]);
            } else {
                mux.remove_handlers(pool, ty, std::slice::from_ref(h), BUBBLE);
            }

            for ty in types {
                let event_type = EventType::from(ty);
                let key = BindingKey::new(event_type.clone(), BUBBLE);
                let interested = pools
                    .iter()
                    .any(|p| mux.pool(*p).is_some_and(|pool| pool.has_handlers_for(&key)));
                assert_eq!(mux.is_bound(ty, BUBBLE), interested, "step {step} type {ty}");
                assert_eq!(
                    source.listener_count(&event_type, BUBBLE),
                    usize::from(interested),
                    "step {step} type {ty}"
                );
            }
            assert_eq!(mux.has_handlers(), mux.binding_count() > 0);
            for pool in pools {
                if let Some(state) = mux.pool(pool) {
                    assert!(state.has_handlers(), "empty pool {pool} left registered");
                }
            }
        }
    }

    #[test]
    fn capture_and_bubble_bind_separately() {
        let (source, mux) = setup();
        let log = Log::default();
        let Ok(()) = mux.add_handlers("A", "click", vec![recorder(&log, "cap")], true) else {
            panic!("capture add failed");
        };
        add(&mux, "B", "click", &[&recorder(&log, "bub")]);

        assert_eq!(mux.binding_count(), 2);
        assert_eq!(source.listener_count(&click(), Phase::Capture), 1);
        assert_eq!(source.listener_count(&click(), BUBBLE), 1);
        assert!(mux.is_bound("click", Phase::Capture));

        source.fire(&click(), &1);
        assert_eq!(*log.borrow(), vec!["cap:1", "bub:1"]);
    }

    #[test]
    fn phase_interest_is_tracked_separately() {
        let (source, mux) = setup();
        let log = Log::default();
        let bub = recorder(&log, "bub");
        let cap = recorder(&log, "cap");
        add(&mux, "toolbar", "click", &[&bub]);
        let Ok(()) = mux.add_handlers("analytics", "click", vec![cap.clone()], Phase::Capture) else {
            panic!("capture add failed");
        };

        mux.remove_handlers("toolbar", "click", &[bub], BUBBLE);
        assert!(!mux.is_bound("click", BUBBLE));
        assert!(mux.is_bound("click", Phase::Capture));

        mux.remove_handlers("analytics", "click", &[cap], Phase::Capture);
        assert!(!mux.has_handlers());
        assert_eq!(source.total_listeners(), 0);
    }

    #[test]
    fn removal_in_unbound_phase_does_not_bind_it() {
        let (source, mux) = setup();
        let log = Log::default();
        let h = recorder(&log, "h");
        add(&mux, "A", "click", &[&h]);

        mux.remove_handlers("A", "click", &[h], Phase::Capture);

        assert!(!mux.is_bound("click", Phase::Capture));
        assert!(mux.is_bound("click", BUBBLE));
        assert_eq!(source.total_listeners(), 1);
    }

    #[test]
    fn rejects_invalid_registration_without_side_effects() {
        let source = Rc::new(MemorySource::with_supported(["click"]));
        let mux: Mux = DispatchMultiplexer::new(Rc::clone(&source));
        let log = Log::default();

        assert_eq!(mux.add_handlers("A", "click", Vec::new(), BUBBLE), Err(MuxError::NoHandlers));
        assert_eq!(
            mux.add_handlers(" ", "click", vec![recorder(&log, "h")], BUBBLE),
            Err(MuxError::EmptyIdentifier { kind: "pool name" })
        );
        assert_eq!(
            mux.add_handlers("A", "", vec![recorder(&log, "h")], BUBBLE),
            Err(MuxError::EmptyIdentifier { kind: "event type" })
        );
        assert_eq!(
            mux.add_handlers("A", "wheel", vec![recorder(&log, "h")], BUBBLE),
            Err(MuxError::UnsupportedEventType(EventType::from("wheel")))
        );

        assert_eq!(source.add_calls(), 0);
        assert_eq!(source.remove_calls(), 0);
        assert_eq!(mux.pool_count(), 0);
    }

    #[test]
    fn handler_added_during_dispatch_waits_for_next_event() {
        let (source, mux) = setup();
        let log = Log::default();
        let late = recorder(&log, "late");

        let weak = mux.downgrade();
        let late_clone = late.clone();
        let log_a = Rc::clone(&log);
        let adder = Handler::new(move |n: &u32| {
            log_a.borrow_mut().push(format!("adder:{n}"));
            if let Some(mux) = weak.upgrade() {
                let _ = mux.add_handlers("B", "click", vec![late_clone.clone()], Phase::Bubble);
            }
        });
        add(&mux, "A", "click", &[&adder]);

        source.fire(&click(), &1);
        assert_eq!(*log.borrow(), vec!["adder:1"]);
        assert!(mux.has_pool("B"));

        source.fire(&click(), &2);
        assert_eq!(*log.borrow(), vec!["adder:1", "adder:2", "late:2"]);
        assert_eq!(source.listener_count(&click(), BUBBLE), 1);
    }

    #[test]
    fn capture_handler_adding_bubble_handler_waits_for_next_event() {
        for with_prior_binding in [false, true] {
            let (source, mux) = setup();
            let log = Log::default();
            if with_prior_binding {
                add(&mux, "C", "click", &[&recorder(&log, "keep")]);
            }

            let weak = mux.downgrade();
            let late = recorder(&log, "late");
            let log_a = Rc::clone(&log);
            let adder = Handler::new(move |n: &u32| {
                log_a.borrow_mut().push(format!("adder:{n}"));
                if let Some(mux) = weak.upgrade().filter(|mux| !mux.has_pool("B")) {
                    let _ = mux.add_handlers("B", "click", vec![late.clone()], Phase::Bubble);
                }
            });
            let Ok(()) = mux.add_handlers("A", "click", vec![adder], Phase::Capture) else {
                panic!("capture add failed");
            };

            source.fire(&click(), &1);
            assert!(
                !log.borrow().iter().any(|entry| entry.starts_with("late")),
                "prior binding: {with_prior_binding}"
            );

            source.fire(&click(), &2);
            assert!(log.borrow().contains(&"late:2".to_string()));
            assert_eq!(source.listener_count(&click(), BUBBLE), 1);
        }
    }

    #[test]
    fn pool_removed_during_dispatch_still_sees_current_event() {
        let (source, mux) = setup();
        let log = Log::default();
        let victim = recorder(&log, "victim");

        let weak = mux.downgrade();
        let victim_clone = victim.clone();
        let remover = Handler::new(move |_: &u32| {
            if let Some(mux) = weak.upgrade() {
                mux.remove_handlers("B", "click", std::slice::from_ref(&victim_clone), Phase::Bubble);
            }
        });
        add(&mux, "A", "click", &[&remover]);
        add(&mux, "B", "click", &[&victim]);

        source.fire(&click(), &1);
        assert_eq!(*log.borrow(), vec!["victim:1"]);
        assert!(!mux.has_pool("B"));

        source.fire(&click(), &2);
        assert_eq!(*log.borrow(), vec!["victim:1"]);
    }

    #[test]
    fn once_handler_can_remove_itself() {
        let (source, mux) = setup();
        let hits = Rc::new(RefCell::new(0u32));
        let slot: Rc<RefCell<Option<Handler<u32>>>> = Rc::new(RefCell::new(None));

        let weak = mux.downgrade();
        let own = Rc::clone(&slot);
        let counter = Rc::clone(&hits);
        let once = Handler::new(move |_: &u32| {
            *counter.borrow_mut() += 1;
            let me = own.borrow().clone();
            if let (Some(mux), Some(me)) = (weak.upgrade(), me) {
                mux.remove_handlers("once", "click", &[me], Phase::Bubble);
            }
        });
        *slot.borrow_mut() = Some(once.clone());
        add(&mux, "once", "click", &[&once]);

        source.fire(&click(), &1);
        source.fire(&click(), &2);
        assert_eq!(*hits.borrow(), 1);
        assert!(!mux.has_handlers());
    }

    #[test]
    fn panicking_handler_stops_later_pools_for_that_event() {
        let (source, mux) = setup();
        let log = Log::default();
        let boom = Handler::new(|_: &u32| panic!("handler failure"));
        add(&mux, "P1", "click", &[&boom]);
        add(&mux, "P2", "click", &[&recorder(&log, "after")]);

        let outcome = catch_unwind(AssertUnwindSafe(|| source.fire(&click(), &1)));
        assert!(outcome.is_err());
        assert!(log.borrow().is_empty());

        mux.remove_handlers("P1", "click", &[boom], BUBBLE);
        source.fire(&click(), &2);
        assert_eq!(*log.borrow(), vec!["after:2"]);
    }

    #[test]
    fn skip_unchanged_keeps_existing_listener() {
        let (source, mux) =
            setup_with(MuxConfig::default().with_rebind_policy(RebindPolicy::SkipUnchanged));
        let log = Log::default();
        let h1 = recorder(&log, "h1");
        add(&mux, "A", "click", &[&h1]);
        let first = mux.snapshot().bindings.first().map(|b| b.listener_id);

        add(&mux, "B", "click", &[&recorder(&log, "h2")]);
        mux.remove_handlers("A", "click", &[h1], BUBBLE);
        let second = mux.snapshot().bindings.first().map(|b| b.listener_id);

        assert_eq!(first, second);
        assert_eq!(source.add_calls(), 1);
        assert_eq!(source.remove_calls(), 0);

        source.fire(&click(), &5);
        assert_eq!(*log.borrow(), vec!["h2:5"]);
    }

    #[test]
    fn skip_unchanged_still_detaches_on_last_removal() {
        let (source, mux) =
            setup_with(MuxConfig::default().with_rebind_policy(RebindPolicy::SkipUnchanged));
        let log = Log::default();
        let h = recorder(&log, "h");
        add(&mux, "A", "click", &[&h]);
        mux.remove_handlers("A", "click", &[h], BUBBLE);

        assert!(!mux.has_handlers());
        assert_eq!(source.total_listeners(), 0);
    }

    #[test]
    fn duplicate_policy_comes_from_config() {
        let (source, mux) =
            setup_with(MuxConfig::default().with_duplicate_policy(DuplicatePolicy::Allow));
        let log = Log::default();
        let h = recorder(&log, "h");
        add(&mux, "A", "click", &[&h]);
        add(&mux, "A", "click", &[&h]);

        assert_eq!(mux.pool("A").map(|pool| pool.policy()), Some(DuplicatePolicy::Allow));
        source.fire(&click(), &1);
        assert_eq!(*log.borrow(), vec!["h:1", "h:1"]);
    }

    #[test]
    fn duplicates_are_ignored_by_default() {
        let (source, mux) = setup();
        let log = Log::default();
        let h = recorder(&log, "h");
        add(&mux, "A", "click", &[&h, &h]);
        add(&mux, "A", "click", &[&h]);

        source.fire(&click(), &1);
        assert_eq!(*log.borrow(), vec!["h:1"]);
    }

    #[test]
    fn clear_detaches_everything() {
        let (source, mux) = setup();
        let log = Log::default();
        add(&mux, "A", "click", &[&recorder(&log, "a")]);
        add(&mux, "B", "keydown", &[&recorder(&log, "b")]);

        mux.clear();

        assert!(!mux.has_handlers());
        assert_eq!(mux.pool_count(), 0);
        assert_eq!(source.total_listeners(), 0);
    }

    #[test]
    fn dropping_last_handle_detaches_listeners() {
        let (source, mux) = setup();
        let log = Log::default();
        add(&mux, "A", "click", &[&recorder(&log, "a")]);
        let weak = mux.downgrade();
        let extra = mux.clone();

        drop(mux);
        assert_eq!(source.total_listeners(), 1);
        drop(extra);
        assert_eq!(source.total_listeners(), 0);
        assert!(weak.upgrade().is_none());
    }

    #[derive(Default)]
    struct KeepingSource {
        kept: RefCell<Vec<NativeListener<u32>>>,
    }

    impl EventSource<u32> for KeepingSource {
        fn add_listener(&self, _: &EventType, listener: &NativeListener<u32>, _: Phase) {
            self.kept.borrow_mut().push(listener.clone());
        }

        fn remove_listener(&self, _: &EventType, _: &NativeListener<u32>, _: Phase) {}
    }

    #[test]
    fn listener_outliving_multiplexer_does_nothing() {
        let source = Rc::new(KeepingSource::default());
        let mux = DispatchMultiplexer::new(Rc::clone(&source));
        let log = Log::default();
        let Ok(()) = mux.add_handlers("A", "click", vec![recorder(&log, "a")], BUBBLE) else {
            panic!("add_handlers failed");
        };
        let Some(listener) = source.kept.borrow().first().cloned() else {
            panic!("no listener attached");
        };

        listener.invoke(&1);
        assert_eq!(*log.borrow(), vec!["a:1"]);

        drop(mux);
        listener.invoke(&2);
        assert_eq!(*log.borrow(), vec!["a:1"]);
    }

    /// Pool that refuses a second registration for a key it already handles.
    #[derive(Clone)]
    struct FragilePool(EventPool<u32>);

    impl HandlerPool<u32> for FragilePool {
        fn create_by_type(
            name: PoolName,
            key: BindingKey,
            handlers: Vec<Handler<u32>>,
            policy: DuplicatePolicy,
        ) -> Self {
            Self(EventPool::create_by_type(name, key, handlers, policy))
        }

        fn name(&self) -> &PoolName {
            self.0.name()
        }

        fn add_handlers(self, key: &BindingKey, handlers: Vec<Handler<u32>>) -> Self {
            if self.0.has_handlers_for(key) {
                panic!("pool already handles {key}");
            }
            Self(self.0.add_handlers(key, handlers))
        }

        fn remove_handlers(self, key: &BindingKey, handlers: &[Handler<u32>]) -> Self {
            Self(self.0.remove_handlers(key, handlers))
        }

        fn has_handlers(&self) -> bool {
            self.0.has_handlers()
        }

        fn has_handlers_for(&self, key: &BindingKey) -> bool {
            self.0.has_handlers_for(key)
        }

        fn handler_count(&self) -> usize {
            self.0.handler_count()
        }

        fn dispatch_event(&self, key: &BindingKey, event: &u32) {
            self.0.dispatch_event(key, event);
        }
    }

    #[test]
    fn panicking_pool_update_keeps_pool_and_binding() {
        let source = Rc::new(MemorySource::new());
        let mux: DispatchMultiplexer<u32, Source, FragilePool> =
            DispatchMultiplexer::from_parts(Rc::clone(&source), MuxConfig::default());
        let log = Log::default();
        let Ok(()) = mux.add_handlers("A", "click", vec![recorder(&log, "first")], BUBBLE) else {
            panic!("add_handlers failed");
        };

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            mux.add_handlers("A", "click", vec![recorder(&log, "second")], BUBBLE)
        }));
        assert!(outcome.is_err());

        assert!(mux.is_bound("click", BUBBLE));
        assert_eq!(source.listener_count(&click(), BUBBLE), 1);
        assert_eq!(mux.pool("A").map(|pool| pool.handler_count()), Some(1));
        source.fire(&click(), &3);
        assert_eq!(*log.borrow(), vec!["first:3"]);
    }

    #[test]
    fn snapshot_serializes_registries() {
        let (_source, mux) = setup();
        let log = Log::default();
        add(&mux, "A", "click", &[&recorder(&log, "a"), &recorder(&log, "b")]);

        let Ok(json) = serde_json::to_value(mux.snapshot()) else {
            panic!("snapshot serialization failed");
        };
        assert_eq!(json["pools"][0]["name"], "A");
        assert_eq!(json["pools"][0]["handler_count"], 2);
        assert_eq!(json["bindings"][0]["event_type"], "click");
        assert_eq!(json["bindings"][0]["phase"], "bubble");
    }

    #[test]
    fn works_with_borrowed_source() {
        let source = MemorySource::<u32>::new();
        let log = Log::default();
        {
            let mux = DispatchMultiplexer::new(&source);
            let Ok(()) = mux.add_handlers("A", "click", vec![recorder(&log, "a")], false) else {
                panic!("add_handlers failed");
            };
            source.fire(&click(), &9);
        }
        assert_eq!(*log.borrow(), vec!["a:9"]);
        assert_eq!(source.total_listeners(), 0);
    }
}
