//! Ordered pool storage.
//!
//! [`PoolRegistry`] keeps every live pool in registration order; fan-out
//! visits pools in exactly this order. Replacing a pool's state keeps its
//! position, and an update that leaves a pool empty removes it.

use chrono::{DateTime, Utc};

use super::PoolName;

/// A pool plus registry metadata.
#[derive(Debug, Clone)]
pub struct PoolSlot<P> {
    /// Name the pool is registered under (immutable after creation).
    pub name: PoolName,

    /// Current pool state.
    pub pool: P,

    /// When the pool was first registered.
    pub created_at: DateTime<Utc>,

    /// When the pool state was last replaced.
    pub last_modified_at: DateTime<Utc>,
}

/// What [`PoolRegistry::update`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotChange {
    /// A new pool was registered at the end of the order.
    Created,
    /// An existing pool's state was replaced in place.
    Updated,
    /// An existing pool was removed.
    Removed,
    /// No pool existed and none was created.
    Untouched,
}

/// Central store for the pools of one multiplexer.
#[derive(Debug, Clone)]
pub struct PoolRegistry<P> {
    slots: Vec<PoolSlot<P>>,
}

impl<P> PoolRegistry<P> {
    /// Creates an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Returns the pool registered under `name`.
    #[must_use]
    pub fn get(&self, name: &PoolName) -> Option<&P> {
        self.slots.iter().find(|s| &s.name == name).map(|s| &s.pool)
    }

    /// Returns `true` if a pool is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &PoolName) -> bool {
        self.slots.iter().any(|s| &s.name == name)
    }

    /// Returns `true` if any pool satisfies `predicate`.
    pub fn any(&self, predicate: impl Fn(&P) -> bool) -> bool {
        self.slots.iter().any(|s| predicate(&s.pool))
    }

    /// Iterates over slots in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &PoolSlot<P>> {
        self.slots.iter()
    }

    /// Pool names in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<PoolName> {
        self.slots.iter().map(|s| s.name.clone()).collect()
    }

    /// Removes every pool.
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Returns the number of pools in the registry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if the registry contains no pools.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl<P: Clone> PoolRegistry<P> {
    /// Replaces the state of the pool registered under `name`.
    ///
    /// `f` receives a copy of the current state (or `None` if the name is
    /// unknown) and returns the new state; `None` removes the pool. The
    /// pool keeps its position in the registration order. If `f` panics
    /// the slot is left as it was.
    pub fn update(&mut self, name: &PoolName, f: impl FnOnce(Option<P>) -> Option<P>) -> SlotChange {
        let Some(slot) = self.slots.iter_mut().find(|s| &s.name == name) else {
            return match f(None) {
                Some(pool) => {
                    let now = Utc::now();
                    self.slots.push(PoolSlot {
                        name: name.clone(),
                        pool,
                        created_at: now,
                        last_modified_at: now,
                    });
                    SlotChange::Created
                }
                None => SlotChange::Untouched,
            };
        };

        match f(Some(slot.pool.clone())) {
            Some(pool) => {
                slot.pool = pool;
                slot.last_modified_at = Utc::now();
                SlotChange::Updated
            }
            None => {
                self.slots.retain(|s| &s.name != name);
                SlotChange::Removed
            }
        }
    }

    /// Clones every pool state in registration order.
    ///
    /// Fan-out iterates this snapshot so that handlers may add or remove
    /// pools without affecting the event currently being delivered.
    #[must_use]
    pub fn snapshot(&self) -> Vec<P> {
        self.slots.iter().map(|s| s.pool.clone()).collect()
    }
}

impl<P> Default for PoolRegistry<P> {
    fn default() -> Self {
        Self::new()
    }
}
