//! Non-owning registry of shared entities
//!
//! A `WeakRegistry` remembers entities without keeping them alive. Each slot
//! stores a `Weak` reference plus an alive flag, addressed by a stable `u64`
//! key chosen by the caller (object id, sprite id).
//!
//! - Enumeration returns strong snapshots, so callers can freely mutate the
//!   registry (or drop entities) while walking the result
//! - Entities dropped by all owners are detected during enumeration, flagged
//!   dead and compacted away without any unregister call
//! - Explicit removal only flips the alive flag; the slot is reclaimed on the
//!   next enumeration
//!
//! # Example
//!
//! ```ignore
//! let mut registry: WeakRegistry<Mutex<GameObject>> = WeakRegistry::new();
//! registry.insert(id, &handle);
//! drop(handle);
//! assert!(registry.live().is_empty());
//! ```

use std::sync::{Arc, Weak};

/// Internal slot state.
#[derive(Debug)]
struct Slot<T: ?Sized> {
    key: u64,
    item: Weak<T>,
    alive: bool,
}

/// Insertion-ordered registry of weak references.
#[derive(Debug)]
pub struct WeakRegistry<T: ?Sized> {
    slots: Vec<Slot<T>>,
    /// Slots flagged dead but not yet compacted
    dead: usize,
}

impl<T: ?Sized> WeakRegistry<T> {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            dead: 0,
        }
    }

    /// Register an entity under `key`.
    ///
    /// Returns `false` if a live entry with the same key already exists.
    pub fn insert(&mut self, key: u64, item: &Arc<T>) -> bool {
        if self.contains(key) {
            return false;
        }
        self.slots.push(Slot {
            key,
            item: Arc::downgrade(item),
            alive: true,
        });
        true
    }

    /// Flag the entry for `key` as dead.
    ///
    /// Returns `true` if a live entry was found.
    pub fn remove(&mut self, key: u64) -> bool {
        match self.slots.iter_mut().find(|s| s.alive && s.key == key) {
            Some(slot) => {
                slot.alive = false;
                self.dead += 1;
                true
            }
            None => false,
        }
    }

    /// Check if `key` refers to a live, still-owned entity.
    #[must_use]
    pub fn contains(&self, key: u64) -> bool {
        self.slots
            .iter()
            .any(|s| s.alive && s.key == key && s.item.strong_count() > 0)
    }

    /// Upgrade the entry for `key`.
    #[must_use]
    pub fn get(&self, key: u64) -> Option<Arc<T>> {
        self.slots
            .iter()
            .filter(|s| s.alive && s.key == key)
            .find_map(|s| s.item.upgrade())
    }

    /// Snapshot of every live entity in insertion order.
    ///
    /// Expired references met along the way are flagged and the registry is
    /// compacted before returning.
    pub fn live(&mut self) -> Vec<(u64, Arc<T>)> {
        let mut result = Vec::with_capacity(self.slots.len() - self.dead);
        for slot in &mut self.slots {
            if !slot.alive {
                continue;
            }
            match slot.item.upgrade() {
                Some(item) => result.push((slot.key, item)),
                None => {
                    slot.alive = false;
                    self.dead += 1;
                }
            }
        }
        self.compact();
        result
    }

    /// Drop every dead slot.
    pub fn compact(&mut self) {
        if self.dead == 0 {
            return;
        }
        self.slots.retain(|s| s.alive);
        self.dead = 0;
    }

    /// Number of entries currently owned elsewhere.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| s.alive && s.item.strong_count() > 0)
            .count()
    }

    /// Number of slots, including ones not yet compacted.
    #[must_use]
    #[inline]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if no live entity is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live_count() == 0
    }

    /// Keys of live entries in insertion order.
    #[must_use]
    pub fn keys(&self) -> Vec<u64> {
        self.slots
            .iter()
            .filter(|s| s.alive && s.item.strong_count() > 0)
            .map(|s| s.key)
            .collect()
    }

    /// Forget every entry.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.dead = 0;
    }
}

impl<T: ?Sized> Default for WeakRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_insert_and_enumerate_in_order() {
        let mut registry = WeakRegistry::new();
        let a = Arc::new(1);
        let b = Arc::new(2);
        let c = Arc::new(3);

        assert!(registry.insert(10, &a));
        assert!(registry.insert(20, &b));
        assert!(registry.insert(30, &c));

        let values: Vec<i32> = registry.live().iter().map(|(_, v)| **v).collect();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let mut registry = WeakRegistry::new();
        let a = Arc::new("a");
        assert!(registry.insert(1, &a));
        assert!(!registry.insert(1, &a));
        assert_eq!(registry.slot_count(), 1);
    }

    #[test]
    fn test_dropped_entity_pruned_on_enumeration() {
        let mut registry = WeakRegistry::new();
        let keep = Arc::new(Mutex::new(1));
        let gone = Arc::new(Mutex::new(2));
        registry.insert(1, &keep);
        registry.insert(2, &gone);

        drop(gone);

        let live = registry.live();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].0, 1);
        assert_eq!(registry.slot_count(), 1, "Dead slot should be compacted");
    }

    #[test]
    fn test_explicit_remove() {
        let mut registry = WeakRegistry::new();
        let a = Arc::new(5);
        registry.insert(7, &a);

        assert!(registry.remove(7));
        assert!(!registry.remove(7));
        assert!(!registry.contains(7));
        assert!(registry.get(7).is_none());
        assert!(registry.live().is_empty());

        // Same key can be registered again after removal
        assert!(registry.insert(7, &a));
        assert!(registry.contains(7));
    }

    #[test]
    fn test_snapshot_survives_registry_changes() {
        let mut registry = WeakRegistry::new();
        let a = Arc::new(1);
        registry.insert(1, &a);

        let snapshot = registry.live();
        registry.remove(1);
        registry.clear();

        assert_eq!(*snapshot[0].1, 1);
    }

    #[test]
    fn test_unsized_entries() {
        trait Named: Send + Sync {
            fn name(&self) -> &str;
        }
        struct Thing;
        impl Named for Thing {
            fn name(&self) -> &str {
                "thing"
            }
        }

        let mut registry: WeakRegistry<dyn Named> = WeakRegistry::new();
        let thing: Arc<dyn Named> = Arc::new(Thing);
        registry.insert(1, &thing);

        assert_eq!(registry.get(1).map(|t| t.name().to_string()), Some("thing".into()));
        assert_eq!(registry.live_count(), 1);
    }
}
