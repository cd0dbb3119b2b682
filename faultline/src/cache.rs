//! Direct-mapped lookup cache.
//!
//! A fixed-size table that memoizes the result of an expensive lookup,
//! including negative results ("this key matches nothing"). Each slot holds
//! the last key hashed to it; colliding keys simply evict one another.
//! Reads share the lock and hold it for the whole `get`.

use parking_lot::RwLock;

use crate::hash::hash32;

struct Entry<V> {
    key: String,
    value: Option<V>,
}

pub struct Cache<V> {
    slots: RwLock<Vec<Option<Entry<V>>>>,
}

impl<V: Clone> Cache<V> {
    pub fn new(size: usize) -> Self {
        assert!(size > 0, "cache size must be non-zero");
        Self {
            slots: RwLock::new(Self::empty_slots(size)),
        }
    }

    fn empty_slots(size: usize) -> Vec<Option<Entry<V>>> {
        let mut slots = Vec::with_capacity(size);
        slots.resize_with(size, || None);
        slots
    }

    /// Cache lookup. The outer `Option` is hit-or-miss; the inner one is the
    /// memoized result, which may itself be "no match".
    pub fn get(&self, key: &str) -> Option<Option<V>> {
        let slots = self.slots.read();
        let entry = slots[hash32(key) as usize % slots.len()].as_ref()?;
        if entry.key == key {
            Some(entry.value.clone())
        } else {
            None
        }
    }

    /// Memoizes `value` for `key`, evicting whatever occupied the slot.
    pub fn set(&self, key: &str, value: Option<V>) {
        let mut slots = self.slots.write();
        let pos = hash32(key) as usize % slots.len();
        slots[pos] = Some(Entry {
            key: key.to_owned(),
            value,
        });
    }

    /// Drops every memoized result.
    pub fn invalidate(&self) {
        let mut slots = self.slots.write();
        for slot in slots.iter_mut() {
            *slot = None;
        }
    }

    /// Changes the table size. Growing rehashes the surviving entries;
    /// shrinking drops them all and starts fresh.
    pub fn resize(&self, new_size: usize) {
        assert!(new_size > 0, "cache size must be non-zero");
        let mut slots = self.slots.write();
        if new_size > slots.len() {
            let mut grown = Self::empty_slots(new_size);
            for entry in std::mem::take(&mut *slots).into_iter().flatten() {
                let pos = hash32(&entry.key) as usize % new_size;
                grown[pos] = Some(entry);
            }
            *slots = grown;
        } else {
            *slots = Self::empty_slots(new_size);
        }
    }
}
