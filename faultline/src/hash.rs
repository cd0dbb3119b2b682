//! Open-addressing string map.
//!
//! Keys are owned strings, values are generic. Each slot carries a
//! three-state tag: never used, in use, or removed. Lookups probe linearly
//! and stop at the first never-used slot; removed slots are skipped but
//! never reused for insertion, so every probe chain stays terminated by a
//! never-used slot and negative lookups do not degenerate into full scans.
//!
//! Tuned for a small number of short ASCII keys. Not thread-safe; callers
//! that need locking bring their own.

use std::mem;

use twox_hash::XxHash32;

/// Fixed hash seed. The seed only has to be stable within a process.
const SEED: u32 = 0x34a4_b627;

/// Smallest number of slots a table will hold.
const MIN_SIZE: usize = 10;

/// The 32-bit mix shared by [`StrMap`] and [`Cache`](crate::cache::Cache).
pub(crate) fn hash32(key: &str) -> u32 {
    XxHash32::oneshot(SEED, key.as_bytes())
}

enum Slot<V> {
    Never,
    Removed,
    Used { key: String, value: V },
}

pub struct StrMap<V> {
    slots: Vec<Slot<V>>,
    in_use: usize,
    removed: usize,
}

impl<V> StrMap<V> {
    pub fn new() -> Self {
        Self {
            slots: Self::empty_slots(MIN_SIZE),
            in_use: 0,
            removed: 0,
        }
    }

    fn empty_slots(size: usize) -> Vec<Slot<V>> {
        let mut slots = Vec::with_capacity(size);
        slots.resize_with(size, || Slot::Never);
        slots
    }

    pub fn len(&self) -> usize {
        self.in_use
    }

    pub fn is_empty(&self) -> bool {
        self.in_use == 0
    }

    fn start_pos(&self, key: &str) -> usize {
        hash32(key) as usize % self.slots.len()
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        let mut pos = self.start_pos(key);
        loop {
            match &self.slots[pos] {
                Slot::Never => return None,
                Slot::Used { key: k, value } if k == key => return Some(value),
                _ => pos = (pos + 1) % self.slots.len(),
            }
        }
    }

    /// Inserts or overwrites. An existing key keeps its slot and drops the
    /// old value; a new key takes the first never-used slot on its chain.
    pub fn set(&mut self, key: &str, value: V) {
        let mut pos = self.start_pos(key);
        loop {
            match &self.slots[pos] {
                Slot::Never => break,
                Slot::Used { key: k, .. } if k == key => break,
                _ => pos = (pos + 1) % self.slots.len(),
            }
        }
        if matches!(self.slots[pos], Slot::Never) {
            self.in_use += 1;
        }
        self.slots[pos] = Slot::Used {
            key: key.to_owned(),
            value,
        };
        self.autoresize();
    }

    pub fn del(&mut self, key: &str) -> bool {
        let mut pos = self.start_pos(key);
        loop {
            match &self.slots[pos] {
                Slot::Never => return false,
                Slot::Used { key: k, .. } if k == key => break,
                _ => pos = (pos + 1) % self.slots.len(),
            }
        }
        self.slots[pos] = Slot::Removed;
        self.in_use -= 1;
        self.removed += 1;
        self.autoresize();
        true
    }

    /// Keeps at least 30% of the slots never-used so probe chains terminate,
    /// and compacts oversized tables once they empty out. Both directions
    /// rebuild from scratch, which also reclaims removed slots.
    fn autoresize(&mut self) {
        let size = self.slots.len();
        let usable = 1.0 - (self.in_use + self.removed) as f64 / size as f64;
        if usable < 0.30 {
            self.rebuild((self.in_use * 2).max(MIN_SIZE));
        } else if size > MIN_SIZE && (self.in_use as f64) / (size as f64) < 0.30 {
            self.rebuild((self.in_use * 2).max(MIN_SIZE));
        }
    }

    fn rebuild(&mut self, new_size: usize) {
        let old = mem::replace(&mut self.slots, Self::empty_slots(new_size));
        self.in_use = 0;
        self.removed = 0;
        for slot in old {
            if let Slot::Used { key, value } = slot {
                self.insert_fresh(key, value);
            }
        }
    }

    /// Inserts into a table known to have room and no matching key.
    fn insert_fresh(&mut self, key: String, value: V) {
        let mut pos = hash32(&key) as usize % self.slots.len();
        while !matches!(self.slots[pos], Slot::Never) {
            pos = (pos + 1) % self.slots.len();
        }
        self.slots[pos] = Slot::Used { key, value };
        self.in_use += 1;
    }
}

impl<V> Default for StrMap<V> {
    fn default() -> Self {
        Self::new()
    }
}
