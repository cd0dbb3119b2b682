//! Wildcard-aware key/value table.
//!
//! One namespace over two stores: keys ending in `*` land in a slot array
//! and match queried names by literal prefix, every other key lives in an
//! exact-match [`StrMap`]. Whether a key is a wildcard is decided once, at
//! insertion, from its trailing `*`.
//!
//! Wildcard lookup is linear in the number of wildcard entries, so results
//! are memoized per queried name in a [`Cache`], misses included, and the
//! whole cache is invalidated whenever a wildcard entry changes.
//!
//! When several wildcard entries match the same name, which one wins is
//! unspecified.

use crate::cache::Cache;
use crate::hash::StrMap;

/// Smallest number of wildcard slots kept allocated.
const MIN_WILD: usize = 10;

/// Slots in the lookup cache.
const CACHE_SIZE: usize = 128;

struct WildEntry<V> {
    key: String,
    value: V,
}

impl<V> WildEntry<V> {
    /// The literal part of the key, without the trailing `*`.
    fn prefix(&self) -> &str {
        &self.key[..self.key.len() - 1]
    }
}

pub struct WildTable<V> {
    exact: StrMap<V>,
    wild: Vec<Option<WildEntry<V>>>,
    nwild: usize,
    cache: Cache<V>,
}

impl<V: Clone> WildTable<V> {
    pub fn new() -> Self {
        let mut wild = Vec::with_capacity(MIN_WILD);
        wild.resize_with(MIN_WILD, || None);
        Self {
            exact: StrMap::new(),
            wild,
            nwild: 0,
            cache: Cache::new(CACHE_SIZE),
        }
    }

    pub fn len(&self) -> usize {
        self.exact.len() + self.nwild
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Looks `key` up: exact entries first, then the memoized wildcard
    /// result, then a scan of the wildcard array (whose outcome is memoized,
    /// found or not).
    pub fn get(&self, key: &str) -> Option<V> {
        if let Some(value) = self.exact.get(key) {
            return Some(value.clone());
        }
        if let Some(memoized) = self.cache.get(key) {
            return memoized;
        }
        let found = self
            .wild
            .iter()
            .flatten()
            .find(|entry| key.starts_with(entry.prefix()))
            .map(|entry| entry.value.clone());
        self.cache.set(key, found.clone());
        found
    }

    pub fn set(&mut self, key: &str, value: V) {
        if key.ends_with('*') {
            self.set_wild(key, value);
            self.cache.invalidate();
        } else {
            self.exact.set(key, value);
        }
    }

    fn set_wild(&mut self, key: &str, value: V) {
        if let Some(entry) = self.wild.iter_mut().flatten().find(|e| e.key == key) {
            entry.value = value;
            return;
        }
        if self.wild.len() - self.nwild <= 1 {
            // Grow by 30%, plus one so small arrays grow at all.
            let grown = self.wild.len() + self.wild.len() * 3 / 10 + 1;
            self.wild.resize_with(grown, || None);
        }
        let free = self
            .wild
            .iter()
            .position(Option::is_none)
            .expect("wildcard array was just grown");
        self.wild[free] = Some(WildEntry {
            key: key.to_owned(),
            value,
        });
        self.nwild += 1;
    }

    pub fn del(&mut self, key: &str) -> bool {
        if !key.ends_with('*') {
            return self.exact.del(key);
        }
        let Some(pos) = self
            .wild
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|e| e.key == key))
        else {
            return false;
        };
        self.wild[pos] = None;
        self.nwild -= 1;
        self.cache.invalidate();
        if self.wild.len() > MIN_WILD && (self.nwild as f64) / (self.wild.len() as f64) < 0.6 {
            self.shrink_wild();
        }
        true
    }

    fn shrink_wild(&mut self) {
        let target = (self.nwild + 3).max(MIN_WILD);
        let old = std::mem::take(&mut self.wild);
        self.wild = old.into_iter().flatten().map(Some).collect();
        self.wild.resize_with(target, || None);
    }
}

impl<V: Clone> Default for WildTable<V> {
    fn default() -> Self {
        Self::new()
    }
}
