//! `StripedMap`: the thread-safe facade.
//!
//! The bucket space is partitioned into power-of-two shards selected by the
//! *high* bits of the key hash, each an independent [`Table`] behind its own
//! `parking_lot::RwLock`. Buckets index by low hash bits, so shard selection
//! is untouched by capacity changes and an entry never migrates between
//! shards. That lets each shard resize under its own write lock: writers on
//! one shard block only writers and readers of that shard, and blocking is
//! always bounded by a single shard's critical section.
//!
//! Operations needing a global view (`len_exact`, construction from an
//! existing map) acquire shard locks in ascending index order — the fixed
//! global order that rules out deadlock between concurrent global
//! operations.
//!
//! `len()` reads a relaxed counter maintained on insert/remove and is
//! approximate while mutations are in flight; `len_exact()` holds all shard
//! locks for a consistent count. Iteration is weakly consistent: the
//! iterator snapshots one shard at a time under its read lock, never
//! errors, never yields an entry twice, and reflects some but not
//! necessarily all concurrent mutations. Fail-fast traversal exists only on
//! the single-threaded [`ChainMap`](crate::ChainMap).
//!
//! Shards run in unordered mode: no cross-shard iteration order could be
//! maintained without a global lock on every write, so none is promised.
//!
//! Values returned by `get` are cloned out while the shard lock is held
//! (references cannot outlive the lock); `get_and` borrows instead and runs
//! a closure under the lock.

use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};
use core::sync::atomic::{AtomicUsize, Ordering};
use std::collections::hash_map::RandomState;

use parking_lot::RwLock;

use crate::config::{Options, OrderMode, DEFAULT_SHARD_COUNT};
use crate::error::MapError;
use crate::map::ChainMap;
use crate::table::{hash_key, KeySlot, PutOutcome, Table};

/// A thread-safe chaining hash map striped over independently locked
/// shards. Shared by reference (`&StripedMap`) across threads; all
/// operations take `&self`.
pub struct StripedMap<K, V, S = RandomState> {
    shards: Box<[RwLock<Table<K, V>>]>,
    hasher: S,
    len: AtomicUsize,
    shard_shift: u32,
    allow_null_key: bool,
}

impl<K, V> StripedMap<K, V>
where
    K: Hash + Eq,
{
    /// Creates a map with [`DEFAULT_SHARD_COUNT`] shards and default
    /// options.
    pub fn new() -> Self {
        Self::with_shards(DEFAULT_SHARD_COUNT)
    }

    pub fn with_shards(shard_count: usize) -> Self {
        Self::with_shards_options_and_hasher(shard_count, Options::default(), RandomState::default())
    }
}

impl<K, V> Default for StripedMap<K, V>
where
    K: Hash + Eq,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> StripedMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Creates a map with at least `shard_count` shards (rounded up to a
    /// power of two). `options.initial_capacity` is the total capacity,
    /// divided across shards; `options.order` is ignored — shards are
    /// always unordered.
    ///
    /// Panics if `shard_count` is zero or `options.load_factor` is outside
    /// `(0, 1]`.
    pub fn with_shards_options_and_hasher(shard_count: usize, options: Options, hasher: S) -> Self {
        assert!(shard_count > 0, "shard count must be nonzero");
        let count = shard_count.next_power_of_two();
        let shard_shift = 64 - count.trailing_zeros();
        let shard_options = Options {
            initial_capacity: (options.initial_capacity / count).max(1),
            order: OrderMode::Unordered,
            ..options
        };
        let shards = (0..count)
            .map(|_| RwLock::new(Table::new(&shard_options)))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            shards,
            hasher,
            len: AtomicUsize::new(0),
            shard_shift,
            allow_null_key: options.allow_null_key,
        }
    }

    pub(crate) fn from_parts(map: ChainMap<K, V, S>, shard_count: usize) -> Result<Self, MapError> {
        let (table, hasher, allow_null_key) = map.into_parts();
        let options = Options {
            initial_capacity: table.len().max(crate::config::DEFAULT_INITIAL_CAPACITY),
            load_factor: table.load_factor(),
            order: OrderMode::Unordered,
            allow_null_key,
        };
        let striped = Self::with_shards_options_and_hasher(shard_count, options, hasher);
        for (key, value) in table.into_pairs() {
            striped.put_slot(key, value)?;
        }
        Ok(striped)
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    fn shard_index(&self, hash: u64) -> usize {
        if self.shards.len() == 1 {
            return 0;
        }
        (hash >> self.shard_shift) as usize
    }

    fn check_key<T>(&self, key: &Option<T>) -> Result<(), MapError> {
        if key.is_none() && !self.allow_null_key {
            return Err(MapError::InvalidKey);
        }
        Ok(())
    }

    /// Insert or replace, blocking only on this key's shard.
    pub fn put(&self, key: Option<K>, value: V) -> Result<Option<V>, MapError> {
        self.check_key(&key)?;
        let slot = match key {
            None => KeySlot::Null,
            Some(k) => KeySlot::Key(k),
        };
        self.put_slot(slot, value)
    }

    fn put_slot(&self, key: KeySlot<K>, value: V) -> Result<Option<V>, MapError> {
        let hash = hash_key(&self.hasher, key.as_option());
        let mut shard = self.shards[self.shard_index(hash)].write();
        match shard.put(hash, key, value)? {
            PutOutcome::Inserted => {
                self.len.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
            PutOutcome::Replaced { old, .. } => Ok(Some(old)),
        }
    }

    /// Look up and clone the value for `key`. Reads on different shards,
    /// and concurrent reads on the same shard, proceed in parallel.
    pub fn get<Q>(&self, key: Option<&Q>) -> Result<Option<V>, MapError>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        V: Clone,
    {
        self.get_and(key, V::clone)
    }

    /// Run `with_value` on the value for `key` while the shard read lock is
    /// held. Keep the closure short; it delays writers on this shard.
    pub fn get_and<Q, F, T>(&self, key: Option<&Q>, with_value: F) -> Result<Option<T>, MapError>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        F: FnOnce(&V) -> T,
    {
        self.check_key(&key)?;
        let hash = hash_key(&self.hasher, key);
        let shard = self.shards[self.shard_index(hash)].read();
        Ok(shard
            .find(hash, key)
            .and_then(|id| shard.value(id))
            .map(with_value))
    }

    /// Remove an entry and return its value, blocking only on its shard.
    pub fn remove<Q>(&self, key: Option<&Q>) -> Result<Option<V>, MapError>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.check_key(&key)?;
        let hash = hash_key(&self.hasher, key);
        let mut shard = self.shards[self.shard_index(hash)].write();
        match shard.remove(hash, key) {
            Some((_, value)) => {
                self.len.fetch_sub(1, Ordering::Relaxed);
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Whether an entry exists for `key`. A null key under a forbidding
    /// policy is simply absent.
    pub fn contains_key<Q>(&self, key: Option<&Q>) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        if key.is_none() && !self.allow_null_key {
            return false;
        }
        let hash = hash_key(&self.hasher, key);
        let shard = self.shards[self.shard_index(hash)].read();
        shard.find(hash, key).is_some()
    }

    /// Number of entries confirmed by completed operations. Approximate
    /// while mutations are in flight; see [`len_exact`](Self::len_exact).
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consistent count: holds every shard lock (acquired in ascending
    /// index order) for the duration of the sum.
    pub fn len_exact(&self) -> usize {
        let guards: Vec<_> = self.shards.iter().map(|s| s.read()).collect();
        guards.iter().map(|g| g.len()).sum()
    }

    /// Weakly consistent traversal: snapshots one shard at a time under its
    /// read lock. Never errors, never yields an entry twice, and any entry
    /// present for the whole traversal is yielded exactly once; mutations
    /// that race the traversal may or may not be reflected.
    pub fn iter(&self) -> WeakIter<'_, K, V, S>
    where
        K: Clone,
        V: Clone,
    {
        WeakIter {
            map: self,
            shard: 0,
            pending: Vec::new().into_iter(),
        }
    }
}

/// Weakly consistent iterator over a [`StripedMap`]; see
/// [`StripedMap::iter`]. A `None` key is the null key.
pub struct WeakIter<'a, K, V, S> {
    map: &'a StripedMap<K, V, S>,
    shard: usize,
    pending: std::vec::IntoIter<(Option<K>, V)>,
}

impl<'a, K, V, S> Iterator for WeakIter<'a, K, V, S>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: BuildHasher,
{
    type Item = (Option<K>, V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(pair) = self.pending.next() {
                return Some(pair);
            }
            if self.shard >= self.map.shards.len() {
                return None;
            }
            let snapshot = {
                let shard = self.map.shards[self.shard].read();
                shard.pairs_cloned()
            };
            self.shard += 1;
            self.pending = snapshot.into_iter();
        }
    }
}
