//! `ChainMap`: the single-threaded facade.
//!
//! The facade owns the hasher and adds everything the bare table leaves to
//! its caller: the null-key policy (checked before the table is touched),
//! the structural-modification counter backing fail-fast cursors, and the
//! borrowing iterator. It holds exactly one table; the table is swapped
//! wholesale during resize, so callers only ever observe the old or the
//! fully rehashed layout.
//!
//! Keys are nullable: public operations take `Option<K>` (or `Option<&Q>`
//! for borrowed lookups), with `None` standing for the single null key.
//! Whether null is allowed at all is decided at construction.
//!
//! Hash/equality contract: `K: Hash + Eq` must satisfy the usual law that
//! equal keys hash equal, and both must be pure over the key's lifetime in
//! the map. The hash is computed once at insertion; mutating a stored key
//! through interior mutability is a caller error the map does not detect —
//! lookups simply miss the stale bucket, while the entry itself stays
//! reachable through iteration and is neither corrupted nor leaked.

use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};
use std::collections::hash_map::RandomState;

use crate::config::Options;
use crate::cursor::Cursor;
use crate::error::MapError;
use crate::striped::StripedMap;
use crate::table::{hash_key, EntryId, KeySlot, PutOutcome, Table};

/// A chaining hash map with configurable iteration order and null-key
/// policy. Single-threaded: concurrent external mutation during traversal
/// is a caller error, detected best-effort by fail-fast [`Cursor`]s.
pub struct ChainMap<K, V, S = RandomState> {
    table: Table<K, V>,
    hasher: S,
    allow_null_key: bool,
    mods: u64,
}

impl<K, V> ChainMap<K, V>
where
    K: Hash + Eq,
{
    /// Creates a map with [`Options::default`]: capacity 16, load factor
    /// 0.75, unordered iteration, null key allowed.
    pub fn new() -> Self {
        Self::with_options(Options::default())
    }

    pub fn with_options(options: Options) -> Self {
        Self::with_options_and_hasher(options, RandomState::default())
    }
}

impl<K, V> Default for ChainMap<K, V>
where
    K: Hash + Eq,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> ChainMap<K, V, S> {
    pub(crate) fn mods(&self) -> u64 {
        self.mods
    }

    pub(crate) fn table(&self) -> &Table<K, V> {
        &self.table
    }

    pub(crate) fn remove_by_cursor(&mut self, id: EntryId) -> Option<V> {
        let (_, value) = self.table.remove_id(id)?;
        self.mods = self.mods.wrapping_add(1);
        Some(value)
    }

    fn bump_mods(&mut self) {
        self.mods = self.mods.wrapping_add(1);
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.len() == 0
    }

    /// Current bucket count. Always a power of two.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Lazy traversal of `(key, value)` pairs in the map's current order.
    /// The borrow rules make this iterator immune to structural changes;
    /// use [`cursor`](Self::cursor) when traversal must interleave with
    /// mutation.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            table: &self.table,
            next: self.table.first(),
        }
    }

    /// Detached fail-fast traversal handle; see [`Cursor`].
    pub fn cursor(&self) -> Cursor {
        Cursor::new(self.mods)
    }
}

impl<K, V, S> ChainMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Creates a map with explicit options and hasher.
    ///
    /// Panics if `options.load_factor` is outside `(0, 1]`.
    pub fn with_options_and_hasher(options: Options, hasher: S) -> Self {
        Self {
            table: Table::new(&options),
            hasher,
            allow_null_key: options.allow_null_key,
            mods: 0,
        }
    }

    fn check_key<T>(&self, key: &Option<T>) -> Result<(), MapError> {
        if key.is_none() && !self.allow_null_key {
            return Err(MapError::InvalidKey);
        }
        Ok(())
    }

    /// Insert or replace. Returns the previous value for an equals-equal
    /// key, `Ok(None)` for a fresh insertion.
    ///
    /// Fails with [`MapError::InvalidKey`] when `key` is `None` and the
    /// policy forbids null keys, and with [`MapError::CapacityOverflow`]
    /// when a required resize would exceed the maximum capacity; both
    /// failures leave the map unchanged.
    pub fn put(&mut self, key: Option<K>, value: V) -> Result<Option<V>, MapError> {
        self.check_key(&key)?;
        let hash = hash_key(&self.hasher, key.as_ref());
        let slot = match key {
            None => KeySlot::Null,
            Some(k) => KeySlot::Key(k),
        };
        match self.table.put(hash, slot, value)? {
            PutOutcome::Inserted => {
                self.bump_mods();
                Ok(None)
            }
            PutOutcome::Replaced { old, moved } => {
                // An access-order relocation is a structural change as far
                // as fail-fast cursors are concerned.
                if moved {
                    self.bump_mods();
                }
                Ok(Some(old))
            }
        }
    }

    /// Look up a value. In access-order mode a hit moves the entry to the
    /// back of the iteration order, hence `&mut self`; use
    /// [`peek`](Self::peek) to look without promoting.
    pub fn get<Q>(&mut self, key: Option<&Q>) -> Result<Option<&V>, MapError>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.check_key(&key)?;
        let hash = hash_key(&self.hasher, key);
        let Some(id) = self.table.find(hash, key) else {
            return Ok(None);
        };
        if self.table.promote(id) {
            self.bump_mods();
        }
        Ok(self.table.value(id))
    }

    /// Look up a value without affecting access order.
    pub fn peek<Q>(&self, key: Option<&Q>) -> Result<Option<&V>, MapError>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.check_key(&key)?;
        let hash = hash_key(&self.hasher, key);
        Ok(self.table.find(hash, key).and_then(|id| self.table.value(id)))
    }

    /// Mutable access to a value without affecting access order.
    pub fn peek_mut<Q>(&mut self, key: Option<&Q>) -> Result<Option<&mut V>, MapError>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.check_key(&key)?;
        let hash = hash_key(&self.hasher, key);
        match self.table.find(hash, key) {
            Some(id) => Ok(self.table.value_mut(id)),
            None => Ok(None),
        }
    }

    /// Remove an entry and return its value.
    pub fn remove<Q>(&mut self, key: Option<&Q>) -> Result<Option<V>, MapError>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.check_key(&key)?;
        let hash = hash_key(&self.hasher, key);
        match self.table.remove(hash, key) {
            Some((_, value)) => {
                self.bump_mods();
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
        self.table.find(hash, key).is_some()
    }

    /// Bulk insertion, e.g. to rebuild a map from an iterated stream of
    /// pairs. Stops at the first error; already-inserted pairs remain.
    pub fn put_all<I>(&mut self, pairs: I) -> Result<(), MapError>
    where
        I: IntoIterator<Item = (Option<K>, V)>,
    {
        for (key, value) in pairs {
            self.put(key, value)?;
        }
        Ok(())
    }

    /// Move the contents into a thread-safe [`StripedMap`] with
    /// `shard_count` shards (rounded up to a power of two), keeping the
    /// hasher, load factor, and null-key policy. Iteration order does not
    /// carry over: striped maps are always unordered.
    pub fn to_concurrent(self, shard_count: usize) -> Result<StripedMap<K, V, S>, MapError>
    where
        S: Clone,
    {
        StripedMap::from_parts(self, shard_count)
    }

    pub(crate) fn into_parts(self) -> (Table<K, V>, S, bool) {
        (self.table, self.hasher, self.allow_null_key)
    }
}

/// Borrowing iterator over `(key, value)` pairs in the map's current order.
/// A `None` key is the null key.
pub struct Iter<'a, K, V> {
    table: &'a Table<K, V>,
    next: Option<EntryId>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (Option<&'a K>, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        self.next = self.table.next(id);
        self.table.pair(id)
    }
}

impl<'a, K, V, S> IntoIterator for &'a ChainMap<K, V, S> {
    type Item = (Option<&'a K>, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
