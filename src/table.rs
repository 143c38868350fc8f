//! Bucket table, resize engine, and long-chain reorganization.
//!
//! Entries live in a generational slot arena (`slotmap`); buckets, chain
//! links, and traversal order all hold `EntryId` index slots into it, never
//! owning pointers. Rehashing therefore only rewrites ids and can never
//! invalidate an entry that callers still reference by id.
//!
//! Each entry stores its precomputed `u64` hash; `K: Hash` is never invoked
//! after insertion, so a resize makes no calls into user code. Hashing
//! itself is the facades' concern: every probing method here takes the hash
//! as a parameter, which keeps the table free of the `BuildHasher` type
//! parameter and lets the striped map share one hasher across shards.
//!
//! A bucket is normally a singly linked chain, appended at the tail. A chain
//! that grows past `REORGANIZE_THRESHOLD` in a table of at least
//! `MIN_REORGANIZE_CAPACITY` buckets is reorganized into a `Sorted` bucket:
//! entry ids kept sorted by `(hash, seq)` and binary-searched on lookup,
//! bounding worst-case probes at O(log n) even under adversarial hashing.
//! `seq` is a per-table insertion sequence number that breaks ties between
//! equal hashes. Sorted buckets revert to chains below `REVERT_THRESHOLD`.

use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};
use core::mem;

use slotmap::{DefaultKey, SlotMap};

use crate::config::{
    Options, OrderMode, MAX_CAPACITY, MIN_REORGANIZE_CAPACITY, REORGANIZE_THRESHOLD,
    REVERT_THRESHOLD,
};
use crate::error::MapError;
use crate::order::{OrderLinks, OrderList};

/// Generational id of an entry in the slot arena.
pub(crate) type EntryId = DefaultKey;

/// Entry storage. Generational keys make stale ids unresolvable rather than
/// aliasing reused slots.
pub(crate) type Slots<K, V> = SlotMap<EntryId, Entry<K, V>>;

/// Reserved hash for the null key; null always lands in bucket zero.
pub(crate) const NULL_KEY_HASH: u64 = 0;

/// A stored key: either the single reserved null slot or a caller key.
///
/// Null equals only null and hashes to [`NULL_KEY_HASH`], so it flows
/// through the ordinary bucket machinery like any other entry (and keeps its
/// place in the traversal order).
#[derive(Debug)]
pub(crate) enum KeySlot<K> {
    Null,
    Key(K),
}

impl<K> KeySlot<K> {
    pub(crate) fn as_option(&self) -> Option<&K> {
        match self {
            KeySlot::Null => None,
            KeySlot::Key(k) => Some(k),
        }
    }

    pub(crate) fn into_option(self) -> Option<K> {
        match self {
            KeySlot::Null => None,
            KeySlot::Key(k) => Some(k),
        }
    }
}

/// Hash a nullable key with the facade's hasher.
pub(crate) fn hash_key<S, Q>(hasher: &S, key: Option<&Q>) -> u64
where
    S: BuildHasher,
    Q: ?Sized + Hash,
{
    match key {
        None => NULL_KEY_HASH,
        Some(k) => hasher.hash_one(k),
    }
}

pub(crate) struct Entry<K, V> {
    pub key: KeySlot<K>,
    pub value: V,
    /// Hash computed once at insertion; bucket placement always derives
    /// from this stored value.
    pub hash: u64,
    /// Insertion sequence number, the tie-break within sorted buckets.
    pub seq: u64,
    /// Chain link. `None` while the entry sits in a sorted bucket.
    pub next: Option<EntryId>,
    pub links: OrderLinks,
}

enum Bucket {
    /// Head of a singly linked chain threaded through `Entry::next`.
    Chain(Option<EntryId>),
    /// Reorganized bucket: ids sorted by `(hash, seq)`.
    Sorted(Vec<EntryId>),
}

fn empty_buckets(capacity: usize) -> Box<[Bucket]> {
    (0..capacity).map(|_| Bucket::Chain(None)).collect()
}

fn threshold_for(capacity: usize, load_factor: f32) -> usize {
    (capacity as f64 * load_factor as f64) as usize
}

/// Next capacity for a growing table, or `CapacityOverflow` at the ceiling.
pub(crate) fn grown_capacity(capacity: usize) -> Result<usize, MapError> {
    if capacity >= MAX_CAPACITY {
        return Err(MapError::CapacityOverflow);
    }
    Ok(capacity * 2)
}

/// Result of [`Table::put`].
pub(crate) enum PutOutcome<V> {
    /// A new entry was created.
    Inserted,
    /// An equals-equal key was already present; its value was replaced in
    /// place. `moved` reports whether access ordering relocated the entry,
    /// which counts as a structural change for fail-fast cursors.
    Replaced { old: V, moved: bool },
}

/// The bucket table plus resize engine. One table per plain map; one per
/// shard in the striped map.
pub(crate) struct Table<K, V> {
    buckets: Box<[Bucket]>,
    slots: Slots<K, V>,
    threshold: usize,
    load_factor: f32,
    order: OrderMode,
    list: OrderList,
    seq: u64,
}

impl<K, V> Table<K, V> {
    pub(crate) fn new(options: &Options) -> Self {
        assert!(
            options.load_factor > 0.0 && options.load_factor <= 1.0,
            "load factor must be in (0, 1]"
        );
        let capacity = options
            .initial_capacity
            .max(1)
            .next_power_of_two()
            .min(MAX_CAPACITY);
        Self {
            buckets: empty_buckets(capacity),
            slots: Slots::with_key(),
            threshold: threshold_for(capacity, options.load_factor),
            load_factor: options.load_factor,
            order: options.order,
            list: OrderList::default(),
            seq: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.buckets.len()
    }

    pub(crate) fn load_factor(&self) -> f32 {
        self.load_factor
    }

    pub(crate) fn order(&self) -> OrderMode {
        self.order
    }

    fn bucket_index(&self, hash: u64) -> usize {
        (hash as usize) & (self.buckets.len() - 1)
    }

    pub(crate) fn pair(&self, id: EntryId) -> Option<(Option<&K>, &V)> {
        self.slots.get(id).map(|e| (e.key.as_option(), &e.value))
    }

    pub(crate) fn value(&self, id: EntryId) -> Option<&V> {
        self.slots.get(id).map(|e| &e.value)
    }

    pub(crate) fn value_mut(&mut self, id: EntryId) -> Option<&mut V> {
        self.slots.get_mut(id).map(|e| &mut e.value)
    }

    /// Locate an entry by hash and an arbitrary match predicate.
    fn find_with(&self, hash: u64, matches: impl Fn(&Entry<K, V>) -> bool) -> Option<EntryId> {
        match &self.buckets[self.bucket_index(hash)] {
            Bucket::Chain(head) => {
                let mut cur = *head;
                while let Some(id) = cur {
                    let e = &self.slots[id];
                    if e.hash == hash && matches(e) {
                        return Some(id);
                    }
                    cur = e.next;
                }
                None
            }
            Bucket::Sorted(ids) => {
                let start = ids.partition_point(|&id| self.slots[id].hash < hash);
                ids[start..]
                    .iter()
                    .copied()
                    .take_while(|&id| self.slots[id].hash == hash)
                    .find(|&id| matches(&self.slots[id]))
            }
        }
    }

    /// Move an entry to the back of the access order. Returns whether it
    /// actually moved; a no-op move is not a structural change.
    pub(crate) fn promote(&mut self, id: EntryId) -> bool {
        if self.order != OrderMode::Access || self.list.tail() == Some(id) {
            return false;
        }
        if !self.slots.contains_key(id) {
            return false;
        }
        self.list.move_to_tail(&mut self.slots, id);
        true
    }

    /// First entry in the table's current traversal order.
    pub(crate) fn first(&self) -> Option<EntryId> {
        match self.order {
            OrderMode::Unordered => self.first_from_bucket(0),
            _ => self.list.head(),
        }
    }

    /// Successor of `id` in the table's current traversal order.
    pub(crate) fn next(&self, id: EntryId) -> Option<EntryId> {
        match self.order {
            OrderMode::Unordered => self.next_in_table(id),
            _ => self.slots.get(id)?.links.next,
        }
    }

    fn first_from_bucket(&self, start: usize) -> Option<EntryId> {
        for bucket in &self.buckets[start.min(self.buckets.len())..] {
            match bucket {
                Bucket::Chain(Some(head)) => return Some(*head),
                Bucket::Sorted(ids) if !ids.is_empty() => return Some(ids[0]),
                _ => {}
            }
        }
        None
    }

    fn next_in_table(&self, id: EntryId) -> Option<EntryId> {
        let e = self.slots.get(id)?;
        if let Some(next) = e.next {
            return Some(next);
        }
        let idx = self.bucket_index(e.hash);
        if let Bucket::Sorted(ids) = &self.buckets[idx] {
            if let Some(pos) = ids.iter().position(|&x| x == id) {
                if pos + 1 < ids.len() {
                    return Some(ids[pos + 1]);
                }
            }
        }
        self.first_from_bucket(idx + 1)
    }

    /// Unhook `id` from its bucket without touching arena or order state.
    fn detach(&mut self, idx: usize, id: EntryId) {
        match &mut self.buckets[idx] {
            Bucket::Chain(head) => {
                if *head == Some(id) {
                    *head = self.slots[id].next;
                    self.slots[id].next = None;
                    return;
                }
                let mut cur = *head;
                while let Some(c) = cur {
                    if self.slots[c].next == Some(id) {
                        self.slots[c].next = self.slots[id].next;
                        self.slots[id].next = None;
                        return;
                    }
                    cur = self.slots[c].next;
                }
            }
            Bucket::Sorted(ids) => {
                if let Some(pos) = ids.iter().position(|&x| x == id) {
                    ids.remove(pos);
                }
            }
        }
    }

    /// Rebuild a chain from ids, preserving their order.
    fn chain_of(&mut self, ids: &[EntryId]) -> Bucket {
        let mut head = None;
        for &id in ids.iter().rev() {
            self.slots[id].next = head;
            head = Some(id);
        }
        Bucket::Chain(head)
    }

    fn revert_to_chain(&mut self, idx: usize) {
        let ids = match &mut self.buckets[idx] {
            Bucket::Sorted(ids) => mem::take(ids),
            Bucket::Chain(_) => return,
        };
        self.buckets[idx] = self.chain_of(&ids);
    }

    /// Convert the chain at `idx` into its sorted form.
    fn reorganize(&mut self, idx: usize) {
        let head = match &self.buckets[idx] {
            Bucket::Chain(head) => *head,
            Bucket::Sorted(_) => return,
        };
        let mut ids = Vec::new();
        let mut cur = head;
        while let Some(id) = cur {
            ids.push(id);
            let next = self.slots[id].next;
            self.slots[id].next = None;
            cur = next;
        }
        ids.sort_by_key(|&id| {
            let e = &self.slots[id];
            (e.hash, e.seq)
        });
        self.buckets[idx] = Bucket::Sorted(ids);
    }

    /// Append a freshly inserted entry to its bucket. Returns the resulting
    /// chain length, or 0 for sorted buckets (which never re-reorganize).
    fn push_into_bucket(&mut self, idx: usize, id: EntryId) -> usize {
        let hash = self.slots[id].hash;
        let seq = self.slots[id].seq;
        match &mut self.buckets[idx] {
            Bucket::Chain(head) => match *head {
                None => {
                    *head = Some(id);
                    1
                }
                Some(first) => {
                    let mut len = 2;
                    let mut cur = first;
                    while let Some(next) = self.slots[cur].next {
                        cur = next;
                        len += 1;
                    }
                    self.slots[cur].next = Some(id);
                    len
                }
            },
            Bucket::Sorted(ids) => {
                let pos = ids.partition_point(|&other| {
                    let o = &self.slots[other];
                    (o.hash, o.seq) <= (hash, seq)
                });
                ids.insert(pos, id);
                0
            }
        }
    }

    /// Double the capacity and rehash. Capacity doubling sets exactly one
    /// additional index bit, so every bucket splits deterministically into
    /// bucket `i` and bucket `i + old_capacity`, preserving relative entry
    /// order on both sides.
    fn grow(&mut self) -> Result<(), MapError> {
        let old_capacity = self.buckets.len();
        let new_capacity = grown_capacity(old_capacity)?;
        let old = mem::replace(&mut self.buckets, empty_buckets(new_capacity));
        for (i, bucket) in old.into_vec().into_iter().enumerate() {
            match bucket {
                Bucket::Chain(head) => {
                    let (mut lo_head, mut lo_tail) = (None, None);
                    let (mut hi_head, mut hi_tail) = (None, None);
                    let mut cur = head;
                    while let Some(id) = cur {
                        let next = self.slots[id].next;
                        self.slots[id].next = None;
                        let stays = (self.slots[id].hash as usize) & old_capacity == 0;
                        let (head_ref, tail_ref) = if stays {
                            (&mut lo_head, &mut lo_tail)
                        } else {
                            (&mut hi_head, &mut hi_tail)
                        };
                        match *tail_ref {
                            None => *head_ref = Some(id),
                            Some(t) => self.slots[t].next = Some(id),
                        }
                        *tail_ref = Some(id);
                        cur = next;
                    }
                    self.buckets[i] = Bucket::Chain(lo_head);
                    self.buckets[i + old_capacity] = Bucket::Chain(hi_head);
                }
                Bucket::Sorted(ids) => {
                    let (lo, hi): (Vec<_>, Vec<_>) = ids
                        .into_iter()
                        .partition(|&id| (self.slots[id].hash as usize) & old_capacity == 0);
                    self.buckets[i] = self.sorted_or_chain(lo);
                    self.buckets[i + old_capacity] = self.sorted_or_chain(hi);
                }
            }
        }
        self.threshold = threshold_for(new_capacity, self.load_factor);
        Ok(())
    }

    /// Keep a split half sorted only while it stays above the revert
    /// threshold. `partition` preserves order, so the half is still sorted.
    fn sorted_or_chain(&mut self, ids: Vec<EntryId>) -> Bucket {
        if ids.len() < REVERT_THRESHOLD {
            self.chain_of(&ids)
        } else {
            Bucket::Sorted(ids)
        }
    }

    /// Remove the entry with generational id `id`, unhooking it from its
    /// bucket and the traversal order. Stale ids return `None`.
    pub(crate) fn remove_id(&mut self, id: EntryId) -> Option<(KeySlot<K>, V)> {
        let hash = self.slots.get(id)?.hash;
        let idx = self.bucket_index(hash);
        self.detach(idx, id);
        if let Bucket::Sorted(ids) = &self.buckets[idx] {
            if ids.len() < REVERT_THRESHOLD {
                self.revert_to_chain(idx);
            }
        }
        if self.order != OrderMode::Unordered {
            self.list.unlink(&mut self.slots, id);
        }
        let entry = self.slots.remove(id)?;
        Some((entry.key, entry.value))
    }

    /// Snapshot every entry, cloning keys and values. Order is arena
    /// order; used by the striped map, whose shards are unordered anyway.
    pub(crate) fn pairs_cloned(&self) -> Vec<(Option<K>, V)>
    where
        K: Clone,
        V: Clone,
    {
        self.slots
            .values()
            .map(|e| (e.key.as_option().cloned(), e.value.clone()))
            .collect()
    }

    /// Walk every entry in traversal order and drain the arena.
    pub(crate) fn into_pairs(mut self) -> Vec<(KeySlot<K>, V)> {
        let mut ids = Vec::with_capacity(self.slots.len());
        let mut cur = self.first();
        while let Some(id) = cur {
            ids.push(id);
            cur = self.next(id);
        }
        ids.into_iter()
            .filter_map(|id| self.slots.remove(id))
            .map(|e| (e.key, e.value))
            .collect()
    }
}

impl<K: Eq, V> Table<K, V> {
    /// Locate an entry by hash and a borrowed form of the key.
    pub(crate) fn find<Q>(&self, hash: u64, query: Option<&Q>) -> Option<EntryId>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        self.find_with(hash, |e| match (&e.key, query) {
            (KeySlot::Null, None) => true,
            (KeySlot::Key(k), Some(q)) => k.borrow() == q,
            _ => false,
        })
    }

    /// Insert or replace. On the insert path the resize (and its possible
    /// `CapacityOverflow`) happens before the entry is created, so a failed
    /// put leaves no partial state behind.
    pub(crate) fn put(
        &mut self,
        hash: u64,
        key: KeySlot<K>,
        value: V,
    ) -> Result<PutOutcome<V>, MapError> {
        let existing = self.find_with(hash, |e| match (&e.key, &key) {
            (KeySlot::Null, KeySlot::Null) => true,
            (KeySlot::Key(a), KeySlot::Key(b)) => a == b,
            _ => false,
        });
        if let Some(id) = existing {
            let old = mem::replace(&mut self.slots[id].value, value);
            let moved = self.promote(id);
            return Ok(PutOutcome::Replaced { old, moved });
        }

        if self.slots.len() + 1 > self.threshold {
            self.grow()?;
        }
        let idx = self.bucket_index(hash);
        let seq = self.seq;
        self.seq += 1;
        let id = self.slots.insert(Entry {
            key,
            value,
            hash,
            seq,
            next: None,
            links: OrderLinks::default(),
        });
        let chain_len = self.push_into_bucket(idx, id);
        if self.order != OrderMode::Unordered {
            self.list.push_tail(&mut self.slots, id);
        }
        if chain_len > REORGANIZE_THRESHOLD {
            if self.buckets.len() >= MIN_REORGANIZE_CAPACITY {
                self.reorganize(idx);
            } else {
                // Short tables grow instead; capacity here is < 64 so this
                // cannot overflow.
                self.grow()?;
            }
        }
        Ok(PutOutcome::Inserted)
    }

    /// Remove by hash and borrowed key.
    pub(crate) fn remove<Q>(&mut self, hash: u64, query: Option<&Q>) -> Option<(KeySlot<K>, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let id = self.find(hash, query)?;
        self.remove_id(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Options;

    fn table(capacity: usize) -> Table<u64, u64> {
        Table::new(&Options::new().initial_capacity(capacity))
    }

    fn put(t: &mut Table<u64, u64>, hash: u64, key: u64, value: u64) -> PutOutcome<u64> {
        t.put(hash, KeySlot::Key(key), value)
            .expect("capacity overflow in test")
    }

    /// Invariant: `grown_capacity` doubles below the ceiling and fails at it
    /// without side effects.
    #[test]
    fn grown_capacity_overflow() {
        assert_eq!(grown_capacity(16), Ok(32));
        assert_eq!(grown_capacity(MAX_CAPACITY / 2), Ok(MAX_CAPACITY));
        assert_eq!(grown_capacity(MAX_CAPACITY), Err(MapError::CapacityOverflow));
    }

    /// Invariant: entries whose hashes share low bits split into exactly two
    /// buckets on resize and every key stays retrievable.
    #[test]
    fn resize_splits_and_preserves_entries() {
        let mut t = table(4);
        // Force growth by exceeding the threshold (4 * 0.75 = 3).
        for k in 0..32u64 {
            put(&mut t, k, k, k * 10);
        }
        assert!(t.capacity() > 4);
        for k in 0..32u64 {
            let id = t.find(k, Some(&k)).expect("key survives resize");
            assert_eq!(t.value(id), Some(&(k * 10)));
        }
        assert_eq!(t.len(), 32);
    }

    /// Invariant: a chain past the reorganization threshold in a large table
    /// becomes a sorted bucket and lookups still resolve by equality.
    #[test]
    fn long_chain_reorganizes_in_large_table() {
        let mut t = table(64);
        // All keys collide on hash 1; capacity 64 stays fixed because the
        // threshold (48) is never crossed.
        for k in 0..12u64 {
            put(&mut t, 1, k, k);
        }
        assert_eq!(t.capacity(), 64);
        for k in 0..12u64 {
            let id = t.find(1, Some(&k)).expect("collided key present");
            assert_eq!(t.value(id), Some(&k));
        }
        // Hash 2 was never inserted even though it maps elsewhere.
        assert!(t.find(2, Some(&99)).is_none());
    }

    /// Invariant: small tables resolve overlong chains by growing rather
    /// than reorganizing.
    #[test]
    fn long_chain_grows_small_table() {
        let mut t = table(16);
        // Nine entries in one bucket of a 16-bucket table: below the size
        // threshold (12) but past the chain threshold, which must grow the
        // table instead of reorganizing.
        for k in 0..9u64 {
            put(&mut t, (k * 16) << 32 | 5, k, k);
        }
        assert!(t.capacity() > 16);
        for k in 0..9u64 {
            assert!(t.find((k * 16) << 32 | 5, Some(&k)).is_some());
        }
    }

    /// Invariant: a sorted bucket reverts to a chain once removals shrink it
    /// below the revert threshold, and the survivors stay reachable.
    #[test]
    fn sorted_bucket_reverts_after_removals() {
        let mut t = table(64);
        for k in 0..12u64 {
            put(&mut t, 1, k, k);
        }
        for k in 0..8u64 {
            assert!(t.remove(1, Some(&k)).is_some());
        }
        for k in 8..12u64 {
            let id = t.find(1, Some(&k)).expect("survivor reachable");
            assert_eq!(t.value(id), Some(&k));
        }
        // Idempotence: removing an absent key is a no-op.
        assert!(t.remove(1, Some(&0)).is_none());
        assert_eq!(t.len(), 4);
    }

    /// Invariant: replacing a value never creates a second entry for an
    /// equals-equal key.
    #[test]
    fn replace_keeps_single_entry() {
        let mut t = table(16);
        put(&mut t, 7, 42, 1);
        match put(&mut t, 7, 42, 2) {
            PutOutcome::Replaced { old, moved } => {
                assert_eq!(old, 1);
                assert!(!moved);
            }
            PutOutcome::Inserted => panic!("expected replacement"),
        }
        assert_eq!(t.len(), 1);
        let id = t.find(7, Some(&42)).expect("present");
        assert_eq!(t.value(id), Some(&2));
    }

    /// Invariant: the null key occupies bucket zero, equals only itself, and
    /// coexists with a colliding non-null key of hash zero.
    #[test]
    fn null_key_is_distinct_from_hash_zero_keys() {
        let mut t: Table<u64, u64> = table(16);
        t.put(NULL_KEY_HASH, KeySlot::Null, 100).expect("put null");
        t.put(NULL_KEY_HASH, KeySlot::Key(0), 200).expect("put 0");
        assert_eq!(t.len(), 2);

        let null_id = t.find::<u64>(NULL_KEY_HASH, None).expect("null present");
        assert_eq!(t.value(null_id), Some(&100));
        let zero_id = t.find(NULL_KEY_HASH, Some(&0)).expect("zero present");
        assert_eq!(t.value(zero_id), Some(&200));
        assert_ne!(null_id, zero_id);

        let (slot, v) = t.remove::<u64>(NULL_KEY_HASH, None).expect("remove null");
        assert!(slot.into_option().is_none());
        assert_eq!(v, 100);
        assert!(t.find::<u64>(NULL_KEY_HASH, None).is_none());
        assert!(t.find(NULL_KEY_HASH, Some(&0)).is_some());
    }

    /// Invariant: table-order traversal visits every entry exactly once,
    /// including entries inside sorted buckets.
    #[test]
    fn table_order_walk_covers_sorted_buckets() {
        let mut t = table(64);
        for k in 0..12u64 {
            put(&mut t, 1, k, k); // sorted bucket at index 1
        }
        for k in 100..104u64 {
            put(&mut t, k, k, k); // scattered chains
        }
        let mut seen = Vec::new();
        let mut cur = t.first();
        while let Some(id) = cur {
            let (k, _) = t.pair(id).expect("live entry");
            seen.push(*k.expect("non-null key"));
            cur = t.next(id);
        }
        seen.sort_unstable();
        let expected: Vec<u64> = (0..12).chain(100..104).collect();
        assert_eq!(seen, expected);
    }
}
