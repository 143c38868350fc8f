//! chainmap: a chaining hash map engine with configurable iteration order,
//! a null-key policy, and a striped concurrent variant.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: build the map in safe, verifiable layers so each piece can be
//!   reasoned about independently.
//! - Layers:
//!   - `Table<K, V>` (crate-private): structural bucket table. Entries live
//!     in a generational slot arena; chains, sorted buckets, and traversal
//!     order all hold arena ids, never owning pointers. Owns the resize
//!     engine (power-of-two doubling, deterministic bucket splitting) and
//!     the long-chain reorganization into sorted buckets.
//!   - `ChainMap<K, V, S>`: single-threaded facade adding the hasher, the
//!     null-key policy, iteration ordering, the structural-modification
//!     counter, and detached fail-fast `Cursor`s.
//!   - `StripedMap<K, V, S>`: thread-safe facade over power-of-two shards
//!     of the same table type, each behind its own `parking_lot::RwLock`,
//!     striped by the high bits of the hash so shard selection never
//!     changes as shards resize.
//!
//! Constraints
//! - `ChainMap` is single-threaded by contract: external mutation during
//!   traversal is caller error, detected best-effort by fail-fast cursors.
//! - `StripedMap` is shared by reference across threads; writers block only
//!   their own shard, and global views take shard locks in ascending index
//!   order.
//! - No per-entry heap allocations beyond the arena's own storage.
//! - No `unsafe`.
//!
//! Hasher and rehashing invariants
//! - Each entry stores a precomputed `u64` hash and bucket placement always
//!   derives from the stored hash; `K: Hash` is never invoked after
//!   insertion, so resizes make no calls into user code.
//! - The hash/equality contract is the caller's: equal keys must hash
//!   equal, and both must be pure while the key is in the map. The map
//!   does not detect violations — a key mutated in place (via interior
//!   mutability) simply stops being found, while its entry remains
//!   reachable through iteration, uncorrupted, until removed by other
//!   means.
//!
//! Nullable keys
//! - Public operations take `Option<K>` (and `Option<&Q>` for borrowed
//!   lookups); `None` is the single null key, with a reserved hash and
//!   identity equality. Whether null is accepted at all is a per-map
//!   construction option; a forbidding map rejects null keys with
//!   `MapError::InvalidKey` before touching the table.
//!
//! Notes and non-goals
//! - Hashing is whatever `S: BuildHasher` provides; no hardening beyond
//!   the default `RandomState` is attempted.
//! - Eviction is not built in: access order plus `iter().next()` (the
//!   least recently used entry) is the intended building block.
//! - No persistence or serialization; `iter()` plus `put_all` are the
//!   hooks external serializers need.
//! - Public API surface is `ChainMap`, `StripedMap`, `Cursor`, `Options`,
//!   `OrderMode`, and `MapError`; the table layer is an implementation
//!   detail.

mod config;
mod cursor;
mod error;
mod map;
mod order;
mod striped;
mod table;
mod table_proptest;

pub use config::{
    OrderMode, Options, DEFAULT_INITIAL_CAPACITY, DEFAULT_LOAD_FACTOR, DEFAULT_SHARD_COUNT,
};
pub use cursor::Cursor;
pub use error::MapError;
pub use map::{ChainMap, Iter};
pub use striped::{StripedMap, WeakIter};
