//! Construction options and tuning constants.

/// Initial bucket count used by [`Options::default`]. Always rounded up to a
/// power of two.
pub const DEFAULT_INITIAL_CAPACITY: usize = 16;

/// Fill ratio that triggers a resize, used by [`Options::default`].
pub const DEFAULT_LOAD_FACTOR: f32 = 0.75;

/// Shard count used by `to_concurrent` callers that do not care. Rounded up
/// to a power of two by the striped map.
pub const DEFAULT_SHARD_COUNT: usize = 16;

/// Largest bucket count a table will grow to. Growing past this fails with
/// `CapacityOverflow`.
pub(crate) const MAX_CAPACITY: usize = 1 << 30;

/// Chain length above which a bucket is reorganized into its sorted form,
/// provided the table is at least `MIN_REORGANIZE_CAPACITY` buckets. Below
/// that capacity a resize is preferred, since short tables produce long
/// chains even with well-distributed hashes.
pub(crate) const REORGANIZE_THRESHOLD: usize = 8;

/// Sorted buckets shrink back into plain chains below this length.
pub(crate) const REVERT_THRESHOLD: usize = 6;

/// Minimum table capacity for chain reorganization.
pub(crate) const MIN_REORGANIZE_CAPACITY: usize = 64;

/// Iteration order maintained by a map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderMode {
    /// Iteration follows bucket placement. The order is unspecified and may
    /// change across insertions and resizes; this is documented behavior,
    /// not a defect.
    #[default]
    Unordered,
    /// Entries iterate in the order their keys were first inserted.
    /// Replacing a value does not move the entry.
    Insertion,
    /// Every hit (`get`, or `put` on an existing key) moves the entry to the
    /// back of the order. The front is the least recently used entry, which
    /// lets callers build eviction on top.
    Access,
}

/// Construction options for [`ChainMap`](crate::ChainMap) and
/// [`StripedMap`](crate::StripedMap).
///
/// `load_factor` must be in `(0, 1]`; constructors panic otherwise.
#[derive(Debug, Clone, Copy)]
pub struct Options {
    /// Initial bucket count, rounded up to a power of two.
    pub initial_capacity: usize,
    /// Fill ratio (`size / capacity`) above which the table doubles.
    pub load_factor: f32,
    /// Iteration order. Striped maps always use [`OrderMode::Unordered`].
    pub order: OrderMode,
    /// Whether a single null key (`None`) is permitted. When `false`,
    /// presenting a null key fails with `InvalidKey` before the table is
    /// touched.
    pub allow_null_key: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            load_factor: DEFAULT_LOAD_FACTOR,
            order: OrderMode::Unordered,
            allow_null_key: true,
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    pub fn load_factor(mut self, load_factor: f32) -> Self {
        self.load_factor = load_factor;
        self
    }

    pub fn order(mut self, order: OrderMode) -> Self {
        self.order = order;
        self
    }

    pub fn allow_null_key(mut self, allow: bool) -> Self {
        self.allow_null_key = allow;
        self
    }
}
