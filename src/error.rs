//! Errors shared by the plain and striped maps.
//!
//! All errors are reported synchronously by the operation that caused them
//! and none are retried internally. `InvalidKey` and `CapacityOverflow`
//! leave the map unchanged; `ConcurrentStructuralChange` is recovered by
//! creating a fresh cursor.

use thiserror::Error;

/// Error type for map operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MapError {
    /// A null key was presented while the map's policy forbids null keys.
    /// The table was not touched.
    #[error("null key rejected by map policy")]
    InvalidKey,

    /// A fail-fast cursor observed a structural change that was not made
    /// through the cursor itself. Restart iteration with a new cursor.
    #[error("map was structurally modified during cursor traversal")]
    ConcurrentStructuralChange,

    /// Growing the table would exceed the maximum supported capacity. The
    /// triggering operation was aborted without partial mutation.
    #[error("map capacity would exceed the supported maximum")]
    CapacityOverflow,
}
