//! Detached fail-fast cursor over a [`ChainMap`].
//!
//! A `Cursor` borrows nothing: like the map's other handle-style accessors
//! it is a bundle of ids and counters, and every step takes the map by
//! reference. That is what makes fail-fast detection expressible at all —
//! a borrowing iterator would rule out external mutation at compile time,
//! while a detached cursor can coexist with `put`/`remove` calls and must
//! instead detect them at run time.
//!
//! The cursor captures the map's structural-modification counter at
//! creation and re-validates it on every step; a mismatch fails with
//! [`MapError::ConcurrentStructuralChange`]. Removing the most recently
//! yielded entry through [`Cursor::remove_current`] re-captures the counter
//! instead of invalidating the cursor, mirroring iterator-owned removal.

use crate::error::MapError;
use crate::map::ChainMap;
use crate::table::EntryId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Start,
    At(EntryId),
    End,
}

/// Restartable fail-fast traversal handle. Create with
/// [`ChainMap::cursor`]; a finished or invalidated cursor is simply
/// replaced by a fresh one, which re-walks from the head and reflects all
/// changes made in the meantime.
#[derive(Debug, Clone)]
pub struct Cursor {
    expected_mods: u64,
    next: Position,
    last: Option<EntryId>,
}

impl Cursor {
    pub(crate) fn new(expected_mods: u64) -> Self {
        Self {
            expected_mods,
            next: Position::Start,
            last: None,
        }
    }

    fn check<K, V, S>(&self, map: &ChainMap<K, V, S>) -> Result<(), MapError> {
        if self.expected_mods != map.mods() {
            return Err(MapError::ConcurrentStructuralChange);
        }
        Ok(())
    }

    /// Yield the next `(key, value)` pair in the map's current order, or
    /// `Ok(None)` once exhausted.
    ///
    /// Fails with [`MapError::ConcurrentStructuralChange`] if the map was
    /// structurally modified since the cursor was created, other than
    /// through this cursor's own [`remove_current`](Self::remove_current).
    pub fn next<'a, K, V, S>(
        &mut self,
        map: &'a ChainMap<K, V, S>,
    ) -> Result<Option<(Option<&'a K>, &'a V)>, MapError> {
        self.check(map)?;
        let id = match self.next {
            Position::Start => map.table().first(),
            Position::At(id) => Some(id),
            Position::End => None,
        };
        let Some(id) = id else {
            self.next = Position::End;
            self.last = None;
            return Ok(None);
        };
        self.last = Some(id);
        self.next = match map.table().next(id) {
            Some(n) => Position::At(n),
            None => Position::End,
        };
        match map.table().pair(id) {
            Some(pair) => Ok(Some(pair)),
            // A vanished id can only mean a structural change the counter
            // failed to witness.
            None => Err(MapError::ConcurrentStructuralChange),
        }
    }

    /// Remove the entry most recently yielded by [`next`](Self::next) and
    /// return its value. Returns `Ok(None)` when there is no current entry
    /// (before the first `next`, after exhaustion, or twice in a row).
    ///
    /// The removal counts as this cursor's own: the captured counter is
    /// updated and traversal continues from the following entry.
    pub fn remove_current<K, V, S>(
        &mut self,
        map: &mut ChainMap<K, V, S>,
    ) -> Result<Option<V>, MapError> {
        self.check(map)?;
        let Some(id) = self.last.take() else {
            return Ok(None);
        };
        let removed = map.remove_by_cursor(id);
        self.expected_mods = map.mods();
        Ok(removed)
    }
}
