//! Intrusive doubly-linked traversal order over arena slots.
//!
//! The list never owns entries: `prev`/`next` are generational ids into the
//! table's slot arena, so linking and unlinking only rewrite id slots.
//! Bucket placement and traversal order are fully independent; a resize can
//! move every entry between buckets without touching a single link here.

use crate::table::{EntryId, Slots};

/// Per-entry order links. Unused (all `None`) when the owning table runs in
/// unordered mode.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct OrderLinks {
    pub prev: Option<EntryId>,
    pub next: Option<EntryId>,
}

/// Head/tail of the traversal sequence.
#[derive(Debug, Default)]
pub(crate) struct OrderList {
    head: Option<EntryId>,
    tail: Option<EntryId>,
}

impl OrderList {
    pub(crate) fn head(&self) -> Option<EntryId> {
        self.head
    }

    pub(crate) fn tail(&self) -> Option<EntryId> {
        self.tail
    }

    /// Append `id` at the tail. `id` must not currently be linked.
    pub(crate) fn push_tail<K, V>(&mut self, slots: &mut Slots<K, V>, id: EntryId) {
        let old_tail = self.tail;
        {
            let links = &mut slots[id].links;
            links.prev = old_tail;
            links.next = None;
        }
        match old_tail {
            Some(t) => slots[t].links.next = Some(id),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
    }

    /// Detach `id` from the sequence and clear its links.
    pub(crate) fn unlink<K, V>(&mut self, slots: &mut Slots<K, V>, id: EntryId) {
        let OrderLinks { prev, next } = slots[id].links;
        match prev {
            Some(p) => slots[p].links.next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => slots[n].links.prev = prev,
            None => self.tail = prev,
        }
        slots[id].links = OrderLinks::default();
    }

    /// Move `id` to the tail. No-op when it already is the tail.
    pub(crate) fn move_to_tail<K, V>(&mut self, slots: &mut Slots<K, V>, id: EntryId) {
        if self.tail == Some(id) {
            return;
        }
        self.unlink(slots, id);
        self.push_tail(slots, id);
    }
}

#[cfg(test)]
mod tests {
    use super::OrderList;
    use crate::order::OrderLinks;
    use crate::table::{Entry, EntryId, KeySlot, Slots};

    fn entry(n: i32) -> Entry<i32, i32> {
        Entry {
            key: KeySlot::Key(n),
            value: n,
            hash: 0,
            seq: 0,
            next: None,
            links: OrderLinks::default(),
        }
    }

    fn collect(list: &OrderList, slots: &Slots<i32, i32>) -> Vec<EntryId> {
        let mut out = Vec::new();
        let mut cur = list.head();
        while let Some(id) = cur {
            out.push(id);
            cur = slots[id].links.next;
        }
        out
    }

    #[test]
    fn push_unlink_and_move_maintain_sequence() {
        let mut slots: Slots<i32, i32> = Slots::with_key();
        let mut list = OrderList::default();

        let a = slots.insert(entry(1));
        let b = slots.insert(entry(2));
        let c = slots.insert(entry(3));
        for id in [a, b, c] {
            list.push_tail(&mut slots, id);
        }
        assert_eq!(collect(&list, &slots), vec![a, b, c]);

        list.move_to_tail(&mut slots, a);
        assert_eq!(collect(&list, &slots), vec![b, c, a]);

        // Moving the current tail is a no-op.
        list.move_to_tail(&mut slots, a);
        assert_eq!(collect(&list, &slots), vec![b, c, a]);

        list.unlink(&mut slots, c);
        assert_eq!(collect(&list, &slots), vec![b, a]);
        assert_eq!(list.tail(), Some(a));

        list.unlink(&mut slots, b);
        list.unlink(&mut slots, a);
        assert_eq!(list.head(), None);
        assert_eq!(list.tail(), None);
    }
}
