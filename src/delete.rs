use core::ptr;

use crate::common::{last_leaf, move_pairs, shift_pairs, NodeRef};
use crate::node_alloc::dealloc_node;
use crate::{Error, ForgetOutcome, PopOutcome, SkipMap};

impl<K, V> SkipMap<K, V> {
    /// Remove a binding by key. `LOCKED` while any cursor is live.
    pub fn forget(&mut self, key: &K) -> Result<ForgetOutcome<K, V>, Error> {
        if self.locked() {
            return Err(Error::Locked);
        }
        let result = self.search(key);
        if !result.found {
            return Ok(ForgetOutcome::NotFound);
        }
        let (k, v) = unsafe { self.remove_at(result.leaf, result.idx) };
        self.len -= 1;
        Ok(ForgetOutcome::Removed(k, v))
    }

    /// Remove and return the minimum binding.
    pub fn pop_first(&mut self) -> Result<PopOutcome<K, V>, Error> {
        if self.locked() {
            return Err(Error::Locked);
        }
        let root = self.root();
        if unsafe { root.count() } == 0 {
            return Ok(PopOutcome::Empty);
        }
        let (k, v) = unsafe { self.remove_at(root, 0) };
        self.len -= 1;
        Ok(PopOutcome::Popped(k, v))
    }

    /// Remove and return the maximum binding.
    pub fn pop_last(&mut self) -> Result<PopOutcome<K, V>, Error> {
        if self.locked() {
            return Err(Error::Locked);
        }
        let last = match unsafe { last_leaf(&self.heads, self.height, &self.layout) } {
            Some(leaf) => leaf,
            None => return Ok(PopOutcome::Empty),
        };
        let count = unsafe { last.count() };
        if count == 0 {
            return Ok(PopOutcome::Empty);
        }
        let (k, v) = unsafe { self.remove_at(last, count - 1) };
        self.len -= 1;
        Ok(PopOutcome::Popped(k, v))
    }

    /// Remove the entry at window-local index `idx` in `leaf`, per the
    /// three index cases in `spec.md` §4.5, then rebalance if the leaf
    /// dropped below half-full.
    unsafe fn remove_at(&mut self, leaf: NodeRef, idx: u16) -> (K, Option<V>) {
        let cap = self.layout.cap;
        let has_values = self.value_mode.has_values();
        let offset = leaf.offset();
        let count = leaf.count();
        let slot = offset + idx;

        let key = ptr::read(leaf.key_at::<K>(&self.layout, slot));
        let value = if has_values {
            Some(ptr::read(leaf.val_at::<V>(&self.layout, slot)))
        } else {
            None
        };

        if idx == 0 {
            let advanced = offset + 1;
            leaf.set_offset(if advanced == cap { cap / 2 } else { advanced });
            leaf.set_count(count - 1);
        } else if idx == count - 1 {
            leaf.set_count(count - 1);
        } else {
            shift_pairs::<K, V>(leaf, &self.layout, has_values, slot + 1, count - idx - 1, slot);
            leaf.set_count(count - 1);
        }

        if leaf.count() < cap / 2 && !self.is_lone(leaf) {
            self.steal_or_merge(leaf);
        }

        (key, value)
    }

    #[inline]
    unsafe fn is_lone(&self, leaf: NodeRef) -> bool {
        leaf.back(&self.layout).is_none() && leaf.fwd(&self.layout, 0).is_none()
    }

    /// Restore the half-full invariant on an underflowed leaf: merge with
    /// the next leaf if they fit together, else steal entries from the
    /// next leaf's front, else (if this is the last leaf) merge into its
    /// back if they fit, else leave it under-full. Grounded on
    /// `shift_or_merge` in `skiparray.c`.
    unsafe fn steal_or_merge(&mut self, leaf: NodeRef) {
        let cap = self.layout.cap;
        if let Some(next) = leaf.fwd(&self.layout, 0) {
            if leaf.count() + next.count() <= cap {
                self.merge_into(leaf, next);
            } else {
                self.steal_from_next(leaf, next);
            }
        } else if let Some(back) = leaf.back(&self.layout) {
            if back.count() + leaf.count() <= cap {
                self.merge_into(back, leaf);
            }
        }
    }

    /// Move all of `src`'s entries into `dst`, then unlink and free `src`.
    unsafe fn merge_into(&mut self, dst: NodeRef, src: NodeRef) {
        let cap = self.layout.cap;
        let has_values = self.value_mode.has_values();
        if dst.offset() + dst.count() + src.count() > cap {
            shift_pairs::<K, V>(dst, &self.layout, has_values, dst.offset(), dst.count(), 0);
            dst.set_offset(0);
        }
        let dst_write = dst.offset() + dst.count();
        move_pairs::<K, V>(
            src,
            src.offset(),
            dst,
            dst_write,
            &self.layout,
            has_values,
            src.count(),
        );
        dst.set_count(dst.count() + src.count());
        self.unlink_node(src);
        dealloc_node(src.0, &self.layout, self.mem, self.udata);
    }

    /// Move `next.count() - capacity/2` entries from the front of `next`
    /// into the back of `leaf`, advancing `next`'s offset.
    unsafe fn steal_from_next(&mut self, leaf: NodeRef, next: NodeRef) {
        let cap = self.layout.cap;
        let has_values = self.value_mode.has_values();
        let steal = next.count() - cap / 2;

        if leaf.offset() + leaf.count() + steal > cap {
            shift_pairs::<K, V>(leaf, &self.layout, has_values, leaf.offset(), leaf.count(), 0);
            leaf.set_offset(0);
        }
        let dst_write = leaf.offset() + leaf.count();
        move_pairs::<K, V>(
            next,
            next.offset(),
            leaf,
            dst_write,
            &self.layout,
            has_values,
            steal,
        );
        leaf.set_count(leaf.count() + steal);
        next.set_offset(next.offset() + steal);
        next.set_count(next.count() - steal);
    }

    /// Splice a doomed node out of every level it participates in, walking
    /// from its height down to 0, then update the surviving next node's
    /// back pointer and shrink `height` while the top head is empty. The
    /// level-0 head (the root) is never passed here.
    pub(crate) unsafe fn unlink_node(&mut self, doomed: NodeRef) {
        debug_assert!(Some(doomed) != self.heads[0], "root is never unlinked");
        let height = doomed.height();
        for level in 0..height {
            if self.heads[level as usize] == Some(doomed) {
                self.heads[level as usize] = doomed.fwd(&self.layout, level);
                continue;
            }
            let mut cur = self.heads[level as usize];
            while let Some(node) = cur {
                if node.fwd(&self.layout, level) == Some(doomed) {
                    node.set_fwd(&self.layout, level, doomed.fwd(&self.layout, level));
                    break;
                }
                cur = node.fwd(&self.layout, level);
            }
        }

        if let Some(next0) = doomed.fwd(&self.layout, 0) {
            next0.set_back(&self.layout, doomed.back(&self.layout));
        }

        while self.height > 1 && self.heads[(self.height - 1) as usize].is_none() {
            self.height -= 1;
        }
    }
}
