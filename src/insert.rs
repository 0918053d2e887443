use core::ptr;

use crate::common::{move_pairs, prepare_for_insert, NodeRef};
use crate::node_alloc::alloc_node;
use crate::{Error, SetOutcome, SkipMap};

impl<K, V> SkipMap<K, V> {
    /// Insert or replace a binding, always overwriting the key on a match.
    /// Thin wrapper over [`SkipMap::set_with_pair`], mirroring
    /// `skiparray_set` calling `skiparray_set_with_pair` with
    /// `replace_key = true`.
    pub fn set(&mut self, key: K, value: V) -> Result<SetOutcome<K, V>, Error> {
        self.set_with_pair(key, value, true)
    }

    /// Insert or replace a binding. On a match, the value is always
    /// overwritten; the key is overwritten only if `replace_key` is set.
    pub fn set_with_pair(
        &mut self,
        key: K,
        value: V,
        replace_key: bool,
    ) -> Result<SetOutcome<K, V>, Error> {
        if self.locked() {
            return Err(Error::Locked);
        }

        let result = self.search(&key);
        if result.found {
            return Ok(unsafe { self.replace_at(result.leaf, result.idx, key, value, replace_key) });
        }

        let (leaf, idx) = if unsafe { result.leaf.count() } == self.layout.cap {
            unsafe { self.split_and_redirect(result.leaf, result.idx, &key)? }
        } else {
            (result.leaf, result.idx)
        };

        unsafe {
            let slot =
                prepare_for_insert::<K, V>(leaf, &self.layout, self.value_mode.has_values(), idx);
            ptr::write(leaf.key_at::<K>(&self.layout, slot), key);
            if self.value_mode.has_values() {
                ptr::write(leaf.val_at::<V>(&self.layout, slot), value);
            }
            leaf.set_count(leaf.count() + 1);
        }
        self.len += 1;
        Ok(SetOutcome::Bound)
    }

    unsafe fn replace_at(
        &mut self,
        leaf: NodeRef,
        idx: u16,
        key: K,
        value: V,
        replace_key: bool,
    ) -> SetOutcome<K, V> {
        let slot = leaf.offset() + idx;
        let has_values = self.value_mode.has_values();

        let previous_value = if has_values {
            let val_ptr = leaf.val_at::<V>(&self.layout, slot);
            Some(ptr::replace(val_ptr, value))
        } else {
            None
        };

        let previous_key = if replace_key {
            let key_ptr = leaf.key_at::<K>(&self.layout, slot);
            Some(ptr::replace(key_ptr, key))
        } else {
            None
        };

        SetOutcome::Replaced {
            previous_key,
            previous_value,
        }
    }

    /// Split a full leaf before inserting into it, then return the leaf and
    /// window-local index the new entry now belongs in. Grounded on
    /// `split_node`/`skiparray_set_with_pair` in `skiparray.c`.
    unsafe fn split_and_redirect(
        &mut self,
        leaf: NodeRef,
        idx: u16,
        key: &K,
    ) -> Result<(NodeRef, u16), Error> {
        let cap = self.layout.cap;
        let has_values = self.value_mode.has_values();

        let (next_prng, level_k) = (self.level)(self.prng_state, self.udata);
        self.prng_state = next_prng;
        let new_height = level_k.min(self.max_level - 1) + 1;

        let new_node = alloc_node::<K, V>(&self.layout, new_height, self.mem, self.udata)
            .map(NodeRef)
            .ok_or(Error::OutOfMemory)?;

        // Move the trailing half of `leaf`'s window (at least one entry) to
        // the new leaf, which always starts at offset 0.
        let move_count = (cap / 2).max(1);
        let keep_count = cap - move_count;
        let src_off = leaf.offset() + keep_count;
        move_pairs::<K, V>(leaf, src_off, new_node, 0, &self.layout, has_values, move_count);
        new_node.set_count(move_count);
        leaf.set_count(keep_count);

        // Splice the level-0 back pointer and the forward pointers common
        // to both nodes' heights.
        let old_next = leaf.fwd(&self.layout, 0);
        new_node.set_back(&self.layout, Some(leaf));
        if let Some(next) = old_next {
            next.set_back(&self.layout, Some(new_node));
        }

        let common_height = leaf.height().min(new_height);
        for level in 0..common_height {
            new_node.set_fwd(&self.layout, level, leaf.fwd(&self.layout, level));
            leaf.set_fwd(&self.layout, level, Some(new_node));
        }

        if new_height > leaf.height() {
            let old_height = self.height;
            if new_height > old_height {
                for level in old_height..new_height {
                    self.heads[level as usize] = Some(new_node);
                }
                self.height = new_height;
            }
            for level in leaf.height()..new_height.min(old_height) {
                if self.heads[level as usize].is_none() {
                    self.heads[level as usize] = Some(new_node);
                    continue;
                }
                // Find the predecessor on this level: the last leaf whose
                // last key is less than new_node's first key, walking from
                // the level head.
                let mut cur = self.heads[level as usize];
                let mut prev: Option<NodeRef> = None;
                let new_first = &*new_node.key_at::<K>(&self.layout, 0);
                while let Some(node) = cur {
                    let last = &*node.last_key::<K>(&self.layout);
                    if self.cmp(last, new_first) == core::cmp::Ordering::Less {
                        prev = Some(node);
                        cur = node.fwd(&self.layout, level);
                    } else {
                        break;
                    }
                }
                match prev {
                    Some(p) => {
                        new_node.set_fwd(&self.layout, level, p.fwd(&self.layout, level));
                        p.set_fwd(&self.layout, level, Some(new_node));
                    }
                    None => {
                        new_node.set_fwd(&self.layout, level, self.heads[level as usize]);
                        self.heads[level as usize] = Some(new_node);
                    }
                }
            }
        }

        if idx > leaf.count() {
            Ok((new_node, idx - leaf.count()))
        } else {
            Ok((leaf, idx))
        }
    }
}
