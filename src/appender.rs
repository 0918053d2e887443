use alloc::vec::Vec;
use core::cmp::Ordering;
use core::ptr;

use crate::common::NodeRef;
use crate::node_alloc::alloc_node;
use crate::{Config, Error, MisuseKind, SkipMap};

/// Write-only, ascending-only bulk construction mode. Builds an empty
/// container, then appends pairs in strictly ascending key order without
/// going through search, finishing into a regular container. Grounded on
/// `skiparray_builder_*` in `skiparray.c`.
pub struct Appender<K, V> {
    map: SkipMap<K, V>,
    /// Per-level most-recently-appended leaf participating at that level.
    trail: Vec<Option<NodeRef>>,
    last: NodeRef,
    check_ascending: bool,
}

impl<K, V> Appender<K, V> {
    /// Build a fresh appender with the ascending-check enabled.
    pub fn new(config: Config<K, V>) -> Result<Self, Error> {
        Self::with_ascending_check(config, true)
    }

    pub(crate) fn with_ascending_check(
        config: Config<K, V>,
        check_ascending: bool,
    ) -> Result<Self, Error> {
        let map = SkipMap::with_config(config)?;
        let root = map.root();
        unsafe {
            root.set_offset(0);
        }

        let mut trail = Vec::new();
        trail
            .try_reserve_exact(map.max_level as usize)
            .map_err(|_| Error::OutOfMemory)?;
        trail.resize(map.max_level as usize, None);
        for level in 0..map.height {
            trail[level as usize] = Some(root);
        }

        Ok(Appender {
            last: root,
            map,
            trail,
            check_ascending,
        })
    }

    /// Append a pair. Rejects with `MISUSE` if the ascending check is
    /// enabled and `key` does not strictly exceed the previously appended
    /// key.
    pub fn append(&mut self, key: K, value: V) -> Result<(), Error> {
        unsafe {
            if self.check_ascending && self.last.count() > 0 {
                let prev = &*self.last.last_key::<K>(&self.map.layout);
                if self.map.cmp(&key, prev) != Ordering::Greater {
                    return Err(Error::Misuse(MisuseKind::DescendingKey));
                }
            }

            if self.last.count() == self.map.layout.cap {
                self.grow()?;
            }

            let slot = self.last.count();
            ptr::write(self.last.key_at::<K>(&self.map.layout, slot), key);
            if self.map.value_mode.has_values() {
                ptr::write(self.last.val_at::<V>(&self.map.layout, slot), value);
            }
            self.last.set_count(slot + 1);
        }
        self.map.len += 1;
        Ok(())
    }

    /// Allocate a new last leaf with a freshly sampled height, splice it
    /// into every level it participates in using the trail, and extend the
    /// index's height if needed.
    unsafe fn grow(&mut self) -> Result<(), Error> {
        let (next_prng, level_k) = (self.map.level)(self.map.prng_state, self.map.udata);
        self.map.prng_state = next_prng;
        let new_height = level_k.min(self.map.max_level - 1) + 1;

        let new_node = alloc_node::<K, V>(&self.map.layout, new_height, self.map.mem, self.map.udata)
            .map(NodeRef)
            .ok_or(Error::OutOfMemory)?;
        new_node.set_offset(0);
        new_node.set_back(&self.map.layout, Some(self.last));

        let old_height = self.map.height;
        for level in 0..new_height {
            if level < old_height {
                if let Some(pred) = self.trail[level as usize] {
                    pred.set_fwd(&self.map.layout, level, Some(new_node));
                }
            }
            self.trail[level as usize] = Some(new_node);
        }
        if new_height > old_height {
            for level in old_height..new_height {
                self.map.heads[level as usize] = Some(new_node);
            }
            self.map.height = new_height;
        }

        self.last = new_node;
        Ok(())
    }

    /// Hand over ownership of the now-regular container. Cannot fail.
    pub fn finish(self) -> SkipMap<K, V> {
        self.map
    }
}
