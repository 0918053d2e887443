use core::ptr::NonNull;

use crate::common::last_leaf;
use crate::SkipMap;

/// Which end of the container a cursor starts at.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Endpoint {
    First,
    Last,
}

/// Outcome of [`Cursor::seek`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SeekOutcome {
    Found,
    NotFound,
    BeforeFirst,
    AfterLast,
}

/// Outcome of [`Cursor::next`] / [`Cursor::prev`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    Ok,
    End,
}

/// A position within a container: a leaf plus a window-local index,
/// reached through a raw (non-lifetime-bound) back-reference, mirroring
/// `skiparray_iter`'s pointer-based handle. Holding a cursor locks its
/// container against mutation (checked at runtime by [`SkipMap::set`] and
/// friends, not by the borrow checker) until the cursor is dropped.
///
/// Using a cursor after its container has been dropped is undefined
/// behavior, matching the original's own documented contract that freeing
/// a container invalidates any outstanding iterator handles.
pub struct Cursor<K, V> {
    container: NonNull<SkipMap<K, V>>,
    leaf: crate::common::NodeRef,
    idx: u16,
}

impl<K, V> SkipMap<K, V> {
    /// Create a cursor at one end of the container. Returns `None` (EMPTY)
    /// if the container has no entries.
    pub fn cursor(&self, endpoint: Endpoint) -> Option<Cursor<K, V>> {
        if self.is_empty() {
            return None;
        }
        let (leaf, idx) = unsafe {
            match endpoint {
                Endpoint::First => (self.root(), 0),
                Endpoint::Last => {
                    let leaf = last_leaf(&self.heads, self.height, &self.layout)
                        .expect("non-empty container has a last leaf");
                    (leaf, leaf.count() - 1)
                }
            }
        };
        self.cursor_count.set(self.cursor_count.get() + 1);
        Some(Cursor {
            container: NonNull::from(self),
            leaf,
            idx,
        })
    }
}

impl<K, V> Cursor<K, V> {
    #[inline]
    fn container(&self) -> &SkipMap<K, V> {
        unsafe { self.container.as_ref() }
    }

    /// Reposition to one end of the container without reallocating.
    pub fn seek_endpoint(&mut self, endpoint: Endpoint) {
        let c = self.container();
        unsafe {
            match endpoint {
                Endpoint::First => {
                    self.leaf = c.root();
                    self.idx = 0;
                }
                Endpoint::Last => {
                    let leaf = last_leaf(&c.heads, c.height, &c.layout)
                        .expect("non-empty container has a last leaf");
                    self.idx = leaf.count().saturating_sub(1);
                    self.leaf = leaf;
                }
            }
        }
    }

    /// Reposition at a key. On an exact match, lands on it (`Found`).
    /// Otherwise crosses to the first entry greater than `key`, unless that
    /// would run off either end of the container, in which case the
    /// position is left unchanged and `BeforeFirst`/`AfterLast` is
    /// reported.
    pub fn seek(&mut self, key: &K) -> SeekOutcome {
        let c = self.container();
        let result = c.search(key);
        unsafe {
            if result.found {
                self.leaf = result.leaf;
                self.idx = result.idx;
                return SeekOutcome::Found;
            }
            if result.idx == 0 && result.leaf.back(&c.layout).is_none() {
                return SeekOutcome::BeforeFirst;
            }
            if result.idx == result.leaf.count() && result.leaf.fwd(&c.layout, 0).is_none() {
                return SeekOutcome::AfterLast;
            }
            if result.idx == result.leaf.count() {
                let next = result
                    .leaf
                    .fwd(&c.layout, 0)
                    .expect("checked above: a forward pointer exists");
                self.leaf = next;
                self.idx = 0;
            } else {
                self.leaf = result.leaf;
                self.idx = result.idx;
            }
            SeekOutcome::NotFound
        }
    }

    /// Advance to the next binding in ascending order.
    pub fn next(&mut self) -> StepOutcome {
        let c = self.container();
        unsafe {
            let next_idx = self.idx + 1;
            if next_idx == self.leaf.count() {
                match self.leaf.fwd(&c.layout, 0) {
                    Some(next) => {
                        self.leaf = next;
                        self.idx = 0;
                        StepOutcome::Ok
                    }
                    None => StepOutcome::End,
                }
            } else {
                self.idx = next_idx;
                StepOutcome::Ok
            }
        }
    }

    /// Retreat to the previous binding in ascending order (i.e. advance in
    /// descending order).
    pub fn prev(&mut self) -> StepOutcome {
        if self.idx > 0 {
            self.idx -= 1;
            return StepOutcome::Ok;
        }
        let c = self.container();
        unsafe {
            match self.leaf.back(&c.layout) {
                Some(back) => {
                    self.idx = back.count() - 1;
                    self.leaf = back;
                    StepOutcome::Ok
                }
                None => StepOutcome::End,
            }
        }
    }

    /// Read the binding at the current position.
    pub fn get(&self) -> (&K, Option<&V>) {
        let c = self.container();
        unsafe {
            let slot = self.leaf.offset() + self.idx;
            let key = &*self.leaf.key_at::<K>(&c.layout, slot);
            let value = if c.value_mode.has_values() {
                Some(&*self.leaf.val_at::<V>(&c.layout, slot))
            } else {
                None
            };
            (key, value)
        }
    }
}

impl<K, V> Drop for Cursor<K, V> {
    fn drop(&mut self) {
        unsafe {
            let c = self.container.as_ref();
            c.cursor_count.set(c.cursor_count.get() - 1);
        }
    }
}
