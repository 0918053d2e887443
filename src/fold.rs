use alloc::vec::Vec;
use core::cmp::Ordering;
use core::ptr::NonNull;

use crate::cursor::{Cursor, Endpoint, StepOutcome};
use crate::{CompareFn, Error, MisuseKind, SkipMap, ValueMode};

/// Which end each input cursor starts at, and which stepping method
/// advances it. Ascending folds walk [`Endpoint::First`] with
/// [`Cursor::next`]; descending folds walk [`Endpoint::Last`] with
/// [`Cursor::prev`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FoldDirection {
    Ascending,
    Descending,
}

/// Called once per distinct key the fold emits.
pub type FoldFn<K, V> = fn(&K, Option<&V>, *mut u8);

/// Called when two or more inputs tie on the same key. Given the tied
/// keys and values (one slot per participating input, in input order)
/// and a slot to write the merged value into, returns the index of the
/// key that should be emitted alongside it.
pub type MergeFn<K, V> = fn(&[&K], &[Option<&V>], &mut Option<V>, *mut u8) -> usize;

/// Outcome of [`FoldEngine::step`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FoldStepOutcome {
    Stepped,
    Done,
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum PairState {
    None,
    AvailableLt,
    AvailableEq,
}

struct Slot<K, V> {
    cursor: Option<Cursor<K, V>>,
    state: PairState,
    key: Option<NonNull<K>>,
    value: Option<NonNull<V>>,
}

/// Drives one cursor per input container in lockstep, merging their
/// ordered output into a single ordered, deduplicated stream. A
/// single-container fold is the trivial case of this with no merge
/// callback. Grounded on `skiparray_fold` / `insert_pair` in
/// `skiparray.c`, with the equality-classification fix from `spec.md`
/// §9: a newly-staged key that ties the current window head upgrades
/// that head to `AVAILABLE_EQ`, not just a key that ties its immediate
/// successor.
pub struct FoldEngine<K, V> {
    slots: Vec<Slot<K, V>>,
    /// Slot ids in ascending key order; the compacted arena offset the
    /// original keeps is an allocation-reuse detail, not an observable
    /// one, so this is a plain growable array instead.
    ids: Vec<usize>,
    available: usize,
    live: usize,
    direction: FoldDirection,
    value_mode: ValueMode,
    cmp: CompareFn<K>,
    udata: *mut u8,
    merge: Option<MergeFn<K, V>>,
}

impl<K, V> FoldEngine<K, V> {
    /// Fold a single container. No merge callback is needed: one
    /// container's own keys are already strictly ascending, so no tie
    /// can occur.
    pub fn new_single(container: &SkipMap<K, V>, direction: FoldDirection) -> Result<Self, Error> {
        Self::new_multi(&[container], direction, None)
    }

    /// Fold several containers together. All containers must share
    /// comparator identity, memory-function identity, and value mode, or
    /// this rejects with `IncompatibleFold`. A merge callback is
    /// required whenever more than one container participates.
    pub fn new_multi(
        containers: &[&SkipMap<K, V>],
        direction: FoldDirection,
        merge: Option<MergeFn<K, V>>,
    ) -> Result<Self, Error> {
        if containers.is_empty() {
            return Err(Error::Misuse(MisuseKind::BadConfig));
        }
        if containers.len() > 1 && merge.is_none() {
            return Err(Error::Misuse(MisuseKind::MergeRequired));
        }

        let first = containers[0];
        for c in &containers[1..] {
            if c.cmp != first.cmp || c.mem != first.mem || c.value_mode != first.value_mode {
                return Err(Error::Misuse(MisuseKind::IncompatibleFold));
            }
        }

        let endpoint = match direction {
            FoldDirection::Ascending => Endpoint::First,
            FoldDirection::Descending => Endpoint::Last,
        };

        let mut slots = Vec::new();
        slots
            .try_reserve_exact(containers.len())
            .map_err(|_| Error::OutOfMemory)?;
        let mut live = 0usize;
        for c in containers {
            let cursor = c.cursor(endpoint);
            if cursor.is_some() {
                live += 1;
            }
            slots.push(Slot {
                cursor,
                state: PairState::None,
                key: None,
                value: None,
            });
        }

        Ok(FoldEngine {
            slots,
            ids: Vec::new(),
            available: 0,
            live,
            direction,
            value_mode: first.value_mode,
            cmp: first.cmp,
            udata: first.udata,
            merge,
        })
    }

    #[inline]
    pub fn value_mode(&self) -> ValueMode {
        self.value_mode
    }

    /// Stage every not-yet-staged live input, insert each into the
    /// ordered window, then emit the window's head (merging ties),
    /// invoking `fold_cb` once for the emitted key. `Done` once every
    /// input is drained and the window is empty.
    pub fn step(&mut self, fold_cb: FoldFn<K, V>, fold_udata: *mut u8) -> FoldStepOutcome {
        if self.live == 0 && self.available == 0 {
            return FoldStepOutcome::Done;
        }

        for slot_id in 0..self.slots.len() {
            if self.slots[slot_id].state != PairState::None {
                continue;
            }
            let staged = {
                let slot = &mut self.slots[slot_id];
                match &slot.cursor {
                    None => None,
                    Some(cursor) => {
                        let (k, v) = cursor.get();
                        Some((NonNull::from(k), v.map(NonNull::from)))
                    }
                }
            };
            let (key, value) = match staged {
                Some(pair) => pair,
                None => continue,
            };
            self.slots[slot_id].key = Some(key);
            self.slots[slot_id].value = value;
            self.insert_pair(slot_id);

            let ended = {
                let cursor = self.slots[slot_id].cursor.as_mut().unwrap();
                let outcome = match self.direction {
                    FoldDirection::Ascending => cursor.next(),
                    FoldDirection::Descending => cursor.prev(),
                };
                outcome == StepOutcome::End
            };
            if ended {
                self.slots[slot_id].cursor = None;
                self.live -= 1;
            }
        }

        if self.available == 0 {
            return FoldStepOutcome::Done;
        }

        let head_id = self.ids[0];
        match self.slots[head_id].state {
            PairState::AvailableLt => {
                let key = unsafe { self.slots[head_id].key.unwrap().as_ref() };
                let value = self.slots[head_id].value.map(|p| unsafe { p.as_ref() });
                fold_cb(key, value, fold_udata);
                self.retire_head(1);
            }
            PairState::AvailableEq => {
                let mut run_len = 0usize;
                while run_len < self.ids.len()
                    && self.slots[self.ids[run_len]].state == PairState::AvailableEq
                {
                    run_len += 1;
                }
                let ids: Vec<usize> = self.ids[..run_len].to_vec();
                let keys: Vec<&K> = ids
                    .iter()
                    .map(|&id| unsafe { self.slots[id].key.unwrap().as_ref() })
                    .collect();
                let values: Vec<Option<&V>> = ids
                    .iter()
                    .map(|&id| self.slots[id].value.map(|p| unsafe { p.as_ref() }))
                    .collect();
                let merge = self
                    .merge
                    .expect("a multi-key tie can only arise from a multi-container fold, which requires a merge callback at construction");
                let mut merged_value: Option<V> = None;
                let chosen = merge(&keys, &values, &mut merged_value, self.udata);
                fold_cb(keys[chosen], merged_value.as_ref(), fold_udata);
                self.retire_head(run_len);
            }
            PairState::None => unreachable!("every id in the window is staged"),
        }

        FoldStepOutcome::Stepped
    }

    fn retire_head(&mut self, count: usize) {
        for _ in 0..count {
            let id = self.ids.remove(0);
            self.available -= 1;
            self.slots[id].state = PairState::None;
            self.slots[id].key = None;
            self.slots[id].value = None;
        }
    }

    /// Insert a freshly staged slot into the sorted window, classifying
    /// it `AVAILABLE_EQ` if it ties its immediate successor, then patch
    /// the window head: if the new entry became the head and ties the
    /// entry that was previously the head, upgrade that entry too. This
    /// is the one case the plain successor-only check misses, since a
    /// smaller-or-equal key arriving later would otherwise leave the old
    /// head classified `AVAILABLE_LT` even though it is now tied.
    fn insert_pair(&mut self, slot_id: usize) {
        let new_key = unsafe { self.slots[slot_id].key.unwrap().as_ref() };
        let old_head = self.ids.first().copied();

        let mut pos = self.ids.len();
        for (i, &id) in self.ids.iter().enumerate() {
            let existing = unsafe { self.slots[id].key.unwrap().as_ref() };
            if (self.cmp)(existing, new_key, self.udata) != Ordering::Less {
                pos = i;
                break;
            }
        }

        let ties_successor = pos < self.ids.len()
            && (self.cmp)(
                unsafe { self.slots[self.ids[pos]].key.unwrap().as_ref() },
                new_key,
                self.udata,
            ) == Ordering::Equal;
        self.slots[slot_id].state = if ties_successor {
            PairState::AvailableEq
        } else {
            PairState::AvailableLt
        };

        self.ids.insert(pos, slot_id);
        self.available += 1;

        if pos == 0 {
            if let Some(old_head_id) = old_head {
                let old_head_key = unsafe { self.slots[old_head_id].key.unwrap().as_ref() };
                if (self.cmp)(old_head_key, new_key, self.udata) == Ordering::Equal {
                    self.slots[old_head_id].state = PairState::AvailableEq;
                }
            }
        }
    }

    /// Release every remaining input cursor and drop the engine's state.
    /// Equivalent to letting the engine go out of scope; spelled out for
    /// parity with the original's explicit `skiparray_fold_halt`.
    pub fn halt(self) {}
}
