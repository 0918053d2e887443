#![no_std]

extern crate alloc;

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::Cell;
use core::cmp::Ordering;
use core::fmt;
use core::ptr::NonNull;

mod appender;
mod common;
mod delete;
mod fold;
mod get;
mod hof;
mod insert;
mod layout;
mod level;
mod node_alloc;
mod search;

pub mod cursor;

pub use appender::Appender;
pub use cursor::{Cursor, Endpoint, SeekOutcome, StepOutcome};
pub use fold::{FoldDirection, FoldEngine, FoldFn, FoldStepOutcome, MergeFn};
pub use hof::filter;
pub use hof::PredicateFn;
pub use level::{default_level_fn, LevelFn};
pub use node_alloc::default_memory_fn;

use common::NodeRef;
use layout::NodeLayout;
use node_alloc::{alloc_node, dealloc_node};

/// Comparator callback: orders two keys given the container's opaque
/// context. Mirrors `skiparray_config.cmp` rather than `Ord`, since the
/// comparator is injectable per-container configuration carrying its own
/// context pointer (e.g. collation data) instead of a property of the key
/// type itself.
pub type CompareFn<K> = fn(&K, &K, *mut u8) -> Ordering;

/// Allocator callback. Contract: `(null, n>0) -> allocate n bytes`;
/// `(p, 0) -> free p`; reallocation is never requested.
pub type MemoryFn = unsafe fn(*mut u8, usize, *mut u8) -> *mut u8;

/// Invoked with a key (and value, if the container stores values) that the
/// container is abandoning: on container/appender destruction, and on
/// removal of a binding.
pub type FreeFn<K, V> = fn(K, Option<V>, *mut u8);

/// Whether a container stores values alongside keys, or keys only (a sorted
/// set). Represented as a variant of the leaf rather than `ignore_values:
/// bool` so the value array's absence is a type-level fact about the leaf
/// layout, not a flag callers must remember to check.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ValueMode {
    WithValues,
    KeysOnly,
}

impl ValueMode {
    #[inline]
    pub fn has_values(self) -> bool {
        matches!(self, ValueMode::WithValues)
    }
}

/// Specific contract violation behind [`Error::Misuse`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MisuseKind {
    /// `capacity < 2` or `max_level` out of range.
    BadConfig,
    /// A key presented to an ascending-only appender did not exceed the
    /// previously appended key.
    DescendingKey,
    /// A multi-container fold was given containers with different
    /// comparator identity, memory-function identity, or value mode.
    IncompatibleFold,
    /// A multi-container fold needs a merge callback but none was given.
    MergeRequired,
}

/// The three disjoint error classes from which every fallible operation
/// draws.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    Misuse(MisuseKind),
    OutOfMemory,
    Locked,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Misuse(MisuseKind::BadConfig) => write!(f, "bad configuration"),
            Error::Misuse(MisuseKind::DescendingKey) => {
                write!(f, "key did not strictly ascend")
            }
            Error::Misuse(MisuseKind::IncompatibleFold) => {
                write!(f, "fold inputs are not pairwise compatible")
            }
            Error::Misuse(MisuseKind::MergeRequired) => {
                write!(f, "multi-container fold requires a merge callback")
            }
            Error::OutOfMemory => write!(f, "out of memory"),
            Error::Locked => write!(f, "container has a live cursor"),
        }
    }
}

impl core::error::Error for Error {}

/// Outcome of [`SkipMap::set`] / [`SkipMap::set_with_pair`]. A previous
/// value is reported whenever a binding is replaced; a previous key is
/// reported only when `replace_key` actually displaced it (otherwise the
/// existing key is left untouched in place).
#[derive(Debug)]
pub enum SetOutcome<K, V> {
    Bound,
    Replaced {
        previous_key: Option<K>,
        previous_value: Option<V>,
    },
}

/// Outcome of [`SkipMap::forget`].
#[derive(Debug)]
pub enum ForgetOutcome<K, V> {
    Removed(K, Option<V>),
    NotFound,
}

/// Outcome of [`SkipMap::pop_first`] / [`SkipMap::pop_last`].
#[derive(Debug)]
pub enum PopOutcome<K, V> {
    Popped(K, Option<V>),
    Empty,
}

const DEFAULT_CAPACITY: u16 = 1024;
const DEFAULT_MAX_LEVEL: u8 = 16;
const HARD_MAX_LEVEL: u8 = 32;

/// Container configuration. A comparator has no sensible default, so
/// construction always starts from [`Config::new`]; every other field has a
/// workable default and can be tuned with the setters below.
pub struct Config<K, V> {
    pub(crate) capacity: u16,
    pub(crate) max_level: u8,
    pub(crate) seed: u64,
    pub(crate) value_mode: ValueMode,
    pub(crate) cmp: CompareFn<K>,
    pub(crate) memory: Option<MemoryFn>,
    pub(crate) level: Option<LevelFn>,
    pub(crate) free: Option<FreeFn<K, V>>,
    pub(crate) udata: *mut u8,
}

impl<K, V> Config<K, V> {
    pub fn new(cmp: CompareFn<K>) -> Self {
        Config {
            capacity: DEFAULT_CAPACITY,
            max_level: DEFAULT_MAX_LEVEL,
            seed: 0,
            value_mode: ValueMode::WithValues,
            cmp,
            memory: None,
            level: None,
            free: None,
            udata: core::ptr::null_mut(),
        }
    }

    pub fn capacity(mut self, capacity: u16) -> Self {
        self.capacity = if capacity == 0 {
            DEFAULT_CAPACITY
        } else {
            capacity
        };
        self
    }

    pub fn max_level(mut self, max_level: u8) -> Self {
        self.max_level = if max_level == 0 {
            DEFAULT_MAX_LEVEL
        } else {
            max_level
        };
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn value_mode(mut self, value_mode: ValueMode) -> Self {
        self.value_mode = value_mode;
        self
    }

    pub fn memory(mut self, memory: MemoryFn) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn level(mut self, level: LevelFn) -> Self {
        self.level = Some(level);
        self
    }

    pub fn free(mut self, free: FreeFn<K, V>) -> Self {
        self.free = Some(free);
        self
    }

    pub fn udata(mut self, udata: *mut u8) -> Self {
        self.udata = udata;
        self
    }

    fn validate(&self) -> Result<(), Error> {
        if self.capacity < 2 || self.max_level > HARD_MAX_LEVEL {
            return Err(Error::Misuse(MisuseKind::BadConfig));
        }
        Ok(())
    }
}

/// Raw-memory unrolled skiplist: an ordered key/value container whose
/// skiplist indexes leaves (each holding many pairs) rather than individual
/// entries. Each leaf is a single allocation carved by [`NodeLayout`]; there
/// is only one node kind, and a node's allocation size grows with its
/// sampled height rather than being one of a fixed set of shapes.
pub struct SkipMap<K, V> {
    pub(crate) heads: Vec<Option<NodeRef>>,
    pub(crate) height: u8,
    pub(crate) max_level: u8,
    pub(crate) layout: NodeLayout,
    pub(crate) capacity: u16,
    pub(crate) value_mode: ValueMode,
    pub(crate) cmp: CompareFn<K>,
    pub(crate) mem: MemoryFn,
    pub(crate) level: LevelFn,
    pub(crate) free: Option<FreeFn<K, V>>,
    pub(crate) udata: *mut u8,
    pub(crate) prng_state: u64,
    pub(crate) len: usize,
    /// Count of live cursors. A `Cell` rather than a plain `usize` because
    /// cursor creation only needs shared access to the container: per
    /// `spec.md` §9, the doubly-linked cursor list the original keeps is an
    /// implementation convenience, and a count suffices for the lock.
    pub(crate) cursor_count: Cell<usize>,
}

impl<K, V> SkipMap<K, V> {
    /// Build a container with default configuration (capacity 1024, max
    /// level 16, value storage on) and the given comparator.
    pub fn new(cmp: CompareFn<K>) -> Result<Self, Error> {
        Self::with_config(Config::new(cmp))
    }

    pub fn with_config(config: Config<K, V>) -> Result<Self, Error> {
        config.validate()?;
        let Config {
            capacity,
            max_level,
            seed,
            value_mode,
            cmp,
            memory,
            level,
            free,
            udata,
        } = config;

        let mem = memory.unwrap_or(default_memory_fn);
        let level = level.unwrap_or(default_level_fn);
        let layout = NodeLayout::compute_for_cap::<K, V>(capacity, value_mode.has_values());

        let (prng_state, root_k) = level(seed, udata);
        let root_height = root_k.min(max_level.saturating_sub(1)) + 1;

        let root = unsafe { alloc_node::<K, V>(&layout, root_height, mem, udata) }
            .map(NodeRef)
            .ok_or(Error::OutOfMemory)?;

        let mut heads = Vec::new();
        heads
            .try_reserve_exact(max_level as usize)
            .map_err(|_| Error::OutOfMemory)?;
        heads.resize(max_level as usize, None);
        for level_idx in 0..root_height {
            heads[level_idx as usize] = Some(root);
        }

        Ok(SkipMap {
            heads,
            height: root_height,
            max_level,
            layout,
            capacity,
            value_mode,
            cmp,
            mem,
            level,
            free,
            udata,
            prng_state,
            len: 0,
            cursor_count: Cell::new(0),
        })
    }

    /// Number of bindings currently stored. Maintained incrementally (unlike
    /// [`SkipMap::count`], which recomputes from the leaf chain).
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn value_mode(&self) -> ValueMode {
        self.value_mode
    }

    #[inline]
    pub fn capacity(&self) -> u16 {
        self.capacity
    }

    #[inline]
    pub(crate) fn locked(&self) -> bool {
        self.cursor_count.get() > 0
    }

    #[inline]
    pub(crate) fn cmp(&self, a: &K, b: &K) -> Ordering {
        (self.cmp)(a, b, self.udata)
    }

    pub(crate) fn root(&self) -> NodeRef {
        self.heads[0].expect("level-0 head always present")
    }

    /// Walk the level-0 chain summing leaf counts, per the container's own
    /// defined semantics for `count` (distinct from the incrementally
    /// maintained [`SkipMap::len`]).
    pub fn count(&self) -> usize {
        let mut total = 0usize;
        let mut cur = Some(self.root());
        unsafe {
            while let Some(node) = cur {
                total += node.count() as usize;
                cur = node.fwd(&self.layout, 0);
            }
        }
        total
    }
}

impl<K, V> Drop for SkipMap<K, V> {
    fn drop(&mut self) {
        unsafe {
            let mut cur = Some(self.root());
            while let Some(node) = cur {
                let next = node.fwd(&self.layout, 0);
                self.release_node_contents(node);
                dealloc_node(node.0, &self.layout, self.mem, self.udata);
                cur = next;
            }
        }
    }
}

impl<K, V> SkipMap<K, V> {
    /// Cheap yes/no form of [`SkipMap::check_invariants_detailed`].
    pub fn check_invariants(&self) -> bool {
        self.check_invariants_detailed().is_ok()
    }

    /// Walk the whole index checking every quantified invariant against
    /// the current structure, returning the first violation found. Used
    /// by tests after every mutation; not called on any normal code
    /// path.
    pub fn check_invariants_detailed(&self) -> Result<(), String> {
        unsafe {
            let mut leaves: Vec<NodeRef> = Vec::new();
            let mut cur = Some(self.root());
            let bound = self.len + self.max_level as usize + 2;
            while let Some(node) = cur {
                if leaves.len() > bound {
                    return Err(String::from("level-0 chain does not terminate"));
                }
                leaves.push(node);
                cur = node.fwd(&self.layout, 0);
            }
            if leaves.is_empty() {
                return Err(String::from("level-0 chain is empty"));
            }

            let cap = self.layout.cap;
            let mut total = 0usize;
            for (i, &leaf) in leaves.iter().enumerate() {
                let offset = leaf.offset();
                let count = leaf.count();
                total += count as usize;

                if offset as u32 + count as u32 > cap as u32 {
                    return Err(format!(
                        "leaf {i}: offset {offset} + count {count} exceeds capacity {cap}"
                    ));
                }
                if leaf.height() > self.max_level {
                    return Err(format!(
                        "leaf {i}: height {} exceeds max_level {}",
                        leaf.height(),
                        self.max_level
                    ));
                }

                for w in 0..count.saturating_sub(1) {
                    let a = &*leaf.key_at::<K>(&self.layout, offset + w);
                    let b = &*leaf.key_at::<K>(&self.layout, offset + w + 1);
                    if self.cmp(a, b) != Ordering::Less {
                        return Err(format!(
                            "leaf {i}: window keys not strictly ascending at index {w}"
                        ));
                    }
                }

                let is_tail = i + 1 == leaves.len();
                let is_lone = leaves.len() == 1;
                if !is_tail && !is_lone && (count as u32) < cap as u32 / 2 {
                    return Err(format!(
                        "leaf {i}: count {count} below the half-full floor for a non-tail leaf"
                    ));
                }

                if i > 0 {
                    let prev = leaves[i - 1];
                    let prev_last = &*prev.last_key::<K>(&self.layout);
                    let this_first = &*leaf.key_at::<K>(&self.layout, offset);
                    if self.cmp(prev_last, this_first) != Ordering::Less {
                        return Err(format!(
                            "leaf {i}: first key does not strictly exceed the previous leaf's last key"
                        ));
                    }
                    match leaf.back(&self.layout) {
                        Some(back) if back == prev => {}
                        _ => {
                            return Err(format!(
                                "leaf {i}: back pointer does not reference the previous leaf"
                            ))
                        }
                    }
                }
            }

            if total != self.len {
                return Err(format!(
                    "sum of leaf counts {total} does not match len {}",
                    self.len
                ));
            }
            if self.count() != self.len {
                return Err(String::from("count() disagrees with len"));
            }

            let mut first_with_height: Vec<Option<usize>> = Vec::new();
            first_with_height.resize(self.max_level as usize, None);
            for (i, &leaf) in leaves.iter().enumerate() {
                for h in 1..=leaf.height() {
                    let slot = &mut first_with_height[(h - 1) as usize];
                    if slot.is_none() {
                        *slot = Some(i);
                    }
                }
            }
            for hm1 in 0..self.height as usize {
                match (first_with_height[hm1], self.heads[hm1]) {
                    (Some(idx), Some(head)) if leaves[idx] == head => {}
                    (None, None) => {}
                    _ => return Err(format!("head identity mismatch at level {hm1}")),
                }
            }

            let mut prev_len: Option<usize> = None;
            for level in (0..self.height).rev() {
                let expected = leaves.iter().filter(|l| l.height() > level).count();
                let mut len_at_level = 0usize;
                let mut next = self.heads[level as usize];
                while let Some(node) = next {
                    if node.height() <= level {
                        return Err(format!(
                            "level {level}: visited a leaf with height {} <= level",
                            node.height()
                        ));
                    }
                    len_at_level += 1;
                    if len_at_level > leaves.len() {
                        return Err(format!("level {level} chain does not terminate"));
                    }
                    next = node.fwd(&self.layout, level);
                }
                if len_at_level != expected {
                    return Err(format!(
                        "level {level}: chain visits {len_at_level} leaves, expected {expected}"
                    ));
                }
                if let Some(higher_len) = prev_len {
                    if higher_len > len_at_level {
                        return Err(format!(
                            "level {level}: chain shorter than the level above it"
                        ));
                    }
                }
                prev_len = Some(len_at_level);
            }
        }
        Ok(())
    }

    unsafe fn release_node_contents(&mut self, node: NodeRef) {
        let offset = node.offset();
        let count = node.count();
        for i in 0..count {
            let key = core::ptr::read(node.key_at::<K>(&self.layout, offset + i));
            let value = if self.value_mode.has_values() {
                Some(core::ptr::read(node.val_at::<V>(&self.layout, offset + i)))
            } else {
                None
            };
            if let Some(free) = self.free {
                free(key, value, self.udata);
            }
        }
    }
}
