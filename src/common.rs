use core::cmp::Ordering;
use core::ptr::{self, NonNull};

use crate::layout::{carve_node, NodeHdr, NodeLayout, NodeParts};
use crate::CompareFn;

/// A non-owning handle to a node's backing allocation. Every field access
/// goes through the container's [`NodeLayout`], since the byte offsets of a
/// node's header, back pointer, and key/value arrays are fixed per
/// container but not known to the type itself.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct NodeRef(pub NonNull<u8>);

impl NodeRef {
    #[inline]
    fn hdr(self) -> *mut NodeHdr {
        self.0.as_ptr() as *mut NodeHdr
    }

    #[inline]
    pub unsafe fn height(self) -> u8 {
        (*self.hdr()).height
    }

    #[inline]
    pub unsafe fn count(self) -> u16 {
        (*self.hdr()).count
    }

    #[inline]
    pub unsafe fn set_count(self, count: u16) {
        (*self.hdr()).count = count;
    }

    #[inline]
    pub unsafe fn offset(self) -> u16 {
        (*self.hdr()).offset
    }

    #[inline]
    pub unsafe fn set_offset(self, offset: u16) {
        (*self.hdr()).offset = offset;
    }

    #[inline]
    unsafe fn parts<K, V>(self, layout: &NodeLayout) -> NodeParts<K, V> {
        carve_node(self.0, layout)
    }

    #[inline]
    pub unsafe fn back(self, layout: &NodeLayout) -> Option<NodeRef> {
        let parts = self.parts::<(), ()>(layout);
        NonNull::new(*parts.back_ptr).map(NodeRef)
    }

    #[inline]
    pub unsafe fn set_back(self, layout: &NodeLayout, back: Option<NodeRef>) {
        let parts = self.parts::<(), ()>(layout);
        *parts.back_ptr = back.map_or(ptr::null_mut(), |n| n.0.as_ptr());
    }

    #[inline]
    pub unsafe fn fwd(self, layout: &NodeLayout, level: u8) -> Option<NodeRef> {
        let parts = self.parts::<(), ()>(layout);
        let raw = ptr::read(parts.fwd_ptr.add(level as usize));
        NonNull::new(raw).map(NodeRef)
    }

    #[inline]
    pub unsafe fn set_fwd(self, layout: &NodeLayout, level: u8, to: Option<NodeRef>) {
        let parts = self.parts::<(), ()>(layout);
        ptr::write(
            parts.fwd_ptr.add(level as usize),
            to.map_or(ptr::null_mut(), |n| n.0.as_ptr()),
        );
    }

    #[inline]
    pub unsafe fn key_at<K>(self, layout: &NodeLayout, i: u16) -> *mut K {
        let parts = self.parts::<K, ()>(layout);
        parts.keys_ptr.add(i as usize) as *mut K
    }

    #[inline]
    pub unsafe fn val_at<V>(self, layout: &NodeLayout, i: u16) -> *mut V {
        let parts = self.parts::<(), V>(layout);
        parts
            .vals_ptr
            .expect("value slot accessed on a keys-only container")
            .add(i as usize) as *mut V
    }

    #[inline]
    pub unsafe fn last_key<K>(self, layout: &NodeLayout) -> *const K {
        let offset = self.offset();
        let count = self.count();
        debug_assert!(count > 0);
        self.key_at::<K>(layout, offset + count - 1) as *const K
    }
}

/// Lower-bound binary search over a leaf's active window. Returns whether
/// the key was found exactly and the window-local index.
pub unsafe fn bsearch_in_leaf<K>(
    node: NodeRef,
    layout: &NodeLayout,
    key: &K,
    cmp: CompareFn<K>,
    udata: *mut u8,
) -> (bool, u16) {
    let offset = node.offset();
    let count = node.count();
    let mut lo: u16 = 0;
    let mut hi: u16 = count;
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        let existing = &*(node.key_at::<K>(layout, offset + mid) as *const K);
        match cmp(existing, key, udata) {
            Ordering::Less => lo = mid + 1,
            Ordering::Greater => hi = mid,
            Ordering::Equal => return (true, mid),
        }
    }
    (false, lo)
}

/// Reindex keys (and values, if present) within a single node. Source and
/// destination ranges may overlap; this is a memmove, not a memcpy.
pub unsafe fn shift_pairs<K, V>(
    node: NodeRef,
    layout: &NodeLayout,
    has_values: bool,
    src_off: u16,
    count: u16,
    dst_off: u16,
) {
    if count == 0 || src_off == dst_off {
        return;
    }
    let parts = node.parts::<K, V>(layout);
    ptr::copy(
        parts.keys_ptr.add(src_off as usize) as *const K,
        parts.keys_ptr.add(dst_off as usize) as *mut K,
        count as usize,
    );
    if has_values {
        let vals_ptr = parts.vals_ptr.expect("has_values implies a value array");
        ptr::copy(
            vals_ptr.add(src_off as usize) as *const V,
            vals_ptr.add(dst_off as usize) as *mut V,
            count as usize,
        );
    }
}

/// Copy keys (and values) from one node into another. Ranges never overlap
/// since the nodes are distinct allocations.
pub unsafe fn move_pairs<K, V>(
    src: NodeRef,
    src_off: u16,
    dst: NodeRef,
    dst_off: u16,
    layout: &NodeLayout,
    has_values: bool,
    count: u16,
) {
    if count == 0 {
        return;
    }
    let src_parts = src.parts::<K, V>(layout);
    let dst_parts = dst.parts::<K, V>(layout);
    ptr::copy_nonoverlapping(
        src_parts.keys_ptr.add(src_off as usize) as *const K,
        dst_parts.keys_ptr.add(dst_off as usize) as *mut K,
        count as usize,
    );
    if has_values {
        let src_vals = src_parts.vals_ptr.expect("has_values implies a value array");
        let dst_vals = dst_parts.vals_ptr.expect("has_values implies a value array");
        ptr::copy_nonoverlapping(
            src_vals.add(src_off as usize) as *const V,
            dst_vals.add(dst_off as usize) as *mut V,
            count as usize,
        );
    }
}

/// Prepare a leaf with room for one more entry (`count < capacity`) to
/// receive a write at window-local index `idx`. Returns the absolute slot
/// index to write the new key/value into. Implements the four cases from
/// `spec.md` §4.1 exactly.
pub unsafe fn prepare_for_insert<K, V>(
    node: NodeRef,
    layout: &NodeLayout,
    has_values: bool,
    idx: u16,
) -> u16 {
    let offset = node.offset();
    let count = node.count();
    let cap = layout.cap;

    if idx == 0 {
        if offset > 0 {
            node.set_offset(offset - 1);
            offset - 1
        } else {
            shift_pairs::<K, V>(node, layout, has_values, offset, count, offset + 1);
            offset
        }
    } else if idx < count {
        if offset > 0 {
            shift_pairs::<K, V>(node, layout, has_values, offset, idx, offset - 1);
            node.set_offset(offset - 1);
            offset - 1 + idx
        } else {
            shift_pairs::<K, V>(
                node,
                layout,
                has_values,
                offset + idx,
                count - idx,
                offset + idx + 1,
            );
            offset + idx
        }
    } else {
        // idx == count
        if offset + count == cap {
            shift_pairs::<K, V>(node, layout, has_values, offset, count, 0);
            node.set_offset(0);
            count
        } else {
            offset + count
        }
    }
}

/// Descend from the level-`height-1` head to the true last leaf on the
/// level-0 chain, dropping a level whenever the current one has no further
/// forward pointer.
pub unsafe fn last_leaf(
    heads: &[Option<NodeRef>],
    height: u8,
    layout: &NodeLayout,
) -> Option<NodeRef> {
    let mut cur: Option<NodeRef> = None;
    let mut level = height;
    while level > 0 {
        level -= 1;
        let mut next = match cur {
            Some(node) => node.fwd(layout, level),
            None => heads[level as usize],
        };
        while let Some(node) = next {
            cur = Some(node);
            next = node.fwd(layout, level);
        }
    }
    cur
}
