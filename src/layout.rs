use core::mem::MaybeUninit;
use core::mem::{align_of, size_of};
use core::ptr::NonNull;

#[inline]
pub const fn align_up(x: usize, a: usize) -> usize {
    debug_assert!(a.is_power_of_two());
    (x + (a - 1)) & !(a - 1)
}

/// Fixed per-node header. There is only one node kind in an unrolled
/// skiplist (a "leaf" in B+Tree terms), so unlike a branch/leaf layout
/// pair this is the only header shape in the crate.
#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct NodeHdr {
    pub height: u8,
    pub flags: u8,
    pub offset: u16,
    pub count: u16,
}

/// Layout shared by every node in a container. Offsets below are fixed
/// regardless of a node's sampled height; the forward-pointer array is the
/// only part of a node's allocation whose length (and therefore the node's
/// total byte size) varies, so it is carved last and sized per allocation.
#[derive(Copy, Clone, Debug)]
pub struct NodeLayout {
    pub cap: u16,
    pub max_align: usize,
    pub hdr_size: usize,
    pub back_off: usize,
    pub keys_off: usize,
    pub vals_off: Option<usize>,
    /// Offset of the trailing `fwd[height]` pointer array.
    pub fwd_off: usize,
}

#[derive(Copy, Clone)]
pub struct NodeParts<K, V> {
    pub hdr: *mut NodeHdr,
    pub back_ptr: *mut *mut u8,
    pub keys_ptr: *mut MaybeUninit<K>,
    pub vals_ptr: Option<*mut MaybeUninit<V>>,
    pub fwd_ptr: *mut *mut u8,
}

impl NodeLayout {
    /// Compute a node layout for key type K and value type V, at a fixed
    /// pair capacity. `use_values` gates whether a value array is carved
    /// at all (set mode omits it, rather than allocating-and-ignoring it).
    pub fn compute_for_cap<K, V>(cap: u16, use_values: bool) -> Self {
        let a_ptr = align_of::<*const ()>();
        let a_k = align_of::<K>();
        let a_v = align_of::<V>();
        let s_ptr = size_of::<*const ()>();
        let s_k = size_of::<K>();
        let s_v = size_of::<V>();

        let mut max_align = a_ptr.max(a_k).max(align_of::<NodeHdr>());
        if use_values {
            max_align = max_align.max(a_v);
        }
        let hdr_size = align_up(size_of::<NodeHdr>(), max_align);

        let back_off = align_up(hdr_size, a_ptr);
        let after_back = back_off + s_ptr;

        let keys_off = align_up(after_back, a_k);
        let cap_usize = cap as usize;
        let after_keys = keys_off + cap_usize * s_k;

        let (vals_off, after_vals) = if use_values {
            let v_off = align_up(after_keys, a_v);
            (Some(v_off), v_off + cap_usize * s_v)
        } else {
            (None, after_keys)
        };

        let fwd_off = align_up(after_vals, a_ptr);

        Self {
            cap,
            max_align,
            hdr_size,
            back_off,
            keys_off,
            vals_off,
            fwd_off,
        }
    }

    /// Total byte size of a node allocated at the given height.
    #[inline]
    pub fn bytes_for_height(&self, height: u8) -> usize {
        let fwd_bytes = height as usize * size_of::<*const ()>();
        align_up(self.fwd_off + fwd_bytes, self.max_align)
    }
}

/// Carve a node's header, back pointer, key/value arrays, and forward
/// pointer array out of a raw base pointer.
#[inline(always)]
pub unsafe fn carve_node<K, V>(base: NonNull<u8>, layout: &NodeLayout) -> NodeParts<K, V> {
    let p = base.as_ptr();
    let hdr = p as *mut NodeHdr;
    let back_ptr = p.add(layout.back_off) as *mut *mut u8;
    let keys_ptr = p.add(layout.keys_off) as *mut MaybeUninit<K>;
    let vals_ptr = layout
        .vals_off
        .map(|off| p.add(off) as *mut MaybeUninit<V>);
    let fwd_ptr = p.add(layout.fwd_off) as *mut *mut u8;
    NodeParts {
        hdr,
        back_ptr,
        keys_ptr,
        vals_ptr,
        fwd_ptr,
    }
}
