extern crate alloc;

use alloc::alloc::{alloc, dealloc, Layout};
use core::mem::{align_of, size_of};
use core::ptr::{self, NonNull};

use crate::layout::{carve_node, NodeHdr, NodeLayout};
use crate::MemoryFn;

#[inline]
fn layout_for(bytes: usize, align: usize) -> Layout {
    // SAFETY: align is computed from type/layout alignments => power of two, non-zero.
    Layout::from_size_align(bytes, align).expect("invalid layout")
}

/// Allocate a node of the given height and initialize its header, back
/// pointer, and forward pointers to defaults (empty, unlinked).
#[inline]
pub unsafe fn alloc_node<K, V>(
    layout: &NodeLayout,
    height: u8,
    mem: MemoryFn,
    udata: *mut u8,
) -> Option<NonNull<u8>> {
    let bytes = layout.bytes_for_height(height);
    let raw = mem(ptr::null_mut(), bytes, udata);
    let base = NonNull::new(raw)?;

    let hdr = base.as_ptr() as *mut NodeHdr;
    ptr::write(
        hdr,
        NodeHdr {
            height,
            flags: 0,
            offset: layout.cap / 2,
            count: 0,
        },
    );

    let parts = carve_node::<(), ()>(base, layout);
    ptr::write(parts.back_ptr, ptr::null_mut());
    for i in 0..height as usize {
        ptr::write(parts.fwd_ptr.add(i), ptr::null_mut());
    }

    Some(base)
}

/// Release a node's backing storage. Caller is responsible for having
/// already dropped/released any live keys and values within it.
#[inline]
pub unsafe fn dealloc_node(base: NonNull<u8>, layout: &NodeLayout, mem: MemoryFn, udata: *mut u8) {
    let hdr = &*(base.as_ptr() as *const NodeHdr);
    let bytes = layout.bytes_for_height(hdr.height);
    let _ = mem(base.as_ptr(), 0, udata);
    let _ = bytes; // the default memory fn recovers size from its own header
}

/// Header prefixed onto every allocation made by [`default_memory_fn`] so
/// that a size-less free (matching the `skiparray_memory_fun` contract: "if
/// P is non-NULL and nsize is 0, free it") can still recover the `Layout`
/// that was originally used to allocate, which Rust's global allocator
/// requires for `dealloc`.
#[repr(C)]
struct AllocHeader {
    size: usize,
}

fn header_size(align: usize) -> usize {
    let raw = size_of::<AllocHeader>();
    (raw + (align - 1)) & !(align - 1)
}

const DEFAULT_ALIGN: usize = align_of::<u128>();

/// Default word-aligned memory function, used when a container's config
/// does not supply one. Implements the `(ptr, nsize, udata)` contract from
/// `spec.md` §6 on top of the global allocator.
pub unsafe fn default_memory_fn(p: *mut u8, nsize: usize, _udata: *mut u8) -> *mut u8 {
    let hsize = header_size(DEFAULT_ALIGN);
    if p.is_null() {
        if nsize == 0 {
            return ptr::null_mut();
        }
        let total = hsize + nsize;
        let layout = layout_for(total, DEFAULT_ALIGN);
        let raw = alloc(layout);
        if raw.is_null() {
            return ptr::null_mut();
        }
        ptr::write(raw as *mut AllocHeader, AllocHeader { size: nsize });
        raw.add(hsize)
    } else {
        debug_assert_eq!(nsize, 0, "default_memory_fn never reallocates");
        let raw = p.sub(hsize);
        let hdr = ptr::read(raw as *const AllocHeader);
        let total = hsize + hdr.size;
        let layout = layout_for(total, DEFAULT_ALIGN);
        dealloc(raw, layout);
        ptr::null_mut()
    }
}
