use core::cmp::Ordering;

use crate::common::{bsearch_in_leaf, NodeRef};
use crate::layout::NodeLayout;
use crate::{CompareFn, SkipMap};

/// Result of descending the index for a key: the leaf that contains it (or
/// would on insertion), the window-local slot index, and whether the key
/// was actually present.
pub struct SearchResult {
    pub leaf: NodeRef,
    pub idx: u16,
    pub found: bool,
}

impl<K, V> SkipMap<K, V> {
    pub(crate) fn search(&self, key: &K) -> SearchResult {
        unsafe {
            search_impl(
                &self.heads,
                self.height,
                &self.layout,
                self.cmp,
                self.udata,
                key,
            )
        }
    }
}

/// Core skiplist descent. Maintains `(prev, cur)`; at each step compares
/// the query against the last key of `cur`'s window, per `spec.md` §4.3.
pub unsafe fn search_impl<K>(
    heads: &[Option<NodeRef>],
    height: u8,
    layout: &NodeLayout,
    cmp: CompareFn<K>,
    udata: *mut u8,
    key: &K,
) -> SearchResult {
    let root = heads[0].expect("level-0 head always present");
    if root.count() == 0 {
        return SearchResult {
            leaf: root,
            idx: 0,
            found: false,
        };
    }

    let mut level = height - 1;
    let mut prev: Option<NodeRef> = None;
    let mut cur = heads[level as usize].expect("skiplist invariant: head present at top level");

    loop {
        let last = &*cur.last_key::<K>(layout);
        match cmp(key, last, udata) {
            Ordering::Equal => {
                let idx = cur.count() - 1;
                return SearchResult {
                    leaf: cur,
                    idx,
                    found: true,
                };
            }
            Ordering::Less => {
                if level == 0 {
                    let (found, idx) = bsearch_in_leaf(cur, layout, key, cmp, udata);
                    if !found && idx == 0 {
                        if let Some(back) = cur.back(layout) {
                            if back.count() < cur.count() {
                                return SearchResult {
                                    leaf: back,
                                    idx: back.count(),
                                    found: false,
                                };
                            }
                        }
                    }
                    return SearchResult {
                        leaf: cur,
                        idx,
                        found,
                    };
                }
                let next_cur = match prev {
                    Some(p) => p.fwd(layout, level - 1),
                    None => heads[(level - 1) as usize],
                };
                cur = next_cur.expect("skiplist invariant: lower-level head exists");
                level -= 1;
            }
            Ordering::Greater => {
                if let Some(next) = cur.fwd(layout, level) {
                    prev = Some(cur);
                    cur = next;
                } else if level == 0 {
                    return SearchResult {
                        leaf: cur,
                        idx: cur.count(),
                        found: false,
                    };
                } else {
                    level -= 1;
                }
            }
        }
    }
}
