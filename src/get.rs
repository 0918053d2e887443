use crate::common::last_leaf;
use crate::SkipMap;

impl<K, V> SkipMap<K, V> {
    /// Look up a value by key.
    pub fn get(&self, key: &K) -> Option<&V> {
        let result = self.search(key);
        if !result.found {
            return None;
        }
        unsafe {
            let slot = result.leaf.offset() + result.idx;
            Some(&*result.leaf.val_at::<V>(&self.layout, slot))
        }
    }

    /// Look up a key/value pair by key, returning the container's own copy
    /// of the key as well (useful when the comparator treats keys as
    /// equivalent under a coarser equality than the caller's).
    pub fn get_pair(&self, key: &K) -> Option<(&K, &V)> {
        let result = self.search(key);
        if !result.found {
            return None;
        }
        unsafe {
            let slot = result.leaf.offset() + result.idx;
            Some((
                &*result.leaf.key_at::<K>(&self.layout, slot),
                &*result.leaf.val_at::<V>(&self.layout, slot),
            ))
        }
    }

    /// Whether a key is present, without reading its value.
    pub fn member(&self, key: &K) -> bool {
        self.search(key).found
    }

    /// The minimum binding, if any.
    pub fn first(&self) -> Option<(&K, Option<&V>)> {
        let root = self.root();
        unsafe {
            if root.count() == 0 {
                return None;
            }
            let offset = root.offset();
            let key = &*root.key_at::<K>(&self.layout, offset);
            let value = if self.value_mode.has_values() {
                Some(&*root.val_at::<V>(&self.layout, offset))
            } else {
                None
            };
            Some((key, value))
        }
    }

    /// The maximum binding, if any.
    pub fn last(&self) -> Option<(&K, Option<&V>)> {
        unsafe {
            let leaf = last_leaf(&self.heads, self.height, &self.layout)?;
            let count = leaf.count();
            if count == 0 {
                return None;
            }
            let slot = leaf.offset() + count - 1;
            let key = &*leaf.key_at::<K>(&self.layout, slot);
            let value = if self.value_mode.has_values() {
                Some(&*leaf.val_at::<V>(&self.layout, slot))
            } else {
                None
            };
            Some((key, value))
        }
    }
}
