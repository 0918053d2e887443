use std::cmp::Ordering;

pub fn cmp_i64(a: &i64, b: &i64, _udata: *mut u8) -> Ordering {
    a.cmp(b)
}
