mod test_utils;

use test_utils::cmp_i64;
use skiparray::{Config, Endpoint, Error, SkipMap};

#[test]
fn live_cursor_locks_mutation_until_dropped() {
    let mut map: SkipMap<i64, i64> =
        SkipMap::with_config(Config::new(cmp_i64).capacity(3).seed(0)).unwrap();
    map.set(1, 1).unwrap();

    let cursor = map.cursor(Endpoint::First).unwrap();
    assert_eq!(map.set(2, 2).unwrap_err(), Error::Locked);
    assert_eq!(map.forget(&1).unwrap_err(), Error::Locked);
    assert_eq!(map.pop_first().unwrap_err(), Error::Locked);

    drop(cursor);
    assert!(map.set(2, 2).is_ok());
    assert!(map.check_invariants_detailed().is_ok());
}

#[test]
fn two_live_cursors_both_must_drop_before_unlocking() {
    let mut map: SkipMap<i64, i64> =
        SkipMap::with_config(Config::new(cmp_i64).capacity(3).seed(0)).unwrap();
    map.set(1, 1).unwrap();
    map.set(2, 2).unwrap();

    let first = map.cursor(Endpoint::First).unwrap();
    let second = map.cursor(Endpoint::Last).unwrap();
    assert_eq!(map.forget(&1).unwrap_err(), Error::Locked);

    drop(first);
    assert_eq!(map.forget(&1).unwrap_err(), Error::Locked);

    drop(second);
    assert!(map.forget(&1).is_ok());
}
