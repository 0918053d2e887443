mod test_utils;

use test_utils::cmp_i64;
use skiparray::{Config, PopOutcome, SkipMap};

#[test]
fn capacity_two_split_merge_cascade() {
    let mut map: SkipMap<i64, i64> =
        SkipMap::with_config(Config::new(cmp_i64).capacity(2).seed(0)).unwrap();
    for &(k, v) in &[(1i64, 10i64), (2, 20), (3, 30), (4, 40), (5, 50)] {
        map.set(k, v).unwrap();
        assert!(map.check_invariants_detailed().is_ok());
    }

    match map.pop_first().unwrap() {
        PopOutcome::Popped(k, v) => {
            assert_eq!(k, 1);
            assert_eq!(v, Some(10));
        }
        PopOutcome::Empty => panic!("container was not empty"),
    }
    assert!(map.check_invariants_detailed().is_ok());

    match map.pop_last().unwrap() {
        PopOutcome::Popped(k, v) => {
            assert_eq!(k, 5);
            assert_eq!(v, Some(50));
        }
        PopOutcome::Empty => panic!("container was not empty"),
    }
    assert!(map.check_invariants_detailed().is_ok());

    assert_eq!(map.count(), 3);
}

#[test]
fn capacity_two_churns_under_sustained_insert_and_remove() {
    let mut map: SkipMap<i64, i64> =
        SkipMap::with_config(Config::new(cmp_i64).capacity(2).seed(7)).unwrap();
    for i in 0..200i64 {
        map.set(i, i * 2).unwrap();
        assert!(map.check_invariants_detailed().is_ok());
    }
    for i in (0..200i64).step_by(2) {
        map.forget(&i).unwrap();
        assert!(map.check_invariants_detailed().is_ok());
    }
    assert_eq!(map.count(), 100);
    for i in (1..200i64).step_by(2) {
        assert_eq!(map.get(&i), Some(&(i * 2)));
    }
}
