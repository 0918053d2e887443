mod test_utils;

use test_utils::cmp_i64;
use skiparray::{Config, Endpoint, ForgetOutcome, SkipMap, StepOutcome};

fn collect_keys(map: &SkipMap<i64, i64>) -> Vec<i64> {
    let mut keys = Vec::new();
    let mut cursor = match map.cursor(Endpoint::First) {
        Some(c) => c,
        None => return keys,
    };
    loop {
        keys.push(*cursor.get().0);
        if cursor.next() == StepOutcome::End {
            break;
        }
    }
    keys
}

#[test]
fn insert_and_iterate_forward() {
    let mut map: SkipMap<i64, i64> =
        SkipMap::with_config(Config::new(cmp_i64).capacity(3).seed(0)).unwrap();
    for &(k, v) in &[(0i64, 0i64), (7, 0), (8, 0), (3, 0)] {
        map.set(k, v).unwrap();
    }

    assert_eq!(map.count(), 4);
    assert_eq!(map.get(&3), Some(&0));
    assert_eq!(collect_keys(&map), vec![0, 3, 7, 8]);
    assert!(map.check_invariants_detailed().is_ok());
}

#[test]
fn forget_removes_exactly_one_key() {
    let mut map: SkipMap<i64, i64> =
        SkipMap::with_config(Config::new(cmp_i64).capacity(3).seed(0)).unwrap();
    for &(k, v) in &[(0i64, 0i64), (1, 1), (2, 2), (3, 3), (4, 4)] {
        map.set(k, v).unwrap();
    }

    match map.forget(&2).unwrap() {
        ForgetOutcome::Removed(k, v) => {
            assert_eq!(k, 2);
            assert_eq!(v, Some(2));
        }
        ForgetOutcome::NotFound => panic!("key 2 was present"),
    }

    assert_eq!(map.get(&2), None);
    assert_eq!(map.count(), 4);
    assert_eq!(collect_keys(&map), vec![0, 1, 3, 4]);
    assert!(map.check_invariants_detailed().is_ok());

    assert!(matches!(map.forget(&2).unwrap(), ForgetOutcome::NotFound));
    assert_eq!(map.count(), 4);
}

#[test]
fn set_with_pair_preserves_key_on_request() {
    let mut map: SkipMap<i64, i64> =
        SkipMap::with_config(Config::new(cmp_i64).capacity(4).seed(0)).unwrap();
    map.set(1, 100).unwrap();

    let replaced = map.set_with_pair(1, 200, false).unwrap();
    match replaced {
        skiparray::SetOutcome::Replaced {
            previous_key,
            previous_value,
        } => {
            assert_eq!(previous_key, None);
            assert_eq!(previous_value, Some(100));
        }
        skiparray::SetOutcome::Bound => panic!("key 1 was already present"),
    }
    assert_eq!(map.get(&1), Some(&200));
}
