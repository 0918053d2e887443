mod test_utils;

use test_utils::cmp_i64;
use skiparray::{Config, Endpoint, PopOutcome, SkipMap};

#[test]
fn empty_container_reports_empty_everywhere() {
    let mut map: SkipMap<i64, i64> =
        SkipMap::with_config(Config::new(cmp_i64).capacity(4).seed(0)).unwrap();

    assert_eq!(map.first(), None);
    assert_eq!(map.last(), None);
    assert!(map.cursor(Endpoint::First).is_none());
    assert!(map.cursor(Endpoint::Last).is_none());
    assert!(matches!(map.pop_first().unwrap(), PopOutcome::Empty));
    assert!(matches!(map.pop_last().unwrap(), PopOutcome::Empty));
    assert_eq!(map.count(), 0);
    assert!(map.check_invariants_detailed().is_ok());
}

#[test]
fn max_level_one_degenerates_to_a_linked_list() {
    let mut map: SkipMap<i64, i64> =
        SkipMap::with_config(Config::new(cmp_i64).capacity(4).max_level(1).seed(0)).unwrap();
    for i in 0..60i64 {
        map.set(i, i * 2).unwrap();
        assert!(map.check_invariants_detailed().is_ok());
    }
    for i in 0..60i64 {
        assert_eq!(map.get(&i), Some(&(i * 2)));
    }
    for i in (0..60i64).step_by(3) {
        map.forget(&i).unwrap();
    }
    assert!(map.check_invariants_detailed().is_ok());
}

#[test]
fn bad_config_is_rejected() {
    let err = SkipMap::<i64, i64>::with_config(Config::new(cmp_i64).capacity(1)).unwrap_err();
    assert_eq!(
        err,
        skiparray::Error::Misuse(skiparray::MisuseKind::BadConfig)
    );

    let err = SkipMap::<i64, i64>::with_config(Config::new(cmp_i64).max_level(200)).unwrap_err();
    assert_eq!(
        err,
        skiparray::Error::Misuse(skiparray::MisuseKind::BadConfig)
    );
}
