mod test_utils;

use test_utils::cmp_i64;
use skiparray::{Appender, Config, Error, MisuseKind};

#[test]
fn appender_round_trip_matches_individual_inserts() {
    let mut appender = Appender::new(Config::new(cmp_i64).capacity(4).seed(0)).unwrap();
    for i in 0..200i64 {
        appender.append(i, i * 10).unwrap();
    }
    let built = appender.finish();
    assert!(built.check_invariants_detailed().is_ok());

    let mut inserted = skiparray::SkipMap::with_config(Config::new(cmp_i64).capacity(4).seed(0)).unwrap();
    for i in 0..200i64 {
        inserted.set(i, i * 10).unwrap();
    }

    assert_eq!(built.count(), inserted.count());
    for i in 0..200i64 {
        assert_eq!(built.get(&i), inserted.get(&i));
    }
}

#[test]
fn appender_rejects_non_ascending_keys() {
    let mut appender = Appender::new(Config::new(cmp_i64).capacity(4).seed(0)).unwrap();
    appender.append(5, 0).unwrap();
    let err = appender.append(5, 0).unwrap_err();
    assert_eq!(err, Error::Misuse(MisuseKind::DescendingKey));
    let err = appender.append(3, 0).unwrap_err();
    assert_eq!(err, Error::Misuse(MisuseKind::DescendingKey));
}
