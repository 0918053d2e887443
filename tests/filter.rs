mod test_utils;

use test_utils::cmp_i64;
use skiparray::{filter, Config, Endpoint, SkipMap, StepOutcome};

fn is_even(key: &i64, _value: Option<&i64>, _udata: *mut u8) -> bool {
    key % 2 == 0
}

#[test]
fn filter_keeps_only_matching_entries_in_ascending_order() {
    let mut source: SkipMap<i64, i64> =
        SkipMap::with_config(Config::new(cmp_i64).capacity(4).seed(3)).unwrap();
    for i in 0..40i64 {
        source.set(i, i * i).unwrap();
    }

    let filtered = filter(
        &source,
        is_even,
        core::ptr::null_mut(),
        Config::new(cmp_i64).capacity(4).seed(3),
    )
    .unwrap();
    assert!(filtered.check_invariants_detailed().is_ok());
    assert_eq!(filtered.count(), 20);

    let mut cursor = filtered.cursor(Endpoint::First).unwrap();
    let mut previous: Option<i64> = None;
    loop {
        let (key, value) = cursor.get();
        assert_eq!(key % 2, 0);
        assert_eq!(*value.unwrap(), key * key);
        if let Some(prev) = previous {
            assert!(prev < *key);
        }
        previous = Some(*key);
        if cursor.next() == StepOutcome::End {
            break;
        }
    }
}
