mod test_utils;

use test_utils::cmp_i64;
use skiparray::{Config, FoldDirection, FoldEngine, FoldStepOutcome, SkipMap};

fn build(divisor: i64, n: i64, seed: u64) -> SkipMap<i64, i64> {
    let mut map = SkipMap::with_config(Config::new(cmp_i64).capacity(4).seed(seed)).unwrap();
    for k in 0..n {
        map.set(k * divisor, divisor).unwrap();
    }
    map
}

fn merge_largest_divisor(
    _keys: &[&i64],
    values: &[Option<&i64>],
    merged: &mut Option<i64>,
    _udata: *mut u8,
) -> usize {
    let mut best_idx = 0;
    let mut best_val = *values[0].expect("WithValues container always has a value");
    for (i, v) in values.iter().enumerate().skip(1) {
        let val = *v.expect("WithValues container always has a value");
        if val > best_val {
            best_val = val;
            best_idx = i;
        }
    }
    *merged = Some(best_val);
    best_idx
}

fn collect(key: &i64, value: Option<&i64>, ctx_ptr: *mut u8) {
    let out = unsafe { &mut *(ctx_ptr as *mut Vec<(i64, i64)>) };
    out.push((*key, *value.expect("WithValues container always has a value")));
}

#[test]
fn multi_fold_merges_by_largest_divisor() {
    let n = 24i64;
    let c1 = build(1, n, 0);
    let c3 = build(3, n, 0);
    let c5 = build(5, n, 0);

    let mut engine =
        FoldEngine::new_multi(&[&c1, &c3, &c5], FoldDirection::Ascending, Some(merge_largest_divisor))
            .unwrap();

    let mut emitted: Vec<(i64, i64)> = Vec::new();
    let ctx_ptr = &mut emitted as *mut Vec<(i64, i64)> as *mut u8;
    loop {
        match engine.step(collect, ctx_ptr) {
            FoldStepOutcome::Stepped => {}
            FoldStepOutcome::Done => break,
        }
    }
    engine.halt();

    for pair in emitted.windows(2) {
        assert!(pair[0].0 < pair[1].0, "emitted sequence must be strictly ascending");
    }

    let expected_divisor = |k: i64| -> i64 {
        [1i64, 3, 5]
            .into_iter()
            .filter(|&d| k % d == 0 && k / d < n)
            .max()
            .unwrap()
    };
    for &(k, d) in &emitted {
        assert_eq!(d, expected_divisor(k), "key {k} got the wrong merged divisor");
    }
}

#[test]
fn single_container_fold_needs_no_merge_callback() {
    let c1 = build(1, 30, 0);
    let mut engine = FoldEngine::new_single(&c1, FoldDirection::Ascending).unwrap();

    let mut emitted: Vec<(i64, i64)> = Vec::new();
    let ctx_ptr = &mut emitted as *mut Vec<(i64, i64)> as *mut u8;
    loop {
        match engine.step(collect, ctx_ptr) {
            FoldStepOutcome::Stepped => {}
            FoldStepOutcome::Done => break,
        }
    }
    engine.halt();

    assert_eq!(emitted.len(), 30);
    for pair in emitted.windows(2) {
        assert!(pair[0].0 < pair[1].0);
    }
}

#[test]
fn multi_fold_without_merge_callback_is_rejected() {
    let c1 = build(1, 5, 0);
    let c3 = build(3, 5, 0);
    let err = FoldEngine::new_multi(&[&c1, &c3], FoldDirection::Ascending, None).unwrap_err();
    assert_eq!(
        err,
        skiparray::Error::Misuse(skiparray::MisuseKind::MergeRequired)
    );
}
