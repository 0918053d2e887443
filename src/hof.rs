use crate::fold::{FoldDirection, FoldEngine, FoldStepOutcome};
use crate::{Appender, Config, Error, SkipMap};

/// Called once per binding in ascending order; returns whether it
/// survives into the filtered container.
pub type PredicateFn<K, V> = fn(&K, Option<&V>, *mut u8) -> bool;

struct FilterCtx<K, V> {
    predicate: PredicateFn<K, V>,
    predicate_udata: *mut u8,
    appender: *mut Appender<K, V>,
    error: Option<Error>,
}

fn append_if_accepted<K, V>(key: &K, value: Option<&V>, ctx_ptr: *mut u8)
where
    K: Clone,
    V: Clone + Default,
{
    let ctx = unsafe { &mut *(ctx_ptr as *mut FilterCtx<K, V>) };
    if ctx.error.is_some() {
        return;
    }
    if !(ctx.predicate)(key, value, ctx.predicate_udata) {
        return;
    }
    // A `KeysOnly` container has no real value to clone; `V::default()`
    // stands in as a placeholder that the appender never stores.
    let owned_value = value.cloned().unwrap_or_default();
    let appender = unsafe { &mut *ctx.appender };
    if let Err(err) = appender.append(key.clone(), owned_value) {
        ctx.error = Some(err);
    }
}

/// Build a new container holding only the bindings of `source` for
/// which `predicate` returns `true`, in ascending order. Implemented as
/// an ascending fold over `source` feeding an ascending-only appender,
/// so it runs in a single linear pass without touching `source`.
/// Grounded on `skiparray_hof.c`'s `skiparray_filter`.
pub fn filter<K, V>(
    source: &SkipMap<K, V>,
    predicate: PredicateFn<K, V>,
    predicate_udata: *mut u8,
    config: Config<K, V>,
) -> Result<SkipMap<K, V>, Error>
where
    K: Clone,
    V: Clone + Default,
{
    let mut appender = Appender::with_ascending_check(config, false)?;
    let mut engine = FoldEngine::new_single(source, FoldDirection::Ascending)?;

    let mut ctx = FilterCtx {
        predicate,
        predicate_udata,
        appender: &mut appender as *mut Appender<K, V>,
        error: None,
    };
    let ctx_ptr = &mut ctx as *mut FilterCtx<K, V> as *mut u8;

    loop {
        let outcome = engine.step(append_if_accepted::<K, V>, ctx_ptr);
        if ctx.error.is_some() || outcome == FoldStepOutcome::Done {
            break;
        }
    }
    engine.halt();

    match ctx.error {
        Some(err) => Err(err),
        None => Ok(appender.finish()),
    }
}
