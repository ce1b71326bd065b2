//! Statistical historical functions.
//!
//! Each key walks `count` offsets back, feeds the non-NaN values into an
//! estimator built for that key alone, then queries it.

use crate::error::EvalError;
use crate::expr::Compiled;
use crate::key::{KeyModel, PreviousKeyIndexer};
use crate::ops::stats::{Estimator, RunningPercentile, RunningVariance, WindowProduct, WindowSum};
use crate::ops::ts::window_len;
use crate::ops::CallArgs;

type KernelResult<M> = Result<Compiled<<M as KeyModel>::Key>, EvalError>;

fn feed_window<K: Copy, E: Estimator>(
    keys: &dyn PreviousKeyIndexer<K>,
    key: K,
    len: usize,
    value: &dyn Fn(K) -> f64,
    estimator: &mut E,
) {
    for prev in (0..len).map_while(|offset| keys.previous_key(key, offset)) {
        let v = value(prev);
        if !v.is_nan() {
            estimator.process(v);
        }
    }
}

/// `(count, value)` rows: `make` sizes a fresh estimator from the window
/// length, `query` reads the answer.
fn window_stat<M: KeyModel, E: Estimator + 'static>(
    args: &CallArgs<'_, M>,
    make: fn(usize) -> E,
    query: fn(&E) -> f64,
) -> KernelResult<M> {
    let count = args.double(0)?;
    let value = args.double(1)?;
    let keys = args.previous_keys()?;
    Ok(Compiled::Double(Box::new(move |key| {
        let len = window_len(count(key));
        let mut estimator = make(len);
        feed_window(keys.as_ref(), key, len, value.as_ref(), &mut estimator);
        query(&estimator)
    })))
}

/// Non-NaN samples in the window.
pub(crate) fn count<M: KeyModel>(args: &CallArgs<'_, M>) -> KernelResult<M> {
    window_stat(args, |_| WindowSum::default(), |acc: &WindowSum| {
        acc.count() as f64
    })
}

pub(crate) fn sum<M: KeyModel>(args: &CallArgs<'_, M>) -> KernelResult<M> {
    window_stat(args, |_| WindowSum::default(), WindowSum::sum)
}

pub(crate) fn product<M: KeyModel>(args: &CallArgs<'_, M>) -> KernelResult<M> {
    window_stat(args, |_| WindowProduct::default(), WindowProduct::product)
}

pub(crate) fn avg<M: KeyModel>(args: &CallArgs<'_, M>) -> KernelResult<M> {
    window_stat(args, |_| RunningVariance::new(), RunningVariance::mean)
}

pub(crate) fn variance<M: KeyModel>(args: &CallArgs<'_, M>) -> KernelResult<M> {
    window_stat(
        args,
        |_| RunningVariance::new(),
        RunningVariance::population_variance,
    )
}

pub(crate) fn sample_variance<M: KeyModel>(args: &CallArgs<'_, M>) -> KernelResult<M> {
    window_stat(
        args,
        |_| RunningVariance::new(),
        RunningVariance::sample_variance,
    )
}

pub(crate) fn std_dev<M: KeyModel>(args: &CallArgs<'_, M>) -> KernelResult<M> {
    window_stat(
        args,
        |_| RunningVariance::new(),
        RunningVariance::population_std_dev,
    )
}

pub(crate) fn sample_std_dev<M: KeyModel>(args: &CallArgs<'_, M>) -> KernelResult<M> {
    window_stat(
        args,
        |_| RunningVariance::new(),
        RunningVariance::sample_std_dev,
    )
}

pub(crate) fn median<M: KeyModel>(args: &CallArgs<'_, M>) -> KernelResult<M> {
    window_stat(args, RunningPercentile::with_window, RunningPercentile::median)
}

/// `(count, value, quantile)`; the quantile is read at the current key.
pub(crate) fn percentile<M: KeyModel>(args: &CallArgs<'_, M>) -> KernelResult<M> {
    let count = args.double(0)?;
    let value = args.double(1)?;
    let quantile = args.double(2)?;
    let keys = args.previous_keys()?;
    Ok(Compiled::Double(Box::new(move |key| {
        let len = window_len(count(key));
        let mut estimator = RunningPercentile::with_window(len);
        feed_window(keys.as_ref(), key, len, value.as_ref(), &mut estimator);
        estimator.percentile(quantile(key))
    })))
}
