//! Historical quantifiers and index scans.
//!
//! Offsets count back from the current key: offset 0 is the key itself,
//! offset `n` is `previous_key(key, n)`. A window of length `count` covers
//! offsets `[0, count)`.

use crate::error::EvalError;
use crate::expr::{compile_double, Compiled};
use crate::key::{KeyModel, PreviousKeyIndexer};
use crate::ops::CallArgs;

type KernelResult<M> = Result<Compiled<<M as KeyModel>::Key>, EvalError>;

/// Returned by the scan helpers when no offset matches.
pub const NOT_FOUND: i64 = -1;

/// Window length from a per-key `count` value. NaN and values below 1 give
/// an empty window; fractions truncate.
#[inline]
pub fn window_len(count: f64) -> usize {
    if count >= 1.0 {
        count as usize
    } else {
        0
    }
}

#[inline]
fn to_index(offset: usize) -> i64 {
    i64::try_from(offset).unwrap_or(NOT_FOUND)
}

#[inline]
fn index_to_double(index: i64) -> f64 {
    if index == NOT_FOUND {
        f64::NAN
    } else {
        index as f64
    }
}

/// Number of leading offsets in `[0, lookback)` that resolve to a key.
fn resolvable_len<K: Copy>(keys: &dyn PreviousKeyIndexer<K>, key: K, lookback: usize) -> usize {
    if lookback == 0 || keys.previous_key(key, lookback - 1).is_some() {
        return lookback;
    }
    // offsets below `lo` resolve, offset `hi` does not
    let (mut lo, mut hi) = (0, lookback - 1);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if keys.previous_key(key, mid).is_some() {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}

/// Oldest matching offset, scanning `lookback - 1` down to 0.
pub fn first_index_of<K: Copy>(
    keys: &dyn PreviousKeyIndexer<K>,
    key: K,
    lookback: usize,
    condition: impl Fn(K) -> bool,
) -> i64 {
    (0..resolvable_len(keys, key, lookback))
        .rev()
        .find(|&offset| keys.previous_key(key, offset).is_some_and(&condition))
        .map_or(NOT_FOUND, to_index)
}

/// Newest matching offset, scanning 0 up to `lookback - 1`.
pub fn last_index_of<K: Copy>(
    keys: &dyn PreviousKeyIndexer<K>,
    key: K,
    lookback: usize,
    condition: impl Fn(K) -> bool,
) -> i64 {
    scan_from(keys, key, 0, lookback, &condition).map_or(NOT_FOUND, to_index)
}

fn scan_from<K: Copy>(
    keys: &dyn PreviousKeyIndexer<K>,
    key: K,
    base: usize,
    lookback: usize,
    condition: &impl Fn(K) -> bool,
) -> Option<usize> {
    (0..lookback)
        .map_while(|step| {
            let offset = base.checked_add(step)?;
            keys.previous_key(key, offset).map(|prev| (offset, prev))
        })
        .find(|&(_, prev)| condition(prev))
        .map(|(offset, _)| offset)
}

/// What a chained scan reports when a step finds nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainMode {
    /// [`NOT_FOUND`] for the whole chain.
    Strict,
    /// The offset of the last step that matched.
    Partial,
}

/// `steps` newest-first scans chained end to end. Each step starts one key
/// before the previous match and looks `lookback` keys back from there; the
/// result is the total offset of the final match.
pub fn chained_index_of<K: Copy>(
    keys: &dyn PreviousKeyIndexer<K>,
    key: K,
    lookback: usize,
    steps: usize,
    mode: ChainMode,
    condition: impl Fn(K) -> bool,
) -> i64 {
    let mut found = NOT_FOUND;
    let mut base = 0usize;
    for _ in 0..steps {
        match scan_from(keys, key, base, lookback, &condition) {
            Some(offset) => {
                found = to_index(offset);
                base = offset.saturating_add(1);
            }
            None => {
                return match mode {
                    ChainMode::Strict => NOT_FOUND,
                    ChainMode::Partial => found,
                };
            }
        }
    }
    found
}

/// Rising edge: true now, not true one key back.
pub(crate) fn once<M: KeyModel>(args: &CallArgs<'_, M>) -> KernelResult<M> {
    let condition = args.boolean(0)?;
    let keys = args.previous_keys()?;
    Ok(Compiled::Boolean(Box::new(move |key| {
        condition(key) && !keys.previous_key(key, 1).is_some_and(|prev| condition(prev))
    })))
}

pub(crate) fn stable<M: KeyModel>(args: &CallArgs<'_, M>) -> KernelResult<M> {
    let count = args.double(0)?;
    let condition = args.boolean(1)?;
    let keys = args.previous_keys()?;
    Ok(Compiled::Boolean(Box::new(move |key| {
        let len = window_len(count(key));
        len > 0
            && (0..len).all(|offset| {
                keys.previous_key(key, offset)
                    .is_some_and(|prev| condition(prev))
            })
    })))
}

/// Stops at the first true offset.
pub(crate) fn occurs<M: KeyModel>(args: &CallArgs<'_, M>) -> KernelResult<M> {
    let count = args.double(0)?;
    let condition = args.boolean(1)?;
    let keys = args.previous_keys()?;
    Ok(Compiled::Boolean(Box::new(move |key| {
        (0..window_len(count(key)))
            .map_while(|offset| keys.previous_key(key, offset))
            .any(|prev| condition(prev))
    })))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quantifier {
    All,
    Any,
}

/// One comparison operand is read at the current key and held; the other is
/// swept across the window.
fn swept<M: KeyModel>(
    args: &CallArgs<'_, M>,
    side: Side,
    quantifier: Quantifier,
) -> KernelResult<M> {
    let count = args.double(0)?;
    let operation = args.binary(1)?;
    let left = compile_double::<M>(operation.left().as_ref())?;
    let right = compile_double::<M>(operation.right().as_ref())?;
    let keys = args.previous_keys()?;
    Ok(Compiled::Boolean(Box::new(move |key| {
        let len = window_len(count(key));
        if len == 0 {
            return false;
        }
        let held = match side {
            Side::Left => right(key),
            Side::Right => left(key),
        };
        let holds_at = |prev: M::Key| match side {
            Side::Left => operation.apply_boolean(left(prev), held),
            Side::Right => operation.apply_boolean(held, right(prev)),
        };
        match quantifier {
            Quantifier::All => (0..len)
                .all(|offset| keys.previous_key(key, offset).is_some_and(holds_at)),
            Quantifier::Any => (0..len)
                .map_while(|offset| keys.previous_key(key, offset))
                .any(holds_at),
        }
    })))
}

pub(crate) fn stable_left<M: KeyModel>(args: &CallArgs<'_, M>) -> KernelResult<M> {
    swept(args, Side::Left, Quantifier::All)
}

pub(crate) fn stable_right<M: KeyModel>(args: &CallArgs<'_, M>) -> KernelResult<M> {
    swept(args, Side::Right, Quantifier::All)
}

pub(crate) fn occurs_left<M: KeyModel>(args: &CallArgs<'_, M>) -> KernelResult<M> {
    swept(args, Side::Left, Quantifier::Any)
}

pub(crate) fn occurs_right<M: KeyModel>(args: &CallArgs<'_, M>) -> KernelResult<M> {
    swept(args, Side::Right, Quantifier::Any)
}

pub(crate) fn first_index<M: KeyModel>(args: &CallArgs<'_, M>) -> KernelResult<M> {
    let condition = args.boolean(0)?;
    let lookback = args.double(1)?;
    let keys = args.previous_keys()?;
    Ok(Compiled::Double(Box::new(move |key| {
        let lookback = window_len(lookback(key));
        index_to_double(first_index_of(keys.as_ref(), key, lookback, |prev| {
            condition(prev)
        }))
    })))
}

pub(crate) fn last_index<M: KeyModel>(args: &CallArgs<'_, M>) -> KernelResult<M> {
    let condition = args.boolean(0)?;
    let lookback = args.double(1)?;
    let keys = args.previous_keys()?;
    Ok(Compiled::Double(Box::new(move |key| {
        let lookback = window_len(lookback(key));
        index_to_double(last_index_of(keys.as_ref(), key, lookback, |prev| {
            condition(prev)
        }))
    })))
}

fn chained<M: KeyModel>(args: &CallArgs<'_, M>, mode: ChainMode) -> KernelResult<M> {
    let condition = args.boolean(0)?;
    let lookback = args.double(1)?;
    let steps = args.double(2)?;
    let keys = args.previous_keys()?;
    Ok(Compiled::Double(Box::new(move |key| {
        let lookback = window_len(lookback(key));
        let steps = window_len(steps(key));
        index_to_double(chained_index_of(
            keys.as_ref(),
            key,
            lookback,
            steps,
            mode,
            |prev| condition(prev),
        ))
    })))
}

pub(crate) fn previous_index<M: KeyModel>(args: &CallArgs<'_, M>) -> KernelResult<M> {
    chained(args, ChainMode::Strict)
}

pub(crate) fn latest_index<M: KeyModel>(args: &CallArgs<'_, M>) -> KernelResult<M> {
    chained(args, ChainMode::Partial)
}

/// Value `offset` keys back; NaN past the start of the series.
pub(crate) fn previous<M: KeyModel>(args: &CallArgs<'_, M>) -> KernelResult<M> {
    let value = args.double(0)?;
    let offset = args.double(1)?;
    let keys = args.previous_keys()?;
    Ok(Compiled::Double(Box::new(move |key| {
        let offset = offset(key);
        if !(offset >= 0.0) {
            return f64::NAN;
        }
        keys.previous_key(key, offset as usize)
            .map_or(f64::NAN, |prev| value(prev))
    })))
}
