//! Scalar kernels: value at the current key only.
//!
//! Every kernel is generic over the key model, so one row serves all three
//! calling conventions.

use crate::compare::{self, max_nanable, min_nanable};
use crate::error::EvalError;
use crate::expr::{Compiled, Evaluator};
use crate::key::KeyModel;
use crate::ops::CallArgs;

type KernelResult<M> = Result<Compiled<<M as KeyModel>::Key>, EvalError>;

#[inline]
fn unary<M: KeyModel>(args: &CallArgs<'_, M>, op: fn(f64) -> f64) -> KernelResult<M> {
    let value = args.double(0)?;
    Ok(Compiled::Double(Box::new(move |key| op(value(key)))))
}

#[inline]
fn binary<M: KeyModel>(args: &CallArgs<'_, M>, op: fn(f64, f64) -> f64) -> KernelResult<M> {
    let left = args.double(0)?;
    let right = args.double(1)?;
    Ok(Compiled::Double(Box::new(move |key| {
        op(left(key), right(key))
    })))
}

pub(crate) fn add<M: KeyModel>(args: &CallArgs<'_, M>) -> KernelResult<M> {
    binary(args, |a, b| a + b)
}

pub(crate) fn sub<M: KeyModel>(args: &CallArgs<'_, M>) -> KernelResult<M> {
    binary(args, |a, b| a - b)
}

pub(crate) fn mul<M: KeyModel>(args: &CallArgs<'_, M>) -> KernelResult<M> {
    binary(args, |a, b| a * b)
}

/// Division by zero yields NaN rather than an infinity.
pub(crate) fn div<M: KeyModel>(args: &CallArgs<'_, M>) -> KernelResult<M> {
    binary(args, |a, b| if b == 0.0 { f64::NAN } else { a / b })
}

pub(crate) fn neg<M: KeyModel>(args: &CallArgs<'_, M>) -> KernelResult<M> {
    unary(args, |a| -a)
}

pub(crate) fn abs<M: KeyModel>(args: &CallArgs<'_, M>) -> KernelResult<M> {
    unary(args, f64::abs)
}

/// Only the selected branch is evaluated; an unknown condition picks `else`.
pub(crate) fn if_else<M: KeyModel>(args: &CallArgs<'_, M>) -> KernelResult<M> {
    let condition = args.boolean(0)?;
    let then = args.double(1)?;
    let otherwise = args.double(2)?;
    Ok(Compiled::Double(Box::new(move |key| {
        if condition(key) {
            then(key)
        } else {
            otherwise(key)
        }
    })))
}

fn fold_values<M: KeyModel>(args: &CallArgs<'_, M>, op: fn(f64, f64) -> f64) -> KernelResult<M> {
    let values: Vec<Evaluator<M::Key, f64>> = args.doubles_from(0)?;
    Ok(Compiled::Double(Box::new(move |key| {
        values
            .iter()
            .map(|value| value(key))
            .reduce(op)
            .unwrap_or(f64::NAN)
    })))
}

/// NaN arguments lose; all-NaN gives NaN.
pub(crate) fn max<M: KeyModel>(args: &CallArgs<'_, M>) -> KernelResult<M> {
    fold_values(args, max_nanable)
}

pub(crate) fn min<M: KeyModel>(args: &CallArgs<'_, M>) -> KernelResult<M> {
    fold_values(args, min_nanable)
}

/// Shared by `gt`/`ge`/`lt`/`le`/`eq`/`ne`; the operator comes from the row.
pub(crate) fn comparison<M: KeyModel>(args: &CallArgs<'_, M>) -> KernelResult<M> {
    let operator = args
        .function()
        .operator()
        .ok_or_else(|| args.unsupported("row has no comparison operator"))?;
    let left = args.double(0)?;
    let right = args.double(1)?;
    Ok(Compiled::Nullable(Box::new(move |key| {
        operator.apply_nullable(left(key), right(key))
    })))
}

/// -1, 0 or 1 under the default (NaN as zero) ordering.
pub(crate) fn ordering<M: KeyModel>(args: &CallArgs<'_, M>) -> KernelResult<M> {
    let left = args.double(0)?;
    let right = args.double(1)?;
    Ok(Compiled::Integer(Box::new(move |key| {
        compare::compare(left(key), right(key)) as i32
    })))
}

pub(crate) fn not<M: KeyModel>(args: &CallArgs<'_, M>) -> KernelResult<M> {
    let value = args.nullable(0)?;
    Ok(Compiled::Nullable(Box::new(move |key| value(key).map(|v| !v))))
}

pub(crate) fn is_true<M: KeyModel>(args: &CallArgs<'_, M>) -> KernelResult<M> {
    let value = args.nullable(0)?;
    Ok(Compiled::Boolean(Box::new(move |key| value(key) == Some(true))))
}

pub(crate) fn is_false<M: KeyModel>(args: &CallArgs<'_, M>) -> KernelResult<M> {
    let value = args.nullable(0)?;
    Ok(Compiled::Boolean(Box::new(move |key| value(key) == Some(false))))
}

/// Kleene conjunction; the right side is skipped once the left is false.
pub(crate) fn and<M: KeyModel>(args: &CallArgs<'_, M>) -> KernelResult<M> {
    let left = args.nullable(0)?;
    let right = args.nullable(1)?;
    Ok(Compiled::Nullable(Box::new(move |key| match left(key) {
        Some(false) => Some(false),
        Some(true) => right(key),
        None => match right(key) {
            Some(false) => Some(false),
            _ => None,
        },
    })))
}

/// Kleene disjunction; the right side is skipped once the left is true.
pub(crate) fn or<M: KeyModel>(args: &CallArgs<'_, M>) -> KernelResult<M> {
    let left = args.nullable(0)?;
    let right = args.nullable(1)?;
    Ok(Compiled::Nullable(Box::new(move |key| match left(key) {
        Some(true) => Some(true),
        Some(false) => right(key),
        None => match right(key) {
            Some(true) => Some(true),
            _ => None,
        },
    })))
}

pub(crate) fn is_nan<M: KeyModel>(args: &CallArgs<'_, M>) -> KernelResult<M> {
    let value = args.double(0)?;
    Ok(Compiled::Boolean(Box::new(move |key| value(key).is_nan())))
}
