use crate::error::{BuildError, EvalError, ShapeError};
use crate::expr::{compile_double, compile_nullable, ExprRef, Expression, Literal};
use crate::key::{DateKey, IntKey, KeyModel, NoKey, PreviousKeys};
use crate::ops::{FunctionRegistry, VAR_ARGS};
use crate::series::ValueSeries;
use crate::types::{BarIndex, ResultKind, Timestamp};
use std::ops::Range;

mod compile;

fn num(value: f64) -> ExprRef {
    Literal::double(value)
}

fn series(name: &str, values: &[f64]) -> ExprRef {
    ValueSeries::new(name, values.to_vec()).into_node()
}

fn scalar(name: &str, args: Vec<ExprRef>) -> ExprRef {
    FunctionRegistry::function(name)
        .expect("scalar function should exist")
        .call(args)
        .expect("call should validate")
}

fn history(name: &str, keys: PreviousKeys, args: Vec<ExprRef>) -> ExprRef {
    FunctionRegistry::factory(name)
        .expect("historical function should exist")
        .new_function(Some(keys))
        .expect("bound function")
        .call(args)
        .expect("call should validate")
}

fn bars(end: BarIndex) -> Range<BarIndex> {
    0..end
}

fn eval_bars(node: &ExprRef, bars: Range<BarIndex>) -> Vec<f64> {
    let f = compile_double::<IntKey>(node.as_ref()).expect("int key compile");
    bars.map(|bar| f(bar)).collect()
}

fn day(d: u32) -> Timestamp {
    Timestamp::from_ymd(2024, 1, d).expect("valid date")
}

fn assert_series_eq(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len(), "length mismatch");
    for (idx, (a, e)) in actual.iter().zip(expected).enumerate() {
        let same = (a.is_nan() && e.is_nan()) || (a - e).abs() < 1e-9;
        assert!(same, "idx={idx}, actual={a}, expected={e}");
    }
}
