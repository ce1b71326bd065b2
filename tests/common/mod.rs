#![allow(dead_code)]

use series_expr::{
    BarIndex, Compiled, EvalError, ExprRef, Expression, FunctionRegistry, IntKey, KeyModel,
    Literal, PreviousKeys, ResultKind, Timestamp, ValueSeries,
};
use std::sync::{Arc, Mutex};

pub const TOL: f64 = 1e-9;

pub fn num(value: f64) -> ExprRef {
    Literal::double(value)
}

pub fn series(name: &str, values: &[f64]) -> ExprRef {
    ValueSeries::new(name, values.to_vec()).into_node()
}

pub fn scalar(name: &str, args: Vec<ExprRef>) -> ExprRef {
    FunctionRegistry::function(name)
        .unwrap_or_else(|| panic!("unknown scalar function `{name}`"))
        .call(args)
        .unwrap_or_else(|e| panic!("invalid call to `{name}`: {e}"))
}

pub fn history(name: &str, args: Vec<ExprRef>) -> ExprRef {
    history_with(name, PreviousKeys::bars(), args)
}

pub fn history_with(name: &str, keys: PreviousKeys, args: Vec<ExprRef>) -> ExprRef {
    FunctionRegistry::factory(name)
        .unwrap_or_else(|| panic!("unknown historical function `{name}`"))
        .new_function(Some(keys))
        .expect("factory with context should bind")
        .call(args)
        .unwrap_or_else(|e| panic!("invalid call to `{name}`: {e}"))
}

pub fn eval_at(node: &ExprRef, bar: BarIndex) -> f64 {
    let f = series_expr::expr::compile_double::<IntKey>(node.as_ref()).expect("int key compile");
    f(bar)
}

pub fn day(d: u32) -> Timestamp {
    Timestamp::from_ymd(2024, 1, d).expect("valid date")
}

pub fn assert_close(actual: f64, expected: f64) {
    let same = (actual.is_nan() && expected.is_nan()) || (actual - expected).abs() < TOL;
    assert!(same, "actual={actual}, expected={expected}");
}

/// Boolean condition over bar keys that records every bar it is asked about.
#[derive(Debug, Clone)]
pub struct RecordingCondition {
    true_bars: Arc<[BarIndex]>,
    visited: Arc<Mutex<Vec<BarIndex>>>,
}

impl RecordingCondition {
    /// True exactly at `now - offset` for each listed offset.
    pub fn at_offsets(now: BarIndex, offsets: &[BarIndex]) -> Self {
        Self {
            true_bars: offsets.iter().map(|offset| now - offset).collect(),
            visited: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn visited(&self) -> Vec<BarIndex> {
        self.visited.lock().expect("visit log").clone()
    }

    pub fn node(&self) -> ExprRef {
        Arc::new(self.clone())
    }
}

impl Expression for RecordingCondition {
    fn result_kind(&self) -> ResultKind {
        ResultKind::Boolean
    }

    fn is_key_dependent(&self) -> bool {
        true
    }

    fn compile_no_key(&self) -> Result<Compiled<()>, EvalError> {
        Err(EvalError::UnsupportedEvaluation {
            node: "recording".to_string(),
            key_model: series_expr::NoKey::NAME,
            hint: "use int key instead",
        })
    }

    fn compile_int(&self) -> Result<Compiled<BarIndex>, EvalError> {
        let true_bars = Arc::clone(&self.true_bars);
        let visited = Arc::clone(&self.visited);
        Ok(Compiled::Boolean(Box::new(move |bar| {
            visited.lock().expect("visit log").push(bar);
            true_bars.contains(&bar)
        })))
    }

    fn compile_date(&self) -> Result<Compiled<Timestamp>, EvalError> {
        Err(EvalError::UnsupportedEvaluation {
            node: "recording".to_string(),
            key_model: series_expr::DateKey::NAME,
            hint: "use int key instead",
        })
    }
}
