pub mod compare;
pub mod compile;
pub mod error;
pub mod expr;
pub mod key;
pub mod ops;
pub mod runtime;
pub mod series;
pub mod types;

pub use compare::{ComparisonMode, ComparisonOp};
pub use compile::{fold_constants, CompileManifest, Compiler};
pub use error::{BuildError, EvalError, ShapeError};
pub use expr::{Compiled, Evaluator, ExprRef, Expression, Literal};
pub use key::{
    CalendarIndexer, DateKey, IntIndexer, IntKey, IntervalIndexer, KeyModel, NoKey,
    PreviousKeyIndexer, PreviousKeys,
};
pub use ops::{BinaryOperation, CallNode, Function, FunctionFactory, FunctionRegistry};
pub use runtime::{RunOutput, SeriesRunner};
pub use series::{KeyProvider, ValueSeries};
pub use types::{BarIndex, CompileOptions, ResultKind, Timestamp};

#[cfg(test)]
mod tests;
