//! Function layer entry.
//!
//! Extension path (minimal touch points):
//! 1) write the kernel in `elem.rs` / `ts.rs` / `ts_stats.rs`, generic over `KeyModel`,
//! 2) add a row to `FUNCTION_SPECS` in `catalog.rs`,
//! 3) add evaluation tests for every key model the row supports.

use crate::compare::ComparisonOp;
use crate::error::{BuildError, EvalError};
use crate::expr::{Compiled, Evaluator, ExprRef, Expression};
use crate::key::{DateKey, IntKey, KeyModel, NoKey, PreviousKeyIndexer, PreviousKeys};
use crate::types::{BarIndex, ResultKind, Timestamp};
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, OnceLock};

/// Lowers one call to a closure for key model `M`.
pub type KernelFn<M> =
    for<'a> fn(&CallArgs<'a, M>) -> Result<Compiled<<M as KeyModel>::Key>, EvalError>;

/// Per key model kernel entries; a missing entry means the model is unsupported.
#[derive(Clone, Copy)]
pub struct Kernels {
    pub no_key: Option<KernelFn<NoKey>>,
    pub int: Option<KernelFn<IntKey>>,
    pub date: Option<KernelFn<DateKey>>,
}

impl Kernels {
    pub const fn all(
        no_key: KernelFn<NoKey>,
        int: KernelFn<IntKey>,
        date: KernelFn<DateKey>,
    ) -> Self {
        Self {
            no_key: Some(no_key),
            int: Some(int),
            date: Some(date),
        }
    }

    /// Int and date keys only.
    pub const fn keyed(int: KernelFn<IntKey>, date: KernelFn<DateKey>) -> Self {
        Self {
            no_key: None,
            int: Some(int),
            date: Some(date),
        }
    }
}

impl fmt::Debug for Kernels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Kernels")
            .field("no_key", &self.no_key.is_some())
            .field("int", &self.int.is_some())
            .field("date", &self.date.is_some())
            .finish()
    }
}

/// Arguments of one call as seen by a kernel for key model `M`.
pub struct CallArgs<'a, M: KeyModel> {
    function: &'a Function,
    args: &'a [ExprRef],
    model: PhantomData<M>,
}

impl<'a, M: KeyModel> CallArgs<'a, M> {
    fn new(function: &'a Function, args: &'a [ExprRef]) -> Self {
        Self {
            function,
            args,
            model: PhantomData,
        }
    }

    #[inline]
    pub fn function(&self) -> &'a Function {
        self.function
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.args.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    #[inline]
    pub fn node(&self, idx: usize) -> Option<&'a ExprRef> {
        self.args.get(idx)
    }

    /// Compiles argument `idx`; an omitted optional argument yields its default
    /// (NaN when the descriptor has none).
    pub fn compiled(&self, idx: usize) -> Result<Compiled<M::Key>, EvalError> {
        match self.args.get(idx) {
            Some(node) => M::compile(node.as_ref()),
            None => {
                let value = self
                    .function
                    .parameters()
                    .get(idx)
                    .and_then(Parameter::default_value)
                    .unwrap_or(f64::NAN);
                Ok(Compiled::Double(Box::new(move |_| value)))
            }
        }
    }

    pub fn double(&self, idx: usize) -> Result<Evaluator<M::Key, f64>, EvalError> {
        Ok(self.compiled(idx)?.into_double())
    }

    pub fn integer(&self, idx: usize) -> Result<Evaluator<M::Key, i32>, EvalError> {
        Ok(self.compiled(idx)?.into_integer())
    }

    pub fn boolean(&self, idx: usize) -> Result<Evaluator<M::Key, bool>, EvalError> {
        Ok(self.compiled(idx)?.into_boolean())
    }

    pub fn nullable(&self, idx: usize) -> Result<Evaluator<M::Key, Option<bool>>, EvalError> {
        Ok(self.compiled(idx)?.into_nullable())
    }

    /// Every argument from `start` on, for varargs parameters.
    pub fn doubles_from(&self, start: usize) -> Result<Vec<Evaluator<M::Key, f64>>, EvalError> {
        (start..self.args.len()).map(|idx| self.double(idx)).collect()
    }

    /// Argument `idx` split into comparison operands.
    pub fn binary(&self, idx: usize) -> Result<BinaryOperation, EvalError> {
        let name = self.function.expression_name();
        let node = self.args.get(idx).ok_or_else(|| BuildError::InvalidArity {
            name: name.to_string(),
            expected: self.function.arity().describe(),
            actual: self.args.len(),
        })?;
        let operation =
            BinaryOperation::decompose(node).map_err(|source| BuildError::InvalidArgumentShape {
                function: name.to_string(),
                index: idx,
                source,
            })?;
        Ok(operation)
    }

    pub fn previous_keys(&self) -> Result<Arc<dyn PreviousKeyIndexer<M::Key>>, EvalError> {
        self.function
            .previous_keys()
            .and_then(M::indexer)
            .ok_or_else(|| self.unsupported("function is not bound to previous keys of this model"))
    }

    pub fn unsupported(&self, hint: &'static str) -> EvalError {
        EvalError::UnsupportedEvaluation {
            node: self.function.expression_name().to_string(),
            key_model: M::NAME,
            hint,
        }
    }
}

/// A table row, optionally bound to previous-key context.
#[derive(Clone)]
pub struct Function {
    spec: &'static FunctionSpec,
    previous_keys: Option<PreviousKeys>,
    arity: OnceLock<Arity>,
}

impl Function {
    pub(crate) fn unbound(spec: &'static FunctionSpec) -> Self {
        Self {
            spec,
            previous_keys: None,
            arity: OnceLock::new(),
        }
    }

    pub(crate) fn bound(spec: &'static FunctionSpec, previous_keys: PreviousKeys) -> Self {
        Self {
            spec,
            previous_keys: Some(previous_keys),
            arity: OnceLock::new(),
        }
    }

    #[inline]
    pub fn spec(&self) -> &'static FunctionSpec {
        self.spec
    }

    #[inline]
    pub fn expression_name(&self) -> &'static str {
        self.spec.name
    }

    #[inline]
    pub fn display_name(&self) -> &'static str {
        self.spec.display_name
    }

    #[inline]
    pub fn description(&self) -> &'static str {
        self.spec.description
    }

    #[inline]
    pub fn result_kind(&self) -> ResultKind {
        self.spec.result
    }

    #[inline]
    pub fn operator(&self) -> Option<ComparisonOp> {
        self.spec.operator
    }

    #[inline]
    pub fn should_persist(&self) -> bool {
        self.spec.persist
    }

    #[inline]
    pub fn previous_keys(&self) -> Option<&PreviousKeys> {
        self.previous_keys.as_ref()
    }

    /// Derived from the parameter descriptors on first use.
    pub fn arity(&self) -> Arity {
        *self
            .arity
            .get_or_init(|| Arity::from_params(self.spec.params))
    }

    #[inline]
    pub fn parameters(&self) -> &'static [Parameter] {
        self.spec.params
    }

    #[inline]
    pub fn number_of_arguments(&self) -> usize {
        self.spec.params.len()
    }

    #[inline]
    pub fn number_of_arguments_min(&self) -> usize {
        self.arity().min
    }

    /// [`VAR_ARGS`] (-1) when unbounded.
    pub fn number_of_arguments_max(&self) -> isize {
        match self.arity().max {
            Some(max) => isize::try_from(max).unwrap_or(isize::MAX),
            None => VAR_ARGS,
        }
    }

    #[inline]
    pub fn is_var_args(&self) -> bool {
        self.arity().is_var_args()
    }

    pub fn parameter(&self, index: usize) -> Result<&'static Parameter, BuildError> {
        self.spec
            .params
            .get(index)
            .ok_or_else(|| BuildError::IndexOutOfRange {
                function: self.spec.name.to_string(),
                index,
                len: self.spec.params.len(),
            })
    }

    /// True when, with these arguments, the result is the same for every key.
    pub fn is_natural(&self, args: &[ExprRef]) -> bool {
        self.spec.natural && args.iter().all(|arg| arg.is_constant())
    }

    /// Arity and argument-shape checks; run once when a call is built.
    pub fn validate(&self, args: &[ExprRef]) -> Result<(), BuildError> {
        self.arity().check(self.spec.name, args.len())?;
        if let ArgShape::BinaryComparison { index } = self.spec.shape {
            if let Some(node) = args.get(index) {
                BinaryOperation::decompose(node).map_err(|source| {
                    BuildError::InvalidArgumentShape {
                        function: self.spec.name.to_string(),
                        index,
                        source,
                    }
                })?;
            }
        }
        Ok(())
    }

    pub fn call(&self, args: Vec<ExprRef>) -> Result<ExprRef, BuildError> {
        self.validate(&args)?;
        let key_dependent = !self.is_natural(&args);
        log::trace!(
            "built call `{}` with {} args (key_dependent={key_dependent})",
            self.spec.name,
            args.len()
        );
        Ok(Arc::new(CallNode {
            function: self.clone(),
            args,
            key_dependent,
        }))
    }

    pub fn compile<M: KeyModel>(&self, args: &[ExprRef]) -> Result<Compiled<M::Key>, EvalError> {
        let Some(kernel) = M::kernel(&self.spec.kernels) else {
            return Err(EvalError::UnsupportedEvaluation {
                node: self.spec.name.to_string(),
                key_model: M::NAME,
                hint: if self.spec.needs_previous_keys() {
                    "historical functions need an int or date key"
                } else {
                    "use time or int key instead"
                },
            });
        };
        let compiled = kernel(&CallArgs::new(self, args))?;
        Ok(compiled.into_kind(self.spec.result))
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.spec.name)
            .field("previous_keys", &self.previous_keys)
            .finish()
    }
}

/// Creates historical functions bound to a previous-key context.
#[derive(Debug, Clone, Copy)]
pub struct FunctionFactory {
    spec: &'static FunctionSpec,
}

impl FunctionFactory {
    pub(crate) const fn new(spec: &'static FunctionSpec) -> Self {
        Self { spec }
    }

    #[inline]
    pub fn expression_name(&self) -> &'static str {
        self.spec.name
    }

    #[inline]
    pub fn spec(&self) -> &'static FunctionSpec {
        self.spec
    }

    /// `None` when no context is given: the function is not applicable
    /// outside a time series.
    pub fn new_function(&self, previous_keys: Option<PreviousKeys>) -> Option<Function> {
        previous_keys.map(|keys| Function::bound(self.spec, keys))
    }
}

/// A function applied to concrete argument nodes.
#[derive(Debug)]
pub struct CallNode {
    function: Function,
    args: Vec<ExprRef>,
    key_dependent: bool,
}

impl CallNode {
    #[inline]
    pub fn function(&self) -> &Function {
        &self.function
    }

    /// Same function over replacement arguments, re-validated.
    pub fn with_args(&self, args: Vec<ExprRef>) -> Result<ExprRef, BuildError> {
        self.function.call(args)
    }
}

impl Expression for CallNode {
    fn result_kind(&self) -> ResultKind {
        self.function.result_kind()
    }

    fn is_key_dependent(&self) -> bool {
        self.key_dependent
    }

    fn args(&self) -> &[ExprRef] {
        &self.args
    }

    fn as_call(&self) -> Option<&CallNode> {
        Some(self)
    }

    fn compile_no_key(&self) -> Result<Compiled<()>, EvalError> {
        self.function.compile::<NoKey>(&self.args)
    }

    fn compile_int(&self) -> Result<Compiled<BarIndex>, EvalError> {
        self.function.compile::<IntKey>(&self.args)
    }

    fn compile_date(&self) -> Result<Compiled<Timestamp>, EvalError> {
        self.function.compile::<DateKey>(&self.args)
    }
}

pub mod arg_spec;
pub mod binary;
pub mod catalog;
pub mod spec;
pub mod stats;

mod elem;
mod ts;
mod ts_stats;

pub use arg_spec::{Arity, VAR_ARGS};
pub use binary::BinaryOperation;
pub use catalog::FunctionRegistry;
pub use spec::{ArgShape, Domain, FunctionSpec, ParamMode, Parameter};
pub use stats::{Estimator, RunningPercentile, RunningVariance, WindowProduct, WindowSum};
pub use ts::{
    chained_index_of, first_index_of, last_index_of, window_len, ChainMode, NOT_FOUND,
};
