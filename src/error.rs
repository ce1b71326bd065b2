use crate::types::ResultKind;
use thiserror::Error;

/// Why a node could not be read as a binary comparison.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("node is not a function call")]
    NotACall,
    #[error("`{name}` is not a comparison operator")]
    NotAComparison { name: String },
    #[error("comparison `{name}` has {arity} operands, expected 2")]
    NonBinaryArity { name: String, arity: usize },
    #[error("comparison `{name}` yields {kind:?}, expected a boolean kind")]
    WrongResultKind { name: String, kind: ResultKind },
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("unknown function `{name}`")]
    UnknownFunction { name: String },
    #[error("function `{name}` requires {expected} args, got {actual}")]
    InvalidArity {
        name: String,
        expected: String,
        actual: usize,
    },
    #[error("argument {index} of `{function}` must be a binary comparison: {source}")]
    InvalidArgumentShape {
        function: String,
        index: usize,
        #[source]
        source: ShapeError,
    },
    #[error("parameter index {index} out of range for `{function}` with {len} parameters")]
    IndexOutOfRange {
        function: String,
        index: usize,
        len: usize,
    },
}

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("`{node}` cannot be evaluated with {key_model}: {hint}")]
    UnsupportedEvaluation {
        node: String,
        key_model: &'static str,
        hint: &'static str,
    },
    #[error(transparent)]
    Build(#[from] BuildError),
}
