//! Expression node contract and compiled evaluators.
//!
//! A node is lowered once per key model into a closure tree; afterwards the
//! closure is called once per key with no dispatch on node type.

use crate::error::EvalError;
use crate::key::KeyModel;
use crate::ops::CallNode;
use crate::types::{BarIndex, ResultKind, Timestamp};
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Closure bound to a subtree, invoked once per key.
pub type Evaluator<K, T> = Box<dyn Fn(K) -> T>;

pub type ExprRef = Arc<dyn Expression>;

pub trait Expression: fmt::Debug + Send + Sync {
    fn result_kind(&self) -> ResultKind;

    /// Whether the value may differ between keys.
    fn is_key_dependent(&self) -> bool;

    #[inline]
    fn is_constant(&self) -> bool {
        !self.is_key_dependent()
    }

    fn args(&self) -> &[ExprRef] {
        &[]
    }

    fn as_call(&self) -> Option<&CallNode> {
        None
    }

    fn compile_no_key(&self) -> Result<Compiled<()>, EvalError>;
    fn compile_int(&self) -> Result<Compiled<BarIndex>, EvalError>;
    fn compile_date(&self) -> Result<Compiled<Timestamp>, EvalError>;
}

/// A compiled node in its native result kind.
pub enum Compiled<K> {
    Double(Evaluator<K, f64>),
    Integer(Evaluator<K, i32>),
    Boolean(Evaluator<K, bool>),
    Nullable(Evaluator<K, Option<bool>>),
}

impl<K: Copy + 'static> Compiled<K> {
    #[inline]
    pub fn kind(&self) -> ResultKind {
        match self {
            Self::Double(_) => ResultKind::Double,
            Self::Integer(_) => ResultKind::Integer,
            Self::Boolean(_) => ResultKind::Boolean,
            Self::Nullable(_) => ResultKind::BooleanNullable,
        }
    }

    pub fn into_kind(self, kind: ResultKind) -> Self {
        if self.kind() == kind {
            return self;
        }
        match kind {
            ResultKind::Double => Self::Double(self.into_double()),
            ResultKind::Integer => Self::Integer(self.into_integer()),
            ResultKind::Boolean => Self::Boolean(self.into_boolean()),
            ResultKind::BooleanNullable => Self::Nullable(self.into_nullable()),
        }
    }

    /// Booleans map to 1.0/0.0, unknown to NaN.
    pub fn into_double(self) -> Evaluator<K, f64> {
        match self {
            Self::Double(f) => f,
            Self::Integer(f) => Box::new(move |key| f64::from(f(key))),
            Self::Boolean(f) => Box::new(move |key| bool_to_double(f(key))),
            Self::Nullable(f) => Box::new(move |key| match f(key) {
                Some(v) => bool_to_double(v),
                None => f64::NAN,
            }),
        }
    }

    /// NaN truncates to 0.
    pub fn into_integer(self) -> Evaluator<K, i32> {
        match self {
            Self::Integer(f) => f,
            Self::Double(f) => Box::new(move |key| f(key) as i32),
            Self::Boolean(f) => Box::new(move |key| i32::from(f(key))),
            Self::Nullable(f) => Box::new(move |key| i32::from(f(key).unwrap_or(false))),
        }
    }

    /// NaN, zero and unknown are all `false`.
    pub fn into_boolean(self) -> Evaluator<K, bool> {
        match self {
            Self::Boolean(f) => f,
            Self::Double(f) => Box::new(move |key| double_to_bool(f(key)).unwrap_or(false)),
            Self::Integer(f) => Box::new(move |key| f(key) != 0),
            Self::Nullable(f) => Box::new(move |key| f(key).unwrap_or(false)),
        }
    }

    /// NaN becomes unknown.
    pub fn into_nullable(self) -> Evaluator<K, Option<bool>> {
        match self {
            Self::Nullable(f) => f,
            Self::Double(f) => Box::new(move |key| double_to_bool(f(key))),
            Self::Integer(f) => Box::new(move |key| Some(f(key) != 0)),
            Self::Boolean(f) => Box::new(move |key| Some(f(key))),
        }
    }
}

impl<K> fmt::Debug for Compiled<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::Double(_) => "Double",
            Self::Integer(_) => "Integer",
            Self::Boolean(_) => "Boolean",
            Self::Nullable(_) => "Nullable",
        };
        write!(f, "Compiled::{kind}")
    }
}

#[inline]
pub(crate) fn bool_to_double(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

#[inline]
pub(crate) fn double_to_bool(value: f64) -> Option<bool> {
    if value.is_nan() {
        None
    } else {
        Some(value != 0.0)
    }
}

/// Compiles `node` for model `M`, coerced to `kind`.
pub fn compile<M: KeyModel>(
    node: &dyn Expression,
    kind: ResultKind,
) -> Result<Compiled<M::Key>, EvalError> {
    Ok(M::compile(node)?.into_kind(kind))
}

pub fn compile_double<M: KeyModel>(
    node: &dyn Expression,
) -> Result<Evaluator<M::Key, f64>, EvalError> {
    Ok(M::compile(node)?.into_double())
}

pub fn compile_integer<M: KeyModel>(
    node: &dyn Expression,
) -> Result<Evaluator<M::Key, i32>, EvalError> {
    Ok(M::compile(node)?.into_integer())
}

pub fn compile_boolean<M: KeyModel>(
    node: &dyn Expression,
) -> Result<Evaluator<M::Key, bool>, EvalError> {
    Ok(M::compile(node)?.into_boolean())
}

pub fn compile_nullable<M: KeyModel>(
    node: &dyn Expression,
) -> Result<Evaluator<M::Key, Option<bool>>, EvalError> {
    Ok(M::compile(node)?.into_nullable())
}

/// One-off evaluation at a single key. Walks should compile once instead.
pub fn eval_double<M: KeyModel>(node: &dyn Expression, key: M::Key) -> Result<f64, EvalError> {
    Ok(compile_double::<M>(node)?(key))
}

pub fn eval_nullable<M: KeyModel>(
    node: &dyn Expression,
    key: M::Key,
) -> Result<Option<bool>, EvalError> {
    Ok(compile_nullable::<M>(node)?(key))
}

/// Key-invariant constant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Literal {
    Double(f64),
    Integer(i32),
    Boolean(bool),
    Null,
}

static TRUE: OnceLock<ExprRef> = OnceLock::new();
static FALSE: OnceLock<ExprRef> = OnceLock::new();
static NULL: OnceLock<ExprRef> = OnceLock::new();

impl Literal {
    pub fn double(value: f64) -> ExprRef {
        Arc::new(Self::Double(value))
    }

    pub fn integer(value: i32) -> ExprRef {
        Arc::new(Self::Integer(value))
    }

    /// Boolean and null literals are interned.
    pub fn boolean(value: bool) -> ExprRef {
        let slot = if value { &TRUE } else { &FALSE };
        Arc::clone(slot.get_or_init(|| -> ExprRef { Arc::new(Self::Boolean(value)) }))
    }

    pub fn null() -> ExprRef {
        Arc::clone(NULL.get_or_init(|| -> ExprRef { Arc::new(Self::Null) }))
    }

    pub fn into_node(self) -> ExprRef {
        match self {
            Self::Boolean(value) => Self::boolean(value),
            Self::Null => Self::null(),
            other => {
                let node: ExprRef = Arc::new(other);
                node
            }
        }
    }

    fn compiled<K: Copy + 'static>(self) -> Compiled<K> {
        match self {
            Self::Double(v) => Compiled::Double(Box::new(move |_| v)),
            Self::Integer(v) => Compiled::Integer(Box::new(move |_| v)),
            Self::Boolean(v) => Compiled::Boolean(Box::new(move |_| v)),
            Self::Null => Compiled::Nullable(Box::new(|_| None)),
        }
    }
}

impl Expression for Literal {
    fn result_kind(&self) -> ResultKind {
        match self {
            Self::Double(_) => ResultKind::Double,
            Self::Integer(_) => ResultKind::Integer,
            Self::Boolean(_) => ResultKind::Boolean,
            Self::Null => ResultKind::BooleanNullable,
        }
    }

    fn is_key_dependent(&self) -> bool {
        false
    }

    fn compile_no_key(&self) -> Result<Compiled<()>, EvalError> {
        Ok(self.compiled())
    }

    fn compile_int(&self) -> Result<Compiled<BarIndex>, EvalError> {
        Ok(self.compiled())
    }

    fn compile_date(&self) -> Result<Compiled<Timestamp>, EvalError> {
        Ok(self.compiled())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{IntKey, NoKey};

    #[test]
    fn boolean_literals_are_interned() {
        assert!(Arc::ptr_eq(&Literal::boolean(true), &Literal::boolean(true)));
        assert!(!Arc::ptr_eq(&Literal::boolean(true), &Literal::boolean(false)));
        assert!(Arc::ptr_eq(&Literal::null(), &Literal::Null.into_node()));
    }

    #[test]
    fn double_coerces_to_boolean_kinds() {
        let nan = Literal::double(f64::NAN);
        assert_eq!(eval_nullable::<NoKey>(nan.as_ref(), ()).expect("eval"), None);
        let boolean = compile_boolean::<NoKey>(nan.as_ref()).expect("compile");
        assert!(!boolean(()));

        let two = Literal::double(2.0);
        assert_eq!(eval_nullable::<IntKey>(two.as_ref(), 7).expect("eval"), Some(true));
        let zero = compile_boolean::<IntKey>(Literal::double(0.0).as_ref()).expect("compile");
        assert!(!zero(3));
    }

    #[test]
    fn boolean_kinds_coerce_to_double() {
        let t = compile_double::<NoKey>(Literal::boolean(true).as_ref()).expect("compile");
        assert_eq!(t(()), 1.0);
        let null = compile_double::<NoKey>(Literal::null().as_ref()).expect("compile");
        assert!(null(()).is_nan());
        let int = compile_double::<NoKey>(Literal::integer(-4).as_ref()).expect("compile");
        assert_eq!(int(()), -4.0);
    }

    #[test]
    fn into_kind_keeps_native_kind_and_converts_others() {
        let compiled = Literal::Double(f64::NAN).compiled::<()>();
        let integer = compiled.into_kind(ResultKind::Integer);
        assert_eq!(integer.kind(), ResultKind::Integer);
        let Compiled::Integer(f) = integer else {
            panic!("expected integer evaluator");
        };
        assert_eq!(f(()), 0);
    }
}
