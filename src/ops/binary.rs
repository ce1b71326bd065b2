use crate::compare::ComparisonOp;
use crate::error::ShapeError;
use crate::expr::{ExprRef, Expression};
use std::sync::Arc;

/// A comparison call split into its operands.
#[derive(Debug, Clone)]
pub struct BinaryOperation {
    left: ExprRef,
    right: ExprRef,
    operator: ComparisonOp,
}

impl BinaryOperation {
    /// Fails unless `node` is a two-argument comparison call yielding a boolean kind.
    pub fn decompose(node: &ExprRef) -> Result<Self, ShapeError> {
        let call = node.as_call().ok_or(ShapeError::NotACall)?;
        let function = call.function();
        let name = function.expression_name();
        let operator = function
            .operator()
            .ok_or_else(|| ShapeError::NotAComparison {
                name: name.to_string(),
            })?;
        let [left, right] = call.args() else {
            return Err(ShapeError::NonBinaryArity {
                name: name.to_string(),
                arity: call.args().len(),
            });
        };
        let kind = node.result_kind();
        if !kind.is_boolean() {
            return Err(ShapeError::WrongResultKind {
                name: name.to_string(),
                kind,
            });
        }
        Ok(Self {
            left: Arc::clone(left),
            right: Arc::clone(right),
            operator,
        })
    }

    #[inline]
    pub fn left(&self) -> &ExprRef {
        &self.left
    }

    #[inline]
    pub fn right(&self) -> &ExprRef {
        &self.right
    }

    #[inline]
    pub fn operator(&self) -> ComparisonOp {
        self.operator
    }

    /// Unknown (NaN operand) counts as false.
    #[inline]
    pub fn apply_boolean(&self, left: f64, right: f64) -> bool {
        self.operator.apply_boolean(left, right)
    }
}
