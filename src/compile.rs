use crate::error::EvalError;
use crate::expr::{self, Compiled, ExprRef, Expression, Literal};
use crate::key::{KeyModel, NoKey};
use crate::ops::{ArgShape, CallNode};
use crate::types::{CompileOptions, ResultKind};
use std::sync::Arc;
use std::time::Instant;

/// What one root compile did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileManifest {
    pub key_model: &'static str,
    pub result_kind: ResultKind,
    /// Nodes in the tree that was lowered, after folding.
    pub node_count: usize,
    pub call_count: usize,
    /// Calls replaced by literals before lowering.
    pub folded_count: usize,
    /// End-to-end compile latency in microseconds.
    pub compile_time_us: u64,
}

impl CompileManifest {
    #[inline]
    pub fn summary_line(&self) -> String {
        format!(
            "key_model={} kind={:?} nodes={} calls={} folded={} compile_us={}",
            self.key_model,
            self.result_kind,
            self.node_count,
            self.call_count,
            self.folded_count,
            self.compile_time_us
        )
    }
}

/// Lowers expression roots to evaluators under one set of options.
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    options: CompileOptions,
}

impl Compiler {
    pub fn new(options: CompileOptions) -> Self {
        Self { options }
    }

    #[inline]
    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Compiles `root` for key model `M`, coerced to `kind`. The manifest is
    /// present when the options ask for one.
    pub fn compile<M: KeyModel>(
        &self,
        root: &ExprRef,
        kind: ResultKind,
    ) -> Result<(Compiled<M::Key>, Option<CompileManifest>), EvalError> {
        let started_at = Instant::now();
        let (root, folded_count) = if self.options.fold_constants {
            fold_constants(root)?
        } else {
            (Arc::clone(root), 0)
        };
        let compiled = expr::compile::<M>(root.as_ref(), kind)?;
        if !self.options.collect_manifest {
            return Ok((compiled, None));
        }
        let (node_count, call_count) = count_nodes(&root);
        let manifest = CompileManifest {
            key_model: M::NAME,
            result_kind: kind,
            node_count,
            call_count,
            folded_count,
            compile_time_us: started_at.elapsed().as_micros() as u64,
        };
        log::debug!("[series_expr::compile] {}", manifest.summary_line());
        Ok((compiled, Some(manifest)))
    }
}

/// Replaces every natural call whose arguments are all constant with the
/// literal it evaluates to. Returns the new root and the number of folds.
///
/// An argument that must stay a comparison call keeps its call node; only its
/// operands are folded.
pub fn fold_constants(node: &ExprRef) -> Result<(ExprRef, usize), EvalError> {
    let Some(call) = node.as_call() else {
        return Ok((Arc::clone(node), 0));
    };
    let (node, folded) = fold_args(node, call)?;

    let natural = node
        .as_call()
        .is_some_and(|call| call.function().is_natural(call.args()));
    if !natural {
        return Ok((node, folded));
    }
    match evaluate_constant(&node) {
        Ok(literal) => {
            log::trace!(
                "folded `{}` to {literal:?}",
                call.function().expression_name()
            );
            Ok((literal.into_node(), folded + 1))
        }
        Err(err) => {
            log::debug!("constant fold skipped: {err}");
            Ok((node, folded))
        }
    }
}

fn fold_args(node: &ExprRef, call: &CallNode) -> Result<(ExprRef, usize), EvalError> {
    let pinned = match call.function().spec().shape {
        ArgShape::BinaryComparison { index } => Some(index),
        ArgShape::Any => None,
    };
    let mut folded = 0;
    let mut changed = false;
    let mut args = Vec::with_capacity(call.args().len());
    for (idx, arg) in call.args().iter().enumerate() {
        let (new_arg, count) = match arg.as_call() {
            Some(inner) if pinned == Some(idx) => fold_args(arg, inner)?,
            _ => fold_constants(arg)?,
        };
        changed |= !Arc::ptr_eq(arg, &new_arg);
        folded += count;
        args.push(new_arg);
    }
    if changed {
        Ok((call.with_args(args)?, folded))
    } else {
        Ok((Arc::clone(node), folded))
    }
}

fn evaluate_constant(node: &ExprRef) -> Result<Literal, EvalError> {
    let literal = match expr::compile::<NoKey>(node.as_ref(), node.result_kind())? {
        Compiled::Double(f) => Literal::Double(f(())),
        Compiled::Integer(f) => Literal::Integer(f(())),
        Compiled::Boolean(f) => Literal::Boolean(f(())),
        Compiled::Nullable(f) => match f(()) {
            Some(value) => Literal::Boolean(value),
            None => Literal::Null,
        },
    };
    Ok(literal)
}

/// `(nodes, calls)` reachable from `root`; shared subtrees count once per use.
fn count_nodes(root: &ExprRef) -> (usize, usize) {
    let mut nodes = 0;
    let mut calls = 0;
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        nodes += 1;
        if node.as_call().is_some() {
            calls += 1;
        }
        stack.extend(node.args());
    }
    (nodes, calls)
}
