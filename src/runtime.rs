use crate::compile::{CompileManifest, Compiler};
use crate::error::EvalError;
use crate::expr::{Compiled, ExprRef};
use crate::key::KeyModel;
use crate::series::KeyProvider;
use crate::types::{CompileOptions, ResultKind};

/// Values produced by one walk, one per provided key.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutput<T> {
    pub values: Vec<T>,
    pub manifest: Option<CompileManifest>,
}

/// Compiles a root once, then evaluates it at every key a provider yields.
#[derive(Debug, Clone, Default)]
pub struct SeriesRunner {
    compiler: Compiler,
}

impl SeriesRunner {
    pub fn new(options: CompileOptions) -> Self {
        Self {
            compiler: Compiler::new(options),
        }
    }

    #[inline]
    pub fn compiler(&self) -> &Compiler {
        &self.compiler
    }

    pub fn run<M: KeyModel>(
        &self,
        root: &ExprRef,
        keys: &dyn KeyProvider<M::Key>,
    ) -> Result<RunOutput<f64>, EvalError> {
        let (compiled, manifest) = self.compiler.compile::<M>(root, ResultKind::Double)?;
        let values = walk(keys, compiled.into_double());
        log::debug!("walked {} keys with {}", values.len(), M::NAME);
        Ok(RunOutput { values, manifest })
    }

    /// Three-valued walk; unknown stays `None`.
    pub fn run_nullable<M: KeyModel>(
        &self,
        root: &ExprRef,
        keys: &dyn KeyProvider<M::Key>,
    ) -> Result<RunOutput<Option<bool>>, EvalError> {
        let (compiled, manifest) = self
            .compiler
            .compile::<M>(root, ResultKind::BooleanNullable)?;
        let values = walk(keys, compiled.into_nullable());
        log::debug!("walked {} keys with {}", values.len(), M::NAME);
        Ok(RunOutput { values, manifest })
    }

    /// Native-kind evaluator for callers that drive the walk themselves.
    pub fn prepare<M: KeyModel>(
        &self,
        root: &ExprRef,
        kind: ResultKind,
    ) -> Result<Compiled<M::Key>, EvalError> {
        Ok(self.compiler.compile::<M>(root, kind)?.0)
    }
}

fn walk<K, T>(keys: &dyn KeyProvider<K>, evaluator: impl Fn(K) -> T) -> Vec<T> {
    (0..keys.key_count())
        .filter_map(|idx| keys.key_at(idx))
        .map(evaluator)
        .collect()
}
