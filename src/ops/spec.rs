use crate::compare::ComparisonOp;
use crate::ops::Kernels;
use crate::types::ResultKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    /// Value depends only on the arguments at the current key.
    Elem,
    /// Value walks back through previous keys.
    Ts,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamMode {
    Required,
    /// May be omitted; `default` is substituted when present.
    Optional { default: Option<f64> },
    /// Zero or more trailing arguments.
    VarArgs,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parameter {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: ResultKind,
    pub mode: ParamMode,
}

impl Parameter {
    pub const fn required(name: &'static str, kind: ResultKind, description: &'static str) -> Self {
        Self {
            name,
            description,
            kind,
            mode: ParamMode::Required,
        }
    }

    pub const fn optional(
        name: &'static str,
        kind: ResultKind,
        default: f64,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            description,
            kind,
            mode: ParamMode::Optional {
                default: Some(default),
            },
        }
    }

    pub const fn varargs(name: &'static str, kind: ResultKind, description: &'static str) -> Self {
        Self {
            name,
            description,
            kind,
            mode: ParamMode::VarArgs,
        }
    }

    #[inline]
    pub const fn is_required(&self) -> bool {
        matches!(self.mode, ParamMode::Required)
    }

    #[inline]
    pub const fn is_var_args(&self) -> bool {
        matches!(self.mode, ParamMode::VarArgs)
    }

    #[inline]
    pub const fn default_value(&self) -> Option<f64> {
        match self.mode {
            ParamMode::Optional { default } => default,
            _ => None,
        }
    }
}

/// Structural requirement checked once when a call is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgShape {
    Any,
    /// Argument `index` must decompose into a binary comparison.
    BinaryComparison { index: usize },
}

/// One row of the function table.
#[derive(Debug, Clone, Copy)]
pub struct FunctionSpec {
    /// Identifier used in expression text.
    pub name: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
    pub domain: Domain,
    pub params: &'static [Parameter],
    pub result: ResultKind,
    /// Key-invariant whenever every argument is constant.
    pub natural: bool,
    /// Whether results form a durable series rather than a derived view.
    pub persist: bool,
    /// Set for comparison operators; enables binary decomposition.
    pub operator: Option<ComparisonOp>,
    pub shape: ArgShape,
    pub kernels: Kernels,
}

impl FunctionSpec {
    #[inline]
    pub const fn needs_previous_keys(&self) -> bool {
        matches!(self.domain, Domain::Ts)
    }
}
