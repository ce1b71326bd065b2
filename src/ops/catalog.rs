use crate::compare::ComparisonOp;
use crate::error::BuildError;
use crate::key::{DateKey, IntKey, NoKey, PreviousKeys};
use crate::ops::arg_spec::validate_parameters;
use crate::ops::spec::{ArgShape, Domain, FunctionSpec, Parameter};
use crate::ops::{elem, ts, ts_stats, Function, FunctionFactory, Kernels};
use crate::types::ResultKind;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Kernels for every key model from one generic kernel.
macro_rules! all_models {
    ($($seg:ident)::+) => {
        Kernels::all(
            $($seg)::+::<NoKey>,
            $($seg)::+::<IntKey>,
            $($seg)::+::<DateKey>,
        )
    };
}

/// Kernels for the int and date key models only.
macro_rules! keyed_models {
    ($($seg:ident)::+) => {
        Kernels::keyed($($seg)::+::<IntKey>, $($seg)::+::<DateKey>)
    };
}

pub struct FunctionRegistry;

impl FunctionRegistry {
    pub fn get(name: &str) -> Option<&'static FunctionSpec> {
        let index = REGISTRY_INDEX.get_or_init(build_registry_index);
        index.by_name.get(name).map(|idx| &FUNCTION_SPECS[*idx])
    }

    /// Key-invariant-domain functions; historical ones go through [`Self::factory`].
    pub fn function(name: &str) -> Option<Function> {
        Self::get(name)
            .filter(|spec| !spec.needs_previous_keys())
            .map(Function::unbound)
    }

    pub fn factory(name: &str) -> Option<FunctionFactory> {
        Self::get(name)
            .filter(|spec| spec.needs_previous_keys())
            .map(FunctionFactory::new)
    }

    /// Resolves `name` for a caller that may or may not have series context.
    ///
    /// `Ok(None)` means the function exists but is not applicable without
    /// previous keys.
    pub fn resolve(
        name: &str,
        previous_keys: Option<PreviousKeys>,
    ) -> Result<Option<Function>, BuildError> {
        let spec = Self::get(name).ok_or_else(|| BuildError::UnknownFunction {
            name: name.to_string(),
        })?;
        if spec.needs_previous_keys() {
            Ok(FunctionFactory::new(spec).new_function(previous_keys))
        } else {
            Ok(Some(Function::unbound(spec)))
        }
    }

    pub fn iter() -> impl Iterator<Item = &'static FunctionSpec> {
        FUNCTION_SPECS.iter()
    }

    pub fn names() -> impl Iterator<Item = &'static str> {
        FUNCTION_SPECS.iter().map(|spec| spec.name)
    }
}

struct RegistryIndex {
    by_name: HashMap<&'static str, usize>,
}

static REGISTRY_INDEX: OnceLock<RegistryIndex> = OnceLock::new();

fn build_registry_index() -> RegistryIndex {
    let mut by_name = HashMap::with_capacity(FUNCTION_SPECS.len());
    for (idx, spec) in FUNCTION_SPECS.iter().enumerate() {
        validate_spec(spec);
        if by_name.insert(spec.name, idx).is_some() {
            panic!("duplicate function name in registry: {}", spec.name);
        }
    }
    log::trace!("function registry indexed {} rows", by_name.len());
    RegistryIndex { by_name }
}

fn validate_spec(spec: &FunctionSpec) {
    if let Err(reason) = validate_parameters(spec.params) {
        panic!("function `{}` has invalid parameters: {reason}", spec.name);
    }
    if spec.natural && spec.kernels.no_key.is_none() {
        panic!(
            "function `{}` is natural but has no key-less kernel",
            spec.name
        );
    }
    if spec.needs_previous_keys() && spec.kernels.no_key.is_some() {
        panic!(
            "historical function `{}` must not provide a key-less kernel",
            spec.name
        );
    }
    if spec.needs_previous_keys() && (spec.natural || spec.persist) {
        panic!(
            "historical function `{}` must be non-natural and non-persistent",
            spec.name
        );
    }
    if spec.operator.is_some() && (spec.params.len() != 2 || !spec.result.is_boolean()) {
        panic!(
            "comparison `{}` must take two operands and yield a boolean kind",
            spec.name
        );
    }
    if let ArgShape::BinaryComparison { index } = spec.shape {
        if index >= spec.params.len() {
            panic!(
                "function `{}` checks argument {index} but has {} parameters",
                spec.name,
                spec.params.len()
            );
        }
    }
}

const X: Parameter = Parameter::required("x", ResultKind::Double, "operand");
const LEFT: Parameter = Parameter::required("left", ResultKind::Double, "left operand");
const RIGHT: Parameter = Parameter::required("right", ResultKind::Double, "right operand");
const REST: Parameter = Parameter::varargs("rest", ResultKind::Double, "further operands");
const LOGIC_X: Parameter = Parameter::required("x", ResultKind::BooleanNullable, "operand");
const LOGIC_LEFT: Parameter =
    Parameter::required("left", ResultKind::BooleanNullable, "left operand");
const LOGIC_RIGHT: Parameter =
    Parameter::required("right", ResultKind::BooleanNullable, "right operand");
const CONDITION: Parameter =
    Parameter::required("condition", ResultKind::Boolean, "tested at each key");
const COMPARISON: Parameter = Parameter::required(
    "condition",
    ResultKind::Boolean,
    "binary comparison, one side swept",
);
const COUNT: Parameter = Parameter::required("count", ResultKind::Double, "window length");
const LOOKBACK: Parameter = Parameter::required("lookback", ResultKind::Double, "keys to scan");
const STEPS: Parameter =
    Parameter::optional("steps", ResultKind::Double, 1.0, "chained scans");
const VALUE: Parameter = Parameter::required("value", ResultKind::Double, "sampled value");
const OFFSET: Parameter =
    Parameter::optional("offset", ResultKind::Double, 1.0, "keys back");
const QUANTILE: Parameter =
    Parameter::required("quantile", ResultKind::Double, "in [0, 1], clamped");

const UNARY: &[Parameter] = &[X];
const BINARY: &[Parameter] = &[LEFT, RIGHT];
const VARIADIC: &[Parameter] = &[X, REST];
const IF_ARGS: &[Parameter] = &[
    Parameter::required("condition", ResultKind::Boolean, "branch selector"),
    Parameter::required("then", ResultKind::Double, "value when true"),
    Parameter::required("else", ResultKind::Double, "value otherwise"),
];
const LOGIC_UNARY: &[Parameter] = &[LOGIC_X];
const LOGIC_BINARY: &[Parameter] = &[LOGIC_LEFT, LOGIC_RIGHT];
const EDGE_ARGS: &[Parameter] = &[CONDITION];
const QUANTIFIER_ARGS: &[Parameter] = &[COUNT, CONDITION];
const SWEPT_ARGS: &[Parameter] = &[COUNT, COMPARISON];
const INDEX_ARGS: &[Parameter] = &[CONDITION, LOOKBACK];
const CHAINED_ARGS: &[Parameter] = &[CONDITION, LOOKBACK, STEPS];
const LAG_ARGS: &[Parameter] = &[VALUE, OFFSET];
const WINDOW_ARGS: &[Parameter] = &[COUNT, VALUE];
const PERCENTILE_ARGS: &[Parameter] = &[COUNT, VALUE, QUANTILE];

const fn elem_row(
    name: &'static str,
    display_name: &'static str,
    description: &'static str,
    params: &'static [Parameter],
    result: ResultKind,
    kernels: Kernels,
) -> FunctionSpec {
    FunctionSpec {
        name,
        display_name,
        description,
        domain: Domain::Elem,
        params,
        result,
        natural: true,
        persist: true,
        operator: None,
        shape: ArgShape::Any,
        kernels,
    }
}

const fn comparison_row(
    name: &'static str,
    display_name: &'static str,
    operator: ComparisonOp,
) -> FunctionSpec {
    FunctionSpec {
        name,
        display_name,
        description: "nullable comparison; unknown when either side is NaN",
        domain: Domain::Elem,
        params: BINARY,
        result: ResultKind::BooleanNullable,
        natural: true,
        persist: true,
        operator: Some(operator),
        shape: ArgShape::Any,
        kernels: all_models!(elem::comparison),
    }
}

const fn history_row(
    name: &'static str,
    display_name: &'static str,
    description: &'static str,
    params: &'static [Parameter],
    result: ResultKind,
    kernels: Kernels,
) -> FunctionSpec {
    FunctionSpec {
        name,
        display_name,
        description,
        domain: Domain::Ts,
        params,
        result,
        natural: false,
        persist: false,
        operator: None,
        shape: ArgShape::Any,
        kernels,
    }
}

const fn swept_row(
    name: &'static str,
    display_name: &'static str,
    description: &'static str,
    kernels: Kernels,
) -> FunctionSpec {
    let mut spec = history_row(
        name,
        display_name,
        description,
        SWEPT_ARGS,
        ResultKind::Boolean,
        kernels,
    );
    spec.shape = ArgShape::BinaryComparison { index: 1 };
    spec
}

static FUNCTION_SPECS: [FunctionSpec; 44] = [
    elem_row("add", "Add", "left + right", BINARY, ResultKind::Double, all_models!(elem::add)),
    elem_row("sub", "Subtract", "left - right", BINARY, ResultKind::Double, all_models!(elem::sub)),
    elem_row("mul", "Multiply", "left * right", BINARY, ResultKind::Double, all_models!(elem::mul)),
    elem_row(
        "div",
        "Divide",
        "left / right; NaN when right is zero",
        BINARY,
        ResultKind::Double,
        all_models!(elem::div),
    ),
    elem_row("neg", "Negate", "-x", UNARY, ResultKind::Double, all_models!(elem::neg)),
    elem_row("abs", "Absolute", "|x|", UNARY, ResultKind::Double, all_models!(elem::abs)),
    elem_row(
        "if",
        "If",
        "then when condition holds, else otherwise",
        IF_ARGS,
        ResultKind::Double,
        all_models!(elem::if_else),
    ),
    elem_row(
        "max",
        "Maximum",
        "largest non-NaN operand",
        VARIADIC,
        ResultKind::Double,
        all_models!(elem::max),
    ),
    elem_row(
        "min",
        "Minimum",
        "smallest non-NaN operand",
        VARIADIC,
        ResultKind::Double,
        all_models!(elem::min),
    ),
    comparison_row("gt", "Greater Than", ComparisonOp::Gt),
    comparison_row("ge", "Greater Or Equal", ComparisonOp::Ge),
    comparison_row("lt", "Less Than", ComparisonOp::Lt),
    comparison_row("le", "Less Or Equal", ComparisonOp::Le),
    comparison_row("eq", "Equal", ComparisonOp::Eq),
    comparison_row("ne", "Not Equal", ComparisonOp::Ne),
    elem_row(
        "compare",
        "Compare",
        "-1, 0 or 1; NaN orders as zero",
        BINARY,
        ResultKind::Integer,
        all_models!(elem::ordering),
    ),
    elem_row(
        "not",
        "Not",
        "three-valued negation",
        LOGIC_UNARY,
        ResultKind::BooleanNullable,
        all_models!(elem::not),
    ),
    elem_row(
        "isTrue",
        "Is True",
        "true only for a definite true",
        LOGIC_UNARY,
        ResultKind::Boolean,
        all_models!(elem::is_true),
    ),
    elem_row(
        "isFalse",
        "Is False",
        "true only for a definite false",
        LOGIC_UNARY,
        ResultKind::Boolean,
        all_models!(elem::is_false),
    ),
    elem_row(
        "and",
        "And",
        "three-valued conjunction",
        LOGIC_BINARY,
        ResultKind::BooleanNullable,
        all_models!(elem::and),
    ),
    elem_row(
        "or",
        "Or",
        "three-valued disjunction",
        LOGIC_BINARY,
        ResultKind::BooleanNullable,
        all_models!(elem::or),
    ),
    elem_row(
        "isNaN",
        "Is NaN",
        "whether x is missing",
        UNARY,
        ResultKind::Boolean,
        all_models!(elem::is_nan),
    ),
    history_row(
        "once",
        "Once",
        "condition holds now but did not one key back",
        EDGE_ARGS,
        ResultKind::Boolean,
        keyed_models!(ts::once),
    ),
    history_row(
        "stable",
        "Stable",
        "condition holds at every key of the window",
        QUANTIFIER_ARGS,
        ResultKind::Boolean,
        keyed_models!(ts::stable),
    ),
    history_row(
        "occurs",
        "Occurs",
        "condition holds at some key of the window",
        QUANTIFIER_ARGS,
        ResultKind::Boolean,
        keyed_models!(ts::occurs),
    ),
    swept_row(
        "stableLeft",
        "Stable Left",
        "left side swept, right side held at the current key; all must hold",
        keyed_models!(ts::stable_left),
    ),
    swept_row(
        "stableRight",
        "Stable Right",
        "right side swept, left side held at the current key; all must hold",
        keyed_models!(ts::stable_right),
    ),
    swept_row(
        "occursLeft",
        "Occurs Left",
        "left side swept, right side held at the current key; any may hold",
        keyed_models!(ts::occurs_left),
    ),
    swept_row(
        "occursRight",
        "Occurs Right",
        "right side swept, left side held at the current key; any may hold",
        keyed_models!(ts::occurs_right),
    ),
    history_row(
        "firstIndexOf",
        "First Index Of",
        "oldest offset in the lookback where condition holds",
        INDEX_ARGS,
        ResultKind::Double,
        keyed_models!(ts::first_index),
    ),
    history_row(
        "lastIndexOf",
        "Last Index Of",
        "newest offset in the lookback where condition holds",
        INDEX_ARGS,
        ResultKind::Double,
        keyed_models!(ts::last_index),
    ),
    history_row(
        "previousIndexOf",
        "Previous Index Of",
        "offset of the steps-th chained match; NaN if any step misses",
        CHAINED_ARGS,
        ResultKind::Double,
        keyed_models!(ts::previous_index),
    ),
    history_row(
        "latestIndexOf",
        "Latest Index Of",
        "offset of the furthest chained match found",
        CHAINED_ARGS,
        ResultKind::Double,
        keyed_models!(ts::latest_index),
    ),
    history_row(
        "previous",
        "Previous",
        "value offset keys back",
        LAG_ARGS,
        ResultKind::Double,
        keyed_models!(ts::previous),
    ),
    history_row(
        "count",
        "Count",
        "non-NaN samples in the window",
        WINDOW_ARGS,
        ResultKind::Double,
        keyed_models!(ts_stats::count),
    ),
    history_row(
        "sum",
        "Sum",
        "sum of the window",
        WINDOW_ARGS,
        ResultKind::Double,
        keyed_models!(ts_stats::sum),
    ),
    history_row(
        "product",
        "Product",
        "product of the window",
        WINDOW_ARGS,
        ResultKind::Double,
        keyed_models!(ts_stats::product),
    ),
    history_row(
        "avg",
        "Average",
        "mean of the window",
        WINDOW_ARGS,
        ResultKind::Double,
        keyed_models!(ts_stats::avg),
    ),
    history_row(
        "variance",
        "Variance",
        "population variance of the window",
        WINDOW_ARGS,
        ResultKind::Double,
        keyed_models!(ts_stats::variance),
    ),
    history_row(
        "sampleVariance",
        "Sample Variance",
        "sample variance of the window",
        WINDOW_ARGS,
        ResultKind::Double,
        keyed_models!(ts_stats::sample_variance),
    ),
    history_row(
        "stdDev",
        "Standard Deviation",
        "population standard deviation of the window",
        WINDOW_ARGS,
        ResultKind::Double,
        keyed_models!(ts_stats::std_dev),
    ),
    history_row(
        "sampleStdDev",
        "Sample Standard Deviation",
        "sample standard deviation of the window",
        WINDOW_ARGS,
        ResultKind::Double,
        keyed_models!(ts_stats::sample_std_dev),
    ),
    history_row(
        "median",
        "Median",
        "median of the window",
        WINDOW_ARGS,
        ResultKind::Double,
        keyed_models!(ts_stats::median),
    ),
    history_row(
        "percentile",
        "Percentile",
        "interpolated quantile of the window",
        PERCENTILE_ARGS,
        ResultKind::Double,
        keyed_models!(ts_stats::percentile),
    ),
];
