use super::*;
use crate::compile::{fold_constants, Compiler};
use crate::types::CompileOptions;

#[test]
fn every_function_reports_consistent_arity() {
    for spec in FunctionRegistry::iter() {
        let function = FunctionRegistry::resolve(spec.name, Some(PreviousKeys::bars()))
            .expect("registered")
            .expect("applicable with bar context");
        let min = function.number_of_arguments_min();
        let max = function.number_of_arguments_max();
        if function.is_var_args() {
            assert_eq!(max, VAR_ARGS, "{}", spec.name);
        } else {
            assert!(min as isize <= max, "{}: min={min} max={max}", spec.name);
            assert_eq!(max as usize, function.number_of_arguments(), "{}", spec.name);
        }
    }
}

#[test]
fn parameter_lookup_reports_index_out_of_range() {
    let abs = FunctionRegistry::function("abs").expect("abs");
    assert_eq!(abs.parameter(0).expect("first parameter").name, "x");
    let err = abs.parameter(1).expect_err("only one parameter");
    assert!(matches!(
        err,
        BuildError::IndexOutOfRange { index: 1, len: 1, .. }
    ));
}

#[test]
fn call_rejects_wrong_arity() {
    let add = FunctionRegistry::function("add").expect("add");
    let err = add.call(vec![num(1.0)]).expect_err("one operand");
    assert!(matches!(err, BuildError::InvalidArity { actual: 1, .. }));

    let previous_index = FunctionRegistry::factory("previousIndexOf")
        .expect("factory")
        .new_function(Some(PreviousKeys::bars()))
        .expect("bound");
    assert_eq!(previous_index.number_of_arguments_min(), 2);
    assert_eq!(previous_index.number_of_arguments_max(), 3);
    assert!(previous_index
        .call(vec![Literal::boolean(true), num(3.0)])
        .is_ok());
}

#[test]
fn swept_quantifier_validates_condition_shape_on_build() {
    let stable_left = FunctionRegistry::factory("stableLeft")
        .expect("factory")
        .new_function(Some(PreviousKeys::bars()))
        .expect("bound");

    let sum = scalar("add", vec![num(1.0), num(2.0)]);
    let err = stable_left
        .call(vec![num(3.0), sum])
        .expect_err("not a comparison");
    assert!(matches!(
        err,
        BuildError::InvalidArgumentShape {
            index: 1,
            source: ShapeError::NotAComparison { .. },
            ..
        }
    ));

    let err = stable_left
        .call(vec![num(3.0), Literal::boolean(true)])
        .expect_err("not a call");
    assert!(matches!(
        err,
        BuildError::InvalidArgumentShape {
            source: ShapeError::NotACall,
            ..
        }
    ));

    let close = series("close", &[1.0, 2.0]);
    let condition = scalar("gt", vec![close, num(0.0)]);
    assert!(stable_left.call(vec![num(3.0), condition]).is_ok());
}

#[test]
fn natural_functions_are_key_invariant_over_constants() {
    let condition = scalar("gt", vec![num(1.0), num(2.0)]);
    let choice = scalar("if", vec![condition, num(3.0), num(4.0)]);
    let magnitude = scalar("abs", vec![num(-2.5)]);

    for node in [&choice, &magnitude] {
        let call = node.as_call().expect("call node");
        assert!(call.function().is_natural(call.args()));
        assert!(node.is_constant());
        let values = eval_bars(node, 0..8);
        assert!(values.windows(2).all(|w| w[0] == w[1]));
    }
    assert_eq!(eval_bars(&choice, 0..1), vec![4.0]);
    assert_eq!(eval_bars(&magnitude, 0..1), vec![2.5]);
}

#[test]
fn historical_functions_are_never_natural() {
    let always = scalar("gt", vec![num(1.0), num(0.0)]);
    let stable = history("stable", PreviousKeys::bars(), vec![num(2.0), always]);
    let call = stable.as_call().expect("call node");
    assert!(!call.function().is_natural(call.args()));
    assert!(!call.function().should_persist());
    assert!(stable.is_key_dependent());
    // bar 0 has no previous bar, so a constant condition still differs by key
    assert_eq!(eval_bars(&stable, 0..3), vec![0.0, 1.0, 1.0]);
}

#[test]
fn natural_function_over_key_dependent_args_is_not_natural() {
    let close = series("close", &[-1.0, 2.0]);
    let magnitude = scalar("abs", vec![close]);
    let call = magnitude.as_call().expect("call node");
    assert!(!call.function().is_natural(call.args()));
    assert_eq!(eval_bars(&magnitude, 0..2), vec![1.0, 2.0]);
}

#[test]
fn compiling_twice_gives_identical_evaluators() {
    let close = series("close", &[1.0, 3.0, 4.0, 1.0, 5.0, 6.0, 7.0]);
    let condition = scalar("gt", vec![close, num(2.0)]);
    let stable = history("stable", PreviousKeys::bars(), vec![num(3.0), condition]);

    let first = compile_double::<IntKey>(stable.as_ref()).expect("first compile");
    let second = compile_double::<IntKey>(stable.as_ref()).expect("second compile");
    for bar in 0..7 {
        assert_eq!(first(bar).to_bits(), second(bar).to_bits(), "bar={bar}");
    }
}

#[test]
fn historical_function_rejects_key_less_compile() {
    let always = Literal::boolean(true);
    let occurs = history("occurs", PreviousKeys::bars(), vec![num(2.0), always]);
    let err = compile_double::<NoKey>(occurs.as_ref())
        .err()
        .expect("no key");
    assert!(matches!(
        err,
        EvalError::UnsupportedEvaluation { key_model, hint, .. }
            if key_model == NoKey::NAME && hint.contains("int or date key")
    ));
}

#[test]
fn bar_bound_function_rejects_date_compile() {
    let always = Literal::boolean(true);
    let occurs = history("occurs", PreviousKeys::bars(), vec![num(2.0), always]);
    let err = compile_double::<DateKey>(occurs.as_ref())
        .err()
        .expect("wrong key model");
    assert!(matches!(err, EvalError::UnsupportedEvaluation { .. }));
    assert!(compile_double::<IntKey>(occurs.as_ref()).is_ok());
}

#[test]
fn factory_without_context_is_unavailable() {
    let factory = FunctionRegistry::factory("firstIndexOf").expect("factory");
    assert!(factory.new_function(None).is_none());
    assert_eq!(factory.expression_name(), "firstIndexOf");
}

#[test]
fn comparison_functions_follow_nullable_mode() {
    let unknown = scalar("gt", vec![num(f64::NAN), num(1.0)]);
    let f = compile_nullable::<NoKey>(unknown.as_ref()).expect("compile");
    assert_eq!(f(()), None);
    assert_eq!(unknown.result_kind(), ResultKind::BooleanNullable);

    let ordering = scalar("compare", vec![num(f64::NAN), num(5.0)]);
    assert_eq!(ordering.result_kind(), ResultKind::Integer);
    assert_eq!(eval_bars(&ordering, 0..1), vec![-1.0]);

    let close_enough = scalar("eq", vec![num(0.1 + 0.2), num(0.3)]);
    let f = compile_nullable::<NoKey>(close_enough.as_ref()).expect("compile");
    assert_eq!(f(()), Some(true));
}

#[test]
fn three_valued_logic() {
    let null = Literal::null;
    let cases: [(ExprRef, Option<bool>); 6] = [
        (scalar("not", vec![null()]), None),
        (scalar("not", vec![Literal::boolean(false)]), Some(true)),
        (scalar("and", vec![Literal::boolean(false), null()]), Some(false)),
        (scalar("and", vec![Literal::boolean(true), null()]), None),
        (scalar("or", vec![null(), Literal::boolean(true)]), Some(true)),
        (scalar("or", vec![null(), Literal::boolean(false)]), None),
    ];
    for (node, expected) in cases {
        let f = compile_nullable::<NoKey>(node.as_ref()).expect("compile");
        assert_eq!(f(()), expected, "{node:?}");
    }

    let is_true = scalar("isTrue", vec![null()]);
    let is_false = scalar("isFalse", vec![Literal::boolean(false)]);
    assert_eq!(eval_bars(&is_true, 0..1), vec![0.0]);
    assert_eq!(eval_bars(&is_false, 0..1), vec![1.0]);
}

#[test]
fn variadic_extrema_skip_nan() {
    let max = scalar("max", vec![num(f64::NAN), num(3.0), num(7.0), num(2.0)]);
    let min = scalar("min", vec![num(4.0), num(f64::NAN), num(-1.0)]);
    let all_nan = scalar("min", vec![num(f64::NAN), num(f64::NAN)]);
    assert_eq!(eval_bars(&max, 0..1), vec![7.0]);
    assert_eq!(eval_bars(&min, 0..1), vec![-1.0]);
    assert!(eval_bars(&all_nan, 0..1)[0].is_nan());

    let single = scalar("max", vec![num(5.0)]);
    assert_eq!(eval_bars(&single, 0..1), vec![5.0]);
}

#[test]
fn division_by_zero_is_nan() {
    let ratio = scalar("div", vec![num(1.0), num(0.0)]);
    assert!(eval_bars(&ratio, 0..1)[0].is_nan());
    let nan_check = scalar("isNaN", vec![ratio]);
    assert_eq!(eval_bars(&nan_check, 0..1), vec![1.0]);
}

#[test]
fn fold_constants_replaces_natural_subtrees() {
    let close = series("close", &[1.0, 2.0]);
    let product = scalar("mul", vec![num(2.0), num(3.0)]);
    let root = scalar("add", vec![product, close]);

    let (folded, count) = fold_constants(&root).expect("fold");
    assert_eq!(count, 1);
    let call = folded.as_call().expect("root stays a call");
    assert!(call.args()[0].as_call().is_none());
    assert_eq!(eval_bars(&folded, 0..2), vec![7.0, 8.0]);

    let constant = scalar("neg", vec![scalar("abs", vec![num(-4.0)])]);
    let (folded, count) = fold_constants(&constant).expect("fold");
    assert_eq!(count, 2);
    assert!(folded.as_call().is_none());
}

#[test]
fn fold_constants_keeps_swept_comparison_call() {
    let close = series("close", &[1.0, 2.0, 3.0]);
    let threshold = scalar("add", vec![num(1.0), num(0.5)]);
    let condition = scalar("gt", vec![close, threshold]);
    let constant_condition = scalar("gt", vec![num(2.0), num(1.0)]);
    let keys = PreviousKeys::bars;
    let swept = history("occursLeft", keys(), vec![num(2.0), condition]);
    let constant = history("stableRight", keys(), vec![num(2.0), constant_condition]);

    let (folded, count) = fold_constants(&swept).expect("fold");
    assert_eq!(count, 1);
    let comparison = &folded.as_call().expect("call").args()[1];
    assert!(comparison.as_call().is_some());
    assert_eq!(eval_bars(&folded, 0..3), vec![0.0, 1.0, 1.0]);

    let (folded, count) = fold_constants(&constant).expect("fold");
    assert_eq!(count, 0);
    assert_eq!(eval_bars(&folded, 0..2), vec![0.0, 1.0]);
}

#[test]
fn compiler_reports_manifest_when_enabled() {
    let close = series("close", &[1.0, 2.0]);
    let root = scalar("add", vec![scalar("mul", vec![num(2.0), num(3.0)]), close]);

    let (_, manifest) = Compiler::default()
        .compile::<IntKey>(&root, ResultKind::Double)
        .expect("compile");
    let manifest = manifest.expect("manifest enabled by default");
    assert_eq!(manifest.key_model, IntKey::NAME);
    assert_eq!(manifest.node_count, 3);
    assert_eq!(manifest.call_count, 1);
    assert_eq!(manifest.folded_count, 1);
    assert!(manifest.summary_line().contains("folded=1"));

    let quiet = Compiler::new(CompileOptions {
        fold_constants: false,
        collect_manifest: false,
    });
    let (compiled, manifest) = quiet
        .compile::<IntKey>(&root, ResultKind::Boolean)
        .expect("compile");
    assert!(manifest.is_none());
    assert_eq!(compiled.kind(), ResultKind::Boolean);
}

#[test]
fn with_args_revalidates() {
    let condition = scalar("gt", vec![num(1.0), num(0.0)]);
    let call = condition.as_call().expect("call");
    assert!(call.with_args(vec![num(1.0)]).is_err());
    let rebuilt = call
        .with_args(vec![num(0.0), num(1.0)])
        .expect("two operands");
    let f = compile_nullable::<NoKey>(rebuilt.as_ref()).expect("compile");
    assert_eq!(f(()), Some(false));
}
