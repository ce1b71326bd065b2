mod common;

use common::{assert_close, day, eval_at, history, history_with, num, series};
use rstest::rstest;
use series_expr::expr::compile_double;
use series_expr::{DateKey, ValueSeries};

const SAMPLE: [f64; 8] = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];

#[rstest]
#[case::count("count", 8.0)]
#[case::sum("sum", 40.0)]
#[case::product("product", 201_600.0)]
#[case::avg("avg", 5.0)]
#[case::variance("variance", 4.0)]
#[case::sample_variance("sampleVariance", 32.0 / 7.0)]
#[case::std_dev("stdDev", 2.0)]
#[case::sample_std_dev("sampleStdDev", (32.0_f64 / 7.0).sqrt())]
#[case::median("median", 4.5)]
fn window_statistics_over_full_sample(#[case] name: &str, #[case] expected: f64) {
    let node = history(name, vec![num(8.0), series("x", &SAMPLE)]);
    assert_close(eval_at(&node, 7), expected);
}

#[rstest]
#[case::lower_quartile(0.25, 4.0)]
#[case::median(0.5, 4.5)]
#[case::max(1.0, 9.0)]
#[case::min(0.0, 2.0)]
#[case::clamped_high(2.0, 9.0)]
#[case::clamped_low(-1.0, 2.0)]
fn percentile_interpolates_and_clamps(#[case] quantile: f64, #[case] expected: f64) {
    let node = history(
        "percentile",
        vec![num(8.0), series("x", &SAMPLE), num(quantile)],
    );
    assert_close(eval_at(&node, 7), expected);
}

#[rstest]
#[case::count("count", 2.0)]
#[case::sum("sum", 4.0)]
#[case::avg("avg", 2.0)]
#[case::variance("variance", 1.0)]
#[case::sample_variance("sampleVariance", 2.0)]
#[case::median("median", 2.0)]
fn missing_values_are_skipped(#[case] name: &str, #[case] expected: f64) {
    let node = history(name, vec![num(3.0), series("x", &[1.0, f64::NAN, 3.0])]);
    assert_close(eval_at(&node, 2), expected);
}

#[rstest]
#[case::count("count")]
#[case::sum("sum")]
#[case::product("product")]
#[case::variance("variance")]
#[case::sample_std_dev("sampleStdDev")]
#[case::median("median")]
fn empty_window_reports_zero(#[case] name: &str) {
    let node = history(name, vec![num(0.0), series("x", &SAMPLE)]);
    assert_eq!(eval_at(&node, 7), 0.0);

    let all_missing = history(name, vec![num(2.0), series("x", &[f64::NAN; 3])]);
    assert_eq!(eval_at(&all_missing, 2), 0.0);
}

#[rstest]
#[case::median_infinite("median", f64::INFINITY, 2.0)]
#[case::median_huge("median", 1e17, 2.0)]
#[case::sum_infinite("sum", f64::INFINITY, 6.0)]
#[case::variance_huge("variance", 1e17, 2.0 / 3.0)]
fn unbounded_count_covers_all_history(
    #[case] name: &str,
    #[case] count: f64,
    #[case] expected: f64,
) {
    let node = history(name, vec![num(count), series("x", &[1.0, 2.0, 3.0])]);
    assert_close(eval_at(&node, 2), expected);
}

#[rstest]
#[case::infinite(f64::INFINITY)]
#[case::huge(1e17)]
fn percentile_with_unbounded_count(#[case] count: f64) {
    let node = history(
        "percentile",
        vec![num(count), series("x", &[1.0, 2.0, 3.0]), num(0.5)],
    );
    assert_eq!(eval_at(&node, 2), 2.0);
}

#[test]
fn window_is_cut_at_series_start() {
    let node = history("sum", vec![num(10.0), series("x", &SAMPLE)]);
    assert_eq!(eval_at(&node, 1), 6.0);
    let count = history("count", vec![num(10.0), series("x", &SAMPLE)]);
    assert_eq!(eval_at(&count, 1), 2.0);
}

#[test]
fn rolling_window_moves_with_the_key() {
    let node = history("avg", vec![num(3.0), series("x", &SAMPLE)]);
    let values: Vec<f64> = (2..8).map(|bar| eval_at(&node, bar)).collect();
    let expected = [10.0 / 3.0, 4.0, 13.0 / 3.0, 14.0 / 3.0, 17.0 / 3.0, 7.0];
    for (actual, expected) in values.into_iter().zip(expected) {
        assert_close(actual, expected);
    }
}

#[test]
fn statistics_walk_calendar_keys() {
    let dated = ValueSeries::new("x", vec![1.0, 2.0, 3.0, 4.0])
        .with_calendar(vec![day(1), day(2), day(5), day(8)]);
    let keys = dated.previous_keys();
    let node = history_with("sum", keys, vec![num(2.0), dated.into_node()]);

    let f = compile_double::<DateKey>(node.as_ref()).expect("date key compile");
    assert_eq!(f(day(8)), 7.0);
    assert_eq!(f(day(5)), 5.0);
    assert_eq!(f(day(1)), 1.0);
}
