//! Rounding-tolerant double comparison in three NaN policies.
//!
//! - default: NaN orders as 0.0;
//! - NaNable: a NaN operand always loses (never selected, predicates false);
//! - Nullable: a NaN operand makes the result unknown (`None`).

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Differences at or below this are re-checked after rounding.
pub const ROUNDING_EPSILON: f64 = 1e-9;
/// Decimal places used by the rounding fallback.
pub const DEFAULT_ROUNDING_SCALE: i32 = 9;

#[inline]
fn round_to_scale(value: f64) -> f64 {
    let factor = 10f64.powi(DEFAULT_ROUNDING_SCALE);
    (value * factor).round() / factor
}

#[inline]
fn nan_as_zero(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value
    }
}

/// Default policy: NaN compares as 0.0.
pub fn compare(a: f64, b: f64) -> Ordering {
    let difference = a - b;
    if difference.abs() > ROUNDING_EPSILON {
        return if difference > 0.0 {
            Ordering::Greater
        } else {
            Ordering::Less
        };
    }
    if difference == 0.0 {
        return Ordering::Equal;
    }
    let a = round_to_scale(nan_as_zero(a));
    let b = round_to_scale(nan_as_zero(b));
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// NaNable policy ordering: NaN sorts below every number.
pub fn compare_nanable(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => compare(a, b),
    }
}

/// Nullable policy ordering: unknown if either side is NaN.
pub fn compare_nullable(a: f64, b: f64) -> Option<Ordering> {
    if a.is_nan() || b.is_nan() {
        None
    } else {
        Some(compare(a, b))
    }
}

#[inline]
pub fn equals(a: f64, b: f64) -> bool {
    compare(a, b) == Ordering::Equal
}

#[inline]
pub fn is_greater_than(a: f64, b: f64) -> bool {
    compare(a, b) == Ordering::Greater
}

#[inline]
pub fn is_less_than(a: f64, b: f64) -> bool {
    compare(a, b) == Ordering::Less
}

/// Larger of two values; a NaN side loses.
#[inline]
pub fn max_nanable(a: f64, b: f64) -> f64 {
    if compare_nanable(b, a) == Ordering::Greater {
        b
    } else {
        a
    }
}

/// Smaller of two values; a NaN side loses.
#[inline]
pub fn min_nanable(a: f64, b: f64) -> f64 {
    match (a.is_nan(), b.is_nan()) {
        (true, _) => b,
        (false, true) => a,
        (false, false) => {
            if compare(b, a) == Ordering::Less {
                b
            } else {
                a
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonMode {
    Default,
    NaNable,
    Nullable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonOp {
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
    Ne,
}

impl ComparisonOp {
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Eq => "==",
            Self::Ne => "!=",
        }
    }

    #[inline]
    pub const fn matches(self, ordering: Ordering) -> bool {
        match self {
            Self::Gt => matches!(ordering, Ordering::Greater),
            Self::Ge => !matches!(ordering, Ordering::Less),
            Self::Lt => matches!(ordering, Ordering::Less),
            Self::Le => !matches!(ordering, Ordering::Greater),
            Self::Eq => matches!(ordering, Ordering::Equal),
            Self::Ne => !matches!(ordering, Ordering::Equal),
        }
    }

    /// Default policy.
    #[inline]
    pub fn apply(self, a: f64, b: f64) -> bool {
        self.matches(compare(a, b))
    }

    /// NaNable policy: any NaN operand fails the predicate.
    #[inline]
    pub fn apply_nanable(self, a: f64, b: f64) -> bool {
        !a.is_nan() && !b.is_nan() && self.apply(a, b)
    }

    /// Nullable policy.
    #[inline]
    pub fn apply_nullable(self, a: f64, b: f64) -> Option<bool> {
        compare_nullable(a, b).map(|ordering| self.matches(ordering))
    }

    /// Two-valued view of the nullable result; unknown is `false`.
    #[inline]
    pub fn apply_boolean(self, a: f64, b: f64) -> bool {
        self.apply_nullable(a, b).unwrap_or(false)
    }

    pub fn apply_in(self, mode: ComparisonMode, a: f64, b: f64) -> Option<bool> {
        match mode {
            ComparisonMode::Default => Some(self.apply(a, b)),
            ComparisonMode::NaNable => Some(self.apply_nanable(a, b)),
            ComparisonMode::Nullable => self.apply_nullable(a, b),
        }
    }
}
