use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Value kind an expression node produces natively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultKind {
    Double,
    Integer,
    /// Two-valued; missing collapses to `false`.
    Boolean,
    /// Three-valued; missing stays `None`.
    BooleanNullable,
}

impl ResultKind {
    #[inline]
    pub const fn is_boolean(self) -> bool {
        matches!(self, Self::Boolean | Self::BooleanNullable)
    }
}

/// Integer key: bar offset into an array-backed series.
pub type BarIndex = i64;

/// Date key: a point on a series' own calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(NaiveDateTime);

impl Timestamp {
    #[inline]
    pub const fn new(value: NaiveDateTime) -> Self {
        Self(value)
    }

    /// Midnight of the given calendar day.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(Self)
    }

    #[inline]
    pub const fn as_datetime(self) -> NaiveDateTime {
        self.0
    }

    #[inline]
    pub fn checked_sub(self, delta: Duration) -> Option<Self> {
        self.0.checked_sub_signed(delta).map(Self)
    }
}

impl From<NaiveDateTime> for Timestamp {
    fn from(value: NaiveDateTime) -> Self {
        Self(value)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Replace key-invariant calls over constants with literals before lowering.
    pub fold_constants: bool,
    /// Build and log a `CompileManifest` for every compile.
    pub collect_manifest: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            fold_constants: true,
            collect_manifest: true,
        }
    }
}
