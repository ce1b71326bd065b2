//! Key models and previous-key indexing.
//!
//! A key identifies "now" while a series is walked. Three calling conventions
//! exist and are compiled independently: [`NoKey`] for key-invariant
//! evaluation, [`IntKey`] for bar offsets and [`DateKey`] for calendar
//! timestamps. Historical functions are written once against [`KeyModel`] and
//! reach back in time through a [`PreviousKeyIndexer`] for that model.

use crate::error::EvalError;
use crate::expr::{Compiled, Expression};
use crate::ops::{KernelFn, Kernels};
use crate::types::{BarIndex, Timestamp};
use chrono::Duration;
use std::fmt;
use std::sync::Arc;

pub trait KeyModel: Sized + 'static {
    type Key: Copy + fmt::Debug + 'static;
    const NAME: &'static str;

    fn compile(node: &dyn Expression) -> Result<Compiled<Self::Key>, EvalError>;
    fn kernel(kernels: &Kernels) -> Option<KernelFn<Self>>;
    fn indexer(keys: &PreviousKeys) -> Option<Arc<dyn PreviousKeyIndexer<Self::Key>>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateKey;

impl KeyModel for NoKey {
    type Key = ();
    const NAME: &'static str = "no key";

    #[inline]
    fn compile(node: &dyn Expression) -> Result<Compiled<()>, EvalError> {
        node.compile_no_key()
    }

    #[inline]
    fn kernel(kernels: &Kernels) -> Option<KernelFn<Self>> {
        kernels.no_key
    }

    #[inline]
    fn indexer(_keys: &PreviousKeys) -> Option<Arc<dyn PreviousKeyIndexer<()>>> {
        None
    }
}

impl KeyModel for IntKey {
    type Key = BarIndex;
    const NAME: &'static str = "int key";

    #[inline]
    fn compile(node: &dyn Expression) -> Result<Compiled<BarIndex>, EvalError> {
        node.compile_int()
    }

    #[inline]
    fn kernel(kernels: &Kernels) -> Option<KernelFn<Self>> {
        kernels.int
    }

    fn indexer(keys: &PreviousKeys) -> Option<Arc<dyn PreviousKeyIndexer<BarIndex>>> {
        match keys {
            PreviousKeys::Int(indexer) => Some(Arc::clone(indexer)),
            PreviousKeys::Date(_) => None,
        }
    }
}

impl KeyModel for DateKey {
    type Key = Timestamp;
    const NAME: &'static str = "date key";

    #[inline]
    fn compile(node: &dyn Expression) -> Result<Compiled<Timestamp>, EvalError> {
        node.compile_date()
    }

    #[inline]
    fn kernel(kernels: &Kernels) -> Option<KernelFn<Self>> {
        kernels.date
    }

    fn indexer(keys: &PreviousKeys) -> Option<Arc<dyn PreviousKeyIndexer<Timestamp>>> {
        match keys {
            PreviousKeys::Date(indexer) => Some(Arc::clone(indexer)),
            PreviousKeys::Int(_) => None,
        }
    }
}

/// Maps `(key, offset)` to the key `offset` observations earlier.
///
/// Offset 0 returns `key` itself. `None` means the series has no observation
/// that far back; once an offset yields `None`, every larger offset does too.
pub trait PreviousKeyIndexer<K>: Send + Sync {
    fn previous_key(&self, key: K, offset: usize) -> Option<K>;
}

/// `key - offset` on bar indices; negative bars do not exist.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntIndexer;

impl PreviousKeyIndexer<BarIndex> for IntIndexer {
    #[inline]
    fn previous_key(&self, key: BarIndex, offset: usize) -> Option<BarIndex> {
        if offset == 0 {
            return Some(key);
        }
        let offset = BarIndex::try_from(offset).ok()?;
        key.checked_sub(offset).filter(|prev| *prev >= 0)
    }
}

/// Steps back through the series' own observation times, so gaps such as
/// weekends and holidays cost one step each regardless of wall-clock length.
#[derive(Debug, Clone)]
pub struct CalendarIndexer {
    calendar: Arc<[Timestamp]>,
}

impl CalendarIndexer {
    /// `calendar` must be sorted ascending.
    pub fn new(calendar: Arc<[Timestamp]>) -> Self {
        debug_assert!(
            calendar.windows(2).all(|w| w[0] <= w[1]),
            "calendar must be sorted"
        );
        Self { calendar }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.calendar.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.calendar.is_empty()
    }
}

impl PreviousKeyIndexer<Timestamp> for CalendarIndexer {
    fn previous_key(&self, key: Timestamp, offset: usize) -> Option<Timestamp> {
        if offset == 0 {
            return Some(key);
        }
        // Observations strictly before `key`; the last of them is offset 1.
        let before = self.calendar.partition_point(|ts| *ts < key);
        let idx = before.checked_sub(offset)?;
        Some(self.calendar[idx])
    }
}

/// Fixed wall-clock step: `key - offset * step`.
#[derive(Debug, Clone, Copy)]
pub struct IntervalIndexer {
    step: Duration,
}

impl IntervalIndexer {
    pub fn new(step: Duration) -> Self {
        debug_assert!(step > Duration::zero(), "interval step must be positive");
        Self { step }
    }
}

impl PreviousKeyIndexer<Timestamp> for IntervalIndexer {
    fn previous_key(&self, key: Timestamp, offset: usize) -> Option<Timestamp> {
        if offset == 0 {
            return Some(key);
        }
        let factor = i32::try_from(offset).ok()?;
        key.checked_sub(self.step.checked_mul(factor)?)
    }
}

/// Previous-key context a historical function is bound to.
#[derive(Clone)]
pub enum PreviousKeys {
    Int(Arc<dyn PreviousKeyIndexer<BarIndex>>),
    Date(Arc<dyn PreviousKeyIndexer<Timestamp>>),
}

impl PreviousKeys {
    pub fn bars() -> Self {
        Self::Int(Arc::new(IntIndexer))
    }

    pub fn calendar(calendar: Arc<[Timestamp]>) -> Self {
        Self::Date(Arc::new(CalendarIndexer::new(calendar)))
    }

    pub fn interval(step: Duration) -> Self {
        Self::Date(Arc::new(IntervalIndexer::new(step)))
    }

    #[inline]
    pub const fn key_model_name(&self) -> &'static str {
        match self {
            Self::Int(_) => IntKey::NAME,
            Self::Date(_) => DateKey::NAME,
        }
    }
}

impl fmt::Debug for PreviousKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PreviousKeys({})", self.key_model_name())
    }
}
