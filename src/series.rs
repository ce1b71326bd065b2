//! Array-backed series: an expression leaf, a key provider and a source of
//! previous-key context.

use crate::error::EvalError;
use crate::expr::{Compiled, ExprRef, Expression};
use crate::key::{DateKey, KeyModel, NoKey, PreviousKeys};
use crate::types::{BarIndex, ResultKind, Timestamp};
use std::ops::Range;
use std::sync::Arc;

/// Supplies the keys a runner walks, oldest first.
pub trait KeyProvider<K> {
    fn key_count(&self) -> usize;
    fn key_at(&self, idx: usize) -> Option<K>;
}

impl KeyProvider<BarIndex> for Range<BarIndex> {
    fn key_count(&self) -> usize {
        usize::try_from(self.end.saturating_sub(self.start)).unwrap_or(0)
    }

    fn key_at(&self, idx: usize) -> Option<BarIndex> {
        let bar = self.start.checked_add(BarIndex::try_from(idx).ok()?)?;
        (bar < self.end).then_some(bar)
    }
}

impl<K: Copy> KeyProvider<K> for Vec<K> {
    fn key_count(&self) -> usize {
        self.len()
    }

    fn key_at(&self, idx: usize) -> Option<K> {
        self.get(idx).copied()
    }
}

/// Observed values; bar `i` is `values[i]`, and with a calendar, timestamp
/// `calendar[i]` is the same observation.
#[derive(Debug, Clone)]
pub struct ValueSeries {
    name: String,
    values: Arc<[f64]>,
    calendar: Option<Arc<[Timestamp]>>,
}

impl ValueSeries {
    pub fn new(name: impl Into<String>, values: impl Into<Arc<[f64]>>) -> Self {
        Self {
            name: name.into(),
            values: values.into(),
            calendar: None,
        }
    }

    /// `calendar` must be sorted ascending and as long as the values.
    pub fn with_calendar(mut self, calendar: impl Into<Arc<[Timestamp]>>) -> Self {
        let calendar = calendar.into();
        debug_assert_eq!(calendar.len(), self.values.len(), "calendar length");
        self.calendar = Some(calendar);
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// NaN outside the series.
    pub fn value_at(&self, bar: BarIndex) -> f64 {
        value_at(&self.values, bar)
    }

    /// Latest observation at or before `ts`; NaN before the first one or
    /// without a calendar.
    pub fn value_as_of(&self, ts: Timestamp) -> f64 {
        match &self.calendar {
            Some(calendar) => value_as_of(calendar, &self.values, ts),
            None => f64::NAN,
        }
    }

    pub fn calendar(&self) -> Option<&Arc<[Timestamp]>> {
        self.calendar.as_ref()
    }

    /// Calendar-stepping context when dated, bar-stepping otherwise.
    pub fn previous_keys(&self) -> PreviousKeys {
        match &self.calendar {
            Some(calendar) => PreviousKeys::calendar(Arc::clone(calendar)),
            None => PreviousKeys::bars(),
        }
    }

    pub fn into_node(self) -> ExprRef {
        Arc::new(self)
    }
}

#[inline]
fn value_at(values: &[f64], bar: BarIndex) -> f64 {
    usize::try_from(bar)
        .ok()
        .and_then(|idx| values.get(idx).copied())
        .unwrap_or(f64::NAN)
}

#[inline]
fn value_as_of(calendar: &[Timestamp], values: &[f64], ts: Timestamp) -> f64 {
    let upto = calendar.partition_point(|entry| *entry <= ts);
    upto.checked_sub(1)
        .and_then(|idx| values.get(idx).copied())
        .unwrap_or(f64::NAN)
}

impl Expression for ValueSeries {
    fn result_kind(&self) -> ResultKind {
        ResultKind::Double
    }

    fn is_key_dependent(&self) -> bool {
        true
    }

    fn compile_no_key(&self) -> Result<Compiled<()>, EvalError> {
        Err(EvalError::UnsupportedEvaluation {
            node: self.name.clone(),
            key_model: NoKey::NAME,
            hint: "use time or int key instead",
        })
    }

    fn compile_int(&self) -> Result<Compiled<BarIndex>, EvalError> {
        let values = Arc::clone(&self.values);
        Ok(Compiled::Double(Box::new(move |bar| value_at(&values, bar))))
    }

    fn compile_date(&self) -> Result<Compiled<Timestamp>, EvalError> {
        let Some(calendar) = self.calendar.as_ref().map(Arc::clone) else {
            return Err(EvalError::UnsupportedEvaluation {
                node: self.name.clone(),
                key_model: DateKey::NAME,
                hint: "series has no calendar; use int key instead",
            });
        };
        let values = Arc::clone(&self.values);
        Ok(Compiled::Double(Box::new(move |ts| {
            value_as_of(&calendar, &values, ts)
        })))
    }
}

impl KeyProvider<BarIndex> for ValueSeries {
    fn key_count(&self) -> usize {
        self.values.len()
    }

    fn key_at(&self, idx: usize) -> Option<BarIndex> {
        (idx < self.values.len())
            .then(|| BarIndex::try_from(idx).ok())
            .flatten()
    }
}

/// Walks the calendar; empty without one.
impl KeyProvider<Timestamp> for ValueSeries {
    fn key_count(&self) -> usize {
        self.calendar.as_ref().map_or(0, |calendar| calendar.len())
    }

    fn key_at(&self, idx: usize) -> Option<Timestamp> {
        self.calendar.as_ref()?.get(idx).copied()
    }
}
