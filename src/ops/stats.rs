//! Streaming estimators fed by the statistical historical functions.
//!
//! Each evaluation creates a fresh estimator, so nothing here is shared
//! between keys. NaN filtering is the caller's job.

use std::cmp::Ordering;
use std::collections::VecDeque;

pub trait Estimator {
    fn process(&mut self, value: f64);
    fn count(&self) -> usize;
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WindowSum {
    n: usize,
    sum: f64,
}

impl WindowSum {
    #[inline]
    pub fn sum(&self) -> f64 {
        self.sum
    }
}

impl Estimator for WindowSum {
    #[inline]
    fn process(&mut self, value: f64) {
        self.n += 1;
        self.sum += value;
    }

    #[inline]
    fn count(&self) -> usize {
        self.n
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WindowProduct {
    n: usize,
    product: f64,
}

impl WindowProduct {
    /// 0.0 when nothing was processed.
    #[inline]
    pub fn product(&self) -> f64 {
        if self.n == 0 {
            0.0
        } else {
            self.product
        }
    }
}

impl Estimator for WindowProduct {
    #[inline]
    fn process(&mut self, value: f64) {
        self.product = if self.n == 0 {
            value
        } else {
            self.product * value
        };
        self.n += 1;
    }

    #[inline]
    fn count(&self) -> usize {
        self.n
    }
}

/// Welford's single-pass mean/variance accumulator.
///
/// Samples are shifted by the first one before accumulating, so a large common
/// offset does not eat into the precision of the deviations.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningVariance {
    n: usize,
    shift: f64,
    mean: f64,
    m2: f64,
}

impl RunningVariance {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn mean(&self) -> f64 {
        if self.n == 0 {
            0.0
        } else {
            self.shift + self.mean
        }
    }

    /// `m2 / n`; 0.0 when empty.
    #[inline]
    pub fn population_variance(&self) -> f64 {
        if self.n == 0 {
            0.0
        } else {
            self.m2 / self.n as f64
        }
    }

    /// `m2 / (n - 1)`; 0.0 below two samples.
    #[inline]
    pub fn sample_variance(&self) -> f64 {
        if self.n < 2 {
            0.0
        } else {
            self.m2 / (self.n - 1) as f64
        }
    }

    #[inline]
    pub fn population_std_dev(&self) -> f64 {
        self.population_variance().sqrt()
    }

    #[inline]
    pub fn sample_std_dev(&self) -> f64 {
        self.sample_variance().sqrt()
    }
}

impl Estimator for RunningVariance {
    #[inline]
    fn process(&mut self, value: f64) {
        if self.n == 0 {
            self.shift = value;
        }
        let value = value - self.shift;
        self.n += 1;
        let delta = value - self.mean;
        self.mean += delta / self.n as f64;
        self.m2 += delta * (value - self.mean);
    }

    #[inline]
    fn count(&self) -> usize {
        self.n
    }
}

/// Order statistics over the last `window` processed values.
///
/// Values stay sorted on insertion, so a quantile query is an index lookup
/// plus one interpolation.
#[derive(Debug, Clone, Default)]
pub struct RunningPercentile {
    window: Option<usize>,
    arrivals: VecDeque<f64>,
    sorted: Vec<f64>,
}

impl RunningPercentile {
    /// Unbounded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps at most `window` (at least 1) most recent values. Storage grows
    /// with the values actually processed, not with `window`.
    pub fn with_window(window: usize) -> Self {
        Self {
            window: Some(window.max(1)),
            arrivals: VecDeque::new(),
            sorted: Vec::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    fn evict_oldest(&mut self) {
        let Some(oldest) = self.arrivals.pop_front() else {
            return;
        };
        if let Ok(idx) = self
            .sorted
            .binary_search_by(|slot| slot.total_cmp(&oldest))
        {
            self.sorted.remove(idx);
        }
    }

    /// Linear interpolation between closest ranks; `q` clamps to [0, 1].
    /// 0.0 when empty.
    pub fn percentile(&self, q: f64) -> f64 {
        match self.sorted.len() {
            0 => 0.0,
            1 => self.sorted[0],
            len => {
                let q = if q.is_nan() { 0.5 } else { q.clamp(0.0, 1.0) };
                let idx = q * ((len - 1) as f64);
                let lo = idx.floor() as usize;
                let hi = idx.ceil() as usize;
                let frac = idx - (lo as f64);
                self.sorted[lo] + (self.sorted[hi] - self.sorted[lo]) * frac
            }
        }
    }

    #[inline]
    pub fn median(&self) -> f64 {
        self.percentile(0.5)
    }
}

impl Estimator for RunningPercentile {
    fn process(&mut self, value: f64) {
        if self.window.is_some_and(|window| self.arrivals.len() >= window) {
            self.evict_oldest();
        }
        let idx = self
            .sorted
            .partition_point(|slot| slot.total_cmp(&value) == Ordering::Less);
        self.sorted.insert(idx, value);
        self.arrivals.push_back(value);
    }

    #[inline]
    fn count(&self) -> usize {
        self.sorted.len()
    }
}
