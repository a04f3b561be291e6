//! Descriptive statistics over numeric feature properties.
//!
//! Only finite numbers take part in a computation; text, nulls and missing
//! properties are ignored. Every numeric output is rounded to four decimals.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::value::Value;

/// Default fraction trimmed from each tail before computing the deviation.
pub const DEFAULT_TRIM: f64 = 0.1;

/// Decimal places kept in every statistic.
pub const PRECISION: i32 = 4;

/// A statistic that can be requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StatisticKind {
    Domain,
    Sum,
    Count,
    Mean,
    Median,
    Deviation,
}

impl StatisticKind {
    /// Every kind, in declaration order.
    pub const ALL: [StatisticKind; 6] = [
        StatisticKind::Domain,
        StatisticKind::Sum,
        StatisticKind::Count,
        StatisticKind::Mean,
        StatisticKind::Median,
        StatisticKind::Deviation,
    ];
}

/// Computed statistics; kinds that were not requested stay `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Statistics {
    pub domain: Option<(f64, f64)>,
    pub sum: Option<f64>,
    pub count: Option<usize>,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub deviation: Option<f64>,
}

impl Statistics {
    /// Returns true if `kind` was computed.
    pub fn has(&self, kind: StatisticKind) -> bool {
        match kind {
            StatisticKind::Domain => self.domain.is_some(),
            StatisticKind::Sum => self.sum.is_some(),
            StatisticKind::Count => self.count.is_some(),
            StatisticKind::Mean => self.mean.is_some(),
            StatisticKind::Median => self.median.is_some(),
            StatisticKind::Deviation => self.deviation.is_some(),
        }
    }

    /// Replaces `kinds` with their values in `other`, empty ones included.
    ///
    /// Kinds not listed keep their current value.
    pub fn merge(&mut self, other: &Statistics, kinds: &[StatisticKind]) {
        for kind in kinds {
            match kind {
                StatisticKind::Domain => self.domain = other.domain,
                StatisticKind::Sum => self.sum = other.sum,
                StatisticKind::Count => self.count = other.count,
                StatisticKind::Mean => self.mean = other.mean,
                StatisticKind::Median => self.median = other.median,
                StatisticKind::Deviation => self.deviation = other.deviation,
            }
        }
    }
}

/// Parameters of a statistics computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatisticsOptions {
    /// Fraction trimmed from each tail before the deviation, in `[0, 0.5]`.
    pub trim: f64,
}

impl Default for StatisticsOptions {
    fn default() -> Self {
        Self { trim: DEFAULT_TRIM }
    }
}

impl StatisticsOptions {
    pub fn with_trim(mut self, trim: f64) -> Self {
        self.trim = trim;
        self
    }
}

/// Rounds `value` to [`PRECISION`] decimals.
pub fn round_to_precision(value: f64) -> f64 {
    let factor = 10f64.powi(PRECISION);
    (value * factor).round() / factor
}

/// Extracts the finite numbers from a sequence of values.
pub fn numeric_values<'a>(values: impl IntoIterator<Item = &'a Value>) -> Vec<f64> {
    values.into_iter().filter_map(Value::as_f64).collect()
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn median(sorted: &[f64]) -> Option<f64> {
    let n = sorted.len();
    match n {
        0 => None,
        _ if n % 2 == 1 => Some(sorted[n / 2]),
        _ => Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0),
    }
}

/// Mean absolute deviation around the mean of the trimmed sample.
///
/// `trim` is the fraction removed from each tail of the sorted values.
fn trimmed_deviation(sorted: &[f64], trim: f64) -> Option<f64> {
    let cut = (sorted.len() as f64 * trim.clamp(0.0, 0.5)).floor() as usize;
    let kept = sorted.get(cut..sorted.len().saturating_sub(cut))?;
    let center = mean(kept)?;
    mean(&kept.iter().map(|v| (v - center).abs()).collect::<Vec<_>>())
}

/// Computes the requested statistics over `values`.
///
/// With no numeric value every requested kind is left `None`, except
/// `Count` (zero) and `Sum` (zero).
pub fn compute(values: &[f64], kinds: &[StatisticKind], trim: f64) -> Statistics {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mut stats = Statistics::default();
    for kind in kinds {
        match kind {
            StatisticKind::Domain => {
                stats.domain = match (sorted.first(), sorted.last()) {
                    (Some(min), Some(max)) => {
                        Some((round_to_precision(*min), round_to_precision(*max)))
                    }
                    _ => None,
                };
            }
            StatisticKind::Sum => {
                stats.sum = Some(round_to_precision(sorted.iter().sum()));
            }
            StatisticKind::Count => stats.count = Some(sorted.len()),
            StatisticKind::Mean => stats.mean = mean(&sorted).map(round_to_precision),
            StatisticKind::Median => stats.median = median(&sorted).map(round_to_precision),
            StatisticKind::Deviation => {
                stats.deviation = trimmed_deviation(&sorted, trim).map(round_to_precision)
            }
        }
    }
    stats
}

/// Per-key cache of computed statistics.
///
/// Entries are only replaced by an explicit [`store`](Self::store); nothing
/// invalidates them implicitly.
#[derive(Debug, Default)]
pub struct StatisticsCache {
    entries: RwLock<HashMap<String, Statistics>>,
}

impl StatisticsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached statistics for `key`.
    pub fn get(&self, key: &str) -> Option<Statistics> {
        self.entries.read().get(key).copied()
    }

    /// Records a fresh computation of `kinds` for `key`.
    ///
    /// Every requested kind is overwritten, so a kind that came out empty
    /// clears the previous value.
    pub fn store(&self, key: &str, stats: &Statistics, kinds: &[StatisticKind]) -> Statistics {
        let mut entries = self.entries.write();
        let entry = entries.entry(key.to_string()).or_default();
        entry.merge(stats, kinds);
        *entry
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}
