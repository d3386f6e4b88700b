//! Cross-bookmaker reconciliation
//!
//! Places every bookmaker's quotes on a shared fixed-width time grid, carries
//! each bookmaker's last price forward through empty buckets and averages
//! across bookmakers to get one consensus series.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};

use super::quotes::Quote;

/// Largest grid a single consensus may span
pub const MAX_GRID_BUCKETS: i64 = 2_000_000;

/// Grid bucket containing `dt`, counted from the unix epoch
pub fn bucket_index(dt: DateTime<Utc>, width: Duration) -> i64 {
    let width_ms = width.num_milliseconds().max(1);
    dt.timestamp_millis().div_euclid(width_ms)
}

/// Last observed value per bucket. `points` must be in time order.
pub fn resample_last<I>(points: I, width: Duration) -> BTreeMap<i64, f64>
where
    I: IntoIterator<Item = (DateTime<Utc>, f64)>,
{
    let mut buckets = BTreeMap::new();
    for (dt, value) in points {
        buckets.insert(bucket_index(dt, width), value);
    }
    buckets
}

/// Expand sparse buckets over `start..=end`, carrying the previous value forward.
/// Buckets before the first populated one stay None.
pub fn forward_fill(buckets: &BTreeMap<i64, f64>, start: i64, end: i64) -> Vec<Option<f64>> {
    let mut filled = Vec::with_capacity((end - start + 1).max(0) as usize);
    let mut last = None;
    for bucket in start..=end {
        if let Some(value) = buckets.get(&bucket) {
            last = Some(*value);
        }
        filled.push(last);
    }
    filled
}

/// Exponentially weighted mean, seeded with the first value
pub fn ewm(values: &[f64], alpha: f64) -> Vec<f64> {
    let mut smoothed = Vec::with_capacity(values.len());
    let mut prev: Option<f64> = None;
    for &value in values {
        let next = match prev {
            None => value,
            Some(p) => alpha * value + (1.0 - alpha) * p,
        };
        smoothed.push(next);
        prev = Some(next);
    }
    smoothed
}

/// Consensus odds on the grid
#[derive(Debug, Clone, PartialEq)]
pub struct Consensus {
    /// Bucket index of `series[0]`
    pub start_bucket: i64,
    /// Mean across bookmakers with a value, one entry per bucket
    pub series: Vec<f64>,
}

impl Consensus {
    /// Consensus at the last populated bucket
    pub fn final_odds(&self) -> Option<f64> {
        self.series.last().copied()
    }

    pub fn smoothed(&self, alpha: f64) -> Vec<f64> {
        ewm(&self.series, alpha)
    }
}

/// Reconcile time-ordered quotes into one consensus series.
/// Returns None when there are no quotes, or when they span more than
/// [`MAX_GRID_BUCKETS`] buckets.
pub fn reconcile(quotes: &[Quote], width: Duration) -> Option<Consensus> {
    let mut bookies: Vec<&str> = Vec::new();
    for quote in quotes {
        if !bookies.contains(&quote.bookie.as_str()) {
            bookies.push(quote.bookie.as_str());
        }
    }

    let per_bookie: Vec<BTreeMap<i64, f64>> = bookies
        .iter()
        .map(|bookie| {
            resample_last(
                quotes
                    .iter()
                    .filter(|q| q.bookie == *bookie)
                    .map(|q| (q.dt, q.odds)),
                width,
            )
        })
        .collect();

    let start = per_bookie.iter().filter_map(|b| b.keys().next()).min()?;
    let end = per_bookie.iter().filter_map(|b| b.keys().next_back()).max()?;
    let (start, end) = (*start, *end);
    if end - start >= MAX_GRID_BUCKETS {
        log::debug!(
            "Quotes span {} buckets of {}s, more than {}; no consensus",
            end - start + 1,
            width.num_seconds(),
            MAX_GRID_BUCKETS
        );
        return None;
    }

    let filled: Vec<Vec<Option<f64>>> = per_bookie
        .iter()
        .map(|b| forward_fill(b, start, end))
        .collect();

    let series = (0..=(end - start) as usize)
        .map(|i| {
            let values: Vec<f64> = filled.iter().filter_map(|f| f[i]).collect();
            values.iter().sum::<f64>() / values.len() as f64
        })
        .collect();

    Some(Consensus {
        start_bucket: start,
        series,
    })
}
