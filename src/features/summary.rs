//! Distribution and momentum statistics over raw quotes

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};

use super::quotes::Quote;

/// Statistics over one identifier's unreconciled quote set
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteSummary {
    pub max: f64,
    pub min: f64,
    pub mean: f64,
    pub median: f64,
    pub spread: f64,
    pub bookies: usize,
    pub samples: usize,
    /// Latest minus earliest odds
    pub momentum: f64,
    /// Momentum per elapsed second (0 when no time elapsed)
    pub rate_of_change: f64,
    /// Move across the trailing window, per second of the full window
    pub window_rate_of_change: f64,
}

/// Summarize time-ordered quotes. Returns None when there are none.
///
/// The trailing window covers quotes strictly after `event_dt - window`; with
/// fewer than two of them the window rate is 0.
pub fn summarize(
    quotes: &[Quote],
    event_dt: DateTime<Utc>,
    window: Duration,
) -> Option<QuoteSummary> {
    let earliest = quotes.first()?;
    let latest = quotes.last()?;

    let odds: Vec<f64> = quotes.iter().map(|q| q.odds).collect();
    let max = odds.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = odds.iter().copied().fold(f64::INFINITY, f64::min);
    let mean = odds.iter().sum::<f64>() / odds.len() as f64;

    let bookies = quotes
        .iter()
        .map(|q| q.bookie.as_str())
        .collect::<HashSet<_>>()
        .len();

    let momentum = latest.odds - earliest.odds;
    let rate_of_change = per_second(momentum, latest.dt - earliest.dt);

    let window_start = event_dt - window;
    let recent: Vec<&Quote> = quotes.iter().filter(|q| q.dt > window_start).collect();
    let window_rate_of_change = match (recent.first(), recent.last()) {
        (Some(first), Some(last)) if recent.len() > 1 => {
            (last.odds - first.odds) / window.num_seconds() as f64
        }
        _ => 0.0,
    };

    Some(QuoteSummary {
        max,
        min,
        mean,
        median: median(&odds),
        spread: max - min,
        bookies,
        samples: quotes.len(),
        momentum,
        rate_of_change,
        window_rate_of_change,
    })
}

fn per_second(delta: f64, elapsed: Duration) -> f64 {
    let secs = elapsed.num_milliseconds() as f64 / 1000.0;
    if secs == 0.0 {
        0.0
    } else {
        delta / secs
    }
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
