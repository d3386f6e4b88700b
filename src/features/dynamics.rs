//! Price path dynamics
//!
//! Scans each bookmaker's raw chronological quotes (not the resampled grid)
//! for reversals, large relative moves and even-money crossings.

use super::quotes::Quote;

/// Thresholds for classifying a single price step
#[derive(Debug, Clone, Copy)]
pub struct DynamicsConfig {
    /// max/min ratio a step must exceed to be a big shift
    pub big_shift_ratio: f64,
    /// Odds level a step must straddle to be a consensus flip
    pub flip_threshold: f64,
}

impl Default for DynamicsConfig {
    fn default() -> Self {
        DynamicsConfig {
            big_shift_ratio: 1.1,
            flip_threshold: 2.0,
        }
    }
}

/// Step counts, summed across bookmakers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MarketDynamics {
    pub direction_changes: u32,
    pub big_shifts: u32,
    pub consensus_flips: u32,
}

impl std::ops::AddAssign for MarketDynamics {
    fn add_assign(&mut self, other: Self) {
        self.direction_changes += other.direction_changes;
        self.big_shifts += other.big_shifts;
        self.consensus_flips += other.consensus_flips;
    }
}

/// Classify every consecutive pair of one bookmaker's prices.
///
/// The first pair fixes the bookmaker's direction (up when the price does not
/// fall) and is never itself a change; each later pair moving against that
/// direction is one change, so a steady slide after one bounce counts every
/// step (`[10, 12, 11, 10, 9]` gives 3), not the number of reversals.
/// Shifts and flips count on every pair.
pub fn analyze_sequence(prices: &[f64], config: DynamicsConfig) -> MarketDynamics {
    let mut dynamics = MarketDynamics::default();
    let mut established: Option<i8> = None;

    for pair in prices.windows(2) {
        let (prev, cur) = (pair[0], pair[1]);
        let direction: i8 = if cur >= prev { 1 } else { -1 };
        match established {
            None => established = Some(direction),
            Some(d) if d != direction => dynamics.direction_changes += 1,
            Some(_) => {}
        }

        let (lo, hi) = if prev <= cur { (prev, cur) } else { (cur, prev) };
        if hi / lo > config.big_shift_ratio {
            dynamics.big_shifts += 1;
        }
        if lo < config.flip_threshold && config.flip_threshold < hi {
            dynamics.consensus_flips += 1;
        }
    }

    dynamics
}

/// Per-bookmaker analysis of time-ordered quotes, summed
pub fn analyze(quotes: &[Quote], config: DynamicsConfig) -> MarketDynamics {
    let mut bookies: Vec<&str> = Vec::new();
    for quote in quotes {
        if !bookies.contains(&quote.bookie.as_str()) {
            bookies.push(quote.bookie.as_str());
        }
    }

    let mut total = MarketDynamics::default();
    for bookie in bookies {
        let prices: Vec<f64> = quotes
            .iter()
            .filter(|q| q.bookie == bookie)
            .map(|q| q.odds)
            .collect();
        total += analyze_sequence(&prices, config);
    }
    total
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;

    fn run(prices: &[f64]) -> MarketDynamics {
        analyze_sequence(prices, DynamicsConfig::default())
    }

    #[test]
    fn test_direction_changes_against_established_direction() {
        // 10->12 sets up, 12->11 reverses it, 11->14 moves with it again
        assert_eq!(run(&[10.0, 12.0, 11.0, 14.0]).direction_changes, 1);
        assert_eq!(run(&[10.0, 9.0, 8.0, 9.0, 10.0]).direction_changes, 2);
        // Flat steps count as up
        assert_eq!(run(&[10.0, 10.0, 10.0]).direction_changes, 0);
    }

    #[test]
    fn test_steady_slide_counts_each_step_against_opening_direction() {
        // One bounce at the top, then three falls against the opening rise
        let dynamics = run(&[10.0, 12.0, 11.0, 10.0, 9.0]);
        assert_eq!(dynamics.direction_changes, 3);
        // Reversing back up after the slide adds nothing
        assert_eq!(run(&[10.0, 12.0, 11.0, 10.0, 9.0, 13.0]).direction_changes, 3);
    }

    #[test]
    fn test_first_pair_only_establishes_direction() {
        assert_eq!(run(&[10.0, 8.0]).direction_changes, 0);
        assert_eq!(run(&[10.0]).direction_changes, 0);
        assert_eq!(run(&[]), MarketDynamics::default());
    }

    #[test]
    fn test_big_shift_threshold_is_strict() {
        assert_eq!(run(&[10.0, 11.5]).big_shifts, 1);
        assert_eq!(run(&[10.0, 11.0]).big_shifts, 0);
        assert_eq!(run(&[11.5, 10.0]).big_shifts, 1);
    }

    #[test]
    fn test_consensus_flip_requires_straddle() {
        assert_eq!(run(&[1.8, 2.2]).consensus_flips, 1);
        assert_eq!(run(&[2.2, 1.8, 2.0]).consensus_flips, 1);
        assert_eq!(run(&[2.0, 2.5]).consensus_flips, 0);
    }

    #[test]
    fn test_bookies_analyzed_separately() {
        let t0 = Utc.with_ymd_and_hms(2022, 1, 1, 10, 0, 0).unwrap();
        let quotes = vec![
            Quote::new(1.8, "a", t0),
            Quote::new(2.5, "b", t0 + Duration::minutes(1)),
            Quote::new(2.2, "a", t0 + Duration::minutes(2)),
            Quote::new(2.4, "b", t0 + Duration::minutes(3)),
        ];
        let dynamics = analyze(&quotes, DynamicsConfig::default());
        // a: 1.8->2.2 is a big shift and a flip; b: 2.5->2.4 neither.
        // Interleaving the bookies would have produced more.
        assert_eq!(
            dynamics,
            MarketDynamics {
                direction_changes: 0,
                big_shifts: 1,
                consensus_flips: 1,
            }
        );
    }
}
