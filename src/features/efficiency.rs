//! Causal forecast-efficiency tracking
//!
//! Pools the market's implied win probabilities and the realized results of
//! every scored entity seen so far. Read the score for a row BEFORE folding
//! that row in.

/// Running implied-probability vs outcome history for one pass
#[derive(Debug, Clone, Default)]
pub struct EfficiencyTracker {
    probabilities: Vec<f64>,
    outcomes: Vec<f64>,
}

/// A scored entity from one row: its final consensus odds and outcome points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredEntity {
    pub final_odds: f64,
    pub points: f64,
}

impl EfficiencyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mean squared error between pooled implied probabilities and outcomes.
    /// None until something has been folded in.
    pub fn price_efficiency(&self) -> Option<f64> {
        if self.probabilities.is_empty() {
            return None;
        }
        let sum: f64 = self
            .probabilities
            .iter()
            .zip(&self.outcomes)
            .map(|(p, y)| (p - y).powi(2))
            .sum();
        Some(sum / self.probabilities.len() as f64)
    }

    /// Fold a finished row (call AFTER its features are written).
    ///
    /// Each entity is a win when its points equal the row's maximum; ties
    /// all win. Order is preserved.
    pub fn fold_row(&mut self, scored: &[ScoredEntity]) {
        let best = scored
            .iter()
            .map(|s| s.points)
            .fold(f64::NEG_INFINITY, f64::max);
        for entity in scored {
            self.probabilities.push(1.0 / entity.final_odds);
            self.outcomes.push(if entity.points == best { 1.0 } else { 0.0 });
        }
    }

    pub fn len(&self) -> usize {
        self.probabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probabilities.is_empty()
    }

    pub fn probabilities(&self) -> &[f64] {
        &self.probabilities
    }

    pub fn outcomes(&self) -> &[f64] {
        &self.outcomes
    }
}
