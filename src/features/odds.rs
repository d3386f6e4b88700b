//! Per-identifier odds feature record and its column naming

use super::dynamics::MarketDynamics;
use super::summary::QuoteSummary;
use crate::data::Value;
use crate::DELIMITER;

const ODDS: &str = "odds";

/// Output features in column order. `None` is the bare consensus column.
const FEATURES: [Option<&str>; 16] = [
    Some("max"),
    Some("min"),
    Some("mean"),
    Some("median"),
    Some("spread"),
    Some("bookies"),
    Some("roc"),
    Some("mom"),
    Some("directchanges"),
    Some("samples"),
    Some("ewm"),
    Some("bigshifts"),
    Some("consensusflips"),
    Some("roc1day"),
    None,
    Some("priceefficiency"),
];

fn column_name(prefix: &str, feature: Option<&str>) -> String {
    match feature {
        Some(feature) => [prefix, ODDS, feature].join(DELIMITER),
        None => [prefix, ODDS].join(DELIMITER),
    }
}

/// Names of every odds feature column written under `prefix`
pub fn feature_columns(prefix: &str) -> Vec<String> {
    FEATURES.iter().map(|f| column_name(prefix, *f)).collect()
}

/// Wagering features for one identifier in one row
#[derive(Debug, Clone, PartialEq)]
pub struct OddsFeatures {
    pub summary: QuoteSummary,
    pub dynamics: MarketDynamics,
    /// Smoothed consensus series
    pub ewm: Vec<f64>,
    /// Consensus at the last grid bucket
    pub consensus: f64,
    /// Error of the market's past forecasts; None before any history
    pub price_efficiency: Option<f64>,
}

impl OddsFeatures {
    /// Cells to merge into the row, in column order
    pub fn to_cells(&self, prefix: &str) -> Vec<(String, Value)> {
        let s = &self.summary;
        let d = &self.dynamics;
        let values = [
            Value::from(s.max),
            Value::from(s.min),
            Value::from(s.mean),
            Value::from(s.median),
            Value::from(s.spread),
            Value::Integer(s.bookies as i64),
            Value::from(s.rate_of_change),
            Value::from(s.momentum),
            Value::Integer(d.direction_changes as i64),
            Value::Integer(s.samples as i64),
            Value::Series(self.ewm.clone()),
            Value::Integer(d.big_shifts as i64),
            Value::Integer(d.consensus_flips as i64),
            Value::from(s.window_rate_of_change),
            Value::from(self.consensus),
            Value::from_opt(self.price_efficiency),
        ];
        feature_columns(prefix).into_iter().zip(values).collect()
    }

    /// Every feature column set to the missing sentinel
    pub fn missing_cells(prefix: &str) -> Vec<(String, Value)> {
        feature_columns(prefix)
            .into_iter()
            .map(|c| (c, Value::Null))
            .collect()
    }
}
