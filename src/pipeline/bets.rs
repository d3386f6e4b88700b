//! Odds feature pass over an event table
//!
//! Visits rows in table order. For each row every identifier's quotes are
//! collected, reconciled, analyzed and summarized, the features are committed
//! to the row, and only then is the row folded into the efficiency history.

use chrono::{DateTime, Duration, Utc};

use crate::data::{Row, Table, Value};
use crate::features::resample::reconcile;
use crate::features::{
    collect_quotes, dynamics, summarize, DynamicsConfig, EfficiencyTracker, OddsFeatures,
    ScoredEntity,
};
use crate::{Config, EngineConfig, Identifier, Result};

/// Engine settings resolved into time units
#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
    pub bucket_width: Duration,
    pub ewm_alpha: f64,
    pub default_quote_lead: Duration,
    pub window: Duration,
    pub max_quote_age: Duration,
    pub dynamics: DynamicsConfig,
}

/// Assumes `config` passed [`Config::validate`]
impl From<&EngineConfig> for EngineSettings {
    fn from(config: &EngineConfig) -> Self {
        EngineSettings {
            bucket_width: Duration::minutes(config.bucket_minutes),
            ewm_alpha: config.ewm_alpha,
            default_quote_lead: Duration::minutes(config.default_quote_lead_minutes),
            window: Duration::hours(config.window_hours),
            max_quote_age: Duration::hours(config.max_quote_age_hours),
            dynamics: DynamicsConfig {
                big_shift_ratio: config.big_shift_ratio,
                flip_threshold: config.flip_threshold,
            },
        }
    }
}

/// Why an identifier got no features for a row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Skip {
    NoPointsColumn,
    NoPoints,
    NoQuotes,
    NoEventTime,
}

/// Features computed for one row, not yet folded
#[derive(Debug, Clone)]
pub struct RowFeatures {
    /// Cells for every configured identifier, in identifier order
    pub cells: Vec<(String, Value)>,
    /// Identifiers that were scored, in identifier order
    pub scored: Vec<ScoredEntity>,
    /// Identifiers whose features are all missing
    pub degraded: usize,
}

/// Totals for one pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub rows: usize,
    pub scored: usize,
    pub degraded: usize,
    /// Entries in the efficiency history at the end of the pass
    pub history: usize,
}

/// Stateful odds feature computer for one pass
pub struct BetsEngine<'a> {
    identifiers: &'a [Identifier],
    dt_column: &'a str,
    settings: EngineSettings,
    efficiency: EfficiencyTracker,
    last_event_dt: Option<DateTime<Utc>>,
    order_warned: bool,
}

impl<'a> BetsEngine<'a> {
    pub fn new(
        identifiers: &'a [Identifier],
        dt_column: &'a str,
        settings: EngineSettings,
    ) -> Self {
        BetsEngine {
            identifiers,
            dt_column,
            settings,
            efficiency: EfficiencyTracker::new(),
            last_event_dt: None,
            order_warned: false,
        }
    }

    pub fn from_config(config: &'a Config) -> Self {
        Self::new(
            &config.identifiers,
            &config.dt_column,
            EngineSettings::from(&config.engine),
        )
    }

    pub fn efficiency(&self) -> &EfficiencyTracker {
        &self.efficiency
    }

    /// Compute a row's features from history strictly before it (call BEFORE fold)
    pub fn score_row(&mut self, row: &Row) -> RowFeatures {
        let event_dt = row.get_present(self.dt_column).and_then(Value::as_datetime);
        match event_dt {
            Some(dt) => self.check_order(dt),
            None => log::warn!(
                "Row has no usable event time in {}; odds features left missing",
                self.dt_column
            ),
        }

        let price_efficiency = self.efficiency.price_efficiency();
        let mut features = RowFeatures {
            cells: Vec::new(),
            scored: Vec::new(),
            degraded: 0,
        };

        for identifier in self.identifiers {
            let result = event_dt
                .ok_or(Skip::NoEventTime)
                .and_then(|dt| self.score_identifier(row, identifier, dt, price_efficiency));
            match result {
                Ok((odds, scored)) => {
                    features.cells.extend(odds.to_cells(&identifier.column_prefix));
                    features.scored.push(scored);
                }
                Err(skip) => {
                    log::debug!(
                        "No odds features for {} ({}): {:?}",
                        identifier.column_prefix,
                        identifier.entity_type,
                        skip
                    );
                    features
                        .cells
                        .extend(OddsFeatures::missing_cells(&identifier.column_prefix));
                    features.degraded += 1;
                }
            }
        }

        features
    }

    /// Fold a committed row's scored identifiers into the history
    pub fn fold(&mut self, scored: &[ScoredEntity]) {
        self.efficiency.fold_row(scored);
    }

    fn check_order(&mut self, dt: DateTime<Utc>) {
        if let Some(last) = self.last_event_dt {
            if dt < last && !self.order_warned {
                log::warn!(
                    "Event times go backwards ({} after {}); price efficiency assumes chronological rows",
                    dt,
                    last
                );
                self.order_warned = true;
            }
        }
        self.last_event_dt = Some(self.last_event_dt.map_or(dt, |last| last.max(dt)));
    }

    fn score_identifier(
        &self,
        row: &Row,
        identifier: &Identifier,
        event_dt: DateTime<Utc>,
        price_efficiency: Option<f64>,
    ) -> std::result::Result<(OddsFeatures, ScoredEntity), Skip> {
        let points_column = identifier
            .points_column
            .as_deref()
            .ok_or(Skip::NoPointsColumn)?;
        let points = row
            .get_present(points_column)
            .and_then(Value::as_f64)
            .ok_or(Skip::NoPoints)?;

        let quotes = collect_quotes(
            row,
            identifier,
            event_dt,
            self.settings.default_quote_lead,
            self.settings.max_quote_age,
        );
        let consensus = reconcile(&quotes, self.settings.bucket_width).ok_or(Skip::NoQuotes)?;
        let final_odds = consensus.final_odds().ok_or(Skip::NoQuotes)?;
        let market = dynamics::analyze(&quotes, self.settings.dynamics);
        let summary = summarize(&quotes, event_dt, self.settings.window).ok_or(Skip::NoQuotes)?;

        let odds = OddsFeatures {
            summary,
            dynamics: market,
            ewm: consensus.smoothed(self.settings.ewm_alpha),
            consensus: final_odds,
            price_efficiency,
        };
        Ok((odds, ScoredEntity { final_odds, points }))
    }
}

/// Run the odds feature pass over `table` in row order
pub fn bet_process(table: &mut Table, config: &Config) -> Result<PassSummary> {
    config.validate()?;
    let mut engine = BetsEngine::from_config(config);
    let mut summary = PassSummary::default();

    for index in 0..table.len() {
        let RowFeatures {
            cells,
            scored,
            degraded,
        } = engine.score_row(&table.rows()[index]);
        table.commit(index, cells)?;
        engine.fold(&scored);

        summary.rows += 1;
        summary.scored += scored.len();
        summary.degraded += degraded;
        if summary.rows % 10_000 == 0 {
            log::info!("Bets features: {} rows processed", summary.rows);
        }
    }

    summary.history = engine.efficiency().len();
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Bet, EntityType, FeatureError};

    fn make_config() -> Config {
        let team = |idx: usize| {
            let prefix = format!("teams/{}", idx);
            Identifier::new(EntityType::Team, &format!("{}/id", prefix), &prefix)
                .with_points(&format!("{}/points", prefix))
                .with_bet(Bet::new(
                    &format!("{}/odds/0/odds", prefix),
                    &format!("{}/odds/0/bookie", prefix),
                    None,
                ))
        };
        Config {
            dt_column: "dt".to_string(),
            engine: EngineConfig::default(),
            identifiers: vec![team(0), team(1)],
        }
    }

    fn make_row(day: u32, odds: [f64; 2], points: [Value; 2]) -> Row {
        let [p0, p1] = points;
        Row::new()
            .with("dt", format!("2022-01-{:02}", day).as_str())
            .with("teams/0/id", "0")
            .with("teams/0/points", p0)
            .with("teams/0/odds/0/odds", odds[0])
            .with("teams/0/odds/0/bookie", "bet365")
            .with("teams/1/id", "1")
            .with("teams/1/points", p1)
            .with("teams/1/odds/0/odds", odds[1])
            .with("teams/1/odds/0/bookie", "bet365")
    }

    fn make_table(rows: Vec<Row>) -> Table {
        let mut table = Table::new();
        for row in rows {
            table.push_row(&["dt"], row);
        }
        table
    }

    fn three_rows() -> Vec<Row> {
        vec![
            make_row(1, [10.0, 20.0], [Value::from(50.0), Value::from(60.0)]),
            make_row(2, [20.0, 40.0], [Value::from(100.0), Value::from(120.0)]),
            make_row(3, [30.0, 60.0], [Value::from(150.0), Value::from(180.0)]),
        ]
    }

    fn cell<'t>(table: &'t Table, row: usize, column: &str) -> &'t Value {
        table.rows()[row].get(column).unwrap()
    }

    #[test]
    fn test_three_row_price_efficiency_uses_only_prior_rows() {
        let config = make_config();
        let table = make_table(three_rows());
        let mut engine = BetsEngine::from_config(&config);

        let first = engine.score_row(&table.rows()[0]);
        engine.fold(&first.scored);
        let second = engine.score_row(&table.rows()[1]);
        engine.fold(&second.scored);

        let third = engine.score_row(&table.rows()[2]);
        assert_eq!(engine.efficiency().len(), 4);

        // Team 1 outscores team 0 in both prior rows
        let pairs = [(0.1, 0.0), (0.05, 1.0), (0.05, 0.0), (0.025, 1.0)];
        let expected = pairs.iter().map(|(p, y)| (p - y) * (p - y)).sum::<f64>() / 4.0;
        let efficiency = third
            .cells
            .iter()
            .find(|(c, _)| c == "teams/0/odds/priceefficiency")
            .map(|(_, v)| v.clone())
            .unwrap();
        match efficiency {
            Value::Number(v) => assert!((v - expected).abs() < 1e-12),
            other => panic!("expected number, got {:?}", other),
        }

        engine.fold(&third.scored);
        assert_eq!(engine.efficiency().len(), 6);
    }

    #[test]
    fn test_bet_process_writes_features() {
        let config = make_config();
        let mut table = make_table(three_rows());
        let summary = bet_process(&mut table, &config).unwrap();

        assert_eq!(
            summary,
            PassSummary {
                rows: 3,
                scored: 6,
                degraded: 0,
                history: 6,
            }
        );
        assert_eq!(cell(&table, 0, "teams/0/odds/priceefficiency"), &Value::Null);
        assert!(matches!(
            cell(&table, 1, "teams/1/odds/priceefficiency"),
            Value::Number(_)
        ));
        assert_eq!(cell(&table, 1, "teams/0/odds"), &Value::Number(20.0));
        assert_eq!(
            cell(&table, 1, "teams/0/odds/ewm"),
            &Value::Series(vec![20.0])
        );
        // Input columns are untouched
        assert_eq!(cell(&table, 2, "teams/1/odds/0/odds"), &Value::Number(60.0));
    }

    #[test]
    fn test_single_quote_features() {
        let config = make_config();
        let mut table = make_table(vec![three_rows().remove(0)]);
        bet_process(&mut table, &config).unwrap();

        assert_eq!(cell(&table, 0, "teams/0/odds/spread"), &Value::Number(0.0));
        assert_eq!(cell(&table, 0, "teams/0/odds/bookies"), &Value::Integer(1));
        assert_eq!(cell(&table, 0, "teams/0/odds/directchanges"), &Value::Integer(0));
        assert_eq!(cell(&table, 0, "teams/0/odds/bigshifts"), &Value::Integer(0));
        assert_eq!(cell(&table, 0, "teams/0/odds/samples"), &Value::Integer(1));
        assert_eq!(cell(&table, 0, "teams/0/odds/roc"), &Value::Number(0.0));
        assert_eq!(cell(&table, 0, "teams/0/odds/roc1day"), &Value::Number(0.0));
    }

    #[test]
    fn test_null_outcome_leaves_identifier_missing() {
        let config = make_config();
        let mut rows = three_rows();
        rows[0] = make_row(1, [10.0, 20.0], [Value::Null, Value::from(60.0)]);
        let table = make_table(rows);
        let mut engine = BetsEngine::from_config(&config);

        let features = engine.score_row(&table.rows()[0]);
        assert_eq!(features.degraded, 1);
        assert_eq!(features.scored.len(), 1);
        let team0: Vec<&Value> = features
            .cells
            .iter()
            .filter(|(c, _)| c.starts_with("teams/0/"))
            .map(|(_, v)| v)
            .collect();
        assert_eq!(team0.len(), 16);
        assert!(team0.iter().all(|v| **v == Value::Null));

        engine.fold(&features.scored);
        // Only team 1 was appended, and as the row's sole scored entity it won
        assert_eq!(engine.efficiency().probabilities(), &[0.05]);
        assert_eq!(engine.efficiency().outcomes(), &[1.0]);
    }

    #[test]
    fn test_identifier_without_quotes_is_missing() {
        let mut config = make_config();
        config.identifiers[1].bets.clear();
        let mut table = make_table(three_rows());
        let summary = bet_process(&mut table, &config).unwrap();

        assert_eq!(summary.degraded, 3);
        assert_eq!(summary.history, 3);
        assert_eq!(cell(&table, 1, "teams/1/odds/samples"), &Value::Null);
        assert_eq!(cell(&table, 1, "teams/1/odds"), &Value::Null);
    }

    #[test]
    fn test_missing_event_time_degrades_row() {
        let config = make_config();
        let mut rows = three_rows();
        rows[1].insert("dt", Value::Null);
        let mut table = make_table(rows);
        let summary = bet_process(&mut table, &config).unwrap();

        assert_eq!(summary.degraded, 2);
        assert_eq!(summary.history, 4);
        assert_eq!(cell(&table, 1, "teams/0/odds"), &Value::Null);
    }

    #[test]
    fn test_bet_process_rejects_invalid_engine_config() {
        let mut config = make_config();
        config.engine.bucket_minutes = 1_000_000_000_000_000;
        let mut table = make_table(three_rows());
        assert!(matches!(
            bet_process(&mut table, &config),
            Err(FeatureError::Config(_))
        ));
        // Nothing was written
        assert!(!table.has_column("teams/0/odds"));
    }

    #[test]
    fn test_boolean_outcome_leaves_identifier_missing() {
        let config = make_config();
        let mut table = make_table(vec![make_row(
            1,
            [10.0, 20.0],
            [Value::Bool(true), Value::from(60.0)],
        )]);
        let summary = bet_process(&mut table, &config).unwrap();

        assert_eq!(summary.degraded, 1);
        assert_eq!(summary.history, 1);
        assert_eq!(cell(&table, 0, "teams/0/odds"), &Value::Null);
    }

    #[test]
    fn test_far_future_quote_time_is_dropped() {
        let mut config = make_config();
        config.identifiers[0].bets[0].dt_column = Some("teams/0/odds/0/dt".to_string());
        config.identifiers[0].bets.push(Bet::new(
            "teams/0/odds/1/odds",
            "teams/0/odds/1/bookie",
            Some("teams/0/odds/1/dt"),
        ));

        // Epoch microseconds for 2021-12-31T23:00:00Z, and a quote years after the event
        let mut row = make_row(1, [2.0, 1.8], [Value::from(1.0), Value::from(2.0)]);
        row.insert("teams/0/odds/0/dt", 1_640_991_600_000_000i64);
        row.insert("teams/0/odds/1/odds", 3.0);
        row.insert("teams/0/odds/1/bookie", "pinnacle");
        row.insert("teams/0/odds/1/dt", "2031-06-01T00:00:00Z");
        let mut table = make_table(vec![row]);
        bet_process(&mut table, &config).unwrap();

        assert_eq!(cell(&table, 0, "teams/0/odds/samples"), &Value::Integer(1));
        assert_eq!(cell(&table, 0, "teams/0/odds"), &Value::Number(2.0));
    }

    #[test]
    fn test_deterministic() {
        let config = make_config();
        let mut first = make_table(three_rows());
        let mut second = make_table(three_rows());
        bet_process(&mut first, &config).unwrap();
        bet_process(&mut second, &config).unwrap();
        assert_eq!(
            first.to_json_string().unwrap(),
            second.to_json_string().unwrap()
        );
    }

    #[test]
    fn test_no_lookahead() {
        let config = make_config();
        let mut original = make_table(three_rows());
        bet_process(&mut original, &config).unwrap();

        let mut rows = three_rows();
        rows[1] = make_row(2, [1.5, 9.0], [Value::from(500.0), Value::from(0.0)]);
        rows[2] = make_row(3, [3.0, 1.2], [Value::Null, Value::from(1.0)]);
        let mut perturbed = make_table(rows);
        bet_process(&mut perturbed, &config).unwrap();

        for column in ["teams/0/odds/priceefficiency", "teams/1/odds/priceefficiency"] {
            assert_eq!(cell(&original, 0, column), cell(&perturbed, 0, column));
            assert_eq!(cell(&original, 1, column), cell(&perturbed, 1, column));
        }
    }

    #[test]
    fn test_multi_bookie_consensus() {
        let mut config = make_config();
        config.identifiers[0].bets.push(Bet::new(
            "teams/0/odds/1/odds",
            "teams/0/odds/1/bookie",
            Some("teams/0/odds/1/dt"),
        ));
        config.identifiers[0].bets[0].dt_column = Some("teams/0/odds/0/dt".to_string());

        // Event at midnight: bookie a quotes 2.0 at 22:00 then its default at 23:00 (null dt);
        // bookie b quotes 2.4 at 22:30.
        let mut row = make_row(2, [2.0, 1.8], [Value::from(1.0), Value::from(2.0)]);
        row.insert("teams/0/odds/0/dt", Value::Null);
        row.insert("teams/0/odds/1/odds", 2.4);
        row.insert("teams/0/odds/1/bookie", "pinnacle");
        row.insert("teams/0/odds/1/dt", "2022-01-01T22:30:00Z");
        let mut table = make_table(vec![row]);
        bet_process(&mut table, &config).unwrap();

        assert_eq!(cell(&table, 0, "teams/0/odds/bookies"), &Value::Integer(2));
        assert_eq!(cell(&table, 0, "teams/0/odds/max"), &Value::Number(2.4));
        // Grid 22:30..23:00: only b until a's 23:00 quote, then the mean of both
        match cell(&table, 0, "teams/0/odds") {
            Value::Number(v) => assert!((v - 2.2).abs() < 1e-12),
            other => panic!("expected number, got {:?}", other),
        }
        match cell(&table, 0, "teams/0/odds/ewm") {
            Value::Series(series) => {
                assert_eq!(series.len(), 7);
                assert!((series[0] - 2.4).abs() < 1e-12);
                assert!((series[6] - (0.2 * 2.2 + 0.8 * 2.4)).abs() < 1e-12);
            }
            other => panic!("expected series, got {:?}", other),
        }
        // 2.4 at 22:30 then 2.0 at 23:00
        match cell(&table, 0, "teams/0/odds/mom") {
            Value::Number(v) => assert!((v + 0.4).abs() < 1e-12),
            other => panic!("expected number, got {:?}", other),
        }
    }
}
