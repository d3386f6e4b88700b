//! Column layout of the tracked entities in an event row

use serde::{Deserialize, Serialize};

use crate::EntityType;

/// Where one bookmaker's quote for an entity lives in a row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bet {
    /// Decimal odds
    pub odds_column: String,
    /// Bookmaker identity
    pub bookie_id_column: String,
    /// Time the quote was taken; the event time minus the default lead if absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dt_column: Option<String>,
}

impl Bet {
    pub fn new(odds_column: &str, bookie_id_column: &str, dt_column: Option<&str>) -> Self {
        Bet {
            odds_column: odds_column.to_string(),
            bookie_id_column: bookie_id_column.to_string(),
            dt_column: dt_column.map(str::to_string),
        }
    }

    /// Raw quote columns, all of which leak the market state at close
    pub fn columns(&self) -> Vec<&str> {
        let mut columns = vec![self.odds_column.as_str(), self.bookie_id_column.as_str()];
        if let Some(dt) = &self.dt_column {
            columns.push(dt.as_str());
        }
        columns
    }
}

/// One entity slot within an event row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifier {
    pub entity_type: EntityType,
    /// Entity id column
    pub column: String,
    /// Post-event statistics describing the entity (dropped before training)
    #[serde(default)]
    pub feature_columns: Vec<String>,
    /// Namespace for generated feature columns
    pub column_prefix: String,
    /// Outcome points; an identifier without one is never scored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points_column: Option<String>,
    #[serde(default)]
    pub bets: Vec<Bet>,
}

impl Identifier {
    pub fn new(entity_type: EntityType, column: &str, column_prefix: &str) -> Self {
        Identifier {
            entity_type,
            column: column.to_string(),
            feature_columns: Vec::new(),
            column_prefix: column_prefix.to_string(),
            points_column: None,
            bets: Vec::new(),
        }
    }

    pub fn with_points(mut self, points_column: &str) -> Self {
        self.points_column = Some(points_column.to_string());
        self
    }

    pub fn with_feature_columns(mut self, columns: &[&str]) -> Self {
        self.feature_columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_bet(mut self, bet: Bet) -> Self {
        self.bets.push(bet);
        self
    }
}
