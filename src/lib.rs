//! Sports wagering-market features
//!
//! Turns historical event tables with embedded multi-bookmaker quotes into
//! model-ready odds features, carrying forecast-efficiency state causally
//! across rows.

pub mod data;
pub mod features;
pub mod identifier;
pub mod pipeline;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

pub use identifier::{Bet, Identifier};

/// Separator used when joining column name tokens
pub const DELIMITER: &str = "/";

/// Largest accepted resampling bucket (one day)
pub const MAX_BUCKET_MINUTES: i64 = 24 * 60;
/// Largest accepted window or quote age (ten years)
pub const MAX_SPAN_HOURS: i64 = 10 * 365 * 24;

/// What an identifier refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Team,
    Player,
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityType::Team => write!(f, "team"),
            EntityType::Player => write!(f, "player"),
        }
    }
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, FeatureError>;

/// Pipeline configuration loaded from config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Column holding the event timestamp
    pub dt_column: String,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub identifiers: Vec<Identifier>,
}

/// Tuning knobs for the odds feature engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Width of one resampling bucket
    pub bucket_minutes: i64,
    /// Smoothing factor for the consensus EMA
    pub ewm_alpha: f64,
    /// Quotes without a timestamp are placed this long before the event
    pub default_quote_lead_minutes: i64,
    /// Trailing window for the short-horizon rate of change
    pub window_hours: i64,
    /// Quotes further than this from the event time are dropped
    pub max_quote_age_hours: i64,
    /// Relative move (max/min) above which a step is a big shift
    pub big_shift_ratio: f64,
    /// Odds level whose crossing counts as a consensus flip
    pub flip_threshold: f64,
    /// Run the odds feature engine at all
    pub use_bets_features: bool,
    /// Stable-sort rows by event time before the pass
    pub sort_by_time: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            bucket_minutes: 5,
            ewm_alpha: 0.2,
            default_quote_lead_minutes: 60,
            window_hours: 24,
            max_quote_age_hours: 365 * 24,
            big_shift_ratio: 1.1,
            flip_threshold: 2.0,
            use_bets_features: true,
            sort_by_time: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let team = |idx: usize| {
            let prefix = format!("teams{DELIMITER}{idx}");
            let col = |name: &str| [prefix.as_str(), name].join(DELIMITER);
            Identifier {
                entity_type: EntityType::Team,
                column: col("id"),
                feature_columns: Vec::new(),
                column_prefix: prefix.clone(),
                points_column: Some(col("points")),
                bets: vec![Bet {
                    odds_column: col("odds/0/odds"),
                    bookie_id_column: col("odds/0/bookie"),
                    dt_column: Some(col("odds/0/dt")),
                }],
            }
        };
        Config {
            dt_column: "dt".to_string(),
            engine: EngineConfig::default(),
            identifiers: vec![team(0), team(1)],
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            FeatureError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| FeatureError::Toml(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| FeatureError::Toml(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        let engine = &self.engine;
        if !(1..=MAX_BUCKET_MINUTES).contains(&engine.bucket_minutes) {
            return Err(FeatureError::Config(format!(
                "bucket_minutes must be in 1..={}",
                MAX_BUCKET_MINUTES
            )));
        }
        if !(engine.ewm_alpha > 0.0 && engine.ewm_alpha <= 1.0) {
            return Err(FeatureError::Config(
                "ewm_alpha must be in (0, 1]".to_string(),
            ));
        }
        if !(1..=MAX_SPAN_HOURS).contains(&engine.window_hours) {
            return Err(FeatureError::Config(format!(
                "window_hours must be in 1..={}",
                MAX_SPAN_HOURS
            )));
        }
        if !(1..=MAX_SPAN_HOURS).contains(&engine.max_quote_age_hours) {
            return Err(FeatureError::Config(format!(
                "max_quote_age_hours must be in 1..={}",
                MAX_SPAN_HOURS
            )));
        }
        // The fallback quote time must itself be within the accepted age
        if !(0..=engine.max_quote_age_hours * 60).contains(&engine.default_quote_lead_minutes) {
            return Err(FeatureError::Config(
                "default_quote_lead_minutes must be in 0..=max_quote_age_hours * 60".to_string(),
            ));
        }
        if engine.big_shift_ratio <= 0.0 || engine.flip_threshold <= 0.0 {
            return Err(FeatureError::Config(
                "big_shift_ratio and flip_threshold must be positive".to_string(),
            ));
        }

        let mut prefixes = HashSet::new();
        for identifier in &self.identifiers {
            if !prefixes.insert(identifier.column_prefix.as_str()) {
                return Err(FeatureError::Config(format!(
                    "Duplicate column prefix: {}",
                    identifier.column_prefix
                )));
            }
        }
        Ok(())
    }
}
