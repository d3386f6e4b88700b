//! Feature pipeline
//!
//! Runs the stages over a shared table in a fixed order: optional
//! chronological sort, the odds feature pass, then leakage removal.

pub mod bets;
pub mod remove;

pub use bets::{bet_process, BetsEngine, EngineSettings, PassSummary, RowFeatures};
pub use remove::{leakage_columns, remove_leakage};

use crate::data::Table;
use crate::{Config, Result};

/// Run the configured stages over `table`
pub fn process(table: &mut Table, config: &Config, remove: bool) -> Result<PassSummary> {
    if config.engine.sort_by_time {
        log::info!("Sorting {} rows by {}", table.len(), config.dt_column);
        table.sort_by_time(&config.dt_column);
    }

    let summary = if config.engine.use_bets_features {
        let summary = bet_process(table, config)?;
        log::info!(
            "Bets features: {} rows, {} identifiers scored, {} left missing",
            summary.rows,
            summary.scored,
            summary.degraded
        );
        summary
    } else {
        log::info!("Bets features disabled");
        PassSummary::default()
    };

    if remove {
        remove_leakage(table, &config.identifiers);
    }

    Ok(summary)
}
