//! Wagering-market feature extraction
//!
//! Turns an identifier's scattered bookmaker quotes into odds features.

pub mod dynamics;
pub mod efficiency;
pub mod odds;
pub mod quotes;
pub mod resample;
pub mod summary;

pub use dynamics::{DynamicsConfig, MarketDynamics};
pub use efficiency::{EfficiencyTracker, ScoredEntity};
pub use odds::{feature_columns, OddsFeatures};
pub use quotes::{collect_quotes, Quote};
pub use resample::{reconcile, Consensus};
pub use summary::{summarize, QuoteSummary};
