//! Quote collection
//!
//! Pulls the valid bookmaker quotes for one identifier out of an event row.

use chrono::{DateTime, Duration, Utc};

use crate::data::Row;
use crate::Identifier;

/// A single bookmaker price for an entity
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    /// Decimal odds (always positive)
    pub odds: f64,
    pub bookie: String,
    pub dt: DateTime<Utc>,
}

impl Quote {
    pub fn new(odds: f64, bookie: &str, dt: DateTime<Utc>) -> Self {
        Quote {
            odds,
            bookie: bookie.to_string(),
            dt,
        }
    }
}

/// Collect the identifier's quotes from a row, ordered by time (stable).
///
/// Bets whose odds or bookmaker column is absent or null are skipped, as are
/// odds that are not positive. A missing or null quote time falls back to
/// `event_dt - default_lead`; a quote time that is present but unparseable,
/// or further than `max_age` from the event, drops that quote.
pub fn collect_quotes(
    row: &Row,
    identifier: &Identifier,
    event_dt: DateTime<Utc>,
    default_lead: Duration,
    max_age: Duration,
) -> Vec<Quote> {
    let fallback_dt = event_dt - default_lead;
    let mut quotes = Vec::with_capacity(identifier.bets.len());

    for bet in &identifier.bets {
        let Some(odds) = row.get_present(&bet.odds_column).and_then(|v| v.as_f64()) else {
            continue;
        };
        if odds <= 0.0 {
            log::debug!("Skipping non-positive odds {} in {}", odds, bet.odds_column);
            continue;
        }
        let Some(bookie) = row.get_present(&bet.bookie_id_column).and_then(|v| v.as_key())
        else {
            continue;
        };

        let dt = match bet.dt_column.as_deref().and_then(|c| row.get_present(c)) {
            None => fallback_dt,
            Some(value) => match value.as_datetime() {
                Some(dt) => dt,
                None => {
                    log::debug!(
                        "Skipping quote with unparseable time {:?} in {}",
                        value,
                        bet.dt_column.as_deref().unwrap_or_default()
                    );
                    continue;
                }
            },
        };
        let age = if dt > event_dt { dt - event_dt } else { event_dt - dt };
        if age > max_age {
            log::debug!(
                "Skipping quote at {} in {}: more than {}h from event at {}",
                dt,
                bet.odds_column,
                max_age.num_hours(),
                event_dt
            );
            continue;
        }

        quotes.push(Quote { odds, bookie, dt });
    }

    quotes.sort_by_key(|q| q.dt);
    quotes
}
