//! Leakage column removal
//!
//! Raw quote columns and post-event statistics describe the market or the
//! result at close, so they are dropped once the features derived from them
//! have been written.

use std::collections::HashSet;

use crate::data::Table;
use crate::Identifier;

/// Columns the removal stage drops for these identifiers, in first-seen order
pub fn leakage_columns(identifiers: &[Identifier]) -> Vec<&str> {
    let mut seen = HashSet::new();
    let mut columns = Vec::new();
    for identifier in identifiers {
        let bet_columns = identifier.bets.iter().flat_map(|b| b.columns());
        for column in identifier
            .feature_columns
            .iter()
            .map(String::as_str)
            .chain(bet_columns)
        {
            if seen.insert(column) {
                columns.push(column);
            }
        }
    }
    columns
}

/// Drop every identifier's feature columns and raw bet columns from the table
pub fn remove_leakage(table: &mut Table, identifiers: &[Identifier]) -> usize {
    let columns: HashSet<&str> = leakage_columns(identifiers)
        .into_iter()
        .filter(|c| table.has_column(c))
        .collect();
    let dropped = columns.len();
    table.drop_columns(&columns);
    log::debug!("Removed {} leakage columns", dropped);
    dropped
}
