//! Event table storage and timestamp handling
//!
//! JSON-backed tables and UTC normalization of timestamp cells.

pub mod table;
pub mod timestamp;

pub use table::{Row, Table, Value};
pub use timestamp::parse_timestamp;
