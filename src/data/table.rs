//! Row-oriented event table
//!
//! A table is an ordered column list plus rows of heterogeneous cells. It is
//! read from and written to JSON in records orientation.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use chrono::{DateTime, Utc};

use super::timestamp::parse_timestamp;
use crate::{FeatureError, Result};

/// A single cell
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Number(f64),
    Text(String),
    /// Numeric sequence, e.g. a smoothed consensus history
    Series(Vec<f64>),
}

impl Value {
    /// Null, or a number that is not finite
    pub fn is_null(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Number(n) => !n.is_finite(),
            _ => false,
        }
    }

    /// Numeric view of the cell; numeric text is accepted, booleans are not
    pub fn as_f64(&self) -> Option<f64> {
        let n = match self {
            Value::Integer(i) => *i as f64,
            Value::Number(n) => *n,
            Value::Text(s) => s.trim().parse::<f64>().ok()?,
            Value::Null | Value::Bool(_) | Value::Series(_) => return None,
        };
        n.is_finite().then_some(n)
    }

    /// Identity view of the cell, used for bookmaker ids
    pub fn as_key(&self) -> Option<String> {
        match self {
            Value::Text(s) if !s.is_empty() => Some(s.clone()),
            Value::Integer(i) => Some(i.to_string()),
            Value::Number(n) if n.is_finite() => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self)
    }

    /// Float cell, or Null when absent or not finite
    pub fn from_opt(value: Option<f64>) -> Self {
        match value {
            Some(v) if v.is_finite() => Value::Number(v),
            _ => Value::Null,
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => n.as_f64().map(Value::Number).unwrap_or(Value::Null),
            },
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) => {
                let series: Option<Vec<f64>> = items.iter().map(|i| i.as_f64()).collect();
                match series {
                    Some(series) => Value::Series(series),
                    None => Value::Text(serde_json::Value::Array(items).to_string()),
                }
            }
            obj @ serde_json::Value::Object(_) => Value::Text(obj.to_string()),
        }
    }
}

impl From<&Value> for serde_json::Value {
    fn from(v: &Value) -> Self {
        let number = |n: f64| {
            serde_json::Number::from_f64(n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null)
        };
        match v {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Integer(i) => serde_json::Value::from(*i),
            Value::Number(n) => number(*n),
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Series(series) => {
                serde_json::Value::Array(series.iter().map(|n| number(*n)).collect())
            }
        }
    }
}

/// One event occurrence
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: HashMap<String, Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cell value, None when the column is absent from the row
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    /// Cell value when the column is present and not null
    pub fn get_present(&self, column: &str) -> Option<&Value> {
        self.values.get(column).filter(|v| !v.is_null())
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(column.into(), value.into());
    }

    pub fn with(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    fn remove(&mut self, column: &str) {
        self.values.remove(column);
    }
}

/// Ordered columns plus rows
#[derive(Debug, Clone, Default)]
pub struct Table {
    columns: Vec<String>,
    known: HashSet<String>,
    rows: Vec<Row>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.known.contains(column)
    }

    fn register(&mut self, column: &str) {
        if self.known.insert(column.to_string()) {
            self.columns.push(column.to_string());
        }
    }

    /// Append a row, registering any unseen columns in row order of `order`
    pub fn push_row(&mut self, order: &[&str], row: Row) {
        for column in order {
            self.register(column);
        }
        let mut extra: Vec<&String> = row
            .values
            .keys()
            .filter(|c| !self.known.contains(c.as_str()))
            .collect();
        extra.sort();
        let extra: Vec<String> = extra.into_iter().cloned().collect();
        for column in &extra {
            self.register(column);
        }
        self.rows.push(row);
    }

    /// Merge computed cells into one row. Only adds or overwrites, never removes.
    pub fn commit(&mut self, index: usize, cells: Vec<(String, Value)>) -> Result<()> {
        if index >= self.rows.len() {
            return Err(FeatureError::Parse(format!(
                "Row index {} out of range for table of {} rows",
                index,
                self.rows.len()
            )));
        }
        for (column, value) in cells {
            self.register(&column);
            self.rows[index].values.insert(column, value);
        }
        Ok(())
    }

    /// Drop columns from the table and every row
    pub fn drop_columns(&mut self, columns: &HashSet<&str>) {
        self.columns.retain(|c| !columns.contains(c.as_str()));
        self.known.retain(|c| !columns.contains(c.as_str()));
        for row in &mut self.rows {
            for column in columns {
                row.remove(column);
            }
        }
    }

    /// Stable sort by a timestamp column; rows without a parseable time go last
    pub fn sort_by_time(&mut self, dt_column: &str) {
        self.rows.sort_by_key(|row| {
            let ts = row.get(dt_column).and_then(Value::as_datetime);
            (ts.is_none(), ts)
        });
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let records: Vec<serde_json::Map<String, serde_json::Value>> =
            serde_json::from_str(content)?;
        let mut table = Table::new();
        for record in records {
            let order: Vec<String> = record.keys().cloned().collect();
            let mut row = Row::new();
            for (column, value) in record {
                row.insert(column, Value::from(value));
            }
            let order: Vec<&str> = order.iter().map(String::as_str).collect();
            table.push_row(&order, row);
        }
        Ok(table)
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn to_json_string(&self) -> Result<String> {
        let records: Vec<serde_json::Value> = self
            .rows
            .iter()
            .map(|row| {
                let mut record = serde_json::Map::new();
                for column in &self.columns {
                    let value = row.get(column).unwrap_or(&Value::Null);
                    record.insert(column.clone(), serde_json::Value::from(value));
                }
                serde_json::Value::Object(record)
            })
            .collect();
        Ok(serde_json::to_string_pretty(&records)?)
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.to_json_string()?)?;
        Ok(())
    }
}
