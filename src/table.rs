//! Tabular values exchanged between the gateway, handlers, and client.
//!
//! [`DataTable`] is a minimal ordered rows-by-named-columns container. The
//! gateway assembles one from validated request records before invoking a
//! handler, and [`PredictClient`] parses prediction responses back into one.
//!
//! [`PredictClient`]: crate::client::PredictClient

use crate::error::{PlinthError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An ordered table of JSON values with named columns.
///
/// Column order is stable and meaningful: handlers see columns in the order
/// the prototype declares them, and rows in request order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataTable {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    /// Optional row labels, carried through from labeled client input.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    labels: Option<Vec<String>>,
}

impl DataTable {
    /// Create an empty table with the given column names.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            labels: None,
        }
    }

    /// Create a table from column names and rows, checking row widths.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self> {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Create a single-column table, the shape of a prediction result.
    pub fn single_column(name: &str, values: Vec<Value>) -> Self {
        Self {
            columns: vec![name.to_string()],
            rows: values.into_iter().map(|v| vec![v]).collect(),
            labels: None,
        }
    }

    /// Attach row labels. The label count must match the row count.
    pub fn with_labels(mut self, labels: Vec<String>) -> Result<Self> {
        if labels.len() != self.rows.len() {
            return Err(PlinthError::Internal(format!(
                "label count {} does not match row count {}",
                labels.len(),
                self.rows.len()
            )));
        }
        self.labels = Some(labels);
        Ok(self)
    }

    /// Append a row. The row width must match the column count.
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(PlinthError::Internal(format!(
                "row width {} does not match column count {}",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Column names, in declaration order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// All rows, in insertion order.
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Row labels, if any were attached.
    pub fn labels(&self) -> Option<&[String]> {
        self.labels.as_deref()
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    /// First row, if the table is non-empty.
    pub fn first_row(&self) -> Option<&[Value]> {
        self.rows.first().map(|r| r.as_slice())
    }

    /// All values of one column, if it exists.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|r| &r[idx]).collect())
    }

    /// Convert rows to name-to-value records, one per row.
    pub fn to_records(&self) -> Vec<serde_json::Map<String, Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect()
            })
            .collect()
    }
}

/// Human-readable name for a JSON value's type, for error messages.
pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "float",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_push_row_checks_width() {
        let mut table = DataTable::new(vec!["a".into(), "b".into()]);
        table.push_row(vec![json!(1), json!(2)]).unwrap();
        assert!(table.push_row(vec![json!(1)]).is_err());
        assert_eq!(table.n_rows(), 1);
    }

    #[test]
    fn test_column_access() {
        let table = DataTable::from_rows(
            vec!["x".into(), "y".into()],
            vec![vec![json!(1), json!("a")], vec![json!(2), json!("b")]],
        )
        .unwrap();

        let ys = table.column("y").unwrap();
        assert_eq!(ys, vec![&json!("a"), &json!("b")]);
        assert!(table.column("z").is_none());
    }

    #[test]
    fn test_to_records_preserves_order() {
        let table = DataTable::from_rows(
            vec!["b".into(), "a".into()],
            vec![vec![json!(1), json!(2)]],
        )
        .unwrap();

        let records = table.to_records();
        assert_eq!(records.len(), 1);
        let keys: Vec<&String> = records[0].keys().collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn test_labels_must_match_rows() {
        let table = DataTable::from_rows(vec!["x".into()], vec![vec![json!(1)]]).unwrap();
        assert!(table.clone().with_labels(vec!["r0".into()]).is_ok());
        assert!(table.with_labels(vec!["r0".into(), "r1".into()]).is_err());
    }

    #[test]
    fn test_json_type_name() {
        assert_eq!(json_type_name(&json!(1)), "integer");
        assert_eq!(json_type_name(&json!(1.5)), "float");
        assert_eq!(json_type_name(&json!("s")), "string");
        assert_eq!(json_type_name(&json!([1])), "array");
    }
}
