//! Handler family for linear models.

use super::{HandlerInput, ModelHandler};
use crate::error::{PlinthError, Result};
use crate::meta::PackageSpec;
use crate::prototype::SampleData;
use crate::table::json_type_name;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// A linear model: intercept plus one weight per input feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub intercept: f64,
    pub weights: Vec<f64>,
}

impl LinearModel {
    pub fn new(intercept: f64, weights: Vec<f64>) -> Self {
        Self { intercept, weights }
    }

    /// Score one row. The row width must match the weight vector.
    pub fn score(&self, row: &[f64]) -> Result<f64> {
        if row.len() != self.weights.len() {
            return Err(PlinthError::HandlerExecution(format!(
                "expected {} features, got {}",
                self.weights.len(),
                row.len()
            )));
        }
        let dot: f64 = row.iter().zip(&self.weights).map(|(x, w)| x * w).sum();
        Ok(self.intercept + dot)
    }
}

/// Handler for [`LinearModel`].
#[derive(Debug)]
pub struct LinearHandler {
    model: LinearModel,
    sample: Option<SampleData>,
}

impl LinearHandler {
    pub fn new(model: LinearModel, sample: Option<SampleData>) -> Self {
        Self { model, sample }
    }

    pub fn model(&self) -> &LinearModel {
        &self.model
    }

    fn score_rows(&self, rows: Vec<Vec<f64>>) -> Result<Vec<Value>> {
        rows.iter()
            .map(|row| self.model.score(row).map(|y| json!(y)))
            .collect()
    }
}

impl ModelHandler for LinearHandler {
    fn family(&self) -> &'static str {
        "linear"
    }

    fn describe(&self) -> String {
        format!("Linear model with {} features", self.model.weights.len())
    }

    fn declared_package(&self) -> Option<PackageSpec> {
        Some(PackageSpec::pinned("plinth", env!("CARGO_PKG_VERSION")))
    }

    fn prototype_data(&self) -> Option<&SampleData> {
        self.sample.as_ref()
    }

    fn encode_model(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.model)?)
    }

    fn predict(&self, input: HandlerInput) -> Result<Vec<Value>> {
        match input {
            HandlerInput::Table(table) => {
                let mut rows = Vec::with_capacity(table.n_rows());
                for row in table.rows() {
                    let mut numeric = Vec::with_capacity(row.len());
                    for (value, column) in row.iter().zip(table.columns()) {
                        let x = value.as_f64().ok_or_else(|| {
                            PlinthError::HandlerExecution(format!(
                                "column {} holds a {}, not a number",
                                column,
                                json_type_name(value)
                            ))
                        })?;
                        numeric.push(x);
                    }
                    rows.push(numeric);
                }
                self.score_rows(rows)
            }
            HandlerInput::Raw(body) => {
                let rows = raw_rows(&body)?;
                self.score_rows(rows)
            }
        }
    }
}

/// Interpret an unvalidated body as feature rows: either one array of
/// numbers, or an array of such arrays.
fn raw_rows(body: &Value) -> Result<Vec<Vec<f64>>> {
    let items = body.as_array().ok_or_else(|| {
        PlinthError::HandlerExecution(format!(
            "raw input must be an array of numbers or an array of rows, got {}",
            json_type_name(body)
        ))
    })?;

    if items.iter().all(|v| v.is_array()) {
        let mut rows = Vec::with_capacity(items.len());
        for row in items {
            if let Some(values) = row.as_array() {
                rows.push(numeric_array(values)?);
            }
        }
        return Ok(rows);
    }

    Ok(vec![numeric_array(items)?])
}

fn numeric_array(values: &[Value]) -> Result<Vec<f64>> {
    values
        .iter()
        .map(|v| {
            v.as_f64().ok_or_else(|| {
                PlinthError::HandlerExecution(format!(
                    "expected a number, got {}",
                    json_type_name(v)
                ))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::DataTable;

    fn handler() -> LinearHandler {
        LinearHandler::new(LinearModel::new(1.0, vec![2.0, 3.0]), None)
    }

    #[test]
    fn test_score() {
        let model = LinearModel::new(1.0, vec![2.0, 3.0]);
        assert_eq!(model.score(&[1.0, 1.0]).unwrap(), 6.0);
        assert!(model.score(&[1.0]).is_err());
    }

    #[test]
    fn test_predict_from_table() {
        let table = DataTable::from_rows(
            vec!["a".into(), "b".into()],
            vec![vec![json!(1), json!(1)], vec![json!(0), json!(2)]],
        )
        .unwrap();

        let predictions = handler().predict(HandlerInput::Table(table)).unwrap();
        assert_eq!(predictions, vec![json!(6.0), json!(7.0)]);
    }

    #[test]
    fn test_predict_from_raw_rows() {
        let predictions = handler()
            .predict(HandlerInput::Raw(json!([[1, 1], [0, 2]])))
            .unwrap();
        assert_eq!(predictions, vec![json!(6.0), json!(7.0)]);

        // A flat array is one row.
        let predictions = handler()
            .predict(HandlerInput::Raw(json!([1, 1])))
            .unwrap();
        assert_eq!(predictions, vec![json!(6.0)]);
    }

    #[test]
    fn test_predict_rejects_non_numeric() {
        let table = DataTable::from_rows(
            vec!["a".into(), "b".into()],
            vec![vec![json!("x"), json!(1)]],
        )
        .unwrap();

        let err = handler().predict(HandlerInput::Table(table)).unwrap_err();
        assert!(matches!(err, PlinthError::HandlerExecution(_)));
        assert!(err.to_string().contains("column a"));
    }
}
