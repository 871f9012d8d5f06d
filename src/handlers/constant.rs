//! Handler family for constant-output models.
//!
//! [`ConstantModel`] is a fitted mean predictor: whatever the input row, it
//! predicts one stored value. It doubles as the mock model used throughout
//! the tests, the same role a dummy regressor plays upstream of a real
//! deployment.

use super::{HandlerInput, ModelHandler};
use crate::error::Result;
use crate::meta::PackageSpec;
use crate::prototype::SampleData;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// A model that always predicts the same value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstantModel {
    pub value: f64,
}

impl ConstantModel {
    pub fn new(value: f64) -> Self {
        Self { value }
    }

    /// Fit to a target column by taking its mean.
    pub fn fit(targets: &[f64]) -> Self {
        if targets.is_empty() {
            return Self::new(0.0);
        }
        let mean = targets.iter().sum::<f64>() / targets.len() as f64;
        Self::new(mean)
    }
}

/// Handler for [`ConstantModel`].
#[derive(Debug)]
pub struct ConstantHandler {
    model: ConstantModel,
    sample: Option<SampleData>,
}

impl ConstantHandler {
    pub fn new(model: ConstantModel, sample: Option<SampleData>) -> Self {
        Self { model, sample }
    }

    pub fn model(&self) -> &ConstantModel {
        &self.model
    }
}

impl ModelHandler for ConstantHandler {
    fn family(&self) -> &'static str {
        "constant"
    }

    fn describe(&self) -> String {
        format!("Constant model; every prediction is {}", self.model.value)
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
        Ok(vec![json!(self.model.value); input.cardinality()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::DataTable;

    #[test]
    fn test_fit_takes_mean() {
        let model = ConstantModel::fit(&[1.0, 2.0, 3.0]);
        assert_eq!(model.value, 2.0);
        assert_eq!(ConstantModel::fit(&[]).value, 0.0);
    }

    #[test]
    fn test_predict_matches_cardinality() {
        let handler = ConstantHandler::new(ConstantModel::new(4.0), None);

        let table = DataTable::from_rows(
            vec!["x".into()],
            vec![vec![json!(1)], vec![json!(2)], vec![json!(3)]],
        )
        .unwrap();

        let predictions = handler.predict(HandlerInput::Table(table)).unwrap();
        assert_eq!(predictions, vec![json!(4.0), json!(4.0), json!(4.0)]);
    }

    #[test]
    fn test_encode_round_trips() {
        let handler = ConstantHandler::new(ConstantModel::new(4.5), None);
        let payload = handler.encode_model().unwrap();
        let decoded: ConstantModel = serde_json::from_slice(&payload).unwrap();
        assert_eq!(decoded, ConstantModel::new(4.5));
    }
}
