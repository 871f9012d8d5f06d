//! Mock data and models for tests and examples.

use crate::handlers::ConstantModel;
use crate::table::DataTable;
use rand::Rng;
use serde_json::json;

/// Arbitrary tabular data: 100 rows of integer columns B, C, and D.
pub fn mock_table() -> DataTable {
    let mut rng = rand::thread_rng();
    let mut table = DataTable::new(vec!["B".into(), "C".into(), "D".into()]);
    for _ in 0..100 {
        let row = vec![
            json!(rng.gen_range(0..100)),
            json!(rng.gen_range(0..100)),
            json!(rng.gen_range(0..100)),
        ];
        table.push_row(row).expect("row width matches columns");
    }
    table
}

/// Arbitrary target column matching [`mock_table`].
pub fn mock_targets() -> Vec<f64> {
    let mut rng = rand::thread_rng();
    (0..100).map(|_| rng.gen_range(0..100) as f64).collect()
}

/// Arbitrary model for testing: a constant predictor fit to mock targets.
pub fn mock_model() -> ConstantModel {
    ConstantModel::fit(&mock_targets())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prototype::{self, PrimitiveType, SampleData};

    #[test]
    fn test_mock_table_shape() {
        let table = mock_table();
        assert_eq!(table.n_rows(), 100);
        assert_eq!(table.columns(), ["B", "C", "D"]);
    }

    #[test]
    fn test_mock_table_synthesizes_integer_prototype() {
        let prototype = prototype::synthesize(&SampleData::Frame(mock_table())).unwrap();
        assert_eq!(prototype.len(), 3);
        for field in prototype.fields() {
            assert_eq!(field.ty, PrimitiveType::Integer);
        }
    }

    #[test]
    fn test_mock_model_predicts_mean() {
        let model = ConstantModel::fit(&[10.0, 20.0]);
        assert_eq!(model.value, 15.0);
        let _ = mock_model();
    }
}
