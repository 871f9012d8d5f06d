//! Caller-side client for a serving gateway.
//!
//! [`PredictClient`] normalizes heterogeneous caller input into the
//! gateway's canonical batch wire format, issues the request, and parses the
//! response back into a [`DataTable`] whose row count matches the input's.
//!
//! Failures are split so callers can branch: server-reported validation
//! failures come back as [`PlinthError::SchemaValidation`] ("my data was
//! wrong"), everything else on the wire as [`PlinthError::Transport`] ("the
//! service was unreachable or broken").
//!
//! The gateway imposes no prediction timeout of its own, so the request
//! timeout configured here is the caller's backstop against slow inference.

use crate::error::{PlinthError, Result};
use crate::meta::Metadata;
use crate::table::{json_type_name, DataTable};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::debug;

/// Default connection timeout for client requests.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default request timeout for client operations.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Caller input shapes the client can normalize.
#[derive(Debug, Clone)]
pub enum ClientInput {
    /// One record.
    Record(Map<String, Value>),
    /// A list of records.
    Batch(Vec<Map<String, Value>>),
    /// A tabular frame; each row becomes one record and frame labels are
    /// carried into the result.
    Frame(DataTable),
    /// One record with a row label carried into the result.
    Labeled(String, Map<String, Value>),
}

impl ClientInput {
    /// Classify a JSON value into an input shape.
    pub fn from_json(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(ClientInput::Record(map)),
            Value::Array(items) => {
                let mut records = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::Object(map) => records.push(map),
                        other => {
                            return Err(PlinthError::SchemaValidation(format!(
                                "cannot build predict input from a list of {}; \
                                 expected records",
                                json_type_name(&other)
                            )))
                        }
                    }
                }
                Ok(ClientInput::Batch(records))
            }
            other => Err(PlinthError::SchemaValidation(format!(
                "cannot build predict input from {}; expected a record, a list \
                 of records, a frame, or a labeled record",
                json_type_name(&other)
            ))),
        }
    }

    /// Canonical batch form: the record list sent on the wire, plus any row
    /// labels to restore on the result.
    fn wire_records(&self) -> (Vec<Value>, Option<Vec<String>>) {
        match self {
            ClientInput::Record(map) => (vec![Value::Object(map.clone())], None),
            ClientInput::Batch(records) => (
                records.iter().cloned().map(Value::Object).collect(),
                None,
            ),
            ClientInput::Frame(table) => (
                table.to_records().into_iter().map(Value::Object).collect(),
                table.labels().map(|l| l.to_vec()),
            ),
            ClientInput::Labeled(label, map) => (
                vec![Value::Object(map.clone())],
                Some(vec![label.clone()]),
            ),
        }
    }
}

#[derive(Deserialize)]
struct PredictResponse {
    predict: Vec<Value>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
    detail: String,
}

/// Client for a serving gateway.
#[derive(Clone)]
pub struct PredictClient {
    base_url: String,
    client: Client,
}

impl PredictClient {
    /// Create a client with default timeouts.
    pub fn new(base_url: &str) -> Self {
        Self::with_timeouts(base_url, DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create a client with custom timeouts.
    pub fn with_timeouts(
        base_url: &str,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Self {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Check gateway health.
    pub async fn ping(&self) -> Result<bool> {
        let url = format!("{}/ping", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PlinthError::Transport(e.to_string()))?;
        Ok(response.status().is_success())
    }

    /// Fetch the record's metadata.
    pub async fn metadata(&self) -> Result<Metadata> {
        let url = format!("{}/metadata", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PlinthError::Transport(e.to_string()))?;

        response
            .json()
            .await
            .map_err(|e| PlinthError::Transport(e.to_string()))
    }

    /// Fetch the input schema document, when the record has a prototype.
    pub async fn prototype(&self) -> Result<Value> {
        let url = format!("{}/prototype", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PlinthError::Transport(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(PlinthError::KeyNotFound("prototype".to_string()));
        }

        response
            .json()
            .await
            .map_err(|e| PlinthError::Transport(e.to_string()))
    }

    /// Request predictions from `/predict`.
    pub async fn predict(&self, input: &ClientInput) -> Result<DataTable> {
        self.call("predict", input).await
    }

    /// Request predictions from a custom endpoint on the same pipeline.
    pub async fn call(&self, endpoint: &str, input: &ClientInput) -> Result<DataTable> {
        let (records, labels) = input.wire_records();
        let expected = records.len();
        let url = format!("{}/{}", self.base_url, endpoint);
        debug!(url = %url, records = expected, "sending predict request");

        let response = self
            .client
            .post(&url)
            .json(&records)
            .send()
            .await
            .map_err(|e| PlinthError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_client_error() {
            let body = response
                .text()
                .await
                .map_err(|e| PlinthError::Transport(e.to_string()))?;
            if let Ok(err) = serde_json::from_str::<ErrorBody>(&body) {
                if err.error == "validation" {
                    return Err(PlinthError::SchemaValidation(err.detail));
                }
            }
            return Err(PlinthError::Transport(format!("{} from {}: {}", status, url, body)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PlinthError::Transport(format!("{} from {}: {}", status, url, body)));
        }

        let parsed: PredictResponse = response
            .json()
            .await
            .map_err(|e| PlinthError::Transport(e.to_string()))?;

        if parsed.predict.len() != expected {
            return Err(PlinthError::Transport(format!(
                "response carries {} predictions for {} records",
                parsed.predict.len(),
                expected
            )));
        }

        let table = DataTable::single_column("predict", parsed.predict);
        match labels {
            Some(labels) => table.with_labels(labels),
            None => Ok(table),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_from_json_classification() {
        assert!(matches!(
            ClientInput::from_json(json!({"a": 1})).unwrap(),
            ClientInput::Record(_)
        ));
        assert!(matches!(
            ClientInput::from_json(json!([{"a": 1}, {"a": 2}])).unwrap(),
            ClientInput::Batch(_)
        ));

        let err = ClientInput::from_json(json!(3.5)).unwrap_err();
        assert!(matches!(err, PlinthError::SchemaValidation(_)));
        assert!(err.to_string().contains("float"));
    }

    #[test]
    fn test_wire_records_shapes() {
        let (records, labels) =
            ClientInput::Record(record(json!({"a": 1}))).wire_records();
        assert_eq!(records.len(), 1);
        assert!(labels.is_none());

        let table = DataTable::from_rows(
            vec!["a".into()],
            vec![vec![json!(1)], vec![json!(2)]],
        )
        .unwrap()
        .with_labels(vec!["r0".into(), "r1".into()])
        .unwrap();
        let (records, labels) = ClientInput::Frame(table).wire_records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], json!({"a": 1}));
        assert_eq!(labels.unwrap(), vec!["r0", "r1"]);

        let (records, labels) =
            ClientInput::Labeled("row-9".into(), record(json!({"a": 1}))).wire_records();
        assert_eq!(records.len(), 1);
        assert_eq!(labels.unwrap(), vec!["row-9"]);
    }

    #[test]
    fn test_base_url_trimmed() {
        let client = PredictClient::new("http://127.0.0.1:8080/");
        assert_eq!(client.base_url, "http://127.0.0.1:8080");
    }
}
