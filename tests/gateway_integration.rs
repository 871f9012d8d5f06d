//! Integration tests exercising the HTTP surface through the real client.

#[allow(dead_code)]
mod common;

use common::{demo_record, record_body, sample_mapping, spawn_gateway};
use plinth::{
    ClientInput, GatewayConfig, PlinthError, PredictClient, ServingGateway,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

async fn spawn_default() -> PredictClient {
    let gateway = ServingGateway::new(
        demo_record(Some(sample_mapping())),
        GatewayConfig::development(),
    );
    PredictClient::new(&spawn_gateway(gateway).await)
}

#[tokio::test]
async fn test_ping() {
    let client = spawn_default().await;
    assert!(client.ping().await.unwrap());
}

#[tokio::test]
async fn test_metadata_reports_packages_and_runtime_tag() {
    let client = spawn_default().await;
    let metadata = client.metadata().await.unwrap();

    assert!(metadata
        .required_pkgs
        .iter()
        .any(|p| p.starts_with("plinth@")));
    assert!(metadata.runtime_tag.is_some());
    assert!(metadata.version.is_none());
}

#[tokio::test]
async fn test_prototype_lists_sampled_fields() {
    let client = spawn_default().await;
    let doc = client.prototype().await.unwrap();

    let properties = doc["properties"].as_object().unwrap();
    let names: Vec<&str> = properties.keys().map(|k| k.as_str()).collect();
    assert_eq!(names, vec!["B", "C", "D"]);
    assert_eq!(properties["B"]["default"], json!(55));
    assert_eq!(properties["C"]["default"], json!(65));
    assert_eq!(properties["D"]["default"], json!(17));
    // Bookkeeping titles are stripped for clients.
    assert!(properties["B"].get("title").is_none());
}

#[tokio::test]
async fn test_predict_single_record() {
    let client = spawn_default().await;

    let input = ClientInput::Record(record_body(json!({"B": 0, "C": 0, "D": 0})));
    let result = client.predict(&input).await.unwrap();

    assert_eq!(result.n_rows(), 1);
    assert_eq!(result.columns(), ["predict"]);
    assert_eq!(result.rows()[0], vec![json!(3.0)]);
}

#[tokio::test]
async fn test_predict_batch_preserves_cardinality_and_order() {
    let client = spawn_default().await;

    let input = ClientInput::Batch(vec![
        record_body(json!({"B": 0, "C": 0, "D": 0})),
        record_body(json!({"B": 0, "C": 0, "D": 0})),
    ]);
    let result = client.predict(&input).await.unwrap();

    assert_eq!(result.n_rows(), 2);
    assert_eq!(result.rows()[0], result.rows()[1]);
}

#[tokio::test]
async fn test_validation_failure_is_typed_client_error() {
    let client = spawn_default().await;

    let input = ClientInput::Record(record_body(
        json!({"B": 0, "C": "not-a-number", "D": 0}),
    ));
    let err = client.predict(&input).await.unwrap_err();

    match err {
        PlinthError::SchemaValidation(detail) => {
            assert!(detail.contains("field C"));
            assert!(detail.contains("integer"));
        }
        other => panic!("expected SchemaValidation, got {:?}", other),
    }
}

#[tokio::test]
async fn test_validation_short_circuits_custom_transform() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);

    let mut gateway = ServingGateway::new(
        demo_record(Some(sample_mapping())),
        GatewayConfig::development(),
    );
    gateway
        .add_endpoint("counted", true, move |input| {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(vec![json!(0); input.cardinality()])
        })
        .unwrap();

    let client = PredictClient::new(&spawn_gateway(gateway).await);

    let invalid = ClientInput::Record(record_body(
        json!({"B": 0, "C": "not-a-number", "D": 0}),
    ));
    let err = client.call("counted", &invalid).await.unwrap_err();
    assert!(matches!(err, PlinthError::SchemaValidation(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let valid = ClientInput::Record(record_body(json!({"B": 0, "C": 0, "D": 0})));
    client.call("counted", &valid).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_custom_endpoint_shares_pipeline() {
    let mut gateway = ServingGateway::new(
        demo_record(Some(sample_mapping())),
        GatewayConfig::development(),
    );
    gateway
        .add_endpoint("width", true, |input| {
            Ok(vec![json!(3); input.cardinality()])
        })
        .unwrap();

    let client = PredictClient::new(&spawn_gateway(gateway).await);

    let input = ClientInput::Batch(vec![
        record_body(json!({"B": 1, "C": 2, "D": 3})),
        record_body(json!({"B": 4, "C": 5, "D": 6})),
    ]);
    let result = client.call("width", &input).await.unwrap();
    assert_eq!(result.n_rows(), 2);
    assert_eq!(result.rows()[0], vec![json!(3)]);
}

#[tokio::test]
async fn test_handler_error_is_request_scoped() {
    let mut gateway = ServingGateway::new(
        demo_record(Some(sample_mapping())),
        GatewayConfig::development(),
    );
    gateway
        .add_endpoint("fail", true, |_| {
            Err(PlinthError::HandlerExecution("deliberate failure".into()))
        })
        .unwrap();

    let client = PredictClient::new(&spawn_gateway(gateway).await);

    let input = ClientInput::Record(record_body(json!({"B": 0, "C": 0, "D": 0})));
    let err = client.call("fail", &input).await.unwrap_err();
    assert!(matches!(err, PlinthError::Transport(_)));

    // The gateway keeps serving other requests.
    assert!(client.ping().await.unwrap());
    assert!(client.predict(&input).await.is_ok());
}

#[tokio::test]
async fn test_gateway_without_prototype_bypasses_enforcement() {
    let gateway = ServingGateway::new(demo_record(None), GatewayConfig::development());
    let client = PredictClient::new(&spawn_gateway(gateway).await);

    let err = client.prototype().await.unwrap_err();
    assert!(matches!(err, PlinthError::KeyNotFound(_)));

    // Records that would fail enforcement are forwarded raw.
    let input = ClientInput::Record(record_body(json!({"anything": "goes"})));
    let result = client.predict(&input).await.unwrap();
    assert_eq!(result.n_rows(), 1);
    assert_eq!(result.rows()[0], vec![json!(3.0)]);
}

#[tokio::test]
async fn test_labeled_input_carries_label_into_result() {
    let client = spawn_default().await;

    let input = ClientInput::Labeled(
        "row-9".into(),
        record_body(json!({"B": 0, "C": 0, "D": 0})),
    );
    let result = client.predict(&input).await.unwrap();

    assert_eq!(result.labels().unwrap(), ["row-9"]);
}
