//! Shared helpers for integration tests.

use plinth::handlers::ConstantModel;
use plinth::{
    HandlerRegistry, ModelObject, ModelRecord, RecordOptions, SampleData, ServingGateway,
};
use serde_json::{json, Map, Value};

/// The sample mapping used across the gateway tests.
pub fn sample_mapping() -> SampleData {
    match json!({"B": 55, "C": 65, "D": 17}) {
        Value::Object(map) => SampleData::Mapping(map),
        _ => unreachable!(),
    }
}

pub fn record_body(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("not an object"),
    }
}

/// A record over a constant model that always predicts 3.0.
pub fn demo_record(sample: Option<SampleData>) -> ModelRecord {
    let registry = HandlerRegistry::builtin();
    ModelRecord::new(
        &registry,
        ModelObject::new(ConstantModel::new(3.0)),
        "demo",
        RecordOptions {
            sample,
            ..Default::default()
        },
    )
    .unwrap()
}

/// Serve a gateway on an ephemeral loopback port, returning its base URL.
pub async fn spawn_gateway(gateway: ServingGateway) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = gateway.router();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}
