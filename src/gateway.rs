//! The HTTP serving gateway for one model record.
//!
//! A [`ServingGateway`] wraps one immutable [`ModelRecord`] and exposes it
//! as validated, batch-aware endpoints:
//!
//! - `GET /ping` — constant health payload
//! - `GET /metadata` — the record's metadata
//! - `GET /prototype` — the input schema, when a prototype exists
//! - `POST /predict` — one record or a list of records
//! - `POST /<custom>` — caller-registered transforms on the same pipeline
//!
//! All POST endpoints share one validation pipeline: when enforcement is on
//! and a prototype exists, every record is checked field by field before the
//! handler runs; any mismatch rejects the whole request with 422 and the
//! handler is never invoked. Handler failures are contained to their own
//! request.
//!
//! The gateway is stateless across requests: the record is read-only once
//! serving starts, so no locking is involved.

use crate::error::{PlinthError, Result};
use crate::handlers::HandlerInput;
use crate::meta::Metadata;
use crate::record::ModelRecord;
use crate::table::json_type_name;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

/// Endpoint names the gateway itself claims.
const RESERVED_ENDPOINTS: [&str; 4] = ["ping", "metadata", "prototype", "predict"];

/// Gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Server host.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Whether `/predict` enforces the record's prototype.
    pub check_prototype: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            check_prototype: true,
        }
    }
}

impl GatewayConfig {
    /// Loopback-only configuration for local development.
    pub fn development() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            ..Default::default()
        }
    }

    /// The socket address to bind.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| PlinthError::InvalidConfig {
                field: "host".to_string(),
                reason: format!("{}", e),
            })
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(PlinthError::InvalidConfig {
                field: "host".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        self.bind_addr().map(|_| ())
    }
}

/// A caller-supplied transform serving a custom endpoint.
pub type EndpointFn = Arc<dyn Fn(HandlerInput) -> Result<Vec<Value>> + Send + Sync>;

#[derive(Clone)]
struct Endpoint {
    name: String,
    enforce: bool,
    run: EndpointFn,
}

/// Shared state for the built-in routes.
#[derive(Clone)]
struct GatewayState {
    record: Arc<ModelRecord>,
    check_prototype: bool,
}

/// HTTP serving surface for one model record.
pub struct ServingGateway {
    record: Arc<ModelRecord>,
    config: GatewayConfig,
    custom: Vec<Endpoint>,
}

impl ServingGateway {
    /// Wrap a record. The record is immutable from here on.
    pub fn new(record: ModelRecord, config: GatewayConfig) -> Self {
        Self {
            record: Arc::new(record),
            config,
            custom: Vec::new(),
        }
    }

    /// The wrapped record.
    pub fn record(&self) -> &ModelRecord {
        &self.record
    }

    /// Register a custom POST endpoint on the shared validation pipeline.
    ///
    /// Registration happens before serving starts. Reserved and duplicate
    /// names are rejected.
    pub fn add_endpoint<F>(&mut self, name: &str, enforce: bool, run: F) -> Result<()>
    where
        F: Fn(HandlerInput) -> Result<Vec<Value>> + Send + Sync + 'static,
    {
        if name.is_empty() || name.contains('/') {
            return Err(PlinthError::InvalidConfig {
                field: "endpoint".to_string(),
                reason: format!("invalid endpoint name: {:?}", name),
            });
        }
        if RESERVED_ENDPOINTS.contains(&name) || self.custom.iter().any(|e| e.name == name) {
            return Err(PlinthError::EndpointExists(name.to_string()));
        }

        self.custom.push(Endpoint {
            name: name.to_string(),
            enforce,
            run: Arc::new(run),
        });
        Ok(())
    }

    /// Build the router for all registered endpoints.
    pub fn router(&self) -> Router {
        let state = GatewayState {
            record: Arc::clone(&self.record),
            check_prototype: self.config.check_prototype,
        };

        let mut app = Router::new()
            .route("/ping", get(handle_ping))
            .route("/metadata", get(handle_metadata))
            .route("/prototype", get(handle_prototype))
            .route("/predict", post(handle_predict))
            .with_state(state);

        for endpoint in &self.custom {
            let record = Arc::clone(&self.record);
            let endpoint = endpoint.clone();
            app = app.route(
                &format!("/{}", endpoint.name),
                post(move |Json(body): Json<Value>| {
                    let record = Arc::clone(&record);
                    let endpoint = endpoint.clone();
                    async move {
                        prediction_response(&record, endpoint.enforce, body, Some(&endpoint.run))
                    }
                }),
            );
        }

        app
    }

    /// Bind and serve until the process exits.
    pub async fn serve(self) -> Result<()> {
        self.config.validate()?;
        let addr = self.config.bind_addr()?;
        let app = self.router();

        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        info!(
            addr = %local_addr,
            model = self.record.name(),
            endpoints = self.custom.len(),
            "serving gateway listening"
        );

        axum::serve(listener, app)
            .await
            .map_err(|e| PlinthError::Internal(e.to_string()))?;

        Ok(())
    }
}

// Route handlers

async fn handle_ping() -> Json<Value> {
    Json(json!({"ping": "pong"}))
}

async fn handle_metadata(State(state): State<GatewayState>) -> Json<Metadata> {
    Json(state.record.metadata().clone())
}

async fn handle_prototype(State(state): State<GatewayState>) -> Response {
    match state.record.prototype() {
        Some(prototype) => (StatusCode::OK, Json(prototype.public_schema())).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": "not_found",
                "detail": "this model has no input prototype",
            })),
        )
            .into_response(),
    }
}

async fn handle_predict(
    State(state): State<GatewayState>,
    Json(body): Json<Value>,
) -> Response {
    prediction_response(&state.record, state.check_prototype, body, None)
}

// Shared validation pipeline

fn prediction_response(
    record: &ModelRecord,
    enforce: bool,
    body: Value,
    run: Option<&EndpointFn>,
) -> Response {
    match run_prediction(record, enforce, body, run) {
        Ok(predictions) => {
            (StatusCode::OK, Json(json!({"predict": predictions}))).into_response()
        }
        Err(err) => error_response(&err),
    }
}

fn run_prediction(
    record: &ModelRecord,
    enforce: bool,
    body: Value,
    run: Option<&EndpointFn>,
) -> Result<Vec<Value>> {
    let input = prepare_input(record, enforce, body)?;

    // Response length must equal input cardinality for validated input.
    let expected = match &input {
        HandlerInput::Table(table) => Some(table.n_rows()),
        HandlerInput::Raw(_) => None,
    };

    let predictions = match run {
        Some(transform) => transform(input),
        None => record.predict(input),
    }
    .map_err(|e| match e {
        PlinthError::HandlerExecution(_) => e,
        other => PlinthError::HandlerExecution(other.to_string()),
    })?;

    if let Some(expected) = expected {
        if predictions.len() != expected {
            return Err(PlinthError::HandlerExecution(format!(
                "handler returned {} predictions for {} records",
                predictions.len(),
                expected
            )));
        }
    }

    Ok(predictions)
}

/// Validate the request body into handler input. With enforcement off or no
/// prototype, the raw body is forwarded untouched.
fn prepare_input(record: &ModelRecord, enforce: bool, body: Value) -> Result<HandlerInput> {
    if enforce {
        if let Some(prototype) = record.prototype() {
            let records = normalize_records(body)?;
            let table = prototype.validate_batch(&records)?;
            return Ok(HandlerInput::Table(table));
        }
    }
    Ok(HandlerInput::Raw(body))
}

/// Normalize a body into the canonical batch form: a list of records.
fn normalize_records(body: Value) -> Result<Vec<Map<String, Value>>> {
    match body {
        Value::Object(map) => Ok(vec![map]),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| match item {
                Value::Object(map) => Ok(map),
                other => Err(PlinthError::SchemaValidation(format!(
                    "record {}: expected an object, got {}",
                    index,
                    json_type_name(&other)
                ))),
            })
            .collect(),
        other => Err(PlinthError::SchemaValidation(format!(
            "body must be a record or a list of records, got {}",
            json_type_name(&other)
        ))),
    }
}

fn error_response(err: &PlinthError) -> Response {
    let status = StatusCode::from_u16(err.to_status_code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        warn!(error = %err, "request failed");
    } else {
        debug!(error = %err, "request rejected");
    }

    (
        status,
        Json(json!({"error": err.kind(), "detail": err.to_string()})),
    )
        .into_response()
}
