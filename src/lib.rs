//! Plinth - package trained models and serve them behind validated HTTP
//! endpoints.
//!
//! Plinth binds a trained model to a description of its expected input shape
//! and exposes it over HTTP, validating every request against that shape
//! before prediction runs.
//!
//! # Features
//!
//! - **Handler registry**: per-model-family adapters resolved from a model's
//!   runtime type, extensible with user-defined families.
//! - **Input prototypes**: zero-instance schemas synthesized from sample
//!   data, serialized for storage, and enforced per request.
//! - **Metadata assembly**: user details, required packages (deduplicated,
//!   pinned at creation), and store versions.
//! - **Serving gateway**: batch-aware `/predict` plus health, metadata,
//!   schema, and custom endpoints sharing one validation pipeline.
//! - **Versioned store boundary**: write and reconstruct records through a
//!   minimal external-store contract.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        plinth                             │
//! ├──────────────────────────────────────────────────────────┤
//! │  Serving: ServingGateway | PredictClient                  │
//! ├──────────────────────────────────────────────────────────┤
//! │  Record: ModelRecord = model + handler + prototype + meta │
//! ├──────────────────────────────────────────────────────────┤
//! │  Dispatch: HandlerRegistry | built-in handler families    │
//! ├──────────────────────────────────────────────────────────┤
//! │  Boundary: ObjectStore (versioned payload + envelope)     │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```no_run
//! use plinth::handlers::ConstantModel;
//! use plinth::{
//!     GatewayConfig, HandlerRegistry, ModelObject, ModelRecord, RecordOptions,
//!     SampleData, ServingGateway,
//! };
//!
//! #[tokio::main]
//! async fn main() -> plinth::Result<()> {
//!     let registry = HandlerRegistry::builtin();
//!
//!     let record = ModelRecord::new(
//!         &registry,
//!         ModelObject::new(ConstantModel::new(42.0)),
//!         "answer",
//!         RecordOptions {
//!             sample: Some(SampleData::Frame(plinth::mock::mock_table())),
//!             ..Default::default()
//!         },
//!     )?;
//!
//!     ServingGateway::new(record, GatewayConfig::development())
//!         .serve()
//!         .await
//! }
//! ```

pub mod client;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod meta;
pub mod mock;
pub mod prototype;
pub mod record;
pub mod store;
pub mod table;

pub use client::{ClientInput, PredictClient};
pub use error::{PlinthError, Result};
pub use gateway::{GatewayConfig, ServingGateway};
pub use handlers::{HandlerInput, HandlerRegistry, ModelHandler, ModelObject};
pub use meta::{Metadata, PackageSpec};
pub use prototype::{PrimitiveType, Prototype, PrototypeField, SampleData};
pub use record::{ModelRecord, RecordOptions};
pub use store::{MemoryStore, ObjectStore, StoreEnvelope};
pub use table::DataTable;
