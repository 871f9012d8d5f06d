//! The model record aggregate: one model bound to its handler, prototype,
//! and metadata.
//!
//! A record is built exactly once, either fresh from a live model instance
//! (synthesizing the prototype and metadata from scratch) or by
//! reconstruction from the external store (the raw sample data is gone, so
//! the prototype is rebuilt from the stored schema document instead). It is
//! never mutated afterwards.

use crate::error::{PlinthError, Result};
use crate::handlers::{HandlerInput, HandlerRegistry, ModelHandler, ModelObject};
use crate::meta::Metadata;
use crate::prototype::{self, Prototype, SampleData};
use crate::store::{ModelMetaEnvelope, ObjectStore, StoreEnvelope};
use crate::table::json_type_name;
use serde_json::{Map, Value};
use tracing::info;

/// Options for fresh record construction.
pub struct RecordOptions {
    /// Sample data to synthesize the input prototype from. Absent means no
    /// prototype: schema enforcement is permanently bypassed for this record.
    pub sample: Option<SampleData>,
    /// Description; derived from the handler when not given.
    pub description: Option<String>,
    /// Opaque user-supplied metadata.
    pub user: Option<Map<String, Value>>,
    /// Extra packages to record beyond the handler's own.
    pub extra_pkgs: Vec<String>,
    /// Discoverable URL for the serving surface.
    pub url: Option<String>,
    /// Whether store writes of this record should be versioned.
    pub versioned: bool,
}

impl Default for RecordOptions {
    fn default() -> Self {
        Self {
            sample: None,
            description: None,
            user: None,
            extra_pkgs: Vec::new(),
            url: None,
            versioned: true,
        }
    }
}

/// A model, its handler, its prototype, and its metadata, bound together.
#[derive(Debug)]
pub struct ModelRecord {
    name: String,
    description: String,
    versioned: bool,
    prototype: Option<Prototype>,
    metadata: Metadata,
    handler: Box<dyn ModelHandler>,
}

impl ModelRecord {
    /// Build a record from a live model instance.
    ///
    /// Fails before anything is built when no handler resolves for the
    /// model's runtime type, or when the sample data cannot be synthesized
    /// into a prototype.
    pub fn new(
        registry: &HandlerRegistry,
        model: ModelObject,
        name: &str,
        options: RecordOptions,
    ) -> Result<Self> {
        let handler = registry.resolve(model, options.sample)?;

        let prototype = match handler.prototype_data() {
            Some(sample) => Some(prototype::synthesize(sample)?),
            None => None,
        };

        let metadata = Metadata::assemble(
            handler.declared_package().as_ref(),
            options.user,
            &options.extra_pkgs,
            options.url,
        );
        let description = options
            .description
            .unwrap_or_else(|| handler.describe());

        Ok(Self {
            name: name.to_string(),
            description,
            versioned: options.versioned,
            prototype,
            metadata,
            handler,
        })
    }

    /// Reconstruct a record from the external store.
    ///
    /// `version` of `None` means whatever the store resolves as current.
    pub async fn from_store(
        store: &dyn ObjectStore,
        registry: &HandlerRegistry,
        key: &str,
        version: Option<&str>,
    ) -> Result<Self> {
        let version = store.resolve_version(key, version).await?;
        let envelope = store.read_envelope(key, &version).await?;
        let payload = store.read(key, &version).await?;

        let handler = registry.rebuild(&envelope.family, &payload)?;

        let prototype = match envelope.meta.as_ref().and_then(|m| m.prototype.as_ref()) {
            Some(Value::Object(doc)) => Some(Prototype::from_schema_document(doc)?),
            Some(other) => {
                return Err(PlinthError::InvalidPrototype {
                    data_type: json_type_name(other).to_string(),
                    reason: "stored prototype is not a schema document mapping".to_string(),
                })
            }
            None => None,
        };

        let metadata = Metadata::from_envelope(&envelope, version.clone());

        info!(key, version = %version, "reconstructed model record");
        Ok(Self {
            name: key.to_string(),
            description: envelope.description,
            versioned: true,
            prototype,
            metadata,
            handler,
        })
    }

    /// Write the record's model payload and envelope to the store,
    /// returning the store-assigned version id.
    pub async fn write_to(&self, store: &dyn ObjectStore, key: &str) -> Result<String> {
        let payload = self.handler.encode_model()?;
        let version = store.write(key, &payload, &self.envelope()).await?;
        info!(key, version = %version, versioned = self.versioned, "wrote model record");
        Ok(version)
    }

    /// The store envelope describing this record.
    pub fn envelope(&self) -> StoreEnvelope {
        StoreEnvelope {
            description: self.description.clone(),
            user: self.metadata.user.clone(),
            family: self.handler.family().to_string(),
            meta: Some(ModelMetaEnvelope {
                required_pkgs: self.metadata.required_pkgs.clone(),
                prototype: self.prototype.as_ref().map(|p| p.schema_document()),
                runtime_tag: self.metadata.runtime_tag.clone(),
            }),
        }
    }

    /// Run the handler's predict contract.
    pub fn predict(&self, input: HandlerInput) -> Result<Vec<Value>> {
        self.handler.predict(input)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn versioned(&self) -> bool {
        self.versioned
    }

    pub fn prototype(&self) -> Option<&Prototype> {
        self.prototype.as_ref()
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn handler(&self) -> &dyn ModelHandler {
        self.handler.as_ref()
    }
}
