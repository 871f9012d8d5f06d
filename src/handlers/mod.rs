//! Per-model-family adapters and the registry that resolves models to them.
//!
//! A [`ModelHandler`] adapts one family of trained models to the serving
//! core: it describes the model, carries the sample data its prototype is
//! synthesized from, declares the package needed at prediction time, and
//! implements the predict contract. The [`HandlerRegistry`] maps a model's
//! runtime type to a handler constructor.
//!
//! Registration is an explicit call made once at process start, before any
//! serving begins; it is never performed concurrently with request handling,
//! so the registry needs no locking.

pub mod constant;
pub mod linear;

pub use constant::{ConstantHandler, ConstantModel};
pub use linear::{LinearHandler, LinearModel};

use crate::error::{PlinthError, Result};
use crate::meta::PackageSpec;
use crate::prototype::SampleData;
use crate::table::DataTable;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::Any;

/// Input a handler receives from the gateway.
#[derive(Debug, Clone)]
pub enum HandlerInput {
    /// Schema-validated records, assembled in request order.
    Table(DataTable),
    /// The raw request body; enforcement is disabled or no prototype exists.
    Raw(Value),
}

impl HandlerInput {
    /// Number of records the input represents. A raw non-array body counts
    /// as a single record.
    pub fn cardinality(&self) -> usize {
        match self {
            HandlerInput::Table(table) => table.n_rows(),
            HandlerInput::Raw(Value::Array(items)) => items.len(),
            HandlerInput::Raw(_) => 1,
        }
    }
}

/// The per-family adapter contract.
pub trait ModelHandler: Send + Sync + std::fmt::Debug {
    /// Family name; also the decode dispatch key recorded in store envelopes.
    fn family(&self) -> &'static str;

    /// One-line description of the wrapped model.
    fn describe(&self) -> String;

    /// Package required at prediction time, if the handler declares one.
    fn declared_package(&self) -> Option<PackageSpec> {
        None
    }

    /// Sample data the prototype is synthesized from. `None` after store
    /// reconstruction: the raw sample is gone.
    fn prototype_data(&self) -> Option<&SampleData> {
        None
    }

    /// Serialize the wrapped model for the store.
    fn encode_model(&self) -> Result<Vec<u8>>;

    /// Produce one prediction per input record, in input order.
    fn predict(&self, input: HandlerInput) -> Result<Vec<Value>>;
}

enum Payload {
    Raw(Box<dyn Any + Send + Sync>),
    Handler(Box<dyn ModelHandler>),
}

/// A type-erased trained model, carrying its runtime type name for
/// diagnostics.
pub struct ModelObject {
    payload: Payload,
    type_name: &'static str,
}

impl ModelObject {
    /// Erase a trained model.
    pub fn new<M: Any + Send + Sync>(model: M) -> Self {
        Self {
            payload: Payload::Raw(Box::new(model)),
            type_name: std::any::type_name::<M>(),
        }
    }

    /// Wrap a pre-built handler. Resolution passes these through unchanged.
    pub fn from_handler<H: ModelHandler + 'static>(handler: H) -> Self {
        Self {
            payload: Payload::Handler(Box::new(handler)),
            type_name: std::any::type_name::<H>(),
        }
    }

    /// Runtime type name of the wrapped model or handler.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    fn is<M: Any>(&self) -> bool {
        match &self.payload {
            Payload::Raw(boxed) => boxed.is::<M>(),
            Payload::Handler(_) => false,
        }
    }

    fn downcast<M: Any>(self) -> std::result::Result<Box<M>, Self> {
        let type_name = self.type_name;
        match self.payload {
            Payload::Raw(boxed) => boxed.downcast::<M>().map_err(|boxed| Self {
                payload: Payload::Raw(boxed),
                type_name,
            }),
            payload => Err(Self { payload, type_name }),
        }
    }

    fn into_handler(self) -> std::result::Result<Box<dyn ModelHandler>, Self> {
        match self.payload {
            Payload::Handler(handler) => Ok(handler),
            payload => Err(Self {
                payload,
                type_name: self.type_name,
            }),
        }
    }
}

type MatchFn = Box<dyn Fn(&ModelObject) -> bool + Send + Sync>;
type BuildFn =
    Box<dyn Fn(ModelObject, Option<SampleData>) -> Result<Box<dyn ModelHandler>> + Send + Sync>;
type DecodeFn = Box<dyn Fn(&[u8]) -> Result<ModelObject> + Send + Sync>;

/// One registered model family: a type matcher, a handler constructor, and
/// a payload decoder for store reconstruction.
pub struct HandlerFamily {
    name: &'static str,
    matches: MatchFn,
    build: BuildFn,
    decode: DecodeFn,
}

impl HandlerFamily {
    /// Assemble a family from its parts. Most callers want
    /// [`HandlerRegistry::register_family`] instead; this is the seam for
    /// families covering several model types.
    pub fn new(
        name: &'static str,
        matches: impl Fn(&ModelObject) -> bool + Send + Sync + 'static,
        build: impl Fn(ModelObject, Option<SampleData>) -> Result<Box<dyn ModelHandler>>
            + Send
            + Sync
            + 'static,
        decode: impl Fn(&[u8]) -> Result<ModelObject> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            matches: Box::new(matches),
            build: Box::new(build),
            decode: Box::new(decode),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Maps model runtime types to handler constructors.
///
/// Resolution walks families in registration order, so register the most
/// specific families first.
pub struct HandlerRegistry {
    families: Vec<HandlerFamily>,
}

impl HandlerRegistry {
    /// A registry with no families.
    pub fn empty() -> Self {
        Self {
            families: Vec::new(),
        }
    }

    /// A registry with the built-in families registered.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register_family("linear", |model: LinearModel, sample| {
            LinearHandler::new(model, sample)
        });
        registry.register_family("constant", |model: ConstantModel, sample| {
            ConstantHandler::new(model, sample)
        });
        registry
    }

    /// Register a family for a concrete model type.
    ///
    /// `make` builds the handler from an owned model and optional sample
    /// data; payload decoding uses the model's `Deserialize` impl.
    pub fn register_family<M, H, F>(&mut self, name: &'static str, make: F)
    where
        M: DeserializeOwned + Any + Send + Sync,
        H: ModelHandler + 'static,
        F: Fn(M, Option<SampleData>) -> H + Send + Sync + Clone + 'static,
    {
        self.families.push(HandlerFamily {
            name,
            matches: Box::new(|model: &ModelObject| model.is::<M>()),
            build: Box::new(move |model: ModelObject, sample: Option<SampleData>| {
                let model = model.downcast::<M>().map_err(|model| {
                    PlinthError::Internal(format!(
                        "family matched but downcast failed for {}",
                        model.type_name()
                    ))
                })?;
                Ok(Box::new(make(*model, sample)) as Box<dyn ModelHandler>)
            }),
            decode: Box::new(|payload: &[u8]| {
                let model: M = serde_json::from_slice(payload)?;
                Ok(ModelObject::new(model))
            }),
        });
    }

    /// Register a fully custom family.
    pub fn register(&mut self, family: HandlerFamily) {
        self.families.push(family);
    }

    /// Registered family names, in resolution order.
    pub fn family_names(&self) -> Vec<&'static str> {
        self.families.iter().map(|f| f.name).collect()
    }

    /// Resolve a model to its handler.
    ///
    /// A model that is already a handler is passed through unchanged. An
    /// unrecognized runtime type fails here, before any record is built.
    pub fn resolve(
        &self,
        model: ModelObject,
        sample: Option<SampleData>,
    ) -> Result<Box<dyn ModelHandler>> {
        let model = match model.into_handler() {
            Ok(handler) => return Ok(handler),
            Err(model) => model,
        };

        if let Some(family) = self.families.iter().find(|f| (f.matches)(&model)) {
            return (family.build)(model, sample);
        }

        Err(PlinthError::UnsupportedModel(format!(
            "{}; register a handler family for this type with \
             HandlerRegistry::register_family",
            model.type_name()
        )))
    }

    /// Rebuild a handler from a stored payload, dispatching the decoder on
    /// the family name recorded in the envelope.
    pub fn rebuild(&self, family_name: &str, payload: &[u8]) -> Result<Box<dyn ModelHandler>> {
        let family = self
            .families
            .iter()
            .find(|f| f.name == family_name)
            .ok_or_else(|| {
                PlinthError::UnsupportedModel(format!(
                    "no registered family named {}",
                    family_name
                ))
            })?;

        let model = (family.decode)(payload)?;
        (family.build)(model, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct NotAModel;

    #[test]
    fn test_resolve_unregistered_type_fails_fast() {
        let registry = HandlerRegistry::builtin();
        let err = registry
            .resolve(ModelObject::new(NotAModel), None)
            .unwrap_err();

        assert!(matches!(err, PlinthError::UnsupportedModel(_)));
        assert!(err.to_string().contains("NotAModel"));
    }

    #[test]
    fn test_resolve_builtin_families() {
        let registry = HandlerRegistry::builtin();

        let handler = registry
            .resolve(ModelObject::new(ConstantModel::new(7.0)), None)
            .unwrap();
        assert_eq!(handler.family(), "constant");

        let handler = registry
            .resolve(
                ModelObject::new(LinearModel::new(0.0, vec![1.0, 2.0])),
                None,
            )
            .unwrap();
        assert_eq!(handler.family(), "linear");
    }

    #[test]
    fn test_prebuilt_handler_passes_through() {
        let registry = HandlerRegistry::empty();
        let prebuilt = ConstantHandler::new(ConstantModel::new(3.0), None);

        // Resolves even though no family is registered.
        let handler = registry
            .resolve(ModelObject::from_handler(prebuilt), None)
            .unwrap();
        assert_eq!(handler.family(), "constant");
        assert_eq!(
            handler.predict(HandlerInput::Raw(json!({}))).unwrap(),
            vec![json!(3.0)]
        );
    }

    #[test]
    fn test_rebuild_round_trip() {
        let registry = HandlerRegistry::builtin();
        let handler = ConstantHandler::new(ConstantModel::new(5.5), None);
        let payload = handler.encode_model().unwrap();

        let rebuilt = registry.rebuild("constant", &payload).unwrap();
        assert_eq!(
            rebuilt.predict(HandlerInput::Raw(json!([1, 2]))).unwrap(),
            vec![json!(5.5), json!(5.5)]
        );
        assert!(rebuilt.prototype_data().is_none());
    }

    #[test]
    fn test_rebuild_unknown_family() {
        let registry = HandlerRegistry::builtin();
        let err = registry.rebuild("mystery", b"{}").unwrap_err();
        assert!(matches!(err, PlinthError::UnsupportedModel(_)));
    }

    #[test]
    fn test_cardinality() {
        assert_eq!(HandlerInput::Raw(json!({"a": 1})).cardinality(), 1);
        assert_eq!(HandlerInput::Raw(json!([1, 2, 3])).cardinality(), 3);
    }
}
