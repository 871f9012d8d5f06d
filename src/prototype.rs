//! Input prototypes: zero-instance schemas synthesized from sample data.
//!
//! A [`Prototype`] records the field names, primitive types, and example
//! values a model expects, without keeping any of the original sample rows.
//! It is synthesized once at record construction from [`SampleData`], can be
//! serialized to a schema document for storage and the `/prototype` endpoint,
//! and can be re-synthesized from that document when a record is
//! reconstructed from the store.
//!
//! Validation is a pure walk over the field list against incoming request
//! records; no runtime code generation is involved.

use crate::error::{PlinthError, Result};
use crate::table::{json_type_name, DataTable};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Reserved top-level keys identifying a serialized schema document.
///
/// Disambiguation rule: a mapping is treated as a schema document if and only
/// if it contains all three of these keys. A data mapping that uses some of
/// them as field names is still treated as data.
const SCHEMA_DOCUMENT_KEYS: [&str; 3] = ["title", "type", "properties"];

const EXPECTED_SHAPES: &str =
    "expected a tabular frame, a 2-D array, a mapping of field names to values, \
     or a prebuilt prototype";

/// Primitive field types a prototype can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveType {
    Integer,
    Float,
    String,
    Boolean,
}

impl PrimitiveType {
    /// Classify a JSON value, if it is a primitive.
    pub fn of_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) if n.is_i64() || n.is_u64() => Some(PrimitiveType::Integer),
            Value::Number(_) => Some(PrimitiveType::Float),
            Value::String(_) => Some(PrimitiveType::String),
            Value::Bool(_) => Some(PrimitiveType::Boolean),
            _ => None,
        }
    }

    /// Wire name of the type, as used in schema documents.
    pub fn name(&self) -> &'static str {
        match self {
            PrimitiveType::Integer => "integer",
            PrimitiveType::Float => "float",
            PrimitiveType::String => "string",
            PrimitiveType::Boolean => "boolean",
        }
    }

    fn parse(name: &str) -> Option<Self> {
        match name {
            "integer" => Some(PrimitiveType::Integer),
            "float" => Some(PrimitiveType::Float),
            "string" => Some(PrimitiveType::String),
            "boolean" => Some(PrimitiveType::Boolean),
            _ => None,
        }
    }
}

/// One named, typed field with an example value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrototypeField {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: PrimitiveType,
    pub example: Value,
}

impl PrototypeField {
    pub fn new(name: &str, ty: PrimitiveType, example: Value) -> Self {
        Self {
            name: name.to_string(),
            ty,
            example,
        }
    }
}

/// A zero-instance schema: an ordered list of typed fields with examples.
///
/// Invariants: field names are unique, field order is first-declared-first,
/// and a prototype always has at least one field. "No prototype" is expressed
/// as an absent `Option<Prototype>`, never as an empty one. Prototypes are
/// never mutated after creation; discard and rebuild instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prototype {
    fields: Vec<PrototypeField>,
}

impl Prototype {
    /// Build a prototype from a field list, enforcing the invariants.
    pub fn from_fields(fields: Vec<PrototypeField>) -> Result<Self> {
        if fields.is_empty() {
            return Err(PlinthError::InvalidPrototype {
                data_type: "field list".to_string(),
                reason: "a prototype must declare at least one field; \
                         use no prototype instead"
                    .to_string(),
            });
        }

        for (i, field) in fields.iter().enumerate() {
            if fields[..i].iter().any(|f| f.name == field.name) {
                return Err(PlinthError::InvalidPrototype {
                    data_type: "field list".to_string(),
                    reason: format!("duplicate field name: {}", field.name),
                });
            }
        }

        Ok(Self { fields })
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[PrototypeField] {
        &self.fields
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&PrototypeField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        // Always false by construction; kept for the len/is_empty pairing.
        self.fields.is_empty()
    }

    /// Column names in declaration order.
    pub fn column_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    /// Serialize to the schema document form used for storage.
    ///
    /// The document carries a generated per-field `title`; round-tripping
    /// through [`Prototype::from_schema_document`] reproduces the same field
    /// set, types, and example values.
    pub fn schema_document(&self) -> Value {
        let mut properties = Map::new();
        for field in &self.fields {
            properties.insert(
                field.name.clone(),
                json!({
                    "title": field.name,
                    "type": field.ty.name(),
                    "default": field.example,
                }),
            );
        }

        json!({
            "title": "prototype",
            "type": "object",
            "properties": properties,
            "required": self.column_names(),
        })
    }

    /// Schema document with internal bookkeeping (per-field titles) stripped,
    /// as served to clients on `/prototype`.
    pub fn public_schema(&self) -> Value {
        let mut doc = self.schema_document();
        if let Some(properties) = doc
            .get_mut("properties")
            .and_then(|p| p.as_object_mut())
        {
            for (_, def) in properties.iter_mut() {
                if let Some(def) = def.as_object_mut() {
                    def.remove("title");
                }
            }
        }
        doc
    }

    /// Rebuild a prototype from a schema document mapping.
    ///
    /// Only type-and-example schemas reconstruct; a richer hand-authored
    /// document whose fields carry no `default` cannot be rebuilt, and that
    /// is reported rather than silently masked.
    pub fn from_schema_document(doc: &Map<String, Value>) -> Result<Self> {
        let properties = doc
            .get("properties")
            .and_then(|p| p.as_object())
            .ok_or_else(|| PlinthError::InvalidPrototype {
                data_type: "mapping".to_string(),
                reason: "schema document has no properties object".to_string(),
            })?;

        let mut fields = Vec::with_capacity(properties.len());
        for (name, def) in properties {
            let def = def.as_object().ok_or_else(|| PlinthError::InvalidPrototype {
                data_type: "mapping".to_string(),
                reason: format!("schema field {} is not an object", name),
            })?;

            let example = def.get("default").cloned().ok_or_else(|| {
                PlinthError::InvalidPrototype {
                    data_type: "mapping".to_string(),
                    reason: format!(
                        "schema field {} has no default; only type-and-example \
                         schemas can be reconstructed",
                        name
                    ),
                }
            })?;

            let ty = match def.get("type").and_then(|t| t.as_str()) {
                Some(name_str) => PrimitiveType::parse(name_str).ok_or_else(|| {
                    PlinthError::InvalidPrototype {
                        data_type: "mapping".to_string(),
                        reason: format!("schema field {} has unknown type {}", name, name_str),
                    }
                })?,
                None => primitive_of(name, &example)?,
            };

            let example = coerce(ty, &example).ok_or_else(|| PlinthError::InvalidPrototype {
                data_type: "mapping".to_string(),
                reason: format!(
                    "schema field {}: default is {}, not {}",
                    name,
                    json_type_name(&example),
                    ty.name()
                ),
            })?;

            fields.push(PrototypeField::new(name, ty, example));
        }

        Self::from_fields(fields)
    }

    /// Validate one record against the prototype, returning its values in
    /// field declaration order, coerced to the declared types.
    ///
    /// `index` is the record's position within a batch, used in messages.
    /// Unknown extra fields are ignored; a missing field is an error.
    pub fn validate_record(
        &self,
        index: usize,
        record: &Map<String, Value>,
    ) -> Result<Vec<Value>> {
        let mut row = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            let value = record.get(&field.name).ok_or_else(|| {
                PlinthError::SchemaValidation(format!(
                    "record {}: missing field {}",
                    index, field.name
                ))
            })?;

            let coerced = coerce(field.ty, value).ok_or_else(|| {
                PlinthError::SchemaValidation(format!(
                    "record {}: field {}: expected {}, got {}",
                    index,
                    field.name,
                    field.ty.name(),
                    json_type_name(value)
                ))
            })?;
            row.push(coerced);
        }
        Ok(row)
    }

    /// Validate an ordered batch of records into one table.
    ///
    /// Any mismatch fails the whole batch; row order matches input order.
    pub fn validate_batch(&self, records: &[Map<String, Value>]) -> Result<DataTable> {
        let mut table = DataTable::new(self.column_names());
        for (index, record) in records.iter().enumerate() {
            let row = self.validate_record(index, record)?;
            table.push_row(row)?;
        }
        Ok(table)
    }
}

/// Sample data shapes the synthesizer understands.
#[derive(Debug, Clone)]
pub enum SampleData {
    /// Rows with named columns; the first row supplies the examples.
    Frame(DataTable),
    /// A 2-D array without column names; fields are named by column index.
    Array(Vec<Vec<Value>>),
    /// A single name-to-value mapping, or a serialized schema document.
    Mapping(Map<String, Value>),
    /// An already-built prototype, returned unchanged by synthesis.
    Prototype(Prototype),
}

impl SampleData {
    /// Classify a JSON value into a sample shape.
    ///
    /// Shapes the synthesizer cannot learn from are rejected here, with a
    /// message naming the offending type, so callers know to either reshape
    /// their sample or register a handler that builds the prototype itself.
    pub fn from_json(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(SampleData::Mapping(map)),
            Value::Array(items) => {
                let mut rows = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::Array(row) => rows.push(row),
                        other => {
                            return Err(PlinthError::InvalidPrototype {
                                data_type: format!("array of {}", json_type_name(&other)),
                                reason: EXPECTED_SHAPES.to_string(),
                            })
                        }
                    }
                }
                Ok(SampleData::Array(rows))
            }
            other => Err(PlinthError::InvalidPrototype {
                data_type: json_type_name(&other).to_string(),
                reason: EXPECTED_SHAPES.to_string(),
            }),
        }
    }
}

/// Synthesize a prototype from sample data.
///
/// Pure: the same sample always yields the same prototype. The sample itself
/// is not retained; only the first observed row survives as examples.
pub fn synthesize(sample: &SampleData) -> Result<Prototype> {
    match sample {
        SampleData::Frame(table) => {
            let row = table.first_row().ok_or_else(|| PlinthError::InvalidPrototype {
                data_type: "frame".to_string(),
                reason: "sample frame has no rows".to_string(),
            })?;

            let mut fields = Vec::with_capacity(row.len());
            for (name, value) in table.columns().iter().zip(row) {
                let ty = primitive_of(name, value)?;
                fields.push(PrototypeField::new(name, ty, value.clone()));
            }
            Prototype::from_fields(fields)
        }
        SampleData::Array(rows) => {
            let row = rows.first().ok_or_else(|| PlinthError::InvalidPrototype {
                data_type: "array".to_string(),
                reason: "sample array has no rows".to_string(),
            })?;

            let mut fields = Vec::with_capacity(row.len());
            for (index, value) in row.iter().enumerate() {
                let name = index.to_string();
                let ty = primitive_of(&name, value)?;
                fields.push(PrototypeField::new(&name, ty, value.clone()));
            }
            Prototype::from_fields(fields)
        }
        SampleData::Mapping(map) => {
            if is_schema_document(map) {
                return Prototype::from_schema_document(map);
            }

            let mut fields = Vec::with_capacity(map.len());
            for (name, value) in map {
                let ty = primitive_of(name, value)?;
                fields.push(PrototypeField::new(name, ty, value.clone()));
            }
            Prototype::from_fields(fields)
        }
        SampleData::Prototype(prototype) => Ok(prototype.clone()),
    }
}

/// Whether a mapping carries the reserved keys of a serialized schema.
fn is_schema_document(map: &Map<String, Value>) -> bool {
    SCHEMA_DOCUMENT_KEYS.iter().all(|key| map.contains_key(*key))
}

fn primitive_of(name: &str, value: &Value) -> Result<PrimitiveType> {
    PrimitiveType::of_value(value).ok_or_else(|| PlinthError::InvalidPrototype {
        data_type: json_type_name(value).to_string(),
        reason: format!(
            "field {} is not a primitive value; fields must be integer, \
             float, string, or boolean",
            name
        ),
    })
}

/// Check a value against a declared type, coercing where the declaration
/// allows it: integers widen into float fields, and floats with a zero
/// fraction narrow into integer fields.
fn coerce(ty: PrimitiveType, value: &Value) -> Option<Value> {
    match (ty, value) {
        (PrimitiveType::Integer, Value::Number(n)) if n.is_i64() || n.is_u64() => {
            Some(value.clone())
        }
        (PrimitiveType::Integer, Value::Number(n)) => {
            let f = n.as_f64()?;
            if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
                Some(json!(f as i64))
            } else {
                None
            }
        }
        (PrimitiveType::Float, Value::Number(n)) => Some(json!(n.as_f64()?)),
        (PrimitiveType::String, Value::String(_)) => Some(value.clone()),
        (PrimitiveType::Boolean, Value::Bool(_)) => Some(value.clone()),
        _ => None,
    }
}
