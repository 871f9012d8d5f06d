//! Model metadata: user details, store versions, and required packages.
//!
//! [`Metadata`] is assembled once when a record is created and rebuilt from
//! the store envelope when a record is reconstructed. Assembly is pure and
//! idempotent: the same inputs always produce the same value.

use crate::store::StoreEnvelope;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Language/runtime tag recorded at original record creation.
pub const RUNTIME_TAG: &str = concat!("rust ", env!("CARGO_PKG_RUST_VERSION"));

/// A package a handler declares as required for prediction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSpec {
    pub name: String,
    /// Version the serving process was built against, when known.
    pub version: Option<String>,
}

impl PackageSpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            version: None,
        }
    }

    pub fn pinned(name: &str, version: &str) -> Self {
        Self {
            name: name.to_string(),
            version: Some(version.to_string()),
        }
    }

    /// Requirement string: `name@version` when pinned, bare name otherwise.
    pub fn requirement(&self) -> String {
        match &self.version {
            Some(version) => format!("{}@{}", self.name, version),
            None => self.name.clone(),
        }
    }
}

/// Metadata carried by a model record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Opaque user-supplied details.
    #[serde(default)]
    pub user: Map<String, Value>,
    /// Store-assigned version; never produced locally.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub version: Option<String>,
    /// Discoverable URL for the serving surface, if any.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub url: Option<String>,
    /// Packages needed to reproduce predictions; unique by name,
    /// first-seen order.
    #[serde(default)]
    pub required_pkgs: Vec<String>,
    /// Runtime tag captured at original creation, carried forward on
    /// reconstruction.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub runtime_tag: Option<String>,
}

impl Metadata {
    /// Assemble metadata for a freshly constructed record.
    ///
    /// Extras are kept first in the order given, then the handler's declared
    /// package, pinned to the version the process was built against. The
    /// runtime tag is captured here and only here.
    pub fn assemble(
        handler_pkg: Option<&PackageSpec>,
        user: Option<Map<String, Value>>,
        extra_pkgs: &[String],
        url: Option<String>,
    ) -> Self {
        let mut required_pkgs = Vec::new();
        for extra in extra_pkgs {
            push_unique(&mut required_pkgs, extra.clone());
        }
        if let Some(pkg) = handler_pkg {
            push_unique(&mut required_pkgs, pkg.requirement());
        }

        Self {
            user: user.unwrap_or_default(),
            version: None,
            url,
            required_pkgs,
            runtime_tag: Some(RUNTIME_TAG.to_string()),
        }
    }

    /// Rebuild metadata from a store envelope.
    ///
    /// Recorded packages are carried verbatim, unpinned, and the stored
    /// runtime tag (or `None`) is carried forward. Legacy envelopes without
    /// a structured meta block keep their package list loose under a
    /// `required_pkgs` key in the user mapping; those are coerced into the
    /// structured form here and the loose key is dropped.
    pub fn from_envelope(envelope: &StoreEnvelope, version: String) -> Self {
        let mut user = envelope.user.clone();

        let (required_pkgs, runtime_tag) = match &envelope.meta {
            Some(meta) => (meta.required_pkgs.clone(), meta.runtime_tag.clone()),
            None => {
                let loose = user
                    .remove("required_pkgs")
                    .and_then(|v| serde_json::from_value::<Vec<String>>(v).ok())
                    .unwrap_or_default();
                (loose, None)
            }
        };

        Self {
            user,
            version: Some(version),
            url: None,
            required_pkgs,
            runtime_tag,
        }
    }
}

/// Bare package name of a requirement string.
fn bare_name(requirement: &str) -> &str {
    requirement.split('@').next().unwrap_or(requirement)
}

/// Append a requirement unless an entry for the same package is already
/// present. Duplicate detection is a name-substring match, so a pinned
/// `name@version` entry also suppresses later bare `name` entries.
fn push_unique(pkgs: &mut Vec<String>, requirement: String) {
    let name = bare_name(&requirement).to_string();
    if pkgs.iter().any(|existing| existing.contains(name.as_str())) {
        return;
    }
    pkgs.push(requirement);
}
