//! Declarative specification types.
//!
//! A [`DatabaseSpec`] is the desired-state document the reconciliation
//! engine converges the live database toward. It is owned by the caller for
//! the duration of one pass and never mutated by the engine; both the map
//! and array shapes accepted for collections and indexes are normalized
//! internally.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::index::IndexSpecs;
use crate::options::CollectionOptions;

/// A JSON object, the common currency for documents, options, and command
/// replies.
pub type JsonMap = serde_json::Map<String, Value>;

/// Full desired-state specification for one database.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseSpec {
    /// Database name. Required and non-blank.
    pub name:              String,
    /// Connection URL, passed through to the transport collaborator.
    #[serde(default)]
    pub url:               Option<String>,
    /// Transport/connection options, passed through untouched.
    #[serde(default)]
    pub options:           Option<Value>,
    /// Collection specifications to reconcile.
    #[serde(default)]
    pub collections:       Option<CollectionsSpec>,
    /// Legacy collections to drop when present.
    #[serde(default)]
    pub drop_collections:  Option<Vec<String>>,
    /// Server parameters to synchronize, whitelist-restricted.
    #[serde(default)]
    pub server_parameters: Option<JsonMap>,
}

/// Desired state for one collection.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSpec {
    /// Collection options; see [`CollectionOptions`] for the accepted keys.
    #[serde(default)]
    pub options:      Option<CollectionOptions>,
    /// Indexes to keep in sync.
    #[serde(default)]
    pub indexes:      Option<IndexSpecs>,
    /// Legacy indexes to drop when present.
    #[serde(default)]
    pub drop_indexes: Option<Vec<String>>,
    /// Seed documents.
    #[serde(default)]
    pub data:         Option<Vec<Value>>,
}

/// A collection specification carrying its own name, as used by the array
/// shape of [`CollectionsSpec`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NamedCollectionSpec {
    /// Collection name.
    pub name: String,
    /// The specification body.
    #[serde(flatten)]
    pub spec: CollectionSpec,
}

/// Declared collections: a name → spec map, or a list of named specs.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CollectionsSpec {
    /// Array form: `[{ name, ...spec }, ...]`.
    List(Vec<NamedCollectionSpec>),
    /// Map form: `{ name: spec, ... }`.
    Named(BTreeMap<String, CollectionSpec>),
}

impl CollectionsSpec {
    /// Normalizes both accepted shapes into a uniform `(name, spec)` list.
    pub fn normalize(&self) -> Vec<(String, CollectionSpec)> {
        match self {
            CollectionsSpec::List(entries) => entries
                .iter()
                .map(|entry| (entry.name.clone(), entry.spec.clone()))
                .collect(),
            CollectionsSpec::Named(entries) => entries
                .iter()
                .map(|(name, spec)| (name.clone(), spec.clone()))
                .collect(),
        }
    }

    /// Declared collection names, in normalized order.
    pub fn names(&self) -> Vec<String> {
        match self {
            CollectionsSpec::List(entries) => {
                entries.iter().map(|entry| entry.name.clone()).collect()
            },
            CollectionsSpec::Named(entries) => entries.keys().cloned().collect(),
        }
    }

    /// Whether no collections are declared.
    pub fn is_empty(&self) -> bool {
        match self {
            CollectionsSpec::List(entries) => entries.is_empty(),
            CollectionsSpec::Named(entries) => entries.is_empty(),
        }
    }
}
