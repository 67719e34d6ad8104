//! Index definitions as declared by callers and as reported by the server.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::{Result, StewardError};
use crate::spec::JsonMap;
use crate::validation;

/// Accepted index option keys.
///
/// Anything outside this set rejects the whole `ensure_indexes` call before
/// any network round-trip.
pub const INDEX_OPTIONS: &[&str] = &[
    "background",
    "unique",
    "partialFilterExpression",
    "sparse",
    "expireAfterSeconds",
    "storageEngine",
    "weights",
    "default_language",
    "language_override",
    "textIndexVersion",
    "2dsphereIndexVersion",
    "bits",
    "min",
    "max",
    "bucketSize",
];

/// Synthetic key fields the server substitutes for text-indexed fields.
pub const TEXT_KEY_FIELDS: &[&str] = &["_fts", "_ftsx"];

/// An ordered field → direction map for one index.
///
/// Key order is significant for compound indexes, so entries are kept in
/// declaration order and equality is order-sensitive. Directions are plain
/// JSON values: `1`, `-1`, or a kind string such as `"text"` or
/// `"2dsphere"`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexKeys(Vec<(String, Value)>);

impl IndexKeys {
    /// Builds a key map from `(field, direction)` pairs in order.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        IndexKeys(
            entries
                .into_iter()
                .map(|(field, direction)| (field.into(), direction))
                .collect(),
        )
    }

    /// Iterates entries in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &(String, Value)> {
        self.0.iter()
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the key map has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether any key declares a text direction.
    pub fn has_text(&self) -> bool {
        self.0.iter().any(|(_, direction)| is_text_direction(direction))
    }

    /// The subset of entries that do not declare a text direction, in order.
    pub fn non_text(&self) -> IndexKeys {
        IndexKeys(
            self.0
                .iter()
                .filter(|(_, direction)| !is_text_direction(direction))
                .cloned()
                .collect(),
        )
    }

    /// Field names of the entries that declare a text direction, in order.
    pub fn text_fields(&self) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(_, direction)| is_text_direction(direction))
            .map(|(field, _)| field.as_str())
            .collect()
    }

    /// A copy with the named fields removed.
    pub fn without_fields(&self, fields: &[&str]) -> IndexKeys {
        IndexKeys(
            self.0
                .iter()
                .filter(|(field, _)| !fields.contains(&field.as_str()))
                .cloned()
                .collect(),
        )
    }
}

/// Whether a key direction value marks a text-indexed field.
///
/// Matches the server's convention: any string direction containing "text",
/// case-insensitively.
pub fn is_text_direction(direction: &Value) -> bool {
    direction
        .as_str()
        .is_some_and(|kind| kind.to_ascii_lowercase().contains("text"))
}

impl Serialize for IndexKeys {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (field, direction) in &self.0 {
            map.serialize_entry(field, direction)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for IndexKeys {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct KeysVisitor;

        impl<'de> Visitor<'de> for KeysVisitor {
            type Value = IndexKeys;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a map of field names to index directions")
            }

            fn visit_map<A>(self, mut access: A) -> std::result::Result<IndexKeys, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::new();
                while let Some((field, direction)) = access.next_entry::<String, Value>()? {
                    entries.push((field, direction));
                }
                Ok(IndexKeys(entries))
            }
        }

        deserializer.deserialize_map(KeysVisitor)
    }
}

/// One declared index: a name, an ordered key map, and whitelisted options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDef {
    /// Index name, matched against the server's index name.
    pub name:    String,
    /// Ordered field → direction map.
    pub keys:    IndexKeys,
    /// Index options, restricted to [`INDEX_OPTIONS`].
    #[serde(default, skip_serializing_if = "JsonMap::is_empty")]
    pub options: JsonMap,
}

impl IndexDef {
    /// Validates the definition against the index invariants.
    ///
    /// Runs before any network call: blank names, empty key maps, and
    /// out-of-whitelist option keys all fail here, naming the offender.
    pub fn validate(&self, collection: &str) -> Result<()> {
        if validation::is_blank(&self.name) {
            return Err(StewardError::InvalidIndexName {
                collection: collection.to_owned(),
            });
        }
        if self.keys.is_empty() {
            return Err(StewardError::EmptyIndexKeys {
                index: self.name.clone(),
            });
        }
        if let Some(option) = validation::first_unknown_key(&self.options, INDEX_OPTIONS) {
            return Err(StewardError::InvalidIndexOption {
                index:  self.name.clone(),
                option: option.to_owned(),
            });
        }
        Ok(())
    }
}

/// An index definition as it appears in the map form of a specification,
/// where the name is the map key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnnamedIndexDef {
    /// Ordered field → direction map.
    pub keys:    IndexKeys,
    /// Index options, restricted to [`INDEX_OPTIONS`].
    #[serde(default, skip_serializing_if = "JsonMap::is_empty")]
    pub options: JsonMap,
}

/// Declared indexes for one collection: a name → definition map, or a list
/// of definitions carrying their own `name` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IndexSpecs {
    /// Array form: `[{ name, keys, options? }, ...]`.
    List(Vec<IndexDef>),
    /// Map form: `{ name: { keys, options? }, ... }`.
    Named(BTreeMap<String, UnnamedIndexDef>),
}

impl IndexSpecs {
    /// Normalizes both accepted shapes into a uniform definition list.
    pub fn normalize(&self) -> Vec<IndexDef> {
        match self {
            IndexSpecs::List(defs) => defs.clone(),
            IndexSpecs::Named(defs) => defs
                .iter()
                .map(|(name, def)| IndexDef {
                    name:    name.clone(),
                    keys:    def.keys.clone(),
                    options: def.options.clone(),
                })
                .collect(),
        }
    }

    /// Whether the specification declares no indexes at all.
    pub fn is_empty(&self) -> bool {
        match self {
            IndexSpecs::List(defs) => defs.is_empty(),
            IndexSpecs::Named(defs) => defs.is_empty(),
        }
    }
}

/// A live index descriptor as reported by the server.
///
/// The server stores text indexes through synthetic `_fts`/`_ftsx` key
/// fields and flattens option values (weights, languages, uniqueness, ...)
/// to the top level of the descriptor; everything besides `name` and `key`
/// is collected into `attributes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveIndex {
    /// Server-side index name.
    pub name:       String,
    /// The stored key specification.
    pub key:        IndexKeys,
    /// Flattened descriptor fields (`v`, `weights`, `unique`, ...).
    #[serde(flatten)]
    pub attributes: JsonMap,
}
