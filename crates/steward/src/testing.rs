//! In-memory backend double with realistic server behavior.
//!
//! The mock stores collections, indexes, documents, and server parameters
//! in memory and mimics the server-side behaviors the engine has to cope
//! with: an automatic `_id_` index on every collection, text index key
//! specs rewritten into synthetic `_fts`/`_ftsx` fields with weight and
//! language defaulting, and setParameter replies that can carry `errmsg`.
//! Every mutating call is recorded so tests can assert exactly which
//! commands a reconciliation pass issued.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::backend::{Backend, CollectionInfo};
use crate::error::{Result, StewardError};
use crate::index::{IndexDef, IndexKeys, LiveIndex};
use crate::options::CollectionOptions;
use crate::spec::JsonMap;

#[derive(Debug, Default)]
struct MemCollection {
    options:   Value,
    indexes:   Vec<LiveIndex>,
    documents: Vec<Value>,
}

#[derive(Debug, Default)]
struct State {
    connected:           bool,
    closed:              bool,
    collections:         BTreeMap<String, BTreeMap<String, MemCollection>>,
    parameters:          JsonMap,
    rejected_parameters: BTreeSet<String>,
    ops:                 Vec<String>,
}

/// An in-memory [`Backend`] for tests.
#[derive(Debug, Default)]
pub(crate) struct MemoryBackend {
    state: Mutex<State>,
}

impl MemoryBackend {
    pub(crate) fn new() -> Self {
        MemoryBackend::default()
    }

    /// Every mutating operation issued so far, in order.
    pub(crate) fn ops(&self) -> Vec<String> {
        self.state.lock().unwrap().ops.clone()
    }

    pub(crate) fn clear_ops(&self) {
        self.state.lock().unwrap().ops.clear();
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.state.lock().unwrap().connected
    }

    /// Seeds a live server parameter value.
    pub(crate) fn set_server_parameter(&self, name: &str, value: Value) {
        self.state
            .lock()
            .unwrap()
            .parameters
            .insert(name.to_owned(), value);
    }

    /// Makes setParameter reply with an `errmsg` for the named parameter.
    pub(crate) fn reject_parameter(&self, name: &str) {
        self.state
            .lock()
            .unwrap()
            .rejected_parameters
            .insert(name.to_owned());
    }

    pub(crate) fn documents(&self, database: &str, collection: &str) -> Vec<Value> {
        let state = self.state.lock().unwrap();
        state
            .collections
            .get(database)
            .and_then(|db| db.get(collection))
            .map(|col| col.documents.clone())
            .unwrap_or_default()
    }

    fn op(state: &mut State, op: String) {
        state.ops.push(op);
    }

    /// The descriptor the server would store for a declared definition.
    fn materialize(def: &IndexDef) -> LiveIndex {
        let mut attributes = JsonMap::new();
        attributes.insert("v".to_owned(), json!(2));

        if def.keys.has_text() {
            let mut entries: Vec<(String, Value)> = Vec::new();
            let mut synthetic_emitted = false;
            for (field, direction) in def.keys.iter() {
                if crate::index::is_text_direction(direction) {
                    if !synthetic_emitted {
                        entries.push(("_fts".to_owned(), json!("text")));
                        entries.push(("_ftsx".to_owned(), json!(1)));
                        synthetic_emitted = true;
                    }
                }
                else {
                    entries.push((field.clone(), direction.clone()));
                }
            }

            let weights = match def.options.get("weights").and_then(Value::as_object) {
                Some(weights) if !weights.is_empty() => weights.clone(),
                _ => {
                    let mut weights = JsonMap::new();
                    for field in def.keys.text_fields() {
                        weights.insert(field.to_owned(), json!(1));
                    }
                    weights
                },
            };
            attributes.insert("weights".to_owned(), Value::Object(weights));
            attributes.insert(
                "default_language".to_owned(),
                def.options
                    .get("default_language")
                    .cloned()
                    .unwrap_or_else(|| json!("english")),
            );
            attributes.insert(
                "language_override".to_owned(),
                def.options
                    .get("language_override")
                    .cloned()
                    .unwrap_or_else(|| json!("language")),
            );
            attributes.insert("textIndexVersion".to_owned(), json!(3));
            for (key, value) in &def.options {
                if !matches!(
                    key.as_str(),
                    "weights" | "default_language" | "language_override" | "textIndexVersion"
                ) {
                    attributes.insert(key.clone(), value.clone());
                }
            }
            LiveIndex {
                name: def.name.clone(),
                key: IndexKeys::from_entries(entries),
                attributes,
            }
        }
        else {
            for (key, value) in &def.options {
                attributes.insert(key.clone(), value.clone());
            }
            LiveIndex {
                name: def.name.clone(),
                key: def.keys.clone(),
                attributes,
            }
        }
    }

    fn id_index() -> LiveIndex {
        let mut attributes = JsonMap::new();
        attributes.insert("v".to_owned(), json!(2));
        LiveIndex {
            name: "_id_".to_owned(),
            key: IndexKeys::from_entries([("_id".to_owned(), json!(1))]),
            attributes,
        }
    }
}

fn entry<'a>(
    state: &'a mut State,
    database: &str,
    collection: &str,
) -> &'a mut MemCollection {
    state
        .collections
        .entry(database.to_owned())
        .or_default()
        .entry(collection.to_owned())
        .or_insert_with(|| MemCollection {
            options:   json!({}),
            indexes:   vec![MemoryBackend::id_index()],
            documents: Vec::new(),
        })
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn connect(&self) -> Result<()> {
        self.state.lock().unwrap().connected = true;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.state.lock().unwrap().closed = true;
        Ok(())
    }

    async fn list_collections(
        &self,
        database: &str,
        name: Option<&str>,
    ) -> Result<Vec<CollectionInfo>> {
        let state = self.state.lock().unwrap();
        let Some(db) = state.collections.get(database) else {
            return Ok(Vec::new());
        };
        Ok(db
            .iter()
            .filter(|(collection, _)| name.is_none_or(|n| n == collection.as_str()))
            .map(|(collection, col)| CollectionInfo {
                name:    collection.clone(),
                options: col.options.clone(),
            })
            .collect())
    }

    async fn create_collection(
        &self,
        database: &str,
        name: &str,
        options: &CollectionOptions,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state
            .collections
            .get(database)
            .is_some_and(|db| db.contains_key(name))
        {
            return Err(StewardError::CommandFailed {
                command: "create".to_owned(),
                message: format!("Collection already exists: {database}.{name}"),
            });
        }
        Self::op(&mut state, format!("createCollection:{name}"));
        state
            .collections
            .entry(database.to_owned())
            .or_default()
            .insert(
                name.to_owned(),
                MemCollection {
                    options:   serde_json::to_value(options)?,
                    indexes:   vec![Self::id_index()],
                    documents: Vec::new(),
                },
            );
        Ok(())
    }

    async fn drop_collection(&self, database: &str, name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let removed = state
            .collections
            .get_mut(database)
            .and_then(|db| db.remove(name));
        if removed.is_none() {
            return Err(StewardError::CommandFailed {
                command: "drop".to_owned(),
                message: format!("ns not found: {database}.{name}"),
            });
        }
        Self::op(&mut state, format!("dropCollection:{name}"));
        Ok(())
    }

    async fn run_command(&self, database: &str, command: Value) -> Result<Value> {
        let mut state = self.state.lock().unwrap();
        let Some(target) = command.get("collMod").and_then(Value::as_str) else {
            return Err(StewardError::CommandFailed {
                command: command.to_string(),
                message: "no such command".to_owned(),
            });
        };
        let target = target.to_owned();
        if !state
            .collections
            .get(database)
            .is_some_and(|db| db.contains_key(&target))
        {
            return Err(StewardError::CommandFailed {
                command: "collMod".to_owned(),
                message: format!("ns does not exist: {database}.{target}"),
            });
        }
        Self::op(&mut state, format!("collMod:{target}"));
        let col = entry(&mut state, database, &target);
        if let (Value::Object(options), Value::Object(changes)) =
            (&mut col.options, &command)
        {
            for (key, value) in changes {
                if key != "collMod" {
                    options.insert(key.clone(), value.clone());
                }
            }
        }
        Ok(json!({ "ok": 1 }))
    }

    async fn run_admin_command(&self, command: Value) -> Result<Value> {
        let mut state = self.state.lock().unwrap();
        if command.get("getParameter").is_some() {
            let mut reply = state.parameters.clone();
            reply.insert("ok".to_owned(), json!(1));
            return Ok(Value::Object(reply));
        }
        if command.get("setParameter").is_some() {
            let Some((name, value)) = command
                .as_object()
                .and_then(|c| c.iter().find(|(key, _)| key.as_str() != "setParameter"))
                .map(|(key, value)| (key.clone(), value.clone()))
            else {
                return Err(StewardError::CommandFailed {
                    command: "setParameter".to_owned(),
                    message: "no parameter provided".to_owned(),
                });
            };
            if state.rejected_parameters.contains(&name) {
                return Ok(json!({ "ok": 0, "errmsg": format!("not allowed to set {name}") }));
            }
            Self::op(&mut state, format!("setParameter:{name}"));
            state.parameters.insert(name, value);
            return Ok(json!({ "ok": 1 }));
        }
        Err(StewardError::CommandFailed {
            command: command.to_string(),
            message: "no such admin command".to_owned(),
        })
    }

    async fn list_indexes(&self, database: &str, collection: &str) -> Result<Vec<LiveIndex>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .collections
            .get(database)
            .and_then(|db| db.get(collection))
            .map(|col| col.indexes.clone())
            .unwrap_or_default())
    }

    async fn create_index(
        &self,
        database: &str,
        collection: &str,
        index: &IndexDef,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        Self::op(&mut state, format!("createIndex:{collection}.{}", index.name));
        let col = entry(&mut state, database, collection);
        if col.indexes.iter().any(|existing| existing.name == index.name) {
            return Err(StewardError::CommandFailed {
                command: "createIndexes".to_owned(),
                message: format!("Index already exists: {}", index.name),
            });
        }
        col.indexes.push(Self::materialize(index));
        Ok(())
    }

    async fn drop_index(&self, database: &str, collection: &str, name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        Self::op(&mut state, format!("dropIndex:{collection}.{name}"));
        let col = entry(&mut state, database, collection);
        let before = col.indexes.len();
        col.indexes.retain(|index| index.name != name);
        if col.indexes.len() == before {
            return Err(StewardError::CommandFailed {
                command: "dropIndexes".to_owned(),
                message: format!("index not found with name [{name}]"),
            });
        }
        Ok(())
    }

    async fn count_documents(&self, database: &str, collection: &str) -> Result<u64> {
        let state = self.state.lock().unwrap();
        Ok(state
            .collections
            .get(database)
            .and_then(|db| db.get(collection))
            .map(|col| col.documents.len() as u64)
            .unwrap_or_default())
    }

    async fn insert_one(&self, database: &str, collection: &str, document: &Value) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        Self::op(&mut state, format!("insert:{collection}"));
        let col = entry(&mut state, database, collection);
        col.documents.push(document.clone());
        Ok(())
    }

    async fn update_one(
        &self,
        database: &str,
        collection: &str,
        filter: &Value,
        update: &Value,
        upsert: bool,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        Self::op(&mut state, format!("update:{collection}"));
        let col = entry(&mut state, database, collection);
        let id = filter.get("_id");
        let matched = col
            .documents
            .iter()
            .any(|document| id.is_some() && document.get("_id") == id);
        if matched {
            // Set-on-insert only: an existing document is left untouched.
            return Ok(());
        }
        if upsert {
            if let Some(document) = update.get("$setOnInsert") {
                col.documents.push(document.clone());
            }
        }
        Ok(())
    }
}
