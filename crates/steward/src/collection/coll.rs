use serde_json::Value;
use tracing::trace;

use crate::backend::SharedBackend;
use crate::error::Result;
use crate::index::{IndexDef, LiveIndex};

/// A handle to one collection.
///
/// Composes the shared backend handle with the database and collection
/// names; it holds no live state of its own, so cloning is cheap and every
/// clone drives the same underlying connection. Reconciliation entry points
/// (`ensure_indexes`, `initialize_data`) live in the sibling operation
/// modules.
#[derive(Debug, Clone)]
pub struct Collection {
    backend:  SharedBackend,
    database: String,
    name:     String,
}

impl Collection {
    pub(crate) fn new(backend: SharedBackend, database: &str, name: &str) -> Self {
        Collection {
            backend,
            database: database.to_owned(),
            name: name.to_owned(),
        }
    }

    /// The collection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The name of the database this collection belongs to.
    pub fn database_name(&self) -> &str {
        &self.database
    }

    /// Lists the collection's live indexes.
    pub async fn list_indexes(&self) -> Result<Vec<LiveIndex>> {
        self.backend.list_indexes(&self.database, &self.name).await
    }

    /// Whether an index with the given name exists on the server.
    pub async fn index_exists(&self, name: &str) -> Result<bool> {
        let indexes = self.list_indexes().await?;
        Ok(indexes.iter().any(|index| index.name == name))
    }

    /// Creates an index from a declared definition.
    pub async fn create_index(&self, index: &IndexDef) -> Result<()> {
        trace!("Creating index {} on {}", index.name, self.name);
        self.backend
            .create_index(&self.database, &self.name, index)
            .await
    }

    /// Drops an index by name.
    pub async fn drop_index(&self, name: &str) -> Result<()> {
        trace!("Dropping index {} on {}", name, self.name);
        self.backend
            .drop_index(&self.database, &self.name, name)
            .await
    }

    /// Counts the documents in the collection.
    pub async fn count_documents(&self) -> Result<u64> {
        self.backend
            .count_documents(&self.database, &self.name)
            .await
    }

    /// Inserts a single document.
    pub async fn insert_one(&self, document: &Value) -> Result<()> {
        self.backend
            .insert_one(&self.database, &self.name, document)
            .await
    }

    /// Updates a single document matching `filter`, inserting when nothing
    /// matches and `upsert` is set.
    pub async fn update_one(&self, filter: &Value, update: &Value, upsert: bool) -> Result<()> {
        self.backend
            .update_one(&self.database, &self.name, filter, update, upsert)
            .await
    }
}
