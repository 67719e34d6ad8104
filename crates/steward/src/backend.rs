//! The abstract RPC collaborator the reconciliation engine drives.
//!
//! The engine never talks to a wire protocol directly; it drives a
//! [`Backend`], which models the small command surface it needs from a
//! MongoDB-compatible server. A driver binding implements this trait over a
//! real connection; the in-crate test double implements it in memory with
//! realistic server behavior.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::index::{IndexDef, LiveIndex};
use crate::options::CollectionOptions;

/// Shared handle to a backend implementation.
pub type SharedBackend = Arc<dyn Backend>;

/// One entry from the server's collection listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionInfo {
    /// Collection name.
    pub name:    String,
    /// Creation options as the server reports them.
    #[serde(default)]
    pub options: Value,
}

/// The RPC surface the engine requires from the database.
///
/// Every method corresponds to one network round-trip. Implementations own
/// their transport concerns (timeouts, auth, wire encoding); errors they
/// produce are propagated by the engine unmodified.
#[async_trait]
pub trait Backend: fmt::Debug + Send + Sync {
    /// Opens the underlying connection.
    async fn connect(&self) -> Result<()>;

    /// Releases the underlying connection.
    async fn close(&self) -> Result<()>;

    /// Lists collections, optionally filtered to one name.
    async fn list_collections(
        &self,
        database: &str,
        name: Option<&str>,
    ) -> Result<Vec<CollectionInfo>>;

    /// Creates a collection with the full declared option set.
    async fn create_collection(
        &self,
        database: &str,
        name: &str,
        options: &CollectionOptions,
    ) -> Result<()>;

    /// Drops a collection.
    async fn drop_collection(&self, database: &str, name: &str) -> Result<()>;

    /// Runs a database-level command (e.g. `collMod`) and returns the reply.
    async fn run_command(&self, database: &str, command: Value) -> Result<Value>;

    /// Runs an admin-level command (`getParameter`/`setParameter`) and
    /// returns the reply.
    async fn run_admin_command(&self, command: Value) -> Result<Value>;

    /// Lists the live indexes of a collection.
    async fn list_indexes(&self, database: &str, collection: &str) -> Result<Vec<LiveIndex>>;

    /// Creates an index from a declared definition.
    async fn create_index(&self, database: &str, collection: &str, index: &IndexDef)
    -> Result<()>;

    /// Drops an index by name.
    async fn drop_index(&self, database: &str, collection: &str, name: &str) -> Result<()>;

    /// Counts the documents in a collection.
    async fn count_documents(&self, database: &str, collection: &str) -> Result<u64>;

    /// Inserts a single document.
    async fn insert_one(&self, database: &str, collection: &str, document: &Value) -> Result<()>;

    /// Updates a single document matching `filter`, optionally inserting
    /// when nothing matches.
    async fn update_one(
        &self,
        database: &str,
        collection: &str,
        filter: &Value,
        update: &Value,
        upsert: bool,
    ) -> Result<()>;
}
