use thiserror::Error;

use crate::client::Client;

/// Steward-wide error type for the reconciliation engine.
///
/// Errors fall into three families: validation errors raised before any
/// network round-trip (bad names, out-of-whitelist keys, empty required
/// inputs), server command errors carrying the message the server reported,
/// and transport errors propagated unmodified from the backend. Nothing in
/// the engine retries; idempotence of each reconciler is what makes a manual
/// rerun safe.
#[derive(Error, Debug)]
pub enum StewardError {
    /// The database name is missing or blank.
    #[error("Invalid database name: '{name}'")]
    InvalidDatabaseName {
        name: String,
    },

    /// The collection name is missing or blank.
    #[error("Invalid collection name: '{name}'")]
    InvalidCollectionName {
        name: String,
    },

    /// A declared index is missing a usable name.
    #[error("An index declared for collection '{collection}' is missing a non-blank name")]
    InvalidIndexName {
        collection: String,
    },

    /// A declared index has an empty key map.
    #[error("Index '{index}' declares no keys")]
    EmptyIndexKeys {
        index: String,
    },

    /// An index option key is outside the accepted whitelist.
    #[error("Invalid index option: {option} (index '{index}')")]
    InvalidIndexOption {
        index:  String,
        option: String,
    },

    /// `ensure_indexes` was invoked with an empty index specification.
    #[error("No indexes specified for collection '{collection}'")]
    NoIndexes {
        collection: String,
    },

    /// `initialize_collections` was invoked with an empty specification.
    #[error("No collections specified")]
    NoCollections,

    /// A seed document is not a JSON object.
    #[error("Seed documents for collection '{collection}' must be JSON objects")]
    InvalidSeedDocument {
        collection: String,
    },

    /// `initialize_server` was invoked with an empty parameter map.
    #[error("No server parameters specified")]
    NoServerParameters,

    /// A server parameter name is outside the accepted whitelist.
    #[error("Invalid server parameter: {name}")]
    InvalidServerParameter {
        name: String,
    },

    /// The server acknowledged a setParameter command with an error message.
    #[error("Failed setting {parameter}: {message}")]
    ServerParameterRejected {
        parameter: String,
        message:   String,
    },

    /// The server rejected an administrative command.
    #[error("Command '{command}' failed: {message}")]
    CommandFailed {
        command: String,
        message: String,
    },

    /// Connection-level failure reported by the transport collaborator.
    #[error("Transport error: {message}")]
    Transport {
        message: String,
    },

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    /// Initialization failed after the connection was opened.
    ///
    /// The orchestrator owns the connection at that point, so it closes it
    /// before propagating and attaches the client handle for callers (and
    /// tests) that need to assert the connection was released.
    #[error("Database initialization failed: {source}")]
    Initialization {
        #[source]
        source: Box<StewardError>,
        client: Client,
    },
}

/// Result type alias for steward operations.
pub type Result<T> = std::result::Result<T, StewardError>;
