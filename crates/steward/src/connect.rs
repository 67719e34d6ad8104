//! Connection entry points.
//!
//! `connect` opens the transport and returns handles; with `initialize`
//! set it also runs the full reconciliation pass. The caller never sees the
//! client handle until `connect` returns, so when initialization fails the
//! orchestrator is the only party able to release the connection: it closes
//! the client before propagating, and decorates the error with the handle
//! so callers and tests can assert the closure happened.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::backend::SharedBackend;
use crate::client::Client;
use crate::collection::Collection;
use crate::db::{Database, InitializeOptions, InitializeSummary};
use crate::error::{Result, StewardError};
use crate::params::ParameterOutcome;
use crate::spec::DatabaseSpec;
use crate::validation;

/// Run-time options for [`connect`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectOptions {
    /// Run the full reconciliation pass after connecting.
    pub initialize:  bool,
    /// Overrides the per-layer concurrency default; 0 places no bound.
    pub concurrency: usize,
}

/// The product of a successful connection.
#[derive(Debug)]
pub struct Connected {
    /// The connected client; the caller owns closing it.
    pub client:              Client,
    /// Handle to the specified database.
    pub db:                  Database,
    /// Collection handles keyed by declared name.
    pub collections:         BTreeMap<String, Collection>,
    /// Dropped legacy collections, when an initialization pass declared
    /// and performed drops.
    pub dropped_collections: Option<Vec<String>>,
    /// Server parameter outcomes, when an initialization pass declared
    /// parameters.
    pub server_parameters:   Option<BTreeMap<String, ParameterOutcome>>,
}

/// Connects to the database, optionally running full reconciliation.
pub async fn connect(
    backend: SharedBackend,
    spec: &DatabaseSpec,
    options: &ConnectOptions,
) -> Result<Connected> {
    if options.initialize {
        return connect_and_initialize(backend, spec, options).await;
    }

    let (client, db) = open(backend, spec).await?;
    let collections = declared_handles(&db, spec);
    Ok(Connected {
        client,
        db,
        collections,
        dropped_collections: None,
        server_parameters: None,
    })
}

/// Connects and synchronizes the database with the full specification.
///
/// On any initialization failure the connection is closed before the error
/// propagates; the original error is preserved and carries the client
/// handle.
pub async fn connect_and_initialize(
    backend: SharedBackend,
    spec: &DatabaseSpec,
    options: &ConnectOptions,
) -> Result<Connected> {
    let (client, db) = open(backend, spec).await?;
    let initialize_options = InitializeOptions {
        concurrency: options.concurrency,
    };
    match db.initialize_all(spec, &initialize_options).await {
        Ok(summary) => {
            info!("Database {} initialized", db.name());
            Ok(assemble(client, db, spec, summary))
        },
        Err(error) => {
            // The caller has no access to the client yet; release the
            // connection here and hand the client back through the error.
            if let Err(close_error) = client.close().await {
                warn!("Closing connection after failed initialization also failed: {close_error}");
            }
            Err(StewardError::Initialization {
                source: Box::new(error),
                client,
            })
        },
    }
}

async fn open(backend: SharedBackend, spec: &DatabaseSpec) -> Result<(Client, Database)> {
    if validation::is_blank(&spec.name) {
        return Err(StewardError::InvalidDatabaseName {
            name: spec.name.clone(),
        });
    }
    debug!("Connecting to database {}", spec.name);
    backend.connect().await?;
    let client = Client::new(backend);
    let db = client.database(&spec.name);
    Ok((client, db))
}

fn declared_handles(db: &Database, spec: &DatabaseSpec) -> BTreeMap<String, Collection> {
    spec.collections
        .as_ref()
        .map(|collections| {
            collections
                .names()
                .into_iter()
                .map(|name| {
                    let handle = db.collection(&name);
                    (name, handle)
                })
                .collect()
        })
        .unwrap_or_default()
}

fn assemble(
    client: Client,
    db: Database,
    spec: &DatabaseSpec,
    summary: InitializeSummary,
) -> Connected {
    let collections = if summary.collections.is_empty() {
        declared_handles(&db, spec)
    }
    else {
        summary.collections
    };
    Connected {
        client,
        db,
        collections,
        dropped_collections: summary.dropped_collections,
        server_parameters: summary.server_parameters,
    }
}
