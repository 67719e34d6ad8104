use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::backend::SharedBackend;
use crate::collection::Collection;
use crate::error::{Result, StewardError};
use crate::options::{CollectionOptions, options_in_sync};
use crate::params::{self, ParameterOutcome};
use crate::spec::JsonMap;
use crate::validation;

/// A handle to one database.
///
/// Composes the shared backend handle with a database name and exposes the
/// reconciliation entry points. Cloning is cheap; clones share the one
/// underlying connection.
#[derive(Debug, Clone)]
pub struct Database {
    backend: SharedBackend,
    name:    String,
}

impl Database {
    pub(crate) fn new(backend: SharedBackend, name: &str) -> Self {
        Database {
            backend,
            name: name.to_owned(),
        }
    }

    /// The database name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn backend(&self) -> &SharedBackend {
        &self.backend
    }

    /// Returns a handle to the named collection without touching the
    /// server.
    pub fn collection(&self, name: &str) -> Collection {
        Collection::new(self.backend.clone(), &self.name, name)
    }

    /// Ensures a collection exists with its options in sync.
    ///
    /// An absent collection is created with the full declared option set.
    /// For an existing collection, declared and live options are projected
    /// onto the modifiable subset; when they differ a `collMod` command
    /// carrying only that projection is issued. Creation-only options
    /// (`capped`, `size`, ...) are immutable by database design and never
    /// re-applied to an existing collection.
    pub async fn ensure_collection(
        &self,
        name: &str,
        options: Option<&CollectionOptions>,
    ) -> Result<Collection> {
        if validation::is_blank(name) {
            return Err(StewardError::InvalidCollectionName {
                name: name.to_owned(),
            });
        }
        let default_options = CollectionOptions::default();
        let options = options.unwrap_or(&default_options);

        trace!("Ensuring collection {} in {}", name, self.name);
        let live = self.backend.list_collections(&self.name, Some(name)).await?;
        match live.first() {
            None => {
                debug!("Collection {} missing in {}, creating", name, self.name);
                self.backend
                    .create_collection(&self.name, name, options)
                    .await?;
            },
            Some(info) => {
                if !options_in_sync(options, &info.options)? {
                    debug!("Collection {} options drifted, issuing collMod", name);
                    let command = options.modifiable().coll_mod_command(name)?;
                    self.backend.run_command(&self.name, command).await?;
                }
            },
        }
        Ok(self.collection(name))
    }

    /// Synchronizes whitelisted server parameters with their declared
    /// values. See the `params` module for the diff-and-set policy.
    pub async fn initialize_server(
        &self,
        parameters: &JsonMap,
    ) -> Result<BTreeMap<String, ParameterOutcome>> {
        params::sync_parameters(&self.backend, parameters).await
    }
}
