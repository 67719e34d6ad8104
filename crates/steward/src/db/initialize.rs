//! Orchestration of full-specification initialization.
//!
//! One collection is reconciled as: ensure the collection first (indexes
//! and data need an existing, correctly-shaped collection), then indexes,
//! legacy-index drops, and seed data concurrently. Independent collections,
//! and the three top-level phases (server parameters, collections,
//! legacy-collection drops), run concurrently over the one shared
//! connection; the server itself serializes whatever conflicts.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info};

use super::database::Database;
use crate::collection::{Collection, SeedOptions};
use crate::error::{Result, StewardError};
use crate::params::ParameterOutcome;
use crate::pool;
use crate::spec::{CollectionSpec, CollectionsSpec, DatabaseSpec};

/// Run-time options for fleet initialization.
#[derive(Debug, Clone, Copy, Default)]
pub struct InitializeOptions {
    /// Collections initialized concurrently; 0 places no bound.
    pub concurrency: usize,
}

/// Aggregated outcome of one top-level initialization pass.
#[derive(Debug, Default, Serialize)]
pub struct InitializeSummary {
    /// Initialized collection handles, keyed by name.
    #[serde(skip)]
    pub collections:         BTreeMap<String, Collection>,
    /// Names of legacy collections that existed and were dropped; absent
    /// when no drops were declared.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dropped_collections: Option<Vec<String>>,
    /// Per-parameter outcomes; absent when no parameters were declared.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_parameters:   Option<BTreeMap<String, ParameterOutcome>>,
}

impl Database {
    /// Synchronizes one collection specification: options, then indexes,
    /// legacy-index drops, and seed data concurrently.
    ///
    /// Any sub-operation failure fails the whole call; the returned handle
    /// is only produced once every sub-operation settled successfully.
    pub async fn initialize_collection(
        &self,
        name: &str,
        spec: &CollectionSpec,
    ) -> Result<Collection> {
        let collection = self.ensure_collection(name, spec.options.as_ref()).await?;

        let indexes = async {
            match &spec.indexes {
                Some(indexes) => collection.ensure_indexes(indexes).await.map(Some),
                None => Ok(None),
            }
        };
        let legacy = async {
            match &spec.drop_indexes {
                Some(names) if !names.is_empty() => {
                    collection.drop_legacy_indexes(names).await.map(Some)
                },
                _ => Ok(None),
            }
        };
        let seed = async {
            match &spec.data {
                Some(documents) => {
                    collection
                        .initialize_data(documents, &SeedOptions::default())
                        .await
                        .map(Some)
                },
                None => Ok(None),
            }
        };
        let (index_result, dropped, seeded) = tokio::try_join!(indexes, legacy, seed)?;

        if let Some(result) = index_result {
            debug!(
                "Indexes on {}: {} created, {} modified, {} unchanged",
                name,
                result.created.len(),
                result.modified.len(),
                result.unchanged.len()
            );
        }
        if let Some(dropped) = dropped {
            if !dropped.is_empty() {
                debug!("Dropped legacy indexes on {}: {:?}", name, dropped);
            }
        }
        if let Some(seeded) = seeded {
            debug!("Seed outcome for {}: {:?}", name, seeded);
        }
        Ok(collection)
    }

    /// Initializes every declared collection at the given concurrency.
    ///
    /// Fail-fast: a single collection's failure fails the whole call and no
    /// partial map is returned.
    pub async fn initialize_collections(
        &self,
        collections: &CollectionsSpec,
        options: &InitializeOptions,
    ) -> Result<BTreeMap<String, Collection>> {
        let entries = collections.normalize();
        if entries.is_empty() {
            return Err(StewardError::NoCollections);
        }
        let initialized = pool::map_concurrent(entries, options.concurrency, |(name, spec)| {
            let database = self.clone();
            async move {
                let collection = database.initialize_collection(&name, &spec).await?;
                Ok((name, collection))
            }
        })
        .await?;
        Ok(initialized.into_iter().collect())
    }

    /// Drops each named collection that exists, returning the dropped
    /// subset.
    pub async fn drop_collections(&self, names: &[String]) -> Result<Vec<String>> {
        let live = self.backend().list_collections(self.name(), None).await?;
        let existing: Vec<String> = live
            .into_iter()
            .map(|info| info.name)
            .filter(|name| names.contains(name))
            .collect();
        let dropped = pool::map_concurrent(existing, 0, |name| {
            let database = self.clone();
            async move {
                info!("Dropping legacy collection {}.{}", database.name(), name);
                database.backend().drop_collection(database.name(), &name).await?;
                Ok(name)
            }
        })
        .await?;
        Ok(dropped)
    }

    /// Runs the full initialization pass for one specification.
    ///
    /// The three phases are independent and run concurrently: server
    /// parameters, collection initialization, legacy-collection drops.
    /// Phases with nothing declared are skipped and omitted from the
    /// summary. The first failure fails the pass.
    pub async fn initialize_all(
        &self,
        spec: &DatabaseSpec,
        options: &InitializeOptions,
    ) -> Result<InitializeSummary> {
        let parameters = async {
            match &spec.server_parameters {
                Some(parameters) if !parameters.is_empty() => {
                    self.initialize_server(parameters).await.map(Some)
                },
                _ => Ok(None),
            }
        };
        let collections = async {
            match &spec.collections {
                Some(collections) if !collections.is_empty() => self
                    .initialize_collections(collections, options)
                    .await
                    .map(Some),
                _ => Ok(None),
            }
        };
        let drops = async {
            match &spec.drop_collections {
                Some(names) if !names.is_empty() => self.drop_collections(names).await.map(Some),
                _ => Ok(None),
            }
        };

        let (server_parameters, collections, dropped_collections) =
            tokio::try_join!(parameters, collections, drops)?;
        Ok(InitializeSummary {
            collections: collections.unwrap_or_default(),
            dropped_collections,
            server_parameters,
        })
    }
}
