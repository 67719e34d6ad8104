//! Seed-document population.
//!
//! Identified documents (`_id` present) carry their own idempotence key and
//! are always written with set-on-insert semantics: created when absent,
//! never overwritten once present, so operators can edit seeded documents
//! without a redeploy reverting them. Unidentified documents have no such
//! key; the only safe idempotence signal is whether the collection was
//! empty when the batch started, so on a non-empty collection they are
//! skipped rather than duplicated on every run.

use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, trace};

use super::coll::Collection;
use crate::error::{Result, StewardError};
use crate::pool;
use crate::validation;

/// What happened to one seed document.
enum SeedDisposition {
    Inserted,
    Upserted,
    Skipped,
}

/// Counters from one `initialize_data` call.
///
/// Accumulated locally per call and returned by value; invocations share no
/// state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedResult {
    /// Unidentified documents inserted into an initially empty collection.
    pub inserted: u64,
    /// Identified documents written with set-on-insert semantics.
    pub upserted: u64,
    /// Unidentified documents skipped because the collection was non-empty.
    pub skipped:  u64,
}

/// Options for [`Collection::initialize_data`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SeedOptions {
    /// Documents processed concurrently; 0 places no bound.
    pub concurrency: usize,
}

impl Collection {
    /// Populates the collection with seed documents.
    ///
    /// The collection's document count is observed once, before any write
    /// in this batch, and that observation drives the policy for every
    /// document: identified documents are upserted with `$setOnInsert`;
    /// unidentified documents are inserted only when the collection was
    /// empty at call time and skipped otherwise. An empty input returns
    /// zero counters without querying the count.
    pub async fn initialize_data(
        &self,
        documents: &[Value],
        options: &SeedOptions,
    ) -> Result<SeedResult> {
        if documents.is_empty() {
            return Ok(SeedResult::default());
        }
        if !validation::all_objects(documents) {
            return Err(StewardError::InvalidSeedDocument {
                collection: self.name().to_owned(),
            });
        }

        let existing = self.count_documents().await?;
        trace!(
            "Seeding {} documents into {} ({} already present)",
            documents.len(),
            self.name(),
            existing
        );

        let outcomes = pool::map_concurrent(documents.to_vec(), options.concurrency, |document| {
            let collection = self.clone();
            async move {
                match document.get("_id").cloned() {
                    Some(id) => {
                        collection
                            .update_one(
                                &json!({ "_id": id }),
                                &json!({ "$setOnInsert": document }),
                                true,
                            )
                            .await?;
                        Ok(SeedDisposition::Upserted)
                    },
                    None if existing > 0 => Ok(SeedDisposition::Skipped),
                    None => {
                        collection.insert_one(&document).await?;
                        Ok(SeedDisposition::Inserted)
                    },
                }
            }
        })
        .await?;

        let mut result = SeedResult::default();
        for outcome in outcomes {
            match outcome {
                SeedDisposition::Inserted => result.inserted += 1,
                SeedDisposition::Upserted => result.upserted += 1,
                SeedDisposition::Skipped => result.skipped += 1,
            }
        }
        debug!(
            "Seeded {}: {} inserted, {} upserted, {} skipped",
            self.name(),
            result.inserted,
            result.upserted,
            result.skipped
        );
        Ok(result)
    }
}
