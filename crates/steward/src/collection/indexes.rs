//! Index reconciliation: create what is missing, rebuild what drifted,
//! leave the rest alone.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, warn};

use super::coll::Collection;
use crate::error::{Result, StewardError};
use crate::index::{IndexSpecs, LiveIndex, index_has_changed};
use crate::pool;

/// How one declared index was reconciled.
enum IndexDisposition {
    Created,
    Modified,
    Unchanged,
}

/// Per-category index names from one `ensure_indexes` call.
///
/// The categories are the contract; ordering within them follows completion
/// order, not declaration order. Empty categories are omitted from the
/// serialized form.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IndexSyncResult {
    /// Indexes that did not exist and were created.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub created:   Vec<String>,
    /// Indexes that drifted and were dropped and recreated.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub modified:  Vec<String>,
    /// Indexes already matching their declaration.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unchanged: Vec<String>,
}

impl Collection {
    /// Ensures the declared indexes exist and match their declarations.
    ///
    /// The whole specification is validated before any network call. Each
    /// declared index is then reconciled independently and concurrently:
    /// absent indexes are created, drifted ones are dropped and recreated,
    /// matching ones are left untouched. Indexes that exist only on the
    /// server (such as `_id_`) are never touched.
    ///
    /// The drop/recreate pair is not atomic; a crash between the two leaves
    /// the index missing until the next run recreates it.
    pub async fn ensure_indexes(&self, indexes: &IndexSpecs) -> Result<IndexSyncResult> {
        let defs = indexes.normalize();
        if defs.is_empty() {
            return Err(StewardError::NoIndexes {
                collection: self.name().to_owned(),
            });
        }
        for def in &defs {
            def.validate(self.name())?;
        }

        let existing: BTreeMap<String, LiveIndex> = self
            .list_indexes()
            .await?
            .into_iter()
            .map(|index| (index.name.clone(), index))
            .collect();

        let outcomes = pool::map_concurrent(defs, 0, |def| {
            let collection = self.clone();
            let live = existing.get(&def.name).cloned();
            async move {
                match live {
                    None => {
                        debug!("Index {} missing on {}, creating", def.name, collection.name());
                        collection.create_index(&def).await?;
                        Ok((def.name, IndexDisposition::Created))
                    },
                    Some(live) if !index_has_changed(&def, &live) => {
                        Ok((def.name, IndexDisposition::Unchanged))
                    },
                    Some(_) => {
                        warn!(
                            "Index {} on {} drifted from its declaration, rebuilding",
                            def.name,
                            collection.name()
                        );
                        collection.drop_index(&def.name).await?;
                        collection.create_index(&def).await?;
                        Ok((def.name, IndexDisposition::Modified))
                    },
                }
            }
        })
        .await?;

        let mut result = IndexSyncResult::default();
        for (name, disposition) in outcomes {
            match disposition {
                IndexDisposition::Created => result.created.push(name),
                IndexDisposition::Modified => result.modified.push(name),
                IndexDisposition::Unchanged => result.unchanged.push(name),
            }
        }
        Ok(result)
    }

    /// Drops each named legacy index that exists, returning the names that
    /// were actually dropped.
    ///
    /// Check-then-drop rather than an atomic drop-if-exists; dropping an
    /// index that vanished between the check and the drop is the only race,
    /// and a rerun repairs it.
    pub async fn drop_legacy_indexes(&self, names: &[String]) -> Result<Vec<String>> {
        let dropped = pool::map_concurrent(names.to_vec(), 0, |name| {
            let collection = self.clone();
            async move {
                if collection.index_exists(&name).await? {
                    debug!("Dropping legacy index {} on {}", name, collection.name());
                    collection.drop_index(&name).await?;
                    Ok(Some(name))
                }
                else {
                    Ok(None)
                }
            }
        })
        .await?;
        Ok(dropped.into_iter().flatten().collect())
    }
}
