//! Bounded fan-out over independent async tasks.
//!
//! Reconciliation fans out over collections, indexes, documents, and server
//! parameters; all of those are independent of each other and only bounded
//! by how much concurrent load the caller wants to put on one connection.
//! `map_concurrent` caps in-flight tasks at `concurrency` (0 = unbounded),
//! fails fast on the first error while letting already-started tasks drain,
//! and collects results in completion order. Results carry their own
//! association with the input; ordering is not part of the contract.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::stream::{self, StreamExt};

use crate::error::Result;

/// Runs `op` over every item with at most `concurrency` tasks in flight.
///
/// A `concurrency` of 0 places no bound. On the first failure no further
/// tasks are started; tasks already in flight run to completion and their
/// results are discarded, then the first error is returned.
pub async fn map_concurrent<T, R, F, Fut>(
    items: Vec<T>,
    concurrency: usize,
    op: F,
) -> Result<Vec<R>>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<R>>,
{
    let limit = if concurrency == 0 { usize::MAX } else { concurrency };
    let failed = AtomicBool::new(false);
    let failed_ref = &failed;

    let mut completed = Vec::with_capacity(items.len());
    let mut first_error = None;
    {
        let mut tasks = stream::iter(items)
            .take_while(|_| futures::future::ready(!failed_ref.load(Ordering::Acquire)))
            .map(|item| op(item))
            .buffer_unordered(limit);
        while let Some(outcome) = tasks.next().await {
            match outcome {
                Ok(result) => completed.push(result),
                Err(error) => {
                    failed_ref.store(true, Ordering::Release);
                    if first_error.is_none() {
                        first_error = Some(error);
                    }
                },
            }
        }
    }

    match first_error {
        Some(error) => Err(error),
        None => Ok(completed),
    }
}
