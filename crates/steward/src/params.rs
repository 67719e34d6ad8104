//! Server runtime parameter reconciliation.
//!
//! Parameters are diffed against one `getParameter: "*"` snapshot and only
//! the deltas are written, each through its own `setParameter` command.
//! Some parameters are invalid to set together or need distinct privileges,
//! so per-parameter commands keep a failure isolated to the parameter that
//! caused it.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, trace};

use crate::backend::SharedBackend;
use crate::error::{Result, StewardError};
use crate::pool;
use crate::spec::JsonMap;
use crate::validation;

/// Accepted server parameter names.
///
/// Carried over from the parameters the engine has been used to manage in
/// production; anything outside this set rejects the whole batch before a
/// single command is issued.
pub const SERVER_PARAMETERS: &[&str] = &[
    "clusterAuthMode",
    "ldapUserCacheInvalidationInterval",
    "scramIterationCount",
    "scramSHA256IterationCount",
    "sslMode",
    "tlsMode",
    "cursorTimeoutMillis",
    "failIndexKeyTooLong",
    "notablescan",
    "ttlMonitorEnabled",
    "tcpFastOpenQueueSize",
    "disableJavaScriptJIT",
    "maxIndexBuildMemoryUsageMegabytes",
    "watchdogPeriodSeconds",
    "tcmallocReleaseRate",
    "logLevel",
    "logComponentVerbosity",
    "maxLogSizeKB",
    "quiet",
    "redactClientLogData",
    "traceExceptions",
    "diagnosticDataCollectionEnabled",
    "diagnosticDataCollectionDirectoryPath",
    "diagnosticDataCollectionDirectorySizeMB",
    "diagnosticDataCollectionFileSizeMB",
    "diagnosticDataCollectionPeriodMillis",
    "enableFlowControl",
    "flowControlTargetLagSeconds",
    "flowControlWarnThresholdSeconds",
    "initialSyncTransientErrorRetryPeriodSeconds",
    "oplogInitialFindMaxSeconds",
    "rollbackTimeLimitSecs",
    "waitForSecondaryBeforeNoopWriteMS",
    "createRollbackDataFiles",
    "enableElectionHandoff",
    "replBatchLimitBytes",
    "enableShardedIndexConsistencyCheck",
    "maxTimeMSForHedgedReads",
    "readHedgingMode",
    "replMonitorMaxFailedChecks",
    "timeOutMonitoringReplicaSets",
    "ShardingTaskExecutorPoolReplicaSetMatching",
    "migrateCloneInsertionBatchDelayMS",
    "orphanCleanupDelaySecs",
    "rangeDeleterBatchDelayMS",
    "rangeDeleterBatchSize",
    "journalCommitInterval",
    "syncdelay",
    "wiredTigerMaxCacheOverflowSizeGB",
    "wiredTigerConcurrentReadTransactions",
    "wiredTigerConcurrentWriteTransactions",
    "wiredTigerEngineRuntimeConfig",
    "auditAuthorizationSuccess",
    "maxTransactionLockRequestTimeoutMillis",
];

/// Outcome of synchronizing one server parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ParameterOutcome {
    /// The live value already matched; no command was issued.
    InSync,
    /// The parameter was set; carries the server's raw command reply.
    Updated {
        /// The setParameter command reply.
        reply: Value,
    },
}

/// Synchronizes the declared parameters against the live server values.
///
/// Validates the whole batch first (non-empty, whitelist membership), takes
/// one snapshot of the current values, then issues a `setParameter` command
/// for each parameter that differs, concurrently. A reply carrying an
/// `errmsg` field fails the whole operation with the server's message.
pub(crate) async fn sync_parameters(
    backend: &SharedBackend,
    parameters: &JsonMap,
) -> Result<BTreeMap<String, ParameterOutcome>> {
    if parameters.is_empty() {
        return Err(StewardError::NoServerParameters);
    }
    if let Some(name) = validation::first_unknown_key(parameters, SERVER_PARAMETERS) {
        return Err(StewardError::InvalidServerParameter {
            name: name.to_owned(),
        });
    }

    trace!("Fetching current server parameter values");
    let current = backend
        .run_admin_command(json!({ "getParameter": "*" }))
        .await?;

    let declared: Vec<(String, Value)> = parameters
        .iter()
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
    let outcomes = pool::map_concurrent(declared, 0, |(name, value)| {
        let backend = backend.clone();
        let in_sync = current.get(&name) == Some(&value);
        async move {
            if in_sync {
                trace!("Server parameter {} already in sync", name);
                return Ok((name, ParameterOutcome::InSync));
            }
            debug!("Setting server parameter {}", name);
            let reply = backend
                .run_admin_command(json!({ "setParameter": 1, (name.as_str()): value }))
                .await?;
            if let Some(message) = reply.get("errmsg").and_then(Value::as_str) {
                return Err(StewardError::ServerParameterRejected {
                    parameter: name,
                    message:   message.to_owned(),
                });
            }
            Ok((name, ParameterOutcome::Updated { reply }))
        }
    })
    .await?;

    Ok(outcomes.into_iter().collect())
}
