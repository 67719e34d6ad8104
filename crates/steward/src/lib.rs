pub mod backend;
pub mod client;
pub mod collection;
pub mod connect;
pub mod db;
pub mod error;
pub mod index;
pub mod options;
pub mod params;
pub mod pool;
pub mod spec;
pub mod validation;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{Backend, CollectionInfo, SharedBackend};
pub use client::Client;
pub use collection::{Collection, IndexSyncResult, SeedOptions, SeedResult};
pub use connect::{ConnectOptions, Connected, connect, connect_and_initialize};
pub use db::{Database, InitializeOptions, InitializeSummary};
pub use error::{Result, StewardError};
pub use index::{IndexDef, IndexKeys, IndexSpecs, LiveIndex};
pub use options::{CollectionOptions, ModifiableOptions, options_in_sync};
pub use params::{ParameterOutcome, SERVER_PARAMETERS};
pub use spec::{CollectionSpec, CollectionsSpec, DatabaseSpec, JsonMap};
