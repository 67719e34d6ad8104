//! Client handle owning the shared backend connection.

use tracing::debug;

use crate::backend::SharedBackend;
use crate::db::Database;
use crate::error::Result;

/// A connected client.
///
/// Wraps the backend handle by composition rather than extending any driver
/// type; cloning is cheap and every clone shares the one underlying
/// connection.
#[derive(Debug, Clone)]
pub struct Client {
    backend: SharedBackend,
}

impl Client {
    /// Wraps an already-connected backend.
    pub fn new(backend: SharedBackend) -> Self {
        Client {
            backend,
        }
    }

    /// Returns a handle to the named database.
    pub fn database(&self, name: &str) -> Database {
        Database::new(self.backend.clone(), name)
    }

    /// Closes the underlying connection.
    pub async fn close(&self) -> Result<()> {
        debug!("Closing client connection");
        self.backend.close().await
    }
}
