//! Read-only gallery surface over the artifact store.
//!
//! Transport-agnostic: handlers return a status code and a body and leave
//! the HTTP plumbing to whoever hosts them.

use crate::store::{ArtifactStore, StoreError};
use tracing::error;

/// Liveness confirmation string.
pub const HEALTH_MESSAGE: &str = "Pixel Art Generator is Active!";

/// Listing result: status plus artifact ids, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryResponse {
    pub status: u16,
    pub artifacts: Vec<String>,
}

impl GalleryResponse {
    pub fn ok(artifacts: Vec<String>) -> Self {
        Self {
            status: 200,
            artifacts,
        }
    }

    /// Empty listing with a server-error status.
    pub fn unavailable() -> Self {
        Self {
            status: 500,
            artifacts: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// JSON array body, e.g. `["anim_2.js","anim_1.js"]`.
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.artifacts).unwrap_or_else(|_| "[]".to_string())
    }
}

/// Stateless view of the current artifacts.
#[derive(Clone)]
pub struct Gallery {
    store: ArtifactStore,
}

impl Gallery {
    pub fn new(store: ArtifactStore) -> Self {
        Self { store }
    }

    /// Current artifact ids, newest first.
    ///
    /// A storage failure yields an empty listing with status 500.
    pub async fn list_available(&self) -> GalleryResponse {
        match self.store.ids().await {
            Ok(ids) => GalleryResponse::ok(ids),
            Err(e) => {
                error!(error = %e, dir = %self.store.dir().display(), "error reading gen dir");
                GalleryResponse::unavailable()
            }
        }
    }

    /// Script text for a listed artifact.
    pub async fn artifact(&self, id: &str) -> Result<String, StoreError> {
        self.store.read(id).await
    }

    pub fn health(&self) -> &'static str {
        HEALTH_MESSAGE
    }
}
