//! Durable artifact storage with a fixed retention cap.
//!
//! One script per file in a single flat directory. The directory is the
//! source of truth: listing, counting and eviction all read it directly, so
//! files added or removed out-of-band are picked up on the next call.

use crate::script::Script;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};

/// Default number of artifacts kept on disk.
pub const RETENTION_CAP: usize = 20;

const ARTIFACT_PREFIX: &str = "anim_";
const ARTIFACT_EXTENSION: &str = "js";

/// Errors from storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Artifact id already in use: {0}")]
    Collision(String),

    #[error("Invalid artifact id: {0}")]
    InvalidId(String),

    #[error("Artifact not found: {0}")]
    NotFound(String),
}

/// Source of artifact creation timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Deletes artifact files during eviction.
#[async_trait]
pub trait FileRemover: Send + Sync {
    async fn remove(&self, path: &Path) -> std::io::Result<()>;
}

/// Removes files from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsRemover;

#[async_trait]
impl FileRemover for FsRemover {
    async fn remove(&self, path: &Path) -> std::io::Result<()> {
        fs::remove_file(path).await
    }
}

/// A stored animation script.
#[derive(Debug, Clone)]
pub struct Artifact {
    /// File name, e.g. `anim_1718000000000.js`.
    pub id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Listing entry: identity and recency only, no content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSummary {
    pub id: String,
    pub modified: SystemTime,
}

/// Outcome of one eviction pass.
#[derive(Debug, Clone, Default)]
pub struct RetentionReport {
    /// Artifacts left in place.
    pub kept: usize,
    /// Ids removed this pass.
    pub deleted: Vec<String>,
    /// Ids whose removal failed; they are retried on the next pass.
    pub failed: Vec<String>,
}

/// The artifact collection on disk.
#[derive(Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
    retention_cap: usize,
    clock: Arc<dyn Clock>,
    remover: Arc<dyn FileRemover>,
}

impl ArtifactStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            retention_cap: RETENTION_CAP,
            clock: Arc::new(SystemClock),
            remover: Arc::new(FsRemover),
        })
    }

    pub fn with_retention_cap(mut self, cap: usize) -> Self {
        self.retention_cap = cap;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_remover(mut self, remover: Arc<dyn FileRemover>) -> Self {
        self.remover = remover;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn retention_cap(&self) -> usize {
        self.retention_cap
    }

    /// File name for an artifact created at `created_at`.
    ///
    /// Uniqueness rests on millisecond resolution; two saves in the same
    /// millisecond map to the same id.
    pub fn artifact_id(created_at: DateTime<Utc>) -> String {
        format!(
            "{ARTIFACT_PREFIX}{}.{ARTIFACT_EXTENSION}",
            created_at.timestamp_millis()
        )
    }

    /// Persist a validated script, then enforce the retention cap.
    ///
    /// A failed eviction pass is logged and does not fail the save.
    pub async fn save(&self, script: &Script) -> Result<Artifact, StoreError> {
        let created_at = self.clock.now();
        let id = Self::artifact_id(created_at);
        let path = self.dir.join(&id);

        self.write_new(&path, &id, script.content()).await?;
        info!(id = %id, bytes = script.content().len(), "saved artifact");

        if let Err(e) = self.enforce_retention(self.retention_cap).await {
            error!(error = %e, "retention pass failed after save");
        }

        Ok(Artifact {
            id,
            content: script.content().to_string(),
            created_at,
        })
    }

    async fn write_new(&self, path: &Path, id: &str, content: &str) -> Result<(), StoreError> {
        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(StoreError::Collision(id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let written = async {
            file.write_all(content.as_bytes()).await?;
            file.flush().await
        }
        .await;

        if let Err(e) = written {
            // Don't leave a truncated script behind for the gallery to serve.
            drop(file);
            if let Err(cleanup) = fs::remove_file(path).await {
                warn!(id = %id, error = %cleanup, "failed to remove partial artifact");
            }
            return Err(e.into());
        }

        Ok(())
    }

    /// All artifacts, newest first.
    pub async fn list(&self) -> Result<Vec<ArtifactSummary>, StoreError> {
        let mut artifacts = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if !is_artifact_name(&name) {
                continue;
            }

            // Entries can vanish between read_dir and stat while an eviction
            // pass runs; those are simply no longer part of the listing.
            let metadata = match entry.metadata().await {
                Ok(m) => m,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!(id = %name, "artifact removed during listing");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            if !metadata.is_file() {
                continue;
            }

            artifacts.push(ArtifactSummary {
                id: name,
                modified: metadata.modified()?,
            });
        }

        artifacts.sort_by(|a, b| {
            b.modified
                .cmp(&a.modified)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(artifacts)
    }

    /// Artifact ids, newest first.
    pub async fn ids(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.list().await?.into_iter().map(|a| a.id).collect())
    }

    pub async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.list().await?.len())
    }

    /// Read an artifact's script text.
    pub async fn read(&self, id: &str) -> Result<String, StoreError> {
        if !is_artifact_name(id) || id.contains(['/', '\\']) || id.contains("..") {
            return Err(StoreError::InvalidId(id.to_string()));
        }

        match fs::read_to_string(self.dir.join(id)).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete everything past the `cap` newest artifacts.
    ///
    /// Each deletion stands alone: a failure is logged and recorded in the
    /// report, and the pass moves on to the next file.
    pub async fn enforce_retention(&self, cap: usize) -> Result<RetentionReport, StoreError> {
        let artifacts = self.list().await?;
        let mut report = RetentionReport {
            kept: artifacts.len().min(cap),
            ..Default::default()
        };

        for artifact in artifacts.into_iter().skip(cap) {
            match self.remover.remove(&self.dir.join(&artifact.id)).await {
                Ok(()) => {
                    info!(id = %artifact.id, "deleted old artifact");
                    report.deleted.push(artifact.id);
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!(id = %artifact.id, "artifact already gone");
                }
                Err(e) => {
                    error!(id = %artifact.id, error = %e, "failed to delete artifact");
                    report.failed.push(artifact.id);
                }
            }
        }

        Ok(report)
    }
}

fn is_artifact_name(name: &str) -> bool {
    Path::new(name)
        .extension()
        .map(|ext| ext == ARTIFACT_EXTENSION)
        .unwrap_or(false)
        && !name.starts_with('.')
}
