// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Intent store adapters.
//!
//! A store hands out immutable snapshots and accepts a whole new [`Intent`] as one
//! transaction. Commit is a compare-and-swap on [`Intent::revision`]: a caller that
//! mutated a stale snapshot gets a persistence error instead of silently
//! overwriting someone else's transaction.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::Intent;
use crate::errors::{AgentError, Result};

/// Transactional access to the persisted intent.
#[async_trait]
pub trait IntentStore: Send + Sync {
    /// Current committed intent.
    async fn snapshot(&self) -> Result<Arc<Intent>>;

    /// Replace the committed intent with `next` if the store is still at
    /// `base_revision`. Returns the committed value with its new revision.
    async fn commit(&self, base_revision: u64, next: Intent) -> Result<Arc<Intent>>;
}

fn stale(base_revision: u64, current: u64) -> AgentError {
    AgentError::persistence(format!(
        "transaction based on revision {base_revision} but store is at revision {current}"
    ))
}

/// Intent kept only in memory. Used by tests and `render`.
#[derive(Debug, Default)]
pub struct MemoryIntentStore {
    current: RwLock<Arc<Intent>>,
}

impl MemoryIntentStore {
    #[must_use]
    pub fn new(intent: Intent) -> Self {
        Self {
            current: RwLock::new(Arc::new(intent)),
        }
    }
}

#[async_trait]
impl IntentStore for MemoryIntentStore {
    async fn snapshot(&self) -> Result<Arc<Intent>> {
        Ok(self.current.read().await.clone())
    }

    async fn commit(&self, base_revision: u64, mut next: Intent) -> Result<Arc<Intent>> {
        let mut current = self.current.write().await;
        if current.revision != base_revision {
            return Err(stale(base_revision, current.revision));
        }
        next.revision = base_revision + 1;
        let committed = Arc::new(next);
        *current = committed.clone();
        Ok(committed)
    }
}

/// Intent persisted as one JSON document.
///
/// Writes go to a temporary sibling first and are renamed into place, so a crash
/// mid-write leaves the previous revision intact.
#[derive(Debug)]
pub struct FileIntentStore {
    path: PathBuf,
    current: RwLock<Arc<Intent>>,
}

impl FileIntentStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the file exists but cannot be read or parsed.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let intent = match fs::read_to_string(&path).await {
            Ok(text) => serde_json::from_str::<Intent>(&text).map_err(|e| {
                AgentError::persistence(format!(
                    "failed to parse intent file {}: {e}",
                    path.display()
                ))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "Intent file not found, starting empty");
                Intent::default()
            }
            Err(e) => {
                return Err(AgentError::persistence(format!(
                    "failed to read intent file {}: {e}",
                    path.display()
                )))
            }
        };

        debug!(
            path = %path.display(),
            revision = intent.revision,
            views = intent.views.len(),
            zones = intent.zones.len(),
            "Loaded intent"
        );

        Ok(Self {
            path,
            current: RwLock::new(Arc::new(intent)),
        })
    }

    /// Path of the backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    async fn persist(&self, intent: &Intent) -> Result<()> {
        let body = serde_json::to_vec_pretty(intent)
            .map_err(|e| AgentError::persistence(format!("failed to serialize intent: {e}")))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    AgentError::persistence(format!(
                        "failed to create {}: {e}",
                        parent.display()
                    ))
                })?;
            }
        }

        let temp_path = self.temp_path();
        let write = async {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(&body).await?;
            file.flush().await?;
            file.sync_all().await
        };
        if let Err(e) = write.await {
            warn!(path = %temp_path.display(), error = %e, "Failed to write intent temp file");
            return Err(AgentError::persistence(format!(
                "failed to write {}: {e}",
                temp_path.display()
            )));
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            AgentError::persistence(format!(
                "failed to rename {} to {}: {e}",
                temp_path.display(),
                self.path.display()
            ))
        })
    }
}

#[async_trait]
impl IntentStore for FileIntentStore {
    async fn snapshot(&self) -> Result<Arc<Intent>> {
        Ok(self.current.read().await.clone())
    }

    async fn commit(&self, base_revision: u64, mut next: Intent) -> Result<Arc<Intent>> {
        let mut current = self.current.write().await;
        if current.revision != base_revision {
            return Err(stale(base_revision, current.revision));
        }
        next.revision = base_revision + 1;
        self.persist(&next).await?;

        debug!(revision = next.revision, path = %self.path.display(), "Committed intent");
        let committed = Arc::new(next);
        *current = committed.clone();
        Ok(committed)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod store_tests;
