// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Writes rendered artifacts into the conf dir.
//!
//! Only files whose bytes differ are rewritten, each through a temporary sibling
//! that is renamed into place so `named` never reads a half-written file.

use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::ArtifactSet;
use crate::errors::{AgentError, Result};

/// Artifact writer rooted at one directory.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Write every changed file of `set`, returning the names actually written.
    ///
    /// # Errors
    ///
    /// Returns an artifact error naming the first file that could not be written.
    pub async fn write_all(&self, set: &ArtifactSet) -> Result<Vec<String>> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| AgentError::artifact(self.dir.display().to_string(), e))?;

        let mut changed = Vec::new();
        for (name, content) in set.iter() {
            if self.write(name, content).await? {
                changed.push(name.to_string());
            }
        }

        if !changed.is_empty() {
            debug!(dir = %self.dir.display(), changed = ?changed, "Wrote artifacts");
        }
        Ok(changed)
    }

    /// Write one file if its content changed. Returns whether it was written.
    ///
    /// # Errors
    ///
    /// Returns an artifact error if the file cannot be written.
    pub async fn write(&self, name: &str, content: &str) -> Result<bool> {
        if self.read(name).await?.as_deref() == Some(content) {
            return Ok(false);
        }

        let path = self.path(name);
        let temp_path = self.dir.join(format!(".{name}.tmp"));
        let write = async {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(content.as_bytes()).await?;
            file.flush().await?;
            file.sync_all().await?;
            fs::rename(&temp_path, &path).await
        };
        if let Err(e) = write.await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(AgentError::artifact(name, e));
        }
        Ok(true)
    }

    /// Read a file, `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an artifact error for any other read failure.
    pub async fn read(&self, name: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path(name)).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AgentError::artifact(name, e)),
        }
    }

    /// Remove a file. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns an artifact error for any failure other than the file being absent.
    pub async fn remove(&self, name: &str) -> Result<bool> {
        match fs::remove_file(self.path(name)).await {
            Ok(()) => {
                debug!(file = name, "Removed artifact");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(AgentError::artifact(name, e)),
        }
    }

    /// Snapshot the current content of `names` (`None` for absent files).
    ///
    /// # Errors
    ///
    /// Returns an artifact error if a file exists but cannot be read.
    pub async fn capture(&self, names: &[String]) -> Result<Vec<(String, Option<String>)>> {
        let mut captured = Vec::with_capacity(names.len());
        for name in names {
            captured.push((name.clone(), self.read(name).await?));
        }
        Ok(captured)
    }

    /// Put back files captured by [`Self::capture`].
    ///
    /// # Errors
    ///
    /// Returns an artifact error for the first file that cannot be restored.
    pub async fn restore(&self, captured: &[(String, Option<String>)]) -> Result<()> {
        for (name, content) in captured {
            match content {
                Some(content) => {
                    self.write(name, content).await?;
                }
                None => {
                    self.remove(name).await?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "writer_tests.rs"]
mod writer_tests;
