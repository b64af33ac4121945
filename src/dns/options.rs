// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Server-wide settings: global options, recursion limits and black holes.

use tracing::info;

use super::DnsHandler;
use crate::errors::{AgentError, Result};
use crate::intent::{GlobalConfig, IpBlackHole, RecursiveConcurrency};

impl DnsHandler {
    /// Replace the global options.
    ///
    /// # Errors
    ///
    /// Returns the push error.
    pub async fn update_global_config(&self, global: GlobalConfig) -> Result<()> {
        self.apply_structural(move |next| {
            next.global = global;
            Ok(())
        })
        .await?;
        info!("Global configuration updated");
        Ok(())
    }

    /// Replace the recursion limits.
    ///
    /// # Errors
    ///
    /// Rejects a zero client limit; otherwise returns the push error.
    pub async fn update_recursive_concurrency(
        &self,
        recursive: RecursiveConcurrency,
    ) -> Result<()> {
        if recursive.max_clients == 0 {
            return Err(AgentError::validation(
                "max_clients must be greater than zero",
            ));
        }
        self.apply_structural(move |next| {
            next.recursive = recursive;
            Ok(())
        })
        .await?;
        info!("Recursive concurrency updated");
        Ok(())
    }

    /// Drop all traffic from the clients of an ACL.
    ///
    /// # Errors
    ///
    /// Returns not-found for an unknown ACL; rejects an ACL that is already black
    /// holed.
    pub async fn create_black_hole(&self, hole: IpBlackHole) -> Result<()> {
        let id = hole.id.clone();
        self.apply_structural(move |next| {
            next.acl_name(&hole.acl_id)?;
            if next.black_holes.exists(|other| other.acl_id == hole.acl_id) {
                return Err(AgentError::validation(format!(
                    "acl '{}' is already black holed",
                    hole.acl_id
                )));
            }
            next.black_holes.insert(hole)
        })
        .await?;
        info!(black_hole = %id, "Black hole created");
        Ok(())
    }

    /// Remove a black hole.
    ///
    /// # Errors
    ///
    /// Returns not-found for an unknown id.
    pub async fn delete_black_hole(&self, id: &str) -> Result<()> {
        self.apply_structural(|next| next.black_holes.delete(id).map(|_| ()))
            .await?;
        info!(black_hole = %id, "Black hole deleted");
        Ok(())
    }
}
