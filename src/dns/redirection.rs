// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Redirection operations: local-zone (response policy) and NXDOMAIN redirect.

use std::sync::Arc;
use tracing::info;

use super::push::ViewPolicyRefresh;
use super::DnsHandler;
use crate::errors::{AgentError, Result};
use crate::intent::{Intent, Redirection};
use crate::reconciler::Planned;

fn validate(intent: &Intent, redirection: &Redirection) -> Result<()> {
    intent.views.get_required(&redirection.view_id)?;
    if redirection.name.trim().is_empty() || redirection.rdata.trim().is_empty() {
        return Err(AgentError::validation("redirection needs a query name and rdata"));
    }
    if redirection.rr_type.trim().is_empty() {
        return Err(AgentError::validation("redirection needs a record type"));
    }
    Ok(())
}

impl DnsHandler {
    /// Create a redirection and reload its view's policy zones.
    ///
    /// # Errors
    ///
    /// Rejects incomplete redirections; returns not-found for an unknown view.
    pub async fn create_redirection(&self, redirection: Redirection) -> Result<()> {
        let backend = Arc::clone(&self.backend);
        let id = redirection.id.clone();
        self.reconciler
            .apply_planned(move |_previous, next| {
                validate(next, &redirection)?;
                let view_id = redirection.view_id.clone();
                next.redirections.insert(redirection)?;
                Ok(Planned::new((), ViewPolicyRefresh::new(backend, next, &view_id)?))
            })
            .await?;
        info!(redirection = %id, "Redirection created");
        Ok(())
    }

    /// Replace a redirection within its view.
    ///
    /// # Errors
    ///
    /// Returns not-found for an unknown id or view; rejects moving it to another
    /// view.
    pub async fn update_redirection(&self, redirection: Redirection) -> Result<()> {
        let backend = Arc::clone(&self.backend);
        let id = redirection.id.clone();
        self.reconciler
            .apply_planned(move |previous, next| {
                validate(next, &redirection)?;
                let old_view = previous
                    .redirections
                    .get_required(&redirection.id)?
                    .view_id
                    .clone();
                if old_view != redirection.view_id {
                    return Err(AgentError::validation(format!(
                        "redirection '{}' cannot move to another view",
                        redirection.id
                    )));
                }
                next.redirections.update(redirection)?;
                Ok(Planned::new((), ViewPolicyRefresh::new(backend, next, &old_view)?))
            })
            .await?;
        info!(redirection = %id, "Redirection updated");
        Ok(())
    }

    /// Delete a redirection.
    ///
    /// # Errors
    ///
    /// Returns not-found for an unknown id.
    pub async fn delete_redirection(&self, id: &str) -> Result<()> {
        let backend = Arc::clone(&self.backend);
        self.reconciler
            .apply_planned(|_previous, next| {
                let removed = next.redirections.delete(id)?;
                Ok(Planned::new(
                    (),
                    ViewPolicyRefresh::new(backend, next, &removed.view_id)?,
                ))
            })
            .await?;
        info!(redirection = %id, "Redirection deleted");
        Ok(())
    }
}

#[cfg(test)]
#[path = "redirection_tests.rs"]
mod redirection_tests;
