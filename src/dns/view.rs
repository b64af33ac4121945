// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! View operations.
//!
//! Views are ordered by the priority list; every create, move and delete relinks
//! the list and renumbers `View::priority` inside the same transaction.

use tracing::info;

use super::requests::{CreateView, UpdateView};
use super::DnsHandler;
use crate::bind9::rndc::generate_view_key;
use crate::compiler::check_file_name;
use crate::constants::DEFAULT_VIEW;
use crate::errors::{AgentError, Result};
use crate::intent::{Dns64, Intent, View};

fn position(priority: u32) -> usize {
    usize::try_from(priority).unwrap_or(usize::MAX)
}

fn ensure_acls_exist(intent: &Intent, acls: &[String], dns64: Option<&Dns64>) -> Result<()> {
    let dns64_acls = dns64
        .into_iter()
        .flat_map(|d| [d.client_acl.as_ref(), d.mapped_acl.as_ref()])
        .flatten();
    for id in acls.iter().chain(dns64_acls) {
        intent.acl_name(id)?;
    }
    Ok(())
}

impl DnsHandler {
    /// Create a view at `request.priority` with a freshly generated key.
    ///
    /// # Errors
    ///
    /// Rejects duplicate ids or names and ids or names unusable in file names; returns
    /// not-found for a missing ACL.
    pub async fn create_view(&self, request: CreateView) -> Result<()> {
        check_file_name(&request.id)?;
        check_file_name(&request.name)?;
        let id = request.id.clone();
        let used = self
            .apply_structural(move |next| {
                if next.views.exists(|view| view.name == request.name) {
                    return Err(AgentError::validation(format!(
                        "view name '{}' is already in use",
                        request.name
                    )));
                }
                ensure_acls_exist(next, &request.acls, request.dns64.as_ref())?;

                next.views.insert(View {
                    key: generate_view_key(&request.name),
                    id: request.id.clone(),
                    name: request.name,
                    priority: 0,
                    acls: request.acls,
                    dns64: request.dns64,
                })?;
                let used = next
                    .priority_list_mut()
                    .insert(position(request.priority), &request.id, true)?;
                next.renumber_priorities()?;
                Ok(used)
            })
            .await?;
        info!(view = %id, priority = used, "View created");
        Ok(())
    }

    /// Replace a view's ACLs and DNS64 settings and optionally move it.
    ///
    /// # Errors
    ///
    /// Returns not-found for an unknown view or missing ACL.
    pub async fn update_view(&self, request: UpdateView) -> Result<()> {
        let id = request.id.clone();
        self.apply_structural(move |next| {
            ensure_acls_exist(next, &request.acls, request.dns64.as_ref())?;
            let view = next.views.get_required_mut(&request.id)?;
            view.acls = request.acls;
            view.dns64 = request.dns64;

            if let Some(priority) = request.priority {
                next.priority_list_mut()
                    .move_to(position(priority), &request.id)?;
                next.renumber_priorities()?;
            }
            Ok(())
        })
        .await?;
        info!(view = %id, "View updated");
        Ok(())
    }

    /// Delete a view and everything scoped to it.
    ///
    /// Zones, their records, forward zones and redirections of the view go with it.
    ///
    /// # Errors
    ///
    /// Rejects the default view; returns not-found for an unknown view.
    pub async fn delete_view(&self, id: &str) -> Result<()> {
        if id == DEFAULT_VIEW {
            return Err(AgentError::validation("the default view cannot be deleted"));
        }
        let removed = self
            .apply_structural(|next| {
                next.views.get_required(id)?;
                let zones = next.zones.delete_where(|zone| zone.view_id == id);
                let records = next.records.delete_where(|rr| rr.view_id == id);
                next.forward_zones.delete_where(|zone| zone.view_id == id);
                next.redirections.delete_where(|r| r.view_id == id);
                next.views.delete(id)?;
                next.priority_list_mut().remove(id)?;
                next.renumber_priorities()?;
                Ok((zones.len(), records.len()))
            })
            .await?;
        info!(view = %id, zones = removed.0, records = removed.1, "View deleted");
        Ok(())
    }
}

#[cfg(test)]
#[path = "view_tests.rs"]
mod view_tests;
