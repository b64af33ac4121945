// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! ACL operations.

use tracing::info;

use super::DnsHandler;
use crate::errors::{AgentError, Result};
use crate::intent::{is_reserved_acl, Acl, Intent};

fn ensure_not_reserved(id: &str) -> Result<()> {
    if is_reserved_acl(id) {
        return Err(AgentError::validation(format!(
            "acl '{id}' is built in and cannot be modified"
        )));
    }
    Ok(())
}

fn ensure_unique_name(intent: &Intent, acl: &Acl) -> Result<()> {
    if is_reserved_acl(&acl.name)
        || intent
            .acls
            .exists(|other| other.name == acl.name && other.id != acl.id)
    {
        return Err(AgentError::validation(format!(
            "acl name '{}' is already in use",
            acl.name
        )));
    }
    Ok(())
}

impl DnsHandler {
    /// Create a user ACL.
    ///
    /// # Errors
    ///
    /// Rejects reserved ids and duplicate ids or names; otherwise returns the push
    /// error.
    pub async fn create_acl(&self, acl: Acl) -> Result<()> {
        ensure_not_reserved(&acl.id)?;
        let id = acl.id.clone();
        self.apply_structural(move |next| {
            ensure_unique_name(next, &acl)?;
            next.acls.insert(acl)
        })
        .await?;
        info!(acl = %id, "ACL created");
        Ok(())
    }

    /// Replace a user ACL's name and address list.
    ///
    /// # Errors
    ///
    /// Rejects reserved ids; returns not-found for an unknown id.
    pub async fn update_acl(&self, acl: Acl) -> Result<()> {
        ensure_not_reserved(&acl.id)?;
        let id = acl.id.clone();
        self.apply_structural(move |next| {
            ensure_unique_name(next, &acl)?;
            next.acls.update(acl).map(|_| ())
        })
        .await?;
        info!(acl = %id, "ACL updated");
        Ok(())
    }

    /// Delete a user ACL that nothing references.
    ///
    /// # Errors
    ///
    /// Rejects reserved ids and ACLs still used by a view, DNS64 entry or black
    /// hole; returns not-found for an unknown id.
    pub async fn delete_acl(&self, id: &str) -> Result<()> {
        ensure_not_reserved(id)?;
        self.apply_structural(|next| {
            next.acls.get_required(id)?;
            if next.acl_in_use(id) {
                return Err(AgentError::validation(format!(
                    "acl '{id}' is still referenced"
                )));
            }
            next.acls.delete(id).map(|_| ())
        })
        .await?;
        info!(acl = %id, "ACL deleted");
        Ok(())
    }
}
