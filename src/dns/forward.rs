// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Forward zone operations.

use std::net::IpAddr;
use tracing::info;

use super::DnsHandler;
use crate::errors::{AgentError, Result};
use crate::intent::{ForwardZone, Intent};

fn validate(intent: &Intent, zone: &ForwardZone) -> Result<()> {
    intent.views.get_required(&zone.view_id)?;
    if zone.name.trim().is_empty() {
        return Err(AgentError::validation("forward zone name must not be empty"));
    }
    if zone.forwarders.is_empty() {
        return Err(AgentError::validation(format!(
            "forward zone '{}' needs at least one forwarder",
            zone.name
        )));
    }
    if let Some(bad) = zone
        .forwarders
        .iter()
        .find(|ip| ip.parse::<IpAddr>().is_err())
    {
        return Err(AgentError::validation(format!(
            "forwarder '{bad}' is not an IP address"
        )));
    }
    if intent.forward_zones.exists(|other| {
        other.view_id == zone.view_id && other.name == zone.name && other.id != zone.id
    }) {
        return Err(AgentError::validation(format!(
            "forward zone '{}' already exists in view '{}'",
            zone.name, zone.view_id
        )));
    }
    Ok(())
}

impl DnsHandler {
    /// Create a forward zone.
    ///
    /// # Errors
    ///
    /// Rejects duplicates, empty forwarder lists and non-IP forwarders; returns
    /// not-found for an unknown view.
    pub async fn create_forward_zone(&self, zone: ForwardZone) -> Result<()> {
        let id = zone.id.clone();
        self.apply_structural(move |next| {
            validate(next, &zone)?;
            next.forward_zones.insert(zone)
        })
        .await?;
        info!(forward_zone = %id, "Forward zone created");
        Ok(())
    }

    /// Replace a forward zone.
    ///
    /// # Errors
    ///
    /// Same as [`Self::create_forward_zone`], plus not-found for an unknown id.
    pub async fn update_forward_zone(&self, zone: ForwardZone) -> Result<()> {
        let id = zone.id.clone();
        self.apply_structural(move |next| {
            validate(next, &zone)?;
            next.forward_zones.update(zone).map(|_| ())
        })
        .await?;
        info!(forward_zone = %id, "Forward zone updated");
        Ok(())
    }

    /// Delete a forward zone.
    ///
    /// # Errors
    ///
    /// Returns not-found for an unknown id.
    pub async fn delete_forward_zone(&self, id: &str) -> Result<()> {
        self.apply_structural(|next| next.forward_zones.delete(id).map(|_| ()))
            .await?;
        info!(forward_zone = %id, "Forward zone deleted");
        Ok(())
    }
}

#[cfg(test)]
#[path = "forward_tests.rs"]
mod forward_tests;
