// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Zone operations.
//!
//! Authoritative zones are added and removed at runtime with `addzone` /
//! `delzone`; zones without a zone file only exist in the intent.

use std::sync::Arc;
use tracing::info;

use super::push::{RecordPush, ZoneCreate, ZoneDelete, ZoneRefresh};
use super::requests::{CreateZone, SwitchZoneRole, UpdateZoneTtl};
use super::{bump_serial, record_update, DnsHandler};
use crate::bind9::types::ZoneScope;
use crate::bind9::update::UpdateOp;
use crate::compiler::check_file_name;
use crate::errors::{AgentError, Result};
use crate::intent::{Intent, Zone};
use crate::reconciler::{NoopPusher, Planned};

fn validate_new_zone(intent: &Intent, zone: &Zone) -> Result<()> {
    intent.views.get_required(&zone.view_id)?;
    if zone.name.trim().is_empty() {
        return Err(AgentError::validation("zone name must not be empty"));
    }
    if intent
        .zones
        .exists(|other| other.view_id == zone.view_id && other.name == zone.name)
    {
        return Err(AgentError::validation(format!(
            "zone '{}' already exists in view '{}'",
            zone.name, zone.view_id
        )));
    }
    if !zone.is_forward() {
        check_file_name(&zone.zone_file)?;
        if intent.zones.exists(|other| other.zone_file == zone.zone_file) {
            return Err(AgentError::validation(format!(
                "zone file '{}' is already used by another zone",
                zone.zone_file
            )));
        }
    }
    Ok(())
}

fn zone_scope(intent: &Intent, zone: &Zone) -> Result<ZoneScope> {
    let view = intent.views.get_required(&zone.view_id)?;
    Ok(ZoneScope::new(&zone.name, &view.name))
}

impl DnsHandler {
    /// Create a zone and load it into the running daemon.
    ///
    /// # Errors
    ///
    /// Rejects duplicate zones and zone files; returns not-found for an unknown
    /// view, or the push error.
    pub async fn create_zone(&self, request: CreateZone) -> Result<()> {
        let backend = Arc::clone(&self.backend);
        let zone = Zone {
            id: request.id,
            name: request.name.trim_end_matches('.').to_string(),
            ttl: request.ttl,
            zone_file: request.zone_file.trim().to_string(),
            view_id: request.view_id,
            role: request.role,
            serial: bump_serial(0),
        };
        let id = zone.id.clone();

        self.reconciler
            .apply_planned(move |_previous, next| {
                validate_new_zone(next, &zone)?;
                let is_forward = zone.is_forward();
                let zone_id = zone.id.clone();
                next.zones.insert(zone)?;

                if is_forward {
                    return Ok(Planned::new((), NoopPusher));
                }
                Ok(Planned::new((), ZoneCreate::new(backend, next, &zone_id)?))
            })
            .await?;
        info!(zone = %id, "Zone created");
        Ok(())
    }

    /// Change a zone's default TTL, bumping its serial.
    ///
    /// # Errors
    ///
    /// Returns not-found for an unknown zone, or the push error.
    pub async fn update_zone_ttl(&self, request: UpdateZoneTtl) -> Result<()> {
        let backend = Arc::clone(&self.backend);
        let id = request.id.clone();
        self.reconciler
            .apply_planned(move |_previous, next| {
                let zone = next.zones.get_required_mut(&request.id)?;
                zone.ttl = request.ttl;
                zone.serial = bump_serial(zone.serial);
                if zone.is_forward() {
                    return Ok(Planned::new((), NoopPusher));
                }
                Ok(Planned::new((), ZoneRefresh::new(backend, next, &request.id)?))
            })
            .await?;
        info!(zone = %id, "Zone TTL updated");
        Ok(())
    }

    /// Switch which rdata column a zone serves.
    ///
    /// Every record of the zone is retracted with its old-role rdata and asserted
    /// with its new-role rdata, 2N updates for N records.
    ///
    /// # Errors
    ///
    /// Returns not-found for an unknown zone, or the push error after the already
    /// applied updates were reverted.
    pub async fn switch_zone_role(&self, request: SwitchZoneRole) -> Result<usize> {
        let backend = Arc::clone(&self.backend);
        let id = request.id.clone();
        let issued = self
            .reconciler
            .apply_planned(move |previous, next| {
                let zone = previous.zones.get_required(&request.id)?;
                if zone.role == request.role {
                    return Ok(Planned::new(0, NoopPusher));
                }
                let old_role = zone.role;
                next.zones.get_required_mut(&request.id)?.role = request.role;
                if zone.is_forward() {
                    return Ok(Planned::new(0, NoopPusher));
                }

                let mut updates = Vec::new();
                for record in previous.records_in_zone(&zone.id) {
                    updates.push(record_update(
                        previous,
                        record,
                        UpdateOp::Retract,
                        record.effective_rdata(old_role),
                    )?);
                    updates.push(record_update(
                        previous,
                        record,
                        UpdateOp::Assert,
                        record.effective_rdata(request.role),
                    )?);
                }
                let count = updates.len();
                let scope = zone_scope(previous, zone)?;
                Ok(Planned::new(count, RecordPush::new(backend, scope, updates)))
            })
            .await?;
        info!(zone = %id, updates = issued, "Zone role switched");
        Ok(issued)
    }

    /// Delete a zone and its records, unloading it from the running daemon.
    ///
    /// # Errors
    ///
    /// Returns not-found for an unknown zone, or the push error.
    pub async fn delete_zone(&self, id: &str) -> Result<()> {
        let backend = Arc::clone(&self.backend);
        self.reconciler
            .apply_planned(|previous, next| {
                let zone = previous.zones.get_required(id)?;
                next.records.delete_where(|rr| rr.zone_id == id);
                next.zones.delete(id)?;
                if zone.is_forward() {
                    return Ok(Planned::new((), NoopPusher));
                }
                Ok(Planned::new((), ZoneDelete::new(backend, previous, id)?))
            })
            .await?;
        info!(zone = %id, "Zone deleted");
        Ok(())
    }
}

#[cfg(test)]
#[path = "zone_tests.rs"]
mod zone_tests;
