// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Resource record operations, pushed as dynamic updates.
//!
//! Only the rdata selected by the zone's current role is live; edits to the other
//! column change the intent without touching the daemon.

use std::sync::Arc;
use tracing::info;

use super::push::RecordPush;
use super::{record_update, DnsHandler};
use crate::bind9::types::ZoneScope;
use crate::bind9::update::{build_record, UpdateOp};
use crate::errors::{AgentError, Result};
use crate::intent::{Intent, ResourceRecord, ZoneRole};
use crate::reconciler::Planned;

/// Fill in the owning view and check the record can be sent as an update.
fn prepare(intent: &Intent, mut record: ResourceRecord) -> Result<ResourceRecord> {
    let zone = intent.zones.get_required(&record.zone_id)?;
    if zone.is_forward() {
        return Err(AgentError::validation(format!(
            "zone '{}' has no zone file and cannot hold records",
            zone.name
        )));
    }
    record.view_id = zone.view_id.clone();
    record.rr_type = record.rr_type.to_ascii_uppercase();

    // A live RRset belongs to at most one record, under either role.
    if let Some(twin) = intent
        .records
        .list(|other| other.id != record.id && shares_rrset(other, &record))
        .first()
    {
        return Err(AgentError::validation(format!(
            "record '{}' would serve the same RRset as record '{}'",
            record.id, twin.id
        )));
    }

    let probe = record_update(intent, &record, UpdateOp::Assert, &record.rdata)?;
    build_record(&probe.zone, &probe.rrset)
        .map_err(|e| AgentError::validation(format!("{e:#}")))?;
    if let Some(backup) = &record.rdata_backup {
        let probe = record_update(intent, &record, UpdateOp::Assert, backup)?;
        build_record(&probe.zone, &probe.rrset)
            .map_err(|e| AgentError::validation(format!("backup rdata: {e:#}")))?;
    }
    Ok(record)
}

fn shares_rrset(a: &ResourceRecord, b: &ResourceRecord) -> bool {
    a.zone_id == b.zone_id
        && a.name.eq_ignore_ascii_case(&b.name)
        && a.rr_type.eq_ignore_ascii_case(&b.rr_type)
        && [ZoneRole::Active, ZoneRole::Backup]
            .into_iter()
            .any(|role| a.effective_rdata(role) == b.effective_rdata(role))
}

fn scope_of(intent: &Intent, record: &ResourceRecord) -> Result<ZoneScope> {
    let zone = intent.zones.get_required(&record.zone_id)?;
    let view = intent.views.get_required(&zone.view_id)?;
    Ok(ZoneScope::new(&zone.name, &view.name))
}

fn live_rdata<'a>(intent: &Intent, record: &'a ResourceRecord) -> Result<&'a str> {
    let zone = intent.zones.get_required(&record.zone_id)?;
    Ok(record.effective_rdata(zone.role))
}

impl DnsHandler {
    /// Create a record and assert it in the live zone.
    ///
    /// # Errors
    ///
    /// Rejects malformed or unsupported records and records in forward zones;
    /// returns not-found for an unknown zone, or the dynamic update error.
    pub async fn create_record(&self, record: ResourceRecord) -> Result<()> {
        let backend = Arc::clone(&self.backend);
        let id = record.id.clone();
        self.reconciler
            .apply_planned(move |_previous, next| {
                let record = prepare(next, record)?;
                let update = record_update(
                    next,
                    &record,
                    UpdateOp::Assert,
                    live_rdata(next, &record)?,
                )?;
                let scope = scope_of(next, &record)?;
                next.records.insert(record)?;
                Ok(Planned::new((), RecordPush::new(backend, scope, vec![update])))
            })
            .await?;
        info!(record = %id, "Record created");
        Ok(())
    }

    /// Replace a record, retracting the old live RRset and asserting the new one.
    ///
    /// # Errors
    ///
    /// Returns not-found for an unknown record; rejects moving a record to another
    /// zone.
    pub async fn update_record(&self, record: ResourceRecord) -> Result<()> {
        let backend = Arc::clone(&self.backend);
        let id = record.id.clone();
        self.reconciler
            .apply_planned(move |previous, next| {
                let old = previous.records.get_required(&record.id)?;
                if old.zone_id != record.zone_id {
                    return Err(AgentError::validation(format!(
                        "record '{}' cannot move to another zone",
                        record.id
                    )));
                }
                let record = prepare(next, record)?;

                let retract =
                    record_update(previous, old, UpdateOp::Retract, live_rdata(previous, old)?)?;
                let assert =
                    record_update(next, &record, UpdateOp::Assert, live_rdata(next, &record)?)?;
                let updates = if retract.rrset == assert.rrset {
                    Vec::new()
                } else {
                    vec![retract, assert]
                };

                let scope = scope_of(next, &record)?;
                next.records.update(record)?;
                Ok(Planned::new((), RecordPush::new(backend, scope, updates)))
            })
            .await?;
        info!(record = %id, "Record updated");
        Ok(())
    }

    /// Delete a record and retract it from the live zone.
    ///
    /// # Errors
    ///
    /// Returns not-found for an unknown record, or the dynamic update error.
    pub async fn delete_record(&self, id: &str) -> Result<()> {
        let backend = Arc::clone(&self.backend);
        self.reconciler
            .apply_planned(|previous, next| {
                let old = previous.records.get_required(id)?;
                let retract =
                    record_update(previous, old, UpdateOp::Retract, live_rdata(previous, old)?)?;
                let scope = scope_of(previous, old)?;
                next.records.delete(id)?;
                Ok(Planned::new((), RecordPush::new(backend, scope, vec![retract])))
            })
            .await?;
        info!(record = %id, "Record deleted");
        Ok(())
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod record_tests;
