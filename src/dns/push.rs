// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Pushers driving `named` towards a committed intent.
//!
//! Each pusher covers one regeneration granularity:
//!
//! | Pusher              | Files written                  | Control-channel sequence        |
//! |---------------------|--------------------------------|---------------------------------|
//! | [`FullReconfig`]    | every artifact, stale removed  | `reconfig` (skipped if unchanged) |
//! | [`ZoneCreate`]      | zone file, zone index          | `addzone`                       |
//! | [`ZoneDelete`]      | zone index, zone file removed  | `delzone -clean`                |
//! | [`ZoneRefresh`]     | zone file                      | `freeze`, `thaw`                |
//! | [`RecordPush`]      | none (journal flushed by named) | dynamic updates, `sync -clean`  |
//! | [`ViewPolicyRefresh`] | redirect and local-zone data | `reload` of both policy zones   |
//!
//! Files always reach their final content before the command that reads them.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::bind9::control::{ControlChannel, ControlCommand};
use crate::bind9::types::ZoneScope;
use crate::bind9::update::{RecordUpdate, RecordUpdater};
use crate::compiler::writer::ArtifactWriter;
use crate::compiler::{
    local_zone_file, local_zone_origin, redirect_file, zone_index_file, ArtifactSet,
    ConfigCompiler,
};
use crate::errors::Result;
use crate::intent::Intent;
use crate::reconciler::Pusher;

/// Shared collaborators of every DNS pusher.
pub struct DnsBackend {
    pub compiler: ConfigCompiler,
    pub writer: ArtifactWriter,
    pub control: Arc<dyn ControlChannel>,
    pub updater: Arc<dyn RecordUpdater>,
}

impl DnsBackend {
    async fn execute(&self, command: ControlCommand) -> Result<String> {
        self.control.execute(&command).await
    }

    /// Run a compensating command, logging instead of failing.
    async fn execute_best_effort(&self, command: ControlCommand) {
        if let Err(e) = self.control.execute(&command).await {
            error!(command = %command, error = %e, "Compensating command failed");
        }
    }

    async fn restore_best_effort(&self, captured: &[(String, Option<String>)]) {
        if let Err(e) = self.writer.restore(captured).await {
            error!(error = %e, "Failed to restore artifacts");
        }
    }
}

fn names_of(set: &ArtifactSet) -> BTreeSet<String> {
    set.names().map(str::to_string).collect()
}

/// Full regeneration followed by `rndc reconfig`.
pub struct FullReconfig {
    backend: Arc<DnsBackend>,
    /// Artifacts of the previous intent; those absent from the desired set are removed
    previous: BTreeSet<String>,
    /// Issue `reconfig` even when no file changed
    force: bool,
    /// Write files only; the daemon is not running yet
    write_only: bool,
}

impl FullReconfig {
    /// Pusher for a structural change from `previous` to the next intent.
    pub fn between(backend: Arc<DnsBackend>, previous: &Intent) -> Self {
        let previous = match backend.compiler.compile_full(previous) {
            Ok(set) => names_of(&set),
            Err(e) => {
                warn!(error = %e, "Previous intent does not compile, stale files are kept");
                BTreeSet::new()
            }
        };
        Self {
            backend,
            previous,
            force: false,
            write_only: false,
        }
    }

    /// Rewrite everything and always reconfig.
    pub fn heal(backend: Arc<DnsBackend>) -> Self {
        Self {
            backend,
            previous: BTreeSet::new(),
            force: true,
            write_only: false,
        }
    }

    /// Write the artifacts without touching the daemon.
    pub fn write_only(backend: Arc<DnsBackend>) -> Self {
        Self {
            backend,
            previous: BTreeSet::new(),
            force: false,
            write_only: true,
        }
    }

    async fn converge(&self, desired: &Intent, stale: &BTreeSet<String>) -> Result<()> {
        let set = self.backend.compiler.compile_full(desired)?;
        let mut changed = self.backend.writer.write_all(&set).await?;

        for name in stale.iter().filter(|name| !set.contains(name)) {
            if self.backend.writer.remove(name).await? {
                changed.push(name.clone());
            }
        }

        if self.write_only {
            return Ok(());
        }
        if changed.is_empty() && !self.force {
            debug!("No artifact changed, skipping reconfig");
            return Ok(());
        }

        info!(changed = changed.len(), fingerprint = %set.fingerprint(), "Reconfiguring named");
        self.backend.execute(ControlCommand::Reconfig).await?;
        Ok(())
    }
}

#[async_trait]
impl Pusher<Intent> for FullReconfig {
    fn name(&self) -> &str {
        "full-reconfig"
    }

    async fn push(&self, desired: &Intent) -> Result<()> {
        self.converge(desired, &self.previous).await
    }

    async fn compensate(&self, previous: &Intent, attempted: &Intent) -> Result<()> {
        let added = match self.backend.compiler.compile_full(attempted) {
            Ok(set) => names_of(&set),
            Err(_) => BTreeSet::new(),
        };
        self.converge(previous, &added).await
    }
}

/// Add a new authoritative zone to the running daemon.
pub struct ZoneCreate {
    backend: Arc<DnsBackend>,
    zone_id: String,
    scope: ZoneScope,
    zone_file: String,
    index_file: String,
    stanza: String,
    captured: Mutex<Vec<(String, Option<String>)>>,
    added: AtomicBool,
}

impl ZoneCreate {
    /// Pusher for zone `zone_id` of `next`.
    ///
    /// # Errors
    ///
    /// Returns not-found if the zone or its view is missing from `next`.
    pub fn new(backend: Arc<DnsBackend>, next: &Intent, zone_id: &str) -> Result<Self> {
        let zone = next.zones.get_required(zone_id)?;
        let view = next.views.get_required(&zone.view_id)?;
        Ok(Self {
            stanza: backend.compiler.zone_stanza(zone, view),
            backend,
            zone_id: zone.id.clone(),
            scope: ZoneScope::new(&zone.name, &view.name),
            zone_file: zone.zone_file.clone(),
            index_file: zone_index_file(&view.name),
            captured: Mutex::new(Vec::new()),
            added: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl Pusher<Intent> for ZoneCreate {
    fn name(&self) -> &str {
        "zone-create"
    }

    async fn push(&self, desired: &Intent) -> Result<()> {
        let set = self.backend.compiler.compile_zone_scope(desired, &self.zone_id)?;
        *self.captured.lock().await = self
            .backend
            .writer
            .capture(&[self.zone_file.clone(), self.index_file.clone()])
            .await?;

        if let Some(content) = set.get(&self.zone_file) {
            self.backend.writer.write(&self.zone_file, content).await?;
        }
        self.backend
            .execute(ControlCommand::AddZone {
                scope: self.scope.clone(),
                conf: self.stanza.clone(),
            })
            .await?;
        self.added.store(true, Ordering::SeqCst);

        // named appends to the index on addzone; replace it with the rendered one
        if let Some(content) = set.get(&self.index_file) {
            self.backend.writer.write(&self.index_file, content).await?;
        }
        info!(zone = %self.scope, "Zone added");
        Ok(())
    }

    async fn compensate(&self, _previous: &Intent, _attempted: &Intent) -> Result<()> {
        if self.added.load(Ordering::SeqCst) {
            self.backend
                .execute_best_effort(ControlCommand::DelZone(self.scope.clone()))
                .await;
        }
        let captured = self.captured.lock().await;
        self.backend.restore_best_effort(&captured).await;
        Ok(())
    }
}

/// Remove an authoritative zone from the running daemon.
pub struct ZoneDelete {
    backend: Arc<DnsBackend>,
    view_id: String,
    scope: ZoneScope,
    zone_file: String,
    index_file: String,
    stanza: String,
    captured: Mutex<Vec<(String, Option<String>)>>,
    deleted: AtomicBool,
}

impl ZoneDelete {
    /// Pusher for deleting zone `zone_id` of `previous`.
    ///
    /// # Errors
    ///
    /// Returns not-found if the zone or its view is missing from `previous`.
    pub fn new(backend: Arc<DnsBackend>, previous: &Intent, zone_id: &str) -> Result<Self> {
        let zone = previous.zones.get_required(zone_id)?;
        let view = previous.views.get_required(&zone.view_id)?;
        Ok(Self {
            stanza: backend.compiler.zone_stanza(zone, view),
            backend,
            view_id: view.id.clone(),
            scope: ZoneScope::new(&zone.name, &view.name),
            zone_file: zone.zone_file.clone(),
            index_file: zone_index_file(&view.name),
            captured: Mutex::new(Vec::new()),
            deleted: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl Pusher<Intent> for ZoneDelete {
    fn name(&self) -> &str {
        "zone-delete"
    }

    async fn push(&self, desired: &Intent) -> Result<()> {
        let view = desired.views.get_required(&self.view_id)?;
        let index = self.backend.compiler.compile_zone_index(desired, view)?;

        // flush pending updates so a compensating re-add starts from live data
        self.backend
            .execute(ControlCommand::Sync(Some(self.scope.clone())))
            .await?;
        *self.captured.lock().await = self
            .backend
            .writer
            .capture(&[self.zone_file.clone(), self.index_file.clone()])
            .await?;

        self.backend
            .execute(ControlCommand::DelZone(self.scope.clone()))
            .await?;
        self.deleted.store(true, Ordering::SeqCst);

        self.backend.writer.remove(&self.zone_file).await?;
        self.backend.writer.write(&self.index_file, &index).await?;
        info!(zone = %self.scope, "Zone deleted");
        Ok(())
    }

    async fn compensate(&self, _previous: &Intent, _attempted: &Intent) -> Result<()> {
        let captured = self.captured.lock().await;
        self.backend.restore_best_effort(&captured).await;
        if self.deleted.load(Ordering::SeqCst) {
            self.backend
                .execute_best_effort(ControlCommand::AddZone {
                    scope: self.scope.clone(),
                    conf: self.stanza.clone(),
                })
                .await;
            // addzone appended to the index again; put the captured one back
            self.backend.restore_best_effort(&captured).await;
        }
        Ok(())
    }
}

/// Rewrite a live dynamic zone's file (TTL or serial change).
pub struct ZoneRefresh {
    backend: Arc<DnsBackend>,
    zone_id: String,
    scope: ZoneScope,
    zone_file: String,
    captured: Mutex<Vec<(String, Option<String>)>>,
    frozen: AtomicBool,
}

impl ZoneRefresh {
    /// Pusher refreshing zone `zone_id` of `next`.
    ///
    /// # Errors
    ///
    /// Returns not-found if the zone or its view is missing from `next`.
    pub fn new(backend: Arc<DnsBackend>, next: &Intent, zone_id: &str) -> Result<Self> {
        let zone = next.zones.get_required(zone_id)?;
        let view = next.views.get_required(&zone.view_id)?;
        Ok(Self {
            backend,
            zone_id: zone.id.clone(),
            scope: ZoneScope::new(&zone.name, &view.name),
            zone_file: zone.zone_file.clone(),
            captured: Mutex::new(Vec::new()),
            frozen: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl Pusher<Intent> for ZoneRefresh {
    fn name(&self) -> &str {
        "zone-refresh"
    }

    async fn push(&self, desired: &Intent) -> Result<()> {
        let zone = desired.zones.get_required(&self.zone_id)?;
        let content = self.backend.compiler.compile_zone_file(desired, zone);

        // freeze flushes the journal, so the capture holds the live record set
        self.backend
            .execute(ControlCommand::Freeze(self.scope.clone()))
            .await?;
        self.frozen.store(true, Ordering::SeqCst);
        *self.captured.lock().await = self
            .backend
            .writer
            .capture(std::slice::from_ref(&self.zone_file))
            .await?;

        self.backend.writer.write(&self.zone_file, &content).await?;
        self.backend
            .execute(ControlCommand::Thaw(self.scope.clone()))
            .await?;
        self.frozen.store(false, Ordering::SeqCst);
        info!(zone = %self.scope, "Zone file refreshed");
        Ok(())
    }

    async fn compensate(&self, _previous: &Intent, _attempted: &Intent) -> Result<()> {
        let captured = self.captured.lock().await;
        self.backend.restore_best_effort(&captured).await;
        if self.frozen.load(Ordering::SeqCst) {
            self.backend
                .execute_best_effort(ControlCommand::Thaw(self.scope.clone()))
                .await;
        }
        Ok(())
    }
}

/// Ordered dynamic updates against one live zone, then a journal flush.
pub struct RecordPush {
    backend: Arc<DnsBackend>,
    scope: ZoneScope,
    updates: Vec<RecordUpdate>,
    applied: AtomicUsize,
}

impl RecordPush {
    pub fn new(backend: Arc<DnsBackend>, scope: ZoneScope, updates: Vec<RecordUpdate>) -> Self {
        Self {
            backend,
            scope,
            updates,
            applied: AtomicUsize::new(0),
        }
    }

    /// Updates this pusher sends, in order
    #[must_use]
    pub fn updates(&self) -> &[RecordUpdate] {
        &self.updates
    }
}

#[async_trait]
impl Pusher<Intent> for RecordPush {
    fn name(&self) -> &str {
        "record-update"
    }

    async fn push(&self, _desired: &Intent) -> Result<()> {
        if self.updates.is_empty() {
            return Ok(());
        }
        for (idx, update) in self.updates.iter().enumerate() {
            self.backend.updater.apply(update).await?;
            self.applied.store(idx + 1, Ordering::SeqCst);
        }
        self.backend
            .execute(ControlCommand::Sync(Some(self.scope.clone())))
            .await?;
        debug!(zone = %self.scope, updates = self.updates.len(), "Record updates applied");
        Ok(())
    }

    async fn compensate(&self, _previous: &Intent, _attempted: &Intent) -> Result<()> {
        let applied = self.applied.load(Ordering::SeqCst);
        for update in self.updates[..applied].iter().rev() {
            if let Err(e) = self.backend.updater.apply(&update.inverse()).await {
                error!(
                    zone = %self.scope,
                    name = %update.rrset.name,
                    error = %e,
                    "Failed to revert dynamic update"
                );
            }
        }
        if applied > 0 {
            self.backend
                .execute_best_effort(ControlCommand::Sync(Some(self.scope.clone())))
                .await;
        }
        Ok(())
    }
}

/// Rewrite a view's redirect and local-zone data and reload both policy zones.
pub struct ViewPolicyRefresh {
    backend: Arc<DnsBackend>,
    view_id: String,
    files: Vec<String>,
    zones: Vec<ZoneScope>,
    captured: Mutex<Vec<(String, Option<String>)>>,
}

impl ViewPolicyRefresh {
    /// Pusher for the policy files of view `view_id` of `next`.
    ///
    /// # Errors
    ///
    /// Returns not-found if the view is missing from `next`.
    pub fn new(backend: Arc<DnsBackend>, next: &Intent, view_id: &str) -> Result<Self> {
        let view = next.views.get_required(view_id)?;
        Ok(Self {
            backend,
            view_id: view.id.clone(),
            files: vec![redirect_file(&view.id), local_zone_file(&view.id)],
            zones: vec![
                ZoneScope::new(".", &view.name),
                ZoneScope::new(local_zone_origin(&view.name), &view.name),
            ],
            captured: Mutex::new(Vec::new()),
        })
    }

    async fn reload_all(&self) -> Result<()> {
        for scope in &self.zones {
            self.backend
                .execute(ControlCommand::Reload(Some(scope.clone())))
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Pusher<Intent> for ViewPolicyRefresh {
    fn name(&self) -> &str {
        "view-policy"
    }

    async fn push(&self, desired: &Intent) -> Result<()> {
        let set = self
            .backend
            .compiler
            .compile_view_policy(desired, &self.view_id)?;
        *self.captured.lock().await = self.backend.writer.capture(&self.files).await?;
        let changed = self.backend.writer.write_all(&set).await?;
        if changed.is_empty() {
            return Ok(());
        }
        self.reload_all().await
    }

    async fn compensate(&self, _previous: &Intent, _attempted: &Intent) -> Result<()> {
        let captured = self.captured.lock().await;
        self.backend.restore_best_effort(&captured).await;
        if let Err(e) = self.reload_all().await {
            error!(view = %self.view_id, error = %e, "Failed to reload restored policy zones");
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "push_tests.rs"]
mod push_tests;
