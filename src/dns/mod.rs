// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! DNS handler: every intent mutation, pushed into `named` through the reconciler.
//!
//! Each operation validates against the current intent, mutates a copy and picks
//! the narrowest pusher that makes the daemon reflect the change:
//!
//! - structural changes (ACLs, views, forward zones, global options, black holes)
//!   regenerate everything and `reconfig`
//! - zone lifecycle uses `addzone` / `delzone`
//! - record changes are dynamic updates followed by a journal `sync`
//! - redirections rewrite one view's policy zones
//!
//! The intent commits only after the push succeeded.

mod acl;
#[cfg(test)]
pub(crate) mod fakes;
mod forward;
mod options;
pub mod push;
mod record;
mod redirection;
pub mod requests;
mod view;
mod zone;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::bind9::control::ControlChannel;
use crate::bind9::rndc::generate_view_key;
use crate::bind9::supervisor::Bootstrap;
use crate::bind9::update::{RecordUpdate, RecordUpdater, RrSet, UpdateOp};
use crate::compiler::writer::ArtifactWriter;
use crate::compiler::ConfigCompiler;
use crate::config::DnsConfig;
use crate::constants::{ACL_ANY, ACL_NONE, DEFAULT_VIEW};
use crate::errors::Result;
use crate::intent::{Acl, Intent, IntentStore, ResourceRecord, View};
use crate::reconciler::{IntentAuthority, NoopPusher, Planned, Reconciler};
use push::{DnsBackend, FullReconfig};

/// Applies DNS intent mutations and keeps `named` converged with them.
pub struct DnsHandler {
    backend: Arc<DnsBackend>,
    reconciler: Reconciler<Intent, IntentAuthority>,
}

impl DnsHandler {
    pub fn new(
        config: &DnsConfig,
        store: Arc<dyn IntentStore>,
        control: Arc<dyn ControlChannel>,
        updater: Arc<dyn RecordUpdater>,
    ) -> Self {
        let compiler = ConfigCompiler::new(config);
        let writer = ArtifactWriter::new(compiler.conf_dir());
        Self {
            backend: Arc::new(DnsBackend {
                compiler,
                writer,
                control,
                updater,
            }),
            reconciler: Reconciler::new(IntentAuthority::new(store)),
        }
    }

    /// Last committed intent.
    ///
    /// # Errors
    ///
    /// Propagates intent store failures.
    pub async fn intent(&self) -> Result<Arc<Intent>> {
        self.reconciler.current().await
    }

    #[must_use]
    pub fn compiler(&self) -> &ConfigCompiler {
        &self.backend.compiler
    }

    /// Path `named` is launched with
    #[must_use]
    pub fn main_conf_path(&self) -> PathBuf {
        self.backend.compiler.main_conf_path()
    }

    /// Apply a structural mutation and push it with a full regeneration.
    async fn apply_structural<T, F>(&self, mutate: F) -> Result<T>
    where
        T: Send,
        F: FnOnce(&mut Intent) -> Result<T> + Send,
    {
        let backend = Arc::clone(&self.backend);
        self.reconciler
            .apply_planned(move |previous, next| {
                let output = mutate(next)?;
                Ok(Planned::new(output, FullReconfig::between(backend, previous)))
            })
            .await
    }

    /// Insert the reserved ACLs and the default view if they are missing.
    ///
    /// Returns whether anything was added. Nothing is pushed; callers write the
    /// artifacts afterwards.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the intent cannot be committed.
    pub async fn seed_defaults(&self) -> Result<bool> {
        let current = self.intent().await?;
        if current.has_reserved_acls() && current.views.get(DEFAULT_VIEW).is_some() {
            return Ok(false);
        }

        self.reconciler
            .apply(&NoopPusher, |next| {
                for id in [ACL_ANY, ACL_NONE] {
                    if next.acls.get(id).is_none() {
                        next.acls.insert(Acl {
                            id: id.to_string(),
                            name: id.to_string(),
                            ips: Vec::new(),
                        })?;
                    }
                }
                if next.views.get(DEFAULT_VIEW).is_none() {
                    next.views.insert(View {
                        id: DEFAULT_VIEW.to_string(),
                        name: DEFAULT_VIEW.to_string(),
                        priority: 1,
                        acls: vec![ACL_ANY.to_string()],
                        dns64: None,
                        key: generate_view_key(DEFAULT_VIEW),
                    })?;
                    next.priority_list_mut().insert(1, DEFAULT_VIEW, true)?;
                    next.renumber_priorities()?;
                }
                Ok(())
            })
            .await?;

        info!("Seeded default ACLs and view");
        Ok(true)
    }

    /// Write every artifact of the committed intent without touching the daemon.
    ///
    /// # Errors
    ///
    /// Returns an artifact error if rendering or writing fails.
    pub async fn write_artifacts(&self) -> Result<()> {
        let pusher = FullReconfig::write_only(Arc::clone(&self.backend));
        self.reconciler.resync(&pusher).await
    }

    /// Regenerate everything from the committed intent and `reconfig`.
    ///
    /// Heals divergence left by an earlier failed compensation.
    ///
    /// # Errors
    ///
    /// Returns the artifact or control-channel error of the push.
    pub async fn reconfigure_all(&self) -> Result<()> {
        let pusher = FullReconfig::heal(Arc::clone(&self.backend));
        self.reconciler.resync(&pusher).await
    }
}

#[async_trait]
impl Bootstrap for DnsHandler {
    async fn bootstrap(&self) -> Result<PathBuf> {
        self.seed_defaults().await?;
        self.write_artifacts().await?;
        Ok(self.main_conf_path())
    }
}

/// Next SOA serial in `YYYYMMDDnn` form, never going backwards.
#[must_use]
pub fn next_serial(current: u32, today: NaiveDate) -> u32 {
    let day_base =
        today.year().unsigned_abs() * 1_000_000 + today.month() * 10_000 + today.day() * 100;
    current.saturating_add(1).max(day_base)
}

fn bump_serial(current: u32) -> u32 {
    next_serial(current, Utc::now().date_naive())
}

/// Dynamic update for one record of `intent`, carrying `rdata`.
fn record_update(
    intent: &Intent,
    record: &ResourceRecord,
    op: UpdateOp,
    rdata: &str,
) -> Result<RecordUpdate> {
    let zone = intent.zones.get_required(&record.zone_id)?;
    let view = intent.views.get_required(&zone.view_id)?;
    Ok(RecordUpdate {
        zone: zone.name.clone(),
        view: view.name.clone(),
        op,
        rrset: RrSet {
            name: record.name.clone(),
            rr_type: record.rr_type.to_ascii_uppercase(),
            ttl: record.ttl,
            rdata: rdata.to_string(),
        },
        key: view.key.clone(),
    })
}
