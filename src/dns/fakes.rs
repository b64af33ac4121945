// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-process stand-ins for `rndc` and the dynamic update channel.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use super::DnsHandler;
use crate::bind9::control::{ControlChannel, ControlCommand};
use crate::bind9::update::{RecordUpdate, RecordUpdater, UpdateOp};
use crate::config::DnsConfig;
use crate::errors::{AgentError, Channel, Result};
use crate::intent::{IntentStore, MemoryIntentStore};

/// Records every command; fails the first command whose name matches `fail_on`.
#[derive(Default)]
pub struct RecordingControl {
    commands: Mutex<Vec<ControlCommand>>,
    fail_on: Mutex<Option<&'static str>>,
}

impl RecordingControl {
    pub fn fail_on(&self, name: &'static str) {
        *self.fail_on.lock().unwrap() = Some(name);
    }

    pub fn commands(&self) -> Vec<ControlCommand> {
        self.commands.lock().unwrap().clone()
    }

    /// Commands rendered as `name scope`
    pub fn log(&self) -> Vec<String> {
        self.commands().iter().map(ToString::to_string).collect()
    }

    pub fn clear(&self) {
        self.commands.lock().unwrap().clear();
    }
}

#[async_trait]
impl ControlChannel for RecordingControl {
    async fn execute(&self, command: &ControlCommand) -> Result<String> {
        self.commands.lock().unwrap().push(command.clone());
        let mut fail_on = self.fail_on.lock().unwrap();
        if *fail_on == Some(command.name()) {
            *fail_on = None;
            return Err(AgentError::control(Channel::Rndc, "injected failure"));
        }
        Ok(String::new())
    }
}

/// Live record set keyed by (zone, view, name, type, rdata).
#[derive(Default)]
pub struct LiveZoneUpdater {
    live: Mutex<BTreeSet<(String, String, String, String, String)>>,
    applied: Mutex<Vec<RecordUpdate>>,
    fail_after: Mutex<Option<usize>>,
}

impl LiveZoneUpdater {
    /// Fail every update once `count` updates were applied.
    pub fn fail_after(&self, count: usize) {
        *self.fail_after.lock().unwrap() = Some(count);
    }

    pub fn applied(&self) -> Vec<RecordUpdate> {
        self.applied.lock().unwrap().clone()
    }

    /// `(name, type, rdata)` currently live in `zone`
    pub fn live(&self, zone: &str) -> Vec<(String, String, String)> {
        self.live
            .lock()
            .unwrap()
            .iter()
            .filter(|entry| entry.0 == zone)
            .map(|entry| (entry.2.clone(), entry.3.clone(), entry.4.clone()))
            .collect()
    }
}

#[async_trait]
impl RecordUpdater for LiveZoneUpdater {
    async fn apply(&self, update: &RecordUpdate) -> Result<()> {
        let mut applied = self.applied.lock().unwrap();
        let mut fail_after = self.fail_after.lock().unwrap();
        if fail_after.is_some_and(|limit| applied.len() >= limit) {
            *fail_after = None;
            return Err(AgentError::control(
                Channel::DynamicUpdate,
                "update rejected with response code: Refused",
            ));
        }
        let key = (
            update.zone.clone(),
            update.view.clone(),
            update.rrset.name.clone(),
            update.rrset.rr_type.clone(),
            update.rrset.rdata.clone(),
        );
        let mut live = self.live.lock().unwrap();
        match update.op {
            UpdateOp::Assert => {
                live.insert(key);
            }
            UpdateOp::Retract => {
                live.remove(&key);
            }
        }
        applied.push(update.clone());
        Ok(())
    }
}

pub struct Harness {
    pub dir: TempDir,
    pub control: Arc<RecordingControl>,
    pub updater: Arc<LiveZoneUpdater>,
    pub handler: DnsHandler,
}

impl Harness {
    pub fn read(&self, name: &str) -> Option<String> {
        std::fs::read_to_string(self.dir.path().join(name)).ok()
    }
}

/// Handler over a temp conf dir, bootstrapped with the default intent.
pub async fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let config = DnsConfig {
        conf_dir: dir.path().to_path_buf(),
        ..DnsConfig::default()
    };
    let store: Arc<dyn IntentStore> = Arc::new(MemoryIntentStore::default());
    let control = Arc::new(RecordingControl::default());
    let updater = Arc::new(LiveZoneUpdater::default());
    let handler = DnsHandler::new(&config, store, control.clone(), updater.clone());
    handler.seed_defaults().await.unwrap();
    handler.write_artifacts().await.unwrap();
    Harness {
        dir,
        control,
        updater,
        handler,
    }
}
