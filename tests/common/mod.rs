// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared fakes for integration tests: a recording `rndc`, an in-memory live zone
//! for dynamic updates, and a launcher that behaves like a daemonizing `named`.

#![allow(dead_code)]

use async_trait::async_trait;
use ddi_agent::bind9::{
    ControlChannel, ControlCommand, DaemonLauncher, RecordUpdate, RecordUpdater, UpdateOp,
};
use ddi_agent::config::{AgentConfig, DnsConfig};
use ddi_agent::dispatch::Dispatcher;
use ddi_agent::dns::DnsHandler;
use ddi_agent::errors::{AgentError, Channel, Response, Result};
use ddi_agent::intent::{FileIntentStore, IntentStore};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Records commands; removes the pid file on `stop` like `named` does.
#[derive(Default)]
pub struct RecordingRndc {
    commands: Mutex<Vec<String>>,
    fail_on: Mutex<Option<&'static str>>,
    pid_file: Option<PathBuf>,
}

impl RecordingRndc {
    pub fn with_pid_file(pid_file: PathBuf) -> Self {
        Self {
            pid_file: Some(pid_file),
            ..Self::default()
        }
    }

    /// Fail the next command named `name`.
    pub fn fail_next(&self, name: &'static str) {
        *self.fail_on.lock().unwrap() = Some(name);
    }

    pub fn log(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.commands.lock().unwrap().clear();
    }
}

#[async_trait]
impl ControlChannel for RecordingRndc {
    async fn execute(&self, command: &ControlCommand) -> Result<String> {
        self.commands.lock().unwrap().push(command.to_string());
        let mut fail_on = self.fail_on.lock().unwrap();
        if *fail_on == Some(command.name()) {
            *fail_on = None;
            return Err(AgentError::control(
                Channel::Rndc,
                format!("rndc: '{}' failed: failure", command.name()),
            ));
        }
        if *command == ControlCommand::Stop {
            if let Some(pid_file) = &self.pid_file {
                let _ = std::fs::remove_file(pid_file);
            }
        }
        Ok(String::new())
    }
}

/// `(zone, name, type, rdata)` tuples currently served.
#[derive(Default)]
pub struct LiveZone {
    records: Mutex<BTreeSet<(String, String, String, String)>>,
    refuse: Mutex<bool>,
}

impl LiveZone {
    /// Refuse the next update.
    pub fn refuse_next(&self) {
        *self.refuse.lock().unwrap() = true;
    }

    /// `name rdata` pairs live in `zone`, sorted
    pub fn served(&self, zone: &str) -> Vec<String> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.0 == zone)
            .map(|r| format!("{} {}", r.1, r.3))
            .collect()
    }
}

#[async_trait]
impl RecordUpdater for LiveZone {
    async fn apply(&self, update: &RecordUpdate) -> Result<()> {
        let mut refuse = self.refuse.lock().unwrap();
        if *refuse {
            *refuse = false;
            return Err(AgentError::control(
                Channel::DynamicUpdate,
                "update rejected with response code: Refused",
            ));
        }
        let entry = (
            update.zone.clone(),
            update.rrset.name.clone(),
            update.rrset.rr_type.clone(),
            update.rrset.rdata.clone(),
        );
        let mut records = self.records.lock().unwrap();
        match update.op {
            UpdateOp::Assert => records.insert(entry),
            UpdateOp::Retract => records.remove(&entry),
        };
        Ok(())
    }
}

/// Writes the pid file as a daemonizing `named` would.
pub struct PidFileLauncher {
    pid_file: PathBuf,
    launches: AtomicUsize,
}

impl PidFileLauncher {
    pub fn new(pid_file: PathBuf) -> Self {
        Self {
            pid_file,
            launches: AtomicUsize::new(0),
        }
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DaemonLauncher for PidFileLauncher {
    async fn launch(&self, main_conf: &Path) -> Result<()> {
        if !main_conf.exists() {
            return Err(AgentError::control(
                Channel::Process,
                format!("{} missing", main_conf.display()),
            ));
        }
        self.launches.fetch_add(1, Ordering::SeqCst);
        std::fs::write(&self.pid_file, "4242").unwrap();
        Ok(())
    }
}

/// A DNS agent over a temp directory with a file-backed intent store.
pub struct DnsNode {
    pub dir: TempDir,
    pub config: AgentConfig,
    pub rndc: Arc<RecordingRndc>,
    pub live: Arc<LiveZone>,
    pub handler: Arc<DnsHandler>,
    pub dispatcher: Dispatcher,
}

impl DnsNode {
    /// Handler bootstrapped like the supervisor would before launching `named`.
    pub async fn start() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AgentConfig::default();
        config.intent_path = dir.path().join("intent.json");
        config.dns = DnsConfig {
            conf_dir: dir.path().join("bind"),
            pid_file: dir.path().join("named.pid"),
            health_check_interval_secs: 1,
            ..DnsConfig::default()
        };
        config.dhcp.enabled = false;
        Self::open(dir, config).await
    }

    /// Re-open the same directory, as after an agent restart.
    pub async fn restart(self) -> Self {
        let Self { dir, config, .. } = self;
        Self::open(dir, config).await
    }

    async fn open(dir: TempDir, config: AgentConfig) -> Self {
        let store: Arc<dyn IntentStore> =
            Arc::new(FileIntentStore::open(&config.intent_path).await.unwrap());
        let rndc = Arc::new(RecordingRndc::with_pid_file(config.dns.pid_file.clone()));
        let live = Arc::new(LiveZone::default());
        let handler = Arc::new(DnsHandler::new(
            &config.dns,
            store,
            rndc.clone(),
            live.clone(),
        ));
        ddi_agent::bind9::Bootstrap::bootstrap(handler.as_ref())
            .await
            .unwrap();
        let dispatcher = Dispatcher::new(Some(handler.clone()), None);
        Self {
            dir,
            config,
            rndc,
            live,
            handler,
            dispatcher,
        }
    }

    /// Send one envelope given as JSON text.
    pub async fn send(&self, envelope: &str) -> Response {
        self.dispatcher.dispatch_line(envelope).await
    }

    /// Send one envelope and require success.
    pub async fn ok(&self, envelope: &str) {
        let response = self.send(envelope).await;
        assert!(
            response.succeed,
            "{envelope} failed: {}",
            response.error_message
        );
    }

    /// Content of a generated file, if present
    pub fn read(&self, name: &str) -> Option<String> {
        std::fs::read_to_string(self.config.dns.conf_dir.join(name)).ok()
    }
}
