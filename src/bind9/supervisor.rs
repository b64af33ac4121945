// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Process supervisor for `named`.
//!
//! ```text
//! Stopped -> Starting -> Running -> (process exit) -> Starting -> ...
//!                              \-> stop() -> Stopped
//! ```
//!
//! The pid file is the only liveness signal: its presence means "running".
//! The health loop polls it on a fixed period and restarts the daemon when it
//! disappears. Cancellation is observed at the next tick, never mid-start.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::control::{ControlChannel, ControlCommand};
use crate::config::DnsConfig;
use crate::errors::{AgentError, Channel, Result};

/// Supervisor lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonState {
    Stopped,
    Starting,
    Running,
}

/// Prepares everything the daemon needs before launch.
#[async_trait]
pub trait Bootstrap: Send + Sync {
    /// Seed default intent if absent and write a full artifact set.
    /// Returns the main configuration path to launch with.
    async fn bootstrap(&self) -> Result<PathBuf>;
}

/// Starts the daemon process.
#[async_trait]
pub trait DaemonLauncher: Send + Sync {
    async fn launch(&self, main_conf: &Path) -> Result<()>;
}

/// Launches `named -c <main conf>`; `named` daemonizes and writes its pid file.
#[derive(Debug, Clone)]
pub struct NamedLauncher {
    binary: PathBuf,
}

impl NamedLauncher {
    #[must_use]
    pub fn new(config: &DnsConfig) -> Self {
        Self {
            binary: config.named_binary.clone(),
        }
    }
}

#[async_trait]
impl DaemonLauncher for NamedLauncher {
    async fn launch(&self, main_conf: &Path) -> Result<()> {
        let output = Command::new(&self.binary)
            .arg("-c")
            .arg(main_conf)
            .output()
            .await
            .map_err(|e| {
                AgentError::control(
                    Channel::Process,
                    format!("failed to run {}: {e}", self.binary.display()),
                )
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AgentError::control(
                Channel::Process,
                format!("named exited with {}: {}", output.status, stderr.trim()),
            ));
        }
        Ok(())
    }
}

/// Keeps one `named` process alive.
pub struct Supervisor {
    pid_file: PathBuf,
    interval: Duration,
    bootstrap: Arc<dyn Bootstrap>,
    launcher: Arc<dyn DaemonLauncher>,
    control: Arc<dyn ControlChannel>,
    state: Mutex<DaemonState>,
    cancel: CancellationToken,
}

impl Supervisor {
    pub fn new(
        config: &DnsConfig,
        bootstrap: Arc<dyn Bootstrap>,
        launcher: Arc<dyn DaemonLauncher>,
        control: Arc<dyn ControlChannel>,
    ) -> Self {
        Self {
            pid_file: config.pid_file.clone(),
            interval: config.health_check_interval(),
            bootstrap,
            launcher,
            control,
            state: Mutex::new(DaemonState::Stopped),
            cancel: CancellationToken::new(),
        }
    }

    pub async fn state(&self) -> DaemonState {
        *self.state.lock().await
    }

    /// Token cancelling the health loop
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    async fn pid_file_exists(&self) -> bool {
        tokio::fs::try_exists(&self.pid_file).await.unwrap_or(false)
    }

    /// Start the daemon unless its pid file already exists.
    ///
    /// # Errors
    ///
    /// Returns the bootstrap error (artifact or persistence) or a process error
    /// from the launcher; the state falls back to `Stopped`.
    pub async fn start(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if self.pid_file_exists().await {
            if *state != DaemonState::Running {
                debug!(pid_file = %self.pid_file.display(), "Pid file present, daemon already running");
            }
            *state = DaemonState::Running;
            return Ok(());
        }

        *state = DaemonState::Starting;
        info!("Starting named");

        let launched = async {
            let main_conf = self.bootstrap.bootstrap().await?;
            self.launcher.launch(&main_conf).await?;
            Ok::<_, AgentError>(main_conf)
        }
        .await;

        match launched {
            Ok(main_conf) => {
                info!(conf = %main_conf.display(), "named launched");
                *state = DaemonState::Running;
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Failed to start named");
                *state = DaemonState::Stopped;
                Err(e)
            }
        }
    }

    /// Spawn the periodic health check.
    ///
    /// Each tick restarts the daemon if its pid file is missing. The loop exits at
    /// the first tick after [`Self::stop`] or the cancellation token fires.
    pub fn spawn_health_loop(self: &Arc<Self>) -> JoinHandle<()> {
        let supervisor = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(supervisor.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    () = supervisor.cancel.cancelled() => {
                        debug!("Health loop cancelled");
                        break;
                    }
                    _ = ticker.tick() => {
                        if supervisor.pid_file_exists().await {
                            continue;
                        }
                        if supervisor.state().await == DaemonState::Running {
                            warn!(pid_file = %supervisor.pid_file.display(), "named is gone, restarting");
                        }
                        if let Err(e) = supervisor.start().await {
                            error!(error = %e, "Health check restart failed");
                        }
                    }
                }
            }
        })
    }

    /// Stop the daemon and the health loop. A no-op when the pid file is absent.
    ///
    /// # Errors
    ///
    /// Returns the control channel error if `rndc stop` fails.
    pub async fn stop(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if !self.pid_file_exists().await {
            debug!("No pid file, nothing to stop");
            return Ok(());
        }

        self.control.execute(&ControlCommand::Stop).await?;
        self.cancel.cancel();
        *state = DaemonState::Stopped;
        info!("named stopped");
        Ok(())
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod supervisor_tests;
