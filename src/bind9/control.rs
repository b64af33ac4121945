// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Control-channel driver for `named`.
//!
//! Every administrative operation is a fixed `rndc` invocation:
//!
//! ```text
//! rndc -c <conf> -s localhost -p <port> <subcommand> [args]
//! ```
//!
//! # Ordering
//!
//! - A zone file must hold its final content before `addzone` / `modzone`.
//! - `delzone` must be issued before the zone file is removed; `named` tracks
//!   zones in its own registry, not by file presence.
//! - After any dynamic update, `sync -clean` flushes the journal into the zone
//!   file so a later full rewrite does not lose the change.
//! - Zones accepting dynamic updates cannot be reloaded; rewrite their file
//!   between `freeze` and `thaw` instead.

use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, error};

use super::types::{RndcError, ZoneScope};
use crate::config::DnsConfig;
use crate::errors::{AgentError, Channel, Result};

/// DNS class passed to zone-scoped commands
const ZONE_CLASS: &str = "IN";

/// Administrative commands understood by the control channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    /// Re-read `named.conf` and load new zones
    Reconfig,
    /// Reload every zone, or a single zone
    Reload(Option<ZoneScope>),
    /// Add a zone at runtime; `conf` is the zone statement body
    AddZone { scope: ZoneScope, conf: String },
    /// Change the configuration of a runtime zone.
    ///
    /// No handler issues this: zone stanzas never change after `addzone`, and zone
    /// content edits go through `Freeze`/`Thaw`. It is kept so the zone commands
    /// mirror those of `rndc`.
    ModZone { scope: ZoneScope, conf: String },
    /// Delete a zone and clean up its files
    DelZone(ZoneScope),
    /// Flush journals into zone files and remove the journals
    Sync(Option<ZoneScope>),
    /// Suspend dynamic updates and flush the journal so the zone file can be rewritten
    Freeze(ZoneScope),
    /// Reload a frozen zone from its file and resume dynamic updates
    Thaw(ZoneScope),
    /// Stop the daemon
    Stop,
}

impl ControlCommand {
    /// Subcommand and arguments after the connection flags
    #[must_use]
    pub fn args(&self) -> Vec<String> {
        fn scoped(scope: &ZoneScope) -> [String; 3] {
            [
                scope.zone.clone(),
                ZONE_CLASS.to_string(),
                scope.view.clone(),
            ]
        }

        match self {
            Self::Reconfig => vec!["reconfig".to_string()],
            Self::Reload(None) => vec!["reload".to_string()],
            Self::Reload(Some(scope)) => {
                let mut args = vec!["reload".to_string()];
                args.extend(scoped(scope));
                args
            }
            Self::AddZone { scope, conf } => {
                let mut args = vec!["addzone".to_string()];
                args.extend(scoped(scope));
                args.push(conf.clone());
                args
            }
            Self::ModZone { scope, conf } => {
                let mut args = vec!["modzone".to_string()];
                args.extend(scoped(scope));
                args.push(conf.clone());
                args
            }
            Self::DelZone(scope) => {
                let mut args = vec!["delzone".to_string(), "-clean".to_string()];
                args.extend(scoped(scope));
                args
            }
            Self::Sync(None) => vec!["sync".to_string(), "-clean".to_string()],
            Self::Sync(Some(scope)) => {
                let mut args = vec!["sync".to_string(), "-clean".to_string()];
                args.extend(scoped(scope));
                args
            }
            Self::Freeze(scope) => {
                let mut args = vec!["freeze".to_string()];
                args.extend(scoped(scope));
                args
            }
            Self::Thaw(scope) => {
                let mut args = vec!["thaw".to_string()];
                args.extend(scoped(scope));
                args
            }
            Self::Stop => vec!["stop".to_string()],
        }
    }

    /// Subcommand name, used in logs and errors
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Reconfig => "reconfig",
            Self::Reload(_) => "reload",
            Self::AddZone { .. } => "addzone",
            Self::ModZone { .. } => "modzone",
            Self::DelZone(_) => "delzone",
            Self::Sync(_) => "sync",
            Self::Freeze(_) => "freeze",
            Self::Thaw(_) => "thaw",
            Self::Stop => "stop",
        }
    }
}

impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reload(Some(scope))
            | Self::Sync(Some(scope))
            | Self::DelZone(scope)
            | Self::Freeze(scope)
            | Self::Thaw(scope) => {
                write!(f, "{} {scope}", self.name())
            }
            Self::AddZone { scope, .. } | Self::ModZone { scope, .. } => {
                write!(f, "{} {scope}", self.name())
            }
            _ => f.write_str(self.name()),
        }
    }
}

/// Issues administrative commands to the DNS daemon.
#[async_trait]
pub trait ControlChannel: Send + Sync {
    /// Run `command`, returning the daemon's textual output.
    async fn execute(&self, command: &ControlCommand) -> Result<String>;
}

/// `rndc`-backed control channel.
#[derive(Debug, Clone)]
pub struct RndcControl {
    binary: PathBuf,
    conf: PathBuf,
    port: u16,
}

impl RndcControl {
    #[must_use]
    pub fn new(config: &DnsConfig) -> Self {
        Self {
            binary: config.rndc_binary.clone(),
            conf: config.rndc_conf.clone(),
            port: config.rndc_port,
        }
    }

    /// Full argument vector for `command`
    #[must_use]
    pub fn command_line(&self, command: &ControlCommand) -> Vec<String> {
        let mut args = vec![
            "-c".to_string(),
            self.conf.display().to_string(),
            "-s".to_string(),
            "localhost".to_string(),
            "-p".to_string(),
            self.port.to_string(),
        ];
        args.extend(command.args());
        args
    }
}

#[async_trait]
impl ControlChannel for RndcControl {
    async fn execute(&self, command: &ControlCommand) -> Result<String> {
        debug!(command = %command, "Executing rndc command");

        let output = Command::new(&self.binary)
            .args(self.command_line(command))
            .output()
            .await
            .map_err(|e| {
                AgentError::control(
                    Channel::Rndc,
                    format!("failed to run {} {}: {e}", self.binary.display(), command),
                )
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if output.status.success() {
            return Ok(stdout);
        }

        let raw = if stderr.trim().is_empty() {
            stdout
        } else {
            stderr
        };
        let reason = match RndcError::parse(raw.trim()) {
            Some(parsed) => format!("{parsed} (output: {})", raw.trim()),
            None => format!(
                "'{}' exited with {}: {}",
                command,
                output.status,
                raw.trim()
            ),
        };
        error!(command = %command, status = %output.status, output = %raw.trim(), "rndc command failed");
        Err(AgentError::control(Channel::Rndc, reason))
    }
}

#[cfg(test)]
#[path = "control_tests.rs"]
mod control_tests;
