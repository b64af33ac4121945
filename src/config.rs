// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Agent configuration loaded from a YAML file.
//!
//! Every field has a default so an empty file (or no file) yields a working
//! configuration for a stock BIND9 + Kea install:
//!
//! ```yaml
//! intent-path: /var/lib/ddi-agent/intent.json
//! dns:
//!   conf-dir: /etc/bind/ddi
//!   rndc-port: 953
//! dhcp:
//!   control-agent-url: http://127.0.0.1:8000
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::constants::{
    DEFAULT_PID_FILE, DNS_PORT, HEALTH_CHECK_INTERVAL_SECS, KEA_HTTP_TIMEOUT_SECS, RNDC_PORT,
};

/// Top-level agent configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case", default)]
pub struct AgentConfig {
    /// JSON file holding the persisted intent
    pub intent_path: PathBuf,
    /// BIND9 side
    pub dns: DnsConfig,
    /// Kea side
    pub dhcp: DhcpConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            intent_path: PathBuf::from("/var/lib/ddi-agent/intent.json"),
            dns: DnsConfig::default(),
            dhcp: DhcpConfig::default(),
        }
    }
}

/// BIND9 daemon settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case", default)]
pub struct DnsConfig {
    /// Whether the agent manages `named` at all
    pub enabled: bool,
    /// Directory receiving every generated artifact
    pub conf_dir: PathBuf,
    /// `named` executable
    pub named_binary: PathBuf,
    /// `rndc` executable
    pub rndc_binary: PathBuf,
    /// rndc client configuration passed with `-c`
    pub rndc_conf: PathBuf,
    /// rndc key file included by the generated options
    pub rndc_key_file: PathBuf,
    /// Key name referenced by the `controls` statement
    pub rndc_key_name: String,
    /// Control channel port
    pub rndc_port: u16,
    /// Address receiving dynamic updates
    pub update_server: SocketAddr,
    /// Pid file written by `named`; its presence means "running"
    pub pid_file: PathBuf,
    /// Health check period in seconds
    pub health_check_interval_secs: u64,
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            conf_dir: PathBuf::from("/etc/bind/ddi"),
            named_binary: PathBuf::from("named"),
            rndc_binary: PathBuf::from("rndc"),
            rndc_conf: PathBuf::from("/etc/bind/rndc.conf"),
            rndc_key_file: PathBuf::from("/etc/bind/rndc.key"),
            rndc_key_name: "rndc-key".to_string(),
            rndc_port: RNDC_PORT,
            update_server: SocketAddr::from(([127, 0, 0, 1], DNS_PORT)),
            pid_file: PathBuf::from(DEFAULT_PID_FILE),
            health_check_interval_secs: HEALTH_CHECK_INTERVAL_SECS,
        }
    }
}

impl DnsConfig {
    /// Health check period
    #[must_use]
    pub fn health_check_interval(&self) -> Duration {
        Duration::from_secs(self.health_check_interval_secs)
    }
}

/// Kea daemon settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case", default)]
pub struct DhcpConfig {
    /// Whether the agent manages Kea at all
    pub enabled: bool,
    /// Kea control agent endpoint
    pub control_agent_url: String,
    /// DHCPv4 configuration file (read at start, target of `config-write`)
    pub v4_config_path: PathBuf,
    /// DHCPv6 configuration file (read at start, target of `config-write`)
    pub v6_config_path: PathBuf,
    /// Timeout for each HTTP call in seconds
    pub timeout_secs: u64,
}

impl Default for DhcpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            control_agent_url: "http://127.0.0.1:8000".to_string(),
            v4_config_path: PathBuf::from("/etc/kea/kea-dhcp4.conf"),
            v6_config_path: PathBuf::from("/etc/kea/kea-dhcp6.conf"),
            timeout_secs: KEA_HTTP_TIMEOUT_SECS,
        }
    }
}

impl DhcpConfig {
    /// Parsed control agent URL
    ///
    /// # Errors
    ///
    /// Returns an error if the configured URL is not a valid http(s) URL.
    pub fn control_agent_url(&self) -> Result<Url> {
        let url = Url::parse(&self.control_agent_url)
            .with_context(|| format!("Invalid control-agent-url: {}", self.control_agent_url))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            anyhow::bail!(
                "control-agent-url must use http or https, got '{}'",
                url.scheme()
            );
        }
        Ok(url)
    }

    /// HTTP timeout
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl AgentConfig {
    /// Parse a configuration from YAML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed or fails validation.
    pub fn from_yaml(text: &str) -> Result<Self> {
        let config: Self = if text.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(text).context("Failed to parse agent configuration")?
        };
        config.validate()?;
        Ok(config)
    }

    /// Load the configuration file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration {}", path.display()))?;
        Self::from_yaml(&text)
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first violated constraint.
    pub fn validate(&self) -> Result<()> {
        if self.dns.health_check_interval_secs == 0 {
            anyhow::bail!("dns.health-check-interval-secs must be greater than zero");
        }
        if self.dns.rndc_key_name.trim().is_empty() {
            anyhow::bail!("dns.rndc-key-name must not be empty");
        }
        if self.dhcp.timeout_secs == 0 {
            anyhow::bail!("dhcp.timeout-secs must be greater than zero");
        }
        if self.dhcp.enabled {
            self.dhcp.control_agent_url()?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
