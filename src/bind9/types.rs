// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Types shared by the BIND9 control channel and dynamic update client.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// HMAC algorithm of a TSIG key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TsigAlgorithm {
    HmacMd5,
    HmacSha1,
    HmacSha224,
    #[default]
    HmacSha256,
    HmacSha384,
    HmacSha512,
}

impl TsigAlgorithm {
    /// Name as written in `named.conf` key statements
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HmacMd5 => "hmac-md5",
            Self::HmacSha1 => "hmac-sha1",
            Self::HmacSha224 => "hmac-sha224",
            Self::HmacSha256 => "hmac-sha256",
            Self::HmacSha384 => "hmac-sha384",
            Self::HmacSha512 => "hmac-sha512",
        }
    }
}

impl fmt::Display for TsigAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TsigAlgorithm {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hmac-md5" => Ok(Self::HmacMd5),
            "hmac-sha1" => Ok(Self::HmacSha1),
            "hmac-sha224" => Ok(Self::HmacSha224),
            "hmac-sha256" => Ok(Self::HmacSha256),
            "hmac-sha384" => Ok(Self::HmacSha384),
            "hmac-sha512" => Ok(Self::HmacSha512),
            _ => anyhow::bail!("Unsupported TSIG algorithm '{s}'. Supported algorithms: hmac-md5, hmac-sha1, hmac-sha224, hmac-sha256, hmac-sha384, hmac-sha512"),
        }
    }
}

/// TSIG key material for one view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TsigKeyData {
    /// Key name (the owning view's name)
    pub name: String,
    /// HMAC algorithm
    #[serde(default)]
    pub algorithm: TsigAlgorithm,
    /// Base64-encoded secret key
    pub secret: String,
}

/// RNDC command error with structured information.
///
/// Parses BIND9 RNDC error responses in the format:
/// ```text
/// rndc: 'command' failed: error_type
/// error details
/// ```
#[derive(Debug, Clone, thiserror::Error)]
#[error("RNDC command '{command}' failed: {error}")]
pub struct RndcError {
    /// The RNDC command that failed (e.g., "addzone", "sync")
    pub command: String,
    /// The error type (e.g., "not found", "already exists")
    pub error: String,
    /// Additional error details from BIND9
    pub details: Option<String>,
}

impl RndcError {
    /// Parse an RNDC error response.
    ///
    /// Expected format:
    /// ```text
    /// rndc: 'addzone' failed: already exists
    /// zone 'example.com' already exists in view 'default'
    /// ```
    #[must_use]
    pub fn parse(response: &str) -> Option<Self> {
        let lines: Vec<&str> = response.lines().collect();
        let first_line = lines.first()?;

        if !first_line.starts_with("rndc:") {
            return None;
        }

        let command_start = first_line.find('\'')?;
        let command_end = first_line[command_start + 1..].find('\'')?;
        let command = first_line[command_start + 1..command_start + 1 + command_end].to_string();

        let failed_pos = first_line.find("failed:")?;
        let error = first_line[failed_pos + 7..].trim().to_string();

        let details = if lines.len() > 1 {
            Some(lines[1..].join("\n").trim().to_string())
        } else {
            None
        };

        Some(Self {
            command,
            error,
            details,
        })
    }
}

/// A zone addressed inside a specific view.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ZoneScope {
    /// Zone origin without trailing dot
    pub zone: String,
    /// View name
    pub view: String,
}

impl ZoneScope {
    pub fn new(zone: impl Into<String>, view: impl Into<String>) -> Self {
        Self {
            zone: zone.into(),
            view: view.into(),
        }
    }
}

impl fmt::Display for ZoneScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {}", self.zone, self.view)
    }
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod types_tests;
