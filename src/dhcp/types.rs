// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Typed Kea configuration trees.
//!
//! Only the collections the agent edits are typed. Every other key, at every level,
//! is kept in an `extra` map and written back unchanged, so a `config-set` never
//! drops settings the agent does not know about.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::{KEA_SERVICE_DHCP4, KEA_SERVICE_DHCP6};

/// Keys Kea understands but the agent does not edit.
pub type Extra = Map<String, Value>;

/// A top-level Kea document that can be pushed with `config-set`.
pub trait KeaDocument:
    Serialize + DeserializeOwned + Clone + Default + std::fmt::Debug + Send + Sync + 'static
{
    /// Service name in the control agent envelope
    const SERVICE: &'static str;
}

/// Content of `kea-dhcp4.conf`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Kea4Config {
    #[serde(rename = "Dhcp4")]
    pub dhcp4: Dhcp4,
    #[serde(flatten)]
    pub extra: Extra,
}

impl KeaDocument for Kea4Config {
    const SERVICE: &'static str = KEA_SERVICE_DHCP4;
}

/// Content of `kea-dhcp6.conf`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Kea6Config {
    #[serde(rename = "Dhcp6")]
    pub dhcp6: Dhcp6,
    #[serde(flatten)]
    pub extra: Extra,
}

impl KeaDocument for Kea6Config {
    const SERVICE: &'static str = KEA_SERVICE_DHCP6;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct Dhcp4 {
    #[serde(default)]
    pub subnet4: Vec<Subnet4>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub client_classes: Vec<ClientClass>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct Dhcp6 {
    #[serde(default)]
    pub subnet6: Vec<Subnet6>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// An IPv4 subnet; `id` is its natural key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subnet4 {
    pub id: u32,
    /// CIDR, e.g. `192.0.2.0/24`
    pub subnet: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pools: Vec<Pool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reservations: Vec<Reservation4>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// An IPv6 subnet; `id` is its natural key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Subnet6 {
    pub id: u32,
    pub subnet: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pools: Vec<Pool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pd_pools: Vec<PdPool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reservations: Vec<Reservation6>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Dynamic address range, either `first - last` or a CIDR prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pool {
    pub pool: String,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Pool {
    /// Pool covering `begin` to `end` inclusive
    #[must_use]
    pub fn range(begin: &str, end: &str) -> Self {
        Self {
            pool: format!("{} - {}", begin.trim(), end.trim()),
            extra: Extra::new(),
        }
    }

    /// `begin-end` with whitespace removed; CIDR pools are keyed by the prefix itself
    #[must_use]
    pub fn key(&self) -> String {
        pool_key(&self.pool)
    }
}

/// Normalize a pool string into its natural key.
#[must_use]
pub fn pool_key(pool: &str) -> String {
    pool.split_whitespace().collect::<String>()
}

/// Prefix delegation pool; the delegated `prefix` is its natural key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PdPool {
    pub prefix: String,
    pub prefix_len: u8,
    pub delegated_len: u8,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Host reservation in an IPv4 subnet, keyed by hardware address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Reservation4 {
    pub hw_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Host reservation in an IPv6 subnet, keyed by hardware address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Reservation6 {
    pub hw_address: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ip_addresses: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prefixes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Client classification rule, keyed by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientClass {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Normalize a hardware address for comparison (`AA-BB..` and `aa:bb..` match).
#[must_use]
pub fn hw_key(hw_address: &str) -> String {
    hw_address.trim().to_ascii_lowercase().replace('-', ":")
}

/// Parse a Kea configuration file.
///
/// Kea accepts `//` and `#` line comments in its files; they are dropped before
/// parsing.
///
/// # Errors
///
/// Returns an error if the remaining text is not a valid document.
pub fn parse_document<T: KeaDocument>(text: &str) -> serde_json::Result<T> {
    let stripped: String = text
        .lines()
        .filter(|line| {
            let line = line.trim_start();
            !line.starts_with("//") && !line.starts_with('#')
        })
        .collect::<Vec<_>>()
        .join("\n");
    serde_json::from_str(&stripped)
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod types_tests;
