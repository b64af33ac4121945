// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Request payloads of DNS operations that do not map 1:1 onto an intent object.

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_ZONE_TTL_SECS;
use crate::intent::{Dns64, ZoneRole};

fn first_position() -> u32 {
    1
}

fn default_ttl() -> u32 {
    DEFAULT_ZONE_TTL_SECS
}

/// Create a view at a 1-based priority position (clamped into range).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateView {
    pub id: String,
    pub name: String,
    #[serde(default = "first_position")]
    pub priority: u32,
    #[serde(default)]
    pub acls: Vec<String>,
    #[serde(default)]
    pub dns64: Option<Dns64>,
}

/// Replace a view's ACLs and DNS64 settings, optionally moving it.
///
/// Views cannot be renamed: the name is their key name and zone index file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateView {
    pub id: String,
    #[serde(default)]
    pub priority: Option<u32>,
    #[serde(default)]
    pub acls: Vec<String>,
    #[serde(default)]
    pub dns64: Option<Dns64>,
}

/// Create an authoritative or forward zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateZone {
    pub id: String,
    pub name: String,
    #[serde(default = "default_ttl")]
    pub ttl: u32,
    /// Empty for a forward zone
    #[serde(default)]
    pub zone_file: String,
    pub view_id: String,
    #[serde(default)]
    pub role: ZoneRole,
}

/// Change a zone's default TTL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateZoneTtl {
    pub id: String,
    pub ttl: u32,
}

/// Flip which rdata column of a zone's records is served.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchZoneRole {
    pub id: String,
    pub role: ZoneRole,
}

/// Delete by surrogate id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteById {
    pub id: String,
}
