// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Intent objects describing the desired DNS configuration.

use serde::{Deserialize, Serialize};

use crate::bind9::types::TsigKeyData;
use crate::constants::{
    DEFAULT_FETCHES_PER_ZONE, DEFAULT_MAX_CACHE_TTL_SECS, DEFAULT_RECURSIVE_CLIENTS,
    RESERVED_ACL_IDS,
};

/// An object stored in a [`super::Table`], addressed by a surrogate id.
pub trait Entity {
    /// Kind name used in error messages
    const KIND: &'static str;

    /// Surrogate id
    fn id(&self) -> &str;
}

macro_rules! impl_entity {
    ($ty:ty, $kind:literal) => {
        impl Entity for $ty {
            const KIND: &'static str = $kind;

            fn id(&self) -> &str {
                &self.id
            }
        }
    };
}

/// A named set of client address ranges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acl {
    pub id: String,
    pub name: String,
    /// Addresses or CIDR prefixes, optionally negated with `!`
    #[serde(default)]
    pub ips: Vec<String>,
}

impl Acl {
    /// Whether this is one of the built-in `any` / `none` ACLs
    #[must_use]
    pub fn is_reserved(&self) -> bool {
        is_reserved_acl(&self.id)
    }
}

/// Whether `id` names a built-in ACL.
#[must_use]
pub fn is_reserved_acl(id: &str) -> bool {
    RESERVED_ACL_IDS.contains(&id)
}

/// DNS64 synthesis settings of a view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dns64 {
    /// IPv6 prefix, e.g. `64:ff9b::/96`
    pub prefix: String,
    /// ACL id selecting clients that receive synthesized answers (defaults to `any`)
    #[serde(default)]
    pub client_acl: Option<String>,
    /// ACL id selecting IPv4 addresses that may be mapped (defaults to `any`)
    #[serde(default)]
    pub mapped_acl: Option<String>,
}

/// A priority-ordered DNS policy scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct View {
    pub id: String,
    pub name: String,
    /// 1-based position in the view order; derived from the priority list
    #[serde(default)]
    pub priority: u32,
    /// ACL ids matched by `match-clients`
    #[serde(default)]
    pub acls: Vec<String>,
    #[serde(default)]
    pub dns64: Option<Dns64>,
    /// Key signing dynamic updates for this view
    pub key: TsigKeyData,
}

/// Which rdata column of a zone's records is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ZoneRole {
    #[default]
    Active,
    Backup,
}

/// An authoritative zone inside a view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub id: String,
    /// Origin without trailing dot
    pub name: String,
    pub ttl: u32,
    /// Zone file name; empty marks a forward zone that gets no file or index entry
    #[serde(default)]
    pub zone_file: String,
    pub view_id: String,
    #[serde(default)]
    pub role: ZoneRole,
    /// SOA serial written into generated zone files
    #[serde(default)]
    pub serial: u32,
}

impl Zone {
    /// Forward zones have no zone file and are skipped by zone/index generation
    #[must_use]
    pub fn is_forward(&self) -> bool {
        self.zone_file.trim().is_empty()
    }
}

/// How a forward zone consults its upstreams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ForwardType {
    #[default]
    Only,
    First,
}

impl ForwardType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Only => "only",
            Self::First => "first",
        }
    }
}

/// Zone resolved by forwarding to upstream servers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardZone {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub forward_type: ForwardType,
    pub forwarders: Vec<String>,
    pub view_id: String,
}

/// A single resource record of a zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub id: String,
    /// Owner name relative to the zone (`@` for the apex)
    pub name: String,
    pub rr_type: String,
    pub ttl: u32,
    pub rdata: String,
    /// Rdata served while the owning zone is in the backup role
    #[serde(default)]
    pub rdata_backup: Option<String>,
    pub zone_id: String,
    /// Owning view; always copied from the zone
    #[serde(default)]
    pub view_id: String,
}

impl ResourceRecord {
    /// Rdata selected by the owning zone's role.
    ///
    /// A record without backup rdata keeps serving its primary rdata.
    #[must_use]
    pub fn effective_rdata(&self, role: ZoneRole) -> &str {
        match role {
            ZoneRole::Active => &self.rdata,
            ZoneRole::Backup => self.rdata_backup.as_deref().unwrap_or(&self.rdata),
        }
    }
}

/// Which policy mechanism serves a redirection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RedirectKind {
    /// Answer rewritten through the view's response-policy zone
    LocalZone,
    /// Answer substituted only when the name does not exist
    NxDomain,
}

/// A substituted answer for a query name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redirection {
    pub id: String,
    /// Fully qualified query name (trailing dot optional)
    pub name: String,
    pub ttl: u32,
    pub rr_type: String,
    pub rdata: String,
    pub kind: RedirectKind,
    pub view_id: String,
}

/// Server-wide switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Query logging
    pub log_enabled: bool,
    /// Maximum cache TTL
    pub ttl: u32,
    /// DNSSEC validation
    pub dnssec_enabled: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_enabled: false,
            ttl: DEFAULT_MAX_CACHE_TTL_SECS,
            dnssec_enabled: false,
        }
    }
}

/// Recursion resource limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecursiveConcurrency {
    pub max_clients: u32,
    pub max_fetches_per_zone: u32,
}

impl Default for RecursiveConcurrency {
    fn default() -> Self {
        Self {
            max_clients: DEFAULT_RECURSIVE_CLIENTS,
            max_fetches_per_zone: DEFAULT_FETCHES_PER_ZONE,
        }
    }
}

/// Clients whose traffic is silently dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpBlackHole {
    pub id: String,
    pub acl_id: String,
}

impl_entity!(Acl, "acl");
impl_entity!(View, "view");
impl_entity!(Zone, "zone");
impl_entity!(ForwardZone, "forward zone");
impl_entity!(ResourceRecord, "resource record");
impl_entity!(Redirection, "redirection");
impl_entity!(IpBlackHole, "ip black hole");
