// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the agent.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// Reserved Intent Identifiers
// ============================================================================

/// Built-in ACL matching every client
pub const ACL_ANY: &str = "any";

/// Built-in ACL matching no client
pub const ACL_NONE: &str = "none";

/// ACL ids that can never be created, edited or deleted
pub const RESERVED_ACL_IDS: [&str; 2] = [ACL_ANY, ACL_NONE];

/// Id and name of the view seeded on first start
pub const DEFAULT_VIEW: &str = "default";

// ============================================================================
// DNS Protocol Constants
// ============================================================================

/// Standard DNS port for queries and dynamic updates
pub const DNS_PORT: u16 = 53;

/// Standard RNDC control port
pub const RNDC_PORT: u16 = 953;

/// Default TTL for zone files (1 hour)
pub const DEFAULT_ZONE_TTL_SECS: u32 = 3600;

/// Default SOA refresh interval (1 hour)
pub const DEFAULT_SOA_REFRESH_SECS: u32 = 3600;

/// Default SOA retry interval (10 minutes)
pub const DEFAULT_SOA_RETRY_SECS: u32 = 600;

/// Default SOA expire time (7 days)
pub const DEFAULT_SOA_EXPIRE_SECS: u32 = 604_800;

/// Default SOA negative TTL (1 day)
pub const DEFAULT_SOA_NEGATIVE_TTL_SECS: u32 = 86400;

/// TSIG fudge time in seconds (allows for clock skew)
pub const TSIG_FUDGE_TIME_SECS: u64 = 300;

/// Size of generated per-view TSIG secrets (256 bits for HMAC-SHA256)
pub const TSIG_SECRET_BYTES: usize = 32;

// ============================================================================
// Recursion Defaults
// ============================================================================

/// Default `recursive-clients` limit
pub const DEFAULT_RECURSIVE_CLIENTS: u32 = 1000;

/// Default `fetches-per-zone` limit (0 disables the limit)
pub const DEFAULT_FETCHES_PER_ZONE: u32 = 0;

/// Default `max-cache-ttl` applied by the global config
pub const DEFAULT_MAX_CACHE_TTL_SECS: u32 = 3600;

// ============================================================================
// Generated File Layout
// ============================================================================

/// Main configuration file passed to `named -c`
pub const MAIN_CONF_FILENAME: &str = "named.conf";

/// Global options include
pub const OPTIONS_CONF_FILENAME: &str = "options.conf";

/// ACL definitions include
pub const ACL_CONF_FILENAME: &str = "acl.conf";

/// Prefix of the per-view include file (`view_<viewid>.conf`)
pub const VIEW_CONF_PREFIX: &str = "view_";

/// Prefix of the per-view forward-zone index (`forward_<viewid>.conf`)
pub const FORWARD_CONF_PREFIX: &str = "forward_";

/// Prefix of the per-view NXDOMAIN redirect zone data file
pub const REDIRECT_FILE_PREFIX: &str = "redirect_";

/// Prefix of the per-view local-zone (response policy) data file
pub const LOCAL_ZONE_FILE_PREFIX: &str = "rpz_";

/// Suffix of the per-view zone index read by `allow-new-zones`
pub const ZONE_INDEX_SUFFIX: &str = ".nzf";

/// Origin suffix of each view's response-policy zone (`rpz.<view>`)
pub const LOCAL_ZONE_ORIGIN_PREFIX: &str = "rpz";

// ============================================================================
// Process Supervision Constants
// ============================================================================

/// Period of the daemon health check
pub const HEALTH_CHECK_INTERVAL_SECS: u64 = 5;

/// Default `named` pid file
pub const DEFAULT_PID_FILE: &str = "/var/run/named/named.pid";

// ============================================================================
// DHCP Control Agent Constants
// ============================================================================

/// Timeout for each Kea control agent HTTP call
pub const KEA_HTTP_TIMEOUT_SECS: u64 = 10;

/// Kea service name for the DHCPv4 daemon
pub const KEA_SERVICE_DHCP4: &str = "dhcp4";

/// Kea service name for the DHCPv6 daemon
pub const KEA_SERVICE_DHCP6: &str = "dhcp6";

/// Kea result code for success
pub const KEA_RESULT_SUCCESS: i64 = 0;

/// Kea result code for an empty (but successful) answer
pub const KEA_RESULT_EMPTY: i64 = 3;
