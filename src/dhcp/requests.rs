// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Request payloads of DHCP operations.

use serde::{Deserialize, Serialize};

use super::DhcpFamily;

/// An element addressed inside one subnet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InSubnet<T> {
    pub subnet_id: u32,
    #[serde(flatten)]
    pub item: T,
}

/// Delete the element with natural key `key` from a subnet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteInSubnet {
    pub subnet_id: u32,
    /// Pool `begin-end`, hardware address or delegated prefix
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteSubnet {
    pub id: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteClientClass {
    pub name: String,
}

/// Read the server statistics of one family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetStatistics {
    pub family: DhcpFamily,
}
