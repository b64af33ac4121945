// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Dynamic DNS updates (RFC 2136) against the live daemon.
//!
//! Each update carries exactly one RRset change, is scoped to the owning zone and
//! is signed with the owning view's TSIG key. The key also selects the view: the
//! view's `match-clients` lists its own key first.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use hickory_client::client::{Client, SyncClient};
use hickory_client::op::ResponseCode;
use hickory_client::rr::{rdata, DNSClass, Name, RData, Record};
use hickory_client::udp::UdpClientConnection;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::str::FromStr;
use tracing::{debug, error, info};

use super::rndc::create_tsig_signer;
use super::types::TsigKeyData;
use crate::errors::{AgentError, Channel, Result};

/// Direction of a single RRset change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOp {
    /// Add the RRset (no prerequisite)
    Assert,
    /// Remove exactly this RRset
    Retract,
}

impl UpdateOp {
    /// The operation undoing this one
    #[must_use]
    pub fn inverse(self) -> Self {
        match self {
            Self::Assert => Self::Retract,
            Self::Retract => Self::Assert,
        }
    }
}

impl fmt::Display for UpdateOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Assert => f.write_str("assert"),
            Self::Retract => f.write_str("retract"),
        }
    }
}

/// One RRset in zone-file terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RrSet {
    /// Owner relative to the zone (`@` or empty for the apex, trailing dot for absolute)
    pub name: String,
    pub rr_type: String,
    pub ttl: u32,
    pub rdata: String,
}

/// A signed, zone-scoped RRset change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordUpdate {
    /// Zone origin
    pub zone: String,
    /// View the update is aimed at (for logs; routing is by key)
    pub view: String,
    pub op: UpdateOp,
    pub rrset: RrSet,
    pub key: TsigKeyData,
}

impl RecordUpdate {
    /// The update undoing this one
    #[must_use]
    pub fn inverse(&self) -> Self {
        Self {
            op: self.op.inverse(),
            ..self.clone()
        }
    }
}

/// Applies record updates to a live zone.
#[async_trait]
pub trait RecordUpdater: Send + Sync {
    async fn apply(&self, update: &RecordUpdate) -> Result<()>;
}

/// Resolve a zone-file style name against the zone origin.
///
/// # Errors
///
/// Returns an error if the resulting name is not a valid domain name.
pub fn qualify(name: &str, zone: &str) -> anyhow::Result<Name> {
    let text = if name.is_empty() || name == "@" {
        zone.to_string()
    } else if name.ends_with('.') {
        name.to_string()
    } else {
        format!("{name}.{zone}")
    };
    let mut parsed =
        Name::from_str(&text).with_context(|| format!("Invalid domain name: {text}"))?;
    parsed.set_fqdn(true);
    Ok(parsed)
}

/// Build the wire record for an RRset.
///
/// Names inside rdata (CNAME/NS/PTR/MX/SRV targets) follow zone-file rules: relative
/// to the zone unless they end with a dot.
///
/// # Errors
///
/// Returns an error for unsupported types or malformed rdata.
pub fn build_record(zone: &str, rrset: &RrSet) -> anyhow::Result<Record> {
    let owner = qualify(&rrset.name, zone)?;
    let value = rrset.rdata.trim();
    let rr_type = rrset.rr_type.to_ascii_uppercase();

    let data = match rr_type.as_str() {
        "A" => {
            let ip = Ipv4Addr::from_str(value)
                .with_context(|| format!("Invalid IPv4 address: {value}"))?;
            RData::A(ip.into())
        }
        "AAAA" => {
            let ip = Ipv6Addr::from_str(value)
                .with_context(|| format!("Invalid IPv6 address: {value}"))?;
            RData::AAAA(ip.into())
        }
        "CNAME" => RData::CNAME(rdata::CNAME(qualify(value, zone)?)),
        "NS" => RData::NS(rdata::NS(qualify(value, zone)?)),
        "PTR" => RData::PTR(rdata::PTR(qualify(value, zone)?)),
        "MX" => {
            let mut parts = value.split_whitespace();
            let preference = parts
                .next()
                .context("MX rdata is missing the preference")?
                .parse::<u16>()
                .context("Invalid MX preference")?;
            let exchange = parts.next().context("MX rdata is missing the exchange")?;
            RData::MX(rdata::MX::new(preference, qualify(exchange, zone)?))
        }
        "SRV" => {
            let parts: Vec<&str> = value.split_whitespace().collect();
            let [priority, weight, port, target] = parts.as_slice() else {
                return Err(anyhow!(
                    "SRV rdata must be '<priority> <weight> <port> <target>', got '{value}'"
                ));
            };
            RData::SRV(rdata::SRV::new(
                priority.parse().context("Invalid SRV priority")?,
                weight.parse().context("Invalid SRV weight")?,
                port.parse().context("Invalid SRV port")?,
                qualify(target, zone)?,
            ))
        }
        "TXT" => {
            let text = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value);
            RData::TXT(rdata::TXT::new(vec![text.replace("\\\"", "\"")]))
        }
        other => return Err(anyhow!("Unsupported record type for dynamic update: {other}")),
    };

    let mut record = Record::from_rdata(owner, rrset.ttl, data);
    record.set_dns_class(DNSClass::IN);
    Ok(record)
}

/// Sends signed updates over UDP with hickory's synchronous client.
#[derive(Debug, Clone)]
pub struct HickoryUpdater {
    server: SocketAddr,
}

impl HickoryUpdater {
    #[must_use]
    pub fn new(server: SocketAddr) -> Self {
        Self { server }
    }
}

fn send_update(server: SocketAddr, update: &RecordUpdate) -> anyhow::Result<()> {
    let record = build_record(&update.zone, &update.rrset)?;
    let zone = qualify("@", &update.zone)?;

    let conn = UdpClientConnection::new(server).context("Failed to create UDP connection")?;
    let signer = create_tsig_signer(&update.key)?;
    let client = SyncClient::with_tsigner(conn, signer);

    let response = match update.op {
        UpdateOp::Assert => client.append(record, zone, false),
        UpdateOp::Retract => client.delete_by_rdata(record, zone),
    }
    .with_context(|| {
        format!(
            "Failed to send DNS UPDATE ({}) for {} {}",
            update.op, update.rrset.name, update.rrset.rr_type
        )
    })?;

    match response.response_code() {
        ResponseCode::NoError => Ok(()),
        code => Err(anyhow!("DNS update rejected with response code: {code:?}")),
    }
}

#[async_trait]
impl RecordUpdater for HickoryUpdater {
    async fn apply(&self, update: &RecordUpdate) -> Result<()> {
        let server = self.server;
        let task_update = update.clone();

        debug!(
            op = %update.op,
            zone = %update.zone,
            view = %update.view,
            name = %update.rrset.name,
            rr_type = %update.rrset.rr_type,
            "Sending dynamic update"
        );

        // hickory's sync client blocks on the socket
        let result = tokio::task::spawn_blocking(move || send_update(server, &task_update))
            .await
            .map_err(|e| {
                AgentError::control(Channel::DynamicUpdate, format!("update task failed: {e}"))
            })?;

        match result {
            Ok(()) => {
                info!(
                    op = %update.op,
                    zone = %update.zone,
                    view = %update.view,
                    name = %update.rrset.name,
                    rr_type = %update.rrset.rr_type,
                    rdata = %update.rrset.rdata,
                    "Applied dynamic update"
                );
                Ok(())
            }
            Err(e) => {
                error!(
                    op = %update.op,
                    zone = %update.zone,
                    view = %update.view,
                    error = %e,
                    "Dynamic update failed"
                );
                Err(AgentError::control(Channel::DynamicUpdate, format!("{e:#}")))
            }
        }
    }
}

#[cfg(test)]
#[path = "update_tests.rs"]
mod update_tests;
