// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Local transport: decodes operation envelopes and routes them to the handlers.
//!
//! An envelope names the operation and carries its request:
//!
//! ```json
//! {"operation": "create-acl", "request": {"id": "lan", "name": "lan", "ips": ["10.0.0.0/8"]}}
//! ```
//!
//! Every envelope produces exactly one [`Response`]. [`Dispatcher::serve`] runs the
//! newline-delimited form of this protocol over any byte stream.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use crate::dhcp::requests::{
    DeleteClientClass, DeleteInSubnet, DeleteSubnet, GetStatistics, InSubnet,
};
use crate::dhcp::types::{
    ClientClass, PdPool, Pool, Reservation4, Reservation6, Subnet4, Subnet6,
};
use crate::dhcp::DhcpHandler;
use crate::dns::requests::{
    CreateView, CreateZone, DeleteById, SwitchZoneRole, UpdateView, UpdateZoneTtl,
};
use crate::dns::DnsHandler;
use crate::errors::{AgentError, Response, Result};
use crate::intent::{
    Acl, ForwardZone, GlobalConfig, IpBlackHole, RecursiveConcurrency, Redirection,
    ResourceRecord,
};

/// One operation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", content = "request", rename_all = "kebab-case")]
pub enum Envelope {
    CreateAcl(Acl),
    UpdateAcl(Acl),
    DeleteAcl(DeleteById),
    CreateView(CreateView),
    UpdateView(UpdateView),
    DeleteView(DeleteById),
    CreateZone(CreateZone),
    UpdateZoneTtl(UpdateZoneTtl),
    SwitchZoneRole(SwitchZoneRole),
    DeleteZone(DeleteById),
    CreateForwardZone(ForwardZone),
    UpdateForwardZone(ForwardZone),
    DeleteForwardZone(DeleteById),
    CreateRecord(ResourceRecord),
    UpdateRecord(ResourceRecord),
    DeleteRecord(DeleteById),
    CreateRedirection(Redirection),
    UpdateRedirection(Redirection),
    DeleteRedirection(DeleteById),
    UpdateGlobalConfig(GlobalConfig),
    UpdateRecursiveConcurrency(RecursiveConcurrency),
    CreateBlackHole(IpBlackHole),
    DeleteBlackHole(DeleteById),
    /// Regenerate everything and force a `reconfig`
    ReconfigureAll,

    CreateSubnet4(Subnet4),
    UpdateSubnet4(Subnet4),
    DeleteSubnet4(DeleteSubnet),
    CreatePool4(InSubnet<Pool>),
    UpdatePool4(InSubnet<Pool>),
    DeletePool4(DeleteInSubnet),
    CreateReservation4(InSubnet<Reservation4>),
    UpdateReservation4(InSubnet<Reservation4>),
    DeleteReservation4(DeleteInSubnet),
    CreateClientClass4(ClientClass),
    UpdateClientClass4(ClientClass),
    DeleteClientClass4(DeleteClientClass),
    CreateSubnet6(Subnet6),
    UpdateSubnet6(Subnet6),
    DeleteSubnet6(DeleteSubnet),
    CreatePool6(InSubnet<Pool>),
    UpdatePool6(InSubnet<Pool>),
    DeletePool6(DeleteInSubnet),
    CreatePdPool6(InSubnet<PdPool>),
    UpdatePdPool6(InSubnet<PdPool>),
    DeletePdPool6(DeleteInSubnet),
    CreateReservation6(InSubnet<Reservation6>),
    UpdateReservation6(InSubnet<Reservation6>),
    DeleteReservation6(DeleteInSubnet),
    GetStatistics(GetStatistics),
}

impl Envelope {
    /// Wire name of the operation
    #[must_use]
    pub fn operation(&self) -> &'static str {
        match self {
            Self::CreateAcl(_) => "create-acl",
            Self::UpdateAcl(_) => "update-acl",
            Self::DeleteAcl(_) => "delete-acl",
            Self::CreateView(_) => "create-view",
            Self::UpdateView(_) => "update-view",
            Self::DeleteView(_) => "delete-view",
            Self::CreateZone(_) => "create-zone",
            Self::UpdateZoneTtl(_) => "update-zone-ttl",
            Self::SwitchZoneRole(_) => "switch-zone-role",
            Self::DeleteZone(_) => "delete-zone",
            Self::CreateForwardZone(_) => "create-forward-zone",
            Self::UpdateForwardZone(_) => "update-forward-zone",
            Self::DeleteForwardZone(_) => "delete-forward-zone",
            Self::CreateRecord(_) => "create-record",
            Self::UpdateRecord(_) => "update-record",
            Self::DeleteRecord(_) => "delete-record",
            Self::CreateRedirection(_) => "create-redirection",
            Self::UpdateRedirection(_) => "update-redirection",
            Self::DeleteRedirection(_) => "delete-redirection",
            Self::UpdateGlobalConfig(_) => "update-global-config",
            Self::UpdateRecursiveConcurrency(_) => "update-recursive-concurrency",
            Self::CreateBlackHole(_) => "create-black-hole",
            Self::DeleteBlackHole(_) => "delete-black-hole",
            Self::ReconfigureAll => "reconfigure-all",
            Self::CreateSubnet4(_) => "create-subnet4",
            Self::UpdateSubnet4(_) => "update-subnet4",
            Self::DeleteSubnet4(_) => "delete-subnet4",
            Self::CreatePool4(_) => "create-pool4",
            Self::UpdatePool4(_) => "update-pool4",
            Self::DeletePool4(_) => "delete-pool4",
            Self::CreateReservation4(_) => "create-reservation4",
            Self::UpdateReservation4(_) => "update-reservation4",
            Self::DeleteReservation4(_) => "delete-reservation4",
            Self::CreateClientClass4(_) => "create-client-class4",
            Self::UpdateClientClass4(_) => "update-client-class4",
            Self::DeleteClientClass4(_) => "delete-client-class4",
            Self::CreateSubnet6(_) => "create-subnet6",
            Self::UpdateSubnet6(_) => "update-subnet6",
            Self::DeleteSubnet6(_) => "delete-subnet6",
            Self::CreatePool6(_) => "create-pool6",
            Self::UpdatePool6(_) => "update-pool6",
            Self::DeletePool6(_) => "delete-pool6",
            Self::CreatePdPool6(_) => "create-pd-pool6",
            Self::UpdatePdPool6(_) => "update-pd-pool6",
            Self::DeletePdPool6(_) => "delete-pd-pool6",
            Self::CreateReservation6(_) => "create-reservation6",
            Self::UpdateReservation6(_) => "update-reservation6",
            Self::DeleteReservation6(_) => "delete-reservation6",
            Self::GetStatistics(_) => "get-statistics",
        }
    }
}

/// Routes envelopes to whichever handlers this node runs.
#[derive(Clone, Default)]
pub struct Dispatcher {
    dns: Option<Arc<DnsHandler>>,
    dhcp: Option<Arc<DhcpHandler>>,
}

impl Dispatcher {
    #[must_use]
    pub fn new(dns: Option<Arc<DnsHandler>>, dhcp: Option<Arc<DhcpHandler>>) -> Self {
        Self { dns, dhcp }
    }

    fn dns(&self) -> Result<&DnsHandler> {
        self.dns
            .as_deref()
            .ok_or_else(|| AgentError::validation("DNS is not enabled on this agent"))
    }

    fn dhcp(&self) -> Result<&DhcpHandler> {
        self.dhcp
            .as_deref()
            .ok_or_else(|| AgentError::validation("DHCP is not enabled on this agent"))
    }

    /// Decode one JSON envelope and run it.
    pub async fn dispatch_line(&self, line: &str) -> Response {
        match serde_json::from_str::<Envelope>(line) {
            Ok(envelope) => self.dispatch(envelope).await,
            Err(e) => {
                warn!(error = %e, "Rejected malformed envelope");
                Response::failed(format!("invalid request: {e}"))
            }
        }
    }

    /// Answer every envelope line of `reader` with one response line on `writer`.
    ///
    /// Blank lines are ignored. Returns the number of envelopes answered once
    /// `reader` reaches end of file.
    ///
    /// # Errors
    ///
    /// Returns an error if reading or writing the stream fails.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> anyhow::Result<usize>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = BufReader::new(reader).lines();
        let mut answered = 0;
        while let Some(line) = lines.next_line().await.context("Failed to read envelope")? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let response = self.dispatch_line(line).await;
            let mut encoded =
                serde_json::to_string(&response).context("Failed to encode response")?;
            encoded.push('\n');
            writer
                .write_all(encoded.as_bytes())
                .await
                .context("Failed to write response")?;
            writer.flush().await.context("Failed to flush response")?;
            answered += 1;
        }
        info!(answered, "Envelope stream closed");
        Ok(answered)
    }

    /// Run one operation.
    pub async fn dispatch(&self, envelope: Envelope) -> Response {
        let operation = envelope.operation();
        debug!(operation, "Dispatching");
        match self.route(envelope).await {
            Ok(Some(data)) => Response::with_data(data),
            Ok(None) => Response::ok(),
            Err(e) => {
                warn!(operation, error = %e, recoverable = e.is_recoverable(), "Operation failed");
                Response::failed(e.to_string())
            }
        }
    }

    #[allow(clippy::too_many_lines)]
    async fn route(&self, envelope: Envelope) -> Result<Option<Value>> {
        match envelope {
            Envelope::CreateAcl(acl) => self.dns()?.create_acl(acl).await?,
            Envelope::UpdateAcl(acl) => self.dns()?.update_acl(acl).await?,
            Envelope::DeleteAcl(r) => self.dns()?.delete_acl(&r.id).await?,
            Envelope::CreateView(r) => self.dns()?.create_view(r).await?,
            Envelope::UpdateView(r) => self.dns()?.update_view(r).await?,
            Envelope::DeleteView(r) => self.dns()?.delete_view(&r.id).await?,
            Envelope::CreateZone(r) => self.dns()?.create_zone(r).await?,
            Envelope::UpdateZoneTtl(r) => self.dns()?.update_zone_ttl(r).await?,
            Envelope::SwitchZoneRole(r) => {
                let updates = self.dns()?.switch_zone_role(r).await?;
                return Ok(Some(json!({ "updates": updates })));
            }
            Envelope::DeleteZone(r) => self.dns()?.delete_zone(&r.id).await?,
            Envelope::CreateForwardZone(zone) => self.dns()?.create_forward_zone(zone).await?,
            Envelope::UpdateForwardZone(zone) => self.dns()?.update_forward_zone(zone).await?,
            Envelope::DeleteForwardZone(r) => self.dns()?.delete_forward_zone(&r.id).await?,
            Envelope::CreateRecord(record) => self.dns()?.create_record(record).await?,
            Envelope::UpdateRecord(record) => self.dns()?.update_record(record).await?,
            Envelope::DeleteRecord(r) => self.dns()?.delete_record(&r.id).await?,
            Envelope::CreateRedirection(r) => self.dns()?.create_redirection(r).await?,
            Envelope::UpdateRedirection(r) => self.dns()?.update_redirection(r).await?,
            Envelope::DeleteRedirection(r) => self.dns()?.delete_redirection(&r.id).await?,
            Envelope::UpdateGlobalConfig(global) => {
                self.dns()?.update_global_config(global).await?;
            }
            Envelope::UpdateRecursiveConcurrency(recursive) => {
                self.dns()?.update_recursive_concurrency(recursive).await?;
            }
            Envelope::CreateBlackHole(hole) => self.dns()?.create_black_hole(hole).await?,
            Envelope::DeleteBlackHole(r) => self.dns()?.delete_black_hole(&r.id).await?,
            Envelope::ReconfigureAll => self.dns()?.reconfigure_all().await?,

            Envelope::CreateSubnet4(subnet) => self.dhcp()?.create_subnet4(subnet).await?,
            Envelope::UpdateSubnet4(subnet) => self.dhcp()?.update_subnet4(subnet).await?,
            Envelope::DeleteSubnet4(r) => self.dhcp()?.delete_subnet4(r).await?,
            Envelope::CreatePool4(r) => self.dhcp()?.create_pool4(r).await?,
            Envelope::UpdatePool4(r) => self.dhcp()?.update_pool4(r).await?,
            Envelope::DeletePool4(r) => self.dhcp()?.delete_pool4(r).await?,
            Envelope::CreateReservation4(r) => self.dhcp()?.create_reservation4(r).await?,
            Envelope::UpdateReservation4(r) => self.dhcp()?.update_reservation4(r).await?,
            Envelope::DeleteReservation4(r) => self.dhcp()?.delete_reservation4(r).await?,
            Envelope::CreateClientClass4(class) => {
                self.dhcp()?.create_client_class4(class).await?;
            }
            Envelope::UpdateClientClass4(class) => {
                self.dhcp()?.update_client_class4(class).await?;
            }
            Envelope::DeleteClientClass4(r) => self.dhcp()?.delete_client_class4(r).await?,
            Envelope::CreateSubnet6(subnet) => self.dhcp()?.create_subnet6(subnet).await?,
            Envelope::UpdateSubnet6(subnet) => self.dhcp()?.update_subnet6(subnet).await?,
            Envelope::DeleteSubnet6(r) => self.dhcp()?.delete_subnet6(r).await?,
            Envelope::CreatePool6(r) => self.dhcp()?.create_pool6(r).await?,
            Envelope::UpdatePool6(r) => self.dhcp()?.update_pool6(r).await?,
            Envelope::DeletePool6(r) => self.dhcp()?.delete_pool6(r).await?,
            Envelope::CreatePdPool6(r) => self.dhcp()?.create_pd_pool6(r).await?,
            Envelope::UpdatePdPool6(r) => self.dhcp()?.update_pd_pool6(r).await?,
            Envelope::DeletePdPool6(r) => self.dhcp()?.delete_pd_pool6(r).await?,
            Envelope::CreateReservation6(r) => self.dhcp()?.create_reservation6(r).await?,
            Envelope::UpdateReservation6(r) => self.dhcp()?.update_reservation6(r).await?,
            Envelope::DeleteReservation6(r) => self.dhcp()?.delete_reservation6(r).await?,
            Envelope::GetStatistics(r) => {
                return Ok(Some(self.dhcp()?.statistics(r.family).await?));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod dispatch_tests;
