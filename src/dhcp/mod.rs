// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! DHCP handler: natural-key edits of the Kea v4 and v6 configuration trees.
//!
//! Each family owns an in-memory snapshot and a reconciler. A mutation edits a
//! copy, pushes it with `config-set` then `config-write`, and swaps the snapshot
//! only after both succeed. On failure the previous snapshot is pushed again.

pub mod client;
pub mod mutations;
pub mod requests;
pub mod types;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::config::DhcpConfig;
use crate::errors::{AgentError, Result};
use crate::reconciler::{Reconciler, SnapshotCell};
use client::{KeaClient, KeaPusher};
use mutations::{
    find_mut, insert, remove, replace, validate_hw_address, validate_pd_pool, validate_pool,
    validate_subnet,
};
use requests::{DeleteClientClass, DeleteInSubnet, DeleteSubnet, InSubnet};
use types::{
    parse_document, ClientClass, Kea4Config, Kea6Config, KeaDocument, PdPool, Pool, Reservation4,
    Reservation6, Subnet4, Subnet6,
};

/// Address family of a Kea daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DhcpFamily {
    V4,
    V6,
}

/// Snapshot, reconciler and pusher of one Kea daemon.
struct Family<T: KeaDocument> {
    reconciler: Reconciler<T, SnapshotCell<T>>,
    pusher: KeaPusher<T>,
}

impl<T: KeaDocument> Family<T> {
    fn new(client: Arc<KeaClient>, path: PathBuf, config: T) -> Self {
        Self {
            reconciler: Reconciler::new(SnapshotCell::new(config)),
            pusher: KeaPusher::new(client, path),
        }
    }

    async fn apply<R, F>(&self, mutate: F) -> Result<R>
    where
        F: FnOnce(&mut T) -> Result<R> + Send,
    {
        self.reconciler.apply(&self.pusher, mutate).await
    }
}

async fn read_document<T: KeaDocument>(path: &Path) -> anyhow::Result<T> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read Kea configuration {}", path.display()))?;
    parse_document(&text)
        .with_context(|| format!("Failed to parse Kea configuration {}", path.display()))
}

fn subnet4(config: &mut Kea4Config, id: u32) -> Result<&mut Subnet4> {
    find_mut(&mut config.dhcp4.subnet4, &id.to_string())
}

fn subnet6(config: &mut Kea6Config, id: u32) -> Result<&mut Subnet6> {
    find_mut(&mut config.dhcp6.subnet6, &id.to_string())
}

/// Applies DHCP mutations to the Kea daemons.
pub struct DhcpHandler {
    client: Arc<KeaClient>,
    v4: Family<Kea4Config>,
    v6: Family<Kea6Config>,
}

impl DhcpHandler {
    pub fn new(
        client: Arc<KeaClient>,
        v4_path: PathBuf,
        v4: Kea4Config,
        v6_path: PathBuf,
        v6: Kea6Config,
    ) -> Self {
        Self {
            v4: Family::new(Arc::clone(&client), v4_path, v4),
            v6: Family::new(Arc::clone(&client), v6_path, v6),
            client,
        }
    }

    /// Build the handler from the on-disk Kea configuration files.
    ///
    /// # Errors
    ///
    /// Returns an error if the control agent URL is invalid or a file cannot be
    /// read or parsed.
    pub async fn load(config: &DhcpConfig) -> anyhow::Result<Self> {
        let client = Arc::new(KeaClient::new(config.control_agent_url()?, config.timeout())?);
        let v4 = read_document::<Kea4Config>(&config.v4_config_path).await?;
        let v6 = read_document::<Kea6Config>(&config.v6_config_path).await?;
        info!(
            subnets4 = v4.dhcp4.subnet4.len(),
            subnets6 = v6.dhcp6.subnet6.len(),
            "Loaded Kea configuration"
        );
        Ok(Self::new(
            client,
            config.v4_config_path.clone(),
            v4,
            config.v6_config_path.clone(),
            v6,
        ))
    }

    /// Committed DHCPv4 configuration
    ///
    /// # Errors
    ///
    /// Never fails for the in-memory snapshot.
    pub async fn v4_config(&self) -> Result<Arc<Kea4Config>> {
        self.v4.reconciler.current().await
    }

    /// Committed DHCPv6 configuration
    ///
    /// # Errors
    ///
    /// Never fails for the in-memory snapshot.
    pub async fn v6_config(&self) -> Result<Arc<Kea6Config>> {
        self.v6.reconciler.current().await
    }

    /// Every statistic reported by one daemon.
    ///
    /// # Errors
    ///
    /// Returns the Kea control-channel error.
    pub async fn statistics(&self, family: DhcpFamily) -> Result<Value> {
        let service = match family {
            DhcpFamily::V4 => Kea4Config::SERVICE,
            DhcpFamily::V6 => Kea6Config::SERVICE,
        };
        self.client.statistics(service).await
    }

    async fn edit_subnet4<R, F>(&self, subnet_id: u32, edit: F) -> Result<R>
    where
        F: FnOnce(&mut Subnet4) -> Result<R> + Send,
    {
        self.v4
            .apply(move |next| edit(subnet4(next, subnet_id)?))
            .await
    }

    async fn edit_subnet6<R, F>(&self, subnet_id: u32, edit: F) -> Result<R>
    where
        F: FnOnce(&mut Subnet6) -> Result<R> + Send,
    {
        self.v6
            .apply(move |next| edit(subnet6(next, subnet_id)?))
            .await
    }

    // DHCPv4 subnets

    /// Add an IPv4 subnet.
    ///
    /// # Errors
    ///
    /// Rejects invalid or duplicate subnets; otherwise returns the push error.
    pub async fn create_subnet4(&self, subnet: Subnet4) -> Result<()> {
        validate_subnet(subnet.id, &subnet.subnet, false)?;
        for pool in &subnet.pools {
            validate_pool(pool, false)?;
        }
        let id = subnet.id;
        self.v4
            .apply(move |next| insert(&mut next.dhcp4.subnet4, subnet))
            .await?;
        info!(subnet_id = id, "Subnet4 created");
        Ok(())
    }

    /// Replace an IPv4 subnet's prefix and settings, keeping its pools and
    /// reservations.
    ///
    /// # Errors
    ///
    /// Returns not-found for an unknown id.
    pub async fn update_subnet4(&self, subnet: Subnet4) -> Result<()> {
        validate_subnet(subnet.id, &subnet.subnet, false)?;
        let id = subnet.id;
        self.edit_subnet4(id, move |current| {
            current.subnet = subnet.subnet;
            current.extra = subnet.extra;
            Ok(())
        })
        .await?;
        info!(subnet_id = id, "Subnet4 updated");
        Ok(())
    }

    /// Remove an IPv4 subnet with everything in it.
    ///
    /// # Errors
    ///
    /// Returns not-found for an unknown id.
    pub async fn delete_subnet4(&self, request: DeleteSubnet) -> Result<()> {
        self.v4
            .apply(|next| remove(&mut next.dhcp4.subnet4, &request.id.to_string()).map(|_| ()))
            .await?;
        info!(subnet_id = request.id, "Subnet4 deleted");
        Ok(())
    }

    // DHCPv4 pools

    /// Add a pool to an IPv4 subnet.
    ///
    /// # Errors
    ///
    /// Rejects malformed or duplicate pools; returns not-found for an unknown
    /// subnet.
    pub async fn create_pool4(&self, request: InSubnet<Pool>) -> Result<()> {
        validate_pool(&request.item, false)?;
        let key = request.item.key();
        self.edit_subnet4(request.subnet_id, move |subnet| {
            insert(&mut subnet.pools, request.item)
        })
        .await?;
        info!(subnet_id = request.subnet_id, pool = %key, "Pool4 created");
        Ok(())
    }

    /// Replace the settings of the pool with the same range.
    ///
    /// # Errors
    ///
    /// Returns not-found for an unknown subnet or range.
    pub async fn update_pool4(&self, request: InSubnet<Pool>) -> Result<()> {
        validate_pool(&request.item, false)?;
        let key = request.item.key();
        self.edit_subnet4(request.subnet_id, move |subnet| {
            replace(&mut subnet.pools, request.item).map(|_| ())
        })
        .await?;
        info!(subnet_id = request.subnet_id, pool = %key, "Pool4 updated");
        Ok(())
    }

    /// Remove the pool whose range matches `request.key`.
    ///
    /// # Errors
    ///
    /// Returns not-found for an unknown subnet or range.
    pub async fn delete_pool4(&self, request: DeleteInSubnet) -> Result<()> {
        self.edit_subnet4(request.subnet_id, |subnet| {
            remove(&mut subnet.pools, &request.key).map(|_| ())
        })
        .await?;
        info!(subnet_id = request.subnet_id, pool = %request.key, "Pool4 deleted");
        Ok(())
    }

    // DHCPv4 reservations

    /// Add a host reservation to an IPv4 subnet.
    ///
    /// # Errors
    ///
    /// Rejects malformed or duplicate hardware addresses; returns not-found for an
    /// unknown subnet.
    pub async fn create_reservation4(&self, request: InSubnet<Reservation4>) -> Result<()> {
        validate_hw_address(&request.item.hw_address)?;
        let hw = request.item.hw_address.clone();
        self.edit_subnet4(request.subnet_id, move |subnet| {
            insert(&mut subnet.reservations, request.item)
        })
        .await?;
        info!(subnet_id = request.subnet_id, hw_address = %hw, "Reservation4 created");
        Ok(())
    }

    /// Replace the reservation with the same hardware address.
    ///
    /// # Errors
    ///
    /// Returns not-found for an unknown subnet or hardware address.
    pub async fn update_reservation4(&self, request: InSubnet<Reservation4>) -> Result<()> {
        validate_hw_address(&request.item.hw_address)?;
        let hw = request.item.hw_address.clone();
        self.edit_subnet4(request.subnet_id, move |subnet| {
            replace(&mut subnet.reservations, request.item).map(|_| ())
        })
        .await?;
        info!(subnet_id = request.subnet_id, hw_address = %hw, "Reservation4 updated");
        Ok(())
    }

    /// Remove the reservation for hardware address `request.key`.
    ///
    /// # Errors
    ///
    /// Returns not-found for an unknown subnet or hardware address.
    pub async fn delete_reservation4(&self, request: DeleteInSubnet) -> Result<()> {
        self.edit_subnet4(request.subnet_id, |subnet| {
            remove(&mut subnet.reservations, &request.key).map(|_| ())
        })
        .await?;
        info!(subnet_id = request.subnet_id, hw_address = %request.key, "Reservation4 deleted");
        Ok(())
    }

    // DHCPv4 client classes

    /// Add a client class.
    ///
    /// # Errors
    ///
    /// Rejects an empty or duplicate name; otherwise returns the push error.
    pub async fn create_client_class4(&self, class: ClientClass) -> Result<()> {
        if class.name.trim().is_empty() {
            return Err(AgentError::validation("client class name must not be empty"));
        }
        let name = class.name.clone();
        self.v4
            .apply(move |next| insert(&mut next.dhcp4.client_classes, class))
            .await?;
        info!(class = %name, "Client class created");
        Ok(())
    }

    /// Replace the client class with the same name.
    ///
    /// # Errors
    ///
    /// Returns not-found for an unknown name.
    pub async fn update_client_class4(&self, class: ClientClass) -> Result<()> {
        let name = class.name.clone();
        self.v4
            .apply(move |next| replace(&mut next.dhcp4.client_classes, class).map(|_| ()))
            .await?;
        info!(class = %name, "Client class updated");
        Ok(())
    }

    /// Remove a client class.
    ///
    /// # Errors
    ///
    /// Returns not-found for an unknown name.
    pub async fn delete_client_class4(&self, request: DeleteClientClass) -> Result<()> {
        self.v4
            .apply(|next| remove(&mut next.dhcp4.client_classes, &request.name).map(|_| ()))
            .await?;
        info!(class = %request.name, "Client class deleted");
        Ok(())
    }

    // DHCPv6 subnets

    /// Add an IPv6 subnet.
    ///
    /// # Errors
    ///
    /// Rejects invalid or duplicate subnets; otherwise returns the push error.
    pub async fn create_subnet6(&self, subnet: Subnet6) -> Result<()> {
        validate_subnet(subnet.id, &subnet.subnet, true)?;
        for pool in &subnet.pools {
            validate_pool(pool, true)?;
        }
        for pool in &subnet.pd_pools {
            validate_pd_pool(pool)?;
        }
        let id = subnet.id;
        self.v6
            .apply(move |next| insert(&mut next.dhcp6.subnet6, subnet))
            .await?;
        info!(subnet_id = id, "Subnet6 created");
        Ok(())
    }

    /// Replace an IPv6 subnet's prefix and settings, keeping its pools and
    /// reservations.
    ///
    /// # Errors
    ///
    /// Returns not-found for an unknown id.
    pub async fn update_subnet6(&self, subnet: Subnet6) -> Result<()> {
        validate_subnet(subnet.id, &subnet.subnet, true)?;
        let id = subnet.id;
        self.edit_subnet6(id, move |current| {
            current.subnet = subnet.subnet;
            current.extra = subnet.extra;
            Ok(())
        })
        .await?;
        info!(subnet_id = id, "Subnet6 updated");
        Ok(())
    }

    /// Remove an IPv6 subnet with everything in it.
    ///
    /// # Errors
    ///
    /// Returns not-found for an unknown id.
    pub async fn delete_subnet6(&self, request: DeleteSubnet) -> Result<()> {
        self.v6
            .apply(|next| remove(&mut next.dhcp6.subnet6, &request.id.to_string()).map(|_| ()))
            .await?;
        info!(subnet_id = request.id, "Subnet6 deleted");
        Ok(())
    }

    // DHCPv6 pools

    /// Add an address pool to an IPv6 subnet.
    ///
    /// # Errors
    ///
    /// Rejects malformed or duplicate pools; returns not-found for an unknown
    /// subnet.
    pub async fn create_pool6(&self, request: InSubnet<Pool>) -> Result<()> {
        validate_pool(&request.item, true)?;
        let key = request.item.key();
        self.edit_subnet6(request.subnet_id, move |subnet| {
            insert(&mut subnet.pools, request.item)
        })
        .await?;
        info!(subnet_id = request.subnet_id, pool = %key, "Pool6 created");
        Ok(())
    }

    /// Replace the settings of the pool with the same range.
    ///
    /// # Errors
    ///
    /// Returns not-found for an unknown subnet or range.
    pub async fn update_pool6(&self, request: InSubnet<Pool>) -> Result<()> {
        validate_pool(&request.item, true)?;
        let key = request.item.key();
        self.edit_subnet6(request.subnet_id, move |subnet| {
            replace(&mut subnet.pools, request.item).map(|_| ())
        })
        .await?;
        info!(subnet_id = request.subnet_id, pool = %key, "Pool6 updated");
        Ok(())
    }

    /// Remove the pool whose range matches `request.key`.
    ///
    /// # Errors
    ///
    /// Returns not-found for an unknown subnet or range.
    pub async fn delete_pool6(&self, request: DeleteInSubnet) -> Result<()> {
        self.edit_subnet6(request.subnet_id, |subnet| {
            remove(&mut subnet.pools, &request.key).map(|_| ())
        })
        .await?;
        info!(subnet_id = request.subnet_id, pool = %request.key, "Pool6 deleted");
        Ok(())
    }

    // DHCPv6 prefix delegation

    /// Add a prefix delegation pool.
    ///
    /// # Errors
    ///
    /// Rejects malformed or duplicate prefixes; returns not-found for an unknown
    /// subnet.
    pub async fn create_pd_pool6(&self, request: InSubnet<PdPool>) -> Result<()> {
        validate_pd_pool(&request.item)?;
        let prefix = request.item.prefix.clone();
        self.edit_subnet6(request.subnet_id, move |subnet| {
            insert(&mut subnet.pd_pools, request.item)
        })
        .await?;
        info!(subnet_id = request.subnet_id, prefix = %prefix, "PD pool created");
        Ok(())
    }

    /// Replace the prefix delegation pool with the same prefix.
    ///
    /// # Errors
    ///
    /// Returns not-found for an unknown subnet or prefix.
    pub async fn update_pd_pool6(&self, request: InSubnet<PdPool>) -> Result<()> {
        validate_pd_pool(&request.item)?;
        let prefix = request.item.prefix.clone();
        self.edit_subnet6(request.subnet_id, move |subnet| {
            replace(&mut subnet.pd_pools, request.item).map(|_| ())
        })
        .await?;
        info!(subnet_id = request.subnet_id, prefix = %prefix, "PD pool updated");
        Ok(())
    }

    /// Remove the prefix delegation pool for prefix `request.key`.
    ///
    /// # Errors
    ///
    /// Returns not-found for an unknown subnet or prefix.
    pub async fn delete_pd_pool6(&self, request: DeleteInSubnet) -> Result<()> {
        self.edit_subnet6(request.subnet_id, |subnet| {
            remove(&mut subnet.pd_pools, &request.key).map(|_| ())
        })
        .await?;
        info!(subnet_id = request.subnet_id, prefix = %request.key, "PD pool deleted");
        Ok(())
    }

    // DHCPv6 reservations

    /// Add a host reservation to an IPv6 subnet.
    ///
    /// # Errors
    ///
    /// Rejects malformed or duplicate hardware addresses; returns not-found for an
    /// unknown subnet.
    pub async fn create_reservation6(&self, request: InSubnet<Reservation6>) -> Result<()> {
        validate_hw_address(&request.item.hw_address)?;
        let hw = request.item.hw_address.clone();
        self.edit_subnet6(request.subnet_id, move |subnet| {
            insert(&mut subnet.reservations, request.item)
        })
        .await?;
        info!(subnet_id = request.subnet_id, hw_address = %hw, "Reservation6 created");
        Ok(())
    }

    /// Replace the reservation with the same hardware address.
    ///
    /// # Errors
    ///
    /// Returns not-found for an unknown subnet or hardware address.
    pub async fn update_reservation6(&self, request: InSubnet<Reservation6>) -> Result<()> {
        validate_hw_address(&request.item.hw_address)?;
        let hw = request.item.hw_address.clone();
        self.edit_subnet6(request.subnet_id, move |subnet| {
            replace(&mut subnet.reservations, request.item).map(|_| ())
        })
        .await?;
        info!(subnet_id = request.subnet_id, hw_address = %hw, "Reservation6 updated");
        Ok(())
    }

    /// Remove the reservation for hardware address `request.key`.
    ///
    /// # Errors
    ///
    /// Returns not-found for an unknown subnet or hardware address.
    pub async fn delete_reservation6(&self, request: DeleteInSubnet) -> Result<()> {
        self.edit_subnet6(request.subnet_id, |subnet| {
            remove(&mut subnet.reservations, &request.key).map(|_| ())
        })
        .await?;
        info!(subnet_id = request.subnet_id, hw_address = %request.key, "Reservation6 deleted");
        Ok(())
    }
}
