// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Declarative DNS intent and its store.
//!
//! The [`Intent`] aggregate is the in-memory form of one consistent snapshot of the
//! intent store: every table, the singleton settings, and the key/value table the
//! view priority list lives in.

pub mod model;
pub mod priority;
pub mod store;
pub mod table;

pub use model::{
    is_reserved_acl, Acl, Dns64, Entity, ForwardType, ForwardZone, GlobalConfig, IpBlackHole,
    RecursiveConcurrency, RedirectKind, Redirection, ResourceRecord, View, Zone, ZoneRole,
};
pub use priority::{KvTable, PriorityList, PriorityListReader};
pub use store::{FileIntentStore, IntentStore, MemoryIntentStore};
pub use table::Table;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::constants::{ACL_ANY, ACL_NONE};
use crate::errors::{AgentError, Result};

/// One consistent snapshot of the whole intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Intent {
    /// Bumped by every committed transaction
    pub revision: u64,
    pub acls: Table<Acl>,
    pub views: Table<View>,
    pub zones: Table<Zone>,
    pub forward_zones: Table<ForwardZone>,
    pub records: Table<ResourceRecord>,
    pub redirections: Table<Redirection>,
    pub black_holes: Table<IpBlackHole>,
    pub global: GlobalConfig,
    pub recursive: RecursiveConcurrency,
    /// Key/value table backing the view priority list
    pub kv: BTreeMap<String, String>,
}

impl Intent {
    /// Read access to the view priority list.
    #[must_use]
    pub fn priority_list(&self) -> PriorityListReader<'_, BTreeMap<String, String>> {
        PriorityListReader::new(&self.kv)
    }

    /// Mutating access to the view priority list.
    pub fn priority_list_mut(&mut self) -> PriorityList<'_, BTreeMap<String, String>> {
        PriorityList::new(&mut self.kv)
    }

    /// Views in priority order.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the list is corrupt or names a view that no
    /// longer exists.
    pub fn ordered_views(&self) -> Result<Vec<&View>> {
        self.priority_list()
            .order()?
            .iter()
            .map(|id| {
                self.views.get(id).ok_or_else(|| {
                    AgentError::persistence(format!(
                        "priority list references unknown view '{id}'"
                    ))
                })
            })
            .collect()
    }

    /// Rewrite every view's `priority` from its position in the list.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the list is corrupt.
    pub fn renumber_priorities(&mut self) -> Result<()> {
        let order = self.priority_list().order()?;
        for (idx, id) in order.iter().enumerate() {
            let view = self.views.get_required_mut(id)?;
            view.priority = u32::try_from(idx + 1).unwrap_or(u32::MAX);
        }
        Ok(())
    }

    /// ACL name used in generated config for an ACL id.
    ///
    /// # Errors
    ///
    /// Returns not-found if the id names neither a reserved nor a stored ACL.
    pub fn acl_name(&self, acl_id: &str) -> Result<String> {
        if is_reserved_acl(acl_id) {
            return Ok(acl_id.to_string());
        }
        self.acls.get_required(acl_id).map(|acl| acl.name.clone())
    }

    /// Whether the ACL id is referenced by any view, DNS64 entry or black hole.
    #[must_use]
    pub fn acl_in_use(&self, acl_id: &str) -> bool {
        self.views.exists(|view| {
            view.acls.iter().any(|id| id == acl_id)
                || view.dns64.as_ref().is_some_and(|dns64| {
                    dns64.client_acl.as_deref() == Some(acl_id)
                        || dns64.mapped_acl.as_deref() == Some(acl_id)
                })
        }) || self.black_holes.exists(|hole| hole.acl_id == acl_id)
    }

    /// Non-forward zones of a view, ordered by zone name.
    #[must_use]
    pub fn file_zones_in_view(&self, view_id: &str) -> Vec<&Zone> {
        let mut zones = self
            .zones
            .list(|zone| zone.view_id == view_id && !zone.is_forward());
        zones.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        zones
    }

    /// Forward zones of a view, ordered by zone name.
    #[must_use]
    pub fn forward_zones_in_view(&self, view_id: &str) -> Vec<&ForwardZone> {
        let mut zones = self.forward_zones.list(|zone| zone.view_id == view_id);
        zones.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        zones
    }

    /// Records of a zone in a stable render order.
    #[must_use]
    pub fn records_in_zone(&self, zone_id: &str) -> Vec<&ResourceRecord> {
        let mut records = self.records.list(|rr| rr.zone_id == zone_id);
        records.sort_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then_with(|| a.rr_type.cmp(&b.rr_type))
                .then_with(|| a.rdata.cmp(&b.rdata))
                .then_with(|| a.id.cmp(&b.id))
        });
        records
    }

    /// Redirections of one kind in a view, in a stable render order.
    #[must_use]
    pub fn redirections_in_view(&self, view_id: &str, kind: RedirectKind) -> Vec<&Redirection> {
        let mut redirections = self
            .redirections
            .list(|r| r.view_id == view_id && r.kind == kind);
        redirections.sort_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then_with(|| a.rr_type.cmp(&b.rr_type))
                .then_with(|| a.rdata.cmp(&b.rdata))
                .then_with(|| a.id.cmp(&b.id))
        });
        redirections
    }

    /// Whether both reserved ACLs are present.
    #[must_use]
    pub fn has_reserved_acls(&self) -> bool {
        self.acls.get(ACL_ANY).is_some() && self.acls.get(ACL_NONE).is_some()
    }
}
