// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! View priority list persisted as a singly linked list in a key/value table.
//!
//! # Layout
//!
//! ```text
//! viewpriority:head        -> "v2"
//! viewpriority:node:v2     -> "default"
//! viewpriority:node:default-> "v1"
//! viewpriority:node:v1     -> ""        (tail)
//! ```
//!
//! The sentinel entry holds the head pointer; every view entry holds the id of its
//! successor. Order is rebuilt on every read by walking from the sentinel.
//!
//! # Concurrency
//!
//! The list has no locking of its own. It only ever operates on the key/value table
//! of an intent transaction, and intent transactions are serialized by the DNS
//! reconciler, so a `move_to` (unlink + insert) is atomic with respect to every
//! other list mutation.

use std::collections::{BTreeMap, HashSet};

use crate::errors::{AgentError, Result};

/// Key of the sentinel entry holding the head pointer.
pub const HEAD_KEY: &str = "viewpriority:head";

const NODE_KEY_PREFIX: &str = "viewpriority:node:";

/// Key of the entry holding `view_id`'s successor pointer.
#[must_use]
pub fn node_key(view_id: &str) -> String {
    format!("{NODE_KEY_PREFIX}{view_id}")
}

/// Flat key/value storage the list is persisted in.
pub trait KvTable {
    fn get(&self, key: &str) -> Option<&str>;
    fn put(&mut self, key: &str, value: &str);
    fn remove(&mut self, key: &str) -> Option<String>;

    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

impl KvTable for BTreeMap<String, String> {
    fn get(&self, key: &str) -> Option<&str> {
        BTreeMap::get(self, key).map(String::as_str)
    }

    fn put(&mut self, key: &str, value: &str) {
        self.insert(key.to_string(), value.to_string());
    }

    fn remove(&mut self, key: &str) -> Option<String> {
        BTreeMap::remove(self, key)
    }
}

/// Read access to the priority list.
pub struct PriorityListReader<'a, K: KvTable + ?Sized> {
    kv: &'a K,
}

impl<'a, K: KvTable + ?Sized> PriorityListReader<'a, K> {
    pub fn new(kv: &'a K) -> Self {
        Self { kv }
    }

    /// View ids from head to tail.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if a pointer dangles or the list contains a cycle.
    pub fn order(&self) -> Result<Vec<String>> {
        walk(self.kv)
    }

    /// 1-based position of `view_id`, if present.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the list is corrupt.
    pub fn position_of(&self, view_id: &str) -> Result<Option<usize>> {
        Ok(self
            .order()?
            .iter()
            .position(|id| id == view_id)
            .map(|idx| idx + 1))
    }
}

/// Mutating access to the priority list.
pub struct PriorityList<'a, K: KvTable + ?Sized> {
    kv: &'a mut K,
}

impl<'a, K: KvTable + ?Sized> PriorityList<'a, K> {
    pub fn new(kv: &'a mut K) -> Self {
        Self { kv }
    }

    /// View ids from head to tail.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if a pointer dangles or the list contains a cycle.
    pub fn order(&self) -> Result<Vec<String>> {
        walk(&*self.kv)
    }

    /// Number of linked views.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the list is corrupt.
    pub fn len(&self) -> Result<usize> {
        Ok(self.order()?.len())
    }

    /// Whether no view is linked.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the list is corrupt.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Link `view_id` so that it ends up at `position` (1-based).
    ///
    /// `position` is clamped to `[1, len + 1]`. A new node must not own an entry
    /// yet; a re-inserted node (the second half of a move) must still own one.
    ///
    /// Returns the position actually used.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a duplicate new node, not-found for a missing
    /// re-inserted node, and a persistence error if the list is corrupt.
    pub fn insert(&mut self, position: usize, view_id: &str, is_new_node: bool) -> Result<usize> {
        let key = node_key(view_id);
        if is_new_node && self.kv.contains(&key) {
            return Err(AgentError::validation(format!(
                "view '{view_id}' is already in the priority list"
            )));
        }
        if !is_new_node && !self.kv.contains(&key) {
            return Err(AgentError::not_found("view", view_id));
        }

        let len = self.len()?;
        let position = position.clamp(1, len + 1);

        if position == 1 {
            let old_head = self.head().unwrap_or_default();
            self.kv.put(&key, &old_head);
            self.kv.put(HEAD_KEY, view_id);
            return Ok(position);
        }

        // Walk position-2 hops from the head to reach the node at position-1.
        let mut predecessor = self
            .head()
            .ok_or_else(|| AgentError::persistence("priority list head is missing"))?;
        for _ in 0..position - 2 {
            predecessor = self.next_of(&predecessor)?.ok_or_else(|| {
                AgentError::persistence(format!(
                    "priority list ended before position {}",
                    position - 1
                ))
            })?;
        }

        let successor = self.next_of(&predecessor)?.unwrap_or_default();
        self.kv.put(&key, &successor);
        self.kv.put(&node_key(&predecessor), view_id);
        Ok(position)
    }

    /// Unlink `view_id` and delete its entry.
    ///
    /// Returns `false` without touching anything when the view is not linked.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the list is corrupt.
    pub fn remove(&mut self, view_id: &str) -> Result<bool> {
        if !self.unlink(view_id)? {
            return Ok(false);
        }
        self.kv.remove(&node_key(view_id));
        Ok(true)
    }

    /// Move `view_id` to `position` (clamped), returning the position used.
    ///
    /// # Errors
    ///
    /// Returns not-found if the view is not linked, or a persistence error if the
    /// list is corrupt.
    pub fn move_to(&mut self, position: usize, view_id: &str) -> Result<usize> {
        if !self.unlink(view_id)? {
            return Err(AgentError::not_found("view", view_id));
        }
        self.insert(position, view_id, false)
    }

    /// Detach `view_id` from its predecessor, keeping its own entry.
    fn unlink(&mut self, view_id: &str) -> Result<bool> {
        let Some(head) = self.head() else {
            return Ok(false);
        };

        if head == view_id {
            let next = self.next_of(view_id)?.unwrap_or_default();
            if next.is_empty() {
                self.kv.remove(HEAD_KEY);
            } else {
                self.kv.put(HEAD_KEY, &next);
            }
            return Ok(true);
        }

        let mut visited = HashSet::new();
        let mut current = head;
        while let Some(next) = self.next_of(&current)? {
            if !visited.insert(current.clone()) {
                return Err(AgentError::persistence("priority list contains a cycle"));
            }
            if next == view_id {
                let after = self.next_of(view_id)?.unwrap_or_default();
                self.kv.put(&node_key(&current), &after);
                return Ok(true);
            }
            current = next;
        }
        Ok(false)
    }

    fn head(&self) -> Option<String> {
        head_of(&*self.kv)
    }

    fn next_of(&self, view_id: &str) -> Result<Option<String>> {
        next_of(&*self.kv, view_id)
    }
}

fn head_of<K: KvTable + ?Sized>(kv: &K) -> Option<String> {
    kv.get(HEAD_KEY)
        .filter(|head| !head.is_empty())
        .map(str::to_string)
}

fn next_of<K: KvTable + ?Sized>(kv: &K, view_id: &str) -> Result<Option<String>> {
    let next = kv.get(&node_key(view_id)).ok_or_else(|| {
        AgentError::persistence(format!("priority list entry for '{view_id}' is missing"))
    })?;
    Ok(if next.is_empty() {
        None
    } else {
        Some(next.to_string())
    })
}

fn walk<K: KvTable + ?Sized>(kv: &K) -> Result<Vec<String>> {
    let mut order = Vec::new();
    let mut visited = HashSet::new();
    let mut cursor = head_of(kv);
    while let Some(id) = cursor {
        if !visited.insert(id.clone()) {
            return Err(AgentError::persistence(format!(
                "priority list contains a cycle at '{id}'"
            )));
        }
        cursor = next_of(kv, &id)?;
        order.push(id);
    }
    Ok(order)
}

#[cfg(test)]
#[path = "priority_tests.rs"]
mod priority_tests;
