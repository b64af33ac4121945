// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Ordered, id-keyed collection of intent objects.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::model::Entity;
use crate::errors::{AgentError, Result};

/// One table of the intent store.
///
/// Iteration order is the id order, which keeps everything rendered from a table
/// deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Table<T> {
    rows: BTreeMap<String, T>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
        }
    }
}

impl<T: Entity + Clone> Table<T> {
    /// Insert a new row.
    ///
    /// # Errors
    ///
    /// Returns a validation error if a row with the same id exists.
    pub fn insert(&mut self, row: T) -> Result<()> {
        if self.rows.contains_key(row.id()) {
            return Err(AgentError::validation(format!(
                "{} '{}' already exists",
                T::KIND,
                row.id()
            )));
        }
        self.rows.insert(row.id().to_string(), row);
        Ok(())
    }

    /// Replace an existing row, returning the previous value.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if no row has the same id.
    pub fn update(&mut self, row: T) -> Result<T> {
        match self.rows.get_mut(row.id()) {
            Some(slot) => Ok(std::mem::replace(slot, row)),
            None => Err(AgentError::not_found(T::KIND, row.id())),
        }
    }

    /// Delete a row by id, returning it.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if no row has this id.
    pub fn delete(&mut self, id: &str) -> Result<T> {
        self.rows
            .remove(id)
            .ok_or_else(|| AgentError::not_found(T::KIND, id))
    }

    /// Delete every row matching `filter`, returning the removed rows.
    pub fn delete_where<F>(&mut self, mut filter: F) -> Vec<T>
    where
        F: FnMut(&T) -> bool,
    {
        let ids: Vec<String> = self
            .rows
            .values()
            .filter(|row| filter(row))
            .map(|row| row.id().to_string())
            .collect();
        ids.iter().filter_map(|id| self.rows.remove(id)).collect()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&T> {
        self.rows.get(id)
    }

    /// Look up a row that must exist.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if no row has this id.
    pub fn get_required(&self, id: &str) -> Result<&T> {
        self.get(id).ok_or_else(|| AgentError::not_found(T::KIND, id))
    }

    /// Mutable lookup of a row that must exist.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if no row has this id.
    pub fn get_required_mut(&mut self, id: &str) -> Result<&mut T> {
        self.rows
            .get_mut(id)
            .ok_or_else(|| AgentError::not_found(T::KIND, id))
    }

    /// Rows matching `filter`, in id order.
    pub fn list<F>(&self, mut filter: F) -> Vec<&T>
    where
        F: FnMut(&T) -> bool,
    {
        self.rows.values().filter(|row| filter(row)).collect()
    }

    /// Whether any row matches `filter`.
    pub fn exists<F>(&self, filter: F) -> bool
    where
        F: FnMut(&T) -> bool,
    {
        self.rows.values().any(filter)
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.rows.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
