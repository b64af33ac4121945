// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Natural-key edits on Kea collections.
//!
//! Lookups scan the collection and compare normalized natural keys. An update or
//! delete that matches nothing is a not-found error; the caller must not push.

use std::net::IpAddr;

use super::types::{
    hw_key, pool_key, ClientClass, PdPool, Pool, Reservation4, Reservation6, Subnet4, Subnet6,
};
use crate::errors::{AgentError, Result};

/// An element of a Kea collection addressed by a natural key.
pub trait NaturalKey {
    /// Kind name used in errors
    const KIND: &'static str;

    /// Normalized key of this element
    fn natural_key(&self) -> String;

    /// Normalize a key supplied by a caller
    fn normalize(key: &str) -> String {
        key.trim().to_string()
    }
}

impl NaturalKey for Subnet4 {
    const KIND: &'static str = "subnet4";

    fn natural_key(&self) -> String {
        self.id.to_string()
    }
}

impl NaturalKey for Subnet6 {
    const KIND: &'static str = "subnet6";

    fn natural_key(&self) -> String {
        self.id.to_string()
    }
}

impl NaturalKey for Pool {
    const KIND: &'static str = "pool";

    fn natural_key(&self) -> String {
        self.key()
    }

    fn normalize(key: &str) -> String {
        pool_key(key)
    }
}

impl NaturalKey for PdPool {
    const KIND: &'static str = "pd-pool";

    fn natural_key(&self) -> String {
        Self::normalize(&self.prefix)
    }

    fn normalize(key: &str) -> String {
        key.trim().to_ascii_lowercase()
    }
}

impl NaturalKey for Reservation4 {
    const KIND: &'static str = "reservation";

    fn natural_key(&self) -> String {
        hw_key(&self.hw_address)
    }

    fn normalize(key: &str) -> String {
        hw_key(key)
    }
}

impl NaturalKey for Reservation6 {
    const KIND: &'static str = "reservation";

    fn natural_key(&self) -> String {
        hw_key(&self.hw_address)
    }

    fn normalize(key: &str) -> String {
        hw_key(key)
    }
}

impl NaturalKey for ClientClass {
    const KIND: &'static str = "client-class";

    fn natural_key(&self) -> String {
        self.name.clone()
    }
}

fn position<T: NaturalKey>(items: &[T], key: &str) -> Option<usize> {
    let key = T::normalize(key);
    items.iter().position(|item| item.natural_key() == key)
}

/// Element matching `key`.
///
/// # Errors
///
/// Returns not-found if nothing matches.
pub fn find_mut<'a, T: NaturalKey>(items: &'a mut [T], key: &str) -> Result<&'a mut T> {
    match position(items, key) {
        Some(idx) => Ok(&mut items[idx]),
        None => Err(AgentError::not_found(T::KIND, key)),
    }
}

/// Append `item`, rejecting a duplicate key.
///
/// # Errors
///
/// Returns a validation error if the key is already present.
pub fn insert<T: NaturalKey>(items: &mut Vec<T>, item: T) -> Result<()> {
    let key = item.natural_key();
    if position(items, &key).is_some() {
        return Err(AgentError::validation(format!(
            "{} '{key}' already exists",
            T::KIND
        )));
    }
    items.push(item);
    Ok(())
}

/// Replace the element with the same key as `item`, keeping its position.
///
/// # Errors
///
/// Returns not-found if nothing matches.
pub fn replace<T: NaturalKey>(items: &mut [T], item: T) -> Result<T> {
    let slot = find_mut(items, &item.natural_key())?;
    Ok(std::mem::replace(slot, item))
}

/// Remove the element matching `key`.
///
/// # Errors
///
/// Returns not-found if nothing matches.
pub fn remove<T: NaturalKey>(items: &mut Vec<T>, key: &str) -> Result<T> {
    match position(items, key) {
        Some(idx) => Ok(items.remove(idx)),
        None => Err(AgentError::not_found(T::KIND, key)),
    }
}

fn parse_ip(text: &str) -> Result<IpAddr> {
    text.trim()
        .parse()
        .map_err(|_| AgentError::validation(format!("'{}' is not an IP address", text.trim())))
}

/// Check a CIDR string and return its address family.
///
/// # Errors
///
/// Returns a validation error for a malformed prefix.
pub fn validate_prefix(cidr: &str) -> Result<IpAddr> {
    let Some((addr, len)) = cidr.trim().split_once('/') else {
        return Err(AgentError::validation(format!("'{cidr}' is not a CIDR prefix")));
    };
    let addr = parse_ip(addr)?;
    let max = if addr.is_ipv4() { 32 } else { 128 };
    match len.parse::<u8>() {
        Ok(len) if len <= max => Ok(addr),
        _ => Err(AgentError::validation(format!(
            "'{cidr}' has an invalid prefix length"
        ))),
    }
}

/// Check a pool string (`first - last` or CIDR) against the expected family.
///
/// # Errors
///
/// Returns a validation error for a malformed or reversed range, or a family
/// mismatch.
pub fn validate_pool(pool: &Pool, ipv6: bool) -> Result<()> {
    let family_ok = |addr: &IpAddr| addr.is_ipv6() == ipv6;
    let key = pool.key();

    if let Some((begin, end)) = key.split_once('-') {
        let (begin, end) = (parse_ip(begin)?, parse_ip(end)?);
        if !family_ok(&begin) || !family_ok(&end) {
            return Err(AgentError::validation(format!(
                "pool '{}' does not match the subnet family",
                pool.pool
            )));
        }
        if begin > end {
            return Err(AgentError::validation(format!(
                "pool '{}' ends before it begins",
                pool.pool
            )));
        }
        return Ok(());
    }

    let addr = validate_prefix(&key)?;
    if !family_ok(&addr) {
        return Err(AgentError::validation(format!(
            "pool '{}' does not match the subnet family",
            pool.pool
        )));
    }
    Ok(())
}

/// Check a subnet id and prefix.
///
/// # Errors
///
/// Returns a validation error for id 0, a malformed prefix or a family mismatch.
pub fn validate_subnet(id: u32, subnet: &str, ipv6: bool) -> Result<()> {
    if id == 0 {
        return Err(AgentError::validation("subnet id 0 is reserved"));
    }
    if validate_prefix(subnet)?.is_ipv6() != ipv6 {
        return Err(AgentError::validation(format!(
            "subnet '{subnet}' does not match the address family"
        )));
    }
    Ok(())
}

/// Check a hardware address of six colon or dash separated octets.
///
/// # Errors
///
/// Returns a validation error for anything else.
pub fn validate_hw_address(hw_address: &str) -> Result<()> {
    let key = hw_key(hw_address);
    let octets: Vec<&str> = key.split(':').collect();
    let valid = octets.len() == 6
        && octets
            .iter()
            .all(|o| o.len() == 2 && o.chars().all(|c| c.is_ascii_hexdigit()));
    if !valid {
        return Err(AgentError::validation(format!(
            "'{hw_address}' is not a hardware address"
        )));
    }
    Ok(())
}

/// Check a prefix delegation pool.
///
/// # Errors
///
/// Returns a validation error for a non-IPv6 prefix or a delegated length
/// shorter than the pool prefix.
pub fn validate_pd_pool(pool: &PdPool) -> Result<()> {
    if !parse_ip(&pool.prefix)?.is_ipv6() {
        return Err(AgentError::validation(format!(
            "pd-pool prefix '{}' is not IPv6",
            pool.prefix
        )));
    }
    if pool.prefix_len > 128 || pool.delegated_len > 128 || pool.delegated_len < pool.prefix_len {
        return Err(AgentError::validation(format!(
            "pd-pool '{}/{}' cannot delegate /{}",
            pool.prefix, pool.prefix_len, pool.delegated_len
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "mutations_tests.rs"]
mod mutations_tests;
