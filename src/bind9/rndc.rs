// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! TSIG key generation and management functions.
//!
//! Every view owns a symmetric key. The key is written into `named.conf`, used in
//! the view's `match-clients` so signed traffic lands in the right view, and used
//! to sign dynamic updates aimed at that view.

use super::types::{TsigAlgorithm, TsigKeyData};
use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hickory_client::rr::rdata::tsig::TsigAlgorithm as HickoryTsigAlgorithm;
use hickory_client::rr::Name;
use hickory_proto::rr::dnssec::tsig::TSigner;
use rand::Rng;
use std::str::FromStr;

use crate::constants::{TSIG_FUDGE_TIME_SECS, TSIG_SECRET_BYTES};

/// Generate a new HMAC-SHA256 key for `view_name`.
///
/// Returns a base64-encoded 256-bit secret; the key name is the view name.
#[must_use]
pub fn generate_view_key(view_name: &str) -> TsigKeyData {
    let mut rng = rand::thread_rng();
    let mut key_bytes = [0u8; TSIG_SECRET_BYTES];
    rng.fill(&mut key_bytes);

    TsigKeyData {
        name: view_name.to_string(),
        algorithm: TsigAlgorithm::HmacSha256,
        secret: BASE64.encode(key_bytes),
    }
}

/// Render a `key` statement for `named.conf`.
#[must_use]
pub fn key_statement(key_data: &TsigKeyData) -> String {
    format!(
        "key \"{}\" {{\n    algorithm {};\n    secret \"{}\";\n}};\n",
        key_data.name,
        key_data.algorithm.as_str(),
        key_data.secret
    )
}

/// Parse a BIND9 key file to extract key metadata.
///
/// Expected format:
/// ```text
/// key "key-name" {
///     algorithm hmac-sha256;
///     secret "base64secret==";
/// };
/// ```
///
/// # Errors
///
/// Returns an error if the file format is invalid or required fields are missing.
pub fn parse_key_file(content: &str) -> Result<TsigKeyData> {
    let name = content
        .lines()
        .find(|line| line.trim_start().starts_with("key"))
        .and_then(|line| line.split('"').nth(1))
        .context("Failed to parse key name from key file")?
        .to_string();

    let algorithm_str = content
        .lines()
        .find(|line| line.contains("algorithm"))
        .and_then(|line| {
            line.split_whitespace()
                .nth(1)
                .map(|s| s.trim_end_matches(';'))
        })
        .context("Failed to parse algorithm from key file")?;
    let algorithm = TsigAlgorithm::from_str(algorithm_str)?;

    let secret = content
        .lines()
        .find(|line| line.contains("secret"))
        .and_then(|line| line.split('"').nth(1))
        .context("Failed to parse secret from key file")?
        .to_string();

    Ok(TsigKeyData {
        name,
        algorithm,
        secret,
    })
}

/// Create a TSIG signer from key data.
///
/// # Errors
///
/// Returns an error if the algorithm is unsupported or key data is invalid.
pub fn create_tsig_signer(key_data: &TsigKeyData) -> Result<TSigner> {
    let algorithm = match key_data.algorithm {
        TsigAlgorithm::HmacMd5 => HickoryTsigAlgorithm::HmacMd5,
        TsigAlgorithm::HmacSha1 => HickoryTsigAlgorithm::HmacSha1,
        TsigAlgorithm::HmacSha224 => HickoryTsigAlgorithm::HmacSha224,
        TsigAlgorithm::HmacSha256 => HickoryTsigAlgorithm::HmacSha256,
        TsigAlgorithm::HmacSha384 => HickoryTsigAlgorithm::HmacSha384,
        TsigAlgorithm::HmacSha512 => HickoryTsigAlgorithm::HmacSha512,
    };

    let key_bytes = BASE64
        .decode(&key_data.secret)
        .context("Failed to decode TSIG key")?;

    let signer = TSigner::new(
        key_bytes,
        algorithm,
        Name::from_str(&key_data.name).context("Invalid TSIG key name")?,
        u16::try_from(TSIG_FUDGE_TIME_SECS).unwrap_or(300),
    )
    .context("Failed to create TSIG signer")?;

    Ok(signer)
}

#[cfg(test)]
#[path = "rndc_tests.rs"]
mod rndc_tests;
