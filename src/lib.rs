// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # ddi-agent - node-local DNS/DHCP control-plane agent
//!
//! The agent keeps one BIND9 `named` and one Kea DHCP server converged with a
//! declarative intent. Operations arrive as JSON envelopes, mutate the intent, and are
//! pushed into the live daemons before the intent commits.
//!
//! ## Modules
//!
//! - [`intent`] - the intent aggregate, its store and the view priority list
//! - [`compiler`] - renders intent into `named` configuration and zone files
//! - [`bind9`] - `rndc`, dynamic updates and process supervision
//! - [`reconciler`] - push-then-commit transactions with compensation
//! - [`dns`] - DNS operations
//! - [`dhcp`] - Kea configuration transactions
//! - [`dispatch`] - the local envelope transport
//! - [`config`] - agent configuration
//! - [`errors`] - error taxonomy and transport responses
//!
//! ## Example
//!
//! ```rust,no_run
//! use ddi_agent::dispatch::Envelope;
//!
//! let envelope: Envelope = serde_json::from_str(
//!     r#"{"operation":"delete-zone","request":{"id":"z1"}}"#,
//! )
//! .unwrap();
//! assert_eq!(envelope.operation(), "delete-zone");
//! ```

pub mod bind9;
pub mod compiler;
pub mod config;
pub mod constants;
pub mod dhcp;
pub mod dispatch;
pub mod dns;
pub mod errors;
pub mod intent;
pub mod reconciler;
