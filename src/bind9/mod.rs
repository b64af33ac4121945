// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Everything that talks to the local `named` process.
//!
//! - [`control`] issues `rndc` administrative commands
//! - [`update`] applies TSIG-signed dynamic updates (RFC 2136)
//! - [`supervisor`] keeps the process alive
//! - [`rndc`] generates and parses TSIG keys

pub mod control;
pub mod rndc;
pub mod supervisor;
pub mod types;
pub mod update;

pub use control::{ControlChannel, ControlCommand, RndcControl};
pub use rndc::{create_tsig_signer, generate_view_key, key_statement, parse_key_file};
pub use supervisor::{Bootstrap, DaemonLauncher, DaemonState, NamedLauncher, Supervisor};
pub use types::{RndcError, TsigAlgorithm, TsigKeyData, ZoneScope};
pub use update::{HickoryUpdater, RecordUpdate, RecordUpdater, RrSet, UpdateOp};
