// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error taxonomy for the reconciliation core.
//!
//! Every handler failure is classified by how far the operation got before it
//! failed, because that decides what the caller can safely do next:
//!
//! - [`AgentError::Validation`] and [`AgentError::NotFound`] - rejected before any
//!   state was touched
//! - [`AgentError::Persistence`] - the intent store refused the transaction; nothing
//!   external happened
//! - [`AgentError::Artifact`] - rendering or writing a generated file failed
//! - [`AgentError::ControlChannel`] - rndc, dynamic update, Kea HTTP or the daemon
//!   process failed; live daemon state may now differ from intent

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AgentError>;

/// The daemon-facing channel that produced a [`AgentError::ControlChannel`] error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// `rndc` control socket CLI
    Rndc,
    /// RFC 2136 dynamic update over UDP
    DynamicUpdate,
    /// Kea control agent HTTP API
    Kea,
    /// Launching or probing the daemon process
    Process,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Rndc => "rndc",
            Self::DynamicUpdate => "dynamic-update",
            Self::Kea => "kea",
            Self::Process => "process",
        };
        f.write_str(name)
    }
}

/// Errors returned by every handler in the agent.
#[derive(Error, Debug, Clone)]
pub enum AgentError {
    /// Malformed or semantically invalid request.
    ///
    /// Covers duplicate ids, edits to reserved objects and references to objects
    /// still in use.
    #[error("invalid request: {0}")]
    Validation(String),

    /// A natural-key or id lookup missed on update/delete.
    ///
    /// No side effect was performed.
    #[error("{kind} '{key}' not found")]
    NotFound {
        /// Kind of object looked up (e.g. "zone", "pool")
        kind: &'static str,
        /// The key that did not match
        key: String,
    },

    /// The intent store transaction failed; safe to retry at the caller.
    #[error("intent store error: {0}")]
    Persistence(String),

    /// Rendering or writing a generated artifact failed.
    #[error("failed to generate artifact {path}: {reason}")]
    Artifact {
        /// File the compiler or writer was working on
        path: String,
        /// Underlying failure
        reason: String,
    },

    /// The push into the live daemon failed.
    #[error("{channel} control channel failed: {reason}")]
    ControlChannel {
        /// Channel that failed
        channel: Channel,
        /// Underlying failure, including raw daemon output where available
        reason: String,
    },
}

impl AgentError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not-found error for a natural key or id
    pub fn not_found(kind: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            key: key.into(),
        }
    }

    /// Create a persistence error
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Create an artifact error for `path`
    pub fn artifact(path: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::Artifact {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a control-channel error
    pub fn control(channel: Channel, reason: impl fmt::Display) -> Self {
        Self::ControlChannel {
            channel,
            reason: reason.to_string(),
        }
    }

    /// Whether nothing outside the agent was touched when this error was raised.
    ///
    /// Only these errors can be retried by the caller without risking divergence
    /// between intent, on-disk artifacts and the live daemon.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::NotFound { .. } | Self::Persistence(_)
        )
    }

    /// Whether this is a natural-key miss.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Transport-level reply for every handler: a success flag and an error message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// Whether the operation (including the push) succeeded
    pub succeed: bool,
    /// Error text; empty on success
    pub error_message: String,
    /// Payload of read operations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Response {
    /// A successful response
    #[must_use]
    pub fn ok() -> Self {
        Self {
            succeed: true,
            error_message: String::new(),
            data: None,
        }
    }

    /// A successful response carrying `data`
    #[must_use]
    pub fn with_data(data: serde_json::Value) -> Self {
        Self {
            data: Some(data),
            ..Self::ok()
        }
    }

    /// A failed response carrying `message`
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            succeed: false,
            error_message: message.into(),
            data: None,
        }
    }
}

impl<T> From<Result<T>> for Response {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(_) => Self::ok(),
            Err(e) => Self::failed(e.to_string()),
        }
    }
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
