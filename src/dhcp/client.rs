// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kea control agent client.
//!
//! Every call is a single `POST` of a command envelope:
//!
//! ```json
//! { "command": "config-set", "service": ["dhcp4"], "arguments": { "Dhcp4": { ... } } }
//! ```
//!
//! The agent answers with one result object per service. Result `0` is success,
//! `3` means the command succeeded with nothing to return; anything else is a
//! failure reported by the daemon.

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::marker::PhantomData;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};
use url::Url;

use super::types::KeaDocument;
use crate::constants::{KEA_RESULT_EMPTY, KEA_RESULT_SUCCESS};
use crate::errors::{AgentError, Channel, Result};
use crate::reconciler::Pusher;

/// Command envelope sent to the control agent.
#[derive(Debug, Serialize)]
struct KeaCommand<'a> {
    command: &'a str,
    service: [&'a str; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    arguments: Option<Value>,
}

/// One per-service answer of the control agent.
#[derive(Debug, Clone, Deserialize)]
pub struct KeaResponse {
    pub result: i64,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub arguments: Option<Value>,
}

/// HTTP client for the Kea control agent.
#[derive(Debug, Clone)]
pub struct KeaClient {
    http: HttpClient,
    url: Url,
}

impl KeaClient {
    /// Client for the control agent at `url`, with a per-request `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(url: Url, timeout: Duration) -> anyhow::Result<Self> {
        let http = HttpClient::builder().timeout(timeout).build()?;
        Ok(Self { http, url })
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Send `command` to `service`, returning the answer's arguments.
    ///
    /// # Errors
    ///
    /// Returns a Kea control-channel error on transport failure, a non-2xx status,
    /// an unreadable answer or a non-success result code.
    pub async fn execute(
        &self,
        command: &str,
        service: &str,
        arguments: Option<Value>,
    ) -> Result<Option<Value>> {
        let envelope = KeaCommand {
            command,
            service: [service],
            arguments,
        };
        debug!(command = %command, service = %service, url = %self.url, "Sending Kea command");

        let response = self
            .http
            .post(self.url.clone())
            .json(&envelope)
            .send()
            .await
            .map_err(|e| kea_error(command, format!("failed to reach control agent: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(command = %command, status = %status, body = %body, "Kea command rejected");
            return Err(kea_error(command, format!("HTTP {status}: {body}")));
        }

        let answers: Vec<KeaResponse> = response
            .json()
            .await
            .map_err(|e| kea_error(command, format!("unreadable answer: {e}")))?;
        let answer = answers
            .into_iter()
            .next()
            .ok_or_else(|| kea_error(command, "empty answer"))?;

        if answer.result != KEA_RESULT_SUCCESS && answer.result != KEA_RESULT_EMPTY {
            let text = answer.text.unwrap_or_default();
            error!(command = %command, result = answer.result, text = %text, "Kea command failed");
            return Err(kea_error(
                command,
                format!("result {}: {text}", answer.result),
            ));
        }
        Ok(answer.arguments)
    }

    /// Load `config` into the daemon's memory.
    ///
    /// # Errors
    ///
    /// See [`Self::execute`].
    pub async fn config_set<T: KeaDocument>(&self, config: &T) -> Result<()> {
        let arguments = serde_json::to_value(config)
            .map_err(|e| kea_error("config-set", format!("cannot serialize config: {e}")))?;
        self.execute("config-set", T::SERVICE, Some(arguments))
            .await
            .map(|_| ())
    }

    /// Persist the running configuration of `service` to `filename`.
    ///
    /// # Errors
    ///
    /// See [`Self::execute`].
    pub async fn config_write(&self, service: &str, filename: &str) -> Result<()> {
        self.execute("config-write", service, Some(json!({ "filename": filename })))
            .await
            .map(|_| ())
    }

    /// Every statistic of `service`.
    ///
    /// # Errors
    ///
    /// See [`Self::execute`].
    pub async fn statistics(&self, service: &str) -> Result<Value> {
        Ok(self
            .execute("statistic-get-all", service, None)
            .await?
            .unwrap_or(Value::Null))
    }
}

fn kea_error(command: &str, reason: impl std::fmt::Display) -> AgentError {
    AgentError::control(Channel::Kea, format!("{command}: {reason}"))
}

/// Pushes a Kea document with `config-set` followed by `config-write`.
///
/// Compensation re-pushes the previous document through both steps.
pub struct KeaPusher<T> {
    client: Arc<KeaClient>,
    path: PathBuf,
    _document: PhantomData<fn() -> T>,
}

impl<T: KeaDocument> KeaPusher<T> {
    pub fn new(client: Arc<KeaClient>, path: PathBuf) -> Self {
        Self {
            client,
            path,
            _document: PhantomData,
        }
    }
}

#[async_trait]
impl<T: KeaDocument> Pusher<T> for KeaPusher<T> {
    fn name(&self) -> &str {
        T::SERVICE
    }

    async fn push(&self, desired: &T) -> Result<()> {
        self.client.config_set(desired).await?;
        self.client
            .config_write(T::SERVICE, &self.path.display().to_string())
            .await?;
        info!(service = T::SERVICE, "Kea configuration applied");
        Ok(())
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod client_tests;
