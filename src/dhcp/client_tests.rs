// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod tests {
    use serde_json::json;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;
    use url::Url;
    use wiremock::matchers::{body_json, body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::dhcp::client::{KeaClient, KeaPusher};
    use crate::dhcp::types::Kea4Config;
    use crate::errors::{AgentError, Channel};
    use crate::reconciler::Pusher;

    fn client(server: &MockServer) -> KeaClient {
        KeaClient::new(Url::parse(&server.uri()).unwrap(), Duration::from_secs(2)).unwrap()
    }

    fn ok() -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!([{ "result": 0, "text": "ok" }]))
    }

    #[tokio::test]
    async fn test_config_set_sends_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_json(json!({
                "command": "config-set",
                "service": ["dhcp4"],
                "arguments": { "Dhcp4": { "subnet4": [] } }
            })))
            .respond_with(ok())
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .config_set(&Kea4Config::default())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_failed_result_is_kea_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "result": 1, "text": "subnet4 id 5 is duplicated" }
            ])))
            .mount(&server)
            .await;

        let err = client(&server)
            .config_write("dhcp4", "/etc/kea/kea-dhcp4.conf")
            .await
            .unwrap_err();
        match err {
            AgentError::ControlChannel { channel, reason } => {
                assert_eq!(channel, Channel::Kea);
                assert!(reason.contains("config-write"));
                assert!(reason.contains("duplicated"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_http_error_is_kea_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = client(&server).statistics("dhcp4").await.unwrap_err();
        assert!(err.to_string().contains("HTTP 500"));
    }

    #[tokio::test]
    async fn test_statistics_returns_arguments() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "command": "statistic-get-all" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "result": 0,
                "arguments": { "pkt4-received": [[42, "2025-01-01 00:00:00.000000"]] }
            }])))
            .mount(&server)
            .await;

        let stats = client(&server).statistics("dhcp4").await.unwrap();
        assert_eq!(stats["pkt4-received"][0][0], json!(42));
    }

    #[tokio::test]
    async fn test_empty_result_is_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([{ "result": 3, "text": "none" }])),
            )
            .mount(&server)
            .await;

        assert_eq!(
            client(&server).statistics("dhcp6").await.unwrap(),
            serde_json::Value::Null
        );
    }

    #[tokio::test]
    async fn test_pusher_sets_then_writes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "command": "config-set" })))
            .respond_with(ok())
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "command": "config-write",
                "arguments": { "filename": "/tmp/kea-dhcp4.conf" }
            })))
            .respond_with(ok())
            .expect(1)
            .mount(&server)
            .await;

        let pusher: KeaPusher<Kea4Config> = KeaPusher::new(
            Arc::new(client(&server)),
            PathBuf::from("/tmp/kea-dhcp4.conf"),
        );
        pusher.push(&Kea4Config::default()).await.unwrap();

        let commands: Vec<String> = server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .map(|r| r.body_json::<serde_json::Value>().unwrap()["command"].to_string())
            .collect();
        assert_eq!(commands, vec!["\"config-set\"", "\"config-write\""]);
    }
}
