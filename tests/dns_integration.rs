// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! End-to-end DNS flows through the envelope dispatcher, with a file-backed intent
//! store, generated files on disk, and fake daemon channels.

mod common;

use common::DnsNode;
use serde_json::json;

const LAN_ACL: &str =
    r#"{"operation":"create-acl","request":{"id":"lan","name":"lan","ips":["10.0.0.0/8"]}}"#;
const INTERNAL_VIEW: &str = r#"{"operation":"create-view","request":{"id":"internal","name":"internal","priority":1,"acls":["lan"]}}"#;
const CORP_ZONE: &str = r#"{"operation":"create-zone","request":{"id":"z1","name":"corp.example","ttl":3600,"zone_file":"corp.example.db","view_id":"internal"}}"#;
const WWW_RECORD: &str = r#"{"operation":"create-record","request":{"id":"r1","name":"www","rr_type":"A","ttl":300,"rdata":"10.0.0.5","rdata_backup":"192.0.2.5","zone_id":"z1"}}"#;

async fn corp_node() -> DnsNode {
    let node = DnsNode::start().await;
    node.ok(LAN_ACL).await;
    node.ok(INTERNAL_VIEW).await;
    node.ok(CORP_ZONE).await;
    node.rndc.clear();
    node
}

#[tokio::test]
async fn test_bootstrap_seeds_default_view() {
    let node = DnsNode::start().await;

    let intent = node.handler.intent().await.unwrap();
    assert!(intent.views.get("default").is_some());
    assert!(intent.acls.get("any").is_some());
    assert!(node.read("named.conf").unwrap().contains("view_default.conf"));
    assert!(node.config.intent_path.exists());
    assert!(node.rndc.log().is_empty());
}

#[tokio::test]
async fn test_views_render_in_priority_order() {
    let node = corp_node().await;

    let main_conf = node.read("named.conf").unwrap();
    let internal = main_conf.find("view_internal.conf").unwrap();
    let default = main_conf.find("view_default.conf").unwrap();
    assert!(internal < default);

    let view = node.read("view_internal.conf").unwrap();
    assert!(view.contains("view \"internal\""));
    assert!(view.contains("\"lan\";"));
    assert!(view.contains("!key \"default\";"));
    assert!(node.read("internal.nzf").unwrap().contains("corp.example"));
}

#[tokio::test]
async fn test_record_lifecycle_reaches_live_zone() {
    let node = corp_node().await;

    node.ok(WWW_RECORD).await;
    assert_eq!(node.live.served("corp.example"), vec!["www 10.0.0.5"]);
    assert_eq!(node.rndc.log(), vec!["sync corp.example in internal"]);

    let response = node
        .send(r#"{"operation":"switch-zone-role","request":{"id":"z1","role":"backup"}}"#)
        .await;
    assert!(response.succeed, "{}", response.error_message);
    assert_eq!(response.data, Some(json!({ "updates": 2 })));
    assert_eq!(node.live.served("corp.example"), vec!["www 192.0.2.5"]);

    node.ok(r#"{"operation":"delete-record","request":{"id":"r1"}}"#)
        .await;
    assert!(node.live.served("corp.example").is_empty());
    assert!(node.handler.intent().await.unwrap().records.is_empty());
}

#[tokio::test]
async fn test_refused_update_leaves_intent_untouched() {
    let node = corp_node().await;
    node.live.refuse_next();

    let response = node.send(WWW_RECORD).await;
    assert!(!response.succeed);
    assert!(response.error_message.contains("Refused"));
    assert!(node.handler.intent().await.unwrap().records.is_empty());
    assert!(node.rndc.log().is_empty());
}

#[tokio::test]
async fn test_failed_reconfig_is_not_committed() {
    let node = DnsNode::start().await;
    let acl_before = node.read("acl.conf").unwrap();
    node.rndc.fail_next("reconfig");

    let response = node.send(LAN_ACL).await;
    assert!(!response.succeed);
    assert!(response.error_message.contains("reconfig"));
    assert_eq!(node.read("acl.conf").unwrap(), acl_before);

    let node = node.restart().await;
    assert!(node.handler.intent().await.unwrap().acls.get("lan").is_none());
}

#[tokio::test]
async fn test_intent_survives_restart() {
    let node = corp_node().await;
    node.ok(WWW_RECORD).await;
    let revision = node.handler.intent().await.unwrap().revision;

    let node = node.restart().await;
    let intent = node.handler.intent().await.unwrap();
    assert_eq!(intent.revision, revision);
    assert_eq!(intent.records.len(), 1);
    assert!(node
        .read("corp.example.db")
        .unwrap()
        .contains("10.0.0.5"));
}

#[tokio::test]
async fn test_delete_view_cascades() {
    let node = corp_node().await;
    node.ok(WWW_RECORD).await;
    node.ok(r#"{"operation":"create-redirection","request":{"id":"ads","name":"ads.example.net","ttl":60,"rr_type":"A","rdata":"127.0.0.1","kind":"local-zone","view_id":"internal"}}"#)
        .await;

    let response = node
        .send(r#"{"operation":"delete-acl","request":{"id":"lan"}}"#)
        .await;
    assert!(response.error_message.contains("still referenced"));

    node.ok(r#"{"operation":"delete-view","request":{"id":"internal"}}"#)
        .await;

    let intent = node.handler.intent().await.unwrap();
    assert!(intent.views.get("internal").is_none());
    assert!(intent.zones.is_empty());
    assert!(intent.records.is_empty());
    assert!(intent.redirections.is_empty());
    assert!(node.read("view_internal.conf").is_none());
    assert!(!node
        .read("named.conf")
        .unwrap()
        .contains("view_internal.conf"));

    node.ok(r#"{"operation":"delete-acl","request":{"id":"lan"}}"#)
        .await;
}

#[tokio::test]
async fn test_default_view_is_protected() {
    let node = DnsNode::start().await;

    let response = node
        .send(r#"{"operation":"delete-view","request":{"id":"default"}}"#)
        .await;
    assert!(!response.succeed);
    assert!(node.handler.intent().await.unwrap().views.get("default").is_some());
}
