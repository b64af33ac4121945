// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Tests for view operations and priority ordering.

#[cfg(test)]
mod tests {
    use crate::bind9::control::ControlCommand;
    use crate::dns::fakes::{harness, Harness};
    use crate::dns::requests::{CreateView, CreateZone, UpdateView};
    use crate::errors::AgentError;
    use crate::intent::{
        Acl, Dns64, ForwardType, ForwardZone, RedirectKind, Redirection, ResourceRecord, ZoneRole,
    };

    fn view(id: &str, priority: u32) -> CreateView {
        CreateView {
            id: id.to_string(),
            name: format!("{id}-name"),
            priority,
            acls: vec!["any".to_string()],
            dns64: None,
        }
    }

    async fn order(h: &Harness) -> Vec<(String, u32)> {
        h.handler
            .intent()
            .await
            .unwrap()
            .ordered_views()
            .unwrap()
            .iter()
            .map(|v| (v.id.clone(), v.priority))
            .collect()
    }

    fn ids(order: &[(String, u32)]) -> Vec<&str> {
        order.iter().map(|(id, _)| id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_insert_at_head_reverses_creation_order() {
        let h = harness().await;
        for id in ["a", "b", "c"] {
            h.handler.create_view(view(id, 1)).await.unwrap();
        }

        let order = order(&h).await;
        assert_eq!(ids(&order), vec!["c", "b", "a", "default"]);
        let priorities: Vec<u32> = order.iter().map(|(_, p)| *p).collect();
        assert_eq!(priorities, vec![1, 2, 3, 4]);

        let main = h.read("named.conf").unwrap();
        let pos = |name: &str| main.find(&format!("view_{name}.conf")).unwrap();
        assert!(pos("c") < pos("b") && pos("b") < pos("a") && pos("a") < pos("default"));
    }

    #[tokio::test]
    async fn test_position_past_end_appends() {
        let h = harness().await;
        h.handler.create_view(view("a", 99)).await.unwrap();
        assert_eq!(ids(&order(&h).await), vec!["default", "a"]);
    }

    #[tokio::test]
    async fn test_update_view_moves_and_renumbers() {
        let h = harness().await;
        for id in ["a", "b", "c"] {
            h.handler.create_view(view(id, 1)).await.unwrap();
        }
        h.handler
            .update_view(UpdateView {
                id: "c".to_string(),
                priority: Some(3),
                acls: vec!["any".to_string()],
                dns64: None,
            })
            .await
            .unwrap();

        let order = order(&h).await;
        assert_eq!(ids(&order), vec!["b", "a", "c", "default"]);
        assert_eq!(order[2].1, 3);
    }

    #[tokio::test]
    async fn test_view_renders_keys_and_dns64() {
        let h = harness().await;
        h.handler
            .create_acl(Acl {
                id: "lan".to_string(),
                name: "lan".to_string(),
                ips: vec!["192.168.0.0/16".to_string()],
            })
            .await
            .unwrap();
        h.handler
            .create_view(CreateView {
                id: "v1".to_string(),
                name: "internal".to_string(),
                priority: 1,
                acls: vec!["lan".to_string()],
                dns64: Some(Dns64 {
                    prefix: "64:ff9b::/96".to_string(),
                    client_acl: Some("lan".to_string()),
                    mapped_acl: None,
                }),
            })
            .await
            .unwrap();

        let conf = h.read("view_v1.conf").unwrap();
        assert!(conf.contains("view \"internal\""));
        assert!(conf.contains("\"lan\";"));
        assert!(conf.contains("dns64 64:ff9b::/96"));
        assert!(conf.contains("mapped { any; };"));
        // default view must not swallow traffic signed with the new view's key
        assert!(h.read("view_default.conf").unwrap().contains("!key \""));
    }

    #[tokio::test]
    async fn test_create_view_rejects_duplicates_and_unknown_acls() {
        let h = harness().await;
        h.handler.create_view(view("a", 1)).await.unwrap();
        h.control.clear();

        let err = h.handler.create_view(view("a", 1)).await.unwrap_err();
        assert!(matches!(err, AgentError::Validation(_)));

        let mut same_name = view("b", 1);
        same_name.name = "a-name".to_string();
        let err = h.handler.create_view(same_name).await.unwrap_err();
        assert!(matches!(err, AgentError::Validation(_)));

        let mut unknown_acl = view("c", 1);
        unknown_acl.acls = vec!["missing".to_string()];
        let err = h.handler.create_view(unknown_acl).await.unwrap_err();
        assert!(err.is_not_found());

        let mut bad_name = view("d", 1);
        bad_name.name = "../etc".to_string();
        let err = h.handler.create_view(bad_name).await.unwrap_err();
        assert!(matches!(err, AgentError::Validation(_)));

        assert!(h.control.commands().is_empty());
        assert_eq!(ids(&order(&h).await), vec!["a", "default"]);
    }

    #[tokio::test]
    async fn test_default_view_cannot_be_deleted() {
        let h = harness().await;
        let err = h.handler.delete_view("default").await.unwrap_err();
        assert!(matches!(err, AgentError::Validation(_)));
        assert!(h.handler.delete_view("nope").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_delete_view_cascades() {
        let h = harness().await;
        h.handler.create_view(view("a", 1)).await.unwrap();
        h.handler
            .create_zone(CreateZone {
                id: "z1".to_string(),
                name: "corp.example".to_string(),
                ttl: 3600,
                zone_file: "corp.example.db".to_string(),
                view_id: "a".to_string(),
                role: ZoneRole::Active,
            })
            .await
            .unwrap();
        h.handler
            .create_record(ResourceRecord {
                id: "r1".to_string(),
                name: "www".to_string(),
                rr_type: "A".to_string(),
                ttl: 300,
                rdata: "10.1.1.1".to_string(),
                rdata_backup: None,
                zone_id: "z1".to_string(),
                view_id: String::new(),
            })
            .await
            .unwrap();
        h.handler
            .create_forward_zone(ForwardZone {
                id: "f1".to_string(),
                name: "partner.example".to_string(),
                forward_type: ForwardType::First,
                forwarders: vec!["192.0.2.53".to_string()],
                view_id: "a".to_string(),
            })
            .await
            .unwrap();
        h.handler
            .create_redirection(Redirection {
                id: "rd1".to_string(),
                name: "ads.example.net".to_string(),
                ttl: 60,
                rr_type: "A".to_string(),
                rdata: "127.0.0.1".to_string(),
                kind: RedirectKind::LocalZone,
                view_id: "a".to_string(),
            })
            .await
            .unwrap();
        h.control.clear();

        h.handler.delete_view("a").await.unwrap();

        let intent = h.handler.intent().await.unwrap();
        assert!(intent.zones.is_empty());
        assert!(intent.records.is_empty());
        assert!(intent.forward_zones.is_empty());
        assert!(intent.redirections.is_empty());
        assert_eq!(ids(&order(&h).await), vec!["default"]);
        assert_eq!(h.control.commands(), vec![ControlCommand::Reconfig]);
        assert!(h.read("corp.example.db").is_none());
        assert!(h.read("view_a.conf").is_none());
    }
}
