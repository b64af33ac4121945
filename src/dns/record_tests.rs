// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Tests for resource record operations.

#[cfg(test)]
mod tests {
    use crate::bind9::update::UpdateOp;
    use crate::dns::fakes::{harness, Harness};
    use crate::dns::requests::CreateZone;
    use crate::errors::AgentError;
    use crate::intent::{ResourceRecord, ZoneRole};

    async fn with_zone() -> Harness {
        let h = harness().await;
        h.handler
            .create_zone(CreateZone {
                id: "z1".to_string(),
                name: "example.com".to_string(),
                ttl: 3600,
                zone_file: "example.com.db".to_string(),
                view_id: "default".to_string(),
                role: ZoneRole::Active,
            })
            .await
            .unwrap();
        h.control.clear();
        h
    }

    fn mail() -> ResourceRecord {
        ResourceRecord {
            id: "r1".to_string(),
            name: "mail".to_string(),
            rr_type: "a".to_string(),
            ttl: 1000,
            rdata: "10.2.21.1".to_string(),
            rdata_backup: None,
            zone_id: "z1".to_string(),
            view_id: String::new(),
        }
    }

    #[tokio::test]
    async fn test_create_then_delete_leaves_live_zone_unchanged() {
        let h = with_zone().await;
        let before = h.updater.live("example.com");

        h.handler.create_record(mail()).await.unwrap();
        assert_eq!(
            h.updater.live("example.com"),
            vec![("mail".to_string(), "A".to_string(), "10.2.21.1".to_string())]
        );
        let stored = h.handler.intent().await.unwrap().records.get("r1").cloned().unwrap();
        assert_eq!(stored.view_id, "default");
        assert_eq!(stored.rr_type, "A");

        h.handler.delete_record("r1").await.unwrap();
        assert_eq!(h.updater.live("example.com"), before);

        let ops: Vec<_> = h.updater.applied().iter().map(|u| u.op).collect();
        assert_eq!(ops, vec![UpdateOp::Assert, UpdateOp::Retract]);
        assert_eq!(
            h.control.log(),
            vec!["sync example.com in default", "sync example.com in default"]
        );
    }

    #[tokio::test]
    async fn test_update_sends_retract_then_assert() {
        let h = with_zone().await;
        h.handler.create_record(mail()).await.unwrap();

        let mut changed = mail();
        changed.rdata = "10.2.21.2".to_string();
        h.handler.update_record(changed).await.unwrap();

        let sent: Vec<_> = h
            .updater
            .applied()
            .iter()
            .skip(1)
            .map(|u| (u.op, u.rrset.rdata.clone()))
            .collect();
        assert_eq!(
            sent,
            vec![
                (UpdateOp::Retract, "10.2.21.1".to_string()),
                (UpdateOp::Assert, "10.2.21.2".to_string()),
            ]
        );
        assert_eq!(
            h.updater.live("example.com"),
            vec![("mail".to_string(), "A".to_string(), "10.2.21.2".to_string())]
        );
    }

    #[tokio::test]
    async fn test_backup_only_edit_is_not_pushed() {
        let h = with_zone().await;
        h.handler.create_record(mail()).await.unwrap();
        h.control.clear();

        let mut changed = mail();
        changed.rdata_backup = Some("10.9.21.1".to_string());
        h.handler.update_record(changed).await.unwrap();

        assert_eq!(h.updater.applied().len(), 1);
        assert!(h.control.commands().is_empty());
        assert_eq!(
            h.handler
                .intent()
                .await
                .unwrap()
                .records
                .get("r1")
                .unwrap()
                .rdata_backup
                .as_deref(),
            Some("10.9.21.1")
        );
    }

    #[tokio::test]
    async fn test_failed_sync_reverts_update() {
        let h = with_zone().await;
        h.control.fail_on("sync");

        let err = h.handler.create_record(mail()).await.unwrap_err();
        assert!(matches!(err, AgentError::ControlChannel { .. }));

        assert!(h.updater.live("example.com").is_empty());
        assert!(h.handler.intent().await.unwrap().records.is_empty());
        let ops: Vec<_> = h.updater.applied().iter().map(|u| u.op).collect();
        assert_eq!(ops, vec![UpdateOp::Assert, UpdateOp::Retract]);
    }

    #[tokio::test]
    async fn test_rejected_update_leaves_intent_unchanged() {
        let h = with_zone().await;
        h.updater.fail_after(0);

        let err = h.handler.create_record(mail()).await.unwrap_err();
        assert!(err.to_string().contains("Refused"));
        assert!(h.handler.intent().await.unwrap().records.is_empty());
        assert!(h.control.commands().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_rdata_is_rejected_before_push() {
        let h = with_zone().await;
        let mut bad = mail();
        bad.rdata = "not-an-address".to_string();
        let err = h.handler.create_record(bad).await.unwrap_err();
        assert!(matches!(err, AgentError::Validation(_)));

        let mut bad_backup = mail();
        bad_backup.rdata_backup = Some("2001:db8::1".to_string());
        let err = h.handler.create_record(bad_backup).await.unwrap_err();
        assert!(matches!(err, AgentError::Validation(_)));

        let mut unsupported = mail();
        unsupported.rr_type = "NAPTR".to_string();
        let err = h.handler.create_record(unsupported).await.unwrap_err();
        assert!(matches!(err, AgentError::Validation(_)));

        assert!(h.updater.applied().is_empty());
        assert!(h.control.commands().is_empty());
    }

    #[tokio::test]
    async fn test_records_need_a_file_backed_zone() {
        let h = with_zone().await;
        h.handler
            .create_zone(CreateZone {
                id: "fz".to_string(),
                name: "lab.example".to_string(),
                ttl: 3600,
                zone_file: String::new(),
                view_id: "default".to_string(),
                role: ZoneRole::Active,
            })
            .await
            .unwrap();

        let mut in_forward = mail();
        in_forward.zone_id = "fz".to_string();
        let err = h.handler.create_record(in_forward).await.unwrap_err();
        assert!(matches!(err, AgentError::Validation(_)));

        let mut orphan = mail();
        orphan.zone_id = "missing".to_string();
        assert!(h.handler.create_record(orphan).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_record_cannot_move_between_zones() {
        let h = with_zone().await;
        h.handler.create_record(mail()).await.unwrap();

        let mut moved = mail();
        moved.zone_id = "elsewhere".to_string();
        let err = h.handler.update_record(moved).await.unwrap_err();
        assert!(matches!(err, AgentError::Validation(_)));
        assert!(h.handler.update_record(ResourceRecord {
            id: "r404".to_string(),
            ..mail()
        })
        .await
        .unwrap_err()
        .is_not_found());
    }

    #[tokio::test]
    async fn test_records_cannot_share_a_live_rrset() {
        let h = with_zone().await;
        h.handler.create_record(mail()).await.unwrap();

        let twin = ResourceRecord {
            id: "r2".to_string(),
            name: "MAIL".to_string(),
            ..mail()
        };
        let err = h.handler.create_record(twin).await.unwrap_err();
        assert!(matches!(err, AgentError::Validation(_)));
        assert!(err.to_string().contains("'r1'"));

        let backup_twin = ResourceRecord {
            id: "r3".to_string(),
            rdata: "10.2.21.9".to_string(),
            rdata_backup: Some("10.2.21.1".to_string()),
            ..mail()
        };
        let err = h.handler.create_record(backup_twin).await.unwrap_err();
        assert!(matches!(err, AgentError::Validation(_)));

        let sibling = ResourceRecord {
            id: "r4".to_string(),
            rdata: "10.2.21.2".to_string(),
            ..mail()
        };
        h.handler.create_record(sibling).await.unwrap();
        let mut clash = mail();
        clash.rdata = "10.2.21.2".to_string();
        let err = h.handler.update_record(clash).await.unwrap_err();
        assert!(matches!(err, AgentError::Validation(_)));

        h.handler.delete_record("r4").await.unwrap();
        assert_eq!(
            h.updater.live("example.com"),
            vec![("mail".to_string(), "A".to_string(), "10.2.21.1".to_string())]
        );
        assert_eq!(h.handler.intent().await.unwrap().records.len(), 1);
    }
}
