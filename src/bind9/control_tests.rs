// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Tests for the rndc control channel.

#[cfg(test)]
mod tests {
    use crate::bind9::control::{ControlChannel, ControlCommand, RndcControl};
    use crate::bind9::types::ZoneScope;
    use crate::config::DnsConfig;
    use std::path::PathBuf;

    fn scope() -> ZoneScope {
        ZoneScope::new("example.com", "internal")
    }

    #[test]
    fn test_command_arguments() {
        assert_eq!(ControlCommand::Reconfig.args(), vec!["reconfig"]);
        assert_eq!(ControlCommand::Reload(None).args(), vec!["reload"]);
        assert_eq!(
            ControlCommand::Reload(Some(scope())).args(),
            vec!["reload", "example.com", "IN", "internal"]
        );
        assert_eq!(
            ControlCommand::DelZone(scope()).args(),
            vec!["delzone", "-clean", "example.com", "IN", "internal"]
        );
        assert_eq!(ControlCommand::Sync(None).args(), vec!["sync", "-clean"]);
        assert_eq!(
            ControlCommand::Sync(Some(scope())).args(),
            vec!["sync", "-clean", "example.com", "IN", "internal"]
        );
        assert_eq!(
            ControlCommand::Freeze(scope()).args(),
            vec!["freeze", "example.com", "IN", "internal"]
        );
        assert_eq!(
            ControlCommand::Thaw(scope()).args(),
            vec!["thaw", "example.com", "IN", "internal"]
        );
        assert_eq!(ControlCommand::Stop.args(), vec!["stop"]);
    }

    #[test]
    fn test_addzone_passes_conf_as_single_argument() {
        let conf = "{ type master; file \"/etc/bind/ddi/example.com.zone\"; };".to_string();
        let args = ControlCommand::AddZone {
            scope: scope(),
            conf: conf.clone(),
        }
        .args();
        assert_eq!(args, vec!["addzone", "example.com", "IN", "internal", conf.as_str()]);

        let args = ControlCommand::ModZone {
            scope: scope(),
            conf: conf.clone(),
        }
        .args();
        assert_eq!(args[0], "modzone");
        assert_eq!(args.len(), 5);
    }

    #[test]
    fn test_command_line_prefix() {
        let control = RndcControl::new(&DnsConfig {
            rndc_conf: PathBuf::from("/etc/bind/rndc.conf"),
            rndc_port: 9953,
            ..DnsConfig::default()
        });
        assert_eq!(
            control.command_line(&ControlCommand::Reconfig),
            vec!["-c", "/etc/bind/rndc.conf", "-s", "localhost", "-p", "9953", "reconfig"]
        );
    }

    #[test]
    fn test_display_includes_scope() {
        assert_eq!(
            ControlCommand::Sync(Some(scope())).to_string(),
            "sync example.com in internal"
        );
        assert_eq!(ControlCommand::Reconfig.to_string(), "reconfig");
    }

    #[tokio::test]
    async fn test_missing_binary_is_control_channel_error() {
        let control = RndcControl::new(&DnsConfig {
            rndc_binary: PathBuf::from("/nonexistent/rndc"),
            ..DnsConfig::default()
        });
        let err = control.execute(&ControlCommand::Reconfig).await.unwrap_err();
        assert!(err.to_string().starts_with("rndc control channel failed"));
        assert!(!err.is_recoverable());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_includes_raw_output() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("rndc");
        std::fs::write(
            &script,
            "#!/bin/sh\necho \"rndc: 'addzone' failed: already exists\" >&2\necho \"zone 'example.com' already exists\" >&2\nexit 1\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let control = RndcControl::new(&DnsConfig {
            rndc_binary: script,
            ..DnsConfig::default()
        });
        let err = control
            .execute(&ControlCommand::AddZone {
                scope: scope(),
                conf: "{ };".to_string(),
            })
            .await
            .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("RNDC command 'addzone' failed: already exists"));
        assert!(message.contains("zone 'example.com' already exists"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_success_returns_stdout() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("rndc");
        std::fs::write(&script, "#!/bin/sh\necho \"server reload successful\"\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let control = RndcControl::new(&DnsConfig {
            rndc_binary: script,
            ..DnsConfig::default()
        });
        let out = control.execute(&ControlCommand::Reconfig).await.unwrap();
        assert_eq!(out.trim(), "server reload successful");
    }
}
