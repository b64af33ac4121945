// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Tests for agent configuration loading.

#[cfg(test)]
mod tests {
    use crate::config::AgentConfig;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn test_empty_yaml_yields_defaults() {
        let config = AgentConfig::from_yaml("").unwrap();
        assert_eq!(config, AgentConfig::default());
        assert_eq!(config.dns.rndc_port, 953);
        assert_eq!(config.dhcp.timeout(), Duration::from_secs(10));
        assert_eq!(config.dns.health_check_interval(), Duration::from_secs(5));
    }

    #[test]
    fn test_partial_yaml_keeps_other_defaults() {
        let yaml = r"
intent-path: /tmp/intent.json
dns:
  conf-dir: /tmp/bind
  rndc-port: 9953
";
        let config = AgentConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.intent_path, PathBuf::from("/tmp/intent.json"));
        assert_eq!(config.dns.conf_dir, PathBuf::from("/tmp/bind"));
        assert_eq!(config.dns.rndc_port, 9953);
        assert_eq!(config.dns.rndc_binary, PathBuf::from("rndc"));
        assert!(config.dhcp.enabled);
    }

    #[test]
    fn test_update_server_parses_socket_addr() {
        let yaml = "dns:\n  update-server: \"10.0.0.53:5353\"\n";
        let config = AgentConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.dns.update_server.port(), 5353);
    }

    #[test]
    fn test_invalid_control_agent_url_rejected() {
        let yaml = "dhcp:\n  control-agent-url: \"not a url\"\n";
        let err = AgentConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("control-agent-url"));
    }

    #[test]
    fn test_non_http_control_agent_url_rejected() {
        let yaml = "dhcp:\n  control-agent-url: \"ftp://127.0.0.1/\"\n";
        assert!(AgentConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_invalid_url_ignored_when_dhcp_disabled() {
        let yaml = "dhcp:\n  enabled: false\n  control-agent-url: \"nope\"\n";
        assert!(AgentConfig::from_yaml(yaml).is_ok());
    }

    #[test]
    fn test_zero_health_interval_rejected() {
        let yaml = "dns:\n  health-check-interval-secs: 0\n";
        let err = AgentConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("health-check-interval-secs"));
    }

    #[test]
    fn test_load_missing_file_errors() {
        let result = AgentConfig::load(std::path::Path::new("/nonexistent/ddi-agent.yaml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("agent.yaml");
        std::fs::write(&path, "dhcp:\n  timeout-secs: 3\n").unwrap();
        let config = AgentConfig::load(&path).unwrap();
        assert_eq!(config.dhcp.timeout(), Duration::from_secs(3));
    }
}
