// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod tests {
    use crate::dhcp::types::{hw_key, parse_document, pool_key, Kea4Config, Kea6Config, Pool};
    use serde_json::json;

    const DHCP4: &str = r#"
// managed by ddi-agent
{
    "Dhcp4": {
        "interfaces-config": { "interfaces": ["eth0"] },
        # lease database
        "lease-database": { "type": "memfile", "lfc-interval": 3600 },
        "valid-lifetime": 4000,
        "subnet4": [
            {
                "id": 1,
                "subnet": "192.0.2.0/24",
                "pools": [ { "pool": "192.0.2.10 - 192.0.2.100" } ],
                "option-data": [ { "name": "routers", "data": "192.0.2.1" } ],
                "reservations": [
                    { "hw-address": "1a:1b:1c:1d:1e:1f", "ip-address": "192.0.2.201" }
                ]
            }
        ],
        "client-classes": [ { "name": "voip", "test": "substring(option[60].hex,0,6) == 'Aastra'" } ]
    }
}
"#;

    #[test]
    fn test_parse_dhcp4_keeps_unknown_keys() {
        let config: Kea4Config = parse_document(DHCP4).unwrap();
        let subnet = &config.dhcp4.subnet4[0];
        assert_eq!(subnet.id, 1);
        assert_eq!(subnet.pools[0].key(), "192.0.2.10-192.0.2.100");
        assert_eq!(subnet.reservations[0].ip_address.as_deref(), Some("192.0.2.201"));
        assert_eq!(config.dhcp4.client_classes[0].name, "voip");
        assert_eq!(config.dhcp4.extra["valid-lifetime"], json!(4000));

        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(
            value["Dhcp4"]["subnet4"][0]["option-data"][0]["data"],
            json!("192.0.2.1")
        );
        assert_eq!(
            value["Dhcp4"]["lease-database"],
            json!({ "type": "memfile", "lfc-interval": 3600 })
        );
    }

    #[test]
    fn test_parse_dhcp6_pd_pools() {
        let text = r#"{
            "Dhcp6": {
                "subnet6": [{
                    "id": 7,
                    "subnet": "2001:db8:1::/64",
                    "pd-pools": [{ "prefix": "2001:db8:8::", "prefix-len": 56, "delegated-len": 64 }],
                    "reservations": [{ "hw-address": "AA-BB-CC-DD-EE-FF", "ip-addresses": ["2001:db8:1::100"] }]
                }]
            }
        }"#;
        let config: Kea6Config = parse_document(text).unwrap();
        let subnet = &config.dhcp6.subnet6[0];
        assert_eq!(subnet.pd_pools[0].prefix_len, 56);
        assert_eq!(hw_key(&subnet.reservations[0].hw_address), "aa:bb:cc:dd:ee:ff");

        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["Dhcp6"]["subnet6"][0]["pd-pools"][0]["delegated-len"], json!(64));
        assert!(value["Dhcp6"]["subnet6"][0].get("pools").is_none());
    }

    #[test]
    fn test_pool_keys_ignore_spacing() {
        assert_eq!(Pool::range("10.0.0.1", "10.0.0.9").pool, "10.0.0.1 - 10.0.0.9");
        assert_eq!(pool_key("10.0.0.1 -10.0.0.9"), "10.0.0.1-10.0.0.9");
        assert_eq!(pool_key("10.0.0.0/28"), "10.0.0.0/28");
    }

    #[test]
    fn test_malformed_document_is_an_error() {
        assert!(parse_document::<Kea4Config>("{\"Dhcp4\": [").is_err());
        assert!(parse_document::<Kea4Config>("{\"Dhcp6\": {}}").is_err());
    }
}
