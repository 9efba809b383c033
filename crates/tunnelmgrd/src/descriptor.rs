//! Construction of [`TunnelDescriptor`]s from configuration tree nodes.
//!
//! Leaf values are accepted either as JSON strings (as rendered by the
//! configuration backend) or as native JSON numbers. Valueless flags such
//! as `disable` are recognized by presence alone.

use std::net::IpAddr;
use std::str::FromStr;

use serde_json::Value;

use crate::error::{Result, TunnelError};
use crate::tables::{erspan_fields, ip_fields, tunnel_fields};
use crate::types::{
    Encapsulation, ErspanDirection, ErspanParameters, IpParameters, TunnelDescriptor,
    DEFAULT_ERSPAN_VERSION,
};

/// Builds a descriptor from the node `interfaces tunnel <name>`.
pub fn from_node(name: &str, node: &Value) -> Result<TunnelDescriptor> {
    let encapsulation: Encapsulation = string_field(name, node, tunnel_fields::ENCAPSULATION)?
        .ok_or_else(|| TunnelError::MissingEncapsulation {
            name: name.to_string(),
        })?
        .parse()?;

    let mut descriptor = TunnelDescriptor::new(name, encapsulation);
    descriptor.source_address = parsed_field(name, node, tunnel_fields::SOURCE_ADDRESS)?;
    descriptor.remote_address = parsed_field::<IpAddr>(name, node, tunnel_fields::REMOTE)?;
    descriptor.source_interface = string_field(name, node, tunnel_fields::SOURCE_INTERFACE)?;
    descriptor.dhcp_interface = string_field(name, node, tunnel_fields::DHCP_INTERFACE)?;
    descriptor.mtu = parsed_field(name, node, tunnel_fields::MTU)?;
    descriptor.description = string_field(name, node, tunnel_fields::DESCRIPTION)?;
    descriptor.disable = node.get(tunnel_fields::DISABLE).is_some();
    descriptor.addresses = string_list(name, node, tunnel_fields::ADDRESS)?;

    if let Some(params) = node.get(tunnel_fields::PARAMETERS) {
        if let Some(ip) = params.get("ip") {
            descriptor.ip_parameters = Some(IpParameters {
                no_pmtu_discovery: ip.get(ip_fields::NO_PMTU_DISCOVERY).is_some(),
                key: parsed_field(name, ip, ip_fields::KEY)?,
                tos: parsed_field(name, ip, ip_fields::TOS)?,
                ttl: parsed_field(name, ip, ip_fields::TTL)?,
            });
        }
        if let Some(erspan) = params.get("erspan") {
            descriptor.erspan_parameters = Some(ErspanParameters {
                version: parsed_field(name, erspan, erspan_fields::VERSION)?
                    .unwrap_or(DEFAULT_ERSPAN_VERSION),
                index: parsed_field(name, erspan, erspan_fields::INDEX)?,
                direction: parsed_field::<ErspanDirection>(name, erspan, erspan_fields::DIRECTION)?,
            });
        }
    }

    Ok(descriptor)
}

/// Scalar leaf rendered as text; numbers are accepted verbatim.
fn string_field(name: &str, node: &Value, field: &str) -> Result<Option<String>> {
    match node.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(TunnelError::invalid_field(
            name,
            field,
            format!("expected a scalar, found {}", other),
        )),
    }
}

fn parsed_field<T>(name: &str, node: &Value, field: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    string_field(name, node, field)?
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|e| TunnelError::invalid_field(name, field, format!("{raw:?}: {e}")))
        })
        .transpose()
}

/// Multi-value leaf; a single scalar is treated as a one-element list.
fn string_list(name: &str, node: &Value, field: &str) -> Result<Vec<String>> {
    match node.get(field) {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                other => Err(TunnelError::invalid_field(
                    name,
                    field,
                    format!("expected a string, found {}", other),
                )),
            })
            .collect(),
        _ => Ok(string_field(name, node, field)?.into_iter().collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_gre_node() {
        let node = json!({
            "encapsulation": "gre",
            "source-address": "192.0.2.1",
            "remote": "192.0.2.10",
            "mtu": "1476",
            "parameters": {
                "ip": { "no-pmtu-discovery": {}, "key": "10", "tos": 20 }
            }
        });

        let d = from_node("tun1030", &node).unwrap();
        assert_eq!(d.encapsulation, Encapsulation::Gre);
        assert_eq!(d.source_address, Some("192.0.2.1".parse().unwrap()));
        assert_eq!(d.remote_address, Some("192.0.2.10".parse().unwrap()));
        assert_eq!(d.mtu, Some(1476));
        assert_eq!(
            d.ip_parameters,
            Some(IpParameters {
                no_pmtu_discovery: true,
                key: Some(10),
                tos: Some(20),
                ttl: None,
            })
        );
        assert!(d.erspan_parameters.is_none());
    }

    #[test]
    fn test_erspan_defaults_version_1() {
        let node = json!({
            "encapsulation": "erspan",
            "source-address": "192.0.2.1",
            "remote": "192.0.2.100",
            "parameters": { "erspan": { "index": "20" } }
        });

        let d = from_node("tun1070", &node).unwrap();
        let erspan = d.erspan_parameters.unwrap();
        assert_eq!(erspan.version, 1);
        assert_eq!(erspan.index, Some(20));
        assert_eq!(erspan.direction, None);
    }

    #[test]
    fn test_erspan_v2_direction() {
        let node = json!({
            "encapsulation": "ip6erspan",
            "parameters": { "erspan": { "version": 2, "direction": "ingress" } }
        });

        let erspan = from_node("tun1070", &node).unwrap().erspan_parameters.unwrap();
        assert_eq!(erspan.version, 2);
        assert_eq!(erspan.direction, Some(ErspanDirection::Ingress));
    }

    #[test]
    fn test_interface_level_fields() {
        let node = json!({
            "encapsulation": "ipip",
            "address": ["10.10.200.1/24", "2001:db8:100::1/64"],
            "description": "uplink to hub",
            "disable": {}
        });

        let d = from_node("tun10", &node).unwrap();
        assert_eq!(d.addresses, vec!["10.10.200.1/24", "2001:db8:100::1/64"]);
        assert_eq!(d.description.as_deref(), Some("uplink to hub"));
        assert!(d.disable);

        let single = from_node("tun11", &json!({"encapsulation": "sit", "address": "10.0.0.1/30"}))
            .unwrap();
        assert_eq!(single.addresses, vec!["10.0.0.1/30"]);
    }

    #[test]
    fn test_missing_encapsulation() {
        let err = from_node("tun1", &json!({"remote": "192.0.2.1"})).unwrap_err();
        assert!(matches!(err, TunnelError::MissingEncapsulation { .. }));
    }

    #[test]
    fn test_unknown_encapsulation() {
        let err = from_node("tun1", &json!({"encapsulation": "vxlan"})).unwrap_err();
        assert!(matches!(err, TunnelError::UnknownEncapsulation(_)));
    }

    #[test]
    fn test_malformed_values() {
        let err = from_node(
            "tun1",
            &json!({"encapsulation": "gre", "remote": "not-an-address"}),
        )
        .unwrap_err();
        assert!(err.to_string().contains("remote"));

        let err = from_node(
            "tun1",
            &json!({"encapsulation": "gre", "parameters": {"ip": {"ttl": "300"}}}),
        )
        .unwrap_err();
        assert!(matches!(err, TunnelError::InvalidField { ref field, .. } if field == "ttl"));

        let err = from_node(
            "tun1",
            &json!({"encapsulation": "gre", "parameters": {"ip": {"key": "4294967296"}}}),
        )
        .unwrap_err();
        assert!(err.to_string().contains("key"));
    }
}
