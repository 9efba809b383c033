//! Tunnel descriptor validation.
//!
//! Every rule is evaluated and every violation reported; a single failed
//! commit shows the user all defects at once. Rules run in a fixed order
//! so the report reads like the form is filled in: local endpoint, remote
//! endpoint, address families, binding, ERSPAN, IP parameters, naming,
//! interface settings.

use std::net::IpAddr;

use cfgmgr_common::InterfaceIndex;
use ipnet::IpNet;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::catalog::{ConstraintCatalog, EncapProfile};
use crate::tables::CFG_TUNNEL_KIND;
use crate::types::{
    AddressFamily, Encapsulation, TunnelDescriptor, MAX_ERSPAN_INDEX, MAX_TUNNEL_MTU,
    MIN_TUNNEL_MTU,
};

/// Tunnel interfaces are named `tun<N>`
static TUNNEL_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^tun[0-9]+$").expect("Invalid regex pattern"));

/// True for names tunnelmgrd manages (`tun<N>`).
pub fn is_tunnel_name(name: &str) -> bool {
    TUNNEL_NAME_RE.is_match(name)
}

/// A user-correctable defect in a tunnel descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("{name}: source-address and dhcp-interface can not be used at the same time")]
    SourceAndDhcpInterface { name: String },

    #[error("{name}: either source-address or dhcp-interface must be configured")]
    MissingLocalEndpoint { name: String },

    #[error("{name}: remote address must be configured")]
    MissingRemote { name: String },

    #[error("{name}: encapsulation {encapsulation} requires an {family} source-address")]
    SourceAddressFamily {
        name: String,
        encapsulation: Encapsulation,
        family: AddressFamily,
    },

    #[error("{name}: encapsulation {encapsulation} requires an {family} remote address")]
    RemoteAddressFamily {
        name: String,
        encapsulation: Encapsulation,
        family: AddressFamily,
    },

    #[error("{name}: source-interface can not be used with encapsulation {encapsulation}")]
    SourceInterfaceNotPermitted {
        name: String,
        encapsulation: Encapsulation,
    },

    #[error("{name}: {role} \"{interface}\" is not a configured interface")]
    UnknownInterface {
        name: String,
        role: &'static str,
        interface: String,
    },

    #[error("{name}: encapsulation {encapsulation} requires parameters ip key")]
    KeyRequired {
        name: String,
        encapsulation: Encapsulation,
    },

    #[error("{name}: ERSPAN version {version} is not supported, use 1 or 2")]
    UnsupportedErspanVersion { name: String, version: u8 },

    #[error("{name}: ERSPAN index is only valid with version 1")]
    ErspanIndexRequiresVersion1 { name: String },

    #[error("{name}: ERSPAN index {index} exceeds the maximum of {max}", max = MAX_ERSPAN_INDEX)]
    ErspanIndexOutOfRange { name: String, index: u32 },

    #[error("{name}: ERSPAN version 2 requires direction to be set")]
    ErspanDirectionRequired { name: String },

    #[error("{name}: ERSPAN direction is only valid with version 2")]
    ErspanDirectionRequiresVersion2 { name: String },

    #[error("{name}: parameters ip key is not supported by encapsulation {encapsulation}")]
    KeyNotSupported {
        name: String,
        encapsulation: Encapsulation,
    },

    #[error("{name}: no-pmtu-discovery is not supported by encapsulation {encapsulation}")]
    PmtuDiscoveryNotSupported {
        name: String,
        encapsulation: Encapsulation,
    },

    #[error("{name}: ttl {ttl} requires path MTU discovery, remove no-pmtu-discovery or set ttl 0")]
    TtlWithoutPmtuDiscovery { name: String, ttl: u8 },

    #[error("{name}: tunnel interface names must match tun<N>")]
    InvalidName { name: String },

    #[error("{name}: name is already used by a {kind} interface")]
    NameCollision { name: String, kind: String },

    #[error("{name}: mtu {mtu} is outside {min}..={max}", min = MIN_TUNNEL_MTU, max = MAX_TUNNEL_MTU)]
    MtuOutOfRange { name: String, mtu: u32 },

    #[error("{name}: invalid address \"{address}\"")]
    InvalidAddress { name: String, address: String },
}

/// A descriptor that passed validation.
///
/// Only [`validate`] constructs this type, so holding one proves the
/// descriptor satisfies every constraint of its encapsulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedDescriptor {
    descriptor: TunnelDescriptor,
    profile: EncapProfile,
    addresses: Vec<IpNet>,
}

impl ValidatedDescriptor {
    pub fn descriptor(&self) -> &TunnelDescriptor {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Catalog entry of the descriptor's encapsulation
    pub fn profile(&self) -> &EncapProfile {
        &self.profile
    }

    /// Parsed interface addresses
    pub fn addresses(&self) -> &[IpNet] {
        &self.addresses
    }
}

/// Validates one descriptor.
///
/// `interfaces` is the index of every configured interface, used for the
/// uniqueness check and to resolve `source-interface`/`dhcp-interface`.
pub fn validate(
    descriptor: &TunnelDescriptor,
    catalog: &ConstraintCatalog,
    interfaces: &InterfaceIndex,
) -> Result<ValidatedDescriptor, Vec<Violation>> {
    let profile = catalog.profile(descriptor.encapsulation);

    let mut violations = Vec::new();
    violations.extend(check_endpoints(descriptor, &profile));
    violations.extend(check_binding(descriptor, &profile, interfaces));
    violations.extend(check_erspan(descriptor, &profile));
    violations.extend(check_ip_parameters(descriptor, &profile));
    violations.extend(check_name(descriptor, interfaces));

    let (addresses, address_violations) = check_interface_settings(descriptor);
    violations.extend(address_violations);

    if violations.is_empty() {
        Ok(ValidatedDescriptor {
            descriptor: descriptor.clone(),
            profile,
            addresses,
        })
    } else {
        Err(violations)
    }
}

fn check_endpoints(d: &TunnelDescriptor, profile: &EncapProfile) -> Vec<Violation> {
    let name = &d.name;
    let mut violations = Vec::new();

    match (&d.source_address, &d.dhcp_interface) {
        (Some(_), Some(_)) => violations.push(Violation::SourceAndDhcpInterface {
            name: name.clone(),
        }),
        (None, None) => violations.push(Violation::MissingLocalEndpoint { name: name.clone() }),
        _ => {}
    }

    if d.remote_address.is_none() {
        violations.push(Violation::MissingRemote { name: name.clone() });
    }

    let wrong_family = |addr: &Option<IpAddr>| matches!(addr, Some(a) if !profile.family.matches(a));

    if wrong_family(&d.source_address) {
        violations.push(Violation::SourceAddressFamily {
            name: name.clone(),
            encapsulation: d.encapsulation,
            family: profile.family,
        });
    }
    if wrong_family(&d.remote_address) {
        violations.push(Violation::RemoteAddressFamily {
            name: name.clone(),
            encapsulation: d.encapsulation,
            family: profile.family,
        });
    }

    violations
}

fn check_binding(
    d: &TunnelDescriptor,
    profile: &EncapProfile,
    interfaces: &InterfaceIndex,
) -> Vec<Violation> {
    let mut violations = Vec::new();

    if d.source_interface.is_some() && !profile.allows_source_interface {
        violations.push(Violation::SourceInterfaceNotPermitted {
            name: d.name.clone(),
            encapsulation: d.encapsulation,
        });
    }

    let references = [
        ("source-interface", &d.source_interface),
        ("dhcp-interface", &d.dhcp_interface),
    ];
    for (role, reference) in references {
        if let Some(ifname) = reference {
            if !interfaces.contains_key(ifname) {
                violations.push(Violation::UnknownInterface {
                    name: d.name.clone(),
                    role,
                    interface: ifname.clone(),
                });
            }
        }
    }

    violations
}

fn check_erspan(d: &TunnelDescriptor, profile: &EncapProfile) -> Vec<Violation> {
    let name = &d.name;
    let mut violations = Vec::new();

    if profile.key_required && d.key().is_none() {
        violations.push(Violation::KeyRequired {
            name: name.clone(),
            encapsulation: d.encapsulation,
        });
    }

    if !profile.erspan {
        return violations;
    }
    let Some(erspan) = &d.erspan_parameters else {
        return violations;
    };

    match erspan.version {
        1 => {
            if erspan.direction.is_some() {
                violations.push(Violation::ErspanDirectionRequiresVersion2 { name: name.clone() });
            }
        }
        2 => {
            if erspan.index.is_some() {
                violations.push(Violation::ErspanIndexRequiresVersion1 { name: name.clone() });
            }
            if erspan.direction.is_none() {
                violations.push(Violation::ErspanDirectionRequired { name: name.clone() });
            }
        }
        version => violations.push(Violation::UnsupportedErspanVersion {
            name: name.clone(),
            version,
        }),
    }

    if let Some(index) = erspan.index {
        if index > MAX_ERSPAN_INDEX {
            violations.push(Violation::ErspanIndexOutOfRange {
                name: name.clone(),
                index,
            });
        }
    }

    violations
}

fn check_ip_parameters(d: &TunnelDescriptor, profile: &EncapProfile) -> Vec<Violation> {
    let Some(ip) = &d.ip_parameters else {
        return Vec::new();
    };
    let mut violations = Vec::new();

    if ip.key.is_some() && !profile.key_supported {
        violations.push(Violation::KeyNotSupported {
            name: d.name.clone(),
            encapsulation: d.encapsulation,
        });
    }

    if ip.no_pmtu_discovery {
        if !profile.pmtudisc_supported {
            violations.push(Violation::PmtuDiscoveryNotSupported {
                name: d.name.clone(),
                encapsulation: d.encapsulation,
            });
        } else if let Some(ttl) = ip.ttl.filter(|ttl| *ttl != 0) {
            violations.push(Violation::TtlWithoutPmtuDiscovery {
                name: d.name.clone(),
                ttl,
            });
        }
    }

    violations
}

fn check_name(d: &TunnelDescriptor, interfaces: &InterfaceIndex) -> Vec<Violation> {
    let mut violations = Vec::new();

    if !is_tunnel_name(&d.name) {
        violations.push(Violation::InvalidName {
            name: d.name.clone(),
        });
    }

    let foreign = interfaces
        .get(&d.name)
        .into_iter()
        .flatten()
        .find(|kind| kind.as_str() != CFG_TUNNEL_KIND);
    if let Some(kind) = foreign {
        violations.push(Violation::NameCollision {
            name: d.name.clone(),
            kind: kind.clone(),
        });
    }

    violations
}

fn check_interface_settings(d: &TunnelDescriptor) -> (Vec<IpNet>, Vec<Violation>) {
    let mut violations = Vec::new();

    if let Some(mtu) = d.mtu {
        if !(MIN_TUNNEL_MTU..=MAX_TUNNEL_MTU).contains(&mtu) {
            violations.push(Violation::MtuOutOfRange {
                name: d.name.clone(),
                mtu,
            });
        }
    }

    let mut addresses = Vec::with_capacity(d.addresses.len());
    for raw in &d.addresses {
        match raw.parse::<IpNet>() {
            Ok(net) => addresses.push(net),
            Err(_) => violations.push(Violation::InvalidAddress {
                name: d.name.clone(),
                address: raw.clone(),
            }),
        }
    }

    (addresses, violations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ErspanDirection, ErspanParameters, IpParameters};
    use pretty_assertions::assert_eq;

    const LOCAL_V4: &str = "192.0.2.1";
    const LOCAL_V6: &str = "2001:db8::1";
    const REMOTE_V4: &str = "192.0.2.100";
    const REMOTE_V6: &str = "2001:db8::ffff";
    const SOURCE_IF: &str = "dum2222";

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn interfaces() -> InterfaceIndex {
        [
            (SOURCE_IF, "dummy"),
            ("eth0", "ethernet"),
            ("tun1000", "tunnel"),
        ]
        .into_iter()
        .map(|(n, k)| (n.to_string(), vec![k.to_string()]))
        .collect()
    }

    fn check(d: &TunnelDescriptor) -> Vec<Violation> {
        match validate(d, &ConstraintCatalog, &interfaces()) {
            Ok(_) => Vec::new(),
            Err(v) => v,
        }
    }

    fn v4(name: &str, encap: Encapsulation) -> TunnelDescriptor {
        TunnelDescriptor::new(name, encap)
            .with_source_address(ip(LOCAL_V4))
            .with_remote(ip(REMOTE_V4))
    }

    fn v6(name: &str, encap: Encapsulation) -> TunnelDescriptor {
        TunnelDescriptor::new(name, encap)
            .with_source_address(ip(LOCAL_V6))
            .with_remote(ip(REMOTE_V6))
    }

    fn keyed(key: u32) -> IpParameters {
        IpParameters {
            key: Some(key),
            ..Default::default()
        }
    }

    #[test]
    fn test_ipv4_encapsulations_reject_ipv6_endpoints() {
        for encap in [
            Encapsulation::Ipip,
            Encapsulation::Sit,
            Encapsulation::Gre,
            Encapsulation::Gretap,
            Encapsulation::Erspan,
        ] {
            let mut d = TunnelDescriptor::new("tun1000", encap)
                .with_source_address(ip(LOCAL_V6))
                .with_remote(ip(REMOTE_V6))
                .with_ip_parameters(keyed(1));
            if encap == Encapsulation::Erspan {
                d = d.with_ip_parameters(keyed(77));
            } else if !ConstraintCatalog.profile(encap).key_supported {
                d.ip_parameters = None;
            }

            let violations = check(&d);
            assert_eq!(
                violations,
                vec![
                    Violation::SourceAddressFamily {
                        name: "tun1000".into(),
                        encapsulation: encap,
                        family: AddressFamily::V4,
                    },
                    Violation::RemoteAddressFamily {
                        name: "tun1000".into(),
                        encapsulation: encap,
                        family: AddressFamily::V4,
                    },
                ],
                "{encap}"
            );

            // fixing the source leaves only the remote error
            d.source_address = Some(ip(LOCAL_V4));
            assert!(matches!(
                check(&d).as_slice(),
                [Violation::RemoteAddressFamily { .. }]
            ));

            d.remote_address = Some(ip(REMOTE_V4));
            assert!(check(&d).is_empty(), "{encap}");
        }
    }

    #[test]
    fn test_ipv6_encapsulations_reject_ipv4_endpoints() {
        for encap in [
            Encapsulation::Ipip6,
            Encapsulation::Ip6ip6,
            Encapsulation::Ip6gre,
            Encapsulation::Ip6gretap,
        ] {
            let mut d = TunnelDescriptor::new("tun1010", encap)
                .with_source_address(ip(LOCAL_V4))
                .with_remote(ip(REMOTE_V4));

            let violations = check(&d);
            assert_eq!(violations.len(), 2, "{encap}");
            assert!(matches!(violations[0], Violation::SourceAddressFamily { family: AddressFamily::V6, .. }));
            assert!(matches!(violations[1], Violation::RemoteAddressFamily { family: AddressFamily::V6, .. }));

            d.source_address = Some(ip(LOCAL_V6));
            d.remote_address = Some(ip(REMOTE_V6));
            assert!(check(&d).is_empty(), "{encap}");
        }
    }

    #[test]
    fn test_source_interface_binding() {
        let forbidden = [Encapsulation::Sit, Encapsulation::Gretap, Encapsulation::Ip6gretap];
        for encap in Encapsulation::ALL {
            let base = if ConstraintCatalog.profile(encap).family == AddressFamily::V4 {
                v4("tun1000", encap)
            } else {
                v6("tun1000", encap)
            };
            let mut d = base.with_source_interface(SOURCE_IF);
            if ConstraintCatalog.profile(encap).key_required {
                d = d.with_ip_parameters(keyed(77));
            }

            let violations = check(&d);
            if forbidden.contains(&encap) {
                assert_eq!(
                    violations,
                    vec![Violation::SourceInterfaceNotPermitted {
                        name: "tun1000".into(),
                        encapsulation: encap,
                    }]
                );
                d.source_interface = None;
                assert!(check(&d).is_empty());
            } else {
                assert!(violations.is_empty(), "{encap}: {violations:?}");
            }
        }
    }

    #[test]
    fn test_unknown_source_interface() {
        let d = v4("tun1000", Encapsulation::Gre).with_source_interface("dum9");
        assert_eq!(
            check(&d),
            vec![Violation::UnknownInterface {
                name: "tun1000".into(),
                role: "source-interface",
                interface: "dum9".into(),
            }]
        );
    }

    #[test]
    fn test_vlan_subinterface_binding() {
        let tree = cfgmgr_common::ConfigTree::new(serde_json::json!({
            "interfaces": {
                "ethernet": { "eth0": { "vif": { "100": {} } } },
                "tunnel": { "tun1000": { "encapsulation": "gre" } }
            }
        }));
        let interfaces = tree.interfaces();

        let d = v4("tun1000", Encapsulation::Gre).with_source_interface("eth0.100");
        assert!(validate(&d, &ConstraintCatalog, &interfaces).is_ok());

        let d = v4("tun1000", Encapsulation::Gre).with_source_interface("eth0.101");
        assert_eq!(
            validate(&d, &ConstraintCatalog, &interfaces).unwrap_err(),
            vec![Violation::UnknownInterface {
                name: "tun1000".into(),
                role: "source-interface",
                interface: "eth0.101".into(),
            }]
        );
    }

    #[test]
    fn test_source_address_and_dhcp_interface_exclusive() {
        let d = v4("tun1020", Encapsulation::Gre).with_dhcp_interface("eth0");
        assert_eq!(
            check(&d),
            vec![Violation::SourceAndDhcpInterface {
                name: "tun1020".into()
            }]
        );

        // reported regardless of other defects
        let d = v6("tun1020", Encapsulation::Gre)
            .with_dhcp_interface("eth0")
            .with_source_interface(SOURCE_IF);
        let violations = check(&d);
        assert_eq!(
            violations[0],
            Violation::SourceAndDhcpInterface {
                name: "tun1020".into()
            }
        );
        assert_eq!(violations.len(), 3);
    }

    #[test]
    fn test_dhcp_interface_alone_is_valid() {
        let d = TunnelDescriptor::new("tun1020", Encapsulation::Gre)
            .with_dhcp_interface("eth0")
            .with_remote(ip(REMOTE_V4));
        assert!(check(&d).is_empty());
    }

    #[test]
    fn test_missing_endpoints() {
        let d = TunnelDescriptor::new("tun5", Encapsulation::Ipip);
        assert_eq!(
            check(&d),
            vec![
                Violation::MissingLocalEndpoint { name: "tun5".into() },
                Violation::MissingRemote { name: "tun5".into() },
            ]
        );
    }

    #[test]
    fn test_erspan_v1_requires_key_not_index() {
        let mut d = v4("tun1070", Encapsulation::Erspan).with_erspan_parameters(ErspanParameters {
            index: Some(20),
            ..Default::default()
        });

        assert_eq!(
            check(&d),
            vec![Violation::KeyRequired {
                name: "tun1070".into(),
                encapsulation: Encapsulation::Erspan,
            }]
        );

        d = d.with_ip_parameters(keyed(77));
        assert!(check(&d).is_empty());
    }

    #[test]
    fn test_ip6erspan_v2_matrix() {
        let d = v6("tun1070", Encapsulation::Ip6erspan);
        assert!(matches!(check(&d).as_slice(), [Violation::KeyRequired { .. }]));

        let d = d.with_ip_parameters(keyed(77)).with_erspan_parameters(ErspanParameters {
            version: 2,
            index: Some(10),
            direction: None,
        });
        assert_eq!(
            check(&d),
            vec![
                Violation::ErspanIndexRequiresVersion1 {
                    name: "tun1070".into()
                },
                Violation::ErspanDirectionRequired {
                    name: "tun1070".into()
                },
            ]
        );

        let mut d = d;
        if let Some(erspan) = d.erspan_parameters.as_mut() {
            erspan.index = None;
        }
        assert_eq!(
            check(&d),
            vec![Violation::ErspanDirectionRequired {
                name: "tun1070".into()
            }]
        );

        if let Some(erspan) = d.erspan_parameters.as_mut() {
            erspan.direction = Some(ErspanDirection::Ingress);
        }
        assert!(check(&d).is_empty());
    }

    #[test]
    fn test_missing_key_reported_before_erspan_checks() {
        let d = v4("tun1070", Encapsulation::Erspan).with_erspan_parameters(ErspanParameters {
            version: 2,
            index: Some(1),
            direction: None,
        });
        let violations = check(&d);
        assert!(matches!(violations[0], Violation::KeyRequired { .. }));
        assert_eq!(violations.len(), 3);
    }

    #[test]
    fn test_erspan_version_and_index_bounds() {
        let d = v4("tun1070", Encapsulation::Erspan)
            .with_ip_parameters(keyed(77))
            .with_erspan_parameters(ErspanParameters {
                version: 3,
                index: Some(MAX_ERSPAN_INDEX + 1),
                direction: None,
            });
        assert_eq!(
            check(&d),
            vec![
                Violation::UnsupportedErspanVersion {
                    name: "tun1070".into(),
                    version: 3
                },
                Violation::ErspanIndexOutOfRange {
                    name: "tun1070".into(),
                    index: MAX_ERSPAN_INDEX + 1
                },
            ]
        );
    }

    #[test]
    fn test_erspan_direction_needs_version_2() {
        let d = v4("tun1070", Encapsulation::Erspan)
            .with_ip_parameters(keyed(77))
            .with_erspan_parameters(ErspanParameters {
                direction: Some(ErspanDirection::Egress),
                ..Default::default()
            });
        assert!(matches!(
            check(&d).as_slice(),
            [Violation::ErspanDirectionRequiresVersion2 { .. }]
        ));
    }

    #[test]
    fn test_ip_parameter_applicability() {
        let d = v4("tun1", Encapsulation::Ipip).with_ip_parameters(keyed(5));
        assert!(matches!(check(&d).as_slice(), [Violation::KeyNotSupported { .. }]));

        let d = v6("tun1", Encapsulation::Ip6gre).with_ip_parameters(IpParameters {
            no_pmtu_discovery: true,
            ..Default::default()
        });
        assert!(matches!(
            check(&d).as_slice(),
            [Violation::PmtuDiscoveryNotSupported { .. }]
        ));

        let d = v4("tun1", Encapsulation::Gre).with_ip_parameters(IpParameters {
            no_pmtu_discovery: true,
            ttl: Some(64),
            ..Default::default()
        });
        assert!(matches!(
            check(&d).as_slice(),
            [Violation::TtlWithoutPmtuDiscovery { ttl: 64, .. }]
        ));

        // scenario from the GRE parameter test
        let d = v4("tun1030", Encapsulation::Gre).with_ip_parameters(IpParameters {
            no_pmtu_discovery: true,
            key: Some(10),
            tos: Some(20),
            ttl: None,
        });
        assert!(check(&d).is_empty());
    }

    #[test]
    fn test_name_rules() {
        let d = v4("eth0", Encapsulation::Gre);
        assert_eq!(
            check(&d),
            vec![
                Violation::InvalidName { name: "eth0".into() },
                Violation::NameCollision {
                    name: "eth0".into(),
                    kind: "ethernet".into()
                },
            ]
        );

        // its own entry in the tunnel section is not a collision
        assert!(check(&v4("tun1000", Encapsulation::Gre)).is_empty());
    }

    #[test]
    fn test_tunnel_names() {
        assert!(is_tunnel_name("tun0"));
        assert!(is_tunnel_name("tun1070"));
        assert!(!is_tunnel_name("tun"));
        assert!(!is_tunnel_name("tunnel1"));
        assert!(!is_tunnel_name("gre0"));
    }

    #[test]
    fn test_mtu_and_addresses() {
        let mut d = v4("tun10", Encapsulation::Ipip)
            .with_mtu(9000)
            .with_address("10.10.200.1/24")
            .with_address("10.10.200.300/24");
        assert_eq!(
            check(&d),
            vec![
                Violation::MtuOutOfRange {
                    name: "tun10".into(),
                    mtu: 9000
                },
                Violation::InvalidAddress {
                    name: "tun10".into(),
                    address: "10.10.200.300/24".into()
                },
            ]
        );

        d.mtu = Some(1476);
        d.addresses.pop();
        let validated = validate(&d, &ConstraintCatalog, &interfaces()).unwrap();
        assert_eq!(validated.addresses(), &["10.10.200.1/24".parse::<IpNet>().unwrap()]);
        assert_eq!(validated.name(), "tun10");
    }

    #[test]
    fn test_violation_messages_name_the_tunnel() {
        let d = v6("tun1000", Encapsulation::Gre);
        let messages: Vec<String> = check(&d).iter().map(|v| v.to_string()).collect();
        assert_eq!(
            messages,
            vec![
                "tun1000: encapsulation gre requires an IPv4 source-address",
                "tun1000: encapsulation gre requires an IPv4 remote address",
            ]
        );
    }
}
