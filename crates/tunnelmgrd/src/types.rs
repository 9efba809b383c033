//! Tunnel type definitions and constants

use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TunnelError;

/// Default base device MTU used when deriving the tunnel MTU
pub const DEFAULT_BASE_MTU: u32 = 1500;

/// Smallest MTU accepted for a tunnel interface
pub const MIN_TUNNEL_MTU: u32 = 64;

/// Largest MTU accepted for a tunnel interface
pub const MAX_TUNNEL_MTU: u32 = 8024;

/// ERSPAN v1 session index is a 20-bit field
pub const MAX_ERSPAN_INDEX: u32 = (1 << 20) - 1;

/// Default ERSPAN header version
pub const DEFAULT_ERSPAN_VERSION: u8 = 1;

/// Configured encapsulation of a tunnel interface.
///
/// This is the user-facing value. Several encapsulations may share one
/// kernel device kind (see [`DeviceKind`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Encapsulation {
    Ipip,
    Sit,
    Gre,
    Gretap,
    Ipip6,
    Ip6ip6,
    Ip6gre,
    Ip6gretap,
    Erspan,
    Ip6erspan,
}

impl Encapsulation {
    /// Every supported encapsulation
    pub const ALL: [Encapsulation; 10] = [
        Encapsulation::Ipip,
        Encapsulation::Sit,
        Encapsulation::Gre,
        Encapsulation::Gretap,
        Encapsulation::Ipip6,
        Encapsulation::Ip6ip6,
        Encapsulation::Ip6gre,
        Encapsulation::Ip6gretap,
        Encapsulation::Erspan,
        Encapsulation::Ip6erspan,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Encapsulation::Ipip => "ipip",
            Encapsulation::Sit => "sit",
            Encapsulation::Gre => "gre",
            Encapsulation::Gretap => "gretap",
            Encapsulation::Ipip6 => "ipip6",
            Encapsulation::Ip6ip6 => "ip6ip6",
            Encapsulation::Ip6gre => "ip6gre",
            Encapsulation::Ip6gretap => "ip6gretap",
            Encapsulation::Erspan => "erspan",
            Encapsulation::Ip6erspan => "ip6erspan",
        }
    }
}

impl fmt::Display for Encapsulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Encapsulation {
    type Err = TunnelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Encapsulation::ALL
            .into_iter()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| TunnelError::UnknownEncapsulation(s.to_string()))
    }
}

/// Kernel link kind (`info_kind`) of a tunnel device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Ipip,
    Sit,
    Gre,
    Gretap,
    Ip6tnl,
    Ip6gre,
    Ip6gretap,
    Erspan,
    Ip6erspan,
}

impl DeviceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceKind::Ipip => "ipip",
            DeviceKind::Sit => "sit",
            DeviceKind::Gre => "gre",
            DeviceKind::Gretap => "gretap",
            DeviceKind::Ip6tnl => "ip6tnl",
            DeviceKind::Ip6gre => "ip6gre",
            DeviceKind::Ip6gretap => "ip6gretap",
            DeviceKind::Erspan => "erspan",
            DeviceKind::Ip6erspan => "ip6erspan",
        }
    }

    /// Parses an `info_kind` string; `None` for non-tunnel kinds.
    pub fn from_kind(kind: &str) -> Option<Self> {
        let kind = match kind {
            "ipip" => DeviceKind::Ipip,
            "sit" => DeviceKind::Sit,
            "gre" => DeviceKind::Gre,
            "gretap" => DeviceKind::Gretap,
            "ip6tnl" => DeviceKind::Ip6tnl,
            "ip6gre" => DeviceKind::Ip6gre,
            "ip6gretap" => DeviceKind::Ip6gretap,
            "erspan" => DeviceKind::Erspan,
            "ip6erspan" => DeviceKind::Ip6erspan,
            _ => return None,
        };
        Some(kind)
    }

    /// True for kinds that carry a GRE header (keys and sequencing)
    pub fn is_gre(&self) -> bool {
        !matches!(self, DeviceKind::Ipip | DeviceKind::Sit | DeviceKind::Ip6tnl)
    }

    /// True for kinds whose endpoints are IPv6 addresses
    pub fn is_ipv6(&self) -> bool {
        matches!(
            self,
            DeviceKind::Ip6tnl | DeviceKind::Ip6gre | DeviceKind::Ip6gretap | DeviceKind::Ip6erspan
        )
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// IP address family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressFamily {
    V4,
    V6,
}

impl AddressFamily {
    pub fn of(addr: &IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => AddressFamily::V4,
            IpAddr::V6(_) => AddressFamily::V6,
        }
    }

    pub fn matches(&self, addr: &IpAddr) -> bool {
        AddressFamily::of(addr) == *self
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressFamily::V4 => f.write_str("IPv4"),
            AddressFamily::V6 => f.write_str("IPv6"),
        }
    }
}

/// Direction of mirrored traffic carried in an ERSPAN v2 header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErspanDirection {
    Ingress,
    Egress,
}

impl ErspanDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErspanDirection::Ingress => "ingress",
            ErspanDirection::Egress => "egress",
        }
    }
}

impl fmt::Display for ErspanDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErspanDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ingress" => Ok(ErspanDirection::Ingress),
            "egress" => Ok(ErspanDirection::Egress),
            other => Err(format!("invalid ERSPAN direction: {}", other)),
        }
    }
}

/// 32-bit GRE key.
///
/// The kernel tunnel ABI carries keys in network byte order and iproute2
/// renders them as a dotted quad, so key 10 is `0.0.0.10` and key 256 is
/// `0.0.1.0`. Both forms are accepted when parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct GreKey(pub u32);

impl GreKey {
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for GreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Ipv4Addr::from(self.0))
    }
}

impl FromStr for GreKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(quad) = s.parse::<Ipv4Addr>() {
            return Ok(GreKey(u32::from(quad)));
        }
        s.parse::<u32>()
            .map(GreKey)
            .map_err(|_| format!("invalid GRE key: {}", s))
    }
}

impl From<GreKey> for String {
    fn from(key: GreKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for GreKey {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// `parameters ip` of a tunnel
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IpParameters {
    pub no_pmtu_discovery: bool,
    pub key: Option<u32>,
    pub tos: Option<u8>,
    pub ttl: Option<u8>,
}

/// `parameters erspan` of a tunnel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErspanParameters {
    pub version: u8,
    pub index: Option<u32>,
    pub direction: Option<ErspanDirection>,
}

impl Default for ErspanParameters {
    fn default() -> Self {
        Self {
            version: DEFAULT_ERSPAN_VERSION,
            index: None,
            direction: None,
        }
    }
}

/// Declarative description of one tunnel interface.
///
/// Built fresh from the configuration tree on every commit pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelDescriptor {
    pub name: String,
    pub encapsulation: Encapsulation,
    pub source_address: Option<IpAddr>,
    pub remote_address: Option<IpAddr>,
    pub source_interface: Option<String>,
    pub dhcp_interface: Option<String>,
    pub ip_parameters: Option<IpParameters>,
    pub erspan_parameters: Option<ErspanParameters>,
    /// Explicit MTU; derived from the base MTU when absent
    pub mtu: Option<u32>,
    /// Interface addresses in CIDR notation, as configured
    pub addresses: Vec<String>,
    pub description: Option<String>,
    pub disable: bool,
}

impl TunnelDescriptor {
    /// Create a descriptor with only name and encapsulation set
    pub fn new(name: impl Into<String>, encapsulation: Encapsulation) -> Self {
        Self {
            name: name.into(),
            encapsulation,
            source_address: None,
            remote_address: None,
            source_interface: None,
            dhcp_interface: None,
            ip_parameters: None,
            erspan_parameters: None,
            mtu: None,
            addresses: Vec::new(),
            description: None,
            disable: false,
        }
    }

    /// Set the local endpoint address (builder pattern)
    pub fn with_source_address(mut self, addr: IpAddr) -> Self {
        self.source_address = Some(addr);
        self
    }

    /// Set the remote endpoint address (builder pattern)
    pub fn with_remote(mut self, addr: IpAddr) -> Self {
        self.remote_address = Some(addr);
        self
    }

    /// Bind the tunnel to an outgoing interface (builder pattern)
    pub fn with_source_interface(mut self, ifname: impl Into<String>) -> Self {
        self.source_interface = Some(ifname.into());
        self
    }

    /// Take the local address from a DHCP client interface (builder pattern)
    pub fn with_dhcp_interface(mut self, ifname: impl Into<String>) -> Self {
        self.dhcp_interface = Some(ifname.into());
        self
    }

    /// Set `parameters ip` (builder pattern)
    pub fn with_ip_parameters(mut self, params: IpParameters) -> Self {
        self.ip_parameters = Some(params);
        self
    }

    /// Set `parameters erspan` (builder pattern)
    pub fn with_erspan_parameters(mut self, params: ErspanParameters) -> Self {
        self.erspan_parameters = Some(params);
        self
    }

    /// Override the derived MTU (builder pattern)
    pub fn with_mtu(mut self, mtu: u32) -> Self {
        self.mtu = Some(mtu);
        self
    }

    /// Add an interface address (builder pattern)
    pub fn with_address(mut self, cidr: impl Into<String>) -> Self {
        self.addresses.push(cidr.into());
        self
    }

    /// Configured GRE key, if any
    pub fn key(&self) -> Option<u32> {
        self.ip_parameters.as_ref().and_then(|p| p.key)
    }
}

/// Attribute set of a kernel tunnel device.
///
/// This is both what the compiler produces and what a query of a live
/// interface returns, so the two can be compared directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelTunnelParams {
    pub kind: DeviceKind,
    /// ip6tnl mode (`ipip6` or `ip6ip6`)
    pub proto: Option<String>,
    /// Local endpoint; `None` means "any"
    pub local: Option<IpAddr>,
    pub remote: Option<IpAddr>,
    /// 0 inherits the TTL of the inner packet
    pub ttl: u8,
    /// `None` leaves the TOS/traffic class at the kernel default
    pub tos: Option<u8>,
    /// Only reported by IPv4 kinds
    pub pmtudisc: Option<bool>,
    pub ikey: Option<GreKey>,
    pub okey: Option<GreKey>,
    pub iseq: bool,
    pub oseq: bool,
    pub erspan_ver: Option<u8>,
    pub erspan_index: Option<u32>,
    pub erspan_dir: Option<ErspanDirection>,
    /// Bound outgoing interface
    pub link: Option<String>,
    pub mtu: u32,
}

impl KernelTunnelParams {
    /// Parameters of a bare tunnel of `kind` with everything else unset
    pub fn new(kind: DeviceKind, mtu: u32) -> Self {
        Self {
            kind,
            proto: None,
            local: None,
            remote: None,
            ttl: 0,
            tos: None,
            pmtudisc: None,
            ikey: None,
            okey: None,
            iseq: false,
            oseq: false,
            erspan_ver: None,
            erspan_index: None,
            erspan_dir: None,
            link: None,
            mtu,
        }
    }

    /// True when every attribute except the MTU matches
    pub fn same_tunnel_attrs(&self, other: &KernelTunnelParams) -> bool {
        let mut rhs = other.clone();
        rhs.mtu = self.mtu;
        *self == rhs
    }
}
