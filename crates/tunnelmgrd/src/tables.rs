//! Configuration tree paths and node names for tunnelmgrd

/// Tree path of the tunnel interface section
pub const CFG_TUNNEL_PATH: &[&str] = &["interfaces", "tunnel"];

/// Interface kind under `interfaces` handled by this daemon
pub const CFG_TUNNEL_KIND: &str = "tunnel";

/// Tunnel interface node fields
pub mod tunnel_fields {
    pub const ENCAPSULATION: &str = "encapsulation";
    pub const SOURCE_ADDRESS: &str = "source-address";
    pub const REMOTE: &str = "remote";
    pub const SOURCE_INTERFACE: &str = "source-interface";
    pub const DHCP_INTERFACE: &str = "dhcp-interface";
    pub const PARAMETERS: &str = "parameters";
    pub const MTU: &str = "mtu";
    pub const ADDRESS: &str = "address";
    pub const DESCRIPTION: &str = "description";
    pub const DISABLE: &str = "disable";
}

/// `parameters ip` fields
pub mod ip_fields {
    pub const NO_PMTU_DISCOVERY: &str = "no-pmtu-discovery";
    pub const KEY: &str = "key";
    pub const TOS: &str = "tos";
    pub const TTL: &str = "ttl";
}

/// `parameters erspan` fields
pub mod erspan_fields {
    pub const VERSION: &str = "version";
    pub const INDEX: &str = "index";
    pub const DIRECTION: &str = "direction";
}
