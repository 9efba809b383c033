//! Constraint catalog: per-encapsulation rules and kernel mapping.
//!
//! The catalog is a pure lookup. Adding an encapsulation means adding an
//! [`Encapsulation`] variant and one arm in [`ConstraintCatalog::profile`];
//! the compiler rejects a non-exhaustive match.

use crate::types::{AddressFamily, DeviceKind, Encapsulation};

/// Extra header bytes when a GRE key is present
pub const GRE_KEY_OVERHEAD: u32 = 4;

/// ERSPAN type III header (v2) is 12 bytes against 8 for type II (v1)
pub const ERSPAN_V2_EXTRA_OVERHEAD: u32 = 4;

/// Everything the validator and compiler need to know about one encapsulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncapProfile {
    /// Family required for both endpoints
    pub family: AddressFamily,
    /// Kernel `info_kind`
    pub kind: DeviceKind,
    /// ip6tnl mode, preserving the configured encapsulation
    pub proto: Option<&'static str>,
    /// Whether `source-interface` may be used
    pub allows_source_interface: bool,
    /// Whether `parameters ip key` is mandatory
    pub key_required: bool,
    /// Whether a GRE key can be configured at all
    pub key_supported: bool,
    /// Whether the kind carries a path-MTU-discovery flag
    pub pmtudisc_supported: bool,
    /// ERSPAN header and sequencing apply
    pub erspan: bool,
    /// Header bytes subtracted from the base MTU
    pub overhead: u32,
}

impl EncapProfile {
    /// Total overhead given whether a key is configured and, for ERSPAN,
    /// the header version (v1 when unset).
    ///
    /// ERSPAN overhead already accounts for the mandatory key.
    pub fn header_overhead(&self, keyed: bool, erspan_version: Option<u8>) -> u32 {
        if self.erspan {
            match erspan_version {
                Some(2) => self.overhead + ERSPAN_V2_EXTRA_OVERHEAD,
                _ => self.overhead,
            }
        } else if keyed && self.key_supported {
            self.overhead + GRE_KEY_OVERHEAD
        } else {
            self.overhead
        }
    }
}

/// Static table of encapsulation constraints.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstraintCatalog;

impl ConstraintCatalog {
    pub fn new() -> Self {
        Self
    }

    /// Looks up the profile of an encapsulation.
    pub fn profile(&self, encap: Encapsulation) -> EncapProfile {
        use AddressFamily::{V4, V6};

        let (family, kind, allows_source_interface, overhead) = match encap {
            // outer IPv4
            Encapsulation::Ipip => (V4, DeviceKind::Ipip, true, 20),
            Encapsulation::Sit => (V4, DeviceKind::Sit, false, 20),
            Encapsulation::Gre => (V4, DeviceKind::Gre, true, 24),
            Encapsulation::Gretap => (V4, DeviceKind::Gretap, false, 38),
            // IPv4 + GRE(key, seq) + ERSPAN v1 header + inner Ethernet; v2 adds 4
            Encapsulation::Erspan => (V4, DeviceKind::Erspan, true, 54),
            // outer IPv6
            Encapsulation::Ipip6 => (V6, DeviceKind::Ip6tnl, true, 40),
            Encapsulation::Ip6ip6 => (V6, DeviceKind::Ip6tnl, true, 40),
            Encapsulation::Ip6gre => (V6, DeviceKind::Ip6gre, true, 44),
            Encapsulation::Ip6gretap => (V6, DeviceKind::Ip6gretap, false, 58),
            Encapsulation::Ip6erspan => (V6, DeviceKind::Ip6erspan, true, 74),
        };

        let erspan = matches!(encap, Encapsulation::Erspan | Encapsulation::Ip6erspan);
        let key_supported = matches!(
            kind,
            DeviceKind::Gre
                | DeviceKind::Gretap
                | DeviceKind::Ip6gre
                | DeviceKind::Ip6gretap
                | DeviceKind::Erspan
                | DeviceKind::Ip6erspan
        );
        let proto = match encap {
            Encapsulation::Ipip6 => Some("ipip6"),
            Encapsulation::Ip6ip6 => Some("ip6ip6"),
            _ => None,
        };

        EncapProfile {
            family,
            kind,
            proto,
            allows_source_interface,
            key_required: erspan,
            key_supported,
            pmtudisc_supported: family == V4,
            erspan,
            overhead,
        }
    }
}
