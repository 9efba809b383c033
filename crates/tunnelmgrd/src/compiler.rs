//! Parameter compiler: validated descriptor -> kernel tunnel attributes.

use crate::types::{GreKey, KernelTunnelParams, DEFAULT_BASE_MTU};
use crate::validator::ValidatedDescriptor;

/// Compiles with the default base device MTU.
pub fn compile(validated: &ValidatedDescriptor) -> KernelTunnelParams {
    compile_with_base_mtu(validated, DEFAULT_BASE_MTU)
}

/// Compiles a validated descriptor into the attribute set of its device.
///
/// The local address of a `dhcp-interface` tunnel is left unset; it is
/// only known at apply time.
pub fn compile_with_base_mtu(validated: &ValidatedDescriptor, base_mtu: u32) -> KernelTunnelParams {
    let d = validated.descriptor();
    let profile = validated.profile();
    let ip = d.ip_parameters.clone().unwrap_or_default();
    let key = ip.key;
    let erspan = profile
        .erspan
        .then(|| d.erspan_parameters.clone().unwrap_or_default());

    let mtu = d.mtu.unwrap_or_else(|| {
        let overhead = profile.header_overhead(key.is_some(), erspan.as_ref().map(|e| e.version));
        base_mtu.saturating_sub(overhead)
    });

    let mut params = KernelTunnelParams::new(profile.kind, mtu);
    params.proto = profile.proto.map(str::to_string);
    params.local = if d.dhcp_interface.is_some() {
        None
    } else {
        d.source_address
    };
    params.remote = d.remote_address;
    params.ttl = ip.ttl.unwrap_or(0);
    // tos 0 is what the kernel reports for "inherit nothing"
    params.tos = ip.tos.filter(|tos| *tos != 0);

    if profile.pmtudisc_supported {
        params.pmtudisc = Some(!ip.no_pmtu_discovery);
    }

    if profile.key_supported {
        params.ikey = key.map(GreKey);
        params.okey = key.map(GreKey);
    }

    if let Some(erspan) = erspan {
        params.iseq = true;
        params.oseq = true;
        params.erspan_ver = Some(erspan.version);
        match erspan.version {
            1 => params.erspan_index = Some(erspan.index.unwrap_or(0)),
            _ => params.erspan_dir = erspan.direction,
        }
    }

    if profile.allows_source_interface {
        params.link = d.source_interface.clone();
    }

    params
}
