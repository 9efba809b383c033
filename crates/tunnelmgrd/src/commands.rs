//! Shell command builders for tunnel operations
//!
//! iproute2 parses `tos`/`tclass` as hexadecimal, so both are always
//! rendered as `0x..`.

use cfgmgr_common::shell::{CommandLine, IP_CMD};
use ipnet::IpNet;

use crate::types::KernelTunnelParams;

fn ip() -> CommandLine {
    CommandLine::new(IP_CMD)
}

fn endpoint(addr: Option<std::net::IpAddr>) -> String {
    addr.map(|a| a.to_string()).unwrap_or_else(|| "any".to_string())
}

/// Appends `type <kind>` and every tunnel attribute except the MTU.
///
/// Unset keys are rendered as `noikey nookey` so that the same arguments
/// can clear a key on an existing device.
fn with_tunnel_attrs(cmd: CommandLine, params: &KernelTunnelParams) -> CommandLine {
    let kind = params.kind;
    let mut cmd = cmd
        .args(["type", kind.as_str()])
        .option_if("mode", params.proto.as_deref())
        .option("local", endpoint(params.local))
        .option("remote", endpoint(params.remote))
        .arg("ttl")
        .arg(params.ttl)
        .arg(if kind.is_ipv6() { "tclass" } else { "tos" })
        .arg(format!("0x{:02x}", params.tos.unwrap_or(0)));

    if let Some(pmtudisc) = params.pmtudisc {
        cmd = cmd.arg(if pmtudisc { "pmtudisc" } else { "nopmtudisc" });
    }

    if kind.is_gre() {
        cmd = match params.ikey {
            Some(key) => cmd.option("ikey", key.to_string()),
            None => cmd.arg("noikey"),
        };
        cmd = match params.okey {
            Some(key) => cmd.option("okey", key.to_string()),
            None => cmd.arg("nookey"),
        };
        cmd = cmd.flag_if("iseq", params.iseq).flag_if("oseq", params.oseq);
    }

    if let Some(version) = params.erspan_ver {
        cmd = cmd.arg("erspan_ver").arg(version);
        if let Some(index) = params.erspan_index {
            cmd = cmd.arg("erspan").arg(index);
        }
        if let Some(dir) = params.erspan_dir {
            cmd = cmd.arg("erspan_dir").arg(dir);
        }
    }

    cmd.option_if("dev", params.link.as_deref())
}

/// Build tunnel interface creation command
///
/// `ip link add dev NAME mtu N type KIND ...`
pub fn build_add_link_cmd(name: &str, params: &KernelTunnelParams) -> String {
    let cmd = ip()
        .args(["link", "add", "dev"])
        .quoted(name)
        .arg("mtu")
        .arg(params.mtu);
    with_tunnel_attrs(cmd, params).to_string()
}

/// Build in-place tunnel attribute update command
pub fn build_set_link_type_cmd(name: &str, params: &KernelTunnelParams) -> String {
    let cmd = ip().args(["link", "set", "dev"]).quoted(name);
    with_tunnel_attrs(cmd, params).to_string()
}

pub fn build_set_mtu_cmd(name: &str, mtu: u32) -> String {
    ip().args(["link", "set", "dev"])
        .quoted(name)
        .arg("mtu")
        .arg(mtu)
        .to_string()
}

pub fn build_del_link_cmd(name: &str) -> String {
    ip().args(["link", "del", "dev"]).quoted(name).to_string()
}

/// Build detailed JSON query of one interface
pub fn build_show_link_cmd(name: &str) -> String {
    ip().args(["-d", "-j", "link", "show", "dev"])
        .quoted(name)
        .to_string()
}

/// Build detailed JSON query of every interface
pub fn build_list_links_cmd() -> String {
    ip().args(["-d", "-j", "link", "show"]).to_string()
}

pub fn build_set_admin_state_cmd(name: &str, up: bool) -> String {
    ip().args(["link", "set", "dev"])
        .quoted(name)
        .arg(if up { "up" } else { "down" })
        .to_string()
}

/// Build interface alias command; an empty alias clears it
pub fn build_set_alias_cmd(name: &str, alias: Option<&str>) -> String {
    ip().args(["link", "set", "dev"])
        .quoted(name)
        .option("alias", alias.unwrap_or(""))
        .to_string()
}

pub fn build_show_addr_cmd(name: &str) -> String {
    ip().args(["-j", "addr", "show", "dev"])
        .quoted(name)
        .to_string()
}

pub fn build_add_addr_cmd(name: &str, addr: &IpNet) -> String {
    ip().args(["addr", "add"])
        .quoted(addr.to_string())
        .arg("dev")
        .quoted(name)
        .to_string()
}

pub fn build_del_addr_cmd(name: &str, addr: &IpNet) -> String {
    ip().args(["addr", "del"])
        .quoted(addr.to_string())
        .arg("dev")
        .quoted(name)
        .to_string()
}
