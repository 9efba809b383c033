//! Kernel link surface.
//!
//! [`LinkBackend`] is everything the reconciler and manager need from the
//! network stack. [`ShellLink`] drives iproute2 and parses its JSON output;
//! [`MemoryLink`](crate::memory_link::MemoryLink) keeps the same state in
//! memory for tests.

use std::net::IpAddr;

use async_trait::async_trait;
use cfgmgr_common::{shell, CfgMgrError, CfgMgrResult};
use ipnet::IpNet;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::info;

use crate::commands::*;
use crate::types::{DeviceKind, ErspanDirection, GreKey, KernelTunnelParams};

/// Live state of one interface.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LinkSnapshot {
    /// `info_kind`; `None` for devices without link info (e.g. loopback)
    pub kind: Option<String>,
    /// Tunnel attributes, present only for tunnel kinds
    pub tunnel: Option<KernelTunnelParams>,
    pub alias: Option<String>,
    pub admin_up: bool,
}

impl LinkSnapshot {
    pub fn is_tunnel(&self) -> bool {
        self.tunnel.is_some()
    }
}

/// Operations on kernel network interfaces.
///
/// Queries return `Ok(None)` for an interface that does not exist; every
/// other failure is an error.
#[async_trait]
pub trait LinkBackend: Send + Sync {
    async fn query(&self, name: &str) -> CfgMgrResult<Option<LinkSnapshot>>;

    /// Names of every live interface with a tunnel kind
    async fn list_tunnels(&self) -> CfgMgrResult<Vec<String>>;

    async fn create(&self, name: &str, params: &KernelTunnelParams) -> CfgMgrResult<()>;

    /// Changes tunnel attributes in place; the MTU is left alone.
    async fn modify(&self, name: &str, params: &KernelTunnelParams) -> CfgMgrResult<()>;

    async fn set_mtu(&self, name: &str, mtu: u32) -> CfgMgrResult<()>;

    async fn delete(&self, name: &str) -> CfgMgrResult<()>;

    async fn set_admin_state(&self, name: &str, up: bool) -> CfgMgrResult<()>;

    async fn set_alias(&self, name: &str, alias: Option<&str>) -> CfgMgrResult<()>;

    /// Interface addresses, excluding IPv6 link-local ones
    async fn addresses(&self, name: &str) -> CfgMgrResult<Vec<IpNet>>;

    async fn add_address(&self, name: &str, addr: &IpNet) -> CfgMgrResult<()>;

    async fn del_address(&self, name: &str, addr: &IpNet) -> CfgMgrResult<()>;
}

/// One element of `ip -d -j link show`
#[derive(Debug, Deserialize)]
struct IpLink {
    ifname: String,
    #[serde(default)]
    flags: Vec<String>,
    #[serde(default)]
    mtu: u32,
    #[serde(default)]
    ifalias: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    linkinfo: Option<IpLinkInfo>,
}

#[derive(Debug, Deserialize)]
struct IpLinkInfo {
    info_kind: Option<String>,
    #[serde(default)]
    info_data: Option<Map<String, Value>>,
}

/// One element of `ip -j addr show`
#[derive(Debug, Deserialize)]
struct IpAddrEntry {
    #[serde(default)]
    addr_info: Vec<IpAddrInfo>,
}

#[derive(Debug, Deserialize)]
struct IpAddrInfo {
    local: IpAddr,
    prefixlen: u8,
    #[serde(default)]
    scope: Option<String>,
}

fn parse_json<T: serde::de::DeserializeOwned>(cmd: &str, output: &str) -> CfgMgrResult<T> {
    serde_json::from_str(output).map_err(|e| CfgMgrError::unexpected_output(cmd, e.to_string()))
}

/// Endpoint address; iproute2 prints `any` for a wildcard.
fn endpoint(data: &Map<String, Value>, field: &str) -> Option<IpAddr> {
    data.get(field)?.as_str()?.parse().ok()
}

/// `tos`/`tclass`: `"0x14"`, `"inherit"` (1) or a plain number.
fn dsfield(data: &Map<String, Value>, field: &str) -> Option<u8> {
    let value = match data.get(field)? {
        Value::Number(n) => n.as_u64().and_then(|n| u8::try_from(n).ok()),
        Value::String(s) if s == "inherit" => Some(1),
        Value::String(s) => {
            let hex = s.trim_start_matches("0x");
            u8::from_str_radix(hex, 16).ok()
        }
        _ => None,
    }?;
    (value != 0).then_some(value)
}

/// `ttl`/`hoplimit`: a number, or `inherit` for 0.
fn hop_limit(data: &Map<String, Value>) -> u8 {
    ["ttl", "hoplimit"]
        .into_iter()
        .find_map(|field| data.get(field))
        .and_then(Value::as_u64)
        .and_then(|n| u8::try_from(n).ok())
        .unwrap_or(0)
}

fn flag(data: &Map<String, Value>, field: &str) -> bool {
    data.get(field).and_then(Value::as_bool).unwrap_or(false)
}

fn tunnel_params(
    kind: DeviceKind,
    mtu: u32,
    data: &Map<String, Value>,
    fallback_link: Option<&str>,
) -> KernelTunnelParams {
    let mut params = KernelTunnelParams::new(kind, mtu);
    params.local = endpoint(data, "local");
    params.remote = endpoint(data, "remote");
    params.ttl = hop_limit(data);
    params.tos = dsfield(data, if kind.is_ipv6() { "tclass" } else { "tos" });

    if kind == DeviceKind::Ip6tnl {
        params.proto = data.get("proto").and_then(Value::as_str).map(str::to_string);
    }
    if !kind.is_ipv6() {
        let pmtudisc = match data.get("pmtudisc") {
            Some(v) => v.as_bool().unwrap_or(true),
            None => !data.contains_key("nopmtudisc"),
        };
        params.pmtudisc = Some(pmtudisc);
    }

    if kind.is_gre() {
        let key = |field: &str| {
            data.get(field)
                .and_then(Value::as_str)
                .and_then(|s| s.parse::<GreKey>().ok())
        };
        params.ikey = key("ikey");
        params.okey = key("okey");
        params.iseq = flag(data, "iseq");
        params.oseq = flag(data, "oseq");
    }

    params.erspan_ver = data
        .get("erspan_ver")
        .and_then(Value::as_u64)
        .and_then(|v| u8::try_from(v).ok());
    params.erspan_index = data
        .get("erspan_index")
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok());
    params.erspan_dir = data
        .get("erspan_dir")
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<ErspanDirection>().ok());

    params.link = data
        .get("link")
        .and_then(Value::as_str)
        .or(fallback_link)
        .map(str::to_string);

    params
}

impl From<IpLink> for LinkSnapshot {
    fn from(link: IpLink) -> Self {
        let kind = link.linkinfo.as_ref().and_then(|li| li.info_kind.clone());
        let empty = Map::new();
        let data = link
            .linkinfo
            .as_ref()
            .and_then(|li| li.info_data.as_ref())
            .unwrap_or(&empty);

        let tunnel = kind
            .as_deref()
            .and_then(DeviceKind::from_kind)
            .map(|k| tunnel_params(k, link.mtu, data, link.link.as_deref()));

        LinkSnapshot {
            kind,
            tunnel,
            alias: link.ifalias.filter(|a| !a.is_empty()),
            admin_up: link.flags.iter().any(|f| f == "UP"),
        }
    }
}

/// Parses the output of `ip -d -j link show dev NAME`.
pub fn parse_link_show(cmd: &str, output: &str) -> CfgMgrResult<Option<LinkSnapshot>> {
    let links: Vec<IpLink> = parse_json(cmd, output)?;
    Ok(links.into_iter().next().map(LinkSnapshot::from))
}

/// Parses the output of `ip -d -j link show` into tunnel-kind names.
pub fn parse_tunnel_names(cmd: &str, output: &str) -> CfgMgrResult<Vec<String>> {
    let links: Vec<IpLink> = parse_json(cmd, output)?;
    Ok(links
        .into_iter()
        .filter(|link| {
            link.linkinfo
                .as_ref()
                .and_then(|li| li.info_kind.as_deref())
                .and_then(DeviceKind::from_kind)
                .is_some()
        })
        .map(|link| link.ifname)
        .collect())
}

/// Parses the output of `ip -j addr show dev NAME`.
pub fn parse_addr_show(cmd: &str, output: &str) -> CfgMgrResult<Vec<IpNet>> {
    let entries: Vec<IpAddrEntry> = parse_json(cmd, output)?;
    entries
        .into_iter()
        .flat_map(|entry| entry.addr_info)
        .filter(|info| !(info.local.is_ipv6() && info.scope.as_deref() == Some("link")))
        .map(|info| {
            IpNet::new(info.local, info.prefixlen)
                .map_err(|e| CfgMgrError::unexpected_output(cmd, e.to_string()))
        })
        .collect()
}

fn is_missing_device(output: &str) -> bool {
    output.contains("does not exist") || output.contains("Cannot find device")
}

/// iproute2-backed link surface.
///
/// In dry-run mode queries still run, so plans reflect the live system,
/// while mutating commands are only logged and recorded.
#[derive(Debug, Default)]
pub struct ShellLink {
    dry_run: bool,
    captured: Mutex<Vec<String>>,
}

impl ShellLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dry_run() -> Self {
        Self {
            dry_run: true,
            captured: Mutex::new(Vec::new()),
        }
    }

    /// Mutating commands recorded in dry-run mode
    pub fn captured_commands(&self) -> Vec<String> {
        self.captured.lock().clone()
    }

    async fn run(&self, cmd: String) -> CfgMgrResult<()> {
        if self.dry_run {
            info!(command = %cmd, "dry-run");
            self.captured.lock().push(cmd);
            return Ok(());
        }
        shell::exec_or_throw(&cmd).await.map(|_| ())
    }

    /// Runs a query; `Ok(None)` when the device does not exist.
    async fn query_output(&self, cmd: &str) -> CfgMgrResult<Option<String>> {
        let result = shell::exec(cmd).await?;
        if result.success() {
            return Ok(Some(result.stdout));
        }
        if is_missing_device(&result.combined_output()) {
            return Ok(None);
        }
        Err(result.into_error(cmd))
    }
}

#[async_trait]
impl LinkBackend for ShellLink {
    async fn query(&self, name: &str) -> CfgMgrResult<Option<LinkSnapshot>> {
        let cmd = build_show_link_cmd(name);
        match self.query_output(&cmd).await? {
            Some(output) => parse_link_show(&cmd, &output),
            None => Ok(None),
        }
    }

    async fn list_tunnels(&self) -> CfgMgrResult<Vec<String>> {
        let cmd = build_list_links_cmd();
        let output = shell::exec_or_throw(&cmd).await?;
        parse_tunnel_names(&cmd, &output)
    }

    async fn create(&self, name: &str, params: &KernelTunnelParams) -> CfgMgrResult<()> {
        self.run(build_add_link_cmd(name, params)).await
    }

    async fn modify(&self, name: &str, params: &KernelTunnelParams) -> CfgMgrResult<()> {
        self.run(build_set_link_type_cmd(name, params)).await
    }

    async fn set_mtu(&self, name: &str, mtu: u32) -> CfgMgrResult<()> {
        self.run(build_set_mtu_cmd(name, mtu)).await
    }

    async fn delete(&self, name: &str) -> CfgMgrResult<()> {
        self.run(build_del_link_cmd(name)).await
    }

    async fn set_admin_state(&self, name: &str, up: bool) -> CfgMgrResult<()> {
        self.run(build_set_admin_state_cmd(name, up)).await
    }

    async fn set_alias(&self, name: &str, alias: Option<&str>) -> CfgMgrResult<()> {
        self.run(build_set_alias_cmd(name, alias)).await
    }

    async fn addresses(&self, name: &str) -> CfgMgrResult<Vec<IpNet>> {
        let cmd = build_show_addr_cmd(name);
        match self.query_output(&cmd).await? {
            Some(output) => parse_addr_show(&cmd, &output),
            None => Ok(Vec::new()),
        }
    }

    async fn add_address(&self, name: &str, addr: &IpNet) -> CfgMgrResult<()> {
        self.run(build_add_addr_cmd(name, addr)).await
    }

    async fn del_address(&self, name: &str, addr: &IpNet) -> CfgMgrResult<()> {
        self.run(build_del_addr_cmd(name, addr)).await
    }
}
