//! In-memory link backend.
//!
//! Behaves like the kernel for the operations tunnelmgrd issues: creating
//! an existing name fails, modifying or deleting a missing one fails, and
//! every mutation is recorded as the iproute2 command the shell backend
//! would have run.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use cfgmgr_common::{CfgMgrError, CfgMgrResult};
use ipnet::IpNet;
use parking_lot::Mutex;

use crate::commands::*;
use crate::link::{LinkBackend, LinkSnapshot};
use crate::types::KernelTunnelParams;

#[derive(Debug, Clone)]
struct MemoryInterface {
    kind: String,
    tunnel: Option<KernelTunnelParams>,
    alias: Option<String>,
    admin_up: bool,
    addresses: Vec<IpNet>,
}

impl MemoryInterface {
    fn snapshot(&self) -> LinkSnapshot {
        LinkSnapshot {
            kind: Some(self.kind.clone()),
            tunnel: self.tunnel.clone(),
            alias: self.alias.clone(),
            admin_up: self.admin_up,
        }
    }
}

/// Kernel interface table kept in memory.
#[derive(Debug, Default)]
pub struct MemoryLink {
    interfaces: Mutex<BTreeMap<String, MemoryInterface>>,
    commands: Mutex<Vec<String>>,
    failing: Mutex<HashSet<String>>,
}

fn rejected(command: String, output: &str) -> CfgMgrError {
    CfgMgrError::ShellCommandFailed {
        command,
        exit_code: 2,
        output: output.to_string(),
    }
}

impl MemoryLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a non-tunnel interface such as a dummy or ethernet device.
    pub fn with_interface(self, name: &str, kind: &str) -> Self {
        self.interfaces.lock().insert(
            name.to_string(),
            MemoryInterface {
                kind: kind.to_string(),
                tunnel: None,
                alias: None,
                admin_up: true,
                addresses: Vec::new(),
            },
        );
        self
    }

    /// Adds a tunnel that exists before the first commit.
    pub fn with_tunnel(self, name: &str, params: KernelTunnelParams) -> Self {
        self.interfaces.lock().insert(
            name.to_string(),
            MemoryInterface {
                kind: params.kind.to_string(),
                tunnel: Some(params),
                alias: None,
                admin_up: true,
                addresses: Vec::new(),
            },
        );
        self
    }

    /// Replaces the addresses of an existing interface without recording a
    /// command, e.g. a DHCP lease arriving.
    pub fn assign_addresses(&self, name: &str, addrs: Vec<IpNet>) {
        if let Some(intf) = self.interfaces.lock().get_mut(name) {
            intf.addresses = addrs;
        }
    }

    /// Makes every mutation on `name` fail.
    pub fn fail_on(&self, name: &str) {
        self.failing.lock().insert(name.to_string());
    }

    pub fn tunnel(&self, name: &str) -> Option<KernelTunnelParams> {
        self.interfaces.lock().get(name).and_then(|i| i.tunnel.clone())
    }

    pub fn snapshot(&self, name: &str) -> Option<LinkSnapshot> {
        self.interfaces.lock().get(name).map(MemoryInterface::snapshot)
    }

    pub fn address_list(&self, name: &str) -> Vec<IpNet> {
        self.interfaces
            .lock()
            .get(name)
            .map(|i| i.addresses.clone())
            .unwrap_or_default()
    }

    pub fn exists(&self, name: &str) -> bool {
        self.interfaces.lock().contains_key(name)
    }

    /// Recorded mutating commands, in order
    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().clone()
    }

    pub fn clear_commands(&self) {
        self.commands.lock().clear();
    }

    /// Records `command` and applies `op` to the named interface.
    fn mutate<F>(&self, name: &str, command: String, op: F) -> CfgMgrResult<()>
    where
        F: FnOnce(&mut MemoryInterface) -> Result<(), &'static str>,
    {
        if self.failing.lock().contains(name) {
            return Err(rejected(command, "RTNETLINK answers: Operation not permitted"));
        }
        let mut interfaces = self.interfaces.lock();
        let intf = interfaces
            .get_mut(name)
            .ok_or_else(|| rejected(command.clone(), "Cannot find device"))?;
        op(intf).map_err(|output| rejected(command.clone(), output))?;
        self.commands.lock().push(command);
        Ok(())
    }
}

#[async_trait]
impl LinkBackend for MemoryLink {
    async fn query(&self, name: &str) -> CfgMgrResult<Option<LinkSnapshot>> {
        Ok(self.snapshot(name))
    }

    async fn list_tunnels(&self) -> CfgMgrResult<Vec<String>> {
        Ok(self
            .interfaces
            .lock()
            .iter()
            .filter(|(_, intf)| intf.tunnel.is_some())
            .map(|(name, _)| name.clone())
            .collect())
    }

    async fn create(&self, name: &str, params: &KernelTunnelParams) -> CfgMgrResult<()> {
        let command = build_add_link_cmd(name, params);
        if self.failing.lock().contains(name) {
            return Err(rejected(command, "RTNETLINK answers: Operation not permitted"));
        }
        let mut interfaces = self.interfaces.lock();
        if interfaces.contains_key(name) {
            return Err(rejected(command, "RTNETLINK answers: File exists"));
        }
        interfaces.insert(
            name.to_string(),
            MemoryInterface {
                kind: params.kind.to_string(),
                tunnel: Some(params.clone()),
                alias: None,
                admin_up: false,
                addresses: Vec::new(),
            },
        );
        self.commands.lock().push(command);
        Ok(())
    }

    async fn modify(&self, name: &str, params: &KernelTunnelParams) -> CfgMgrResult<()> {
        self.mutate(name, build_set_link_type_cmd(name, params), |intf| {
            match intf.tunnel.as_mut() {
                Some(current) if current.kind == params.kind => {
                    let mtu = current.mtu;
                    // without `dev` iproute2 keeps the bound link
                    let link = params.link.clone().or_else(|| current.link.take());
                    *current = params.clone();
                    current.mtu = mtu;
                    current.link = link;
                    Ok(())
                }
                _ => Err("RTNETLINK answers: Operation not supported"),
            }
        })
    }

    async fn set_mtu(&self, name: &str, mtu: u32) -> CfgMgrResult<()> {
        self.mutate(name, build_set_mtu_cmd(name, mtu), |intf| {
            if let Some(tunnel) = intf.tunnel.as_mut() {
                tunnel.mtu = mtu;
            }
            Ok(())
        })
    }

    async fn delete(&self, name: &str) -> CfgMgrResult<()> {
        self.mutate(name, build_del_link_cmd(name), |_| Ok(()))?;
        self.interfaces.lock().remove(name);
        Ok(())
    }

    async fn set_admin_state(&self, name: &str, up: bool) -> CfgMgrResult<()> {
        self.mutate(name, build_set_admin_state_cmd(name, up), |intf| {
            intf.admin_up = up;
            Ok(())
        })
    }

    async fn set_alias(&self, name: &str, alias: Option<&str>) -> CfgMgrResult<()> {
        self.mutate(name, build_set_alias_cmd(name, alias), |intf| {
            intf.alias = alias.filter(|a| !a.is_empty()).map(str::to_string);
            Ok(())
        })
    }

    async fn addresses(&self, name: &str) -> CfgMgrResult<Vec<IpNet>> {
        Ok(self.address_list(name))
    }

    async fn add_address(&self, name: &str, addr: &IpNet) -> CfgMgrResult<()> {
        self.mutate(name, build_add_addr_cmd(name, addr), |intf| {
            if intf.addresses.contains(addr) {
                return Err("RTNETLINK answers: File exists");
            }
            intf.addresses.push(*addr);
            Ok(())
        })
    }

    async fn del_address(&self, name: &str, addr: &IpNet) -> CfgMgrResult<()> {
        self.mutate(name, build_del_addr_cmd(name, addr), |intf| {
            let before = intf.addresses.len();
            intf.addresses.retain(|a| a != addr);
            if intf.addresses.len() == before {
                return Err("RTNETLINK answers: Cannot assign requested address");
            }
            Ok(())
        })
    }
}
