//! Tunnel Manager - one commit pass over `interfaces tunnel`

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use cfgmgr_common::{CfgMgr, CfgMgrError, CfgMgrResult, ConfigTree, InterfaceIndex};
use futures::stream::{self, StreamExt};
use ipnet::IpNet;
use tracing::{error, info, instrument, warn};

use crate::catalog::ConstraintCatalog;
use crate::compiler::compile_with_base_mtu;
use crate::descriptor;
use crate::error::{ApplyError, LinkOp, Result};
use crate::link::LinkBackend;
use crate::reconciler::{InterfaceSettings, ReconcileAction, Reconciler};
use crate::settings::Settings;
use crate::tables::CFG_TUNNEL_PATH;
use crate::types::{AddressFamily, TunnelDescriptor};
use crate::validator::{is_tunnel_name, validate, ValidatedDescriptor, Violation};

/// Daemon name used in logs and commit errors
pub const DAEMON_NAME: &str = "tunnelmgrd";

/// The tunnel section of one merged configuration tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TunnelConfig {
    /// Configured tunnels, in name order
    pub descriptors: Vec<TunnelDescriptor>,
    /// Every configured interface of any kind
    pub interfaces: InterfaceIndex,
}

impl TunnelConfig {
    pub fn from_tree(tree: &ConfigTree) -> Result<Self> {
        let descriptors = tree
            .children(CFG_TUNNEL_PATH)
            .into_iter()
            .map(|(name, node)| descriptor::from_node(name, node))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            descriptors,
            interfaces: tree.interfaces(),
        })
    }
}

/// Outcome of an apply phase.
///
/// Every interface that was looked at has an action or a failure; a
/// failure never prevents other interfaces from being applied.
#[derive(Debug, Default)]
pub struct CommitReport {
    pub actions: BTreeMap<String, ReconcileAction>,
    pub failures: Vec<ApplyError>,
}

impl CommitReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn action(&self, name: &str) -> Option<ReconcileAction> {
        self.actions.get(name).copied()
    }

    pub fn failure(&self, name: &str) -> Option<&ApplyError> {
        self.failures.iter().find(|f| f.name() == name)
    }

    fn record(&mut self, name: String, result: std::result::Result<ReconcileAction, ApplyError>) {
        match result {
            Ok(action) => {
                self.actions.insert(name, action);
            }
            Err(e) => {
                error!("{}", e);
                self.failures.push(e);
            }
        }
    }
}

impl fmt::Display for CommitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, action) in &self.actions {
            writeln!(f, "{name}: {action}")?;
        }
        for failure in &self.failures {
            writeln!(f, "{failure}")?;
        }
        Ok(())
    }
}

/// Tunnel Manager
///
/// Validates, compiles and reconciles every tunnel of a commit pass and
/// removes managed tunnels that are no longer configured.
pub struct TunnelMgr<B: LinkBackend> {
    catalog: ConstraintCatalog,
    reconciler: Reconciler<B>,
    base_mtu: u32,
    max_parallel: usize,
}

impl<B: LinkBackend> TunnelMgr<B> {
    /// Create a manager with default settings
    pub fn new(backend: Arc<B>) -> Self {
        Self::with_settings(backend, &Settings::default())
    }

    pub fn with_settings(backend: Arc<B>, settings: &Settings) -> Self {
        info!(
            base_mtu = settings.link.base_mtu,
            max_parallel = settings.link.max_parallel,
            "TunnelMgr initialized"
        );

        Self {
            catalog: ConstraintCatalog::new(),
            reconciler: Reconciler::new(backend),
            base_mtu: settings.link.base_mtu,
            max_parallel: settings.link.max_parallel.max(1),
        }
    }

    pub fn backend(&self) -> &Arc<B> {
        self.reconciler.backend()
    }

    /// Validates every descriptor, collecting all violations.
    pub fn validate_all(&self, config: &TunnelConfig) -> (Vec<ValidatedDescriptor>, Vec<Violation>) {
        let mut accepted = Vec::with_capacity(config.descriptors.len());
        let mut violations = Vec::new();

        for descriptor in &config.descriptors {
            match validate(descriptor, &self.catalog, &config.interfaces) {
                Ok(validated) => accepted.push(validated),
                Err(found) => violations.extend(found),
            }
        }

        (accepted, violations)
    }

    /// Local address of a `dhcp-interface` tunnel, from the lease.
    ///
    /// `None` while the interface has no address of the tunnel's family.
    async fn resolve_dhcp_local(
        &self,
        validated: &ValidatedDescriptor,
    ) -> std::result::Result<Option<IpAddr>, ApplyError> {
        let Some(ifname) = &validated.descriptor().dhcp_interface else {
            return Ok(None);
        };
        let family: AddressFamily = validated.profile().family;

        let addrs = self
            .backend()
            .addresses(ifname)
            .await
            .map_err(|e| ApplyError::device(validated.name(), LinkOp::Query, e))?;
        let local = addrs.iter().map(IpNet::addr).find(|a| family.matches(a));

        if local.is_none() {
            warn!(
                tunnel = validated.name(),
                dhcp_interface = %ifname,
                "No {} address on DHCP interface, using local any",
                family
            );
        }
        Ok(local)
    }

    #[instrument(skip(self, validated), fields(name = validated.name()))]
    async fn apply_one(
        &self,
        validated: ValidatedDescriptor,
    ) -> (String, std::result::Result<ReconcileAction, ApplyError>) {
        let name = validated.name().to_string();
        let d = validated.descriptor();

        let mut target = compile_with_base_mtu(&validated, self.base_mtu);
        if d.dhcp_interface.is_some() {
            match self.resolve_dhcp_local(&validated).await {
                Ok(local) => target.local = local,
                Err(e) => return (name, Err(e)),
            }
        }

        let settings = InterfaceSettings {
            alias: d.description.clone(),
            admin_up: !d.disable,
            addresses: validated.addresses().to_vec(),
        };

        let result = self.reconciler.apply(&name, &target, &settings).await;
        (name, result)
    }

    async fn remove_one(&self, name: String) -> (String, std::result::Result<ReconcileAction, ApplyError>) {
        let result = self.reconciler.reconcile(&name, None).await;
        (name, result)
    }
}

#[async_trait]
impl<B: LinkBackend> CfgMgr for TunnelMgr<B> {
    type Config = TunnelConfig;
    type Violation = Violation;
    type Report = CommitReport;

    fn daemon_name(&self) -> &str {
        DAEMON_NAME
    }

    fn config_path(&self) -> &[&str] {
        CFG_TUNNEL_PATH
    }

    fn get_config(&self, tree: &ConfigTree) -> CfgMgrResult<Self::Config> {
        Ok(TunnelConfig::from_tree(tree)?)
    }

    fn verify(&self, config: &Self::Config) -> Vec<Self::Violation> {
        self.validate_all(config).1
    }

    async fn apply(&self, config: Self::Config) -> CfgMgrResult<Self::Report> {
        let (accepted, violations) = self.validate_all(&config);
        if !violations.is_empty() {
            return Err(CfgMgrError::VerifyFailed {
                daemon: DAEMON_NAME.to_string(),
                violations: violations.iter().map(ToString::to_string).collect(),
            });
        }

        // listed up front so that a failing query aborts before any change
        let configured: BTreeSet<&str> = config.descriptors.iter().map(|d| d.name.as_str()).collect();
        let stale: Vec<String> = self
            .backend()
            .list_tunnels()
            .await?
            .into_iter()
            .filter(|name| is_tunnel_name(name) && !configured.contains(name.as_str()))
            .collect();

        info!(
            tunnels = accepted.len(),
            stale = stale.len(),
            "Applying tunnel configuration"
        );

        let mut report = CommitReport::default();

        let applied: Vec<_> = stream::iter(accepted)
            .map(|validated| self.apply_one(validated))
            .buffer_unordered(self.max_parallel)
            .collect()
            .await;
        for (name, result) in applied {
            report.record(name, result);
        }

        let removed: Vec<_> = stream::iter(stale)
            .map(|name| self.remove_one(name))
            .buffer_unordered(self.max_parallel)
            .collect()
            .await;
        for (name, result) in removed {
            report.record(name, result);
        }

        info!(
            changed = report
                .actions
                .values()
                .filter(|a| **a != ReconcileAction::NoOp)
                .count(),
            failed = report.failures.len(),
            "Tunnel configuration applied"
        );
        Ok(report)
    }
}
