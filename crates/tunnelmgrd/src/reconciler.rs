//! Reconciler: drives one live interface to its compiled target.
//!
//! The decision is made by the pure [`plan`] function; [`Reconciler`]
//! queries the live state, executes the plan and brings the generic
//! interface settings (alias, admin state, addresses) in line. All of this
//! happens under a per-name lock, so two passes touching the same name
//! never interleave while different names proceed concurrently.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use ipnet::IpNet;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::error::{ApplyError, LinkOp};
use crate::link::{LinkBackend, LinkSnapshot};
use crate::types::KernelTunnelParams;

/// What a reconcile step did (or would do) to an interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ReconcileAction {
    Create,
    NoOp,
    /// In-place update; flags name the parts that differ
    Modify { tunnel: bool, mtu: bool },
    /// Delete, then create: kind change or dropped link binding
    Replace,
    Delete,
}

impl fmt::Display for ReconcileAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileAction::Create => f.write_str("create"),
            ReconcileAction::NoOp => f.write_str("no-op"),
            ReconcileAction::Modify { tunnel: true, mtu: true } => f.write_str("modify"),
            ReconcileAction::Modify { tunnel: true, mtu: false } => f.write_str("modify tunnel"),
            ReconcileAction::Modify { mtu: true, .. } => f.write_str("modify mtu"),
            ReconcileAction::Modify { .. } => f.write_str("modify"),
            ReconcileAction::Replace => f.write_str("replace"),
            ReconcileAction::Delete => f.write_str("delete"),
        }
    }
}

/// Chooses the minimal operation that turns `current` into `target`.
///
/// `ip link set ... type` keeps the bound `dev` when none is given, so
/// removing a binding needs a new device.
pub fn plan(
    current: Option<&KernelTunnelParams>,
    target: Option<&KernelTunnelParams>,
) -> ReconcileAction {
    match (current, target) {
        (None, None) => ReconcileAction::NoOp,
        (None, Some(_)) => ReconcileAction::Create,
        (Some(_), None) => ReconcileAction::Delete,
        (Some(cur), Some(tgt)) if cur == tgt => ReconcileAction::NoOp,
        (Some(cur), Some(tgt)) if cur.kind != tgt.kind => ReconcileAction::Replace,
        (Some(cur), Some(tgt)) if cur.link.is_some() && tgt.link.is_none() => {
            ReconcileAction::Replace
        }
        (Some(cur), Some(tgt)) => ReconcileAction::Modify {
            tunnel: !cur.same_tunnel_attrs(tgt),
            mtu: cur.mtu != tgt.mtu,
        },
    }
}

/// Interface settings shared by every tunnel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterfaceSettings {
    /// Kernel alias, from `description`
    pub alias: Option<String>,
    pub admin_up: bool,
    pub addresses: Vec<IpNet>,
}

/// Applies compiled targets through a [`LinkBackend`].
pub struct Reconciler<B: LinkBackend> {
    backend: Arc<B>,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl<B: LinkBackend> Reconciler<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            locks: DashMap::new(),
        }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    fn lock_for(&self, name: &str) -> Arc<Mutex<()>> {
        self.locks.entry(name.to_string()).or_default().clone()
    }

    /// Drops the lock of a removed tunnel unless another task holds a clone.
    fn release_lock(&self, name: &str, lock: Arc<Mutex<()>>) {
        drop(lock);
        self.locks.remove_if(name, |_, l| Arc::strong_count(l) == 1);
    }

    /// Reconciles the tunnel attributes of `name` only.
    ///
    /// `None` means the tunnel is not configured and must not exist.
    #[instrument(skip(self, target))]
    pub async fn reconcile(
        &self,
        name: &str,
        target: Option<&KernelTunnelParams>,
    ) -> Result<ReconcileAction, ApplyError> {
        let lock = self.lock_for(name);
        let result = {
            let _guard = lock.lock().await;
            self.reconcile_locked(name, target).await
        };
        if target.is_none() && result.is_ok() {
            self.release_lock(name, lock);
        }
        result
    }

    /// Reconciles the tunnel and then its interface settings.
    #[instrument(skip(self, target, settings))]
    pub async fn apply(
        &self,
        name: &str,
        target: &KernelTunnelParams,
        settings: &InterfaceSettings,
    ) -> Result<ReconcileAction, ApplyError> {
        let lock = self.lock_for(name);
        let _guard = lock.lock().await;
        let action = self.reconcile_locked(name, Some(target)).await?;
        self.sync_settings(name, settings).await?;
        Ok(action)
    }

    async fn reconcile_locked(
        &self,
        name: &str,
        target: Option<&KernelTunnelParams>,
    ) -> Result<ReconcileAction, ApplyError> {
        let snapshot = self
            .backend
            .query(name)
            .await
            .map_err(|e| ApplyError::device(name, LinkOp::Query, e))?;

        if let Some(LinkSnapshot {
            tunnel: None, kind, ..
        }) = &snapshot
        {
            // never touch an interface we do not own
            if target.is_none() {
                return Ok(ReconcileAction::NoOp);
            }
            return Err(ApplyError::NameInUse {
                name: name.to_string(),
                kind: kind.clone().unwrap_or_else(|| "unknown".to_string()),
            });
        }

        let current = snapshot.as_ref().and_then(|s| s.tunnel.as_ref());
        let action = plan(current, target);
        debug!(%action, "Planned");

        match (action, target) {
            (ReconcileAction::Create, Some(t)) => self.create(name, t).await?,
            (ReconcileAction::Modify { tunnel, mtu }, Some(t)) => {
                if tunnel {
                    self.backend
                        .modify(name, t)
                        .await
                        .map_err(|e| ApplyError::device(name, LinkOp::Modify, e))?;
                }
                if mtu {
                    self.backend
                        .set_mtu(name, t.mtu)
                        .await
                        .map_err(|e| ApplyError::device(name, LinkOp::Modify, e))?;
                }
            }
            (ReconcileAction::Replace, Some(t)) => {
                self.delete(name).await?;
                self.create(name, t).await?;
            }
            (ReconcileAction::Delete, _) => self.delete(name).await?,
            _ => {}
        }

        if action != ReconcileAction::NoOp {
            info!(%action, "Tunnel reconciled");
        }
        Ok(action)
    }

    async fn create(&self, name: &str, target: &KernelTunnelParams) -> Result<(), ApplyError> {
        self.backend
            .create(name, target)
            .await
            .map_err(|e| ApplyError::device(name, LinkOp::Create, e))
    }

    async fn delete(&self, name: &str) -> Result<(), ApplyError> {
        self.backend
            .delete(name)
            .await
            .map_err(|e| ApplyError::device(name, LinkOp::Delete, e))
    }

    /// Brings alias, admin state and addresses in line.
    ///
    /// A link missing at this point (dry-run) is treated as fresh.
    async fn sync_settings(&self, name: &str, settings: &InterfaceSettings) -> Result<(), ApplyError> {
        let failed = |e| ApplyError::device(name, LinkOp::Settings, e);

        let live = self.backend.query(name).await.map_err(failed)?.unwrap_or_default();

        if live.alias != settings.alias {
            self.backend
                .set_alias(name, settings.alias.as_deref())
                .await
                .map_err(failed)?;
        }

        let current = self.backend.addresses(name).await.map_err(failed)?;
        for stale in current.iter().filter(|a| !settings.addresses.contains(a)) {
            self.backend.del_address(name, stale).await.map_err(failed)?;
        }
        for missing in settings.addresses.iter().filter(|a| !current.contains(a)) {
            self.backend.add_address(name, missing).await.map_err(failed)?;
        }

        if live.admin_up != settings.admin_up {
            self.backend
                .set_admin_state(name, settings.admin_up)
                .await
                .map_err(failed)?;
        }

        Ok(())
    }
}
