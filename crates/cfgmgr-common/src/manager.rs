//! Configuration manager trait and the commit driver.
//!
//! Every cfgmgr daemon handles one section of the merged configuration
//! tree in three phases:
//!
//! 1. `get_config`: extract the daemon's view from the tree
//! 2. `verify`: collect every violation; any violation aborts the commit
//! 3. `apply`: push the configuration into the system
//!
//! [`commit`] runs the phases in order and guarantees that nothing is
//! applied when verification reports a violation.

use std::fmt::Display;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::{CfgMgrError, CfgMgrResult};
use crate::tree::ConfigTree;

/// Base trait for configuration manager daemons.
///
/// # Example
///
/// ```ignore
/// use cfgmgr_common::{CfgMgr, CfgMgrResult, ConfigTree};
///
/// struct DummyMgr;
///
/// #[async_trait]
/// impl CfgMgr for DummyMgr {
///     type Config = Vec<String>;
///     type Violation = String;
///     type Report = usize;
///
///     fn daemon_name(&self) -> &str { "dummymgrd" }
///     fn config_path(&self) -> &[&str] { &["interfaces", "dummy"] }
///
///     fn get_config(&self, tree: &ConfigTree) -> CfgMgrResult<Self::Config> {
///         Ok(tree.children(self.config_path()).iter().map(|(k, _)| k.to_string()).collect())
///     }
///
///     fn verify(&self, _config: &Self::Config) -> Vec<Self::Violation> { vec![] }
///
///     async fn apply(&self, config: Self::Config) -> CfgMgrResult<Self::Report> {
///         Ok(config.len())
///     }
/// }
/// ```
#[async_trait]
pub trait CfgMgr: Send + Sync {
    /// Daemon-specific view of the configuration tree.
    type Config: Send + Sync;

    /// A single user-correctable verification failure.
    type Violation: Display + Send;

    /// Outcome of a successful apply phase.
    type Report: Send;

    /// Returns the daemon name (e.g., "tunnelmgrd"), used for logging.
    fn daemon_name(&self) -> &str;

    /// Returns the tree path this daemon is responsible for.
    fn config_path(&self) -> &[&str];

    /// Extracts the daemon's configuration from the merged tree.
    fn get_config(&self, tree: &ConfigTree) -> CfgMgrResult<Self::Config>;

    /// Collects every violation in the configuration. Never short-circuits.
    fn verify(&self, config: &Self::Config) -> Vec<Self::Violation>;

    /// Applies a verified configuration.
    async fn apply(&self, config: Self::Config) -> CfgMgrResult<Self::Report>;
}

/// Runs `get_config` and `verify` without touching the system.
pub fn verify<M: CfgMgr + ?Sized>(mgr: &M, tree: &ConfigTree) -> CfgMgrResult<M::Config> {
    let config = mgr.get_config(tree)?;
    let violations: Vec<String> = mgr.verify(&config).iter().map(|v| v.to_string()).collect();

    if violations.is_empty() {
        return Ok(config);
    }

    for violation in &violations {
        warn!(daemon = mgr.daemon_name(), "{}", violation);
    }
    Err(CfgMgrError::VerifyFailed {
        daemon: mgr.daemon_name().to_string(),
        violations,
    })
}

/// Runs a full commit: extract, verify, then apply.
pub async fn commit<M: CfgMgr + ?Sized>(mgr: &M, tree: &ConfigTree) -> CfgMgrResult<M::Report> {
    let config = verify(mgr, tree)?;
    info!(
        daemon = mgr.daemon_name(),
        path = %mgr.config_path().join(" "),
        "Configuration verified, applying"
    );
    mgr.apply(config).await
}
