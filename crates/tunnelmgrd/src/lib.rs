//! Tunnel Manager Daemon - tunnel interface configuration manager
//!
//! tunnelmgrd turns the `interfaces tunnel` section of the merged
//! configuration tree into kernel tunnel devices:
//! - Validation against per-encapsulation constraints ([`validator`])
//! - Compilation into kernel attributes ([`compiler`])
//! - Minimal create/modify/replace/delete against the live interface
//!   ([`reconciler`])
//! - Removal of managed tunnels that are no longer configured
//!   ([`TunnelMgr`])
//!
//! Supported encapsulations: ipip, sit, gre, gretap, ipip6, ip6ip6,
//! ip6gre, ip6gretap, erspan and ip6erspan.

pub mod catalog;
pub mod commands;
pub mod compiler;
pub mod descriptor;
pub mod error;
pub mod link;
pub mod memory_link;
pub mod reconciler;
pub mod settings;
pub mod tables;
pub mod tunnel_mgr;
pub mod types;
pub mod validator;

pub use catalog::{ConstraintCatalog, EncapProfile};
pub use error::{ApplyError, LinkOp, TunnelError};
pub use link::{LinkBackend, LinkSnapshot, ShellLink};
pub use memory_link::MemoryLink;
pub use reconciler::{ReconcileAction, Reconciler};
pub use settings::Settings;
pub use tunnel_mgr::{CommitReport, TunnelConfig, TunnelMgr};
pub use types::{Encapsulation, KernelTunnelParams, TunnelDescriptor};
pub use validator::{validate, ValidatedDescriptor, Violation};
