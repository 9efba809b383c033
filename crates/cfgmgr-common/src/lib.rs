//! Common infrastructure for configuration manager daemons.
//!
//! This crate provides shared functionality for cfgmgr daemons such as
//! tunnelmgrd:
//!
//! - [`shell`]: Safe shell command construction and execution
//! - [`tree`]: The merged configuration tree handed to every daemon
//! - [`CfgMgr`]: get_config / verify / apply trait with the [`commit`] driver
//! - [`error`]: Error types for cfgmgr operations
//!
//! # Architecture
//!
//! Configuration managers follow this pattern:
//!
//! 1. Receive the merged configuration tree (schema defaults applied)
//! 2. Extract and verify their section, collecting every violation
//! 3. Query the Linux network stack and execute the minimal set of
//!    shell commands that brings it in line with the configuration

pub mod error;
pub mod manager;
pub mod shell;
pub mod tree;

// Re-export commonly used items at crate root
pub use error::{CfgMgrError, CfgMgrResult};
pub use manager::{commit, verify, CfgMgr};
pub use tree::{ConfigTree, InterfaceIndex};
