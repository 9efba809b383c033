//! Error types for tunnelmgrd.
//!
//! User-correctable configuration problems are not errors here; they are
//! [`Violation`](crate::validator::Violation)s collected by the validator.
//! This module covers malformed input and failures at the kernel boundary.

use cfgmgr_common::CfgMgrError;
use thiserror::Error;

/// Result type alias for tunnelmgrd operations.
pub type Result<T> = std::result::Result<T, TunnelError>;

/// Malformed input that the schema should have rejected.
#[derive(Debug, Error)]
pub enum TunnelError {
    /// Encapsulation string outside the supported set.
    #[error("unknown encapsulation \"{0}\"")]
    UnknownEncapsulation(String),

    /// Tunnel node without an encapsulation.
    #[error("tunnel {name}: encapsulation must be configured")]
    MissingEncapsulation { name: String },

    /// A field of a tunnel node has the wrong shape.
    #[error("tunnel {name}: invalid value for {field}: {message}")]
    InvalidField {
        name: String,
        field: String,
        message: String,
    },

    /// Daemon settings could not be loaded.
    #[error("settings: {0}")]
    Settings(String),
}

impl TunnelError {
    pub(crate) fn invalid_field(
        name: &str,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidField {
            name: name.to_string(),
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<TunnelError> for CfgMgrError {
    fn from(err: TunnelError) -> Self {
        match err {
            TunnelError::UnknownEncapsulation(_) => CfgMgrError::internal(err.to_string()),
            TunnelError::MissingEncapsulation { ref name } => {
                CfgMgrError::invalid_config(name.clone(), err.to_string())
            }
            TunnelError::InvalidField { ref field, .. } => {
                CfgMgrError::invalid_config(field.clone(), err.to_string())
            }
            TunnelError::Settings(message) => CfgMgrError::invalid_config("settings", message),
        }
    }
}

/// Kernel operation attempted on a tunnel interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOp {
    Query,
    Create,
    Modify,
    Delete,
    Settings,
}

impl std::fmt::Display for LinkOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LinkOp::Query => "query",
            LinkOp::Create => "create",
            LinkOp::Modify => "modify",
            LinkOp::Delete => "delete",
            LinkOp::Settings => "interface settings",
        };
        f.write_str(s)
    }
}

/// Fatal apply failure for a single interface.
///
/// Other interfaces of the same pass are not affected.
#[derive(Debug, Error)]
pub enum ApplyError {
    /// The kernel rejected an operation.
    #[error("{name}: {op} failed: {source}")]
    Device {
        name: String,
        op: LinkOp,
        #[source]
        source: CfgMgrError,
    },

    /// The name is taken by an interface that is not a tunnel.
    #[error("{name}: interface exists with non-tunnel kind {kind}")]
    NameInUse { name: String, kind: String },
}

impl ApplyError {
    pub fn device(name: &str, op: LinkOp, source: CfgMgrError) -> Self {
        Self::Device {
            name: name.to_string(),
            op,
            source,
        }
    }

    /// Interface the failure belongs to
    pub fn name(&self) -> &str {
        match self {
            ApplyError::Device { name, .. } | ApplyError::NameInUse { name, .. } => name,
        }
    }
}
