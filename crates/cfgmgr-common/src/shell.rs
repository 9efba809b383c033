//! Shell command execution utilities for cfgmgr daemons.
//!
//! Commands are assembled with [`CommandLine`], which quotes every
//! operand that originates from configuration, and executed through
//! `/bin/sh -c`.
//!
//! # Example
//!
//! ```ignore
//! use cfgmgr_common::shell::{self, CommandLine, IP_CMD};
//!
//! let cmd = CommandLine::new(IP_CMD)
//!     .args(["link", "set", "dev"])
//!     .quoted("tun10")
//!     .arg("up");
//! shell::exec_or_throw(&cmd.to_string()).await?;
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::process::Stdio;
use tokio::process::Command;

use crate::error::{CfgMgrError, CfgMgrResult};

/// Path to the `ip` command for network interface configuration.
pub const IP_CMD: &str = "/sbin/ip";

/// Regex for characters that need escaping in shell double-quotes.
/// Matches: $, `, ", \, and newline
static SHELL_ESCAPE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"([$`"\\\n])"#).expect("Invalid regex pattern"));

/// Quotes a string for safe use in shell commands.
///
/// The string is wrapped in double quotes and `$`, `` ` ``, `"`, `\`
/// and newline are escaped.
///
/// # Example
///
/// ```
/// use cfgmgr_common::shell::shellquote;
///
/// assert_eq!(shellquote("tun10"), "\"tun10\"");
/// assert_eq!(shellquote("with$var"), "\"with\\$var\"");
/// ```
pub fn shellquote(s: &str) -> String {
    let escaped = SHELL_ESCAPE_RE.replace_all(s, r"\$1");
    format!("\"{}\"", escaped)
}

/// Incrementally built shell command line.
///
/// Literal keywords are appended with [`arg`](Self::arg); anything derived
/// from configuration goes through [`quoted`](Self::quoted).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    parts: Vec<String>,
}

impl CommandLine {
    /// Starts a command line with the given program.
    pub fn new(program: &str) -> Self {
        Self {
            parts: vec![program.to_string()],
        }
    }

    /// Appends a literal token.
    pub fn arg(mut self, token: impl fmt::Display) -> Self {
        self.parts.push(token.to_string());
        self
    }

    /// Appends several literal tokens.
    pub fn args<I, T>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: fmt::Display,
    {
        self.parts.extend(tokens.into_iter().map(|t| t.to_string()));
        self
    }

    /// Appends a value that must be quoted.
    pub fn quoted(mut self, value: impl AsRef<str>) -> Self {
        self.parts.push(shellquote(value.as_ref()));
        self
    }

    /// Appends `keyword value` (value quoted).
    pub fn option(self, keyword: &str, value: impl AsRef<str>) -> Self {
        self.arg(keyword).quoted(value)
    }

    /// Appends `keyword value` only when a value is present.
    pub fn option_if<T: AsRef<str>>(self, keyword: &str, value: Option<T>) -> Self {
        match value {
            Some(v) => self.option(keyword, v),
            None => self,
        }
    }

    /// Appends a bare flag only when `enabled`.
    pub fn flag_if(self, flag: &str, enabled: bool) -> Self {
        if enabled {
            self.arg(flag)
        } else {
            self
        }
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.parts.join(" "))
    }
}

/// Result of a shell command execution.
#[derive(Debug, Clone)]
pub struct ExecResult {
    /// The exit code of the command (0 = success).
    pub exit_code: i32,
    /// The stdout output.
    pub stdout: String,
    /// The stderr output.
    pub stderr: String,
}

impl ExecResult {
    /// Returns true if the command succeeded (exit code 0).
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Returns the combined output (stdout + stderr) for error messages.
    pub fn combined_output(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (_, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => format!("{}\n{}", self.stdout, self.stderr),
        }
    }

    /// Converts a non-zero exit into [`CfgMgrError::ShellCommandFailed`].
    pub fn into_error(self, cmd: &str) -> CfgMgrError {
        CfgMgrError::ShellCommandFailed {
            command: cmd.to_string(),
            exit_code: self.exit_code,
            output: self.combined_output(),
        }
    }
}

/// Executes a shell command asynchronously.
///
/// A non-zero exit is not an error here; callers inspect
/// [`ExecResult::success`]. Only a failure to spawn is reported as `Err`.
pub async fn exec(cmd: &str) -> CfgMgrResult<ExecResult> {
    tracing::debug!(command = %cmd, "Executing shell command");

    let output = Command::new("/bin/sh")
        .arg("-c")
        .arg(cmd)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| CfgMgrError::ShellExec {
            command: cmd.to_string(),
            source: e,
        })?;

    let result = ExecResult {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    };

    if result.success() {
        tracing::trace!(command = %cmd, "Command succeeded");
    } else {
        tracing::warn!(
            command = %cmd,
            exit_code = result.exit_code,
            stderr = %result.stderr,
            "Command failed"
        );
    }

    Ok(result)
}

/// Executes a shell command and returns stdout, failing on non-zero exit.
pub async fn exec_or_throw(cmd: &str) -> CfgMgrResult<String> {
    let result = exec(cmd).await?;
    if result.success() {
        Ok(result.stdout)
    } else {
        Err(result.into_error(cmd))
    }
}
