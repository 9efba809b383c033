//! Tunnel Manager Daemon Entry Point
//!
//! Runs one commit pass: loads the merged configuration tree, verifies the
//! tunnel section and applies it. Exits non-zero when the commit is
//! rejected or any interface fails to apply.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use cfgmgr_common::{commit, verify, CfgMgrError, ConfigTree};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tunnelmgrd::settings::DEFAULT_SETTINGS_PATH;
use tunnelmgrd::{Settings, ShellLink, TunnelMgr};

/// Tunnel interface configuration manager
#[derive(Parser, Debug)]
#[command(name = "tunnelmgrd")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Daemon settings file (TOML)
    #[arg(short = 's', long, default_value = DEFAULT_SETTINGS_PATH)]
    settings: PathBuf,

    /// Merged configuration tree (JSON)
    #[arg(short = 't', long)]
    tree: PathBuf,

    /// Query the live system but only print the commands that would run
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Verify the configuration without touching the system
    #[arg(long, conflicts_with = "dry_run")]
    verify_only: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            error!("tunnelmgrd: {:#}", e);
            eprintln!("tunnelmgrd: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(default_level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .context("invalid log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .try_init()
        .map_err(|e| anyhow!("failed to install log subscriber: {}", e))
}

fn report_violations(err: &CfgMgrError) {
    if let Some(violations) = err.violations() {
        for violation in violations {
            eprintln!("{}", violation);
        }
    }
}

async fn run(args: Args) -> anyhow::Result<ExitCode> {
    let settings = Settings::load_or_default(&args.settings)?;
    settings.validate()?;
    init_logging(&settings.log.level)?;

    info!(tree = %args.tree.display(), dry_run = args.dry_run, "Starting tunnelmgrd");

    let tree = ConfigTree::load(&args.tree)?;
    let backend = Arc::new(if args.dry_run {
        ShellLink::dry_run()
    } else {
        ShellLink::new()
    });
    let mgr = TunnelMgr::with_settings(backend.clone(), &settings);

    if args.verify_only {
        return match verify(&mgr, &tree) {
            Ok(config) => {
                info!(tunnels = config.descriptors.len(), "Configuration verified");
                Ok(ExitCode::SUCCESS)
            }
            Err(e @ CfgMgrError::VerifyFailed { .. }) => {
                report_violations(&e);
                Ok(ExitCode::FAILURE)
            }
            Err(e) => Err(e.into()),
        };
    }

    let report = match commit(&mgr, &tree).await {
        Ok(report) => report,
        Err(e @ CfgMgrError::VerifyFailed { .. }) => {
            report_violations(&e);
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e).context("commit failed"),
    };

    print!("{}", report);
    if args.dry_run {
        for command in backend.captured_commands() {
            println!("{}", command);
        }
    }

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
