//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "tank", version, about = "Water tank level controller")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/tank_config.toml")]
    pub config: PathBuf,

    /// Log as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// A write to the remote store, as `child=value` (e.g. `tankEmptyLevel=90`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteSet {
    pub child: String,
    pub value: String,
}

/// clap value parser for `--remote-set`.
pub fn parse_remote_set(s: &str) -> Result<RemoteSet, String> {
    let (path, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected PATH=VALUE, got {s:?}"))?;
    let name = path.trim().trim_start_matches('/');
    if name.is_empty() {
        return Err("remote path must not be empty".into());
    }
    let child = format!("/{name}");
    if !tank_core::inbox::SUBSCRIBED.contains(&child.as_str()) {
        return Err(format!(
            "unknown remote path {name:?} (expected motorStat, tankEmptyLevel or tankFullLevel)"
        ));
    }
    Ok(RemoteSet {
        child,
        value: value.to_string(),
    })
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the control cycle until Ctrl-C (or for a fixed number of cycles)
    Run {
        /// Stop after this many cycles
        #[arg(long, value_name = "N")]
        cycles: Option<u64>,
        /// Inject a remote write before the first cycle (repeatable)
        #[arg(
            long = "remote-set",
            value_name = "PATH=VALUE",
            value_parser = parse_remote_set,
            long_help = "Write a value into the remote store before the first cycle, as if a remote client had set it.\n\nPATH is one of motorStat, tankEmptyLevel or tankFullLevel (relative to remote.base_path). Values are delivered through the same stream as live remote updates, so invalid levels are rejected and the remote mirror is healed."
        )]
        remote_set: Vec<RemoteSet>,
    },
    /// Quick health check (hardware presence / sim ok)
    SelfCheck,
}
