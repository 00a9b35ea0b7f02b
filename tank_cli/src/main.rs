//! `tank`: command-line front end for the water tank controller.

mod cli;
mod error_fmt;
mod run;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::WrapErr;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let _ = color_eyre::install();
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    match real_main(cli) {
        Ok(()) => {}
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            if JSON_MODE.get().copied().unwrap_or(false) {
                println!("{}", format_error_json(&err));
            } else {
                eprintln!("{}", humanize(&err));
            }
            std::process::exit(exit_code_for_error(&err));
        }
    }
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    let cfg = load_config(&cli.config)?;
    init_tracing(cli.json, &cli.log_level, &cfg.logging)?;
    tracing::debug!(config = %cli.config.display(), "config loaded");

    match cli.cmd {
        Commands::Run { cycles, remote_set } => {
            let shutdown = Arc::new(AtomicBool::new(false));
            let flag = Arc::clone(&shutdown);
            ctrlc::set_handler(move || {
                flag.store(true, Ordering::Relaxed);
            })
            .wrap_err("install Ctrl-C handler")?;

            let summary = run::run_tank(&cfg, cycles, &remote_set, shutdown)?;
            if cli.json {
                println!("{}", summary_json(&summary));
            } else {
                println!("{}", summary_line(&summary));
            }
        }
        Commands::SelfCheck => {
            let check = run::self_check(&cfg)?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "ok": true,
                        "distance_cm": check.distance_cm,
                        "percent": check.percent,
                    })
                );
            } else {
                println!(
                    "self-check ok: surface at {} cm ({}%)",
                    check.distance_cm, check.percent
                );
            }
        }
    }
    Ok(())
}

fn load_config(path: &Path) -> eyre::Result<tank_config::Config> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    let cfg: tank_config::Config = toml::from_str(&text)
        .wrap_err_with(|| format!("parse config {}", path.display()))?;
    cfg.validate().wrap_err("invalid configuration")?;
    Ok(cfg)
}

/// Console logs go to stderr (pretty or JSON); `[logging] file` adds a JSON-lines sink.
fn init_tracing(json: bool, level: &str, logging: &tank_config::Logging) -> eyre::Result<()> {
    let console_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .wrap_err_with(|| format!("invalid log level {level:?}"))?;

    let (pretty, json_layer) = if json {
        let layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(console_filter);
        (None, Some(layer))
    } else {
        let layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(console_filter);
        (Some(layer), None)
    };

    let file_layer = match logging.file.as_deref() {
        Some(file) => {
            let path = Path::new(file);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| eyre::eyre!("logging.file has no file name: {file:?}"))?;
            let appender = match logging.rotation.as_deref().unwrap_or("never") {
                "daily" => tracing_appender::rolling::daily(dir, name),
                "hourly" => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            let file_level = logging.level.as_deref().unwrap_or("info");
            let file_filter = EnvFilter::try_new(file_level)
                .wrap_err_with(|| format!("invalid logging.level {file_level:?}"))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(writer)
                    .with_filter(file_filter),
            )
        }
        None => None,
    };

    Registry::default()
        .with(pretty)
        .with(json_layer)
        .with(file_layer)
        .try_init()
        .wrap_err("install tracing subscriber")
}

fn unix_timestamp() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

fn summary_json(s: &tank_core::RunSummary) -> serde_json::Value {
    serde_json::json!({
        "timestamp": unix_timestamp(),
        "cycles": s.cycles,
        "starts": s.starts,
        "stops": s.stops,
        "remote_stops": s.remote_stops,
        "echo_misses": s.echo_misses,
        "publish_failures": s.publish_failures,
        "overrides_rejected": s.overrides_rejected,
        "final_state": s.final_state.to_string(),
        "last_level": s.last_level,
        "last_percent": s.last_percent,
    })
}

fn summary_line(s: &tank_core::RunSummary) -> String {
    let level = match (s.last_level, s.last_percent) {
        (Some(l), Some(p)) => format!("level {l} cm ({p}%)"),
        _ => "level unknown".to_string(),
    };
    format!(
        "run complete: {} cycles, {} starts, {} stops, {}, pump {}",
        s.cycles, s.starts, s.stops, level, s.final_state
    )
}
