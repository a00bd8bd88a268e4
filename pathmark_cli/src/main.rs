//! `pathmark`: run, replay and check the path marker task.

mod cli;
mod error_fmt;
mod replay;
mod run;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use clap::Parser;
use eyre::WrapErr;
use serde_json::json;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};
use crate::run::{RunOpts, outcome_name};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(e) = real_main(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            println!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        std::process::exit(exit_code_for_error(&e));
    }
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    color_eyre::install()?;

    let cfg = load_config(&cli.config)?;
    init_logging(cli.json, &cli.log_level, &cfg.logging);
    tracing::debug!(config = %cli.config.display(), "config loaded");

    match cli.cmd {
        Commands::Run {
            max_run_ms,
            require_bbox_width,
            realtime,
            print_runtime,
        } => {
            let shutdown = Arc::new(AtomicBool::new(false));
            let flag = Arc::clone(&shutdown);
            if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
                tracing::warn!(error = %e, "failed to install Ctrl-C handler");
            }

            let wall = Instant::now();
            let report = run::run_task(
                &cfg,
                RunOpts {
                    max_run_ms,
                    require_bbox_width,
                    realtime,
                },
                shutdown,
            )?;

            if cli.json {
                let line = json!({
                    "timestamp": unix_timestamp(),
                    "outcome": outcome_name(report.outcome),
                    "markers_dropped": report.markers_dropped,
                    "duration_ms": report.duration_ms,
                    "events": report.events,
                    "heading_yaw_deg": report.heading_yaw_deg,
                    "final_yaw_deg": report.final_yaw_deg,
                    "abort_reason": serde_json::Value::Null,
                });
                println!("{line}");
            } else {
                println!(
                    "Task complete: {} markers dropped after {} ms of task time ({} events).",
                    report.markers_dropped, report.duration_ms, report.events
                );
                if let Some(yaw) = report.heading_yaw_deg {
                    println!("Drop heading: {yaw:.1} deg");
                }
            }
            if print_runtime {
                eprintln!("Runtime: {:?}", wall.elapsed());
            }
        }
        Commands::Replay { events, start_ms } => {
            let out = replay::replay_file(&cfg, &events, start_ms)?;
            let s = &out.summary;
            let status = match s.status {
                pathmark_core::TaskStatus::Complete => "complete",
                pathmark_core::TaskStatus::Running => "running",
                pathmark_core::TaskStatus::Idle => "idle",
                pathmark_core::TaskStatus::Aborted(_) => "aborted",
            };
            if cli.json {
                let commands: Vec<String> = out.publications.iter().map(replay::describe).collect();
                let line = json!({
                    "timestamp": unix_timestamp(),
                    "status": status,
                    "phase": s.phase.name(),
                    "events_consumed": s.events_consumed,
                    "markers_dropped": s.markers_dropped,
                    "last_ms": s.last_ms,
                    "commands": commands,
                });
                println!("{line}");
            } else {
                for (i, p) in out.publications.iter().enumerate() {
                    println!("{i:>4}  {}", replay::describe(p));
                }
                println!(
                    "Replay {status}: phase={} events={} markers={}",
                    s.phase.name(),
                    s.events_consumed,
                    s.markers_dropped
                );
            }
        }
        Commands::SelfCheck => {
            let bus = pathmark_sim::SimBus::new();
            let task = pathmark_core::TaskController::builder()
                .with_settings(pathmark_core::TaskSettings::from(&cfg))
                .with_transport(bus.clone())
                .with_resolver(bus.resolver())
                .build()?;
            tracing::info!(?task, "controller built");
            if cli.json {
                println!("{}", json!({ "status": "ok", "object": cfg.task.object_name }));
            } else {
                println!("self-check ok");
            }
        }
    }
    Ok(())
}

fn load_config(path: &Path) -> eyre::Result<pathmark_config::Config> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    let cfg: pathmark_config::Config = toml::from_str(&text).wrap_err("parse config TOML")?;
    cfg.validate()?;
    Ok(cfg)
}

fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Console logs go to stderr so stdout carries only results. An optional
/// JSON-lines file sink follows `[logging]` in the config.
fn init_logging(json: bool, cli_level: &str, logging: &pathmark_config::Logging) {
    let level = logging.level.as_deref().unwrap_or(cli_level);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let console = if json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        fmt::layer().with_writer(std::io::stderr).boxed()
    };

    let file = logging.file.as_deref().map(|path| {
        let path = Path::new(path);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .map_or_else(|| "pathmark.log".into(), |n| n.to_owned());
        let appender = match logging.rotation.as_deref() {
            Some("daily") => tracing_appender::rolling::daily(dir, name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        fmt::layer()
            .json()
            .with_ansi(false)
            .with_writer(writer)
            .boxed()
    });

    if let Err(e) = tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
    {
        eprintln!("logging already initialized: {e}");
    }
}
