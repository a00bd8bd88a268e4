//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();
/// Run limits in effect for the current run (for JSON error details).
pub static LAST_LIMITS: OnceLock<RunLimits> = OnceLock::new();

#[derive(Copy, Clone, Debug)]
pub struct RunLimits {
    pub max_run_ms: u64,
    pub max_attempts: Option<u32>,
}

#[derive(Parser, Debug)]
#[command(name = "pathmark", version, about = "Path marker task controller")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/pathmark.toml")]
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

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the task end-to-end against the simulated vehicle
    Run {
        /// Override sim.max_run_ms: give up after this much task time
        #[arg(long, value_name = "MS")]
        max_run_ms: Option<u64>,
        /// Insert the bbox heave confirmation after centring
        #[arg(long, action = ArgAction::SetTrue)]
        require_bbox_width: bool,
        /// Pace the loop on the wall clock instead of simulated time
        #[arg(long, action = ArgAction::SetTrue)]
        realtime: bool,
        /// Print total runtime on completion
        #[arg(long, action = ArgAction::SetTrue)]
        print_runtime: bool,
    },
    /// Feed a recorded event log through the controller
    Replay {
        /// Event log CSV (strict header: t_ms,kind,a,b,c)
        #[arg(long, value_name = "FILE")]
        events: PathBuf,
        /// Stamp at which the task is started (ms)
        #[arg(long, value_name = "MS", default_value_t = 0)]
        start_ms: u64,
    },
    /// Validate the configuration and build a controller without running it
    SelfCheck,
}
