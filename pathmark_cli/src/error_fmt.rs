//! Human-readable error descriptions and structured JSON error formatting.

use crate::cli::LAST_LIMITS;
use crate::run::abort_reason_name;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    use pathmark_core::error::{BuildError, TaskError};

    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingTransport => {
                "What happened: No transport was provided to the task controller.\nLikely causes: The vehicle bus failed to initialize or was not wired into the builder.\nHow to fix: Ensure the transport is created successfully and passed via with_transport(...).".to_string()
            }
            BuildError::MissingResolver => {
                "What happened: No heading resolver was provided to the task controller.\nLikely causes: The vision heading routine was not wired into the builder.\nHow to fix: Pass a resolver via with_resolver(...).".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun `pathmark self-check`."
            ),
        };
    }

    if let Some(te) = err.downcast_ref::<TaskError>() {
        if matches!(te, TaskError::Timeout) {
            return "What happened: The vehicle transport timed out.\nLikely causes: The control stack is not running or the link is saturated.\nHow to fix: Check that the alignment and attitude controllers are up, then start a new run.".to_string();
        }
        if let TaskError::Abort(reason) = te {
            use pathmark_core::error::AbortReason::*;
            return match reason {
                DetectionFailed => "What happened: The path marker was never confirmed.\nLikely causes: Target out of view, wrong object class, or too few detections per window.\nHow to fix: Check task.object_name and detection.min_probability; lower detection.detections_required or raise detection.max_attempts.".to_string(),
                Operator => "What happened: The task was aborted by the operator.\nLikely causes: Ctrl-C or an abort request from the mission sequencer.\nHow to fix: Start a new run when ready.".to_string(),
                MaxRuntime => "What happened: max run time was exceeded.\nLikely causes: Thresholds too tight for the vehicle, slow convergence, or a late heading answer.\nHow to fix: Increase sim.max_run_ms (or --max-run-ms) or relax the alignment thresholds.".to_string(),
            };
        }
        if let TaskError::Heading(msg) = te {
            return format!(
                "What happened: The heading request failed ({msg}).\nLikely causes: The vision heading routine is not running.\nHow to fix: Restart the vision pipeline and start a new run."
            );
        }
        return format!(
            "What happened: {te}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
        );
    }

    // String-based heuristics for errors coming from init or config
    let msg = err
        .chain()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(": ");
    let lower = msg.to_ascii_lowercase();

    if lower.contains("event log csv must have headers") {
        return "Invalid headers in event log CSV. Expected 't_ms,kind,a,b,c'.".to_string();
    }

    if lower.contains("read config") || lower.contains("no such file") {
        return format!(
            "What happened: The config file could not be read.\nLikely causes: Wrong --config path or missing permissions.\nHow to fix: Point --config at an existing TOML file. Original: {msg}"
        );
    }

    if lower.contains("parse config") || lower.contains("must be") || lower.contains("must not") {
        return format!(
            "What happened: Configuration is invalid or incomplete.\nLikely causes: Missing [frame] or [alignment] section, or out-of-range values.\nHow to fix: Edit the TOML config and try again. Original: {msg}"
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Map AbortReason (if present) to stable exit codes; other errors return 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    use pathmark_core::error::{AbortReason, TaskError};
    if let Some(TaskError::Abort(reason)) = err.downcast_ref::<TaskError>() {
        return match reason {
            AbortReason::Operator => 2,
            AbortReason::DetectionFailed => 3,
            AbortReason::MaxRuntime => 4,
        };
    }
    1
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use pathmark_core::error::{AbortReason, TaskError};
    use serde_json::json;

    if let Some(TaskError::Abort(reason)) = err.downcast_ref::<TaskError>() {
        let msg = humanize(err);
        let limits = LAST_LIMITS.get();
        let detail_obj = match reason {
            AbortReason::MaxRuntime => limits.map(|l| json!({ "max_run_ms": l.max_run_ms })),
            AbortReason::DetectionFailed => {
                limits.map(|l| json!({ "max_attempts": l.max_attempts }))
            }
            AbortReason::Operator => None,
        };

        let obj = if let Some(d) = detail_obj {
            json!({ "reason": abort_reason_name(reason), "details": d, "message": msg })
        } else {
            json!({ "reason": abort_reason_name(reason), "message": msg })
        };
        return obj.to_string();
    }

    // Generic error JSON
    json!({ "reason": "Error", "message": humanize(err) }).to_string()
}
