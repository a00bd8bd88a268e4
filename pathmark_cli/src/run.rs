//! End-to-end task run against the simulated vehicle.

use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use pathmark_core::error::Result as CoreResult;
use pathmark_core::{AbortReason, TaskController, TaskError, TaskSettings, TaskStatus};
use pathmark_sim::util::period_ms;
use pathmark_sim::{SimBus, SimVehicle, VehicleParams};
use pathmark_traits::{Clock, ManualClock, MonotonicClock, TaskOutcome};

use crate::cli::{LAST_LIMITS, RunLimits};

#[derive(Debug, Clone, Copy)]
pub struct RunOpts {
    pub max_run_ms: Option<u64>,
    pub require_bbox_width: bool,
    pub realtime: bool,
}

/// What a finished run looked like.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: TaskOutcome,
    pub markers_dropped: u8,
    pub duration_ms: u64,
    pub events: u64,
    pub heading_yaw_deg: Option<f64>,
    pub final_yaw_deg: f64,
}

pub fn outcome_name(o: TaskOutcome) -> &'static str {
    match o {
        TaskOutcome::Completed => "Completed",
        TaskOutcome::DetectionFailed => "DetectionFailed",
    }
}

pub fn abort_reason_name(r: &AbortReason) -> &'static str {
    match r {
        AbortReason::DetectionFailed => "DetectionFailed",
        AbortReason::Operator => "Operator",
        AbortReason::MaxRuntime => "MaxRuntime",
    }
}

fn vehicle_params(cfg: &pathmark_config::Config) -> VehicleParams {
    VehicleParams {
        object_name: cfg.task.object_name.clone(),
        convergence: cfg.sim.convergence,
        initial_error: cfg.sim.initial_error,
        feature_heading_deg: cfg.sim.feature_heading_deg,
        initial_yaw_deg: cfg.sim.initial_yaw_deg,
        heading_latency_ms: cfg.sim.heading_latency_ms,
        detection_probability: cfg.sim.detection_probability,
        frame_width: cfg.frame.width,
        frame_height: cfg.frame.height,
    }
}

/// Build the controller, drive it with the simulated vehicle until it
/// completes, fails, runs out of time or `shutdown` is raised.
pub fn run_task(
    cfg: &pathmark_config::Config,
    opts: RunOpts,
    shutdown: Arc<AtomicBool>,
) -> CoreResult<RunReport> {
    let mut settings = TaskSettings::from(cfg);
    if opts.require_bbox_width {
        settings.task.require_bbox_width = true;
    }
    let max_run_ms = opts.max_run_ms.unwrap_or(cfg.sim.max_run_ms);
    let _ = LAST_LIMITS.set(RunLimits {
        max_run_ms,
        max_attempts: settings.detection.max_attempts,
    });

    let bus = SimBus::new();
    let mut vehicle = SimVehicle::new(bus.clone(), vehicle_params(cfg));
    let finished: Rc<Cell<Option<TaskOutcome>>> = Rc::new(Cell::new(None));
    let hook = Rc::clone(&finished);

    let mut task = TaskController::builder()
        .with_settings(settings)
        .with_transport(bus.clone())
        .with_resolver(bus.resolver())
        .on_finished(move |outcome| hook.set(Some(outcome)))
        .build()?;

    let clock: Box<dyn Clock> = if opts.realtime {
        Box::new(MonotonicClock::new())
    } else {
        Box::new(ManualClock::new())
    };
    let epoch = clock.now();
    let period = Duration::from_millis(period_ms(cfg.sim.sample_rate_hz));

    task.start(0)?;
    tracing::info!(
        max_run_ms,
        rate_hz = cfg.sim.sample_rate_hz,
        realtime = opts.realtime,
        "run start"
    );

    let mut events = 0u64;
    loop {
        if shutdown.load(Ordering::Relaxed) {
            task.abort();
            return Err(TaskError::Abort(AbortReason::Operator).into());
        }

        clock.sleep(period);
        let now_ms = clock.ms_since(epoch);
        if now_ms > max_run_ms {
            task.abort();
            return Err(TaskError::Abort(AbortReason::MaxRuntime).into());
        }

        for event in vehicle.tick(now_ms) {
            events += 1;
            let status = match task.handle(now_ms, &event) {
                Ok(s) => s,
                Err(e) => {
                    task.abort();
                    return Err(e);
                }
            };
            match status {
                TaskStatus::Running | TaskStatus::Idle => {}
                TaskStatus::Complete => {
                    let report = RunReport {
                        outcome: finished.get().unwrap_or(TaskOutcome::Completed),
                        markers_dropped: task.markers_dropped(),
                        duration_ms: now_ms,
                        events,
                        heading_yaw_deg: task.heading_plan().map(|p| p.yaw_deg),
                        final_yaw_deg: vehicle.yaw_deg(),
                    };
                    tracing::info!(
                        markers = report.markers_dropped,
                        duration_ms = report.duration_ms,
                        "run complete"
                    );
                    return Ok(report);
                }
                TaskStatus::Aborted(e) => {
                    tracing::error!(error = %e, "run aborted");
                    return Err(e.into());
                }
            }
        }
    }
}
