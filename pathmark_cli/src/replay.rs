//! Replay a recorded event log through the controller over the sim bus.

use std::path::Path;

use eyre::WrapErr;
use pathmark_config::{EventKind, EventRow};
use pathmark_core::{RecordedEvent, RunSummary, TaskController, TaskSettings, TaskStatus};
use pathmark_sim::{Publication, SimBus};
use pathmark_traits::{
    AngularStatus, BoundingBox, Detections, HeadingReading, Inbound, LinearStatus,
};

/// Replay result plus everything the controller emitted.
#[derive(Debug)]
pub struct ReplayOutput {
    pub summary: RunSummary,
    pub publications: Vec<Publication>,
}

/// Map one CSV row to the event the controller would have received.
///
/// A detection row with a negative probability is a frame without the target.
#[allow(clippy::cast_possible_wrap)]
pub fn row_to_event(row: &EventRow, object_name: &str, frame: (u32, u32)) -> RecordedEvent {
    match row.kind {
        EventKind::Detection => {
            let boxes = if row.a >= 0.0 {
                vec![BoundingBox {
                    class: object_name.to_string(),
                    probability: row.a,
                    xmin: 0,
                    ymin: 0,
                    xmax: frame.0 as i32,
                    ymax: frame.1 as i32,
                }]
            } else {
                Vec::new()
            };
            RecordedEvent::Event(Inbound::Detections(Detections { boxes }))
        }
        EventKind::Linear => RecordedEvent::Event(Inbound::Linear(LinearStatus {
            x: row.a,
            y: row.b,
            z: row.c,
        })),
        EventKind::Angular => RecordedEvent::Event(Inbound::Angular(AngularStatus {
            roll: row.a,
            pitch: row.b,
            yaw: row.c,
        })),
        EventKind::Heading => RecordedEvent::Heading(HeadingReading {
            heading_deg: row.a,
            vehicle_yaw_deg: row.b,
        }),
    }
}

pub fn replay_file(
    cfg: &pathmark_config::Config,
    events: &Path,
    start_ms: u64,
) -> eyre::Result<ReplayOutput> {
    let rows = pathmark_config::load_event_log_csv(events)
        .wrap_err_with(|| format!("load event log {}", events.display()))?;
    tracing::info!(rows = rows.len(), "event log loaded");

    let settings = TaskSettings::from(cfg);
    let frame = (settings.frame.width, settings.frame.height);
    let object_name = settings.task.object_name.clone();
    let recorded = rows
        .iter()
        .map(|r| (r.t_ms, row_to_event(r, &object_name, frame)));

    let bus = SimBus::new();
    let mut task = TaskController::builder()
        .with_settings(settings)
        .with_transport(bus.clone())
        .with_resolver(bus.resolver())
        .build()?;

    let summary = task.run_recorded(start_ms, recorded)?;
    if let TaskStatus::Aborted(e) = &summary.status {
        return Err(e.clone().into());
    }
    Ok(ReplayOutput {
        summary,
        publications: bus.log(),
    })
}

/// One-line human description of a bus entry.
pub fn describe(p: &Publication) -> String {
    match p {
        Publication::Alignment(a) if a.is_neutral() => "alignment neutral".to_string(),
        Publication::Alignment(a) => format!(
            "alignment surge={} sway={} heave={} bbox_dim={} target=({:.3},{:.3},{:.3})",
            a.surge_active,
            a.sway_active,
            a.heave_active,
            a.bbox_dim,
            a.target_pos.x,
            a.target_pos.y,
            a.target_pos.z
        ),
        Publication::Attitude(a) => format!("attitude yaw={:.2}", a.euler_rpy.z),
        Publication::Actuator(a) if a.markerdropper => {
            format!("actuator marker pulse {} ms", a.duration_ms)
        }
        Publication::Actuator(_) => "actuator released".to_string(),
        Publication::Subscribed(s) => format!("subscribe {}", s.name()),
        Publication::Unsubscribed(s) => format!("unsubscribe {}", s.name()),
        Publication::HeadingRequested(t) => format!("heading request #{}", t.0),
    }
}
