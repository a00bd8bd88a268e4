#![no_main]
use libfuzzer_sys::fuzz_target;

use pathmark_core::{AlignmentCfg, DetectionCfg, DropCfg, TaskController, TaskSettings};
use pathmark_sim::SimBus;
use pathmark_traits::{
    AngularStatus, BoundingBox, Detections, HeadingReading, HeadingTicket, Inbound, LinearStatus,
};

fn error(b: u8) -> f64 {
    (f64::from(b) - 128.0) / 256.0
}

// Every 4 bytes become one event: kind, time step, two payload bytes.
fn decode(chunk: &[u8]) -> Inbound {
    let (a, b) = (chunk[2], chunk[3]);
    match chunk[0] % 4 {
        0 => Inbound::Detections(Detections {
            boxes: if a % 3 == 0 {
                Vec::new()
            } else {
                vec![BoundingBox {
                    class: "PathMarker".into(),
                    probability: f64::from(b) / 255.0,
                    xmin: 0,
                    ymin: 0,
                    xmax: 10,
                    ymax: 10,
                }]
            },
        }),
        1 => Inbound::Linear(LinearStatus {
            x: error(a),
            y: error(b),
            z: error(a ^ b),
        }),
        2 => Inbound::Angular(AngularStatus {
            roll: 0.0,
            pitch: 0.0,
            yaw: f64::from(a) - 128.0,
        }),
        _ => Inbound::Heading {
            ticket: HeadingTicket(u64::from(a % 4)),
            reading: HeadingReading {
                heading_deg: f64::from(b) * 1.5 - 180.0,
                vehicle_yaw_deg: f64::from(a),
            },
        },
    }
}

fuzz_target!(|data: &[u8]| {
    let bus = SimBus::new();
    let settings = TaskSettings {
        alignment: AlignmentCfg {
            error_duration_ms: 20,
            bbox_heave_duration_ms: 20,
            ..AlignmentCfg::default()
        },
        detection: DetectionCfg {
            detections_required: 2,
            detection_duration_ms: 100,
            max_attempts: Some(3),
            ..DetectionCfg::default()
        },
        drop_cfg: DropCfg {
            drop_duration_ms: 30,
            ..DropCfg::default()
        },
        ..TaskSettings::default()
    };
    let Ok(mut task) = TaskController::builder()
        .with_settings(settings)
        .with_transport(bus.clone())
        .with_resolver(bus.resolver())
        .build()
    else {
        return;
    };
    if task.start(0).is_err() {
        return;
    }

    let mut now = 0u64;
    for chunk in data.chunks_exact(4) {
        now += u64::from(chunk[1] % 64);
        let event = decode(chunk);
        let _ = task.handle(now, &event);
        assert!(task.markers_dropped() <= 2);
        assert!(bus.marker_pulses().len() <= 2);
        if let Some(stream) = task.active_stream() {
            assert_eq!(bus.active_stream(), Some(stream));
        }
        if chunk[0] == 0xff {
            task.abort();
            assert!(bus.active_stream().is_none());
        }
    }
});
