//! The four reference timelines: settle, reset on violation, drop cooldown,
//! detection stall and recovery.

use pathmark_core::actuator::{ActuatorSequencer, DropStep};
use pathmark_core::alignment::{AlignmentMonitor, Confirmation, StatusSample};
use pathmark_core::debounce::Debounce;
use pathmark_core::{AlignmentCfg, DetectionCfg, DropCfg, Phase, TaskController, TaskSettings};
use pathmark_sim::SimBus;
use pathmark_traits::{BoundingBox, Detections, Inbound, LinearStatus};

fn alignment() -> AlignmentCfg {
    AlignmentCfg {
        align_thresh: 0.1,
        error_duration_ms: 2000,
        ..AlignmentCfg::default()
    }
}

fn sample(x: f64, y: f64) -> StatusSample {
    StatusSample::Linear(LinearStatus { x, y, z: 0.0 })
}

#[test]
fn a_alignment_settles_exactly_at_duration() {
    let cfg = alignment();
    let mut m = AlignmentMonitor::new(Confirmation::center(&cfg), &cfg);
    for t in [0, 500, 1000, 1500] {
        assert_eq!(m.observe(&sample(0.05, 0.05), t), Debounce::Pending, "t={t}");
    }
    assert_eq!(m.observe(&sample(0.05, 0.05), 2000), Debounce::Settled);
}

#[test]
fn b_violation_restarts_the_timer() {
    let cfg = alignment();
    let mut m = AlignmentMonitor::new(Confirmation::center(&cfg), &cfg);
    m.observe(&sample(0.05, 0.05), 0);
    m.observe(&sample(0.05, 0.05), 500);
    assert_eq!(m.observe(&sample(0.3, 0.05), 1000), Debounce::Pending);
    for t in [1500, 2000, 2500, 3000] {
        assert_eq!(m.observe(&sample(0.05, 0.05), t), Debounce::Pending, "t={t}");
    }
    assert_eq!(m.observe(&sample(0.05, 0.05), 3500), Debounce::Settled);
}

#[test]
fn c_second_pulse_waits_for_cooldown() {
    let mut s = ActuatorSequencer::new(DropCfg {
        drop_duration_ms: 500,
        ..DropCfg::default()
    });
    assert!(matches!(s.on_offset_settled(0), DropStep::Fired { marker: 1, .. }));
    assert_eq!(s.markers_dropped(), 1);
    assert!(matches!(s.on_offset_settled(300), DropStep::Cooldown { .. }));
    assert_eq!(s.markers_dropped(), 1);
    assert!(matches!(s.on_offset_settled(600), DropStep::Fired { marker: 2, .. }));
    assert_eq!(s.markers_dropped(), 2);
    match s.on_offset_settled(700) {
        DropStep::Done(cmd) => assert!(!cmd.markerdropper),
        other => panic!("expected Done, got {other:?}"),
    }
}

#[test]
fn d_detection_stall_then_recover() {
    let bus = SimBus::new();
    let mut c = TaskController::builder()
        .with_transport(bus.clone())
        .with_resolver(bus.resolver())
        .with_settings(TaskSettings {
            detection: DetectionCfg {
                detections_required: 3,
                detection_duration_ms: 1000,
                ..DetectionCfg::default()
            },
            ..TaskSettings::default()
        })
        .build()
        .unwrap();
    c.start(0).unwrap();

    let seen = Inbound::Detections(Detections {
        boxes: vec![BoundingBox {
            class: "PathMarker".into(),
            probability: 0.8,
            xmin: 0,
            ymin: 0,
            xmax: 50,
            ymax: 50,
        }],
    });

    c.handle(0, &seen).unwrap();
    c.handle(500, &seen).unwrap();
    assert_eq!(c.snapshot().detections_in_window, 2);

    c.handle(1200, &seen).unwrap();
    let snap = c.snapshot();
    assert_eq!(snap.phase, Phase::Detecting);
    assert_eq!(snap.attempts, 1);
    assert_eq!(snap.detections_in_window, 0);

    c.handle(1300, &seen).unwrap();
    c.handle(1400, &seen).unwrap();
    let snap = c.snapshot();
    assert_eq!(snap.attempts, 2);
    assert_eq!(snap.detections_in_window, 2);
    assert_eq!(snap.phase, Phase::Detecting);

    c.handle(1500, &seen).unwrap();
    assert_eq!(c.phase(), Phase::AligningCenter);
}
