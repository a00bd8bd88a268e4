use std::cell::RefCell;
use std::rc::Rc;

use pathmark_core::{
    AlignmentCfg, DetectionCfg, DropCfg, Phase, TaskCfg, TaskController, TaskSettings, TaskStatus,
};
use pathmark_sim::{Publication, SimBus};
use pathmark_traits::{
    ActuatorCommand, AngularStatus, BoundingBox, Detections, HeadingReading, Inbound,
    LinearStatus, Stream, TaskOutcome,
};
use rstest::rstest;

fn settings() -> TaskSettings {
    TaskSettings {
        alignment: AlignmentCfg {
            align_thresh: 0.1,
            bbox_thresh: 0.1,
            yaw_thresh: 3.0,
            error_duration_ms: 2000,
            bbox_heave_duration_ms: 1000,
        },
        detection: DetectionCfg {
            detections_required: 3,
            detection_duration_ms: 1000,
            ..DetectionCfg::default()
        },
        drop_cfg: DropCfg {
            drop_duration_ms: 500,
            ..DropCfg::default()
        },
        ..TaskSettings::default()
    }
}

fn controller(bus: &SimBus, settings: TaskSettings) -> TaskController {
    TaskController::builder()
        .with_transport(bus.clone())
        .with_resolver(bus.resolver())
        .with_settings(settings)
        .build()
        .expect("valid settings")
}

fn seen() -> Inbound {
    Inbound::Detections(Detections {
        boxes: vec![BoundingBox {
            class: "PathMarker".into(),
            probability: 0.9,
            xmin: 100,
            ymin: 100,
            xmax: 300,
            ymax: 200,
        }],
    })
}

fn lin(x: f64, y: f64) -> Inbound {
    Inbound::Linear(LinearStatus { x, y, z: 0.0 })
}

fn yaw(err: f64) -> Inbound {
    Inbound::Angular(AngularStatus {
        roll: 0.0,
        pitch: 0.0,
        yaw: err,
    })
}

fn feed(c: &mut TaskController, t: u64, ev: Inbound) -> TaskStatus {
    c.handle(t, &ev).expect("handler should not fail")
}

/// Start, confirm the target, centre, and answer the heading request.
/// Returns with the controller orienting at t = 2400.
fn drive_to_orienting(c: &mut TaskController) {
    c.start(0).unwrap();
    for t in [0, 100, 200] {
        feed(c, t, seen());
    }
    assert_eq!(c.phase(), Phase::AligningCenter);
    feed(c, 300, lin(0.05, 0.05));
    feed(c, 2300, lin(0.05, -0.05));
    assert_eq!(c.phase(), Phase::OrientingHeading);
    let ticket = c.pending_heading().expect("heading requested");
    feed(
        c,
        2400,
        Inbound::Heading {
            ticket,
            reading: HeadingReading {
                heading_deg: 30.0,
                vehicle_yaw_deg: 0.0,
            },
        },
    );
}

#[rstest]
fn full_run_drops_two_markers_and_completes() {
    let bus = SimBus::new();
    let outcome = Rc::new(RefCell::new(None));
    let sink = Rc::clone(&outcome);
    let mut c = TaskController::builder()
        .with_transport(bus.clone())
        .with_resolver(bus.resolver())
        .with_settings(settings())
        .on_finished(move |o| *sink.borrow_mut() = Some(o))
        .build()
        .unwrap();

    drive_to_orienting(&mut c);
    assert_eq!(c.active_stream(), Some(Stream::AngularStatus));
    let att = bus.last_attitude().expect("attitude published");
    assert!(att.roll_active && att.pitch_active && att.yaw_active);
    assert!((att.euler_rpy.z + 60.0).abs() < 1e-9);

    feed(&mut c, 2500, yaw(1.0));
    feed(&mut c, 4500, yaw(-1.0));
    assert_eq!(c.phase(), Phase::AligningOffset);
    let offset_cmd = bus.last_alignment().unwrap();
    assert!(offset_cmd.surge_active && offset_cmd.sway_active && !offset_cmd.heave_active);
    assert!((offset_cmd.target_pos.y + 644.0 / 6.0).abs() < 1e-9);

    feed(&mut c, 4600, lin(0.0, 0.0));
    assert_eq!(feed(&mut c, 6600, lin(0.0, 0.0)), TaskStatus::Running);
    assert_eq!(c.phase(), Phase::Dropping);
    assert_eq!(c.markers_dropped(), 1);
    feed(&mut c, 7000, lin(0.0, 0.0));
    assert_eq!(c.markers_dropped(), 1);
    feed(&mut c, 7100, lin(0.0, 0.0));
    assert_eq!(c.markers_dropped(), 2);
    assert_eq!(feed(&mut c, 7200, lin(0.0, 0.0)), TaskStatus::Complete);

    assert_eq!(c.phase(), Phase::Done);
    assert_eq!(c.active_stream(), None);
    assert_eq!(bus.active_stream(), None);
    assert_eq!(*outcome.borrow(), Some(TaskOutcome::Completed));

    let pulses = bus.marker_pulses();
    assert_eq!(pulses.len(), 2);
    assert!(pulses.iter().all(|p| p.duration_ms == 300));
    let log = bus.log();
    let tail = &log[log.len() - 3..];
    assert_eq!(tail[0], Publication::Actuator(ActuatorCommand::released()));
    assert!(matches!(&tail[1], Publication::Alignment(cmd) if cmd.is_neutral()));
    assert_eq!(tail[2], Publication::Unsubscribed(Stream::LinearStatus));

    // terminal: later events change nothing
    assert_eq!(feed(&mut c, 8000, lin(0.0, 0.0)), TaskStatus::Complete);
    assert_eq!(bus.marker_pulses().len(), 2);
}

#[rstest]
fn start_publishes_neutral_then_subscribes_detections() {
    let bus = SimBus::new();
    let mut c = controller(&bus, settings());
    c.start(0).unwrap();
    let log = bus.log();
    assert!(matches!(&log[0], Publication::Alignment(cmd) if cmd.is_neutral()));
    assert_eq!(log[1], Publication::Subscribed(Stream::Detections));
    assert_eq!(c.phase(), Phase::Detecting);
}

#[rstest]
fn confirmation_switches_to_centre_alignment() {
    let bus = SimBus::new();
    let mut c = controller(&bus, settings());
    c.start(0).unwrap();
    bus.clear_log();
    for t in [0, 100, 200] {
        feed(&mut c, t, seen());
    }
    let log = bus.log();
    assert_eq!(log[0], Publication::Unsubscribed(Stream::Detections));
    match &log[1] {
        Publication::Alignment(cmd) => {
            assert!(cmd.surge_active && cmd.sway_active && !cmd.heave_active);
            assert_eq!(cmd.object_name, "PathMarker");
            // 0.7 of the default 482 px frame height
            assert_eq!(cmd.bbox_dim, 337);
        }
        other => panic!("expected alignment command, got {other:?}"),
    }
    assert_eq!(log[2], Publication::Subscribed(Stream::LinearStatus));
}

#[rstest]
fn frames_without_the_target_class_do_not_count() {
    let bus = SimBus::new();
    let mut c = controller(&bus, settings());
    c.start(0).unwrap();
    let other = Inbound::Detections(Detections {
        boxes: vec![BoundingBox {
            class: "Gate".into(),
            probability: 1.0,
            xmin: 0,
            ymin: 0,
            xmax: 10,
            ymax: 10,
        }],
    });
    for t in [0, 100, 200, 300] {
        feed(&mut c, t, other.clone());
        feed(&mut c, t, Inbound::Detections(Detections::default()));
    }
    assert_eq!(c.phase(), Phase::Detecting);
    assert_eq!(c.snapshot().attempts, 0);
}

#[rstest]
fn events_from_inactive_streams_are_dropped() {
    let bus = SimBus::new();
    let mut c = controller(&bus, settings());
    c.start(0).unwrap();
    // linear status while detecting: ignored
    for t in 0..10 {
        feed(&mut c, t * 1000, lin(0.0, 0.0));
    }
    assert_eq!(c.phase(), Phase::Detecting);

    for t in [0, 100, 200] {
        feed(&mut c, t, seen());
    }
    // late detections while centring: ignored
    feed(&mut c, 300, seen());
    feed(&mut c, 400, yaw(0.0));
    assert_eq!(c.phase(), Phase::AligningCenter);
}

#[rstest]
fn centre_violation_restarts_the_settle_window() {
    let bus = SimBus::new();
    let mut c = controller(&bus, settings());
    c.start(0).unwrap();
    for t in [0, 100, 200] {
        feed(&mut c, t, seen());
    }
    feed(&mut c, 1000, lin(0.05, 0.05));
    feed(&mut c, 1500, lin(0.05, 0.05));
    feed(&mut c, 2000, lin(0.3, 0.05));
    feed(&mut c, 2500, lin(0.05, 0.05));
    feed(&mut c, 4000, lin(0.05, 0.05));
    assert_eq!(c.phase(), Phase::AligningCenter);
    feed(&mut c, 4500, lin(0.05, 0.05));
    assert_eq!(c.phase(), Phase::OrientingHeading);
}

#[rstest]
fn bbox_width_phase_is_inserted_when_required() {
    let bus = SimBus::new();
    let mut s = settings();
    s.task = TaskCfg {
        require_bbox_width: true,
        ..TaskCfg::default()
    };
    let mut c = controller(&bus, s);
    c.start(0).unwrap();
    for t in [0, 100, 200] {
        feed(&mut c, t, seen());
    }
    feed(&mut c, 300, lin(0.0, 0.0));
    feed(&mut c, 2300, lin(0.0, 0.0));
    assert_eq!(c.phase(), Phase::AligningBboxWidth);
    assert!(bus.last_alignment().unwrap().heave_active);
    assert_eq!(c.active_stream(), Some(Stream::LinearStatus));
    assert!(bus.heading_requests().is_empty());

    // only z matters now
    feed(&mut c, 2400, Inbound::Linear(LinearStatus { x: 5.0, y: 5.0, z: 0.05 }));
    feed(&mut c, 3000, Inbound::Linear(LinearStatus { x: 5.0, y: 5.0, z: 0.2 }));
    feed(&mut c, 3100, Inbound::Linear(LinearStatus { x: 5.0, y: 5.0, z: 0.05 }));
    assert_eq!(c.phase(), Phase::AligningBboxWidth);
    feed(&mut c, 4100, Inbound::Linear(LinearStatus { x: 5.0, y: 5.0, z: 0.05 }));
    assert_eq!(c.phase(), Phase::OrientingHeading);
    assert_eq!(bus.heading_requests().len(), 1);
    assert_eq!(c.active_stream(), None);
}

#[rstest]
fn stale_heading_ticket_is_ignored() {
    let bus = SimBus::new();
    let mut c = controller(&bus, settings());
    c.start(0).unwrap();
    for t in [0, 100, 200] {
        feed(&mut c, t, seen());
    }
    feed(&mut c, 300, lin(0.0, 0.0));
    feed(&mut c, 2300, lin(0.0, 0.0));
    let ticket = c.pending_heading().unwrap();

    let stale = pathmark_traits::HeadingTicket(ticket.0 + 100);
    feed(
        &mut c,
        2400,
        Inbound::Heading {
            ticket: stale,
            reading: HeadingReading {
                heading_deg: 30.0,
                vehicle_yaw_deg: 0.0,
            },
        },
    );
    assert!(bus.last_attitude().is_none());
    assert_eq!(c.pending_heading(), Some(ticket));
    assert_eq!(c.active_stream(), None);
}

#[rstest]
fn non_finite_heading_is_requested_again() {
    let bus = SimBus::new();
    let mut c = controller(&bus, settings());
    c.start(0).unwrap();
    for t in [0, 100, 200] {
        feed(&mut c, t, seen());
    }
    feed(&mut c, 300, lin(0.0, 0.0));
    feed(&mut c, 2300, lin(0.0, 0.0));
    let first = c.pending_heading().unwrap();

    feed(
        &mut c,
        2400,
        Inbound::Heading {
            ticket: first,
            reading: HeadingReading {
                heading_deg: f64::NAN,
                vehicle_yaw_deg: 0.0,
            },
        },
    );
    let second = c.pending_heading().expect("new request");
    assert_ne!(first, second);
    assert_eq!(bus.heading_requests(), vec![first, second]);
    assert_eq!(c.phase(), Phase::OrientingHeading);
    assert!(bus.last_attitude().is_none());
}

#[rstest]
fn violation_while_dropping_delays_second_marker() {
    let bus = SimBus::new();
    let mut c = controller(&bus, settings());
    drive_to_orienting(&mut c);
    feed(&mut c, 2500, yaw(0.0));
    feed(&mut c, 4500, yaw(0.0));
    feed(&mut c, 4600, lin(0.0, 0.0));
    feed(&mut c, 6600, lin(0.0, 0.0));
    assert_eq!(c.markers_dropped(), 1);

    // drift out at 6900; alignment must settle again and the spacing
    // window restarts at the violation
    feed(&mut c, 6900, lin(0.5, 0.0));
    assert_eq!(c.phase(), Phase::Dropping);
    feed(&mut c, 7000, lin(0.0, 0.0));
    feed(&mut c, 8900, lin(0.0, 0.0));
    assert_eq!(c.markers_dropped(), 1);
    feed(&mut c, 9000, lin(0.0, 0.0));
    assert_eq!(c.markers_dropped(), 2);
}

#[rstest]
fn hold_current_strategy_keeps_vehicle_yaw() {
    let bus = SimBus::new();
    let mut s = settings();
    s.heading.mode = pathmark_core::HeadingMode::HoldCurrent;
    let mut c = controller(&bus, s);
    drive_to_orienting(&mut c);
    let att = bus.last_attitude().unwrap();
    assert!(att.euler_rpy.z.abs() < 1e-9);
}

#[rstest]
fn custom_strategy_closure_is_used() {
    let bus = SimBus::new();
    let mut c = TaskController::builder()
        .with_transport(bus.clone())
        .with_resolver(bus.resolver())
        .with_settings(settings())
        .with_heading_strategy(|ctx: &pathmark_core::HeadingContext| {
            Some(pathmark_core::HeadingPlan {
                yaw_deg: ctx.reading.vehicle_yaw_deg + 370.0,
                offset: pathmark_traits::Vector3::new(0.0, 25.0, 0.0),
            })
        })
        .build()
        .unwrap();
    drive_to_orienting(&mut c);
    // 370 wraps to 10
    assert!((bus.last_attitude().unwrap().euler_rpy.z - 10.0).abs() < 1e-9);
    assert_eq!(c.heading_plan().unwrap().offset.y, 25.0);
}
