use std::cell::RefCell;
use std::rc::Rc;

use pathmark_core::error::{AbortReason, TaskError};
use pathmark_core::{
    AlignmentCfg, DetectionCfg, DropCfg, Phase, TaskController, TaskSettings, TaskSnapshot,
    TaskStatus,
};
use pathmark_sim::{Publication, SimBus, SimError};
use pathmark_traits::{
    ActuatorCommand, AngularStatus, BoundingBox, Detections, HeadingReading, HeadingTicket,
    Inbound, LinearStatus, Stream, TaskOutcome,
};
use rstest::rstest;

fn seen() -> Inbound {
    Inbound::Detections(Detections {
        boxes: vec![BoundingBox {
            class: "PathMarker".into(),
            probability: 0.9,
            xmin: 0,
            ymin: 0,
            xmax: 10,
            ymax: 10,
        }],
    })
}

fn settings(max_attempts: Option<u32>) -> TaskSettings {
    TaskSettings {
        detection: DetectionCfg {
            detections_required: 3,
            detection_duration_ms: 1000,
            max_attempts,
            ..DetectionCfg::default()
        },
        ..TaskSettings::default()
    }
}

fn controller(bus: &SimBus, s: TaskSettings) -> TaskController {
    TaskController::builder()
        .with_transport(bus.clone())
        .with_resolver(bus.resolver())
        .with_settings(s)
        .build()
        .unwrap()
}

#[rstest]
fn abort_resets_and_releases_outputs() {
    let bus = SimBus::new();
    let mut c = controller(&bus, settings(None));
    c.start(0).unwrap();
    c.handle(0, &seen()).unwrap();
    c.handle(10, &seen()).unwrap();
    c.handle(20, &seen()).unwrap();
    assert_eq!(c.phase(), Phase::AligningCenter);
    bus.clear_log();

    c.abort();
    assert_eq!(c.phase(), Phase::Idle);
    assert_eq!(c.active_stream(), None);
    assert_eq!(bus.active_stream(), None);
    let snap = c.snapshot();
    assert_eq!((snap.attempts, snap.detections_in_window, snap.markers_dropped), (0, 0, 0));

    let log = bus.log();
    assert_eq!(log[0], Publication::Unsubscribed(Stream::LinearStatus));
    assert!(matches!(&log[1], Publication::Alignment(cmd) if cmd.is_neutral()));
    assert_eq!(log[2], Publication::Actuator(ActuatorCommand::released()));
}

#[rstest]
fn abort_is_idempotent() {
    let bus = SimBus::new();
    let mut c = controller(&bus, settings(None));
    c.start(0).unwrap();
    c.abort();
    let first = c.snapshot();
    c.abort();
    assert_eq!(c.snapshot(), first);
    // the second abort has nothing to unsubscribe
    let unsubs = bus
        .log()
        .iter()
        .filter(|p| matches!(p, Publication::Unsubscribed(_)))
        .count();
    assert_eq!(unsubs, 1);
}

#[rstest]
fn abort_survives_transport_failure() {
    let bus = SimBus::new();
    let mut c = controller(&bus, settings(None));
    c.start(0).unwrap();
    bus.fail_next(SimError::Injected("link down".into()));
    c.abort();
    assert_eq!(c.phase(), Phase::Idle);
    assert_eq!(c.active_stream(), None);
}

#[rstest]
fn events_after_abort_are_ignored_until_restart() {
    let bus = SimBus::new();
    let mut c = controller(&bus, settings(None));
    c.start(0).unwrap();
    c.abort();
    assert_eq!(c.handle(100, &seen()).unwrap(), TaskStatus::Idle);

    c.start(200).unwrap();
    assert_eq!(c.phase(), Phase::Detecting);
    assert_eq!(bus.active_stream(), Some(Stream::Detections));
}

#[rstest]
fn detection_cap_aborts_with_failure_outcome() {
    let bus = SimBus::new();
    let outcome = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&outcome);
    let mut c = TaskController::builder()
        .with_transport(bus.clone())
        .with_resolver(bus.resolver())
        .with_settings(settings(Some(2)))
        .on_finished(move |o| sink.borrow_mut().push(o))
        .build()
        .unwrap();
    c.start(0).unwrap();

    // attempt 1 stalls
    c.handle(0, &seen()).unwrap();
    assert_eq!(c.handle(1500, &seen()).unwrap(), TaskStatus::Running);
    // attempt 2 stalls: cap reached
    c.handle(1600, &seen()).unwrap();
    let status = c.handle(3000, &seen()).unwrap();
    assert_eq!(
        status,
        TaskStatus::Aborted(TaskError::Abort(AbortReason::DetectionFailed))
    );
    assert_eq!(c.phase(), Phase::Aborted);
    assert_eq!(bus.active_stream(), None);
    assert_eq!(*outcome.borrow(), vec![TaskOutcome::DetectionFailed]);

    // latched until restart
    assert!(matches!(
        c.handle(3100, &seen()).unwrap(),
        TaskStatus::Aborted(_)
    ));
    assert_eq!(outcome.borrow().len(), 1);
}

#[rstest]
fn without_cap_stalls_retry_forever() {
    let bus = SimBus::new();
    let mut c = controller(&bus, settings(None));
    c.start(0).unwrap();
    let mut t = 0;
    for _ in 0..50 {
        c.handle(t, &seen()).unwrap();
        t += 1500;
    }
    assert_eq!(c.phase(), Phase::Detecting);
    assert!(c.snapshot().attempts >= 25);
}

#[rstest]
fn transport_failure_surfaces_as_typed_error() {
    let bus = SimBus::new();
    let mut c = controller(&bus, settings(None));
    c.start(0).unwrap();
    c.handle(0, &seen()).unwrap();
    c.handle(10, &seen()).unwrap();
    bus.fail_next(SimError::Timeout);
    let err = c.handle(20, &seen()).expect_err("unsubscribe fails");
    match err.downcast_ref::<TaskError>() {
        Some(TaskError::Timeout) => {}
        other => panic!("expected TaskError::Timeout, got {other:?}"),
    }
    // the caller aborts
    c.abort();
    assert_eq!(c.phase(), Phase::Idle);
}

// Short settle times so a full run fits in under a second of task time.
fn flow_settings() -> TaskSettings {
    TaskSettings {
        alignment: AlignmentCfg {
            error_duration_ms: 100,
            ..AlignmentCfg::default()
        },
        detection: DetectionCfg {
            detections_required: 2,
            detection_duration_ms: 1000,
            max_attempts: Some(1),
            ..DetectionCfg::default()
        },
        drop_cfg: DropCfg {
            drop_duration_ms: 100,
            ..DropCfg::default()
        },
        ..TaskSettings::default()
    }
}

fn heading_for(ticket: HeadingTicket) -> Inbound {
    Inbound::Heading {
        ticket,
        reading: HeadingReading {
            heading_deg: 10.0,
            vehicle_yaw_deg: 0.0,
        },
    }
}

enum Step {
    Event(Inbound),
    // answer whatever request is outstanding
    Heading,
}

fn flow(t0: u64) -> Vec<(u64, Step)> {
    let lin = || Step::Event(Inbound::Linear(LinearStatus::default()));
    let ang = || Step::Event(Inbound::Angular(AngularStatus::default()));
    vec![
        (t0, Step::Event(seen())),
        (t0 + 50, Step::Event(seen())),
        (t0 + 100, lin()),
        (t0 + 200, lin()),
        (t0 + 250, Step::Heading),
        (t0 + 300, ang()),
        (t0 + 400, ang()),
        (t0 + 500, lin()),
        (t0 + 600, lin()),
        (t0 + 650, lin()),
        (t0 + 700, lin()),
        (t0 + 800, lin()),
    ]
}

/// Start at `t0` and feed the nominal run until the controller first reaches
/// `target`. `Aborted` is reached by letting the only detection attempt stall.
fn drive_to(c: &mut TaskController, t0: u64, target: Phase) {
    c.start(t0).unwrap();
    let script = if target == Phase::Aborted {
        vec![(t0, Step::Event(seen())), (t0 + 1500, Step::Event(seen()))]
    } else {
        flow(t0)
    };
    for (now, step) in script {
        if c.phase() == target {
            break;
        }
        let event = match step {
            Step::Event(e) => e,
            Step::Heading => heading_for(c.pending_heading().expect("heading requested")),
        };
        c.handle(now, &event).unwrap();
    }
    assert_eq!(c.phase(), target);
}

#[rstest]
#[case::detecting(Phase::Detecting, 0)]
#[case::aligning_center(Phase::AligningCenter, 0)]
#[case::orienting_heading(Phase::OrientingHeading, 0)]
#[case::aligning_offset(Phase::AligningOffset, 0)]
#[case::dropping(Phase::Dropping, 1)]
#[case::done(Phase::Done, 2)]
#[case::aborted(Phase::Aborted, 0)]
fn abort_from_any_phase_leaves_the_same_state(#[case] phase: Phase, #[case] markers: u8) {
    let bus = SimBus::new();
    let mut c = controller(&bus, flow_settings());
    drive_to(&mut c, 0, phase);
    assert_eq!(c.markers_dropped(), markers);
    if phase == Phase::OrientingHeading {
        assert!(c.pending_heading().is_some());
    }
    let mark = bus.log_len();

    c.abort();
    assert_eq!(
        c.snapshot(),
        TaskSnapshot {
            phase: Phase::Idle,
            attempts: 0,
            detections_in_window: 0,
            markers_dropped: 0,
            active_stream: None,
        }
    );
    assert_eq!(c.pending_heading(), None);
    assert_eq!(bus.active_stream(), None);

    let since = bus.log_since(mark);
    assert!(
        since
            .iter()
            .any(|p| matches!(p, Publication::Alignment(cmd) if cmd.is_neutral())),
        "no neutral alignment after abort: {since:?}"
    );
    assert!(since.contains(&Publication::Actuator(ActuatorCommand::released())));
}

#[rstest]
fn heading_result_from_before_abort_is_ignored_after_restart() {
    let bus = SimBus::new();
    let mut c = controller(&bus, flow_settings());
    drive_to(&mut c, 0, Phase::OrientingHeading);
    let old = c.pending_heading().unwrap();
    c.abort();

    // still searching: the old answer is dropped
    c.start(1000).unwrap();
    assert_eq!(c.handle(1010, &heading_for(old)).unwrap(), TaskStatus::Running);
    assert_eq!(c.phase(), Phase::Detecting);
    c.abort();

    drive_to(&mut c, 2000, Phase::OrientingHeading);
    let current = c.pending_heading().unwrap();
    assert_ne!(current, old);
    let mark = bus.log_len();
    assert_eq!(c.handle(2300, &heading_for(old)).unwrap(), TaskStatus::Running);
    assert_eq!(c.phase(), Phase::OrientingHeading);
    assert_eq!(c.pending_heading(), Some(current));
    assert!(
        !bus
            .log_since(mark)
            .iter()
            .any(|p| matches!(p, Publication::Attitude(_)))
    );

    c.handle(2310, &heading_for(current)).unwrap();
    assert_eq!(c.pending_heading(), None);
    assert_eq!(c.active_stream(), Some(Stream::AngularStatus));
}

#[rstest]
fn failed_restart_leaves_a_reset_controller() {
    let bus = SimBus::new();
    let mut c = controller(&bus, flow_settings());
    drive_to(&mut c, 0, Phase::AligningCenter);
    c.handle(100, &Inbound::Linear(LinearStatus::default())).unwrap();

    bus.fail_next(SimError::Injected("link down".into()));
    assert!(c.start(150).is_err());
    assert_eq!(
        c.snapshot(),
        TaskSnapshot {
            phase: Phase::Idle,
            attempts: 0,
            detections_in_window: 0,
            markers_dropped: 0,
            active_stream: None,
        }
    );
    assert_eq!(
        c.handle(200, &Inbound::Linear(LinearStatus::default())).unwrap(),
        TaskStatus::Idle
    );
}
