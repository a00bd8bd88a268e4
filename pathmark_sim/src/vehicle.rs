//! First-order vehicle plant driven by the commands on a [`SimBus`].
//!
//! Each tick the plant reads any new bus entries, removes a fixed fraction of
//! the remaining alignment and yaw errors, and emits samples for the stream
//! that is currently subscribed plus any heading answers that are due.

use pathmark_traits::{
    AlignmentCommand, AngularStatus, BoundingBox, Detections, HeadingReading, HeadingTicket,
    Inbound, LinearStatus, Stream,
};

use crate::bus::{Publication, SimBus};
use crate::util::wrap_deg;

#[derive(Debug, Clone)]
pub struct VehicleParams {
    pub object_name: String,
    /// Fraction of the remaining error removed per tick, in (0, 1].
    pub convergence: f64,
    /// Error magnitude on every driven axis after a new alignment target.
    pub initial_error: f64,
    /// Direction of the feature relative to the vehicle's starting yaw.
    pub feature_heading_deg: f64,
    pub initial_yaw_deg: f64,
    pub heading_latency_ms: u64,
    /// Confidence attached to every detection; 0 means the target is not seen.
    pub detection_probability: f64,
    pub frame_width: u32,
    pub frame_height: u32,
}

impl Default for VehicleParams {
    fn default() -> Self {
        Self {
            object_name: "PathMarker".to_string(),
            convergence: 0.2,
            initial_error: 0.8,
            feature_heading_deg: 30.0,
            initial_yaw_deg: 0.0,
            heading_latency_ms: 250,
            detection_probability: 0.9,
            frame_width: 644,
            frame_height: 482,
        }
    }
}

#[derive(Debug)]
pub struct SimVehicle {
    bus: SimBus,
    params: VehicleParams,
    error: LinearStatus,
    yaw_deg: f64,
    yaw_target_deg: Option<f64>,
    alignment: Option<AlignmentCommand>,
    cursor: usize,
    heading_due: Vec<(u64, HeadingTicket)>,
}

impl SimVehicle {
    pub fn new(bus: SimBus, params: VehicleParams) -> Self {
        let yaw_deg = params.initial_yaw_deg;
        let e = params.initial_error;
        Self {
            cursor: bus.log_len(),
            bus,
            params,
            error: LinearStatus { x: e, y: e, z: e },
            yaw_deg,
            yaw_target_deg: None,
            alignment: None,
            heading_due: Vec::new(),
        }
    }

    pub fn yaw_deg(&self) -> f64 {
        self.yaw_deg
    }

    pub fn linear_error(&self) -> LinearStatus {
        self.error
    }

    /// Advance the plant to `now_ms` and return the samples it publishes.
    pub fn tick(&mut self, now_ms: u64) -> Vec<Inbound> {
        self.absorb_commands(now_ms);
        self.step_plant();

        let mut out = Vec::new();
        match self.bus.active_stream() {
            Some(Stream::Detections) => out.push(Inbound::Detections(self.detections())),
            Some(Stream::LinearStatus) => out.push(Inbound::Linear(self.error)),
            Some(Stream::AngularStatus) => out.push(Inbound::Angular(AngularStatus {
                roll: 0.0,
                pitch: 0.0,
                yaw: self.yaw_error(),
            })),
            None => {}
        }

        let (due, pending): (Vec<_>, Vec<_>) = self
            .heading_due
            .drain(..)
            .partition(|(at, _)| *at <= now_ms);
        self.heading_due = pending;
        for (_, ticket) in due {
            let feature_world = self.params.initial_yaw_deg + self.params.feature_heading_deg;
            out.push(Inbound::Heading {
                ticket,
                reading: HeadingReading {
                    heading_deg: wrap_deg(feature_world - self.yaw_deg),
                    vehicle_yaw_deg: self.yaw_deg,
                },
            });
        }
        out
    }

    fn absorb_commands(&mut self, now_ms: u64) {
        let fresh = self.bus.log_since(self.cursor);
        self.cursor += fresh.len();
        for p in fresh {
            match p {
                Publication::Alignment(cmd) => self.on_alignment(cmd),
                Publication::Attitude(cmd) => {
                    self.yaw_target_deg = cmd.yaw_active.then_some(cmd.euler_rpy.z);
                }
                Publication::HeadingRequested(ticket) => {
                    let at = now_ms.saturating_add(self.params.heading_latency_ms);
                    self.heading_due.push((at, ticket));
                }
                Publication::Actuator(cmd) if cmd.markerdropper => {
                    tracing::debug!(duration_ms = cmd.duration_ms, "marker released");
                }
                _ => {}
            }
        }
    }

    fn on_alignment(&mut self, cmd: AlignmentCommand) {
        let retarget = match &self.alignment {
            Some(prev) => prev.target_pos != cmd.target_pos || prev.heave_active != cmd.heave_active,
            None => true,
        };
        if !cmd.is_neutral() && retarget {
            let e = self.params.initial_error;
            if cmd.surge_active || cmd.sway_active {
                self.error.x = e;
                self.error.y = e;
            }
            if cmd.heave_active {
                self.error.z = e;
            }
        }
        self.alignment = Some(cmd);
    }

    fn step_plant(&mut self) {
        let keep = 1.0 - self.params.convergence;
        if let Some(cmd) = &self.alignment {
            if cmd.surge_active {
                self.error.x *= keep;
            }
            if cmd.sway_active {
                self.error.y *= keep;
            }
            if cmd.heave_active {
                self.error.z *= keep;
            }
        }
        if self.yaw_target_deg.is_some() {
            let err = self.yaw_error();
            self.yaw_deg = wrap_deg(self.yaw_deg + err * self.params.convergence);
        }
    }

    fn yaw_error(&self) -> f64 {
        self.yaw_target_deg
            .map_or(0.0, |target| wrap_deg(target - self.yaw_deg))
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    fn detections(&self) -> Detections {
        if self.params.detection_probability <= 0.0 {
            return Detections::default();
        }
        let w = self.params.frame_width as i32;
        let h = self.params.frame_height as i32;
        Detections {
            boxes: vec![BoundingBox {
                class: self.params.object_name.clone(),
                probability: self.params.detection_probability,
                xmin: w / 4,
                ymin: h / 4,
                xmax: 3 * w / 4,
                ymax: 3 * h / 4,
            }],
        }
    }
}
