//! Message shapes exchanged between the task controller and the vehicle.
//!
//! These mirror the vehicle bus messages the controller consumes and produces.
//! Encoding them for a particular transport is the transport's job.

/// Plain 3-vector (metres, pixels or degrees depending on the message).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Camera plane the alignment controller servoes in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlignmentPlane {
    /// Downward camera, target on the floor.
    #[default]
    Xy,
    /// Forward camera.
    Yz,
}

/// Which bounding-box dimension the heave controller regulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BboxControl {
    Width,
    #[default]
    Height,
}

/// Visual-servo alignment command.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentCommand {
    pub surge_active: bool,
    pub sway_active: bool,
    pub heave_active: bool,
    pub object_name: String,
    pub alignment_plane: AlignmentPlane,
    pub bbox_control: BboxControl,
    /// Target bbox size in pixels along `bbox_control`.
    pub bbox_dim: u32,
    /// Target offset of the object centre in the image frame.
    pub target_pos: Vector3,
}

impl AlignmentCommand {
    /// True when no axis is being driven.
    pub fn is_neutral(&self) -> bool {
        !(self.surge_active || self.sway_active || self.heave_active)
    }
}

/// Attitude setpoint command (degrees).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttitudeCommand {
    pub roll_active: bool,
    pub pitch_active: bool,
    pub yaw_active: bool,
    pub euler_rpy: Vector3,
}

/// Pneumatics actuator command. Only `markerdropper` is driven by the path
/// marker task; the other channels are always sent inactive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActuatorCommand {
    pub torpedo_stbd: bool,
    pub torpedo_port: bool,
    pub markerdropper: bool,
    pub manipulator: bool,
    pub duration_ms: u32,
}

impl ActuatorCommand {
    /// Marker dropper pulse of the given width.
    pub fn marker_pulse(duration_ms: u32) -> Self {
        Self {
            markerdropper: true,
            duration_ms,
            ..Self::default()
        }
    }

    /// All channels released.
    pub fn released() -> Self {
        Self::default()
    }
}

/// One detected object in the camera image.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundingBox {
    pub class: String,
    pub probability: f64,
    pub xmin: i32,
    pub ymin: i32,
    pub xmax: i32,
    pub ymax: i32,
}

impl BoundingBox {
    pub fn width(&self) -> i32 {
        self.xmax.saturating_sub(self.xmin)
    }

    pub fn height(&self) -> i32 {
        self.ymax.saturating_sub(self.ymin)
    }
}

/// A single frame's worth of detections.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Detections {
    pub boxes: Vec<BoundingBox>,
}

/// Signed linear control errors reported by the alignment controller.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LinearStatus {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Signed angular control errors reported by the attitude controller (degrees).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AngularStatus {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

/// Result of a heading request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadingReading {
    /// Orientation of the detected feature in the image, degrees.
    pub heading_deg: f64,
    /// Vehicle yaw at the time the image was taken, degrees.
    pub vehicle_yaw_deg: f64,
}

/// Correlates a heading result with the request that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeadingTicket(pub u64);

/// Inbound streams the controller can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stream {
    Detections,
    LinearStatus,
    AngularStatus,
}

impl Stream {
    pub fn name(self) -> &'static str {
        match self {
            Stream::Detections => "detections",
            Stream::LinearStatus => "linear_status",
            Stream::AngularStatus => "angular_status",
        }
    }
}

/// Final result handed to the mission sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Both markers were dropped.
    Completed,
    /// The target could not be confirmed within the allowed attempts.
    DetectionFailed,
}

/// One inbound event delivered by the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Detections(Detections),
    Linear(LinearStatus),
    Angular(AngularStatus),
    /// Answer to a heading request; not tied to a subscription.
    Heading {
        ticket: HeadingTicket,
        reading: HeadingReading,
    },
}

impl Inbound {
    /// Stream this event arrives on, if it is a subscription stream.
    pub fn stream(&self) -> Option<Stream> {
        match self {
            Inbound::Detections(_) => Some(Stream::Detections),
            Inbound::Linear(_) => Some(Stream::LinearStatus),
            Inbound::Angular(_) => Some(Stream::AngularStatus),
            Inbound::Heading { .. } => None,
        }
    }
}
