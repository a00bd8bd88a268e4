//! Task phase and the status returned from each handled event.

use pathmark_traits::Stream;

use crate::error::TaskError;

/// Step of the path marker sequence. Advances monotonically; only `abort()`
/// and `start()` move it backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Detecting,
    AligningCenter,
    AligningBboxWidth,
    OrientingHeading,
    AligningOffset,
    Dropping,
    Done,
    Aborted,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Done | Phase::Aborted)
    }

    pub fn name(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Detecting => "detecting",
            Phase::AligningCenter => "aligning_center",
            Phase::AligningBboxWidth => "aligning_bbox_width",
            Phase::OrientingHeading => "orienting_heading",
            Phase::AligningOffset => "aligning_offset",
            Phase::Dropping => "dropping",
            Phase::Done => "done",
            Phase::Aborted => "aborted",
        }
    }
}

/// Public status of one handled event.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskStatus {
    /// Not started (or aborted by the operator); the event was ignored.
    Idle,
    /// Keep feeding events.
    Running,
    /// Both markers dropped; outputs released and subscriptions closed.
    Complete,
    /// Stopped with a typed error; outputs released.
    Aborted(TaskError),
}

/// Point-in-time view of the controller for telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSnapshot {
    pub phase: Phase,
    pub attempts: u32,
    pub detections_in_window: u32,
    pub markers_dropped: u8,
    pub active_stream: Option<Stream>,
}
