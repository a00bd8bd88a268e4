//! Settle monitors for the alignment confirmations.
//!
//! Each confirmation watches a fixed set of control-error axes on one status
//! stream and settles once every watched error stays strictly inside its
//! tolerance for the configured duration.

use pathmark_traits::{AngularStatus, LinearStatus, Stream};

use crate::config::AlignmentCfg;
use crate::debounce::{Debounce, DebounceTimer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
    Yaw,
}

/// One status sample from either error stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatusSample {
    Linear(LinearStatus),
    Angular(AngularStatus),
}

impl StatusSample {
    /// Error on `axis`, or `None` if this sample does not carry it.
    pub fn error(&self, axis: Axis) -> Option<f64> {
        match (self, axis) {
            (StatusSample::Linear(s), Axis::X) => Some(s.x),
            (StatusSample::Linear(s), Axis::Y) => Some(s.y),
            (StatusSample::Linear(s), Axis::Z) => Some(s.z),
            (StatusSample::Angular(s), Axis::Yaw) => Some(s.yaw),
            _ => None,
        }
    }
}

/// Which alignment is being confirmed, with its tolerance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Confirmation {
    /// x and y centred over the target.
    Center { align_thresh: f64 },
    /// z (bbox size) at the commanded dimension.
    BboxWidth { bbox_thresh: f64 },
    /// Yaw at the commanded heading.
    Heading { yaw_thresh: f64 },
    /// x and y at the drop offset.
    Offset { align_thresh: f64 },
}

impl Confirmation {
    pub fn center(cfg: &AlignmentCfg) -> Self {
        Confirmation::Center {
            align_thresh: cfg.align_thresh,
        }
    }

    pub fn bbox_width(cfg: &AlignmentCfg) -> Self {
        Confirmation::BboxWidth {
            bbox_thresh: cfg.bbox_thresh,
        }
    }

    pub fn heading(cfg: &AlignmentCfg) -> Self {
        Confirmation::Heading {
            yaw_thresh: cfg.yaw_thresh,
        }
    }

    pub fn offset(cfg: &AlignmentCfg) -> Self {
        Confirmation::Offset {
            align_thresh: cfg.align_thresh,
        }
    }

    pub fn axes(self) -> &'static [Axis] {
        match self {
            Confirmation::Center { .. } | Confirmation::Offset { .. } => &[Axis::X, Axis::Y],
            Confirmation::BboxWidth { .. } => &[Axis::Z],
            Confirmation::Heading { .. } => &[Axis::Yaw],
        }
    }

    pub fn threshold(self) -> f64 {
        match self {
            Confirmation::Center { align_thresh } | Confirmation::Offset { align_thresh } => {
                align_thresh
            }
            Confirmation::BboxWidth { bbox_thresh } => bbox_thresh,
            Confirmation::Heading { yaw_thresh } => yaw_thresh,
        }
    }

    /// Status stream the watched errors arrive on.
    pub fn stream(self) -> Stream {
        match self {
            Confirmation::Heading { .. } => Stream::AngularStatus,
            _ => Stream::LinearStatus,
        }
    }

    /// How long the errors must stay inside tolerance.
    pub fn required_ms(self, cfg: &AlignmentCfg) -> u64 {
        match self {
            Confirmation::BboxWidth { .. } => cfg.bbox_heave_duration_ms,
            _ => cfg.error_duration_ms,
        }
    }

    /// True when every watched error is finite and strictly below tolerance.
    /// A sample from the wrong stream never counts as in tolerance.
    pub fn within_tolerance(self, sample: &StatusSample) -> bool {
        let thresh = self.threshold();
        self.axes()
            .iter()
            .all(|&axis| sample.error(axis).is_some_and(|e| e.is_finite() && e.abs() < thresh))
    }
}

/// A confirmation plus its settle timer.
#[derive(Debug, Clone)]
pub struct AlignmentMonitor {
    kind: Confirmation,
    timer: DebounceTimer,
}

impl AlignmentMonitor {
    pub fn new(kind: Confirmation, cfg: &AlignmentCfg) -> Self {
        Self {
            kind,
            timer: DebounceTimer::new(kind.required_ms(cfg)),
        }
    }

    pub fn kind(&self) -> Confirmation {
        self.kind
    }

    pub fn observe(&mut self, sample: &StatusSample, now_ms: u64) -> Debounce {
        let holds = self.kind.within_tolerance(sample);
        self.timer.observe(holds, now_ms)
    }

    pub fn reset(&mut self) {
        self.timer.reset();
    }

    pub fn is_tracking(&self) -> bool {
        self.timer.is_running()
    }
}
