//! Runtime configuration for the task controller.
//!
//! These are separate from the TOML-deserialized config in `pathmark_config`;
//! see `conversions` for the mapping.

use pathmark_traits::{AlignmentPlane, BboxControl};

/// What to align on and how the alignment command is shaped.
#[derive(Debug, Clone)]
pub struct TaskCfg {
    /// Object class reported by the vision pipeline for the target.
    pub object_name: String,
    pub alignment_plane: AlignmentPlane,
    pub bbox_control: BboxControl,
    /// Target bbox size as a fraction of the controlled frame dimension.
    pub bbox_dim_ratio: f64,
    /// Insert the bbox heave confirmation between centring and heading.
    pub require_bbox_width: bool,
}

impl Default for TaskCfg {
    fn default() -> Self {
        Self {
            object_name: "PathMarker".to_string(),
            alignment_plane: AlignmentPlane::Xy,
            bbox_control: BboxControl::Height,
            bbox_dim_ratio: 0.7,
            require_bbox_width: false,
        }
    }
}

/// Camera frame size in pixels.
#[derive(Debug, Clone, Copy)]
pub struct FrameCfg {
    pub width: u32,
    pub height: u32,
}

impl Default for FrameCfg {
    fn default() -> Self {
        Self {
            width: 644,
            height: 482,
        }
    }
}

/// Tolerances and settle durations for the alignment confirmations.
#[derive(Debug, Clone, Copy)]
pub struct AlignmentCfg {
    /// |x|,|y| tolerance while centring and while holding the drop offset.
    pub align_thresh: f64,
    /// |z| tolerance during the bbox heave confirmation.
    pub bbox_thresh: f64,
    /// |yaw| tolerance in degrees.
    pub yaw_thresh: f64,
    /// Errors must stay in tolerance this long to settle.
    pub error_duration_ms: u64,
    pub bbox_heave_duration_ms: u64,
}

impl Default for AlignmentCfg {
    fn default() -> Self {
        Self {
            align_thresh: 0.1,
            bbox_thresh: 0.1,
            yaw_thresh: 3.0,
            error_duration_ms: 2000,
            bbox_heave_duration_ms: 3000,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DetectionCfg {
    pub detections_required: u32,
    pub detection_duration_ms: u64,
    /// Abort with `DetectionFailed` once this many attempts have stalled.
    pub max_attempts: Option<u32>,
    /// Boxes of the target class below this probability do not count.
    pub min_probability: f64,
}

impl Default for DetectionCfg {
    fn default() -> Self {
        Self {
            detections_required: 10,
            detection_duration_ms: 2000,
            max_attempts: None,
            min_probability: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DropCfg {
    /// Minimum spacing between two marker pulses.
    pub drop_duration_ms: u64,
    pub pulse_ms: u32,
    pub max_markers: u8,
}

impl Default for DropCfg {
    fn default() -> Self {
        Self {
            drop_duration_ms: 1000,
            pulse_ms: 300,
            max_markers: 2,
        }
    }
}

/// Built-in heading strategies selectable from config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeadingMode {
    #[default]
    NormalToFeature,
    HoldCurrent,
}

#[derive(Debug, Clone, Copy)]
pub struct HeadingCfg {
    pub mode: HeadingMode,
    /// Sway offset of the drop position as a fraction of frame width.
    pub offset_fraction: f64,
}

impl Default for HeadingCfg {
    fn default() -> Self {
        Self {
            mode: HeadingMode::NormalToFeature,
            offset_fraction: 1.0 / 6.0,
        }
    }
}

/// Everything the controller needs besides its collaborators.
#[derive(Debug, Clone, Default)]
pub struct TaskSettings {
    pub task: TaskCfg,
    pub frame: FrameCfg,
    pub alignment: AlignmentCfg,
    pub detection: DetectionCfg,
    pub drop_cfg: DropCfg,
    pub heading: HeadingCfg,
}
