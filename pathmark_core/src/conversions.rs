//! `From` implementations bridging `pathmark_config` types to `pathmark_core` types.

use pathmark_config::{BboxControlCfg, HeadingStrategyCfg, PlaneCfg};
use pathmark_traits::{AlignmentPlane, BboxControl};

use crate::config::{
    AlignmentCfg, DetectionCfg, DropCfg, FrameCfg, HeadingCfg, HeadingMode, TaskCfg, TaskSettings,
};

// ── Enums ────────────────────────────────────────────────────────────────────

// Both sides are foreign here, so these are plain fns rather than `From` impls.
fn plane_from(p: PlaneCfg) -> AlignmentPlane {
    match p {
        PlaneCfg::Xy => AlignmentPlane::Xy,
        PlaneCfg::Yz => AlignmentPlane::Yz,
    }
}

fn bbox_from(b: BboxControlCfg) -> BboxControl {
    match b {
        BboxControlCfg::Width => BboxControl::Width,
        BboxControlCfg::Height => BboxControl::Height,
    }
}

impl From<HeadingStrategyCfg> for HeadingMode {
    fn from(s: HeadingStrategyCfg) -> Self {
        match s {
            HeadingStrategyCfg::NormalToFeature => HeadingMode::NormalToFeature,
            HeadingStrategyCfg::HoldCurrent => HeadingMode::HoldCurrent,
        }
    }
}

// ── TaskCfg ──────────────────────────────────────────────────────────────────

impl From<&pathmark_config::TaskCfg> for TaskCfg {
    fn from(c: &pathmark_config::TaskCfg) -> Self {
        Self {
            object_name: c.object_name.clone(),
            alignment_plane: plane_from(c.alignment_plane),
            bbox_control: bbox_from(c.bbox_control),
            bbox_dim_ratio: c.bbox_dim_ratio,
            require_bbox_width: c.require_bbox_width,
        }
    }
}

// ── FrameCfg ─────────────────────────────────────────────────────────────────

impl From<&pathmark_config::FrameCfg> for FrameCfg {
    fn from(c: &pathmark_config::FrameCfg) -> Self {
        Self {
            width: c.width,
            height: c.height,
        }
    }
}

// ── AlignmentCfg ─────────────────────────────────────────────────────────────

impl From<&pathmark_config::AlignmentCfg> for AlignmentCfg {
    fn from(c: &pathmark_config::AlignmentCfg) -> Self {
        Self {
            align_thresh: c.align_thresh,
            bbox_thresh: c.bbox_thresh,
            yaw_thresh: c.yaw_thresh,
            error_duration_ms: c.error_duration_ms,
            bbox_heave_duration_ms: c.bbox_heave_duration_ms,
        }
    }
}

// ── DetectionCfg ─────────────────────────────────────────────────────────────

impl From<&pathmark_config::DetectionCfg> for DetectionCfg {
    fn from(c: &pathmark_config::DetectionCfg) -> Self {
        Self {
            detections_required: c.detections_required,
            detection_duration_ms: c.detection_duration_ms,
            max_attempts: c.max_attempts,
            min_probability: c.min_probability,
        }
    }
}

// ── DropCfg ──────────────────────────────────────────────────────────────────

impl From<&pathmark_config::DropCfg> for DropCfg {
    fn from(c: &pathmark_config::DropCfg) -> Self {
        Self {
            drop_duration_ms: c.drop_duration_ms,
            pulse_ms: c.pulse_ms,
            max_markers: c.max_markers,
        }
    }
}

// ── HeadingCfg ───────────────────────────────────────────────────────────────

impl From<&pathmark_config::HeadingCfg> for HeadingCfg {
    fn from(c: &pathmark_config::HeadingCfg) -> Self {
        Self {
            mode: c.strategy.into(),
            offset_fraction: c.offset_fraction,
        }
    }
}

// ── TaskSettings ─────────────────────────────────────────────────────────────

impl From<&pathmark_config::Config> for TaskSettings {
    fn from(c: &pathmark_config::Config) -> Self {
        Self {
            task: (&c.task).into(),
            frame: (&c.frame).into(),
            alignment: (&c.alignment).into(),
            detection: (&c.detection).into(),
            drop_cfg: (&c.drop_cfg).into(),
            heading: (&c.heading).into(),
        }
    }
}
