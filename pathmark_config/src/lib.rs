#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and event-log parsing for the path marker task.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - The replay event-log CSV loader enforces exact headers and a known
//!   event kind on every row.
use serde::Deserialize;

/// Replay event-log CSV schema.
///
/// Expected headers:
/// t_ms,kind,a,b,c
///
/// Column meaning depends on `kind`:
/// - detection: a = probability (row with a < 0 means "frame without target")
/// - linear:    a, b, c = x, y, z errors
/// - angular:   a, b, c = roll, pitch, yaw errors (deg)
/// - heading:   a = feature heading (deg), b = vehicle yaw (deg)
///
/// Example:
/// t_ms,kind,a,b,c
/// 0,detection,0.9,0,0
/// 100,linear,0.05,-0.02,0
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct EventRow {
    pub t_ms: u64,
    pub kind: EventKind,
    pub a: f64,
    #[serde(default)]
    pub b: f64,
    #[serde(default)]
    pub c: f64,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Detection,
    Linear,
    Angular,
    Heading,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlaneCfg {
    #[default]
    Xy,
    Yz,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BboxControlCfg {
    Width,
    #[default]
    Height,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum HeadingStrategyCfg {
    /// Turn to a heading normal to the detected feature.
    #[default]
    NormalToFeature,
    /// Keep the current vehicle yaw; only the offset target is applied.
    HoldCurrent,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TaskCfg {
    /// Object class the vision pipeline reports for the target.
    pub object_name: String,
    pub alignment_plane: PlaneCfg,
    pub bbox_control: BboxControlCfg,
    /// Target bbox size as a fraction of the frame dimension it controls.
    pub bbox_dim_ratio: f64,
    /// Insert the bbox heave confirmation between centring and heading.
    pub require_bbox_width: bool,
}

impl Default for TaskCfg {
    fn default() -> Self {
        Self {
            object_name: "PathMarker".to_string(),
            alignment_plane: PlaneCfg::Xy,
            bbox_control: BboxControlCfg::Height,
            bbox_dim_ratio: 0.7,
            require_bbox_width: false,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct FrameCfg {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Deserialize)]
pub struct AlignmentCfg {
    /// |x|,|y| error tolerance while centring and offsetting.
    pub align_thresh: f64,
    /// |z| (bbox-derived) error tolerance.
    pub bbox_thresh: f64,
    /// |yaw| error tolerance in degrees.
    pub yaw_thresh: f64,
    /// Errors must stay in tolerance this long to settle (ms).
    pub error_duration_ms: u64,
    /// Settle duration for the bbox heave confirmation (ms).
    #[serde(default = "default_bbox_heave_duration_ms")]
    pub bbox_heave_duration_ms: u64,
}

fn default_bbox_heave_duration_ms() -> u64 {
    3000
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DetectionCfg {
    pub detections_required: u32,
    pub detection_duration_ms: u64,
    /// Abort after this many stalled attempts. Absent means retry forever.
    pub max_attempts: Option<u32>,
    /// Boxes below this probability are ignored.
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

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DropCfg {
    /// Minimum spacing between two marker pulses (ms).
    pub drop_duration_ms: u64,
    /// Marker dropper pulse width (ms).
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

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HeadingCfg {
    pub strategy: HeadingStrategyCfg,
    /// Sway offset for the drop position as a fraction of frame width.
    pub offset_fraction: f64,
}

impl Default for HeadingCfg {
    fn default() -> Self {
        Self {
            strategy: HeadingStrategyCfg::NormalToFeature,
            offset_fraction: 1.0 / 6.0,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

/// Simulated vehicle used by `pathmark run`.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SimCfg {
    /// Status/detection publication rate.
    pub sample_rate_hz: u32,
    /// Fraction of the remaining error removed per sample (0, 1].
    pub convergence: f64,
    /// Initial centring error on x and y.
    pub initial_error: f64,
    /// Heading the simulated vision routine reports (deg).
    pub feature_heading_deg: f64,
    /// Vehicle yaw at the start of the run (deg).
    pub initial_yaw_deg: f64,
    /// Latency of the heading routine (ms).
    pub heading_latency_ms: u64,
    /// Give up after this much simulated time (ms).
    pub max_run_ms: u64,
    /// Confidence reported for every simulated detection.
    pub detection_probability: f64,
}

impl Default for SimCfg {
    fn default() -> Self {
        Self {
            sample_rate_hz: 20,
            convergence: 0.2,
            initial_error: 0.8,
            feature_heading_deg: 30.0,
            initial_yaw_deg: 0.0,
            heading_latency_ms: 250,
            max_run_ms: 120_000,
            detection_probability: 0.9,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub task: TaskCfg,
    pub frame: FrameCfg,
    pub alignment: AlignmentCfg,
    #[serde(default)]
    pub detection: DetectionCfg,
    #[serde(default, rename = "drop")]
    pub drop_cfg: DropCfg,
    #[serde(default)]
    pub heading: HeadingCfg,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub sim: SimCfg,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

pub fn load_event_log_csv(path: &std::path::Path) -> eyre::Result<Vec<EventRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open event log CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["t_ms", "kind", "a", "b", "c"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "event log CSV must have headers 't_ms,kind,a,b,c', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<EventRow>().enumerate() {
        match rec {
            Ok(row) => {
                if !(row.a.is_finite() && row.b.is_finite() && row.c.is_finite())
                    && row.kind == EventKind::Heading
                {
                    eyre::bail!("heading row {} must carry finite angles", idx + 2);
                }
                rows.push(row);
            }
            Err(e) => {
                eyre::bail!("invalid CSV row {}: {}", idx + 2, e);
            }
        }
    }

    Ok(rows)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Task
        if self.task.object_name.trim().is_empty() {
            eyre::bail!("task.object_name must not be empty");
        }
        if !(self.task.bbox_dim_ratio > 0.0 && self.task.bbox_dim_ratio <= 1.0) {
            eyre::bail!("task.bbox_dim_ratio must be in (0.0, 1.0]");
        }

        // Frame
        if self.frame.width == 0 || self.frame.height == 0 {
            eyre::bail!("frame.width and frame.height must be > 0");
        }

        // Alignment
        for (name, v) in [
            ("alignment.align_thresh", self.alignment.align_thresh),
            ("alignment.bbox_thresh", self.alignment.bbox_thresh),
            ("alignment.yaw_thresh", self.alignment.yaw_thresh),
        ] {
            if !(v.is_finite() && v > 0.0) {
                eyre::bail!("{name} must be a finite value > 0");
            }
        }
        if self.alignment.error_duration_ms > 5 * 60 * 1000 {
            eyre::bail!("alignment.error_duration_ms is unreasonably large (>5min)");
        }
        if self.alignment.bbox_heave_duration_ms > 5 * 60 * 1000 {
            eyre::bail!("alignment.bbox_heave_duration_ms is unreasonably large (>5min)");
        }

        // Detection
        if self.detection.detections_required == 0 {
            eyre::bail!("detection.detections_required must be >= 1");
        }
        if self.detection.detection_duration_ms == 0 {
            eyre::bail!("detection.detection_duration_ms must be >= 1");
        }
        if self.detection.max_attempts == Some(0) {
            eyre::bail!("detection.max_attempts must be >= 1 when set");
        }
        if !(0.0..=1.0).contains(&self.detection.min_probability) {
            eyre::bail!("detection.min_probability must be in [0.0, 1.0]");
        }

        // Drop
        if !(1..=2).contains(&self.drop_cfg.max_markers) {
            eyre::bail!("drop.max_markers must be 1 or 2");
        }
        if self.drop_cfg.pulse_ms == 0 || self.drop_cfg.pulse_ms > 5000 {
            eyre::bail!("drop.pulse_ms must be in [1, 5000]");
        }

        // Heading
        if !(self.heading.offset_fraction.is_finite()
            && (0.0..0.5).contains(&self.heading.offset_fraction))
        {
            eyre::bail!("heading.offset_fraction must be in [0.0, 0.5)");
        }

        // Sim
        if self.sim.sample_rate_hz == 0 {
            eyre::bail!("sim.sample_rate_hz must be > 0");
        }
        if !(self.sim.convergence > 0.0 && self.sim.convergence <= 1.0) {
            eyre::bail!("sim.convergence must be in (0.0, 1.0]");
        }
        if self.sim.max_run_ms == 0 {
            eyre::bail!("sim.max_run_ms must be >= 1");
        }

        Ok(())
    }
}
