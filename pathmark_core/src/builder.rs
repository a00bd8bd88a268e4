//! Type-state builder for `TaskController` and generic `build_task` constructor.
//!
//! The builder enforces at compile time that a transport and a heading
//! resolver are provided before `build()` is available. `try_build()` is
//! always available for dynamic checks.

use std::marker::PhantomData;

use pathmark_traits::{
    HeadingResolver, HeadingTicket, Inbound, MissionHooks, Stream, TaskOutcome, Transport,
};

use crate::config::{
    AlignmentCfg, DetectionCfg, DropCfg, FrameCfg, HeadingCfg, TaskCfg, TaskSettings,
};
use crate::controller::TaskCore;
use crate::error::{BuildError, Result};
use crate::heading::{HeadingPlan, HeadingStrategy, strategy_for};
use crate::runner::{RecordedEvent, RunSummary};
use crate::status::{Phase, TaskSnapshot, TaskStatus};

// ── Public dynamic-dispatch wrapper ──────────────────────────────────────────

/// Task controller over boxed collaborators.
pub struct TaskController {
    pub(crate) inner: TaskCore<Box<dyn Transport>, Box<dyn HeadingResolver>>,
}

impl core::fmt::Debug for TaskController {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TaskController")
            .field("phase", &self.inner.phase)
            .field("active_stream", &self.inner.active_stream)
            .field("markers_dropped", &self.inner.markers_dropped())
            .finish()
    }
}

impl TaskController {
    /// Start building a TaskController.
    pub fn builder() -> TaskControllerBuilder<Missing, Missing> {
        TaskControllerBuilder::default()
    }

    pub fn start(&mut self, now_ms: u64) -> Result<()> {
        self.inner.start(now_ms)
    }

    pub fn handle(&mut self, now_ms: u64, event: &Inbound) -> Result<TaskStatus> {
        self.inner.handle(now_ms, event)
    }

    /// Stop and return to `Idle` (best-effort, infallible).
    pub fn abort(&mut self) {
        self.inner.abort();
    }

    pub fn phase(&self) -> Phase {
        self.inner.phase()
    }

    pub fn active_stream(&self) -> Option<Stream> {
        self.inner.active_stream()
    }

    pub fn pending_heading(&self) -> Option<HeadingTicket> {
        self.inner.pending_heading()
    }

    pub fn markers_dropped(&self) -> u8 {
        self.inner.markers_dropped()
    }

    pub fn heading_plan(&self) -> Option<HeadingPlan> {
        self.inner.heading_plan()
    }

    pub fn settings(&self) -> &TaskSettings {
        self.inner.settings()
    }

    pub fn snapshot(&self) -> TaskSnapshot {
        self.inner.snapshot()
    }

    /// Start the task and feed it a recorded event sequence.
    pub fn run_recorded<I>(&mut self, start_ms: u64, events: I) -> Result<RunSummary>
    where
        I: IntoIterator<Item = (u64, RecordedEvent)>,
    {
        crate::runner::run_recorded(&mut self.inner, start_ms, events)
    }
}

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `TaskController`. All settings are validated on `build()`.
pub struct TaskControllerBuilder<T, R> {
    transport: Option<Box<dyn Transport>>,
    resolver: Option<Box<dyn HeadingResolver>>,
    settings: TaskSettings,
    strategy: Option<Box<dyn HeadingStrategy>>,
    hooks: Option<Box<dyn MissionHooks>>,
    _t: PhantomData<T>,
    _r: PhantomData<R>,
}

impl Default for TaskControllerBuilder<Missing, Missing> {
    fn default() -> Self {
        Self {
            transport: None,
            resolver: None,
            settings: TaskSettings::default(),
            strategy: None,
            hooks: None,
            _t: PhantomData,
            _r: PhantomData,
        }
    }
}

fn invalid(msg: &'static str) -> eyre::Report {
    eyre::Report::new(BuildError::InvalidConfig(msg))
}

/// Validate settings and construct a `TaskCore`.
///
/// Shared by `TaskControllerBuilder::try_build()` and `build_task()`.
fn validate_and_build<T: Transport, H: HeadingResolver>(
    transport: T,
    resolver: H,
    settings: TaskSettings,
    strategy: Option<Box<dyn HeadingStrategy>>,
    hooks: Option<Box<dyn MissionHooks>>,
) -> Result<TaskCore<T, H>> {
    let TaskSettings {
        task,
        frame,
        alignment,
        detection,
        drop_cfg,
        heading,
    } = &settings;

    if task.object_name.trim().is_empty() {
        return Err(invalid("object_name must not be empty"));
    }
    if !(task.bbox_dim_ratio > 0.0 && task.bbox_dim_ratio <= 1.0) {
        return Err(invalid("bbox_dim_ratio must be in (0.0, 1.0]"));
    }
    if frame.width == 0 || frame.height == 0 {
        return Err(invalid("frame dimensions must be > 0"));
    }
    for v in [
        alignment.align_thresh,
        alignment.bbox_thresh,
        alignment.yaw_thresh,
    ] {
        if !(v.is_finite() && v > 0.0) {
            return Err(invalid("alignment thresholds must be finite and > 0"));
        }
    }
    if detection.detections_required == 0 {
        return Err(invalid("detections_required must be >= 1"));
    }
    if detection.detection_duration_ms == 0 {
        return Err(invalid("detection_duration_ms must be >= 1"));
    }
    if detection.max_attempts == Some(0) {
        return Err(invalid("max_attempts must be >= 1 when set"));
    }
    if !(1..=2).contains(&drop_cfg.max_markers) {
        return Err(invalid("max_markers must be 1 or 2"));
    }
    if drop_cfg.pulse_ms == 0 {
        return Err(invalid("pulse_ms must be >= 1"));
    }
    if !(heading.offset_fraction.is_finite() && (0.0..0.5).contains(&heading.offset_fraction)) {
        return Err(invalid("offset_fraction must be in [0.0, 0.5)"));
    }

    let strategy = strategy.unwrap_or_else(|| strategy_for(heading.mode));
    Ok(TaskCore::new(transport, resolver, settings, strategy, hooks))
}

impl<T, R> TaskControllerBuilder<T, R> {
    /// Fallible build available in any type-state; returns detailed error for missing pieces.
    pub fn try_build(self) -> Result<TaskController> {
        let transport = self
            .transport
            .ok_or_else(|| eyre::Report::new(BuildError::MissingTransport))?;
        let resolver = self
            .resolver
            .ok_or_else(|| eyre::Report::new(BuildError::MissingResolver))?;

        let inner = validate_and_build(
            transport,
            resolver,
            self.settings,
            self.strategy,
            self.hooks,
        )?;
        Ok(TaskController { inner })
    }
}

/// Chainable setters that do not affect type-state.
impl<T, R> TaskControllerBuilder<T, R> {
    /// Replace all settings at once, e.g. from `pathmark_config::Config`.
    pub fn with_settings(mut self, settings: TaskSettings) -> Self {
        self.settings = settings;
        self
    }
    pub fn with_task(mut self, task: TaskCfg) -> Self {
        self.settings.task = task;
        self
    }
    pub fn with_frame(mut self, frame: FrameCfg) -> Self {
        self.settings.frame = frame;
        self
    }
    pub fn with_alignment(mut self, alignment: AlignmentCfg) -> Self {
        self.settings.alignment = alignment;
        self
    }
    pub fn with_detection(mut self, detection: DetectionCfg) -> Self {
        self.settings.detection = detection;
        self
    }
    pub fn with_drop(mut self, drop_cfg: DropCfg) -> Self {
        self.settings.drop_cfg = drop_cfg;
        self
    }
    pub fn with_heading(mut self, heading: HeadingCfg) -> Self {
        self.settings.heading = heading;
        self
    }
    /// Override the heading strategy selected by `HeadingCfg::mode`.
    pub fn with_heading_strategy(mut self, strategy: impl HeadingStrategy + 'static) -> Self {
        self.strategy = Some(Box::new(strategy));
        self
    }
    /// Completion hook of the outer mission sequencer.
    pub fn with_hooks(mut self, hooks: impl MissionHooks + 'static) -> Self {
        self.hooks = Some(Box::new(hooks));
        self
    }
    /// Convenience for closure hooks.
    pub fn on_finished<F>(self, f: F) -> Self
    where
        F: FnMut(TaskOutcome) + 'static,
    {
        self.with_hooks(f)
    }
}

// Setters that advance type-state
impl<R> TaskControllerBuilder<Missing, R> {
    pub fn with_transport(
        self,
        transport: impl Transport + 'static,
    ) -> TaskControllerBuilder<Set, R> {
        TaskControllerBuilder {
            transport: Some(Box::new(transport)),
            resolver: self.resolver,
            settings: self.settings,
            strategy: self.strategy,
            hooks: self.hooks,
            _t: PhantomData,
            _r: PhantomData,
        }
    }
}

impl<T> TaskControllerBuilder<T, Missing> {
    pub fn with_resolver(
        self,
        resolver: impl HeadingResolver + 'static,
    ) -> TaskControllerBuilder<T, Set> {
        TaskControllerBuilder {
            transport: self.transport,
            resolver: Some(Box::new(resolver)),
            settings: self.settings,
            strategy: self.strategy,
            hooks: self.hooks,
            _t: PhantomData,
            _r: PhantomData,
        }
    }
}

impl TaskControllerBuilder<Set, Set> {
    /// Validate and build. Only available when transport and resolver are set.
    pub fn build(self) -> Result<TaskController> {
        self.try_build()
    }
}

/// Generic, statically-dispatched alias using the unified core.
pub type TaskControllerG<T, H> = TaskCore<T, H>;

/// Build a statically-dispatched controller from concrete collaborators.
///
/// Delegates to the shared `validate_and_build`.
pub fn build_task<T, H>(
    transport: T,
    resolver: H,
    settings: TaskSettings,
    strategy: Option<Box<dyn HeadingStrategy>>,
    hooks: Option<Box<dyn MissionHooks>>,
) -> Result<TaskControllerG<T, H>>
where
    T: Transport + 'static,
    H: HeadingResolver + 'static,
{
    validate_and_build(transport, resolver, settings, strategy, hooks)
}
