//! The path marker task state machine (`TaskCore`).
//!
//! Events are handled run-to-completion. Each handler consults only the
//! component that is active for the current phase: the detection gate while
//! detecting, one alignment monitor while aligning or orienting, and the
//! actuator sequencer once the drop offset has settled.

use eyre::WrapErr;
use pathmark_traits::{
    AlignmentCommand, AttitudeCommand, ActuatorCommand, Detections, HeadingReading,
    HeadingResolver, HeadingTicket, Inbound, MissionHooks, Stream, TaskOutcome, Transport,
    Vector3,
};

use crate::actuator::{ActuatorSequencer, DropStep};
use crate::alignment::{AlignmentMonitor, Confirmation, StatusSample};
use crate::config::TaskSettings;
use crate::debounce::Debounce;
use crate::detection::{DetectionGate, GateStatus};
use crate::error::{AbortReason, Result, TaskError};
use crate::heading::{HeadingContext, HeadingPlan, HeadingStrategy, wrap_heading_deg};
use crate::status::{Phase, TaskSnapshot, TaskStatus};
use crate::transport_error::{map_resolver_error, map_transport_error};

/// Unified core for both dynamic (boxed) and generic (static dispatch) variants.
pub struct TaskCore<T: Transport, H: HeadingResolver> {
    pub(crate) transport: T,
    pub(crate) resolver: H,
    pub(crate) settings: TaskSettings,
    pub(crate) strategy: Box<dyn HeadingStrategy>,
    pub(crate) hooks: Option<Box<dyn MissionHooks>>,

    pub(crate) phase: Phase,
    pub(crate) active_stream: Option<Stream>,
    pub(crate) gate: DetectionGate,
    pub(crate) monitor: Option<AlignmentMonitor>,
    pub(crate) sequencer: ActuatorSequencer,
    pub(crate) pending_heading: Option<HeadingTicket>,
    pub(crate) next_ticket: u64,
    pub(crate) plan: Option<HeadingPlan>,
    pub(crate) failure: Option<AbortReason>,
}

impl<T: Transport, H: HeadingResolver> core::fmt::Debug for TaskCore<T, H> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TaskCore")
            .field("phase", &self.phase)
            .field("active_stream", &self.active_stream)
            .field("attempts", &self.gate.attempts())
            .field("markers_dropped", &self.sequencer.markers_dropped())
            .field("pending_heading", &self.pending_heading)
            .finish_non_exhaustive()
    }
}

impl<T: Transport, H: HeadingResolver> TaskCore<T, H> {
    pub(crate) fn new(
        transport: T,
        resolver: H,
        settings: TaskSettings,
        strategy: Box<dyn HeadingStrategy>,
        hooks: Option<Box<dyn MissionHooks>>,
    ) -> Self {
        let gate = DetectionGate::new(
            settings.detection.detections_required,
            settings.detection.detection_duration_ms,
        );
        let sequencer = ActuatorSequencer::new(settings.drop_cfg);
        Self {
            transport,
            resolver,
            settings,
            strategy,
            hooks,
            phase: Phase::Idle,
            active_stream: None,
            gate,
            monitor: None,
            sequencer,
            pending_heading: None,
            next_ticket: 1,
            plan: None,
            failure: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn active_stream(&self) -> Option<Stream> {
        self.active_stream
    }

    /// Ticket of the outstanding heading request, if any.
    pub fn pending_heading(&self) -> Option<HeadingTicket> {
        self.pending_heading
    }

    pub fn markers_dropped(&self) -> u8 {
        self.sequencer.markers_dropped()
    }

    /// Yaw and offset accepted from the last heading result.
    pub fn heading_plan(&self) -> Option<HeadingPlan> {
        self.plan
    }

    pub fn settings(&self) -> &TaskSettings {
        &self.settings
    }

    pub fn snapshot(&self) -> TaskSnapshot {
        TaskSnapshot {
            phase: self.phase,
            attempts: self.gate.attempts(),
            detections_in_window: self.gate.detections_in_window(),
            markers_dropped: self.sequencer.markers_dropped(),
            active_stream: self.active_stream,
        }
    }

    /// Reset everything, release the outputs and start looking for the target.
    ///
    /// State is reset before the previous stream is dropped, so a failed
    /// restart leaves the controller `Idle`.
    pub fn start(&mut self, now_ms: u64) -> Result<()> {
        let stream = self.active_stream.take();
        self.reset_state();
        if let Some(stream) = stream {
            self.transport
                .unsubscribe(stream)
                .map_err(|e| eyre::Report::new(map_transport_error(&*e)))
                .wrap_err_with(|| format!("unsubscribe {}", stream.name()))?;
        }
        let neutral = self.neutral_alignment();
        self.publish_alignment(&neutral)?;
        self.subscribe(Stream::Detections)?;
        self.phase = Phase::Detecting;
        tracing::info!(now_ms, object = %self.settings.task.object_name, "task started");
        Ok(())
    }

    /// Stop the task and return to `Idle`.
    ///
    /// State is reset before any output is attempted; unsubscribe and the
    /// release commands are best-effort. Calling it again is harmless.
    pub fn abort(&mut self) {
        let from = self.phase;
        let stream = self.active_stream.take();
        self.reset_state();
        if let Some(stream) = stream
            && let Err(e) = self.transport.unsubscribe(stream)
        {
            tracing::warn!(error = %e, stream = stream.name(), "unsubscribe failed on abort");
        }
        self.release_outputs("abort");
        tracing::info!(from = from.name(), "task aborted");
    }

    /// Handle one inbound event stamped `now_ms`.
    pub fn handle(&mut self, now_ms: u64, event: &Inbound) -> Result<TaskStatus> {
        if let Some(reason) = self.failure {
            return Ok(TaskStatus::Aborted(TaskError::Abort(reason)));
        }
        match self.phase {
            Phase::Idle => {
                tracing::trace!("event ignored while idle");
                return Ok(TaskStatus::Idle);
            }
            Phase::Done => return Ok(TaskStatus::Complete),
            _ => {}
        }
        if let Some(stream) = event.stream()
            && self.active_stream != Some(stream)
        {
            tracing::trace!(
                stream = stream.name(),
                phase = self.phase.name(),
                "dropping event from inactive stream"
            );
            return Ok(TaskStatus::Running);
        }

        match event {
            Inbound::Detections(d) => self.on_detections(now_ms, d),
            Inbound::Linear(s) => self.on_status(now_ms, StatusSample::Linear(*s)),
            Inbound::Angular(s) => self.on_status(now_ms, StatusSample::Angular(*s)),
            Inbound::Heading { ticket, reading } => self.on_heading(*ticket, *reading),
        }
    }

    // ── Private: phase handlers ──────────────────────────────────────────────

    fn on_detections(&mut self, now_ms: u64, detections: &Detections) -> Result<TaskStatus> {
        if self.phase != Phase::Detecting || !self.sees_target(detections) {
            return Ok(TaskStatus::Running);
        }
        match self.gate.observe(now_ms) {
            GateStatus::Accumulating { detections } => {
                tracing::trace!(detections, "target sighted");
            }
            GateStatus::Confirmed {
                attempt,
                detections,
                elapsed_ms,
            } => {
                tracing::debug!(attempt, detections, elapsed_ms, "target confirmed");
                self.enter_center()?;
            }
            GateStatus::Stalled { attempt, .. } => {
                if let Some(max) = self.settings.detection.max_attempts
                    && attempt >= max
                {
                    return Ok(self.fail(AbortReason::DetectionFailed));
                }
            }
        }
        Ok(TaskStatus::Running)
    }

    fn on_status(&mut self, now_ms: u64, sample: StatusSample) -> Result<TaskStatus> {
        let Some(monitor) = self.monitor.as_mut() else {
            return Ok(TaskStatus::Running);
        };
        let holds = monitor.kind().within_tolerance(&sample);
        let settled = monitor.observe(&sample, now_ms) == Debounce::Settled;

        match self.phase {
            Phase::AligningCenter if settled => {
                tracing::debug!(now_ms, "centre alignment settled");
                if self.settings.task.require_bbox_width {
                    self.enter_bbox_width()?;
                } else {
                    self.request_heading()?;
                }
            }
            Phase::AligningBboxWidth if settled => {
                tracing::debug!(now_ms, "bbox heave settled");
                self.request_heading()?;
            }
            Phase::OrientingHeading if settled => {
                tracing::debug!(now_ms, "heading settled");
                self.enter_offset()?;
            }
            Phase::AligningOffset | Phase::Dropping if settled => {
                return self.drive_sequencer(now_ms);
            }
            Phase::Dropping if !holds => {
                tracing::debug!(now_ms, "offset alignment lost while dropping");
                self.sequencer.rearm(now_ms);
            }
            _ => {}
        }
        Ok(TaskStatus::Running)
    }

    fn on_heading(&mut self, ticket: HeadingTicket, reading: HeadingReading) -> Result<TaskStatus> {
        if self.phase != Phase::OrientingHeading || self.pending_heading != Some(ticket) {
            tracing::trace!(ticket = ticket.0, "ignoring stale heading result");
            return Ok(TaskStatus::Running);
        }

        let Some(plan) = self.plan_for(reading) else {
            tracing::warn!(
                heading_deg = reading.heading_deg,
                vehicle_yaw_deg = reading.vehicle_yaw_deg,
                "unusable heading result; requesting again"
            );
            self.send_heading_request()?;
            return Ok(TaskStatus::Running);
        };

        let cmd = AttitudeCommand {
            roll_active: true,
            pitch_active: true,
            yaw_active: true,
            euler_rpy: Vector3::new(0.0, 0.0, plan.yaw_deg),
        };
        self.transport
            .publish_attitude(&cmd)
            .map_err(|e| eyre::Report::new(map_transport_error(&*e)))
            .wrap_err("publish attitude command")?;
        self.pending_heading = None;
        self.plan = Some(plan);
        self.subscribe(Stream::AngularStatus)?;
        let alignment = self.settings.alignment;
        self.monitor = Some(AlignmentMonitor::new(
            Confirmation::heading(&alignment),
            &alignment,
        ));
        tracing::debug!(
            yaw_deg = plan.yaw_deg,
            offset_y = plan.offset.y,
            "heading plan accepted"
        );
        Ok(TaskStatus::Running)
    }

    // ── Private: transitions ─────────────────────────────────────────────────

    fn enter_center(&mut self) -> Result<()> {
        self.unsubscribe_active()?;
        let cmd = self.alignment_command(true, true, false, Vector3::ZERO);
        self.publish_alignment(&cmd)?;
        self.subscribe(Stream::LinearStatus)?;
        self.gate.reset();
        let alignment = self.settings.alignment;
        self.enter_phase(Phase::AligningCenter, Some(Confirmation::center(&alignment)));
        Ok(())
    }

    fn enter_bbox_width(&mut self) -> Result<()> {
        let cmd = self.alignment_command(true, true, true, Vector3::ZERO);
        self.publish_alignment(&cmd)?;
        self.subscribe(Stream::LinearStatus)?;
        let alignment = self.settings.alignment;
        self.enter_phase(
            Phase::AligningBboxWidth,
            Some(Confirmation::bbox_width(&alignment)),
        );
        Ok(())
    }

    fn request_heading(&mut self) -> Result<()> {
        self.unsubscribe_active()?;
        self.send_heading_request()?;
        self.enter_phase(Phase::OrientingHeading, None);
        Ok(())
    }

    fn enter_offset(&mut self) -> Result<()> {
        self.unsubscribe_active()?;
        let offset = self.plan.map_or(Vector3::ZERO, |p| p.offset);
        let cmd = self.alignment_command(true, true, false, offset);
        self.publish_alignment(&cmd)?;
        self.subscribe(Stream::LinearStatus)?;
        let alignment = self.settings.alignment;
        self.enter_phase(Phase::AligningOffset, Some(Confirmation::offset(&alignment)));
        Ok(())
    }

    fn drive_sequencer(&mut self, now_ms: u64) -> Result<TaskStatus> {
        if self.phase == Phase::AligningOffset {
            self.phase = Phase::Dropping;
            tracing::info!(phase = self.phase.name(), "phase transition");
        }
        match self.sequencer.on_offset_settled(now_ms) {
            DropStep::Fired { marker, cmd } => {
                self.publish_actuator(&cmd)?;
                tracing::info!(marker, now_ms, "marker dropped");
                Ok(TaskStatus::Running)
            }
            DropStep::Cooldown { remaining_ms } => {
                tracing::trace!(remaining_ms, "drop cooldown");
                Ok(TaskStatus::Running)
            }
            DropStep::Done(cmd) => self.finish(&cmd),
        }
    }

    fn finish(&mut self, release: &ActuatorCommand) -> Result<TaskStatus> {
        self.publish_actuator(release)?;
        let neutral = self.neutral_alignment();
        self.publish_alignment(&neutral)?;
        self.unsubscribe_active()?;
        self.enter_phase(Phase::Done, None);
        self.notify(TaskOutcome::Completed);
        Ok(TaskStatus::Complete)
    }

    fn fail(&mut self, reason: AbortReason) -> TaskStatus {
        let stream = self.active_stream.take();
        self.reset_state();
        if let Some(stream) = stream
            && let Err(e) = self.transport.unsubscribe(stream)
        {
            tracing::warn!(error = %e, stream = stream.name(), "unsubscribe failed on task failure");
        }
        self.release_outputs("task failure");
        self.phase = Phase::Aborted;
        self.failure = Some(reason);
        tracing::error!(%reason, "task failed");
        self.notify(TaskOutcome::DetectionFailed);
        TaskStatus::Aborted(TaskError::Abort(reason))
    }

    fn enter_phase(&mut self, phase: Phase, confirmation: Option<Confirmation>) {
        self.monitor = confirmation.map(|c| AlignmentMonitor::new(c, &self.settings.alignment));
        self.phase = phase;
        tracing::info!(phase = phase.name(), "phase transition");
    }

    // ── Private: helpers ─────────────────────────────────────────────────────

    fn reset_state(&mut self) {
        self.phase = Phase::Idle;
        self.gate.reset();
        self.monitor = None;
        self.sequencer.reset();
        self.pending_heading = None;
        self.plan = None;
        self.failure = None;
    }

    fn sees_target(&self, detections: &Detections) -> bool {
        let task = &self.settings.task;
        let min_p = self.settings.detection.min_probability;
        detections
            .boxes
            .iter()
            .any(|b| b.class == task.object_name && b.probability >= min_p)
    }

    fn plan_for(&self, reading: HeadingReading) -> Option<HeadingPlan> {
        if !(reading.heading_deg.is_finite() && reading.vehicle_yaw_deg.is_finite()) {
            return None;
        }
        let ctx = HeadingContext {
            reading,
            frame_width: self.settings.frame.width,
            frame_height: self.settings.frame.height,
            offset_fraction: self.settings.heading.offset_fraction,
        };
        self.strategy
            .plan(&ctx)
            .map(|p| HeadingPlan {
                yaw_deg: wrap_heading_deg(p.yaw_deg),
                ..p
            })
            .filter(HeadingPlan::is_finite)
    }

    fn send_heading_request(&mut self) -> Result<()> {
        let ticket = HeadingTicket(self.next_ticket);
        self.next_ticket = self.next_ticket.wrapping_add(1);
        self.resolver
            .request_heading(ticket)
            .map_err(|e| eyre::Report::new(map_resolver_error(&*e)))
            .wrap_err("request heading")?;
        self.pending_heading = Some(ticket);
        tracing::debug!(ticket = ticket.0, "heading requested");
        Ok(())
    }

    fn notify(&mut self, outcome: TaskOutcome) {
        if let Some(hooks) = self.hooks.as_mut() {
            hooks.task_finished(outcome);
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn bbox_dim(&self) -> u32 {
        let dim = match self.settings.task.bbox_control {
            pathmark_traits::BboxControl::Width => self.settings.frame.width,
            pathmark_traits::BboxControl::Height => self.settings.frame.height,
        };
        // `as` saturates; ratio is validated to (0, 1] by the builder.
        (f64::from(dim) * self.settings.task.bbox_dim_ratio).round() as u32
    }

    fn alignment_command(
        &self,
        surge_active: bool,
        sway_active: bool,
        heave_active: bool,
        target_pos: Vector3,
    ) -> AlignmentCommand {
        let task = &self.settings.task;
        AlignmentCommand {
            surge_active,
            sway_active,
            heave_active,
            object_name: task.object_name.clone(),
            alignment_plane: task.alignment_plane,
            bbox_control: task.bbox_control,
            bbox_dim: self.bbox_dim(),
            target_pos,
        }
    }

    fn neutral_alignment(&self) -> AlignmentCommand {
        self.alignment_command(false, false, false, Vector3::ZERO)
    }

    fn release_outputs(&mut self, context: &'static str) {
        let neutral = self.neutral_alignment();
        if let Err(e) = self.transport.publish_alignment(&neutral) {
            tracing::warn!(error = %e, context, "neutral alignment publish failed");
        }
        if let Err(e) = self.transport.publish_actuator(&ActuatorCommand::released()) {
            tracing::warn!(error = %e, context, "actuator release publish failed");
        }
    }

    fn publish_alignment(&mut self, cmd: &AlignmentCommand) -> Result<()> {
        self.transport
            .publish_alignment(cmd)
            .map_err(|e| eyre::Report::new(map_transport_error(&*e)))
            .wrap_err("publish alignment command")
    }

    fn publish_actuator(&mut self, cmd: &ActuatorCommand) -> Result<()> {
        self.transport
            .publish_actuator(cmd)
            .map_err(|e| eyre::Report::new(map_transport_error(&*e)))
            .wrap_err("publish actuator command")
    }

    /// Subscribe to `stream`, closing the current subscription first.
    fn subscribe(&mut self, stream: Stream) -> Result<()> {
        self.unsubscribe_active()?;
        self.transport
            .subscribe(stream)
            .map_err(|e| eyre::Report::new(map_transport_error(&*e)))
            .wrap_err_with(|| format!("subscribe {}", stream.name()))?;
        self.active_stream = Some(stream);
        Ok(())
    }

    fn unsubscribe_active(&mut self) -> Result<()> {
        if let Some(stream) = self.active_stream {
            self.transport
                .unsubscribe(stream)
                .map_err(|e| eyre::Report::new(map_transport_error(&*e)))
                .wrap_err_with(|| format!("unsubscribe {}", stream.name()))?;
            self.active_stream = None;
        }
        Ok(())
    }
}
