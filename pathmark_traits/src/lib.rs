pub mod clock;
pub mod msgs;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use msgs::*;

/// Outbound command channels. Only the task controller publishes here.
pub trait CommandSink {
    fn publish_alignment(
        &mut self,
        cmd: &AlignmentCommand,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn publish_attitude(
        &mut self,
        cmd: &AttitudeCommand,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn publish_actuator(
        &mut self,
        cmd: &ActuatorCommand,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Subscription lifecycle for inbound streams.
pub trait StreamControl {
    fn subscribe(&mut self, stream: Stream) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn unsubscribe(
        &mut self,
        stream: Stream,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Full command/subscription surface of a transport.
pub trait Transport: CommandSink + StreamControl {}

impl<T: CommandSink + StreamControl + ?Sized> Transport for T {}

/// Asynchronous heading estimation. The result is delivered later as an
/// inbound event carrying the same ticket.
pub trait HeadingResolver {
    fn request_heading(
        &mut self,
        ticket: HeadingTicket,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Completion hook of the outer mission sequencer.
pub trait MissionHooks {
    fn task_finished(&mut self, outcome: TaskOutcome);
}

impl<T: CommandSink + ?Sized> CommandSink for Box<T> {
    fn publish_alignment(
        &mut self,
        cmd: &AlignmentCommand,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).publish_alignment(cmd)
    }
    fn publish_attitude(
        &mut self,
        cmd: &AttitudeCommand,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).publish_attitude(cmd)
    }
    fn publish_actuator(
        &mut self,
        cmd: &ActuatorCommand,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).publish_actuator(cmd)
    }
}

impl<T: StreamControl + ?Sized> StreamControl for Box<T> {
    fn subscribe(&mut self, stream: Stream) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).subscribe(stream)
    }
    fn unsubscribe(
        &mut self,
        stream: Stream,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).unsubscribe(stream)
    }
}

impl<T: HeadingResolver + ?Sized> HeadingResolver for Box<T> {
    fn request_heading(
        &mut self,
        ticket: HeadingTicket,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).request_heading(ticket)
    }
}

impl<F: FnMut(TaskOutcome)> MissionHooks for F {
    fn task_finished(&mut self, outcome: TaskOutcome) {
        self(outcome)
    }
}
