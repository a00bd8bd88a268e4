//! Test and helper mocks for pathmark_core

use pathmark_traits::{
    ActuatorCommand, AlignmentCommand, AttitudeCommand, CommandSink, HeadingResolver,
    HeadingTicket, Stream, StreamControl,
};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A transport that accepts and discards everything; useful for benches and
/// builder checks where outputs are not inspected.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTransport;

impl CommandSink for NullTransport {
    fn publish_alignment(&mut self, _cmd: &AlignmentCommand) -> Result<(), BoxError> {
        Ok(())
    }
    fn publish_attitude(&mut self, _cmd: &AttitudeCommand) -> Result<(), BoxError> {
        Ok(())
    }
    fn publish_actuator(&mut self, _cmd: &ActuatorCommand) -> Result<(), BoxError> {
        Ok(())
    }
}

impl StreamControl for NullTransport {
    fn subscribe(&mut self, _stream: Stream) -> Result<(), BoxError> {
        Ok(())
    }
    fn unsubscribe(&mut self, _stream: Stream) -> Result<(), BoxError> {
        Ok(())
    }
}

/// A resolver that accepts every request; answers are fed in by the caller.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullResolver;

impl HeadingResolver for NullResolver {
    fn request_heading(&mut self, _ticket: HeadingTicket) -> Result<(), BoxError> {
        Ok(())
    }
}
