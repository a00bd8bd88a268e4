//! In-process bus standing in for the vehicle transport.
//!
//! Every publication, subscription change and heading request lands in one
//! shared log so tests and the simulated vehicle can inspect what the task
//! controller did. Handles are cheap clones over the same state.

use std::cell::RefCell;
use std::rc::Rc;

use pathmark_traits::{
    ActuatorCommand, AlignmentCommand, AttitudeCommand, CommandSink, HeadingResolver,
    HeadingTicket, Stream, StreamControl,
};

use crate::error::SimError;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// One entry of the bus log.
#[derive(Debug, Clone, PartialEq)]
pub enum Publication {
    Alignment(AlignmentCommand),
    Attitude(AttitudeCommand),
    Actuator(ActuatorCommand),
    Subscribed(Stream),
    Unsubscribed(Stream),
    HeadingRequested(HeadingTicket),
}

#[derive(Debug, Default)]
struct BusState {
    log: Vec<Publication>,
    active: Option<Stream>,
    fail_next: Option<SimError>,
}

impl BusState {
    fn take_fault(&mut self) -> Result<(), BoxError> {
        match self.fail_next.take() {
            Some(e) => Err(Box::new(e)),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SimBus {
    state: Rc<RefCell<BusState>>,
}

impl SimBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Heading resolver sharing this bus's log.
    pub fn resolver(&self) -> SimResolver {
        SimResolver {
            state: Rc::clone(&self.state),
        }
    }

    /// Make the next bus call (of any kind) fail with `err`.
    pub fn fail_next(&self, err: SimError) {
        self.state.borrow_mut().fail_next = Some(err);
    }

    pub fn log(&self) -> Vec<Publication> {
        self.state.borrow().log.clone()
    }

    pub fn log_len(&self) -> usize {
        self.state.borrow().log.len()
    }

    /// Log entries from index `from` on.
    pub fn log_since(&self, from: usize) -> Vec<Publication> {
        let state = self.state.borrow();
        state.log.get(from..).map(<[_]>::to_vec).unwrap_or_default()
    }

    pub fn clear_log(&self) {
        self.state.borrow_mut().log.clear();
    }

    pub fn active_stream(&self) -> Option<Stream> {
        self.state.borrow().active
    }

    /// Actuator commands that fired the marker dropper.
    pub fn marker_pulses(&self) -> Vec<ActuatorCommand> {
        self.state
            .borrow()
            .log
            .iter()
            .filter_map(|p| match p {
                Publication::Actuator(cmd) if cmd.markerdropper => Some(*cmd),
                _ => None,
            })
            .collect()
    }

    pub fn last_alignment(&self) -> Option<AlignmentCommand> {
        self.state.borrow().log.iter().rev().find_map(|p| match p {
            Publication::Alignment(cmd) => Some(cmd.clone()),
            _ => None,
        })
    }

    pub fn last_attitude(&self) -> Option<AttitudeCommand> {
        self.state.borrow().log.iter().rev().find_map(|p| match p {
            Publication::Attitude(cmd) => Some(*cmd),
            _ => None,
        })
    }

    pub fn heading_requests(&self) -> Vec<HeadingTicket> {
        self.state
            .borrow()
            .log
            .iter()
            .filter_map(|p| match p {
                Publication::HeadingRequested(t) => Some(*t),
                _ => None,
            })
            .collect()
    }

    fn record(&self, p: Publication) -> Result<(), BoxError> {
        let mut state = self.state.borrow_mut();
        state.take_fault()?;
        state.log.push(p);
        Ok(())
    }
}

impl CommandSink for SimBus {
    fn publish_alignment(&mut self, cmd: &AlignmentCommand) -> Result<(), BoxError> {
        self.record(Publication::Alignment(cmd.clone()))
    }
    fn publish_attitude(&mut self, cmd: &AttitudeCommand) -> Result<(), BoxError> {
        self.record(Publication::Attitude(*cmd))
    }
    fn publish_actuator(&mut self, cmd: &ActuatorCommand) -> Result<(), BoxError> {
        self.record(Publication::Actuator(*cmd))
    }
}

impl StreamControl for SimBus {
    fn subscribe(&mut self, stream: Stream) -> Result<(), BoxError> {
        let mut state = self.state.borrow_mut();
        state.take_fault()?;
        if let Some(active) = state.active {
            tracing::warn!(
                active = active.name(),
                requested = stream.name(),
                "rejecting second subscription"
            );
            return Err(Box::new(SimError::SubscriptionConflict {
                active: active.name(),
                requested: stream.name(),
            }));
        }
        state.active = Some(stream);
        state.log.push(Publication::Subscribed(stream));
        Ok(())
    }

    fn unsubscribe(&mut self, stream: Stream) -> Result<(), BoxError> {
        let mut state = self.state.borrow_mut();
        state.take_fault()?;
        if state.active != Some(stream) {
            return Err(Box::new(SimError::NotSubscribed(stream.name())));
        }
        state.active = None;
        state.log.push(Publication::Unsubscribed(stream));
        Ok(())
    }
}

/// Records heading requests on the shared bus log; the simulated vehicle
/// answers them.
#[derive(Debug, Clone)]
pub struct SimResolver {
    state: Rc<RefCell<BusState>>,
}

impl HeadingResolver for SimResolver {
    fn request_heading(&mut self, ticket: HeadingTicket) -> Result<(), BoxError> {
        let mut state = self.state.borrow_mut();
        state.take_fault()?;
        state.log.push(Publication::HeadingRequested(ticket));
        Ok(())
    }
}
