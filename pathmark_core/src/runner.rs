//! Drive a controller from a recorded, time-stamped event sequence.
//!
//! Recorded logs do not know which heading request they answer, so heading
//! results are recorded without a ticket and matched to whatever request is
//! outstanding when they are replayed.

use pathmark_traits::{HeadingReading, HeadingResolver, Inbound, Transport};

use crate::controller::TaskCore;
use crate::error::Result;
use crate::status::{Phase, TaskStatus};

#[derive(Debug, Clone, PartialEq)]
pub enum RecordedEvent {
    /// Delivered as-is.
    Event(Inbound),
    /// Heading result for the outstanding request. Dropped when none is
    /// outstanding.
    Heading(HeadingReading),
}

/// Where a recorded run ended.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub status: TaskStatus,
    pub phase: Phase,
    /// Events handed to the controller, including ignored ones.
    pub events_consumed: usize,
    pub markers_dropped: u8,
    /// Stamp of the last consumed event.
    pub last_ms: Option<u64>,
}

/// Start the task at `start_ms` and feed `events` until the task reaches a
/// terminal status or the events run out. Transport errors propagate; the
/// caller decides whether to abort.
pub fn run_recorded<T, H, I>(
    task: &mut TaskCore<T, H>,
    start_ms: u64,
    events: I,
) -> Result<RunSummary>
where
    T: Transport,
    H: HeadingResolver,
    I: IntoIterator<Item = (u64, RecordedEvent)>,
{
    task.start(start_ms)?;
    let mut status = TaskStatus::Running;
    let mut consumed = 0usize;
    let mut last_ms = None;

    for (t_ms, rec) in events {
        consumed += 1;
        last_ms = Some(t_ms);
        let event = match rec {
            RecordedEvent::Event(ev) => ev,
            RecordedEvent::Heading(reading) => match task.pending_heading() {
                Some(ticket) => Inbound::Heading { ticket, reading },
                None => {
                    tracing::trace!(t_ms, "recorded heading with no outstanding request");
                    continue;
                }
            },
        };
        status = task.handle(t_ms, &event)?;
        if matches!(status, TaskStatus::Complete | TaskStatus::Aborted(_)) {
            break;
        }
    }

    Ok(RunSummary {
        status,
        phase: task.phase(),
        events_consumed: consumed,
        markers_dropped: task.markers_dropped(),
        last_ms,
    })
}
