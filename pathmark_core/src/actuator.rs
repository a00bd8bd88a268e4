//! Marker-drop sequencing.
//!
//! Fires at most `max_markers` pulses. Consecutive pulses are at least
//! `drop_duration_ms` apart; a violation of the offset alignment restarts the
//! spacing window at the violation.

use pathmark_traits::ActuatorCommand;

use crate::config::DropCfg;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropStep {
    /// Publish this pulse; `marker` is 1-based.
    Fired { marker: u8, cmd: ActuatorCommand },
    /// Spacing since the last pulse (or last violation) not yet met.
    Cooldown { remaining_ms: u64 },
    /// All markers dropped; publish the release command.
    Done(ActuatorCommand),
}

#[derive(Debug, Clone)]
pub struct ActuatorSequencer {
    cfg: DropCfg,
    markers_dropped: u8,
    last_fire_ms: Option<u64>,
    window_from_ms: Option<u64>,
}

impl ActuatorSequencer {
    pub fn new(cfg: DropCfg) -> Self {
        Self {
            cfg,
            markers_dropped: 0,
            last_fire_ms: None,
            window_from_ms: None,
        }
    }

    /// Called on every sample while the vehicle holds the drop offset.
    pub fn on_offset_settled(&mut self, now_ms: u64) -> DropStep {
        if self.markers_dropped >= self.cfg.max_markers {
            return DropStep::Done(ActuatorCommand::released());
        }
        if let Some(from) = self.window_from_ms {
            // Stamps older than the window never release a pulse.
            let waited = if now_ms >= from { now_ms - from } else { 0 };
            if now_ms < from || waited < self.cfg.drop_duration_ms {
                return DropStep::Cooldown {
                    remaining_ms: self.cfg.drop_duration_ms.saturating_sub(waited),
                };
            }
        }
        self.markers_dropped += 1;
        self.last_fire_ms = Some(now_ms);
        self.window_from_ms = Some(now_ms);
        DropStep::Fired {
            marker: self.markers_dropped,
            cmd: ActuatorCommand::marker_pulse(self.cfg.pulse_ms),
        }
    }

    /// Offset alignment was lost at `now_ms`: restart the spacing window.
    /// No effect before the first pulse.
    pub fn rearm(&mut self, now_ms: u64) {
        if let Some(last) = self.last_fire_ms {
            self.window_from_ms = Some(now_ms.max(last));
        }
    }

    pub fn reset(&mut self) {
        self.markers_dropped = 0;
        self.last_fire_ms = None;
        self.window_from_ms = None;
    }

    pub fn markers_dropped(&self) -> u8 {
        self.markers_dropped
    }

    pub fn last_fire_ms(&self) -> Option<u64> {
        self.last_fire_ms
    }
}
