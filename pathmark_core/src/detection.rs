//! Detection confirmation: N sightings inside a sliding attempt window.

/// Outcome of one detection observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateStatus {
    /// Still collecting sightings inside the current window.
    Accumulating { detections: u32 },
    /// Enough sightings inside the window; the target is confirmed.
    Confirmed {
        attempt: u32,
        detections: u32,
        elapsed_ms: u64,
    },
    /// The window ran out before confirmation. Counters are cleared and the
    /// observation that revealed the stall is not counted toward the next
    /// attempt.
    Stalled {
        attempt: u32,
        detections: u32,
        elapsed_ms: u64,
    },
}

#[derive(Debug, Clone)]
pub struct DetectionGate {
    required: u32,
    window_ms: u64,
    window_start_ms: Option<u64>,
    detections_in_window: u32,
    attempts: u32,
}

impl DetectionGate {
    pub fn new(required: u32, window_ms: u64) -> Self {
        Self {
            required: required.max(1),
            window_ms,
            window_start_ms: None,
            detections_in_window: 0,
            attempts: 0,
        }
    }

    /// Record one frame that contained the target.
    pub fn observe(&mut self, now_ms: u64) -> GateStatus {
        let start = match self.window_start_ms {
            None => {
                self.attempts = self.attempts.saturating_add(1);
                self.window_start_ms = Some(now_ms);
                now_ms
            }
            Some(start) => {
                let elapsed_ms = now_ms.saturating_sub(start);
                if elapsed_ms > self.window_ms {
                    let stalled = GateStatus::Stalled {
                        attempt: self.attempts,
                        detections: self.detections_in_window,
                        elapsed_ms,
                    };
                    tracing::info!(
                        attempt = self.attempts,
                        detections = self.detections_in_window,
                        elapsed_ms,
                        "detection attempt stalled"
                    );
                    self.window_start_ms = None;
                    self.detections_in_window = 0;
                    return stalled;
                }
                start
            }
        };

        self.detections_in_window = self.detections_in_window.saturating_add(1);
        let elapsed_ms = now_ms.saturating_sub(start);
        if self.detections_in_window >= self.required {
            GateStatus::Confirmed {
                attempt: self.attempts,
                detections: self.detections_in_window,
                elapsed_ms,
            }
        } else {
            GateStatus::Accumulating {
                detections: self.detections_in_window,
            }
        }
    }

    /// Clear the window and the attempt count.
    pub fn reset(&mut self) {
        self.window_start_ms = None;
        self.detections_in_window = 0;
        self.attempts = 0;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn detections_in_window(&self) -> u32 {
        self.detections_in_window
    }

    pub fn window_start_ms(&self) -> Option<u64> {
        self.window_start_ms
    }
}
