//! Time-based debounce: a condition must hold continuously for a duration.

/// Result of feeding one sample to a [`DebounceTimer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Debounce {
    Pending,
    Settled,
}

/// Tracks how long a condition has held without interruption.
///
/// A sample that breaks the condition clears the run. The timer reports
/// `Settled` once the span between the first holding sample of the current
/// run and `now_ms` reaches the required duration.
#[derive(Debug, Clone)]
pub struct DebounceTimer {
    required_ms: u64,
    since_ms: Option<u64>,
}

impl DebounceTimer {
    pub fn new(required_ms: u64) -> Self {
        Self {
            required_ms,
            since_ms: None,
        }
    }

    pub fn observe(&mut self, holds: bool, now_ms: u64) -> Debounce {
        if !holds {
            self.since_ms = None;
            return Debounce::Pending;
        }
        let since = *self.since_ms.get_or_insert(now_ms);
        // A stamp older than the run start never settles.
        if now_ms >= since && now_ms - since >= self.required_ms {
            Debounce::Settled
        } else {
            Debounce::Pending
        }
    }

    pub fn reset(&mut self) {
        self.since_ms = None;
    }

    pub fn is_running(&self) -> bool {
        self.since_ms.is_some()
    }

    /// Length of the current run at `now_ms`; zero when no run is active.
    pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
        self.since_ms.map_or(0, |since| now_ms.saturating_sub(since))
    }

    pub fn since_ms(&self) -> Option<u64> {
        self.since_ms
    }

    pub fn required_ms(&self) -> u64 {
        self.required_ms
    }
}
