//! Maps `Box<dyn Error>` from trait boundaries to typed `TaskError`.
//!
//! The traits in `pathmark_traits` use `Box<dyn Error + Send + Sync>` so any
//! transport can plug in; this module converts those to our typed error enum,
//! with an optional feature-gated path for `pathmark_sim::SimError`.

use crate::error::TaskError;

/// Map a transport error to a typed `TaskError`.
///
/// Attempts to downcast known simulator error types first, then falls back
/// to string-based heuristics.
pub fn map_transport_error(e: &(dyn std::error::Error + 'static)) -> TaskError {
    #[cfg(feature = "sim-errors")]
    {
        if let Some(sim) = e.downcast_ref::<pathmark_sim::SimError>() {
            return match sim {
                pathmark_sim::SimError::Timeout => TaskError::Timeout,
                other => TaskError::Transport(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        TaskError::Timeout
    } else {
        TaskError::Transport(s)
    }
}

/// Same as [`map_transport_error`] but for heading resolver failures.
pub fn map_resolver_error(e: &(dyn std::error::Error + 'static)) -> TaskError {
    match map_transport_error(e) {
        TaskError::Transport(s) => TaskError::Heading(s),
        other => other,
    }
}
