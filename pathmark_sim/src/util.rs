//! Time helpers for the simulated sample clock.

/// Number of milliseconds in one second.
pub const MILLIS_PER_SEC: u64 = 1_000;

/// Compute the period in milliseconds for a given sample rate in Hz.
/// - Clamps `hz` to at least 1 to avoid division by zero.
/// - Ensures result is at least 1 millisecond.
#[inline]
pub fn period_ms(hz: u32) -> u64 {
    (MILLIS_PER_SEC / u64::from(hz.max(1))).max(1)
}

/// Wrap an angle in degrees to `(-180, 180]`.
pub fn wrap_deg(deg: f64) -> f64 {
    let mut r = deg % 360.0;
    if r <= -180.0 {
        r += 360.0;
    } else if r > 180.0 {
        r -= 360.0;
    }
    r
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 1000)]
    #[case(1, 1000)]
    #[case(20, 50)]
    #[case(3, 333)]
    #[case(5000, 1)]
    fn period_is_clamped(#[case] hz: u32, #[case] expected: u64) {
        assert_eq!(period_ms(hz), expected);
    }
}
