//! Continuous-wave test pattern.
//!
//! One repetition keys three short bursts and one long burst so the signal
//! is easy to pick out on a spectrum analyzer. Each step is a carrier
//! command followed by a hold; the last step turns the carrier off, so a
//! completed repetition always leaves the transmitter silent.

use std::time::Duration;

/// One carrier command and how long to hold before the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CwStep {
    pub carrier_on: bool,
    pub hold: Duration,
}

const fn step(carrier_on: bool, hold_ms: u64) -> CwStep {
    CwStep {
        carrier_on,
        hold: Duration::from_millis(hold_ms),
    }
}

/// A single repetition of the test pattern.
pub const CW_PATTERN: [CwStep; 8] = [
    step(true, 100),
    step(false, 100),
    step(true, 100),
    step(false, 100),
    step(true, 100),
    step(false, 100),
    step(true, 2_000),
    step(false, 500),
];

/// Wall-clock length of one repetition.
pub fn cycle_duration() -> Duration {
    CW_PATTERN.iter().map(|s| s.hold).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_alternates_and_ends_off() {
        for (i, s) in CW_PATTERN.iter().enumerate() {
            assert_eq!(s.carrier_on, i % 2 == 0, "step {i}");
        }
        assert!(!CW_PATTERN[CW_PATTERN.len() - 1].carrier_on);
    }

    #[test]
    fn cycle_lasts_three_point_one_seconds() {
        assert_eq!(cycle_duration(), Duration::from_millis(3_100));
    }
}
