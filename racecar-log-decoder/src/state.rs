//! Carry-state threaded through the decode pass
//!
//! Derived channels (distance, energy, calculated current) depend on values
//! decoded from earlier frames. Rather than digging those out of the channel
//! store, every rule receives the previous [`CarryState`] and hands back the
//! next one.

use crate::types::Timestamp;

/// Turns `rate × Δt(ms)` into the accumulated quantity (km/h·ms → m, kW·ms → Wh)
const MS_INTEGRATION_DIVISOR: f64 = 3600.0;

/// A running time integral and the moment it was last advanced
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Integral {
    pub timestamp: Timestamp,
    pub value: f64,
}

impl Integral {
    pub fn new(timestamp: Timestamp, value: f64) -> Self {
        Self { timestamp, value }
    }

    /// Value after integrating `rate` from the last sample up to `now`
    ///
    /// The elapsed time saturates at the `i64` range.
    pub fn advanced(&self, rate: f64, now: Timestamp) -> f64 {
        let elapsed = now.saturating_sub(self.timestamp);
        self.value + rate * elapsed as f64 / MS_INTEGRATION_DIVISOR
    }
}

/// Drops samples that arrive too soon after the last accepted one
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimiter {
    last_accepted: Option<Timestamp>,
}

impl RateLimiter {
    /// True if a frame at `now` may be accepted with the given interval
    ///
    /// An interval of zero never drops anything.
    pub fn allows(&self, now: Timestamp, interval_ms: u64) -> bool {
        match self.last_accepted {
            Some(last) if interval_ms > 0 => {
                let interval = i64::try_from(interval_ms).unwrap_or(i64::MAX);
                now.saturating_sub(last) >= interval
            }
            _ => true,
        }
    }

    /// Limiter state after accepting a frame at `now`
    pub fn accepted(self, now: Timestamp) -> Self {
        Self {
            last_accepted: Some(now),
        }
    }

    pub fn last_accepted(&self) -> Option<Timestamp> {
        self.last_accepted
    }
}

/// Values from earlier frames needed by the derivation rules
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CarryState {
    /// Last decoded motor speed (rpm)
    pub rpm: Option<f64>,
    /// Last decoded feedback torque (Nm)
    pub feedback_torque: Option<f64>,
    /// Last decoded DC bus voltage (V)
    pub dc_voltage: Option<f64>,
    /// Distance travelled, stamped with the last speed sample
    pub distance: Option<Integral>,
    /// Net DC energy
    pub dc_energy: Option<Integral>,
    /// Energy drawn from the pack
    pub discharge_energy: Option<Integral>,
    /// Energy returned to the pack
    pub regeneration_energy: Option<Integral>,
    /// Debounce for gyro angular-rate frames
    pub angular_limiter: RateLimiter,
    /// Debounce for gyro acceleration frames
    pub acceleration_limiter: RateLimiter,
}

impl CarryState {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integral_advances_over_elapsed_time() {
        let integral = Integral::new(1000, 2.0);
        // 36 units/h for 100 ms
        assert!((integral.advanced(36.0, 1100) - 3.0).abs() < 1e-12);
        assert_eq!(integral.advanced(36.0, 1000), 2.0);
    }

    #[test]
    fn test_rate_limiter() {
        let limiter = RateLimiter::default();
        assert!(limiter.allows(0, 100));

        let limiter = limiter.accepted(0);
        assert_eq!(limiter.last_accepted(), Some(0));
        assert!(!limiter.allows(50, 100));
        assert!(!limiter.allows(99, 100));
        assert!(limiter.allows(100, 100));
        assert!(limiter.allows(150, 100));
        // Out-of-order timestamps are dropped
        assert!(!limiter.allows(-10, 100));
        // Zero interval disables the limiter
        assert!(limiter.allows(0, 0));
    }

    #[test]
    fn test_extreme_timestamps_saturate() {
        let integral = Integral::new(i64::MIN + 1, 0.0);
        let value = integral.advanced(1.0, i64::MAX);
        assert!(value.is_finite());
        assert!(value > 0.0);

        let limiter = RateLimiter::default().accepted(i64::MIN);
        assert!(limiter.allows(0, 100));
        assert!(!limiter.accepted(i64::MAX).allows(i64::MIN, 100));
        assert!(limiter.allows(i64::MAX, u64::MAX));
    }

    #[test]
    fn test_default_state_has_no_priors() {
        let state = CarryState::new();
        assert!(state.rpm.is_none());
        assert!(state.distance.is_none());
        assert!(state.dc_energy.is_none());
        assert_eq!(state.angular_limiter, RateLimiter::default());
    }
}
