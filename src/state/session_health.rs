//! Session Health Monitor
//!
//! Counts consecutive session-class failures for one backend session. Once the
//! count reaches the threshold the session is unhealthy for good; a fresh
//! monitor is created for every section.

/// Consecutive session failures that make a session unhealthy
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;

/// Outcome of an extraction, as far as backend health is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthSignal {
    /// The backend answered (valid or repaired payload)
    Success,

    /// Session-class failure that survived every retry
    SessionFailure,

    /// Any other failure; says nothing about backend viability
    OtherFailure,
}

/// Circuit breaker state for one backend session
#[derive(Debug, Clone)]
pub struct SessionHealth {
    consecutive_failures: u32,
    threshold: u32,
    healthy: bool,
}

impl SessionHealth {
    /// Creates a healthy monitor tripping after `threshold` consecutive failures
    pub fn new(threshold: u32) -> Self {
        Self {
            consecutive_failures: 0,
            threshold: threshold.max(1),
            healthy: true,
        }
    }

    /// Records one extraction outcome
    ///
    /// Once unhealthy, further signals are ignored.
    pub fn record(&mut self, signal: HealthSignal) {
        if !self.healthy {
            return;
        }

        match signal {
            HealthSignal::Success => self.consecutive_failures = 0,
            HealthSignal::SessionFailure => {
                self.consecutive_failures += 1;
                if self.consecutive_failures >= self.threshold {
                    self.healthy = false;
                    tracing::warn!(
                        "Backend session unhealthy after {} consecutive session failures",
                        self.consecutive_failures
                    );
                }
            }
            HealthSignal::OtherFailure => {}
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }
}

impl Default for SessionHealth {
    fn default() -> Self {
        Self::new(DEFAULT_FAILURE_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_session_failures_trip() {
        let mut health = SessionHealth::default();

        health.record(HealthSignal::SessionFailure);
        health.record(HealthSignal::SessionFailure);
        assert!(health.is_healthy());

        health.record(HealthSignal::SessionFailure);
        assert!(!health.is_healthy());
    }

    #[test]
    fn test_success_resets_counter() {
        let mut health = SessionHealth::default();

        health.record(HealthSignal::SessionFailure);
        health.record(HealthSignal::SessionFailure);
        health.record(HealthSignal::Success);
        assert_eq!(health.consecutive_failures(), 0);

        // Three new consecutive failures are needed
        health.record(HealthSignal::SessionFailure);
        health.record(HealthSignal::SessionFailure);
        assert!(health.is_healthy());
        health.record(HealthSignal::SessionFailure);
        assert!(!health.is_healthy());
    }

    #[test]
    fn test_other_failures_are_neutral() {
        let mut health = SessionHealth::default();

        health.record(HealthSignal::SessionFailure);
        health.record(HealthSignal::OtherFailure);
        health.record(HealthSignal::SessionFailure);
        assert_eq!(health.consecutive_failures(), 2);
        assert!(health.is_healthy());
    }

    #[test]
    fn test_unhealthy_is_permanent() {
        let mut health = SessionHealth::new(1);
        health.record(HealthSignal::SessionFailure);
        assert!(!health.is_healthy());

        health.record(HealthSignal::Success);
        assert!(!health.is_healthy());
    }

    #[test]
    fn test_zero_threshold_is_clamped() {
        let health = SessionHealth::new(0);
        assert_eq!(health.threshold(), 1);
    }
}
