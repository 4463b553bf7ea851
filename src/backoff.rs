//! Per-pass retry state: consecutive failure count and the resulting delays.

use std::time::Duration;

use tracing::{debug, error, warn};

use crate::Error;

pub const SHORT_BACKOFF: Duration = Duration::from_secs(30);
pub const LONG_BACKOFF: Duration = Duration::from_secs(60);
/// Consecutive failures tolerated before the long backoff kicks in.
pub const FAILURE_THRESHOLD: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub interval: Duration,
    pub short: Duration,
    pub long: Duration,
    pub threshold: u32,
}

impl BackoffPolicy {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            short: SHORT_BACKOFF,
            long: LONG_BACKOFF,
            threshold: FAILURE_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassState {
    Idle,
    Fetching,
    Reconciling,
    Failing,
    BackoffWait,
}

/// State machine of one self-rescheduling poll pass.
///
/// `Idle -> Fetching -> Reconciling -> Idle` on success,
/// `Idle -> Fetching -> Failing -> BackoffWait` on failure. There is no
/// terminal state; the returned delay is always the time until the next try.
#[derive(Debug, Clone)]
pub struct PollLoop {
    name: &'static str,
    policy: BackoffPolicy,
    errors: u32,
    state: PassState,
}

impl PollLoop {
    pub fn new(name: &'static str, policy: BackoffPolicy) -> Self {
        Self {
            name,
            policy,
            errors: 0,
            state: PassState::Idle,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn state(&self) -> PassState {
        self.state
    }

    pub fn errors(&self) -> u32 {
        self.errors
    }

    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    pub fn begin_fetch(&mut self) {
        self.state = PassState::Fetching;
    }

    pub fn begin_reconcile(&mut self) {
        self.state = PassState::Reconciling;
    }

    pub fn succeed(&mut self) -> Duration {
        self.errors = 0;
        self.state = PassState::Idle;
        self.policy.interval
    }

    pub fn fail(&mut self, err: &Error) -> Duration {
        self.state = PassState::Failing;
        self.errors += 1;

        let delay = if self.errors > self.policy.threshold {
            self.errors = 0;
            error!(
                pass = self.name,
                kind = ?err.kind(),
                "tado servers seem to be down, pausing requests for {}s: {err}",
                self.policy.long.as_secs()
            );
            self.policy.long
        } else {
            match err {
                Error::Status(_) | Error::NoResponse(_) => {
                    debug!(pass = self.name, errors = self.errors, "poll failed: {err}")
                }
                _ => warn!(pass = self.name, errors = self.errors, "poll failed: {err}"),
            }
            self.policy.short
        };

        self.state = PassState::BackoffWait;
        delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zones_loop() -> PollLoop {
        PollLoop::new("zones", BackoffPolicy::new(Duration::from_secs(15)))
    }

    #[test]
    fn sixth_consecutive_failure_trips_long_backoff() {
        let mut pass = zones_loop();
        for attempt in 1..=5 {
            pass.begin_fetch();
            assert_eq!(pass.fail(&Error::Status(500)), SHORT_BACKOFF, "attempt {attempt}");
            assert_eq!(pass.errors(), attempt);
        }
        pass.begin_fetch();
        assert_eq!(pass.fail(&Error::NoResponse("timeout".into())), LONG_BACKOFF);
        assert_eq!(pass.errors(), 0);
        assert_eq!(pass.state(), PassState::BackoffWait);
    }

    #[test]
    fn success_resets_counter() {
        let mut pass = zones_loop();
        pass.begin_fetch();
        pass.fail(&Error::Status(502));
        pass.fail(&Error::Status(502));
        assert_eq!(pass.errors(), 2);

        pass.begin_fetch();
        pass.begin_reconcile();
        assert_eq!(pass.state(), PassState::Reconciling);
        assert_eq!(pass.succeed(), Duration::from_secs(15));
        assert_eq!(pass.errors(), 0);
        assert_eq!(pass.state(), PassState::Idle);
    }

    #[test]
    fn counter_restarts_after_trip() {
        let mut pass = zones_loop();
        for _ in 0..6 {
            pass.fail(&Error::Parse("bad".into()));
        }
        assert_eq!(pass.errors(), 0);
        assert_eq!(pass.fail(&Error::Parse("bad".into())), SHORT_BACKOFF);
        assert_eq!(pass.errors(), 1);
    }
}
