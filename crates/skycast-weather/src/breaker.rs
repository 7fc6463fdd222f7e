//! Circuit breaker shared by every upstream call.
//!
//! # States
//! - Closed: calls go out normally
//! - Open: upstream assumed down, calls are refused without touching the network
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive failures reach the threshold
//! Open → Closed: first `is_open` check at or after `open_until`
//! ```
//!
//! Expiry is evaluated lazily when the breaker is polled; there is no
//! background timer. One breaker is shared across the geocoding and forecast
//! endpoints, so the health signal is global rather than per endpoint.

use parking_lot::Mutex;
use skycast_core::BreakerConfig;
use std::time::{Duration, Instant};

pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;
pub const DEFAULT_OPEN_DURATION: Duration = Duration::from_millis(30_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerSettings {
    /// Consecutive failures that open the circuit
    pub failure_threshold: u32,
    /// How long the circuit refuses calls once open
    pub open_duration: Duration,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            open_duration: DEFAULT_OPEN_DURATION,
        }
    }
}

impl From<&BreakerConfig> for BreakerSettings {
    fn from(config: &BreakerConfig) -> Self {
        Self {
            failure_threshold: config.failure_threshold.max(1),
            open_duration: Duration::from_millis(config.open_ms),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitStatus {
    Closed,
    Open,
}

/// Point-in-time view of the breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitState {
    pub status: CircuitStatus,
    pub consecutive_failures: u32,
    /// Set while open; cleared on reset
    pub open_until: Option<Instant>,
}

impl CircuitState {
    fn closed() -> Self {
        Self {
            status: CircuitStatus::Closed,
            consecutive_failures: 0,
            open_until: None,
        }
    }
}

#[derive(Debug)]
pub struct CircuitBreaker {
    state: Mutex<CircuitState>,
    settings: BreakerSettings,
}

impl CircuitBreaker {
    pub fn new(settings: BreakerSettings) -> Self {
        Self {
            state: Mutex::new(CircuitState::closed()),
            settings,
        }
    }

    /// Whether calls must be refused at `now`.
    ///
    /// An expired open circuit is reset to closed (with a zeroed failure
    /// count) as a side effect of this check.
    pub fn is_open(&self, now: Instant) -> bool {
        let mut state = self.state.lock();
        match (state.status, state.open_until) {
            (CircuitStatus::Open, Some(until)) if now < until => true,
            (CircuitStatus::Open, _) => {
                *state = CircuitState::closed();
                tracing::info!("Circuit closed after cool-down");
                false
            }
            (CircuitStatus::Closed, _) => false,
        }
    }

    /// Clears the failure streak. Does not close an open circuit.
    pub fn record_success(&self) {
        let mut state = self.state.lock();
        state.consecutive_failures = 0;
    }

    /// Counts a failed upstream call and opens the circuit on the threshold.
    ///
    /// Failures reported while already open never extend `open_until`.
    pub fn record_failure(&self, now: Instant) {
        let mut state = self.state.lock();
        state.consecutive_failures = state.consecutive_failures.saturating_add(1);

        if state.status == CircuitStatus::Open {
            tracing::debug!(
                failures = state.consecutive_failures,
                "Failure recorded while circuit already open"
            );
            return;
        }

        if state.consecutive_failures >= self.settings.failure_threshold {
            state.status = CircuitStatus::Open;
            state.open_until = Some(now + self.settings.open_duration);
            tracing::warn!(
                failures = state.consecutive_failures,
                open_for_ms = self.settings.open_duration.as_millis() as u64,
                "Circuit opened after repeated failures"
            );
        }
    }

    pub fn snapshot(&self) -> CircuitState {
        *self.state.lock()
    }

    pub fn settings(&self) -> BreakerSettings {
        self.settings
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(BreakerSettings::default())
    }
}
