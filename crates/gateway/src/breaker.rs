//! Circuit breaker.
//!
//! Tracks consecutive downstream failures per route and stops calling a
//! known-failing target for a cool-down period so it can shed load and fail
//! fast.
//!
//! States:
//! - Closed: requests pass through; failures are counted
//! - Open: requests are rejected immediately until the cool-down elapses
//! - HalfOpen: exactly one probe request is admitted; its outcome decides
//!   whether the circuit closes again or reopens

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Breaker state, observable for tests and introspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Tuning knobs for one breaker.
#[derive(Debug, Clone, Copy)]
pub struct BreakerConfig {
    /// Consecutive failures that open the circuit.
    pub failure_threshold: u32,
    /// How long the circuit stays open before admitting a probe.
    pub cooldown: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown: Duration::from_secs(30),
        }
    }
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    probe_in_flight: bool,
}

/// Per-route circuit breaker.
///
/// All state lives behind one lock, so racing requests observe transitions
/// atomically and exactly one of them wins the half-open probe slot.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    inner: Arc<Mutex<BreakerInner>>,
    config: BreakerConfig,
}

impl CircuitBreaker {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                probe_in_flight: false,
            })),
            config,
        }
    }

    /// Asks whether a request may proceed.
    ///
    /// Returns false while the circuit is open (fail fast, no downstream
    /// call) and for every half-open request except the single probe.
    pub fn try_acquire(&self) -> bool {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let elapsed = inner
                    .opened_at
                    .map(|at| at.elapsed() >= self.config.cooldown)
                    .unwrap_or(true);
                if elapsed {
                    tracing::info!("circuit half-open, admitting probe");
                    inner.state = CircuitState::HalfOpen;
                    inner.probe_in_flight = true;
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => {
                if inner.probe_in_flight {
                    false
                } else {
                    inner.probe_in_flight = true;
                    true
                }
            }
        }
    }

    /// Records a successful downstream call.
    pub fn record_success(&self) {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            CircuitState::HalfOpen => {
                tracing::info!("probe succeeded, circuit closed");
                inner.state = CircuitState::Closed;
                inner.consecutive_failures = 0;
                inner.probe_in_flight = false;
                inner.opened_at = None;
            }
            CircuitState::Closed => {
                inner.consecutive_failures = 0;
            }
            CircuitState::Open => {}
        }
    }

    /// Records a failed downstream call.
    pub fn record_failure(&self) {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.config.failure_threshold {
                    tracing::warn!(
                        failures = inner.consecutive_failures,
                        "failure threshold reached, circuit opened"
                    );
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(Instant::now());
                }
            }
            CircuitState::HalfOpen => {
                tracing::warn!("probe failed, circuit reopened");
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
                inner.probe_in_flight = false;
            }
            CircuitState::Open => {}
        }
    }

    /// Returns the current state without transitioning it.
    pub fn state(&self) -> CircuitState {
        self.inner.lock().unwrap().state
    }
}
