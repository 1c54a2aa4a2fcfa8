//! Exponential retry backoff for per-server RCON health.
//!
//! Failure state is owned here; everything else reads snapshots. A server
//! backs off exponentially while failures accumulate and goes dormant at
//! the ceiling, after which it is only retried on the slow dormant cadence.

use chrono::{DateTime, Duration, Utc};
use scorekeep_event_system::ServerId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, info};

/// Tunables for the backoff schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// First retry delay in seconds.
    pub base_delay_secs: u64,
    /// Growth factor per consecutive failure.
    pub backoff_multiplier: f64,
    /// Upper bound on the backoff delay, in minutes.
    pub max_backoff_minutes: u64,
    /// Consecutive failures before a server is declared dormant.
    pub max_consecutive_failures: u32,
    /// Retry cadence for dormant servers, in minutes.
    pub dormant_retry_minutes: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay_secs: 30,
            backoff_multiplier: 2.0,
            max_backoff_minutes: 30,
            max_consecutive_failures: 5,
            dormant_retry_minutes: 120,
        }
    }
}

/// Health classification of a monitored server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerHealth {
    Healthy,
    BackingOff,
    Dormant,
}

/// Per-server failure bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerFailureState {
    pub consecutive_failures: u32,
    pub status: ServerHealth,
    pub next_retry_at: Option<DateTime<Utc>>,
}

impl ServerFailureState {
    fn healthy() -> Self {
        Self {
            consecutive_failures: 0,
            status: ServerHealth::Healthy,
            next_retry_at: None,
        }
    }
}

/// The retry calculator. Single mutex over the per-server map; bounded by
/// the number of known servers.
pub struct RetryBackoff {
    config: BackoffConfig,
    states: Mutex<HashMap<ServerId, ServerFailureState>>,
}

impl RetryBackoff {
    pub fn new(config: BackoffConfig) -> Self {
        Self {
            config,
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Records a failure and returns the updated state.
    pub fn record_failure(&self, server_id: ServerId, now: DateTime<Utc>) -> ServerFailureState {
        let mut states = self.states.lock().unwrap();
        let state = states.entry(server_id).or_insert_with(ServerFailureState::healthy);
        state.consecutive_failures += 1;

        if state.consecutive_failures >= self.config.max_consecutive_failures {
            state.status = ServerHealth::Dormant;
            state.next_retry_at =
                Some(now + Duration::minutes(self.config.dormant_retry_minutes as i64));
            info!(
                "💤 Server {} dormant after {} consecutive failures",
                server_id, state.consecutive_failures
            );
        } else {
            let exponent = (state.consecutive_failures - 1) as i32;
            let delay_secs = (self.config.base_delay_secs as f64
                * self.config.backoff_multiplier.powi(exponent))
            .min((self.config.max_backoff_minutes * 60) as f64);
            state.status = ServerHealth::BackingOff;
            state.next_retry_at = Some(now + Duration::seconds(delay_secs as i64));
            debug!(
                "Server {} backing off {}s (failure {})",
                server_id, delay_secs as i64, state.consecutive_failures
            );
        }
        state.clone()
    }

    /// Resets a server to healthy after a successful poll.
    pub fn record_success(&self, server_id: ServerId) {
        let mut states = self.states.lock().unwrap();
        if let Some(state) = states.get_mut(&server_id) {
            if state.consecutive_failures > 0 {
                info!("✅ Server {} recovered", server_id);
            }
            *state = ServerFailureState::healthy();
        }
    }

    /// Sweep filter: healthy servers always qualify; backing-off and
    /// dormant servers only once their retry time has passed.
    pub fn should_retry(&self, server_id: ServerId, now: DateTime<Utc>) -> bool {
        let states = self.states.lock().unwrap();
        match states.get(&server_id) {
            None => true,
            Some(state) => match state.status {
                ServerHealth::Healthy => true,
                ServerHealth::BackingOff | ServerHealth::Dormant => {
                    state.next_retry_at.map(|t| now >= t).unwrap_or(true)
                }
            },
        }
    }

    /// Read-only snapshot of a server's failure state.
    pub fn state_of(&self, server_id: ServerId) -> Option<ServerFailureState> {
        self.states.lock().unwrap().get(&server_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> BackoffConfig {
        BackoffConfig {
            base_delay_secs: 30,
            backoff_multiplier: 2.0,
            max_backoff_minutes: 30,
            max_consecutive_failures: 5,
            dormant_retry_minutes: 120,
        }
    }

    #[test]
    fn test_exponential_schedule() {
        let backoff = RetryBackoff::new(config());
        let now = Utc::now();
        let server = ServerId(7);

        let s1 = backoff.record_failure(server, now);
        assert_eq!(s1.status, ServerHealth::BackingOff);
        assert_eq!(s1.next_retry_at, Some(now + Duration::seconds(30)));

        let s2 = backoff.record_failure(server, now);
        assert_eq!(s2.next_retry_at, Some(now + Duration::seconds(60)));

        // After failure 3: now + 30 * 2^2 = now + 120s.
        let s3 = backoff.record_failure(server, now);
        assert_eq!(s3.next_retry_at, Some(now + Duration::seconds(120)));

        // A sweep at +60s skips the server; at +130s it retries.
        assert!(!backoff.should_retry(server, now + Duration::seconds(60)));
        assert!(backoff.should_retry(server, now + Duration::seconds(130)));
    }

    #[test]
    fn test_delay_is_clamped() {
        let mut cfg = config();
        cfg.max_consecutive_failures = 20;
        let backoff = RetryBackoff::new(cfg);
        let now = Utc::now();
        let server = ServerId(1);

        let mut last = backoff.record_failure(server, now);
        for _ in 0..10 {
            last = backoff.record_failure(server, now);
        }
        let delay = last.next_retry_at.unwrap() - now;
        assert!(delay <= Duration::minutes(30));
    }

    #[test]
    fn test_dormant_at_ceiling() {
        let backoff = RetryBackoff::new(config());
        let now = Utc::now();
        let server = ServerId(2);

        for _ in 0..4 {
            backoff.record_failure(server, now);
        }
        let state = backoff.record_failure(server, now);
        assert_eq!(state.status, ServerHealth::Dormant);
        assert_eq!(state.next_retry_at, Some(now + Duration::minutes(120)));
        assert!(!backoff.should_retry(server, now + Duration::minutes(60)));
        assert!(backoff.should_retry(server, now + Duration::minutes(121)));
    }

    #[test]
    fn test_success_resets_state() {
        let backoff = RetryBackoff::new(config());
        let now = Utc::now();
        let server = ServerId(3);

        backoff.record_failure(server, now);
        backoff.record_failure(server, now);
        backoff.record_success(server);

        let state = backoff.state_of(server).unwrap();
        assert_eq!(state.status, ServerHealth::Healthy);
        assert_eq!(state.consecutive_failures, 0);
        assert!(state.next_retry_at.is_none());
        assert!(backoff.should_retry(server, now));
    }

    #[test]
    fn test_unknown_server_retries() {
        let backoff = RetryBackoff::new(config());
        assert!(backoff.should_retry(ServerId(99), Utc::now()));
    }
}
