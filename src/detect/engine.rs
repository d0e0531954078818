use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use crate::config::DetectorConfig;
use crate::detect::clock::{Clock, SystemClock};
use crate::detect::decision::{decide, random_id};
use crate::detect::window::FailureWindowStore;
use crate::detect::{AnomalyAlert, Detection, LoginEvent};

/// Rolling failure-window detector.
///
/// Counts failed logins per `user|ip` over the configured window and raises
/// an anomaly when the count lands exactly on one of the thresholds. Counts
/// that only pass a threshold, or climb beyond the last one, stay silent.
pub struct FailureDetector<C = SystemClock, R = StdRng> {
    store: FailureWindowStore,
    thresholds: Vec<usize>,
    clock: C,
    rng: R,
    last_now: Option<i64>,
}

impl FailureDetector {
    /// Wall-clock detector with an OS-seeded random source.
    pub fn new(config: &DetectorConfig) -> Self {
        Self::with_parts(config, SystemClock, StdRng::from_entropy())
    }
}

impl<C: Clock, R: Rng> FailureDetector<C, R> {
    pub fn with_parts(config: &DetectorConfig, clock: C, rng: R) -> Self {
        let mut thresholds = config.thresholds.clone();
        thresholds.sort_unstable();
        thresholds.dedup();
        Self {
            store: FailureWindowStore::new(config.window_ms),
            thresholds,
            clock,
            rng,
            last_now: None,
        }
    }

    /// Feed one event through the detector.
    pub fn process(&mut self, event: &LoginEvent) -> Detection {
        if !event.is_failure() {
            return Detection::none();
        }

        let now = self.now();
        let key = event.window_key();
        let attempts = self.store.record(&key, now);
        debug!(key = %key, attempts, "recorded failed login");

        if self.thresholds.binary_search(&attempts).is_err() {
            return Detection::none();
        }

        let anomaly = AnomalyAlert {
            id: random_id(&mut self.rng),
            timestamp: event.timestamp,
            user: event.user.clone(),
            ip: event.ip.clone(),
            attempts,
        };
        let decision = decide(&anomaly, &mut self.rng);

        warn!(
            user = %anomaly.user,
            ip = %anomaly.ip,
            attempts,
            severity = %decision.severity,
            action = %decision.action,
            "brute-force anomaly detected"
        );

        Detection {
            anomaly: Some(anomaly),
            decision: Some(decision),
        }
    }

    /// Drop keys whose windows have fully expired. Returns how many went.
    pub fn sweep(&mut self) -> usize {
        let now = self.now();
        let removed = self.store.sweep(now);
        if removed > 0 {
            debug!(removed, remaining = self.store.key_count(), "evicted idle failure windows");
        }
        removed
    }

    /// Forget all failure history.
    pub fn reset(&mut self) {
        self.store.clear();
        self.last_now = None;
    }

    /// Number of `user|ip` keys with live failures.
    pub fn tracked_keys(&self) -> usize {
        self.store.key_count()
    }

    /// Stored failures for a key as of the last update to it.
    pub fn window_len(&self, user: &str, ip: &str) -> usize {
        self.store.len_of(&crate::detect::window::window_key(user, ip))
    }

    pub fn thresholds(&self) -> &[usize] {
        &self.thresholds
    }

    /// Width of the rolling failure window.
    pub fn window_ms(&self) -> i64 {
        self.store.window_ms()
    }

    /// Current instant, never earlier than one already handed out.
    fn now(&mut self) -> i64 {
        let observed = self.clock.now_ms();
        let now = match self.last_now {
            Some(last) if observed < last => {
                warn!(observed, last, "clock moved backwards, holding last instant");
                last
            }
            _ => observed,
        };
        self.last_now = Some(now);
        now
    }
}
