//! Dashboard state: most-recent lists, running counters and operator review
//! of decisions. Owns the detector so one instance is one isolated session.

use std::collections::VecDeque;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::config::Config;
use crate::detect::{
    AnomalyAlert, Clock, Decision, Detection, FailureDetector, LoginEvent, Severity, SystemClock,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DashboardError {
    #[error("decision {0} not found")]
    DecisionNotFound(Uuid),
}

/// Operator verdict on a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Recommended action accepted.
    Approved,
    /// Flagged activity marked as safe.
    Overridden,
}

/// Visual weight of an operator notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Info,
}

/// Transient message returned after a review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewNotice {
    pub id: Uuid,
    pub verdict: Verdict,
    pub level: NoticeLevel,
    pub message: &'static str,
}

impl ReviewNotice {
    fn for_verdict(id: Uuid, verdict: Verdict) -> Self {
        let (level, message) = match verdict {
            Verdict::Approved => (NoticeLevel::Success, "User blocked successfully"),
            Verdict::Overridden => (NoticeLevel::Info, "Marked as safe"),
        };
        Self {
            id,
            verdict,
            level,
            message,
        }
    }
}

/// A decision as displayed, with its review state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecisionEntry {
    #[serde(flatten)]
    pub decision: Decision,
    pub review: Option<Verdict>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub total_events: u64,
    pub anomaly_count: u64,
    /// High-severity decisions.
    pub blocked_count: u64,
    /// `user|ip` keys with live failures.
    pub tracked_keys: usize,
    pub window_ms: i64,
}

/// Point-in-time copy of everything the dashboard shows, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub stats: Stats,
    pub events: Vec<LoginEvent>,
    pub anomalies: Vec<AnomalyAlert>,
    pub decisions: Vec<DecisionEntry>,
}

/// Dashboard shared between the simulator task and the API handlers.
pub type SharedDashboard = Arc<RwLock<Dashboard>>;

pub struct Dashboard<C = SystemClock> {
    detector: FailureDetector<C, StdRng>,
    capacity: usize,
    events: VecDeque<LoginEvent>,
    anomalies: VecDeque<AnomalyAlert>,
    decisions: VecDeque<DecisionEntry>,
    total_events: u64,
    anomaly_count: u64,
    blocked_count: u64,
}

impl Dashboard {
    /// Live dashboard on the wall clock.
    pub fn new(config: &Config) -> Self {
        Self::with_detector(
            FailureDetector::new(&config.detector),
            config.dashboard.recent_capacity,
        )
    }

    pub fn shared(config: &Config) -> SharedDashboard {
        Arc::new(RwLock::new(Self::new(config)))
    }
}

impl<C: Clock> Dashboard<C> {
    /// Dashboard over an injected clock with a seeded random source.
    pub fn with_clock(config: &Config, clock: C, seed: u64) -> Self {
        Self::with_detector(
            FailureDetector::with_parts(&config.detector, clock, StdRng::seed_from_u64(seed)),
            config.dashboard.recent_capacity,
        )
    }

    pub fn with_detector(detector: FailureDetector<C, StdRng>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            detector,
            capacity,
            events: VecDeque::with_capacity(capacity),
            anomalies: VecDeque::with_capacity(capacity),
            decisions: VecDeque::with_capacity(capacity),
            total_events: 0,
            anomaly_count: 0,
            blocked_count: 0,
        }
    }

    /// Count and log `event`, run it through the detector and record any
    /// anomaly it raises.
    pub fn ingest(&mut self, event: LoginEvent) -> Detection {
        self.total_events += 1;
        let detection = self.detector.process(&event);
        push_capped(&mut self.events, event, self.capacity);

        if let Some(anomaly) = &detection.anomaly {
            self.anomaly_count += 1;
            push_capped(&mut self.anomalies, anomaly.clone(), self.capacity);
        }
        if let Some(decision) = &detection.decision {
            if decision.severity == Severity::High {
                self.blocked_count += 1;
            }
            push_capped(
                &mut self.decisions,
                DecisionEntry {
                    decision: decision.clone(),
                    review: None,
                },
                self.capacity,
            );
        }
        detection
    }

    /// Ingest a burst in order, returning only the detections that fired.
    pub fn ingest_all<I>(&mut self, events: I) -> Vec<Detection>
    where
        I: IntoIterator<Item = LoginEvent>,
    {
        events
            .into_iter()
            .map(|ev| self.ingest(ev))
            .filter(|d| !d.is_empty())
            .collect()
    }

    /// Record an operator verdict on a displayed decision.
    pub fn review(&mut self, id: Uuid, verdict: Verdict) -> Result<ReviewNotice, DashboardError> {
        let entry = self
            .decisions
            .iter_mut()
            .find(|entry| entry.decision.id == id)
            .ok_or(DashboardError::DecisionNotFound(id))?;
        entry.review = Some(verdict);
        info!(%id, ?verdict, user = %entry.decision.user, "decision reviewed");
        Ok(ReviewNotice::for_verdict(id, verdict))
    }

    /// Evict failure windows that have expired.
    pub fn sweep(&mut self) -> usize {
        self.detector.sweep()
    }

    /// Clear history, counters and failure windows.
    pub fn reset(&mut self) {
        self.detector.reset();
        self.events.clear();
        self.anomalies.clear();
        self.decisions.clear();
        self.total_events = 0;
        self.anomaly_count = 0;
        self.blocked_count = 0;
    }

    pub fn stats(&self) -> Stats {
        Stats {
            total_events: self.total_events,
            anomaly_count: self.anomaly_count,
            blocked_count: self.blocked_count,
            tracked_keys: self.detector.tracked_keys(),
            window_ms: self.detector.window_ms(),
        }
    }

    pub fn recent_events(&self) -> Vec<LoginEvent> {
        self.events.iter().cloned().collect()
    }

    pub fn recent_anomalies(&self) -> Vec<AnomalyAlert> {
        self.anomalies.iter().cloned().collect()
    }

    pub fn recent_decisions(&self) -> Vec<DecisionEntry> {
        self.decisions.iter().cloned().collect()
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        DashboardSnapshot {
            stats: self.stats(),
            events: self.recent_events(),
            anomalies: self.recent_anomalies(),
            decisions: self.recent_decisions(),
        }
    }

}

/// Newest at the front, oldest dropped past `capacity`.
fn push_capped<T>(list: &mut VecDeque<T>, item: T, capacity: usize) {
    list.push_front(item);
    list.truncate(capacity);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{EventKind, LoginStatus, ManualClock};
    use chrono::Utc;

    fn dashboard(clock: &ManualClock) -> Dashboard<ManualClock> {
        Dashboard::with_clock(&Config::default(), clock.clone(), 11)
    }

    fn event(user: &str, ip: &str, status: LoginStatus) -> LoginEvent {
        LoginEvent {
            timestamp: Utc::now(),
            user: user.into(),
            event: EventKind::Login,
            ip: ip.into(),
            status,
        }
    }

    #[test]
    fn test_counters_follow_detections() {
        let clock = ManualClock::new(0);
        let mut dash = dashboard(&clock);

        for _ in 0..8 {
            dash.ingest(event("U1", "10.0.0.1", LoginStatus::Fail));
        }
        for _ in 0..3 {
            dash.ingest(event("U2", "10.0.0.2", LoginStatus::Success));
        }

        let stats = dash.stats();
        assert_eq!(stats.total_events, 11);
        assert_eq!(stats.anomaly_count, 2);
        assert_eq!(stats.blocked_count, 1);
        assert_eq!(stats.tracked_keys, 1);
        assert_eq!(stats.window_ms, 60_000);

        let decisions = dash.recent_decisions();
        assert_eq!(decisions.len(), 2);
        assert_eq!(decisions[0].decision.severity, Severity::High);
        assert_eq!(decisions[1].decision.severity, Severity::Medium);
        assert_eq!(dash.recent_anomalies()[0].attempts, 8);
    }

    #[test]
    fn test_lists_are_capped_newest_first() {
        let clock = ManualClock::new(0);
        let mut dash = dashboard(&clock);

        for i in 0..25 {
            dash.ingest(event(&format!("U{}", i), "10.0.0.1", LoginStatus::Success));
        }
        let events = dash.recent_events();
        assert_eq!(events.len(), 10);
        assert_eq!(events[0].user, "U24");
        assert_eq!(events[9].user, "U15");

        // 12 distinct keys each reaching 5 failures: 12 anomalies, 10 kept.
        for k in 0..12 {
            for _ in 0..5 {
                dash.ingest(event("U1", &format!("10.1.0.{}", k), LoginStatus::Fail));
            }
        }
        assert_eq!(dash.stats().anomaly_count, 12);
        let anomalies = dash.recent_anomalies();
        assert_eq!(anomalies.len(), 10);
        assert_eq!(anomalies[0].ip, "10.1.0.11");
        assert_eq!(dash.recent_decisions().len(), 10);
    }

    #[test]
    fn test_review_records_verdict_and_notice() {
        let clock = ManualClock::new(0);
        let mut dash = dashboard(&clock);
        let fired = dash.ingest_all((0..5).map(|_| event("U1", "10.0.0.1", LoginStatus::Fail)));
        assert_eq!(fired.len(), 1);
        let id = fired[0].decision.as_ref().unwrap().id;

        let notice = dash.review(id, Verdict::Approved).unwrap();
        assert_eq!(notice.message, "User blocked successfully");
        assert_eq!(notice.level, NoticeLevel::Success);
        assert_eq!(dash.recent_decisions()[0].review, Some(Verdict::Approved));

        let notice = dash.review(id, Verdict::Overridden).unwrap();
        assert_eq!(notice.message, "Marked as safe");
        assert_eq!(notice.level, NoticeLevel::Info);
        assert_eq!(dash.recent_decisions()[0].review, Some(Verdict::Overridden));

        // Reviews leave the counters alone.
        assert_eq!(dash.stats().blocked_count, 0);
        assert_eq!(dash.stats().anomaly_count, 1);

        let unknown = Uuid::nil();
        assert_eq!(
            dash.review(unknown, Verdict::Approved),
            Err(DashboardError::DecisionNotFound(unknown))
        );
    }

    #[test]
    fn test_reset_starts_a_fresh_session() {
        let clock = ManualClock::new(0);
        let mut dash = dashboard(&clock);
        for _ in 0..6 {
            dash.ingest(event("U1", "10.0.0.1", LoginStatus::Fail));
        }
        dash.reset();

        let stats = dash.stats();
        assert_eq!(stats.total_events, 0);
        assert_eq!(stats.anomaly_count, 0);
        assert_eq!(stats.blocked_count, 0);
        assert_eq!(stats.tracked_keys, 0);
        assert_eq!(stats.window_ms, 60_000);
        assert!(dash.snapshot().events.is_empty());

        // Window history went with it: four more failures stay silent.
        let fired = dash.ingest_all((0..4).map(|_| event("U1", "10.0.0.1", LoginStatus::Fail)));
        assert!(fired.is_empty());
    }

    #[test]
    fn test_snapshot_serializes_flat_decisions() {
        let clock = ManualClock::new(0);
        let mut dash = dashboard(&clock);
        dash.ingest_all((0..5).map(|_| event("U1", "10.0.0.1", LoginStatus::Fail)));

        let json = serde_json::to_value(dash.snapshot()).unwrap();
        assert_eq!(json["stats"]["total_events"], 5);
        assert_eq!(json["decisions"][0]["severity"], "Medium");
        assert_eq!(json["decisions"][0]["action"], "Step-up MFA");
        assert_eq!(json["decisions"][0]["event"], "login");
        assert!(json["decisions"][0]["review"].is_null());
        assert_eq!(json["events"][0]["status"], "fail");
    }
}
