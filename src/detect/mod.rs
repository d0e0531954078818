//! Brute-force detection: rolling failure windows, anomaly alerts and
//! the decisions recommended for them.

pub mod clock;
pub mod decision;
pub mod engine;
pub mod window;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use self::clock::{Clock, ManualClock, SystemClock};
pub use self::engine::FailureDetector;

/// Outcome of a single login attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginStatus {
    Success,
    Fail,
}

/// Kind of security event. Only logins are produced today.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    #[default]
    Login,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Login => f.write_str("login"),
        }
    }
}

/// A single login event as produced by the upstream generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginEvent {
    pub timestamp: DateTime<Utc>,
    pub user: String,
    #[serde(default)]
    pub event: EventKind,
    pub ip: String,
    pub status: LoginStatus,
}

impl LoginEvent {
    pub fn is_failure(&self) -> bool {
        self.status == LoginStatus::Fail
    }

    /// Composite `user|ip` key partitioning the failure windows.
    pub fn window_key(&self) -> String {
        window::window_key(&self.user, &self.ip)
    }
}

/// Severity levels for brute-force decisions.
///
/// `Low` is part of the interface but the default thresholds (5 and 8)
/// never produce it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
        };
        f.write_str(s)
    }
}

/// Raised when a `user|ip` window lands exactly on a trigger threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnomalyAlert {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub user: String,
    pub ip: String,
    /// Failed attempts inside the window, the triggering one included.
    pub attempts: usize,
}

/// Recommended response to an [`AnomalyAlert`]. Shares the alert's id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub user: String,
    pub event: EventKind,
    pub severity: Severity,
    pub action: String,
    /// Cosmetic score in `[80, 99]`.
    pub confidence: u8,
    pub rationale: String,
}

/// Result of feeding one event to the detector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Detection {
    pub anomaly: Option<AnomalyAlert>,
    pub decision: Option<Decision>,
}

impl Detection {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.anomaly.is_none() && self.decision.is_none()
    }
}
