use rand::Rng;
use uuid::Uuid;

use crate::detect::{AnomalyAlert, Decision, EventKind, Severity};

/// Rationale attached to every brute-force decision.
pub const BRUTE_FORCE_RATIONALE: &str = "Multiple failed logins indicate brute-force attack.";

/// Map a window's attempt count to a severity. Monotonic in `attempts`.
pub fn severity_for(attempts: usize) -> Severity {
    if attempts >= 8 {
        Severity::High
    } else if attempts >= 5 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Recommended operator action for a severity.
pub fn action_for(severity: Severity) -> &'static str {
    match severity {
        Severity::High => "Block IP immediately",
        Severity::Medium => "Step-up MFA",
        Severity::Low => "Monitor",
    }
}

/// Random alert id drawn from `rng`, so seeded detectors stay reproducible.
pub fn random_id<R: Rng>(rng: &mut R) -> Uuid {
    uuid::Builder::from_random_bytes(rng.gen()).into_uuid()
}

/// Derive the decision for `alert`.
pub fn decide<R: Rng>(alert: &AnomalyAlert, rng: &mut R) -> Decision {
    let severity = severity_for(alert.attempts);
    Decision {
        id: alert.id,
        timestamp: alert.timestamp,
        user: alert.user.clone(),
        event: EventKind::Login,
        severity,
        action: action_for(severity).to_string(),
        confidence: rng.gen_range(80..=99),
        rationale: BRUTE_FORCE_RATIONALE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_severity_mapping() {
        assert_eq!(severity_for(1), Severity::Low);
        assert_eq!(severity_for(4), Severity::Low);
        assert_eq!(severity_for(5), Severity::Medium);
        assert_eq!(severity_for(7), Severity::Medium);
        assert_eq!(severity_for(8), Severity::High);
        assert_eq!(severity_for(100), Severity::High);

        let mut last = Severity::Low;
        for attempts in 0..20 {
            let s = severity_for(attempts);
            assert!(s >= last);
            last = s;
        }
    }

    #[test]
    fn test_actions() {
        assert_eq!(action_for(Severity::High), "Block IP immediately");
        assert_eq!(action_for(Severity::Medium), "Step-up MFA");
        assert_eq!(action_for(Severity::Low), "Monitor");
    }

    #[test]
    fn test_decision_mirrors_alert() {
        let mut rng = StdRng::seed_from_u64(7);
        let alert = AnomalyAlert {
            id: random_id(&mut rng),
            timestamp: chrono::Utc::now(),
            user: "U42".into(),
            ip: "192.168.1.1".into(),
            attempts: 8,
        };

        for _ in 0..200 {
            let d = decide(&alert, &mut rng);
            assert_eq!(d.id, alert.id);
            assert_eq!(d.timestamp, alert.timestamp);
            assert_eq!(d.user, "U42");
            assert_eq!(d.severity, Severity::High);
            assert_eq!(d.action, "Block IP immediately");
            assert_eq!(d.rationale, BRUTE_FORCE_RATIONALE);
            assert!((80..=99).contains(&d.confidence));
        }
    }
}
