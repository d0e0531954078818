//! Replay of recorded login events on a clock driven by the events
//! themselves.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::Config;
use crate::dashboard::{Dashboard, DashboardSnapshot};
use crate::detect::{Detection, LoginEvent, ManualClock};

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: invalid login event: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Every detection an offline run produced, plus the final dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub detections: Vec<Detection>,
    pub dashboard: DashboardSnapshot,
}

/// Parse newline-delimited JSON login events. Blank lines are skipped.
pub fn parse_events(input: &str) -> Result<Vec<LoginEvent>, ReplayError> {
    input
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line).map_err(|source| ReplayError::Parse {
                line: idx + 1,
                source,
            })
        })
        .collect()
}

pub fn load_events(path: &Path) -> Result<Vec<LoginEvent>, ReplayError> {
    let content = std::fs::read_to_string(path).map_err(|source| ReplayError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let events = parse_events(&content)?;
    info!(path = %path.display(), count = events.len(), "loaded events for replay");
    Ok(events)
}

/// Feed `events` through a fresh dashboard whose clock follows each event's
/// own timestamp, so the same input always yields the same alerts.
///
/// Timestamps that go backwards are held at the latest instant seen.
pub fn replay(config: &Config, events: Vec<LoginEvent>, seed: u64) -> RunReport {
    let clock = ManualClock::default();
    let mut dashboard = Dashboard::with_clock(config, clock.clone(), seed);

    let mut detections = Vec::new();
    for event in events {
        clock.set_time(event.timestamp);
        let detection = dashboard.ingest(event);
        if !detection.is_empty() {
            detections.push(detection);
        }
    }
    dashboard.sweep();

    debug!(detections = detections.len(), "replay finished");
    RunReport {
        detections,
        dashboard: dashboard.snapshot(),
    }
}
