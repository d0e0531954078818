//! Simulated bursts on a virtual clock, without waiting for the real
//! interval between them.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};

use crate::config::Config;
use crate::dashboard::Dashboard;
use crate::detect::ManualClock;
use crate::replay::RunReport;
use crate::simulate::EventGenerator;

/// Run the seed burst and `bursts` periodic bursts on a virtual clock that
/// advances by the configured interval between bursts.
///
/// Stops early if the next burst instant is not representable.
pub fn run_offline(config: &Config, bursts: usize, seed: u64, start: DateTime<Utc>) -> RunReport {
    let clock = ManualClock::new(start.timestamp_millis());
    let mut dashboard = Dashboard::with_clock(config, clock.clone(), seed);
    let mut generator =
        EventGenerator::from_config(StdRng::seed_from_u64(seed.wrapping_add(1)), &config.simulator);

    let mut at = start;
    let mut detections = dashboard.ingest_all(generator.seed_burst(&config.simulator, at));

    let step = i64::try_from(config.simulator.burst_interval_sec)
        .ok()
        .and_then(Duration::try_seconds);
    for burst_no in 0..bursts {
        let Some(next) = step.and_then(|step| at.checked_add_signed(step)) else {
            warn!(
                burst = burst_no,
                interval_sec = config.simulator.burst_interval_sec,
                "burst interval out of range, stopping simulation"
            );
            break;
        };
        at = next;
        clock.set_time(at);
        let burst = generator.periodic_burst(&config.simulator, at);
        detections.extend(dashboard.ingest_all(burst));
        dashboard.sweep();
    }

    info!(
        bursts,
        detections = detections.len(),
        total_events = dashboard.stats().total_events,
        "simulation finished"
    );
    RunReport {
        detections,
        dashboard: dashboard.snapshot(),
    }
}
