use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::info;

use crate::config::SimulatorConfig;
use crate::dashboard::SharedDashboard;
use crate::detect::LoginEvent;
use crate::simulate::EventGenerator;

/// Seed the dashboard, then inject a burst every `burst_interval_sec`
/// until `shutdown` flips to `true` or its sender is dropped.
///
/// Each burst is ingested under one write lock, so events are processed
/// in generation order and a burst is never cut short by shutdown.
pub async fn run_simulator_loop<R: Rng + Send>(
    dashboard: SharedDashboard,
    mut generator: EventGenerator<R>,
    config: SimulatorConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    info!(
        seed_events = config.seed_events,
        interval_sec = config.burst_interval_sec,
        "Simulator started"
    );

    let seed = generator.seed_burst(&config, Utc::now());
    ingest_burst(&dashboard, seed, "seed").await;

    let period = Duration::from_secs(
        config
            .burst_interval_sec
            .clamp(1, crate::config::MAX_BURST_INTERVAL_SEC),
    );
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let burst = generator.periodic_burst(&config, Utc::now());
                ingest_burst(&dashboard, burst, "periodic").await;
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    info!("Simulator stopped");
}

async fn ingest_burst(
    dashboard: &SharedDashboard,
    events: Vec<LoginEvent>,
    kind: &str,
) {
    let count = events.len();
    let mut dash = dashboard.write().await;
    let fired = dash.ingest_all(events);
    let evicted = dash.sweep();
    let stats = dash.stats();
    drop(dash);

    info!(
        kind,
        count,
        anomalies = fired.len(),
        evicted,
        total_events = stats.total_events,
        blocked = stats.blocked_count,
        "Burst ingested"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::dashboard::Dashboard;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[tokio::test(start_paused = true)]
    async fn test_seed_then_periodic_bursts_then_shutdown() {
        let mut config = Config::default();
        config.simulator.burst_interval_sec = 60;
        let dashboard = Dashboard::shared(&config);
        let generator = EventGenerator::from_config(StdRng::seed_from_u64(5), &config.simulator);
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(run_simulator_loop(
            dashboard.clone(),
            generator,
            config.simulator.clone(),
            rx,
        ));

        // Seed burst lands before the first tick.
        tokio::time::sleep(Duration::from_secs(1)).await;
        {
            let stats = dashboard.read().await.stats();
            assert_eq!(stats.total_events, 100);
            // Four clusters of ten failures: one Medium and one High each.
            assert!(stats.anomaly_count >= 8);
            assert!(stats.blocked_count >= 4);
        }

        // Two periodic bursts.
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(dashboard.read().await.stats().total_events, 140);

        tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
