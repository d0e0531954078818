//! Synthetic login traffic.
//!
//! Produces an initial seed burst and periodic bursts, each leading with a
//! run of forced failures concentrated on a few (user, ip) clusters so the
//! detector has something to find.

pub mod engine;
pub mod offline;

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::config::SimulatorConfig;
use crate::detect::{EventKind, LoginEvent, LoginStatus};

pub use self::engine::run_simulator_loop;
pub use self::offline::run_offline;

/// A (user, ip) pair that receives concentrated failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    pub user: String,
    pub ip: String,
}

/// Fields to pin when generating an event; the rest are random.
#[derive(Debug, Clone, Default)]
pub struct EventOverrides {
    pub user: Option<String>,
    pub ip: Option<String>,
    pub status: Option<LoginStatus>,
}

impl EventOverrides {
    /// A forced failure against `cluster`.
    pub fn cluster_failure(cluster: &Cluster) -> Self {
        Self {
            user: Some(cluster.user.clone()),
            ip: Some(cluster.ip.clone()),
            status: Some(LoginStatus::Fail),
        }
    }
}

/// Random login event source.
pub struct EventGenerator<R> {
    rng: R,
    success_ratio: f64,
}

impl<R: Rng> EventGenerator<R> {
    pub fn new(rng: R, success_ratio: f64) -> Self {
        Self {
            rng,
            success_ratio: success_ratio.clamp(0.0, 1.0),
        }
    }

    pub fn from_config(rng: R, config: &SimulatorConfig) -> Self {
        Self::new(rng, config.success_ratio)
    }

    /// `U0` .. `U999`.
    pub fn random_user(&mut self) -> String {
        format!("U{}", self.rng.gen_range(0..1000))
    }

    /// `192.168.0.0` .. `192.168.254.254`.
    pub fn random_ip(&mut self) -> String {
        format!(
            "192.168.{}.{}",
            self.rng.gen_range(0..255),
            self.rng.gen_range(0..255)
        )
    }

    pub fn random_status(&mut self) -> LoginStatus {
        if self.rng.gen_bool(self.success_ratio) {
            LoginStatus::Success
        } else {
            LoginStatus::Fail
        }
    }

    pub fn random_cluster(&mut self) -> Cluster {
        Cluster {
            user: self.random_user(),
            ip: self.random_ip(),
        }
    }

    pub fn generate(&mut self, at: DateTime<Utc>, overrides: EventOverrides) -> LoginEvent {
        let user = match overrides.user {
            Some(user) => user,
            None => self.random_user(),
        };
        let ip = match overrides.ip {
            Some(ip) => ip,
            None => self.random_ip(),
        };
        let status = match overrides.status {
            Some(status) => status,
            None => self.random_status(),
        };
        LoginEvent {
            timestamp: at,
            user,
            event: EventKind::Login,
            ip,
            status,
        }
    }

    /// Startup burst: the first `seed_cluster_fails` events are failures
    /// dealt round-robin over `seed_clusters` clusters, the rest are random.
    pub fn seed_burst(&mut self, config: &SimulatorConfig, at: DateTime<Utc>) -> Vec<LoginEvent> {
        let clusters: Vec<Cluster> = (0..config.seed_clusters.max(1))
            .map(|_| self.random_cluster())
            .collect();

        (0..config.seed_events)
            .map(|i| {
                let overrides = if i < config.seed_cluster_fails {
                    EventOverrides::cluster_failure(&clusters[i % clusters.len()])
                } else {
                    EventOverrides::default()
                };
                self.generate(at, overrides)
            })
            .collect()
    }

    /// Periodic burst: the first `burst_cluster_fails` events are failures
    /// alternating between two fresh clusters, the rest are random.
    pub fn periodic_burst(
        &mut self,
        config: &SimulatorConfig,
        at: DateTime<Utc>,
    ) -> Vec<LoginEvent> {
        let pair = [self.random_cluster(), self.random_cluster()];

        (0..config.burst_events)
            .map(|i| {
                let overrides = if i < config.burst_cluster_fails {
                    EventOverrides::cluster_failure(&pair[i % 2])
                } else {
                    EventOverrides::default()
                };
                self.generate(at, overrides)
            })
            .collect()
    }
}
