use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use loginwatch::config::{Config, LoggingConfig};
use loginwatch::replay::RunReport;

#[derive(Parser)]
#[command(
    name = "loginwatch",
    about = "Rolling-window brute-force login detection",
    version,
    long_about = None
)]
struct Cli {
    /// Path to a TOML config file (falls back to $LOGINWATCH_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the daemon (simulator + API server)
    Serve {
        /// Bind address (overrides the config file)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Run the seed burst and N periodic bursts on a virtual clock
    Simulate {
        /// Periodic bursts after the seed burst
        #[arg(long, default_value = "3")]
        bursts: usize,

        /// Random seed (random if omitted)
        #[arg(long)]
        seed: Option<u64>,

        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },

    /// Replay newline-delimited JSON login events through the detector
    Replay {
        /// Input file, one LoginEvent per line
        file: PathBuf,

        /// Random seed for alert ids and confidence scores
        #[arg(long, default_value = "0")]
        seed: u64,

        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Config lookup logs before the configured subscriber exists.
    let bootstrap = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .finish();
    let mut config =
        tracing::subscriber::with_default(bootstrap, || Config::resolve(cli.config.as_deref()))?;

    init_tracing(&config.logging);

    match cli.command {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.api.bind = bind;
            }
            tracing::info!(bind = %config.api.bind, "Starting loginwatch daemon");
            loginwatch::serve(config).await?;
        }
        Commands::Simulate { bursts, seed, json } => {
            let seed = seed.unwrap_or_else(rand::random);
            tracing::info!(bursts, seed, "Running offline simulation");
            let report = loginwatch::simulate::run_offline(&config, bursts, seed, chrono::Utc::now());
            print_report("Simulation", &report, json)?;
        }
        Commands::Replay { file, seed, json } => {
            let events = loginwatch::replay::load_events(&file)
                .with_context(|| format!("replay of {} failed", file.display()))?;
            let report = loginwatch::replay::replay(&config, events, seed);
            print_report("Replay", &report, json)?;
        }
    }

    Ok(())
}

fn print_report(title: &str, report: &RunReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    let stats = &report.dashboard.stats;
    println!("\n=== loginwatch {} ===", title);
    println!(
        "{} events processed, {} anomalies, {} blocked",
        stats.total_events, stats.anomaly_count, stats.blocked_count
    );

    println!("\nAnomaly Alerts");
    if report.dashboard.anomalies.is_empty() {
        println!("  (none)");
    } else {
        println!("{:<10} | {:<6} | {:<17} | Attempts", "Time", "User", "IP");
        println!("{:-<10}-|-{:-<6}-|-{:-<17}-|-{:-<8}", "", "", "", "");
        for a in &report.dashboard.anomalies {
            println!(
                "{:<10} | {:<6} | {:<17} | {}",
                a.timestamp.format("%H:%M:%S").to_string(),
                a.user,
                a.ip,
                a.attempts
            );
        }
    }

    println!("\nDecisions");
    if report.dashboard.decisions.is_empty() {
        println!("  (none)");
    } else {
        println!(
            "{:<10} | {:<6} | {:<8} | {:<20} | Confidence",
            "Time", "User", "Severity", "Action"
        );
        println!("{:-<10}-|-{:-<6}-|-{:-<8}-|-{:-<20}-|-{:-<10}", "", "", "", "", "");
        for entry in &report.dashboard.decisions {
            let d = &entry.decision;
            println!(
                "{:<10} | {:<6} | {:<8} | {:<20} | {}%",
                d.timestamp.format("%H:%M:%S").to_string(),
                d.user,
                d.severity.to_string(),
                d.action,
                d.confidence
            );
        }
    }
    println!();
    Ok(())
}
