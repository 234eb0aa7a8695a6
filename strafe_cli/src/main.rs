use strafe_core::config::StrafeConfig;
use strafe_core::events::{CrashEvent, CrashEventSource, EventFeedError};
use strafe_core::orchestrator::Orchestrator;
use strafe_core::sender::TcpPacketSender;

use chrono::Utc;
use clap::Parser;
use rand_chacha::ChaCha8Rng;
use rand_core::SeedableRng;
use std::net::{TcpStream, ToSocketAddrs};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::mpsc::{Receiver, channel};
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[clap(short, long, value_parser)]
    config_file: Option<PathBuf>,
    /// Target address override.
    #[clap(long)]
    address: Option<String>,
    /// Target port override.
    #[clap(long)]
    port: Option<u16>,
    /// Generation budget override.
    #[clap(short, long)]
    generations: Option<u64>,
    /// RNG seed for reproducible runs.
    #[clap(long, default_value_t = 0)]
    seed: u64,
}

/// A crash-event source backed by a TCP liveness probe.
///
/// A background thread periodically opens a connection to the target. Once
/// the target has been seen alive, the first failed probe is reported as a
/// crash event for the configured target name.
struct ProbeEventSource {
    address: String,
    port: u16,
    target_name: String,
    interval: Duration,
}

impl ProbeEventSource {
    fn new(address: String, port: u16, target_name: String, interval: Duration) -> Self {
        Self {
            address,
            port,
            target_name,
            interval,
        }
    }
}

impl CrashEventSource for ProbeEventSource {
    fn subscribe(&mut self) -> Result<Receiver<CrashEvent>, EventFeedError> {
        let socket_addr = (self.address.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| EventFeedError::SubscriptionFailed(e.to_string()))?
            .next()
            .ok_or_else(|| {
                EventFeedError::SubscriptionFailed(format!(
                    "no address for {}:{}",
                    self.address, self.port
                ))
            })?;

        let (event_tx, event_rx) = channel();
        let target_name = self.target_name.clone();
        let interval = self.interval;

        std::thread::spawn(move || {
            let mut seen_alive = false;
            loop {
                match TcpStream::connect_timeout(&socket_addr, interval) {
                    Ok(_) => seen_alive = true,
                    Err(_) if seen_alive => {
                        let event = CrashEvent {
                            target: target_name,
                            timestamp: Utc::now(),
                        };
                        if event_tx.send(event).is_err() {
                            warn!("crash event dropped, subscriber is gone");
                        }
                        return;
                    }
                    Err(_) => {
                        // Not up yet; keep probing until first contact.
                    }
                }
                std::thread::sleep(interval);
            }
        });

        Ok(event_rx)
    }
}

fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let mut config = match cli.config_file {
        Some(config_path) => {
            info!(path = ?config_path, "loading configuration");
            StrafeConfig::load_from_file(&config_path)?
        }
        None => {
            let default_config_path = PathBuf::from("config.toml");
            if default_config_path.exists() {
                info!(path = ?default_config_path, "loading default configuration file");
                StrafeConfig::load_from_file(&default_config_path)?
            } else {
                info!("no config file found, using built-in defaults");
                StrafeConfig::default()
            }
        }
    };

    if let Some(address) = cli.address {
        config.target.address = address;
    }
    if let Some(port) = cli.port {
        config.target.port = port;
    }
    if let Some(generations) = cli.generations {
        config
            .fuzzer
            .get_or_insert_with(Default::default)
            .max_generations = generations;
    }

    info!(config = ?config, "effective configuration");

    let buffer_settings = config.buffer_settings();
    let mut event_source = ProbeEventSource::new(
        config.target.address.clone(),
        config.target.port,
        config.target.name.clone(),
        Duration::from_millis(buffer_settings.poll_interval_ms),
    );
    let events = event_source.subscribe()?;

    let sender = TcpPacketSender::new();
    let orchestrator = Orchestrator::new(
        config.fuzzer_settings(),
        config.target.clone(),
        buffer_settings.clone(),
    );

    let mut rng = ChaCha8Rng::seed_from_u64(cli.seed);
    let stop = Arc::new(AtomicBool::new(false));

    match orchestrator.run(&sender, events, stop, &mut rng)? {
        Some(record) => {
            info!(
                crash_time = %record.crash_time,
                cause_found = record.cause.is_some(),
                report = ?buffer_settings.report_path,
                "crash correlated, report written"
            );
        }
        None => {
            error!("run finished without a correlated crash");
        }
    }

    Ok(())
}
