//! DNS discovery host.
//!
//! Runs discovery rounds against a live-reloaded configuration file and
//! prints the peers found each round.
//!
//! ```text
//!   dnsdiscovery.toml ──▶ LiveConfig ──(reload every 3s)──▶ listeners
//!                            │                                 │
//!                            ▼                                 ▼
//!                 DiscoveryConfiguration              restart notice (log)
//!                            │
//!   ticker ──▶ DiscoveryService ──▶ AddressResolver ──▶ DNS
//!                            │
//!                            ▼
//!                       peers (stdout)
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use dns_discovery::config::loader::load_settings;
use dns_discovery::config::{DiscoveryConfiguration, DiscoverySettings, LiveConfig};
use dns_discovery::discovery::{DiscoveryService, HickoryLookup, PeerAddress};
use dns_discovery::lifecycle::signals::shutdown_signal;
use dns_discovery::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "dns-discovery")]
#[command(about = "Discover cluster peers through round-robin DNS", long_about = None)]
struct Cli {
    /// Host settings file (TOML). Flags below override it.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Directory holding the live discovery file.
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Name of the live discovery file.
    #[arg(long)]
    file_name: Option<String>,

    /// This node's address.
    #[arg(long, default_value = "127.0.0.1")]
    own_host: String,

    /// This node's cluster port; every peer is assumed to use it too.
    #[arg(long, default_value_t = 7800)]
    own_port: u16,

    #[arg(long)]
    cluster_id: Option<String>,

    /// Seconds between discovery rounds.
    #[arg(long, default_value_t = 10)]
    interval_secs: u64,

    /// Serve Prometheus metrics on this address.
    #[arg(long)]
    metrics_address: Option<SocketAddr>,

    /// Emit logs and peer lists as JSON.
    #[arg(long)]
    json: bool,

    /// Run a single round and exit.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    logging::init_logging("dns_discovery=info", cli.json)?;

    tracing::info!("dns-discovery v{} starting", env!("CARGO_PKG_VERSION"));

    let mut settings = match &cli.settings {
        Some(path) => load_settings(path)?,
        None => DiscoverySettings::default(),
    };
    if let Some(dir) = cli.config_dir.clone() {
        settings.config_dir = dir;
    }
    if let Some(name) = cli.file_name.clone() {
        settings.file_name = name;
    }

    tracing::info!(
        config_path = ?settings.config_path(),
        reload_interval_secs = settings.reload_interval_secs,
        default_timeout_secs = settings.default_resolution_timeout_secs,
        "Configuration loaded"
    );

    if let Some(addr) = cli.metrics_address {
        if let Err(e) = metrics::init_metrics(addr) {
            tracing::error!(metrics_address = %addr, error = %e, "Failed to start metrics endpoint");
        }
    }

    let live = Arc::new(LiveConfig::new(&settings));
    let reload_task = live.start();

    let configuration = Arc::new(DiscoveryConfiguration::new(
        Arc::clone(&live),
        settings.default_resolution_timeout_secs,
    ));
    configuration.set_restart_listener(|| {
        tracing::info!("Discovery parameters changed, next round uses the new values");
    });

    let service = Arc::new(DiscoveryService::new(
        configuration,
        Arc::new(HickoryLookup::from_system_conf()),
    )?);
    service.init(cli.cluster_id.clone(), PeerAddress::new(cli.own_host.clone(), cli.own_port));

    let mut ticker = tokio::time::interval(Duration::from_secs(cli.interval_secs.max(1)));
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let peers = service.discover_peers().await?;
                print_peers(&peers, cli.json)?;
                if cli.once {
                    break;
                }
            }
            _ = &mut shutdown => break,
        }
    }

    service.teardown();
    live.stop();
    if let Some(task) = reload_task {
        let _ = task.await;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

fn print_peers(peers: &[PeerAddress], json: bool) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string(peers)?);
    } else if peers.is_empty() {
        println!("no peers found");
    } else {
        for peer in peers {
            println!("{}", peer);
        }
    }
    Ok(())
}
