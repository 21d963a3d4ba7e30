use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use dotenv::dotenv;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use application::floor_heating::HeatingLoops;
use application::home::Controller;
use infrastructure::config::ControllerConfig;
use infrastructure::sensors::{SensorListener, SensorRegistry};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding `default.toml` and the optional `$RUN_MODE` overrides
    #[arg(long, default_value = "config")]
    config_dir: String,

    /// Override the discovery/sensor port
    #[arg(long)]
    port: Option<u16>,
}

fn init_tracing(level: &str) {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| level.to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn run() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();

    let mut config = ControllerConfig::load(&args.config_dir)
        .with_context(|| format!("Failed to load configuration from {}", args.config_dir))?;
    if let Some(port) = args.port {
        config.server.port = port;
    }

    init_tracing(&config.log.level);
    info!(version = env!("CARGO_PKG_VERSION"), "🌡️ Climate Controller starting...");

    let topology = config.into_topology().context("Invalid house configuration")?;
    info!(
        levels = topology.levels.len(),
        rooms = topology.rooms().count(),
        port = topology.server_port,
        "✅ Configuration loaded"
    );

    let host = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
    let sensors = Arc::new(SensorRegistry::new());
    let sensor_listener =
        SensorListener::bind(SocketAddr::new(host, topology.server_port), sensors.clone()).await?;

    let loops = HeatingLoops::from_topology(&topology).await;
    let controller = Controller::build(&topology, &loops, &sensors, host).await?;

    let token = CancellationToken::new();
    tokio::spawn({
        let token = token.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("🛑 Shutting down..."),
                Err(err) => warn!(error = %err, "Unable to listen for shutdown signal"),
            }
            token.cancel();
        }
    });

    let outcome = tokio::select! {
        controlled = controller.run(token.clone()) => controlled,
        listened = sensor_listener.run(token.clone()) => listened.context("Sensor listener failed"),
    };

    if token.is_cancelled() {
        outcome?;
        info!("👋 Good bye!");
        return Ok(());
    }

    token.cancel();
    error!("Unexpected end of one of the tasks, finishing...");
    match outcome {
        Ok(()) => Err(anyhow!("A controller task ended without being cancelled")),
        Err(e) => Err(e),
    }
}

fn main() {
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("❌ Failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = rt.block_on(run()) {
        eprintln!("\n❌ CRITICAL ERROR: {:?}", e);
        std::process::exit(1);
    }
}
