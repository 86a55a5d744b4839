//! Fly a simulated drone against the flight server.
//!
//! Usage:
//!   cargo run -p drone-cli --bin drone-pilot -- --url ws://localhost:8765

use anyhow::Result;
use clap::Parser;
use drone_cli::pilot::{telemetry_feed, FlightState, Pilot};
use drone_cli::status::{run_status_monitor, status_line};
use drone_cli::Config;
use drone_sdk::WsChannel;
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Closed-loop pilot for the drone flight server
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Flight server WebSocket URL (overrides DRONE_SERVER_URL)
    #[arg(long)]
    url: Option<String>,

    /// Status line period in milliseconds (overrides DRONE_STATUS_INTERVAL_MS)
    #[arg(long)]
    status_interval_ms: Option<u64>,

    /// Disable the status monitor
    #[arg(long, default_value_t = false)]
    no_status: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::from_env();
    if let Some(url) = args.url {
        config.server_url = url;
    }
    if let Some(interval_ms) = args.status_interval_ms {
        config.status_interval_ms = interval_ms;
    }

    let filter = match config.log_filter.as_deref() {
        Some(directives) => EnvFilter::try_new(directives)?,
        None => EnvFilter::from_default_env()
            .add_directive("drone_cli=info".parse()?)
            .add_directive("drone_sdk=info".parse()?)
            .add_directive("drone_pilot=info".parse()?),
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();

    tracing::info!("Attempting to connect to {}...", config.server_url);
    let channel = match WsChannel::connect(&config.server_url).await {
        Ok(channel) => channel,
        Err(e) => {
            tracing::error!(
                "Connection failed. Ensure the server is running at {}",
                config.server_url
            );
            return Err(e);
        }
    };

    let (shutdown_tx, _) = broadcast::channel::<()>(4);
    let (feed, view) = telemetry_feed();

    let monitor = (!args.no_status).then(|| {
        tokio::spawn(run_status_monitor(
            view,
            config.status_interval(),
            shutdown_tx.subscribe(),
        ))
    });

    let ctrl_c_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received");
            let _ = ctrl_c_tx.send(());
        }
    });

    let report = Pilot::new(feed).fly(channel, shutdown_tx.subscribe()).await;

    let _ = shutdown_tx.send(());
    if let Some(monitor) = monitor {
        let _ = monitor.await;
    }

    println!();
    println!("Flight ended: {}", report.state);
    if let Some(connection_id) = &report.connection_id {
        println!("  Connection: {}", connection_id);
    }
    println!("  Commands sent: {}", report.commands_sent);
    println!("  Duration: {:.1}s", report.elapsed().num_milliseconds() as f64 / 1000.0);
    if let Some(snapshot) = &report.last_snapshot {
        println!("  Last telemetry: {}", status_line(snapshot));
    }

    match report.state {
        FlightState::EndedCrash => {
            let metrics = report.metrics.unwrap_or_default();
            println!(
                "  Crash: {}",
                report.crash_message.as_deref().unwrap_or("Unknown crash")
            );
            println!("  Total distance traveled: {}", metrics.total_distance);
            println!("  Successful flight iterations: {}", metrics.iterations);
            Ok(())
        }
        FlightState::EndedError => {
            anyhow::bail!(
                "flight ended with an error: {}",
                report.error.as_deref().unwrap_or("unknown")
            )
        }
        _ => Ok(()),
    }
}
