use std::net::Ipv4Addr;
use std::str::FromStr;
use std::sync::Arc;

use clap::{App, Arg};
use i1_telemetry::config::ServerConfig;
use i1_telemetry::store::{StoreConfig, TelemetryStore};
use i1_telemetry::ServerManager;
use tracing::{error, info};

const DEFAULT_HOST: &str = "0.0.0.0";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let matches = App::new("i1-server")
        .version("0.1.0")
        .author("Grid Telemetry Team")
        .about("I1 protocol TCP ingestion server for power-line monitoring nodes")
        .arg(
            Arg::with_name("host")
                .short("h")
                .long("host")
                .value_name("HOST")
                .help("Listen address")
                .takes_value(true)
                .default_value(DEFAULT_HOST),
        )
        .arg(
            Arg::with_name("port")
                .short("p")
                .long("port")
                .value_name("PORT")
                .help("Listen port")
                .takes_value(true)
                .default_value("9100"),
        )
        .arg(
            Arg::with_name("max-records")
                .long("max-records")
                .value_name("COUNT")
                .help("Weather ring capacity")
                .takes_value(true)
                .default_value("288"),
        )
        .arg(
            Arg::with_name("line-temp-alert-threshold")
                .long("line-temp-alert-threshold")
                .value_name("CELSIUS")
                .help("Conductor temperature that triggers an alert")
                .takes_value(true)
                .default_value("80.0"),
        )
        .arg(
            Arg::with_name("line-temp-alert-timeout")
                .long("line-temp-alert-timeout")
                .value_name("SECONDS")
                .help("Max age of an alert still considered active for fusion")
                .takes_value(true)
                .default_value("600"),
        )
        .get_matches();

    let host = Ipv4Addr::from_str(matches.value_of("host").unwrap_or(DEFAULT_HOST))?;
    let port: u16 = matches.value_of("port").unwrap_or("9100").parse()?;
    let max_records: usize = matches.value_of("max-records").unwrap_or("288").parse()?;
    let line_temp_alert_threshold: f32 =
        matches.value_of("line-temp-alert-threshold").unwrap_or("80.0").parse()?;
    let line_temp_alert_timeout: u32 =
        matches.value_of("line-temp-alert-timeout").unwrap_or("600").parse()?;

    let config = ServerConfig {
        listen_host: host,
        listen_port: port,
        max_records,
        line_temp_alert_threshold,
        line_temp_alert_timeout,
        ..ServerConfig::default()
    };

    let store = Arc::new(TelemetryStore::new(StoreConfig {
        max_records: config.max_records,
        alert_threshold_c: config.line_temp_alert_threshold,
        alert_timeout_seconds: config.line_temp_alert_timeout,
    }));

    let manager = ServerManager::new();
    if let Err(err) = manager.start(config, Arc::clone(&store)).await {
        error!("failed to start I1 TCP server: {}", err);
        return Err(Box::new(err));
    }

    info!("I1 telemetry server running; press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    manager.stop().await;

    Ok(())
}
