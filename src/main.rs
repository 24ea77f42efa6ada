use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use ibmi_gateway::config::AppConfig;
use ibmi_gateway::remote::RemoteDriver;
use ibmi_gateway::{app, AppState};

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8020;

#[derive(Parser)]
#[command(name = "ibmi-gateway")]
#[command(about = "HTTP gateway for browsing and extracting IBM i tables")]
#[command(version)]
struct Args {
    #[arg(long, help = "Address to bind (default 127.0.0.1)")]
    host: Option<String>,

    #[arg(long, help = "Port to listen on (default $PORT or 8020)")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so local runs pick up JWT_SECRET, IBMI_ODBC_DRIVER, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")),
        )
        .init();

    let args = Args::parse();

    let config = AppConfig::from_env().context("invalid configuration")?;
    tracing::info!("Starting IBM i gateway in {:?} mode", config.environment);
    if config.catalog.allowed_libraries.is_empty() {
        tracing::info!("No ALLOW_LIBS configured, catalog listings are unrestricted");
    }

    let driver = remote_driver(&config)?;
    let state = AppState::new(config, driver).context("failed to build webhook client")?;

    let port = match args.port {
        Some(port) => port,
        None => match std::env::var("PORT") {
            Ok(raw) => raw.parse::<u16>().with_context(|| format!("PORT is not a port number: {}", raw))?,
            Err(_) => DEFAULT_PORT,
        },
    };
    let host = args.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
    let bind_addr = format!("{}:{}", host, port);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("IBM i gateway listening on http://{}", bind_addr);

    axum::serve(listener, app(state)).await.context("server error")?;
    Ok(())
}

#[cfg(feature = "odbc")]
fn remote_driver(config: &AppConfig) -> anyhow::Result<Arc<dyn RemoteDriver>> {
    let driver = ibmi_gateway::remote::odbc::OdbcDriver::new(config.remote.driver.clone())
        .context("failed to initialise the ODBC driver manager")?;
    Ok(Arc::new(driver))
}

#[cfg(not(feature = "odbc"))]
fn remote_driver(config: &AppConfig) -> anyhow::Result<Arc<dyn RemoteDriver>> {
    anyhow::bail!(
        "built without a remote driver (IBMI_ODBC_DRIVER={}); rebuild with the `odbc` feature",
        config.remote.driver
    )
}
