//! # zpipe-demo — Binary Entry Point
//!
//! Serves the demo users API, or prints its OpenAPI document.
//! Binds to a configurable port (default 8080).

use clap::Parser;
use zpipe_api::{demo, ApiConfig};

/// Demo users API with schema-validated requests and responses.
#[derive(Debug, Parser)]
#[command(name = "zpipe-demo", version, about)]
struct Args {
    /// Port to listen on. Overrides `PORT`.
    #[arg(long)]
    port: Option<u16>,

    /// Print the OpenAPI document as JSON and exit.
    #[arg(long)]
    print_openapi: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize structured tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = ApiConfig::from_env()?;
    if let Some(port) = args.port {
        config.port = port;
    }

    let api = demo::demo_api(config.clone())?;

    if args.print_openapi {
        println!("{}", serde_json::to_string_pretty(&api.openapi())?);
        return Ok(());
    }

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("serving {config}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, api.into_router()).await?;

    Ok(())
}
