//! burrow-mcp: MCP server binary for one tenant's sandbox.
//!
//! # Identity
//!
//! The process acts for exactly one identity, given by `--identity` or
//! `BURROW_IDENTITY`. Whatever launches it (an SSH forced command, a
//! container exec, a supervisor that already authenticated the user) is
//! responsible for setting it. Tool payloads cannot change it.
//!
//! # Transport: stdio only
//!
//! ```bash
//! BURROW_IDENTITY=alice burrow-mcp --config /etc/burrow/config.toml
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use opentelemetry::KeyValue;
use opentelemetry::trace::TracerProvider;
use opentelemetry_sdk::Resource;
use rmcp::service::ServiceExt;
use rmcp::transport::io::stdio;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use burrow_mcp::server::{BurrowServerHandler, McpServerConfig};

#[derive(Debug, Parser)]
#[command(name = "burrow-mcp", version, about = "Serve a tenant's burrow sandbox over MCP (stdio)")]
struct Cli {
    /// Config file (default: $XDG_CONFIG_HOME/burrow/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verified identity to act for
    #[arg(long, env = "BURROW_IDENTITY")]
    identity: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // If OTEL_EXPORTER_OTLP_ENDPOINT is set, export spans via OTLP.
    let provider = if std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").is_ok() {
        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .build()
            .context("Failed to build OTLP exporter")?;
        let resource = Resource::builder()
            .with_attributes([
                KeyValue::new("service.name", "burrow-mcp"),
                KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
            ])
            .build();
        let provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
            .with_resource(resource)
            .with_batch_exporter(exporter)
            .build();
        opentelemetry::global::set_tracer_provider(provider.clone());
        Some(provider)
    } else {
        None
    };

    let otel_layer = provider
        .as_ref()
        .map(|p| tracing_opentelemetry::layer().with_tracer(p.tracer("burrow-mcp")));

    // stdout carries the protocol; logs go to stderr.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(otel_layer)
        .with(
            EnvFilter::from_default_env()
                .add_directive("burrow_mcp=info".parse()?)
                .add_directive("burrow_kernel=info".parse()?),
        )
        .init();

    tracing::info!("Starting burrow MCP server");

    let config = McpServerConfig::load(cli.config.as_deref(), cli.identity)
        .context("Failed to load configuration")?;

    tracing::info!(
        "Server config: name={}, version={}, identity={}",
        config.name,
        config.version,
        config.identity
    );

    let handler = BurrowServerHandler::from_config(config)
        .await
        .context("Failed to create server handler")?;

    tracing::info!("Serving on stdio");

    let service = handler
        .serve(stdio())
        .await
        .context("Failed to start MCP service")?;

    service.waiting().await?;

    tracing::info!("Server shutdown complete");

    if let Some(provider) = provider {
        // Shutdown errors are non-fatal at process exit.
        let _ = provider.shutdown();
    }

    Ok(())
}
