//! YouTrack MCP server launcher.

use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;
use youtrack_api::YouTrackClient;
use youtrack_core::config::ENV_MCP_LOG_LEVEL;
use youtrack_core::ServerConfig;
use youtrack_server::{http, McpServer, ToolHandler};

/// MCP transport selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Transport {
    /// Newline-delimited JSON-RPC over stdin/stdout
    Stdio,
    /// HTTP server with an SSE response channel
    Sse,
}

#[derive(Debug, Parser)]
#[command(name = "youtrack-mcp")]
#[command(version, about = "YouTrack MCP Server", long_about = None)]
struct Cli {
    /// Transport to serve MCP on
    #[arg(long, value_enum, default_value_t = Transport::Stdio)]
    transport: Transport,

    /// Port for the HTTP/SSE transport
    #[arg(long, env = "MCP_PORT", default_value_t = 8000)]
    port: u16,

    /// Bind address for the HTTP/SSE transport
    #[arg(long, env = "MCP_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Run in read-only mode (disables all write operations)
    #[arg(long)]
    read_only: bool,

    /// YouTrack URL (e.g. https://yourdomain.youtrack.cloud)
    #[arg(long, env = "YOUTRACK_URL")]
    youtrack_url: Option<String>,

    /// YouTrack API permanent token
    #[arg(long, env = "YOUTRACK_TOKEN", hide_env_values = true)]
    youtrack_token: Option<String>,
}

/// Assemble the server configuration: env first, CLI flags override.
fn build_config(cli: &Cli) -> ServerConfig {
    let mut config = ServerConfig::from_env();

    if let Some(url) = &cli.youtrack_url {
        config.youtrack_url = url.trim_end_matches('/').to_string();
    }
    if let Some(token) = &cli.youtrack_token {
        config.token = token.clone();
    }
    if cli.read_only {
        config.read_only = true;
    }
    if cli.verbose {
        config.log_level = "debug".to_string();
    }
    config.host = cli.host.clone();
    config.port = cli.port;

    config
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        let level = std::env::var(ENV_MCP_LOG_LEVEL)
            .map(|l| l.to_lowercase())
            .unwrap_or_else(|_| "info".to_string());
        EnvFilter::new(level)
    };

    // stdout carries the stdio transport; logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let config = Arc::new(build_config(&cli));

    tracing::info!(
        url = %config.display_url(),
        read_only = config.read_only,
        "Initializing YouTrack MCP Server"
    );

    let client = Arc::new(YouTrackClient::new(
        config.youtrack_url.as_str(),
        config.token.as_str(),
    ));
    let handler = Arc::new(ToolHandler::new(client, config.clone()));

    match cli.transport {
        Transport::Stdio => {
            let mut server = McpServer::new(handler, config);
            server.run_stdio().await?;
        }
        Transport::Sse => {
            http::serve(handler, config).await?;
        }
    }

    Ok(())
}
