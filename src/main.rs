use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use modelgate::config::{Config, Credentials};
use modelgate::llm::ProviderRegistry;
use modelgate::server::{AppState, build_app};

#[derive(Parser)]
#[command(
    name = "modelgate",
    version,
    about = "HTTP gateway routing chat requests to hosted LLM providers"
)]
struct Cli {
    /// Path to the YAML config file
    #[arg(long, default_value = "modelgate.yaml")]
    config: std::path::PathBuf,

    /// Override the configured listen host
    #[arg(long)]
    host: Option<String>,

    /// Override the configured listen port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)
        .await
        .context("failed to load config")?;
    let credentials = Credentials::from_env().context("failed to load provider credentials")?;

    let state = AppState {
        providers: ProviderRegistry::from_credentials(credentials),
        idle_timeout_seconds: config.server.idle_timeout_seconds,
        keep_alive_interval_seconds: config.server.keep_alive_interval_seconds,
    };
    let app = build_app(state, config.server.request_timeout_seconds);

    let host = cli.host.unwrap_or(config.server.host);
    let port = cli.port.unwrap_or(config.server.port);
    let addr = format!("{host}:{port}");
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "modelgate listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_listen_overrides() {
        let cli =
            Cli::try_parse_from(["modelgate", "--host", "127.0.0.1", "--port", "3000"]).unwrap();
        assert_eq!(cli.host.as_deref(), Some("127.0.0.1"));
        assert_eq!(cli.port, Some(3000));
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["modelgate"]).unwrap();
        assert!(cli.host.is_none());
        assert!(cli.port.is_none());
        assert_eq!(cli.config, std::path::PathBuf::from("modelgate.yaml"));
    }
}
