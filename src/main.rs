use anyhow::Result;
use roadwatch::config::{self, RoadwatchConfig};
use roadwatch::{agent, store};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roadwatch=info".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let mode = args.next().unwrap_or_else(|| "store".to_string());
    let config_path = args.next().unwrap_or_else(|| "roadwatch.toml".to_string());

    let config = if std::path::Path::new(&config_path).exists() {
        config::load_config(&config_path)?
    } else {
        info!(path = %config_path, "no config file; using defaults");
        RoadwatchConfig::default()
    };

    match mode.as_str() {
        "store" => store::run(&config.store).await,
        "agent" => agent::run(&config.agent).await,
        other => anyhow::bail!("unknown mode '{}' (expected 'store' or 'agent')", other),
    }
}
