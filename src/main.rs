use tracing::info;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

use campaigns::config;
use campaigns::error::Error;

#[actix_web::main]
async fn main() -> Result<(), Error> {
    let (config_path, config_source) = config::resolve_config_path();
    let (config, config_found) = config::load_config(Some(config_path.as_str()))?;

    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::NEW)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::NEW)
            .compact()
            .init();
    }

    info!(
        source = config_source,
        path = %config_path,
        "resolved startup configuration path"
    );
    if !config_found {
        info!(path = %config_path, "config file not found, using defaults");
    }

    campaigns::run(config).await
}
