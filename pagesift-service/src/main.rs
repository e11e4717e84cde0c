use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod api;
mod config;
mod error;
mod keywords;
mod llm;
mod pdf;
mod selection;
mod service;
mod storage;

#[cfg(test)]
mod test_support;

use crate::config::{AppConfig, LogFormat, LoggingConfig};
use crate::service::PageFilterService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;

    init_logging(&config.logging);

    info!("Starting pagesift service v{}", env!("CARGO_PKG_VERSION"));
    info!(
        host = %config.server.host,
        port = config.server.port,
        model = %config.openai.model,
        storage = ?config.storage.backend,
        "Configuration loaded"
    );

    let addr = config.bind_address();
    let service = Arc::new(PageFilterService::from_config(config)?);

    let app = api::router(service);

    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn init_logging(logging: &LoggingConfig) {
    let filter = log_filter(
        std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref(),
        &logging.filter,
    );
    let registry = tracing_subscriber::registry().with(filter);

    match logging.format {
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_target(true).with_thread_ids(true))
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().flatten_event(true))
            .init(),
    }
}

/// `RUST_LOG` wins over the configured directives. Directives that fail to
/// parse fall through to the next source, ending at the built-in default.
fn log_filter(from_env: Option<&str>, configured: &str) -> EnvFilter {
    from_env
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_new(configured).ok())
        .unwrap_or_else(|| EnvFilter::new(LoggingConfig::default().filter))
}
