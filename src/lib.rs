pub mod api;
pub mod app;
pub mod config;
pub mod console;
pub mod controller;
pub mod forms;
pub mod models;
pub mod operations;

use std::sync::Arc;

use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

use api::{ApiError, BackendApi, HttpBackend, MockBackend};
use app::App;
use config::ClientConfig;

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Console(#[from] console::ConsoleError),
}

/// Install the global subscriber. `RUST_LOG` wins over `filter`, which
/// wins over the built-in default. Logs go to stderr so they do not
/// interleave with the console on stdout.
pub fn init_tracing(filter: Option<&str>) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(filter.unwrap_or(config::default_log_filter()))
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Start the interactive client against `config`, or against an
/// in-memory backend when `offline` is set.
pub async fn run(config: ClientConfig, offline: bool) -> Result<(), RunError> {
    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let backend: Arc<dyn BackendApi> = if offline {
        tracing::info!("Offline mode: using in-memory backend");
        Arc::new(MockBackend::new())
    } else {
        let http = HttpBackend::new(&config)?;
        tracing::info!(backend = %http.base_url(), "Using backend");
        Arc::new(http)
    };
    let app = Arc::new(App::new(backend));

    match app.health().await {
        Ok(status) if status.is_healthy() => tracing::info!("Backend is healthy"),
        Ok(status) => tracing::warn!(status = %status.status, "Backend reports unhealthy"),
        Err(err) => tracing::warn!(error = %err, "Backend health check failed"),
    }

    if let Err(err) = app.load_patients().await {
        tracing::warn!(error = %err, "Startup patient fetch refused");
    }

    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    console::run(app, stdin, &mut stdout).await?;

    tracing::info!("{} stopped", config::APP_NAME);
    Ok(())
}
