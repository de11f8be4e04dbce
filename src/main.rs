use std::process::ExitCode;

use clap::Parser;
use medidiag_lib::config::ClientConfig;

#[derive(Parser)]
#[command(name = "medidiag")]
#[command(version, about = "Terminal client for the MediDiag AI diagnosis service")]
struct Cli {
    /// Backend origin, e.g. http://localhost:8001 (overrides MEDIDIAG_BACKEND_URL)
    #[arg(long)]
    backend_url: Option<String>,
    /// Log filter used when RUST_LOG is unset
    #[arg(long)]
    log_filter: Option<String>,
    /// Use an in-memory backend instead of the network
    #[arg(long)]
    offline: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    medidiag_lib::init_tracing(cli.log_filter.as_deref());

    let mut config = ClientConfig::from_env();
    if let Some(url) = cli.backend_url {
        config = config.with_backend_url(&url);
    }

    match medidiag_lib::run(config, cli.offline).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "Exiting");
            eprintln!("medidiag: {err}");
            ExitCode::FAILURE
        }
    }
}
