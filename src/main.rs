//! Local proxy - relay messages to the inference API with an on-disk cache
//!
//! Loads the configuration, sets up directories and logging, then dispatches
//! every message given on the command line and prints the responses as JSON.

use std::process::ExitCode;

use clap::Parser;
use futures::future::join_all;

use localproxy::cli::{Cli, StartupConfig};
use localproxy::config::{ProxyConfig, API_KEY_ENV};
use localproxy::dispatcher::RequestDispatcher;
use localproxy::logging;

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let startup = StartupConfig::from_cli(&cli)?;

    startup.paths.ensure()?;
    let _log_guard = logging::init(&startup.paths.log_dir, startup.verbose);

    let config = startup.apply(ProxyConfig::load_or_init(&startup.config_file)?.with_env_api_key());
    if config.api_key.is_empty() {
        tracing::error!(config = %startup.config_file.display(), "no API key configured");
        return Err(format!(
            "no API key configured: set api_settings.api_key in {} or {}",
            startup.config_file.display(),
            API_KEY_ENV
        )
        .into());
    }
    tracing::info!(?config, "proxy starting");

    let dispatcher = RequestDispatcher::from_config(&config, &startup.paths.cache_dir)?;

    let results = join_all(
        startup
            .messages
            .iter()
            .map(|message| dispatcher.dispatch(message)),
    )
    .await;

    let mut failed = false;
    for (message, result) in startup.messages.iter().zip(results) {
        match result {
            Ok(dispatched) => println!("{}", serde_json::to_string_pretty(&dispatched.body)?),
            Err(e) => {
                failed = true;
                eprintln!("error: {}: {}", message, e);
            }
        }
    }

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
