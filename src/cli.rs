//! Command-line interface parsing for the local proxy
//!
//! This module handles parsing of CLI arguments using clap and resolves them
//! into the directories and overrides the proxy starts with.

use clap::Parser;
use std::path::PathBuf;
use thiserror::Error;

use crate::config::{AppPaths, ProxyConfig};

/// Error types for CLI argument handling
#[derive(Debug, Error)]
pub enum CliError {
    /// A message argument was empty or whitespace
    #[error("Invalid message: messages must contain non-whitespace text")]
    EmptyMessage,

    /// No `--home` was given and the platform has no home directory
    #[error("Could not determine a home directory; pass --home <DIR>")]
    NoHomeDirectory,
}

/// Local proxy - forward messages to the inference API with an on-disk cache
#[derive(Parser, Debug)]
#[command(name = "localproxy")]
#[command(about = "Send messages to the inference API, reusing cached responses")]
#[command(version)]
pub struct Cli {
    /// Messages to send; each is dispatched as its own single-turn request
    ///
    /// Examples:
    ///   localproxy "Summarize this paragraph..."
    ///   localproxy --no-cache "ping" "pong"
    #[arg(required = true, value_name = "MESSAGE", value_parser = parse_message_arg)]
    pub messages: Vec<String>,

    /// Configuration file (default: <config dir>/proxy_config.json)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Keep config, cache and logs under this directory instead of the platform defaults
    #[arg(long, value_name = "DIR")]
    pub home: Option<PathBuf>,

    /// Skip the cache for this run, even if enabled in the configuration
    #[arg(long)]
    pub no_cache: bool,

    /// Also log to stderr, at debug level
    #[arg(short, long)]
    pub verbose: bool,
}

/// Settings derived from CLI arguments for application startup
#[derive(Debug, Clone)]
pub struct StartupConfig {
    /// Directories for config, cache and logs
    pub paths: AppPaths,
    /// Configuration file to load or initialize
    pub config_file: PathBuf,
    /// Whether to disable caching regardless of the file setting
    pub no_cache: bool,
    /// Whether to mirror logs to stderr
    pub verbose: bool,
    /// Messages to dispatch, in argument order
    pub messages: Vec<String>,
}

/// Validates a message argument.
///
/// # Returns
/// * `Ok(String)` if the message has visible text
/// * `Err(CliError::EmptyMessage)` otherwise
pub fn parse_message_arg(s: &str) -> Result<String, CliError> {
    if s.trim().is_empty() {
        return Err(CliError::EmptyMessage);
    }
    Ok(s.to_string())
}

impl StartupConfig {
    /// Creates a StartupConfig from parsed CLI arguments.
    ///
    /// # Returns
    /// * `Ok(StartupConfig)` with resolved directories
    /// * `Err(CliError::NoHomeDirectory)` if no directory layout can be determined
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let paths = match &cli.home {
            Some(home) => AppPaths::under(home),
            None => AppPaths::from_project_dirs().ok_or(CliError::NoHomeDirectory)?,
        };
        let config_file = cli.config.clone().unwrap_or_else(|| paths.config_file());

        Ok(StartupConfig {
            paths,
            config_file,
            no_cache: cli.no_cache,
            verbose: cli.verbose,
            messages: cli.messages.clone(),
        })
    }

    /// Applies command-line overrides to a loaded configuration
    pub fn apply(&self, mut config: ProxyConfig) -> ProxyConfig {
        if self.no_cache {
            config.cache_enabled = false;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_parse_message_arg_accepts_text() {
        assert_eq!(parse_message_arg("hello").unwrap(), "hello");
        assert_eq!(parse_message_arg("  padded  ").unwrap(), "  padded  ");
    }

    #[test]
    fn test_parse_message_arg_rejects_blank() {
        let result = parse_message_arg("   ");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid message"));
    }

    #[test]
    fn test_cli_parse_messages_in_order() {
        let cli = Cli::parse_from(["localproxy", "first", "second"]);
        assert_eq!(cli.messages, vec!["first", "second"]);
        assert!(!cli.no_cache);
        assert!(!cli.verbose);
    }

    #[test]
    fn test_cli_requires_a_message() {
        assert!(Cli::try_parse_from(["localproxy"]).is_err());
    }

    #[test]
    fn test_cli_rejects_blank_message() {
        assert!(Cli::try_parse_from(["localproxy", " "]).is_err());
    }

    #[test]
    fn test_cli_parse_flags() {
        let cli = Cli::parse_from(["localproxy", "--no-cache", "-v", "ping"]);
        assert!(cli.no_cache);
        assert!(cli.verbose);
    }

    #[test]
    fn test_startup_config_with_home() {
        let cli = Cli::parse_from(["localproxy", "--home", "/tmp/lp", "ping"]);
        let config = StartupConfig::from_cli(&cli).unwrap();

        assert_eq!(config.paths.cache_dir, Path::new("/tmp/lp/cache"));
        assert_eq!(config.paths.log_dir, Path::new("/tmp/lp/logs"));
        assert_eq!(
            config.config_file,
            Path::new("/tmp/lp/config/proxy_config.json")
        );
        assert_eq!(config.messages, vec!["ping"]);
    }

    #[test]
    fn test_startup_config_explicit_config_file_wins() {
        let cli = Cli::parse_from([
            "localproxy",
            "--home",
            "/tmp/lp",
            "--config",
            "/etc/lp.json",
            "ping",
        ]);
        let config = StartupConfig::from_cli(&cli).unwrap();

        assert_eq!(config.config_file, Path::new("/etc/lp.json"));
        assert_eq!(config.paths.cache_dir, Path::new("/tmp/lp/cache"));
    }

    #[test]
    fn test_apply_no_cache_override() {
        let cli = Cli::parse_from(["localproxy", "--home", "/tmp/lp", "--no-cache", "ping"]);
        let startup = StartupConfig::from_cli(&cli).unwrap();

        let config = startup.apply(ProxyConfig::default());

        assert!(!config.cache_enabled);
    }

    #[test]
    fn test_apply_without_override_keeps_file_setting() {
        let cli = Cli::parse_from(["localproxy", "--home", "/tmp/lp", "ping"]);
        let startup = StartupConfig::from_cli(&cli).unwrap();

        let config = startup.apply(ProxyConfig::default());

        assert!(config.cache_enabled);
    }
}
