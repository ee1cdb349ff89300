//! Command-line options for the `source_fetch` binary.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::config::constants::DEFAULT_REQUEST_TIMEOUT_SECS;
use crate::config::types::{FetchConfig, LogFormat, LogLevel, StateBackend};

/// Fetch one URL through the allow-list, rate limiter and block detector.
#[derive(Debug, Clone, Parser)]
#[command(name = "source_fetch", version, about)]
pub struct Cli {
    /// URL to fetch
    pub url: String,

    /// Allowed domain (exact host match). Repeat or comma-separate for several.
    #[arg(
        long = "allow",
        value_name = "DOMAIN",
        env = "SOURCE_FETCH_ALLOWED_DOMAINS",
        value_delimiter = ','
    )]
    pub allowed_domains: Vec<String>,

    /// Rate limiter backing store
    #[arg(long, value_enum, default_value = "file", env = "SOURCE_FETCH_STATE_BACKEND")]
    pub state_backend: StateBackend,

    /// State directory (file backend) or SQLite database path (sqlite backend)
    #[arg(long, env = "SOURCE_FETCH_STATE_PATH")]
    pub state_path: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Fixed User-Agent (defaults to a random desktop browser string per attempt)
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Do not follow redirects
    #[arg(long)]
    pub no_redirects: bool,

    /// Slack webhook for block alerts
    #[arg(long, env = "SOURCE_FETCH_SLACK_WEBHOOK")]
    pub slack_webhook: Option<String>,

    /// Print the response body instead of a summary line
    #[arg(long, conflicts_with = "json")]
    pub body: bool,

    /// Print the summary as a JSON object
    #[arg(long)]
    pub json: bool,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Log format
    #[arg(long, value_enum, default_value = "plain")]
    pub log_format: LogFormat,
}

impl Cli {
    /// Builds the library configuration from the parsed options.
    pub fn fetch_config(&self) -> FetchConfig {
        let defaults = FetchConfig::default();
        let state_path = self.state_path.clone().unwrap_or_else(|| match self.state_backend {
            StateBackend::File => defaults.state_path.clone(),
            StateBackend::Sqlite => PathBuf::from(crate::config::DEFAULT_DB_PATH),
        });
        FetchConfig {
            allowed_domains: self
                .allowed_domains
                .iter()
                .map(|d| d.trim().to_ascii_lowercase())
                .filter(|d| !d.is_empty())
                .collect(),
            request_timeout: Duration::from_secs(self.timeout),
            state_backend: self.state_backend,
            state_path,
            ..defaults
        }
    }
}
