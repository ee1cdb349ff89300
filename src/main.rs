//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `source_fetch` library that handles:
//! - Command-line argument parsing
//! - Environment variable loading (.env file)
//! - Logger initialization
//! - User-facing output formatting
//!
//! All core functionality is implemented in the library crate.

use std::io::Write;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;

use source_fetch::config::Cli;
use source_fetch::initialization::init_logger_with;
use source_fetch::user_agent::{StaticUserAgentProvider, UserAgentProvider};
use source_fetch::{init_orchestrator, FetchError, FetchRequest, FetchResult};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file (if it exists)
    // Try the current directory first, then the executable's directory
    if dotenvy::dotenv().is_err() {
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                let env_path = exe_dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                }
            }
        }
    }

    let cli = Cli::parse();

    init_logger_with(cli.log_level.clone().into(), cli.log_format.clone())
        .context("Failed to initialize logger")?;

    let config = cli.fetch_config();
    let user_agents = cli
        .user_agent
        .clone()
        .map(|ua| Arc::new(StaticUserAgentProvider(ua)) as Arc<dyn UserAgentProvider>);
    let orchestrator = init_orchestrator(config, user_agents, cli.slack_webhook.as_deref())
        .await
        .context("Failed to initialize fetch orchestrator")?;

    let mut request = FetchRequest::new(cli.url.clone()).with_timeout(Duration::from_secs(cli.timeout));
    if cli.no_redirects {
        request = request.without_redirects();
    }

    let outcome = orchestrator.fetch(&request).await;
    orchestrator.stats().log_summary();

    match outcome {
        Ok(result) => {
            print_result(&cli, &result)?;
            Ok(())
        }
        Err(e) => {
            if cli.json {
                println!("{}", error_json(&e));
            }
            eprintln!("source_fetch error: {:#}", anyhow::Error::from(e));
            process::exit(1);
        }
    }
}

fn print_result(cli: &Cli, result: &FetchResult) -> Result<()> {
    if cli.body {
        std::io::stdout()
            .write_all(&result.content)
            .context("Failed to write response body")?;
        return Ok(());
    }
    if cli.json {
        let summary = json!({
            "status": result.status_code,
            "url": result.url,
            "final_url": result.final_url,
            "content_type": result.content_type,
            "bytes": result.content.len(),
            "retrieved_at": result.retrieved_at.to_rfc3339(),
        });
        println!("{}", summary);
        return Ok(());
    }
    println!(
        "✅ {} {} ({}, {} bytes){}",
        result.status_code,
        result.final_url,
        result.content_type,
        result.content.len(),
        if result.was_redirected() {
            format!(" via {}", result.url)
        } else {
            String::new()
        }
    );
    Ok(())
}

fn error_json(error: &FetchError) -> serde_json::Value {
    match error {
        FetchError::Network { kind, url, .. } => json!({
            "error": "network",
            "kind": kind.as_str(),
            "url": url,
        }),
        FetchError::RateLimited { domain, retry_at } => json!({
            "error": "rate_limited",
            "domain": domain,
            "retry_at": retry_at.map(|at| at.to_rfc3339()),
        }),
        FetchError::Blocked {
            domain,
            url,
            retry_until,
            cause,
        } => json!({
            "error": "blocked",
            "domain": domain,
            "url": url,
            "cause": cause.to_string(),
            "retry_until": retry_until.map(|at| at.to_rfc3339()),
        }),
        FetchError::Storage(e) => json!({
            "error": "storage",
            "message": e.to_string(),
        }),
    }
}
