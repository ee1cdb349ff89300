//! Logger initialization.
//!
//! This module provides functions to initialize the logger with custom formatting.
//! Every formatted message passes through `redact_secrets` before it is written.

use std::borrow::Cow;
use std::io::Write;

use colored::*;
use log::LevelFilter;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::LogFormat;
use crate::error_handling::InitializationError;

/// Embedded HTML documents longer than this are cut from log lines.
const MAX_LOGGED_HTML_BYTES: usize = 1024;

static SENSITIVE_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(authorization|proxy-authorization|cookie|set-cookie|x-api-key|x-auth-token)(\s*[:=]\s*)[^\r\n,;]+",
    )
    .expect("Invalid header regex")
});

static API_KEY_ASSIGNMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(api[_-]?key|apikey|secret|token)(["']?\s*[:=]\s*["']?)[A-Za-z0-9_\-]{20,}"#)
        .expect("Invalid api key regex")
});

static BEARER_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bbearer\s+[A-Za-z0-9\-._~+/]+=*")
        .expect("Invalid bearer regex")
});

static SESSION_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(session[_-]?id|sessid|sid)(["']?\s*[:=]\s*["']?)[A-Za-z0-9]{16,}"#)
        .expect("Invalid session regex")
});

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}\b")
        .expect("Invalid email regex")
});

static CARD_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b\d{4}[ \-]?\d{4}[ \-]?\d{4}[ \-]?\d{4}\b")
        .expect("Invalid card regex")
});

static HTML_DOCUMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)(<!doctype html|<html).*")
        .expect("Invalid html regex")
});

/// Masks credentials and personal data in a log message.
///
/// # Examples
///
/// ```
/// use source_fetch::initialization::redact_secrets;
///
/// assert_eq!(
///     redact_secrets("Authorization: Bearer abc.def"),
///     "Authorization: [REDACTED]"
/// );
/// assert_eq!(redact_secrets("contact ops@example.com"), "contact [EMAIL]");
/// ```
pub fn redact_secrets(message: &str) -> Cow<'_, str> {
    let mut out = Cow::Borrowed(message);
    out = replace(out, &SENSITIVE_HEADER, "${1}${2}[REDACTED]");
    out = replace(out, &API_KEY_ASSIGNMENT, "${1}${2}[REDACTED]");
    out = replace(out, &SESSION_ID, "${1}${2}[REDACTED]");
    out = replace(out, &BEARER_TOKEN, "Bearer [REDACTED]");
    out = replace(out, &EMAIL, "[EMAIL]");
    out = replace(out, &CARD_NUMBER, "[CARD]");
    truncate_html(out)
}

fn replace<'a>(text: Cow<'a, str>, pattern: &Regex, replacement: &str) -> Cow<'a, str> {
    if !pattern.is_match(&text) {
        return text;
    }
    Cow::Owned(pattern.replace_all(&text, replacement).into_owned())
}

fn truncate_html(text: Cow<'_, str>) -> Cow<'_, str> {
    let Some(found) = HTML_DOCUMENT.find(&text) else {
        return text;
    };
    let (start, html_len) = (found.start(), found.end() - found.start());
    if html_len <= MAX_LOGGED_HTML_BYTES {
        return text;
    }
    Cow::Owned(format!(
        "{}[HTML TRUNCATED: {} bytes]",
        &text[..start],
        html_len
    ))
}

/// Initializes the logger with the specified level and format.
///
/// Configures `env_logger` with custom formatting. Supports both plain text
/// (with colors) and JSON formats for structured logging.
///
/// The logger reads from the `RUST_LOG` environment variable by default, but
/// the provided `level` parameter overrides it for this crate.
///
/// # Errors
///
/// Returns `InitializationError::LoggerError` if a logger is already installed.
///
/// # Examples
///
/// ```bash
/// # Per-module filtering via RUST_LOG
/// RUST_LOG=source_fetch=debug,reqwest=info source_fetch https://finance.yahoo.com/ --allow finance.yahoo.com
/// ```
pub fn init_logger_with(level: LevelFilter, format: LogFormat) -> Result<(), InitializationError> {
    let mut builder = env_logger::Builder::from_default_env();

    builder.filter_level(level);
    builder.filter_module("sqlx", LevelFilter::Warn);
    builder.filter_module("reqwest", LevelFilter::Info);
    builder.filter_module("hyper", LevelFilter::Info);
    builder.filter_module("hyper_util", LevelFilter::Info);
    builder.filter_module("rustls", LevelFilter::Warn);
    builder.filter_module("source_fetch", level);

    match format {
        LogFormat::Json => {
            builder.format(|buf, record| {
                let message = record.args().to_string();
                writeln!(
                    buf,
                    "{{\"ts\":{},\"level\":\"{}\",\"target\":\"{}\",\"msg\":{}}}",
                    chrono::Utc::now().timestamp_millis(),
                    record.level(),
                    record.target(),
                    serde_json::to_string(redact_secrets(&message).as_ref())
                        .unwrap_or_else(|_| "\"\"".into())
                )
            });
        }
        LogFormat::Plain => {
            builder.format(|buf, record| {
                let level = record.level();
                let colored_level = match level {
                    log::Level::Error => level.to_string().red(),
                    log::Level::Warn => level.to_string().yellow(),
                    log::Level::Info => level.to_string().green(),
                    log::Level::Debug => level.to_string().blue(),
                    log::Level::Trace => level.to_string().purple(),
                };
                let message = record.args().to_string();

                writeln!(
                    buf,
                    "{} {} [{}] {}",
                    chrono::Utc::now().format("%H:%M:%S%.3f").to_string().dimmed(),
                    record.target().cyan(),
                    colored_level,
                    redact_secrets(&message)
                )
            });
        }
    }

    // try_init so a second call (tests) reports an error instead of panicking
    builder.try_init().map_err(InitializationError::from)?;

    Ok(())
}
