//! Tracing setup.
//!
//! The terminal belongs to the UI, so logs go to
//! `<log_dir>/factscroll.log` through a non-blocking file writer.  The
//! level comes from `FACTSCROLL_LOG` when set (full `EnvFilter` syntax),
//! otherwise from `config.log_level`.

use std::fs;

use anyhow::{anyhow, Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

const LOG_FILE: &str = "factscroll.log";
const LOG_ENV: &str = "FACTSCROLL_LOG";

/// Install the global subscriber.
///
/// Keep the returned guard alive for the whole run; dropping it flushes and
/// stops the writer thread.
pub fn init(config: &Config) -> Result<WorkerGuard> {
    let dir = config.log_dir();
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let appender = tracing_appender::rolling::never(&dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(filter(config))
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow!("Failed to install tracing subscriber: {e}"))?;

    tracing::info!(dir = %dir.display(), "logging initialised");
    Ok(guard)
}

fn filter(config: &Config) -> EnvFilter {
    filter_from(std::env::var(LOG_ENV).ok().as_deref(), &config.log_level)
}

/// `directives` wins when it parses; otherwise `level` applies.
fn filter_from(directives: Option<&str>, level: &str) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(level))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_configured_level() {
        let config = Config {
            log_level: "debug".into(),
            ..Config::default()
        };
        assert_eq!(filter_from(None, &config.log_level).to_string(), "debug");
    }

    #[test]
    fn env_directives_override_configured_level() {
        assert_eq!(filter_from(Some("warn"), "debug").to_string(), "warn");
    }
}
