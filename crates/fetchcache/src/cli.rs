//! Command-line interface definition

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use crate::logging::{LogLevel, TracingConfig, TracingFormat};
use crate::proxy::ProxyError;
use clap::{Parser, Subcommand};
use fetchcache_cache::paths::CACHE_DIR_ENV;
use fetchcache_fetch::{FetchConfig, FetchError};
use miette::Diagnostic;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Exit codes for the CLI application
pub const EXIT_OK: i32 = 0;
/// CLI or configuration error exit code
pub const EXIT_CLI: i32 = 2;
/// Cache read/write failure exit code
pub const EXIT_CACHE: i32 = 3;
/// Origin could not be fetched
pub const EXIT_FETCH: i32 = 4;
/// Origin answered with a non-2xx status
pub const EXIT_UPSTREAM: i32 = 5;
/// The body could not be written to stdout or `--output`
pub const EXIT_OUTPUT: i32 = 6;

/// CLI-specific error types with proper exit code mapping
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// CLI or configuration error (exit code 2)
    #[error("CLI/configuration error: {message}")]
    #[diagnostic(code(fetchcache::cli::config))]
    Config {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },

    /// Cache or fetch failure
    #[error(transparent)]
    #[diagnostic(transparent)]
    Proxy(#[from] ProxyError),

    /// The origin answered, but not with success
    #[error("{url} responded with HTTP {status_code}; response was not cached")]
    #[diagnostic(code(fetchcache::cli::upstream))]
    Upstream {
        /// Requested URL
        url: String,
        /// Origin status code
        status_code: u16,
    },

    /// Writing output failed
    #[error("Failed to write output{}", path.as_ref().map_or(String::new(), |p| format!(" to {}", p.display())))]
    #[diagnostic(code(fetchcache::cli::output))]
    Output {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// Output file, if not stdout
        path: Option<PathBuf>,
    },
}

impl CliError {
    /// Create a new configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: None,
        }
    }

    /// Create a new configuration error with help text
    #[must_use]
    pub fn config_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: Some(help.into()),
        }
    }
}

impl From<fetchcache_cache::Error> for CliError {
    fn from(e: fetchcache_cache::Error) -> Self {
        Self::Proxy(ProxyError::Cache(e))
    }
}

impl From<FetchError> for CliError {
    fn from(e: FetchError) -> Self {
        Self::Proxy(ProxyError::Fetch(e))
    }
}

/// Map an error to the process exit code
#[must_use]
pub const fn exit_code_for(err: &CliError) -> i32 {
    match err {
        CliError::Config { .. } => EXIT_CLI,
        CliError::Proxy(ProxyError::Cache(_)) => EXIT_CACHE,
        CliError::Proxy(ProxyError::Fetch(_)) => EXIT_FETCH,
        CliError::Upstream { .. } => EXIT_UPSTREAM,
        CliError::Output { .. } => EXIT_OUTPUT,
    }
}

/// Caching fetch proxy with a persistent on-disk cache
#[derive(Parser, Debug)]
#[command(name = "fetchcache", version, about, long_about = None)]
pub struct Cli {
    /// Cache directory (created if missing)
    #[arg(long, global = true, env = CACHE_DIR_ENV)]
    pub cache_dir: Option<PathBuf>,

    /// Origin request timeout in seconds
    #[arg(long, global = true, default_value_t = 30, env = "FETCHCACHE_TIMEOUT_SECS")]
    pub timeout_secs: u64,

    /// Log level when RUST_LOG is unset
    #[arg(long, global = true, value_enum, default_value = "warn")]
    pub log_level: LogLevel,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value = "compact")]
    pub log_format: TracingFormat,

    /// Command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the body for a URL, fetching and caching it on a miss
    Get {
        /// http or https URL to retrieve
        url: String,

        /// Write the body to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List cached URLs and their sizes
    Contents {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    /// Tracing settings from the global flags
    #[must_use]
    pub fn tracing_config(&self) -> TracingConfig {
        TracingConfig {
            format: self.log_format,
            level: self.log_level.into(),
        }
    }

    /// Fetch settings from the global flags
    ///
    /// # Errors
    ///
    /// Returns error if the timeout is zero
    pub fn fetch_config(&self) -> Result<FetchConfig, CliError> {
        if self.timeout_secs == 0 {
            return Err(CliError::config_with_help(
                "--timeout-secs must be greater than zero",
                "The default is 30 seconds",
            ));
        }
        Ok(FetchConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            ..FetchConfig::default()
        })
    }
}

/// Parse command line arguments
#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}
