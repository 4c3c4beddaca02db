//! Error types for outbound fetches

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use miette::Diagnostic;
use std::time::Duration;
use thiserror::Error;

/// Why a fetch produced no response
#[derive(Error, Debug, Diagnostic)]
pub enum FetchError {
    /// The URL could not be parsed
    #[error("Invalid URL `{url}`: {message}")]
    #[diagnostic(code(fetchcache::fetch::invalid_url))]
    InvalidUrl {
        /// The rejected input
        url: String,
        /// Parser message
        message: String,
    },

    /// The URL uses a scheme other than http or https
    #[error("Unsupported URL scheme `{scheme}` in {url}")]
    #[diagnostic(
        code(fetchcache::fetch::unsupported_scheme),
        help("Only http and https URLs can be fetched")
    )]
    UnsupportedScheme {
        /// The rejected input
        url: String,
        /// Its scheme
        scheme: String,
    },

    /// The origin did not answer within the configured timeout
    #[error("Request to {url} timed out after {timeout:?}")]
    #[diagnostic(code(fetchcache::fetch::timeout))]
    Timeout {
        /// Target URL
        url: String,
        /// Configured timeout
        timeout: Duration,
    },

    /// Connection or DNS failure
    #[error("Could not reach {url}: {message}")]
    #[diagnostic(
        code(fetchcache::fetch::network),
        help("Check the host name and your network connection")
    )]
    Network {
        /// Target URL
        url: String,
        /// Underlying error
        message: String,
    },

    /// Any other request or response failure
    #[error("Request to {url} failed: {message}")]
    #[diagnostic(code(fetchcache::fetch::protocol))]
    Protocol {
        /// Target URL
        url: String,
        /// Underlying error
        message: String,
    },
}

impl FetchError {
    /// Create an invalid URL error
    #[must_use]
    pub fn invalid_url(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a protocol error
    #[must_use]
    pub fn protocol(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Protocol {
            url: url.into(),
            message: message.into(),
        }
    }
}

/// Result type for fetch operations
pub type Result<T> = std::result::Result<T, FetchError>;
