//! Error type definitions for the EPG combiner
//!
//! This module defines all error types used throughout the application,
//! providing a hierarchical error system that makes debugging and error
//! handling more straightforward.

use thiserror::Error;

/// Top-level application error type
///
/// This enum represents all possible errors that can occur in the application.
/// It uses `thiserror` to provide automatic error trait implementations and
/// proper error chaining.
#[derive(Error, Debug)]
pub enum AppError {
    /// Per-source fetch/parse errors
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Output file write errors
    #[error("Write error: {path} - {message}")]
    Write { path: String, message: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Per-source errors
///
/// These never abort the run on their own; the merge layer converts them into
/// skipped-source entries and only the caller decides whether zero surviving
/// sources is fatal.
#[derive(Error, Debug)]
pub enum SourceError {
    /// Network connection timeouts
    #[error("Connection timeout: {url}")]
    Timeout { url: String },

    /// Host unreachable or transport-level failure
    #[error("Source unavailable: {url} - {message}")]
    Unavailable { url: String, message: String },

    /// Non-success HTTP status from the remote host
    #[error("HTTP error: {status} - {url}")]
    Http { status: u16, url: String },

    /// Malformed XMLTV payload
    #[error("Parse error: {source_name} - {message}")]
    Parse { source_name: String, message: String },
}

/// Convenience methods for creating common error types
impl AppError {
    /// Create a write error for the output path
    pub fn write<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::Write {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl SourceError {
    /// Create a timeout error
    pub fn timeout<U: Into<String>>(url: U) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Create an unavailable error
    pub fn unavailable<U: Into<String>, M: Into<String>>(url: U, message: M) -> Self {
        Self::Unavailable {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http<U: Into<String>>(status: u16, url: U) -> Self {
        Self::Http {
            status,
            url: url.into(),
        }
    }

    /// Create a parse error
    pub fn parse<S: Into<String>, M: Into<String>>(source_name: S, message: M) -> Self {
        Self::Parse {
            source_name: source_name.into(),
            message: message.into(),
        }
    }
}
