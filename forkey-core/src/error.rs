/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 17/10/26
******************************************************************************/

//! Error types for the Forkey engine.
//!
//! This module provides a unified error hierarchy using `thiserror` for typed,
//! domain-specific errors across the session, configuration and fetch layers.

use crate::types::Phase;
use std::fmt;
use thiserror::Error;

/// Result type alias using [`ForkeyError`] as the error type.
pub type Result<T> = std::result::Result<T, ForkeyError>;

/// Top-level error type for Forkey operations.
#[derive(Debug, Error)]
pub enum ForkeyError {
    /// Terminal session failure.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// Invalid or unreadable configuration.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Background fetch failure.
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// I/O error from the underlying transport.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Flat classification of a [`SessionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Hostname lookup failed.
    ResolutionFailure,
    /// TCP connect failed on every endpoint.
    ConnectFailure,
    /// TLS handshake failed.
    HandshakeFailure,
    /// A supervised phase did not complete in time.
    Timeout,
    /// The peer closed the stream.
    StreamClosed,
    /// A read failed for a reason other than end of stream.
    ReadFailure,
    /// A write failed.
    WriteFailure,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ResolutionFailure => "resolution failure",
            Self::ConnectFailure => "connect failure",
            Self::HandshakeFailure => "handshake failure",
            Self::Timeout => "timeout",
            Self::StreamClosed => "stream closed",
            Self::ReadFailure => "read failure",
            Self::WriteFailure => "write failure",
        };
        f.write_str(name)
    }
}

/// Terminal errors of a session.
///
/// A session delivers at most one of these over its lifetime. I/O causes are
/// captured as text so the error can be cloned to both the handler and the caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Hostname lookup failed or produced no endpoints.
    #[error("failed to resolve {host}: {reason}")]
    ResolutionFailure {
        /// Host that was looked up.
        host: String,
        /// Resolver error text.
        reason: String,
    },

    /// TCP connect failed.
    #[error("connect failed: {0}")]
    ConnectFailure(String),

    /// TLS handshake failed.
    #[error("tls handshake failed: {0}")]
    HandshakeFailure(String),

    /// A supervised phase expired.
    #[error("{phase} timed out after {after_ms} milliseconds")]
    Timeout {
        /// Phase that was being supervised.
        phase: Phase,
        /// Configured timeout in milliseconds.
        after_ms: u64,
    },

    /// End of stream while connected.
    #[error("stream closed by peer")]
    StreamClosed,

    /// Read error other than end of stream.
    #[error("read failed: {0}")]
    ReadFailure(String),

    /// Write error; queued writes were dropped.
    #[error("write failed: {0}")]
    WriteFailure(String),
}

impl SessionError {
    /// Returns the flat kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::ResolutionFailure { .. } => ErrorKind::ResolutionFailure,
            Self::ConnectFailure(_) => ErrorKind::ConnectFailure,
            Self::HandshakeFailure(_) => ErrorKind::HandshakeFailure,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::StreamClosed => ErrorKind::StreamClosed,
            Self::ReadFailure(_) => ErrorKind::ReadFailure,
            Self::WriteFailure(_) => ErrorKind::WriteFailure,
        }
    }
}

/// Errors loading bot configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("unable to read {path}: {reason}")]
    Read {
        /// Path that was opened.
        path: String,
        /// Underlying I/O error text.
        reason: String,
    },

    /// The config file is not valid JSON or misses required keys.
    #[error("failed to parse config: {0}")]
    Parse(String),

    /// A value is present but unusable.
    #[error("invalid value for {key}: {reason}")]
    Invalid {
        /// Dotted key path of the value.
        key: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Errors performing a background fetch.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The request could not be built or sent.
    #[error("request failed: {0}")]
    Request(String),

    /// The server answered with a non-success status.
    #[error("unexpected http status {0}")]
    Status(u16),

    /// The response body did not have the expected shape.
    #[error("unexpected response: {0}")]
    Parse(String),

    /// The worker thread is no longer accepting requests.
    #[error("fetch worker stopped")]
    WorkerStopped,
}
