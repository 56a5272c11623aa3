/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 17/10/26
******************************************************************************/

//! Session configuration.
//!
//! This module provides configuration options for a session.

use forkey_core::types::{DEFAULT_PHASE_TIMEOUT, DEFAULT_PORT, Phase};
use std::time::Duration;

/// What to do when a read fails with something other than end of stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadErrorPolicy {
    /// Re-issue the read. The session fails once `max_consecutive` errors
    /// arrive without a successful read in between.
    Continue {
        /// Consecutive errors tolerated before failing.
        max_consecutive: u32,
    },
    /// Fail the session on the first read error.
    Fail,
}

impl Default for ReadErrorPolicy {
    fn default() -> Self {
        Self::Continue { max_consecutive: 3 }
    }
}

/// Configuration for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Service port the hostname is resolved against.
    pub port: u16,
    /// Timeout for hostname resolution.
    pub resolve_timeout: Duration,
    /// Timeout for the TCP connect.
    pub connect_timeout: Duration,
    /// Timeout for the TLS handshake.
    pub handshake_timeout: Duration,
    /// Capacity requested for each low-level read.
    pub read_buffer_size: usize,
    /// Longest inbound line accepted, excluding the terminator.
    pub max_line_length: usize,
    /// Handling of non-EOF read errors.
    pub read_error_policy: ReadErrorPolicy,
}

impl SessionConfig {
    /// Creates a configuration with the default port and timeouts.
    #[must_use]
    pub fn new() -> Self {
        Self {
            port: DEFAULT_PORT,
            resolve_timeout: DEFAULT_PHASE_TIMEOUT,
            connect_timeout: DEFAULT_PHASE_TIMEOUT,
            handshake_timeout: DEFAULT_PHASE_TIMEOUT,
            read_buffer_size: 4096,
            max_line_length: 64 * 1024,
            read_error_policy: ReadErrorPolicy::default(),
        }
    }

    /// Sets the service port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Applies one timeout to resolution, connect and handshake.
    #[must_use]
    pub const fn with_phase_timeout(mut self, timeout: Duration) -> Self {
        self.resolve_timeout = timeout;
        self.connect_timeout = timeout;
        self.handshake_timeout = timeout;
        self
    }

    /// Sets the handshake timeout.
    #[must_use]
    pub const fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Sets the read buffer size.
    #[must_use]
    pub const fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }

    /// Sets the maximum inbound line length.
    #[must_use]
    pub const fn with_max_line_length(mut self, size: usize) -> Self {
        self.max_line_length = size;
        self
    }

    /// Sets the read error policy.
    #[must_use]
    pub const fn with_read_error_policy(mut self, policy: ReadErrorPolicy) -> Self {
        self.read_error_policy = policy;
        self
    }

    /// Returns the timeout supervising `phase`, if it is supervised.
    #[must_use]
    pub const fn timeout_for(&self, phase: Phase) -> Option<Duration> {
        match phase {
            Phase::Resolving => Some(self.resolve_timeout),
            Phase::Connecting => Some(self.connect_timeout),
            Phase::Handshaking => Some(self.handshake_timeout),
            _ => None,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_config_defaults() {
        let config = SessionConfig::new();
        assert_eq!(config.port, 6667);
        assert_eq!(config.resolve_timeout, Duration::from_secs(10));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.handshake_timeout, Duration::from_secs(10));
        assert_eq!(
            config.read_error_policy,
            ReadErrorPolicy::Continue { max_consecutive: 3 }
        );
    }

    #[test]
    fn test_timeout_for_phase() {
        let config = SessionConfig::new()
            .with_phase_timeout(Duration::from_secs(5))
            .with_handshake_timeout(Duration::from_secs(20));
        assert_eq!(config.timeout_for(Phase::Resolving), Some(Duration::from_secs(5)));
        assert_eq!(config.timeout_for(Phase::Connecting), Some(Duration::from_secs(5)));
        assert_eq!(config.timeout_for(Phase::Handshaking), Some(Duration::from_secs(20)));
        assert_eq!(config.timeout_for(Phase::Connected), None);
        assert_eq!(config.timeout_for(Phase::Idle), None);
    }

    #[test]
    fn test_session_config_builders() {
        let config = SessionConfig::new()
            .with_port(6697)
            .with_read_buffer_size(512)
            .with_max_line_length(1024)
            .with_read_error_policy(ReadErrorPolicy::Fail);
        assert_eq!(config.port, 6697);
        assert_eq!(config.read_buffer_size, 512);
        assert_eq!(config.max_line_length, 1024);
        assert_eq!(config.read_error_policy, ReadErrorPolicy::Fail);
    }
}
