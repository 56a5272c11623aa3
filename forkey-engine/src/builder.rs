/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 17/10/26
******************************************************************************/

//! Engine builder for fluent configuration.
//!
//! This module provides a builder API for assembling a TLS session reactor.

use crate::config::BotConfig;
use forkey_session::config::{ReadErrorPolicy, SessionConfig};
use forkey_session::reactor::Reactor;
use forkey_transport::resolve::DnsResolver;
use forkey_transport::tls::{TlsError, TlsPolicy};
use forkey_transport::transport::TlsTransport;
use std::time::Duration;

/// Reactor over DNS resolution and a rustls transport.
pub type TlsReactor = Reactor<DnsResolver, TlsTransport>;

/// Builder for configuring a session engine.
#[derive(Debug, Clone, Default)]
pub struct EngineBuilder {
    /// Session settings.
    session: SessionConfig,
    /// Certificate validation policy.
    tls: TlsPolicy,
    /// Host to connect to once running.
    host: Option<String>,
}

impl EngineBuilder {
    /// Creates a new engine builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder from a bot config file.
    #[must_use]
    pub fn from_config(config: &BotConfig) -> Self {
        Self {
            session: config.session_config(),
            tls: config.tls_policy(),
            host: Some(config.irc.server.clone()),
        }
    }

    /// Sets the host to connect to.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets the server port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.session.port = port;
        self
    }

    /// Applies one timeout to resolution, connect and handshake.
    #[must_use]
    pub fn with_phase_timeout(mut self, timeout: Duration) -> Self {
        self.session = self.session.with_phase_timeout(timeout);
        self
    }

    /// Sets the read error policy.
    #[must_use]
    pub const fn with_read_error_policy(mut self, policy: ReadErrorPolicy) -> Self {
        self.session.read_error_policy = policy;
        self
    }

    /// Enables or disables certificate validation.
    #[must_use]
    pub const fn with_verify_certificates(mut self, verify: bool) -> Self {
        self.tls.verify_certificates = verify;
        self
    }

    /// Returns the session settings.
    #[must_use]
    pub const fn session_config(&self) -> &SessionConfig {
        &self.session
    }

    /// Returns the TLS policy.
    #[must_use]
    pub const fn tls_policy(&self) -> &TlsPolicy {
        &self.tls
    }

    /// Returns the configured host.
    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// Builds the reactor, queueing a connect if a host was set.
    ///
    /// # Errors
    /// Returns `TlsError` if the TLS client cannot be configured.
    pub fn build(self) -> Result<TlsReactor, TlsError> {
        let transport = TlsTransport::new(&self.tls)?;
        let mut reactor = Reactor::new(self.session, DnsResolver::new(), transport);
        if let Some(host) = self.host {
            reactor.connect(host);
        }
        Ok(reactor)
    }
}
