/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 17/10/26
******************************************************************************/

//! Hostname resolution.
//!
//! Cancellation is by dropping the returned future: the session driver runs each
//! lookup in its own task and aborts it when the timeout fires.

use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;
use tracing::debug;

/// Async hostname to endpoint-list lookup.
#[async_trait]
pub trait Resolver: Send + Sync + 'static {
    /// Resolves `host` at `port` to a list of endpoints, in preference order.
    ///
    /// # Errors
    /// Returns the lookup error reported by the system resolver.
    async fn resolve(&self, host: &str, port: u16) -> io::Result<Vec<SocketAddr>>;
}

/// Resolver backed by the Tokio blocking-pool `getaddrinfo` lookup.
#[derive(Debug, Clone, Copy, Default)]
pub struct DnsResolver;

impl DnsResolver {
    /// Creates a new resolver.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Resolver for DnsResolver {
    async fn resolve(&self, host: &str, port: u16) -> io::Result<Vec<SocketAddr>> {
        let endpoints: Vec<SocketAddr> = tokio::net::lookup_host((host, port)).await?.collect();
        debug!(host, port, count = endpoints.len(), "resolved");
        Ok(endpoints)
    }
}
