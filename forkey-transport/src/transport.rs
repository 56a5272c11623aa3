/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 17/10/26
******************************************************************************/

//! TCP connect and TLS upgrade.
//!
//! The [`Transport`] trait splits connection setup into the two phases the
//! session supervises separately. Byte-level reads and writes go through the
//! `AsyncRead`/`AsyncWrite` implementation of the resulting stream.

use crate::tls::{TlsError, TlsPolicy, server_name};
use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tracing::debug;

/// Connection setup collaborator.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Connected but not yet upgraded socket.
    type Socket: Send + 'static;
    /// Upgraded stream carrying the line protocol.
    type Stream: AsyncRead + AsyncWrite + Send + Unpin + 'static;

    /// Connects to the first reachable endpoint, trying them in order.
    ///
    /// # Errors
    /// Returns the error of the last endpoint tried, or `InvalidInput` if the
    /// list is empty.
    async fn connect(&self, endpoints: &[SocketAddr]) -> io::Result<Self::Socket>;

    /// Performs the client handshake on `socket`.
    ///
    /// # Errors
    /// Returns the handshake error.
    async fn handshake(&self, host: &str, socket: Self::Socket) -> io::Result<Self::Stream>;
}

/// TCP transport upgraded with rustls.
#[derive(Clone)]
pub struct TlsTransport {
    connector: TlsConnector,
    server_name: Option<String>,
}

impl TlsTransport {
    /// Creates a transport applying `policy` to every handshake.
    ///
    /// # Errors
    /// Returns `TlsError` if the TLS client cannot be configured.
    pub fn new(policy: &TlsPolicy) -> Result<Self, TlsError> {
        Ok(Self {
            connector: policy.connector()?,
            server_name: policy.server_name.clone(),
        })
    }
}

impl std::fmt::Debug for TlsTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsTransport")
            .field("server_name", &self.server_name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Transport for TlsTransport {
    type Socket = TcpStream;
    type Stream = TlsStream<TcpStream>;

    async fn connect(&self, endpoints: &[SocketAddr]) -> io::Result<TcpStream> {
        let mut last_error = None;
        for endpoint in endpoints {
            match TcpStream::connect(*endpoint).await {
                Ok(stream) => {
                    stream.set_nodelay(true)?;
                    debug!(%endpoint, "socket connected");
                    return Ok(stream);
                }
                Err(e) => {
                    debug!(%endpoint, error = %e, "endpoint unreachable");
                    last_error = Some(e);
                }
            }
        }
        Err(last_error
            .unwrap_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "no endpoints to connect to")))
    }

    async fn handshake(&self, host: &str, socket: TcpStream) -> io::Result<Self::Stream> {
        let name = self.server_name.as_deref().unwrap_or(host);
        let name = server_name(name).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        debug!(?name, "starting tls handshake");
        self.connector.connect(name, socket).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_connect_empty_endpoints() {
        let transport = TlsTransport::new(&TlsPolicy::new()).unwrap();
        let err = transport.connect(&[]).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_connect_skips_unreachable_endpoint() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let live = listener.local_addr().unwrap();

        let closed = {
            let probe = TcpListener::bind("127.0.0.1:0").await.unwrap();
            probe.local_addr().unwrap()
        };

        let transport = TlsTransport::new(&TlsPolicy::new()).unwrap();
        let socket = transport.connect(&[closed, live]).await.unwrap();
        assert_eq!(socket.peer_addr().unwrap(), live);
    }

    #[tokio::test]
    async fn test_handshake_rejects_invalid_name() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let transport = TlsTransport::new(&TlsPolicy::new()).unwrap();
        let socket = transport.connect(&[addr]).await.unwrap();

        let err = transport.handshake("bad host name", socket).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
