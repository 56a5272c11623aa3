/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 17/10/26
******************************************************************************/

//! # Forkey Transport
//!
//! Network transport layer for the Forkey session engine.
//!
//! This crate provides:
//! - **Codec**: Tokio codec for linefeed-delimited IRC framing
//! - **Resolver**: Async hostname lookup behind the [`Resolver`] trait
//! - **Transport**: TCP connect plus TLS upgrade behind the [`Transport`] trait
//! - **TLS policy**: Certificate validation via rustls, on by default

pub mod codec;
pub mod resolve;
pub mod tls;
pub mod transport;

pub use codec::{CodecError, LineCodec};
pub use resolve::{DnsResolver, Resolver};
pub use tls::{TlsError, TlsPolicy};
pub use transport::{TlsTransport, Transport};
