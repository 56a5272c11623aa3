/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 17/10/26
******************************************************************************/

//! # Forkey
//!
//! A TLS line-protocol session engine for Rust, with an IRC bot on top.
//!
//! Forkey drives one client connection through hostname resolution, TCP
//! connect and a TLS handshake, each phase under its own timeout, then
//! streams linefeed-delimited messages in both directions.
//!
//! ## Features
//!
//! - **Pure phase machine**: Transitions are plain functions from inputs to commands
//! - **Single-fire errors**: Every session reports at most one terminal error
//! - **Stale-completion guard**: Late results from cancelled operations are no-ops
//! - **Ordered writes**: One buffer in flight, strictly FIFO
//! - **Off-thread fetches**: Blocking HTTP lookups on a worker thread
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use forkey::prelude::*;
//!
//! let mut reactor = EngineBuilder::new()
//!     .with_host("irc.example.org")
//!     .with_port(6697)
//!     .build()?;
//!
//! let mut handler = Callbacks::new()
//!     .with_on_connected(|ctx| ctx.write("NICK forkey"))
//!     .with_on_read(|line, ctx| {
//!         if let Some(token) = line.strip_prefix("PING ") {
//!             ctx.write(format!("PONG {token}"));
//!         }
//!     });
//!
//! reactor.run(&mut handler).await?;
//! ```
//!
//! ## Crate Organization
//!
//! - [`core`]: Phases, operation tokens and error definitions
//! - [`transport`]: Line codec, resolver and TLS transport
//! - [`session`]: Phase machine, timeout supervision and reactor
//! - [`worker`]: Background fetch dispatch
//! - [`engine`]: Bot, configuration and builder

pub mod core {
    //! Phases, operation tokens and error definitions.
    pub use forkey_core::*;
}

pub mod transport {
    //! Line codec, resolver and TLS transport.
    pub use forkey_transport::*;
}

pub mod session {
    //! Phase machine, timeout supervision and reactor.
    pub use forkey_session::*;
}

pub mod worker {
    //! Background fetch dispatch.
    pub use forkey_worker::*;
}

pub mod engine {
    //! Bot, configuration and builder.
    pub use forkey_engine::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    // Core types
    pub use forkey_core::{ErrorKind, FetchError, ForkeyError, OpToken, Phase, Result, SessionError};

    // Transport
    pub use forkey_transport::{DnsResolver, LineCodec, Resolver, TlsPolicy, TlsTransport, Transport};

    // Session
    pub use forkey_session::{
        Callbacks, ReactorHandle, ReadErrorPolicy, Reactor, SessionConfig, SessionContext,
        SessionHandler,
    };

    // Worker
    pub use forkey_worker::{FetchDispatcher, FetchRequest, Fetcher, HttpFetcher, Submitter};

    // Engine
    pub use forkey_engine::{Bot, BotConfig, EngineBuilder, YoutubeFetcher};
}
