/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 17/10/26
******************************************************************************/

//! # Forkey Session
//!
//! Connection lifecycle of one TLS line session.
//!
//! This crate provides:
//! - **Phase machine**: Pure transition function from inputs to commands
//! - **Timeout supervision**: One generation-tagged timer slot per session
//! - **Read framing**: Reassembly of inbound bytes into non-empty lines
//! - **Write queue**: Ordered outbound buffers with one transmission in flight
//! - **Reactor**: Tokio driver executing commands and delivering callbacks
//! - **Configuration**: Port, phase timeouts and read error policy

pub mod config;
pub mod framer;
pub mod handler;
pub mod queue;
pub mod reactor;
pub mod state;
pub mod supervisor;

pub use config::{ReadErrorPolicy, SessionConfig};
pub use framer::ReadFramer;
pub use handler::{Callbacks, SessionContext, SessionHandler, encode_line};
pub use queue::WriteQueue;
pub use reactor::{Reactor, ReactorHandle};
pub use state::{Command, Commands, Input, Session, SessionEvent};
pub use supervisor::TimeoutSupervisor;
