/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 17/10/26
******************************************************************************/

//! # Forkey Core
//!
//! Core types and error definitions shared by the Forkey crates.
//!
//! This crate provides the fundamental building blocks used across the workspace:
//! - **Error types**: The session error taxonomy plus config and fetch errors, built on `thiserror`
//! - **Phase**: The forward-only connection phases of a session
//! - **OpToken**: Generation token identifying the currently supervised operation

pub mod error;
pub mod types;

pub use error::{ConfigError, ErrorKind, FetchError, ForkeyError, Result, SessionError};
pub use types::{DEFAULT_PHASE_TIMEOUT, DEFAULT_PORT, OpToken, Phase};
