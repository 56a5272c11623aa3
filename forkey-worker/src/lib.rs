/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 17/10/26
******************************************************************************/

//! # Forkey Worker
//!
//! Blocking fetches off the reactor thread.
//!
//! This crate provides:
//! - **Dispatcher**: One worker thread draining a FIFO of fetch requests
//! - **Fetcher trait**: The blocking fetch performed per request
//! - **HTTP fetcher**: `reqwest` blocking client following redirects
//!
//! Results reach the session only by posting a closure through its
//! [`ReactorHandle`](forkey_session::ReactorHandle).

pub mod dispatch;
pub mod http;

pub use dispatch::{FetchDispatcher, FetchRequest, Fetcher, Submitter};
pub use http::HttpFetcher;
