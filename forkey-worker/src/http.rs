/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 17/10/26
******************************************************************************/

//! Blocking HTTP fetcher.

use crate::dispatch::Fetcher;
use forkey_core::error::FetchError;
use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use std::time::Duration;
use tracing::debug;

/// Default request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Maximum redirects followed per request.
const MAX_REDIRECTS: usize = 10;

/// GETs URLs with a blocking `reqwest` client.
///
/// Must be created on the thread that uses it; the blocking client runs its
/// own runtime and cannot be built inside an async context.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Creates a fetcher following up to ten redirects.
    ///
    /// # Errors
    /// Returns `FetchError::Request` if the client cannot be built.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_timeout(REQUEST_TIMEOUT)
    }

    /// Creates a fetcher with a custom request timeout.
    ///
    /// # Errors
    /// Returns `FetchError::Request` if the client cannot be built.
    pub fn with_timeout(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .redirect(Policy::limited(MAX_REDIRECTS))
            .timeout(timeout)
            .user_agent(concat!("forkey/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Request(e.to_string()))?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&mut self, target: &str) -> Result<String, FetchError> {
        debug!(%target, "GET");
        let response = self
            .client
            .get(target)
            .send()
            .map_err(|e| FetchError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        response
            .text()
            .map_err(|e| FetchError::Request(e.to_string()))
    }
}
