/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 17/10/26
******************************************************************************/

//! TLS client configuration.
//!
//! Certificates are validated against the Mozilla root set unless the policy
//! explicitly turns validation off.

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{CryptoProvider, verify_tls12_signature, verify_tls13_signature};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use std::sync::Arc;
use thiserror::Error;
use tokio_rustls::TlsConnector;
use tracing::warn;

/// Errors building a TLS client.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TlsError {
    /// The rustls configuration was rejected.
    #[error("invalid tls configuration: {0}")]
    Config(String),

    /// The name is not a valid DNS name or IP address.
    #[error("invalid server name: {0}")]
    InvalidServerName(String),
}

/// Certificate validation policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPolicy {
    /// Whether the server certificate chain and name are validated.
    pub verify_certificates: bool,
    /// Name presented for SNI and checked against the certificate.
    /// Defaults to the host passed to `connect`.
    pub server_name: Option<String>,
}

impl TlsPolicy {
    /// Creates the default, validating policy.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            verify_certificates: true,
            server_name: None,
        }
    }

    /// Sets whether certificates are validated.
    #[must_use]
    pub const fn with_verify_certificates(mut self, verify: bool) -> Self {
        self.verify_certificates = verify;
        self
    }

    /// Overrides the server name used for SNI and validation.
    #[must_use]
    pub fn with_server_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = Some(name.into());
        self
    }

    /// Builds a connector implementing this policy.
    ///
    /// # Errors
    /// Returns `TlsError::Config` if rustls rejects the protocol setup.
    pub fn connector(&self) -> Result<TlsConnector, TlsError> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let builder = ClientConfig::builder_with_provider(Arc::clone(&provider))
            .with_safe_default_protocol_versions()
            .map_err(|e| TlsError::Config(e.to_string()))?;

        let config = if self.verify_certificates {
            let mut roots = RootCertStore::empty();
            roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
            builder.with_root_certificates(roots).with_no_client_auth()
        } else {
            warn!("tls certificate verification is disabled");
            builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(AcceptAnyCertificate { provider }))
                .with_no_client_auth()
        };

        Ok(TlsConnector::from(Arc::new(config)))
    }
}

impl Default for TlsPolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses a host into the name rustls expects.
///
/// # Errors
/// Returns `TlsError::InvalidServerName` for names rustls cannot represent.
pub fn server_name(host: &str) -> Result<ServerName<'static>, TlsError> {
    ServerName::try_from(host.to_owned()).map_err(|e| TlsError::InvalidServerName(e.to_string()))
}

/// Verifier that accepts any certificate but still checks handshake signatures.
#[derive(Debug)]
struct AcceptAnyCertificate {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_defaults_to_verification() {
        let policy = TlsPolicy::default();
        assert!(policy.verify_certificates);
        assert!(policy.server_name.is_none());
    }

    #[test]
    fn test_policy_builders() {
        let policy = TlsPolicy::new()
            .with_verify_certificates(false)
            .with_server_name("irc.example.org");
        assert!(!policy.verify_certificates);
        assert_eq!(policy.server_name.as_deref(), Some("irc.example.org"));
    }

    #[test]
    fn test_connector_builds_for_both_policies() {
        assert!(TlsPolicy::new().connector().is_ok());
        assert!(TlsPolicy::new().with_verify_certificates(false).connector().is_ok());
    }

    #[test]
    fn test_server_name_parsing() {
        assert!(server_name("irc.libera.chat").is_ok());
        assert!(server_name("10.0.0.2").is_ok());
        assert!(matches!(
            server_name("not a host"),
            Err(TlsError::InvalidServerName(_))
        ));
    }
}
