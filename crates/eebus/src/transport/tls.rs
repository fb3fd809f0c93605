// SPDX-License-Identifier: Apache-2.0 OR MIT

//! TLS 1.2 configuration for the SHIP WebSocket.
//!
//! Both sides present an X.509 certificate. EEBUS trust is pinned on the
//! certificate SKI rather than on a CA chain, so the rustls verifiers
//! here accept any presented certificate and the node checks the peer's
//! SKI against its registered remote SKI right after the handshake.

use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::ring as ring_provider;
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::server::danger::{ClientCertVerified, ClientCertVerifier};
use rustls::{ClientConfig, DigitallySignedStruct, DistinguishedName, ServerConfig};

use crate::cert::TlsCredentials;
use crate::error::{Error, Result};

/// The WebSocket sub-protocol name.
pub const SUBPROTOCOL_SHIP: &str = "ship";

fn provider() -> CryptoProvider {
    // TLS 1.2 with the ECDSA/GCM suite; the CCM/CBC variants of the SHIP
    // cipher list are not available in rustls.
    let base = ring_provider::default_provider();
    CryptoProvider {
        cipher_suites: vec![ring_provider::cipher_suite::TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256],
        ..base
    }
}

/// Server-side TLS config: require a client certificate, accept any
/// (trust is SKI-pinned afterwards).
pub fn server_config(credentials: &TlsCredentials) -> Result<Arc<ServerConfig>> {
    let cert = CertificateDer::from(credentials.certificate_der().to_vec());
    let key = credentials.private_key_der();

    let config = ServerConfig::builder_with_provider(Arc::new(provider()))
        .with_protocol_versions(&[&rustls::version::TLS12])
        .map_err(|e| Error::Init(format!("TLS server config: {}", e)))?
        .with_client_cert_verifier(Arc::new(SkiPinnedClientVerifier::new()))
        .with_single_cert(vec![cert], key)
        .map_err(|e| Error::Init(format!("TLS server certificate: {}", e)))?;

    Ok(Arc::new(config))
}

/// Client-side TLS config: present our certificate, accept any server
/// certificate (trust is SKI-pinned afterwards).
pub fn client_config(credentials: &TlsCredentials) -> Result<Arc<ClientConfig>> {
    let cert = CertificateDer::from(credentials.certificate_der().to_vec());
    let key = credentials.private_key_der();

    let config = ClientConfig::builder_with_provider(Arc::new(provider()))
        .with_protocol_versions(&[&rustls::version::TLS12])
        .map_err(|e| Error::Init(format!("TLS client config: {}", e)))?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(SkiPinnedServerVerifier::new()))
        .with_client_auth_cert(vec![cert], key)
        .map_err(|e| Error::Init(format!("TLS client certificate: {}", e)))?;

    Ok(Arc::new(config))
}

// ============================================================================
// SKI-pinned verifiers (chain validation intentionally skipped)
// ============================================================================

#[derive(Debug)]
struct SkiPinnedServerVerifier {
    algorithms: rustls::crypto::WebPkiSupportedAlgorithms,
}

impl SkiPinnedServerVerifier {
    fn new() -> Self {
        Self {
            algorithms: ring_provider::default_provider().signature_verification_algorithms,
        }
    }
}

impl ServerCertVerifier for SkiPinnedServerVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        self.algorithms.supported_schemes()
    }
}

#[derive(Debug)]
struct SkiPinnedClientVerifier {
    algorithms: rustls::crypto::WebPkiSupportedAlgorithms,
}

impl SkiPinnedClientVerifier {
    fn new() -> Self {
        Self {
            algorithms: ring_provider::default_provider().signature_verification_algorithms,
        }
    }
}

impl ClientCertVerifier for SkiPinnedClientVerifier {
    fn root_hint_subjects(&self) -> &[DistinguishedName] {
        &[]
    }

    fn verify_client_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _now: UnixTime,
    ) -> std::result::Result<ClientCertVerified, rustls::Error> {
        Ok(ClientCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        self.algorithms.supported_schemes()
    }
}
