// SPDX-License-Identifier: Apache-2.0 OR MIT

//! TLS credentials: an X.509 certificate/key pair plus the derived SKI.
//!
//! EEBUS identifies endpoints by the Subject Key Identifier of their
//! certificate: the lowercase-hex SHA-1 of the SubjectPublicKeyInfo's
//! public-key bit string. Loading verifies that the SKI computed from
//! the public key equals the SKI asserted in the certificate's SKI
//! extension.

use std::fmt::Write as _;
use std::path::Path;

use ring::digest;
use rustls::pki_types::PrivateKeyDer;
use x509_parser::prelude::{FromDer, ParsedExtension, X509Certificate};

use crate::error::{Error, Result};

/// DER certificate, DER private key, and the derived SKI string.
#[derive(Debug)]
pub struct TlsCredentials {
    cert_der: Vec<u8>,
    key_der: PrivateKeyDer<'static>,
    ski: String,
}

impl TlsCredentials {
    /// Load a PEM certificate and PEM private key from disk.
    pub fn load(cert_file: &Path, key_file: &Path) -> Result<TlsCredentials> {
        let cert_pem = std::fs::read_to_string(cert_file)
            .map_err(|_| Error::FileSystemNoFile(cert_file.display().to_string()))?;
        let key_pem = std::fs::read_to_string(key_file)
            .map_err(|_| Error::FileSystemNoFile(key_file.display().to_string()))?;

        Self::from_pem(&cert_pem, &key_pem)
    }

    /// Build credentials from in-memory PEM text.
    pub fn from_pem(cert_pem: &str, key_pem: &str) -> Result<TlsCredentials> {
        let cert = pem::parse(cert_pem)
            .map_err(|_| Error::Init("certificate is not valid PEM".into()))?;
        if cert.tag() != "CERTIFICATE" {
            return Err(Error::Init(format!(
                "expected a CERTIFICATE block, found {}",
                cert.tag()
            )));
        }
        let cert_der = cert.into_contents();

        let key_der = rustls_pemfile::private_key(&mut key_pem.as_bytes())
            .map_err(|_| Error::Init("private key is not valid PEM".into()))?
            .ok_or_else(|| Error::Init("no private key block found".into()))?;

        let ski = calc_public_key_ski(&cert_der)?;
        check_ski_extension(&cert_der, &ski)?;

        Ok(TlsCredentials {
            cert_der,
            key_der,
            ski,
        })
    }

    /// The lowercase-hex SKI identifying this endpoint.
    pub fn ski(&self) -> &str {
        &self.ski
    }

    pub fn certificate_der(&self) -> &[u8] {
        &self.cert_der
    }

    pub fn private_key_der(&self) -> PrivateKeyDer<'static> {
        self.key_der.clone_key()
    }
}

/// SHA-1 of the SubjectPublicKeyInfo's public-key bit string, as
/// lowercase hex.
pub fn calc_public_key_ski(cert_der: &[u8]) -> Result<String> {
    let (_, cert) = X509Certificate::from_der(cert_der)
        .map_err(|_| Error::Init("certificate is not valid DER".into()))?;

    let public_key = &cert.tbs_certificate.subject_pki.subject_public_key.data;
    let sha1 = digest::digest(&digest::SHA1_FOR_LEGACY_USE_ONLY, public_key);

    Ok(hex_lower(sha1.as_ref()))
}

/// Require the certificate's SKI extension to match the computed SKI.
fn check_ski_extension(cert_der: &[u8], ski: &str) -> Result<()> {
    let (_, cert) = X509Certificate::from_der(cert_der)
        .map_err(|_| Error::Init("certificate is not valid DER".into()))?;

    let stored = cert
        .extensions()
        .iter()
        .find_map(|ext| match ext.parsed_extension() {
            ParsedExtension::SubjectKeyIdentifier(key_id) => Some(hex_lower(key_id.0)),
            _ => None,
        })
        .ok_or_else(|| Error::Init("certificate has no SKI extension".into()))?;

    if stored != ski {
        return Err(Error::Init(format!(
            "SKI extension {} does not match public key SKI {}",
            stored, ski
        )));
    }

    Ok(())
}

fn hex_lower(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{:02x}", byte);
    }
    out
}
