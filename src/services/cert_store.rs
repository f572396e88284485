//! Trust anchor store and certificate chain validation
//!
//! The store holds DER-encoded root certificates supplied by the caller.
//! It is read-only and safely shareable across concurrent verifications.
//! Chain validation checks validity windows, issuer signatures link by
//! link, and that the chain terminates at (or is signed by) an anchor.

use x509_parser::prelude::*;

use crate::error::VerificationError;
use crate::services::cose::{self, COSE_ALG_ES256, COSE_ALG_RS256};

/// Caller-provided trust anchors, DER-encoded.
#[derive(Debug, Clone, Default)]
pub struct CertificateStore {
    anchors: Vec<Vec<u8>>,
}

impl CertificateStore {
    pub fn new() -> Self {
        CertificateStore::default()
    }

    pub fn from_anchors(anchors: Vec<Vec<u8>>) -> Self {
        CertificateStore { anchors }
    }

    /// Adds a DER-encoded root certificate.
    pub fn add_anchor(&mut self, der: Vec<u8>) {
        self.anchors.push(der);
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    /// Validates a leaf-first certificate chain against the store.
    ///
    /// Every certificate must be inside its validity window, every link
    /// must carry a valid issuer signature, and the last certificate must
    /// either be an anchor itself or be signed by one. All failures
    /// collapse to `UntrustedCertificate`.
    pub fn verify_chain(&self, chain_der: &[Vec<u8>]) -> Result<(), VerificationError> {
        if chain_der.is_empty() {
            return Err(VerificationError::UntrustedCertificate);
        }

        let mut chain = Vec::with_capacity(chain_der.len());
        for der in chain_der {
            chain.push(parse_certificate(der)?);
        }

        for cert in &chain {
            if !cert.validity().is_valid() {
                return Err(VerificationError::UntrustedCertificate);
            }
        }

        for pair in chain.windows(2) {
            if pair[0].issuer() != pair[1].subject() {
                return Err(VerificationError::UntrustedCertificate);
            }
            pair[0]
                .verify_signature(Some(pair[1].public_key()))
                .map_err(|_| VerificationError::UntrustedCertificate)?;
        }

        let last_der = &chain_der[chain_der.len() - 1];
        let last = &chain[chain.len() - 1];
        if self.anchors.iter().any(|anchor| anchor == last_der) {
            return Ok(());
        }
        for anchor_der in &self.anchors {
            if let Ok(anchor) = parse_certificate(anchor_der) {
                if last.verify_signature(Some(anchor.public_key())).is_ok() {
                    return Ok(());
                }
            }
        }

        Err(VerificationError::UntrustedCertificate)
    }
}

/// Parses a DER certificate, rejecting trailing bytes.
pub fn parse_certificate(der: &[u8]) -> Result<X509Certificate<'_>, VerificationError> {
    let (rest, cert) =
        X509Certificate::from_der(der).map_err(|_| VerificationError::UntrustedCertificate)?;
    if !rest.is_empty() {
        return Err(VerificationError::UntrustedCertificate);
    }
    Ok(cert)
}

/// Verifies `signature` over `message` under a certificate's subject public
/// key, interpreted according to the COSE algorithm the statement declared.
pub fn verify_signature_with_cert(
    cert: &X509Certificate<'_>,
    cose_alg: i64,
    message: &[u8],
    signature: &[u8],
) -> Result<(), VerificationError> {
    let parsed = cert
        .public_key()
        .parsed()
        .map_err(|_| VerificationError::MalformedPublicKey)?;

    match (cose_alg, parsed) {
        (COSE_ALG_ES256, x509_parser::public_key::PublicKey::EC(point)) => {
            cose::verify_es256(point.data(), message, signature)
        }
        (COSE_ALG_RS256, x509_parser::public_key::PublicKey::RSA(rsa_key)) => {
            cose::verify_rs256(rsa_key.modulus, rsa_key.exponent, message, signature)
        }
        _ => Err(VerificationError::MalformedPublicKey),
    }
}
