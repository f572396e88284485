//! `android-safetynet` attestation statement verifier
//!
//! The statement wraps a SafetyNet attestation response: a JWS compact
//! serialization signed by Google's `attest.android.com` service. The JWS
//! payload's `nonce` binds the attestation to this ceremony:
//! `nonce = base64(SHA256(authData || clientDataHash))`.

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::error::VerificationError;
use crate::services::attestation::{find_bytes, find_text};
use crate::services::cert_store::{
    parse_certificate, verify_signature_with_cert, CertificateStore,
};
use crate::services::cose::{COSE_ALG_ES256, COSE_ALG_RS256};

const ATTEST_HOSTNAME: &str = "attest.android.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafetyNetStatement {
    /// SafetyNet library version; informational but must be present.
    pub ver: String,
    /// JWS compact serialization bytes.
    pub response: Vec<u8>,
}

/// JWS protected header; `x5c` carries standard-base64 DER certificates,
/// leaf first.
#[derive(Debug, Deserialize)]
struct JwsHeader {
    alg: String,
    x5c: Vec<String>,
}

/// SafetyNet payload fields the verifier consumes.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SafetyNetPayload {
    nonce: String,
    #[serde(default)]
    cts_profile_match: bool,
}

pub(crate) fn decode(
    att_stmt: &[(ciborium::Value, ciborium::Value)],
) -> Result<SafetyNetStatement, VerificationError> {
    let ver = find_text(att_stmt, "ver")
        .ok_or_else(|| VerificationError::cbor("android-safetynet statement", "missing 'ver'"))?
        .to_string();
    let response = find_bytes(att_stmt, "response")
        .ok_or_else(|| {
            VerificationError::cbor("android-safetynet statement", "missing 'response'")
        })?
        .to_vec();

    Ok(SafetyNetStatement { ver, response })
}

pub(crate) fn verify(
    stmt: &SafetyNetStatement,
    auth_data_raw: &[u8],
    client_data_hash: &[u8; 32],
    cert_store: &CertificateStore,
) -> Result<(), VerificationError> {
    if stmt.ver.is_empty() {
        return Err(VerificationError::InvalidAndroidAttestation);
    }

    let response = std::str::from_utf8(&stmt.response)
        .map_err(|_| VerificationError::InvalidAndroidAttestation)?;
    let (header_b64, payload_b64, signature_b64) = split_jws(response)?;

    let header: JwsHeader = serde_json::from_slice(&decode_b64url(header_b64)?)
        .map_err(|_| VerificationError::InvalidAndroidAttestation)?;

    let chain = header
        .x5c
        .iter()
        .map(|cert_b64| {
            STANDARD
                .decode(cert_b64)
                .map_err(|_| VerificationError::InvalidAndroidAttestation)
        })
        .collect::<Result<Vec<_>, _>>()?;
    if chain.is_empty() {
        return Err(VerificationError::InvalidAndroidAttestation);
    }

    let leaf = parse_certificate(&chain[0])?;
    let leaf_cn = leaf
        .subject()
        .iter_common_name()
        .next()
        .and_then(|cn| cn.attr_value().as_str().ok());
    if leaf_cn != Some(ATTEST_HOSTNAME) {
        return Err(VerificationError::InvalidAndroidAttestation);
    }

    cert_store.verify_chain(&chain)?;

    // The JWS signature covers the two base64url segments joined by '.'.
    let signed = format!("{header_b64}.{payload_b64}");
    let signature = decode_b64url(signature_b64)?;
    let alg = match header.alg.as_str() {
        "RS256" => COSE_ALG_RS256,
        "ES256" => COSE_ALG_ES256,
        _ => return Err(VerificationError::InvalidAndroidAttestation),
    };
    verify_signature_with_cert(&leaf, alg, signed.as_bytes(), &signature)?;

    let payload: SafetyNetPayload = serde_json::from_slice(&decode_b64url(payload_b64)?)
        .map_err(|_| VerificationError::InvalidAndroidAttestation)?;

    let mut nonce_input = auth_data_raw.to_vec();
    nonce_input.extend_from_slice(client_data_hash);
    let expected_nonce = STANDARD.encode(Sha256::digest(&nonce_input));
    if payload.nonce != expected_nonce {
        return Err(VerificationError::NonceCheckFailure);
    }

    if !payload.cts_profile_match {
        return Err(VerificationError::InvalidAndroidAttestation);
    }

    Ok(())
}

fn split_jws(response: &str) -> Result<(&str, &str, &str), VerificationError> {
    let mut parts = response.split('.');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(header), Some(payload), Some(signature), None) => Ok((header, payload, signature)),
        _ => Err(VerificationError::InvalidAndroidAttestation),
    }
}

fn decode_b64url(segment: &str) -> Result<Vec<u8>, VerificationError> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| VerificationError::InvalidAndroidAttestation)
}
