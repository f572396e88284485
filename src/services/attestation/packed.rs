//! `packed` attestation statement verifier
//!
//! Two paths:
//! - x5c present: the batch attestation certificate signs
//!   `authData || clientDataHash`; the certificate's id-fido-gen-ce-aaguid
//!   extension, when present, must match the attested AAGUID.
//! - x5c absent (self-attestation): the freshly created credential key
//!   itself signs, and its algorithm must match the statement's `alg`.

use der_parser::ber::BerObjectContent;
use std::str::FromStr;
use x509_parser::oid_registry::Oid;
use x509_parser::prelude::*;

use crate::error::VerificationError;
use crate::services::attestation::{collect_x5c, find_bytes, find_int};
use crate::services::authenticator_data::AuthenticatorData;
use crate::services::cert_store::{parse_certificate, verify_signature_with_cert};
use crate::services::cose::CosePublicKey;

// id-fido-gen-ce-aaguid: marks the AAGUID the attestation cert vouches for.
const AAGUID_EXTENSION_OID_STR: &str = "1.3.6.1.4.1.45724.1.1.4";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedStatement {
    pub alg: i64,
    pub sig: Vec<u8>,
    /// Attestation certificate chain, leaf first. Absent for
    /// self-attestation.
    pub x5c: Option<Vec<Vec<u8>>>,
}

pub(crate) fn decode(
    att_stmt: &[(ciborium::Value, ciborium::Value)],
) -> Result<PackedStatement, VerificationError> {
    let alg = find_int(att_stmt, "alg")
        .ok_or_else(|| VerificationError::cbor("packed statement", "missing 'alg'"))?;
    let sig = find_bytes(att_stmt, "sig")
        .ok_or_else(|| VerificationError::cbor("packed statement", "missing 'sig'"))?
        .to_vec();
    let x5c = collect_x5c(att_stmt, "packed statement")?;

    Ok(PackedStatement { alg, sig, x5c })
}

pub(crate) fn verify(
    stmt: &PackedStatement,
    ad: &AuthenticatorData,
    auth_data_raw: &[u8],
    client_data_hash: &[u8; 32],
) -> Result<(), VerificationError> {
    let mut message = auth_data_raw.to_vec();
    message.extend_from_slice(client_data_hash);

    match &stmt.x5c {
        Some(chain) => {
            let leaf = parse_certificate(&chain[0])?;
            verify_signature_with_cert(&leaf, stmt.alg, &message, &stmt.sig)?;
            check_aaguid_extension(&leaf, ad)
        }
        None => {
            let credential = ad
                .attested_credential_data
                .as_ref()
                .ok_or(VerificationError::MalformedAuthenticatorData)?;
            let key = CosePublicKey::decode(credential.credential_public_key.as_bytes())?;
            if key.cose_alg() != stmt.alg {
                return Err(VerificationError::SignatureFailure);
            }
            key.verify_signature(&message, &stmt.sig)
        }
    }
}

/// When the leaf certificate carries the id-fido-gen-ce-aaguid extension,
/// its 16-byte value must equal the attested AAGUID.
fn check_aaguid_extension(
    leaf: &X509Certificate<'_>,
    ad: &AuthenticatorData,
) -> Result<(), VerificationError> {
    let aaguid_oid = Oid::from_str(AAGUID_EXTENSION_OID_STR)
        .map_err(|_| VerificationError::UntrustedCertificate)?;

    let Some(extension) = leaf.extensions().iter().find(|ext| ext.oid == aaguid_oid) else {
        return Ok(());
    };

    // Extension value is DER: OCTET STRING (16-byte AAGUID).
    let (_, inner) = der_parser::parse_der(extension.value)
        .map_err(|_| VerificationError::UntrustedCertificate)?;
    let BerObjectContent::OctetString(cert_aaguid) = &inner.content else {
        return Err(VerificationError::UntrustedCertificate);
    };

    let attested = ad
        .attested_credential_data
        .as_ref()
        .ok_or(VerificationError::MalformedAuthenticatorData)?;
    if *cert_aaguid != attested.aaguid.as_bytes().as_slice() {
        return Err(VerificationError::UntrustedCertificate);
    }

    Ok(())
}
