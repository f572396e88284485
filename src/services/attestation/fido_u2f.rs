//! `fido-u2f` attestation statement verifier
//!
//! Legacy U2F registration proof. The single attestation certificate signs
//! the U2F registration string
//! `0x00 || rpIdHash || clientDataHash || credentialId || publicKeyU2F`
//! where `publicKeyU2F` is the credential's uncompressed P-256 point.

use crate::error::VerificationError;
use crate::services::attestation::{collect_x5c, find_bytes};
use crate::services::authenticator_data::AuthenticatorData;
use crate::services::cert_store::{parse_certificate, verify_signature_with_cert};
use crate::services::cose::{CosePublicKey, COSE_ALG_ES256};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FidoU2fStatement {
    /// DER-encoded attestation certificate.
    pub att_cert: Vec<u8>,
    pub sig: Vec<u8>,
}

pub(crate) fn decode(
    att_stmt: &[(ciborium::Value, ciborium::Value)],
) -> Result<FidoU2fStatement, VerificationError> {
    let x5c = collect_x5c(att_stmt, "fido-u2f statement")?
        .ok_or_else(|| VerificationError::cbor("fido-u2f statement", "missing 'x5c'"))?;
    if x5c.len() != 1 {
        return Err(VerificationError::cbor(
            "fido-u2f statement",
            "x5c must hold exactly one certificate",
        ));
    }
    let sig = find_bytes(att_stmt, "sig")
        .ok_or_else(|| VerificationError::cbor("fido-u2f statement", "missing 'sig'"))?
        .to_vec();

    let mut x5c = x5c;
    Ok(FidoU2fStatement {
        att_cert: x5c.remove(0),
        sig,
    })
}

pub(crate) fn verify(
    stmt: &FidoU2fStatement,
    ad: &AuthenticatorData,
    client_data_hash: &[u8; 32],
) -> Result<(), VerificationError> {
    let credential = ad
        .attested_credential_data
        .as_ref()
        .ok_or(VerificationError::MalformedAuthenticatorData)?;

    // U2F predates COSE algorithm agility; the credential key must be P-256.
    let key = CosePublicKey::decode(credential.credential_public_key.as_bytes())?;
    let public_key_u2f = key
        .to_uncompressed_point()
        .ok_or(VerificationError::MalformedPublicKey)?;

    let mut message = Vec::with_capacity(1 + 32 + 32 + credential.credential_id.as_bytes().len() + 65);
    message.push(0x00);
    message.extend_from_slice(&ad.rp_id_hash);
    message.extend_from_slice(client_data_hash);
    message.extend_from_slice(credential.credential_id.as_bytes());
    message.extend_from_slice(&public_key_u2f);

    let cert = parse_certificate(&stmt.att_cert)?;
    verify_signature_with_cert(&cert, COSE_ALG_ES256, &message, &stmt.sig)
}
