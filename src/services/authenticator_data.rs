//! Authenticator data parsing service
//!
//! Decodes the fixed-layout binary blob produced by the authenticator and
//! runs the post-parse relying-party checks.
//!
//! AuthData layout (network byte order):
//! | Offset | Length | Field                                  |
//! |--------|--------|----------------------------------------|
//! | 0      | 32     | RP ID Hash (SHA256)                    |
//! | 32     | 1      | Flags                                  |
//! | 33     | 4      | Signature counter (big-endian u32)     |
//! | 37     | 16     | AAGUID                  (flags.AT only) |
//! | 53     | 2      | Credential ID length L  (flags.AT only) |
//! | 55     | L      | Credential ID           (flags.AT only) |
//! | 55+L   | var    | COSE public key (CBOR)  (flags.AT only) |
//! | ...    | var    | Extension map (CBOR)    (flags.ED only) |
//!
//! The COSE key has no length prefix; its extent is discovered by decoding
//! one CBOR item in place. Whatever follows it is the extension map.

use ciborium::Value;
use sha2::{Digest, Sha256};

use crate::error::VerificationError;
use crate::types::{Aaguid, CredentialData, CredentialId, CredentialPublicKey, RelyingParty};

/// Flags bitmap: bit 0 = user present, bit 2 = user verified,
/// bit 6 = attested credential data, bit 7 = extension data.
pub const FLAG_USER_PRESENT: u8 = 0x01;
pub const FLAG_USER_VERIFIED: u8 = 0x04;
pub const FLAG_ATTESTED_CREDENTIAL_DATA: u8 = 0x40;
pub const FLAG_EXTENSION_DATA: u8 = 0x80;

/// Parsed authenticator data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatorData {
    pub rp_id_hash: [u8; 32],
    pub user_present: bool,
    pub user_verified: bool,
    /// Raw signature counter. Parsed but never validated here; callers
    /// enforce monotonicity across sessions.
    pub sign_count: u32,
    /// Present exactly when flags bit 6 was set.
    pub attested_credential_data: Option<CredentialData>,
    /// Raw CBOR extension map, empty unless flags bit 7 was set.
    pub extensions: Vec<u8>,
}

/// Parses the binary authenticator data blob. Any short read, stray
/// trailing byte, or undecodable inner CBOR is `MalformedAuthenticatorData`.
pub fn parse(data: &[u8]) -> Result<AuthenticatorData, VerificationError> {
    if data.len() < 37 {
        return Err(VerificationError::MalformedAuthenticatorData);
    }

    let rp_id_hash: [u8; 32] = data[0..32]
        .try_into()
        .map_err(|_| VerificationError::MalformedAuthenticatorData)?;
    let flags = data[32];
    let sign_count = u32::from_be_bytes(
        data[33..37]
            .try_into()
            .map_err(|_| VerificationError::MalformedAuthenticatorData)?,
    );

    let mut offset = 37;

    let attested_credential_data = if flags & FLAG_ATTESTED_CREDENTIAL_DATA != 0 {
        let (credential, consumed) = parse_attested_credential_data(&data[offset..])?;
        offset += consumed;
        Some(credential)
    } else {
        None
    };

    let extensions = if flags & FLAG_EXTENSION_DATA != 0 {
        let ext = parse_extension_map(&data[offset..])?;
        offset += ext.len();
        ext
    } else {
        Vec::new()
    };

    if offset != data.len() {
        return Err(VerificationError::MalformedAuthenticatorData);
    }

    Ok(AuthenticatorData {
        rp_id_hash,
        user_present: flags & FLAG_USER_PRESENT != 0,
        user_verified: flags & FLAG_USER_VERIFIED != 0,
        sign_count,
        attested_credential_data,
        extensions,
    })
}

/// Parses the attested credential data block. Returns the credential and
/// the number of bytes it occupied.
fn parse_attested_credential_data(
    data: &[u8],
) -> Result<(CredentialData, usize), VerificationError> {
    // aaguid(16) + credential id length(2)
    if data.len() < 18 {
        return Err(VerificationError::MalformedAuthenticatorData);
    }

    let aaguid: [u8; 16] = data[0..16]
        .try_into()
        .map_err(|_| VerificationError::MalformedAuthenticatorData)?;
    let cred_id_len = u16::from_be_bytes(
        data[16..18]
            .try_into()
            .map_err(|_| VerificationError::MalformedAuthenticatorData)?,
    ) as usize;

    if data.len() < 18 + cred_id_len {
        return Err(VerificationError::MalformedAuthenticatorData);
    }
    let credential_id = data[18..18 + cred_id_len].to_vec();

    // The COSE key is length-discovered: decode one CBOR item and measure
    // how much of the slice it consumed.
    let key_start = 18 + cred_id_len;
    let mut rest: &[u8] = &data[key_start..];
    let before = rest.len();
    let _: Value = ciborium::from_reader(&mut rest)
        .map_err(|_| VerificationError::MalformedAuthenticatorData)?;
    let key_len = before - rest.len();
    let credential_public_key = data[key_start..key_start + key_len].to_vec();

    Ok((
        CredentialData {
            aaguid: Aaguid(aaguid),
            credential_id: CredentialId(credential_id),
            credential_public_key: CredentialPublicKey(credential_public_key),
        },
        key_start + key_len,
    ))
}

/// Parses the trailing extension map. The map must be a CBOR map and must
/// consume every remaining byte.
fn parse_extension_map(data: &[u8]) -> Result<Vec<u8>, VerificationError> {
    let mut rest: &[u8] = data;
    let value: Value = ciborium::from_reader(&mut rest)
        .map_err(|_| VerificationError::MalformedAuthenticatorData)?;
    if !rest.is_empty() || value.as_map().is_none() {
        return Err(VerificationError::MalformedAuthenticatorData);
    }
    Ok(data.to_vec())
}

/// Post-parse checks shared by both ceremonies.
pub fn verify(
    ad: &AuthenticatorData,
    rp: &RelyingParty,
    require_user_verification: bool,
) -> Result<(), VerificationError> {
    let expected_hash: [u8; 32] = Sha256::digest(rp.id.as_bytes()).into();
    if ad.rp_id_hash != expected_hash {
        return Err(VerificationError::MismatchedRpId);
    }

    if !ad.user_present {
        return Err(VerificationError::UserNotPresent);
    }

    if require_user_verification && !ad.user_verified {
        return Err(VerificationError::UserUnverified);
    }

    Ok(())
}
