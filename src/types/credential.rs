//! Credential value types
//!
//! The attested credential emitted by a successful registration. This is
//! the only value that escapes a ceremony; callers persist it and feed the
//! public key back into assertion verification.

use serde::{Deserialize, Serialize};

/// 16-byte Authenticator Attestation GUID identifying the device model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Aaguid(pub [u8; 16]);

impl Aaguid {
    pub const ZERO: Aaguid = Aaguid([0u8; 16]);

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

/// Probabilistically-unique credential identifier chosen by the
/// authenticator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialId(pub Vec<u8>);

impl CredentialId {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Raw COSE_Key bytes exactly as they appeared inside the authenticator
/// data. The structure is only decoded when a signature must be verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialPublicKey(pub Vec<u8>);

impl CredentialPublicKey {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Attested credential data emitted from registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialData {
    pub aaguid: Aaguid,
    pub credential_id: CredentialId,
    pub credential_public_key: CredentialPublicKey,
}
