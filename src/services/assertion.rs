//! Assertion ceremony orchestrator
//!
//! Verifies that an authentication assertion was produced by a previously
//! registered credential.
//!
//! ## Verification Flow
//! 1. Check `clientDataJSON` for the get ceremony
//! 2. Parse and check the raw authenticator data
//! 3. Decode the stored COSE public key
//! 4. Verify the signature over `authData || SHA256(clientDataJSON)`

use sha2::{Digest, Sha256};

use crate::error::VerificationError;
use crate::services::authenticator_data;
use crate::services::client_data::{self, CeremonyType};
use crate::services::cose::CosePublicKey;
use crate::types::{Challenge, CredentialPublicKey, RelyingParty};

/// Outcome of a successful assertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifiedAssertion {
    /// The authenticator's signature counter as sent. The core does not
    /// track state; callers enforce monotonicity against their stored
    /// value.
    pub sign_count: u32,
}

/// Verifies an authentication assertion against a stored credential key.
#[allow(clippy::too_many_arguments)]
pub fn verify_assertion(
    expected_challenge: &Challenge,
    rp: &RelyingParty,
    expected_token_binding: Option<&str>,
    require_user_verification: bool,
    client_data_json: &[u8],
    authenticator_data: &[u8],
    signature: &[u8],
    credential_public_key: &CredentialPublicKey,
) -> Result<VerifiedAssertion, VerificationError> {
    tracing::debug!(step = "client_data", rp_id = %rp.id, "checking client data");
    client_data::check(
        CeremonyType::Get,
        expected_challenge,
        client_data_json,
        rp,
        expected_token_binding,
    )?;

    tracing::debug!(step = "authenticator_data", "parsing authenticator data");
    let ad = authenticator_data::parse(authenticator_data)?;
    authenticator_data::verify(&ad, rp, require_user_verification)?;

    tracing::debug!(step = "public_key", "decoding stored credential key");
    let key = CosePublicKey::decode(credential_public_key.as_bytes())?;

    let mut message = authenticator_data.to_vec();
    let client_data_hash = Sha256::digest(client_data_json);
    message.extend_from_slice(&client_data_hash);

    tracing::debug!(step = "signature", "verifying assertion signature");
    key.verify_signature(&message, signature)?;

    tracing::debug!(
        step = "complete",
        status = "pass",
        sign_count = ad.sign_count,
        "assertion verified"
    );

    Ok(VerifiedAssertion {
        sign_count: ad.sign_count,
    })
}
