//! Registration ceremony orchestrator
//!
//! Composes the client-data check, attestation-object decode,
//! authenticator-data checks, and the format-specific attestation verifier
//! into the single registration entry point.
//!
//! ## Verification Flow
//! 1. Check `clientDataJSON` for the create ceremony
//! 2. Decode the CBOR attestation object
//! 3. Parse and check the raw authenticator data
//! 4. Run the format-specific attestation verifier
//! 5. Emit the attested credential for the caller to persist

use sha2::{Digest, Sha256};

use crate::error::VerificationError;
use crate::services::attestation;
use crate::services::authenticator_data;
use crate::services::cert_store::CertificateStore;
use crate::services::client_data::{self, CeremonyType};
use crate::types::{Challenge, CredentialData, RelyingParty};

/// Verifies a registration ceremony and returns the attested credential.
///
/// The caller supplies the challenge it minted for this ceremony, its RP
/// configuration, an optional expected token-binding id, and whether user
/// verification is required. Replay-counter bookkeeping and attestation
/// trust policy stay with the caller; the credential's `sign_count` is
/// available in the parsed authenticator data and starts the caller's
/// monotonic counter.
#[allow(clippy::too_many_arguments)]
pub fn register_credential(
    cert_store: &CertificateStore,
    expected_challenge: &Challenge,
    rp: &RelyingParty,
    expected_token_binding: Option<&str>,
    require_user_verification: bool,
    client_data_json: &[u8],
    attestation_object: &[u8],
) -> Result<CredentialData, VerificationError> {
    tracing::debug!(step = "client_data", rp_id = %rp.id, "checking client data");
    client_data::check(
        CeremonyType::Create,
        expected_challenge,
        client_data_json,
        rp,
        expected_token_binding,
    )?;

    tracing::debug!(step = "attestation_object", "decoding attestation object");
    let object = attestation::decode(attestation_object)?;

    tracing::debug!(
        step = "authenticator_data",
        format = object.statement.format(),
        "parsing authenticator data"
    );
    let ad = authenticator_data::parse(&object.auth_data_raw)?;
    authenticator_data::verify(&ad, rp, require_user_verification)?;

    tracing::debug!(
        step = "attestation_statement",
        format = object.statement.format(),
        "verifying attestation statement"
    );
    let client_data_hash: [u8; 32] = Sha256::digest(client_data_json).into();
    attestation::verify_statement(&object, &ad, &client_data_hash, cert_store)?;

    let credential = ad
        .attested_credential_data
        .ok_or(VerificationError::MalformedAuthenticatorData)?;

    tracing::debug!(
        step = "complete",
        status = "pass",
        credential_id_len = credential.credential_id.as_bytes().len(),
        sign_count = ad.sign_count,
        "registration verified"
    );

    Ok(credential)
}
