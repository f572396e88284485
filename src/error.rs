//! Verification error handling module
//!
//! Defines the single flat error type shared by every parser and verifier
//! in the crate. Inner parsers surface their variant unchanged; the
//! orchestrators never remap them.

use thiserror::Error;

/// Error type covering both ceremonies and every inner parser.
///
/// Verification functions are total: they return a value or one of these
/// variants, never panic. Context strings never embed raw attacker-supplied
/// bytes; binary content is reduced to lengths or decoder messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    #[error("client data JSON decode failed: {0}")]
    JsonDecode(String),

    #[error("CBOR decode failed in {context}: {message}")]
    CborDecode {
        context: &'static str,
        message: String,
    },

    #[error("client data type does not match the ceremony")]
    InvalidType,

    #[error("challenge does not match the expected challenge")]
    MismatchedChallenge,

    #[error("origin does not match the relying party origin")]
    MismatchedOrigin,

    #[error("client reported a token binding that was not expected")]
    UnexpectedPresenceOfTokenBinding,

    #[error("token binding id does not match the expected id")]
    MismatchedTokenBinding,

    #[error("malformed authenticator data")]
    MalformedAuthenticatorData,

    #[error("RP ID hash does not match the relying party")]
    MismatchedRpId,

    #[error("user presence flag not set")]
    UserNotPresent,

    #[error("user verification required but flag not set")]
    UserUnverified,

    #[error("malformed credential public key")]
    MalformedPublicKey,

    #[error("malformed signature")]
    MalformedSignature,

    #[error("signature verification failed")]
    SignatureFailure,

    #[error("unsupported attestation format '{0}'")]
    UnsupportedAttestationFormat(String),

    #[error("certificate chain could not be validated")]
    UntrustedCertificate,

    #[error("attestation nonce check failed")]
    NonceCheckFailure,

    #[error("invalid Android attestation statement")]
    InvalidAndroidAttestation,

    #[error("invalid TPM attestation statement")]
    InvalidTpmAttestation,
}

impl VerificationError {
    /// Constructor for CBOR errors that keeps call sites compact.
    pub(crate) fn cbor(context: &'static str, message: impl ToString) -> Self {
        VerificationError::CborDecode {
            context,
            message: message.to_string(),
        }
    }
}
