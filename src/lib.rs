//! Server-side WebAuthn relying-party verification core.
//!
//! Given the artifacts a browser forwards from an authenticator, this
//! crate decides whether a newly registered credential is authentic
//! ([`register_credential`]) and whether a later assertion was produced by
//! that credential ([`verify_assertion`]).
//!
//! The crate is deliberately narrow: no HTTP, no session state, no
//! credential storage. The caller supplies the expected challenge, the
//! relying-party configuration, a trust-anchor store, and the raw bytes
//! from the client; the core returns a verified [`CredentialData`] or a
//! [`VerificationError`] explaining exactly which check failed.
//!
//! Supported attestation statement formats: `packed`, `tpm`, `fido-u2f`,
//! `android-safetynet`, and `none`. Credential keys: ES256, RS256, and
//! Ed25519.
//!
//! ```no_run
//! use webauthn_rp_core::{register_credential, CertificateStore, Challenge, RelyingParty};
//!
//! # fn demo(client_data_json: &[u8], attestation_object: &[u8]) {
//! let rp = RelyingParty::from_id("example.com");
//! let store = CertificateStore::new();
//! let challenge = Challenge::generate(32);
//! // ... send challenge to the client, receive the ceremony artifacts ...
//! let credential = register_credential(
//!     &store,
//!     &challenge,
//!     &rp,
//!     None,
//!     false,
//!     client_data_json,
//!     attestation_object,
//! );
//! # let _ = credential;
//! # }
//! ```

pub mod error;
pub mod services;
pub mod types;

pub use error::VerificationError;
pub use services::assertion::{verify_assertion, VerifiedAssertion};
pub use services::attestation::{AttestationObject, AttestationStatement};
pub use services::authenticator_data::AuthenticatorData;
pub use services::cert_store::CertificateStore;
pub use services::client_data::{CeremonyType, CollectedClientData};
pub use services::cose::CosePublicKey;
pub use services::registration::register_credential;
pub use types::{
    Aaguid, Challenge, CredentialData, CredentialId, CredentialPublicKey, Origin, RelyingParty,
    TokenBinding, User,
};
