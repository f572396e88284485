//! Core value types
//!
//! Primitive types shared across the verification services. All of them
//! are plain value objects; behavior lives in `crate::services`.

pub mod challenge;
pub mod credential;
pub mod rp;

pub use challenge::Challenge;
pub use credential::{Aaguid, CredentialData, CredentialId, CredentialPublicKey};
pub use rp::{Origin, RelyingParty, TokenBinding, User};
