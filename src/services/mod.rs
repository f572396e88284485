//! Verification services
//!
//! Leaf parsers and verifiers first, orchestrators last. Every function in
//! this tree is pure: inputs in, value or `VerificationError` out.

pub mod assertion;
pub mod attestation;
pub mod authenticator_data;
pub mod cert_store;
pub mod client_data;
pub mod cose;
pub mod registration;
