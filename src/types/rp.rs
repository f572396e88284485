//! Relying-party configuration types
//!
//! Immutable identity of the server performing verification, plus the
//! user handle and token-binding state forwarded by the client. None of
//! these carry behavior beyond simple construction; every check that
//! consumes them lives in the services layer.

use serde::{Deserialize, Serialize};

/// A normalized URL origin (scheme + host + optional port), compared by
/// exact string equality against the client's reported origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Origin(String);

impl Origin {
    pub fn new(origin: impl Into<String>) -> Self {
        Origin(origin.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Immutable relying-party configuration for one verification call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelyingParty {
    /// Domain label the authenticator scoped the credential to.
    pub id: String,
    /// Human-readable service name; not interpreted by the core.
    pub name: String,
    /// Origin the client must report in `clientDataJSON`.
    pub origin: Origin,
}

impl RelyingParty {
    pub fn new(id: impl Into<String>, name: impl Into<String>, origin: Origin) -> Self {
        RelyingParty {
            id: id.into(),
            name: name.into(),
            origin,
        }
    }

    /// The conventional configuration for an RP id: name mirrors the id and
    /// the origin is `https://<id>`.
    pub fn from_id(id: impl Into<String>) -> Self {
        let id = id.into();
        let origin = Origin::new(format!("https://{id}"));
        RelyingParty {
            name: id.clone(),
            id,
            origin,
        }
    }
}

/// User account a registration is performed for. Opaque to the core; it is
/// carried so callers can thread one value through a ceremony.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Vec<u8>,
    pub name: String,
    pub display_name: String,
}

/// Token-binding state, either expected by the relying party or reported
/// by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenBinding {
    /// Client does not support token binding.
    Unsupported,
    /// Client supports token binding but it was not negotiated.
    Supported,
    /// Token binding was used; carries the base64url binding id.
    Present(String),
}
