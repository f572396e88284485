//! Ceremony challenge type
//!
//! Challenges are opaque byte strings minted by the relying party, echoed
//! back by the client inside `clientDataJSON`, and compared in constant
//! time. A challenge lives for exactly one ceremony; storage and expiry are
//! the caller's concern.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use constant_time_eq::constant_time_eq;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Opaque relying-party challenge, typically 16-64 bytes.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Challenge(Vec<u8>);

impl Challenge {
    /// Generates a fresh challenge of `len` bytes from the OS CSPRNG.
    pub fn generate(len: usize) -> Self {
        let mut bytes = vec![0u8; len];
        OsRng.fill_bytes(&mut bytes);
        Challenge(bytes)
    }

    pub fn new(bytes: Vec<u8>) -> Self {
        Challenge(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Encodes the challenge the way clients echo it: unpadded base64url.
    pub fn to_base64url(&self) -> String {
        URL_SAFE_NO_PAD.encode(&self.0)
    }
}

impl PartialEq for Challenge {
    fn eq(&self, other: &Self) -> bool {
        constant_time_eq(&self.0, &other.0)
    }
}

impl From<&[u8]> for Challenge {
    fn from(bytes: &[u8]) -> Self {
        Challenge(bytes.to_vec())
    }
}

impl AsRef<[u8]> for Challenge {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_returns_requested_length() {
        for len in [16, 32, 64] {
            assert_eq!(Challenge::generate(len).as_bytes().len(), len);
        }
    }

    #[test]
    fn test_successive_challenges_differ() {
        let a = Challenge::generate(32);
        let b = Challenge::generate(32);
        assert_ne!(a, b);
    }

    #[test]
    fn test_equality_is_bytewise() {
        let a = Challenge::new(vec![1, 2, 3, 4]);
        let b = Challenge::new(vec![1, 2, 3, 4]);
        let c = Challenge::new(vec![1, 2, 3, 5]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_base64url_encoding_is_unpadded() {
        let challenge = Challenge::new(b"test".to_vec());
        assert_eq!(challenge.to_base64url(), "dGVzdA");
    }
}
