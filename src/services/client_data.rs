//! Client data verification service
//!
//! Parses the `clientDataJSON` forwarded by the browser and checks it
//! against the ceremony context:
//! - `type` matches the ceremony (`webauthn.create` / `webauthn.get`)
//! - echoed challenge equals the expected challenge (constant time)
//! - reported origin equals the relying-party origin (exact match)
//! - token-binding state is consistent with the caller's expectation

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use constant_time_eq::constant_time_eq;
use serde::Deserialize;

use crate::error::VerificationError;
use crate::types::{Challenge, RelyingParty, TokenBinding};

/// Which ceremony the client data must announce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CeremonyType {
    Create,
    Get,
}

impl CeremonyType {
    fn expected_literal(self) -> &'static str {
        match self {
            CeremonyType::Create => "webauthn.create",
            CeremonyType::Get => "webauthn.get",
        }
    }
}

/// Wire form of the optional `tokenBinding` member.
#[derive(Debug, Clone, Deserialize)]
struct RawTokenBinding {
    status: String,
    #[serde(default)]
    id: Option<String>,
}

/// Wire form of `clientDataJSON`. Unknown members (`crossOrigin` and
/// friends) are ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawClientData {
    #[serde(rename = "type")]
    ty: String,
    challenge: String,
    origin: String,
    #[serde(default)]
    token_binding: Option<RawTokenBinding>,
}

/// The decoded `clientDataJSON` after all ceremony checks passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectedClientData {
    pub ty: String,
    /// Challenge bytes after base64url decoding.
    pub challenge: Vec<u8>,
    pub origin: String,
    pub token_binding: Option<TokenBinding>,
}

/// Parses and checks `clientDataJSON` for the given ceremony.
///
/// Checks run in a fixed order and each failure maps to its own error
/// variant, so callers can distinguish a stale challenge from a phished
/// origin.
pub fn check(
    ceremony: CeremonyType,
    expected_challenge: &Challenge,
    client_data_json: &[u8],
    rp: &RelyingParty,
    expected_token_binding: Option<&str>,
) -> Result<CollectedClientData, VerificationError> {
    let raw: RawClientData = serde_json::from_slice(client_data_json)
        .map_err(|e| VerificationError::JsonDecode(e.to_string()))?;

    if raw.ty != ceremony.expected_literal() {
        return Err(VerificationError::InvalidType);
    }

    let challenge = URL_SAFE_NO_PAD
        .decode(raw.challenge.as_bytes())
        .map_err(|e| VerificationError::JsonDecode(format!("challenge field: {e}")))?;
    if !constant_time_eq(&challenge, expected_challenge.as_bytes()) {
        return Err(VerificationError::MismatchedChallenge);
    }

    if raw.origin != rp.origin.as_str() {
        return Err(VerificationError::MismatchedOrigin);
    }

    let token_binding = raw.token_binding.map(decode_token_binding).transpose()?;
    check_token_binding(token_binding.as_ref(), expected_token_binding)?;

    Ok(CollectedClientData {
        ty: raw.ty,
        challenge,
        origin: raw.origin,
        token_binding,
    })
}

fn decode_token_binding(raw: RawTokenBinding) -> Result<TokenBinding, VerificationError> {
    match raw.status.as_str() {
        "supported" => Ok(TokenBinding::Supported),
        "present" => match raw.id {
            Some(id) => Ok(TokenBinding::Present(id)),
            None => Err(VerificationError::JsonDecode(
                "tokenBinding status 'present' without an id".to_string(),
            )),
        },
        other => Err(VerificationError::JsonDecode(format!(
            "unknown tokenBinding status '{other}'"
        ))),
    }
}

/// Token-binding consistency matrix. A reported binding must be expected,
/// an expected binding must be reported, and the ids must match.
fn check_token_binding(
    reported: Option<&TokenBinding>,
    expected: Option<&str>,
) -> Result<(), VerificationError> {
    match (reported, expected) {
        (Some(TokenBinding::Present(id)), Some(expected_id)) => {
            if constant_time_eq(id.as_bytes(), expected_id.as_bytes()) {
                Ok(())
            } else {
                Err(VerificationError::MismatchedTokenBinding)
            }
        }
        (Some(TokenBinding::Present(_)), None) => {
            Err(VerificationError::UnexpectedPresenceOfTokenBinding)
        }
        (_, Some(_)) => Err(VerificationError::UnexpectedPresenceOfTokenBinding),
        (_, None) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn test_rp() -> RelyingParty {
        RelyingParty::from_id("example.com")
    }

    fn client_data_json(ty: &str, challenge: &str, origin: &str) -> Vec<u8> {
        format!(r#"{{"type":"{ty}","challenge":"{challenge}","origin":"{origin}"}}"#).into_bytes()
    }

    #[test]
    fn test_check_create_happy_path() {
        let challenge = Challenge::new(b"test".to_vec());
        let json = client_data_json("webauthn.create", "dGVzdA", "https://example.com");

        let cd = check(CeremonyType::Create, &challenge, &json, &test_rp(), None)
            .expect("check should pass");
        assert_eq!(cd.challenge, b"test");
        assert_eq!(cd.origin, "https://example.com");
        assert!(cd.token_binding.is_none());
    }

    #[test]
    fn test_check_rejects_invalid_json() {
        let challenge = Challenge::new(b"test".to_vec());
        let result = check(
            CeremonyType::Create,
            &challenge,
            b"not json",
            &test_rp(),
            None,
        );
        assert_matches!(result, Err(VerificationError::JsonDecode(_)));
    }

    #[test]
    fn test_check_rejects_wrong_ceremony_type() {
        let challenge = Challenge::new(b"test".to_vec());
        let json = client_data_json("webauthn.get", "dGVzdA", "https://example.com");

        let result = check(CeremonyType::Create, &challenge, &json, &test_rp(), None);
        assert_matches!(result, Err(VerificationError::InvalidType));
    }

    #[test]
    fn test_check_rejects_mismatched_challenge() {
        let challenge = Challenge::new(b"other".to_vec());
        let json = client_data_json("webauthn.create", "dGVzdA", "https://example.com");

        let result = check(CeremonyType::Create, &challenge, &json, &test_rp(), None);
        assert_matches!(result, Err(VerificationError::MismatchedChallenge));
    }

    #[test]
    fn test_check_rejects_mismatched_origin() {
        let challenge = Challenge::new(b"test".to_vec());
        let json = client_data_json("webauthn.create", "dGVzdA", "https://evil.example.net");

        let result = check(CeremonyType::Create, &challenge, &json, &test_rp(), None);
        assert_matches!(result, Err(VerificationError::MismatchedOrigin));
    }

    #[test]
    fn test_check_rejects_padded_challenge_encoding() {
        let challenge = Challenge::new(b"test".to_vec());
        // Padded base64 is not legal in clientDataJSON.
        let json = client_data_json("webauthn.create", "dGVzdA==", "https://example.com");

        let result = check(CeremonyType::Create, &challenge, &json, &test_rp(), None);
        assert_matches!(result, Err(VerificationError::JsonDecode(_)));
    }

    #[test]
    fn test_token_binding_present_and_matching() {
        let challenge = Challenge::new(b"test".to_vec());
        let json = r#"{"type":"webauthn.get","challenge":"dGVzdA","origin":"https://example.com",
               "tokenBinding":{"status":"present","id":"YmluZGluZw"}}"#.as_bytes().to_vec();

        let cd = check(
            CeremonyType::Get,
            &challenge,
            &json,
            &test_rp(),
            Some("YmluZGluZw"),
        )
        .expect("matching token binding should pass");
        assert_eq!(
            cd.token_binding,
            Some(TokenBinding::Present("YmluZGluZw".to_string()))
        );
    }

    #[test]
    fn test_token_binding_present_but_not_expected() {
        let challenge = Challenge::new(b"test".to_vec());
        let json = r#"{"type":"webauthn.get","challenge":"dGVzdA","origin":"https://example.com",
               "tokenBinding":{"status":"present","id":"YmluZGluZw"}}"#.as_bytes().to_vec();

        let result = check(CeremonyType::Get, &challenge, &json, &test_rp(), None);
        assert_matches!(
            result,
            Err(VerificationError::UnexpectedPresenceOfTokenBinding)
        );
    }

    #[test]
    fn test_token_binding_expected_but_only_supported() {
        let challenge = Challenge::new(b"test".to_vec());
        let json = r#"{"type":"webauthn.get","challenge":"dGVzdA","origin":"https://example.com",
               "tokenBinding":{"status":"supported"}}"#.as_bytes().to_vec();

        let result = check(
            CeremonyType::Get,
            &challenge,
            &json,
            &test_rp(),
            Some("YmluZGluZw"),
        );
        assert_matches!(
            result,
            Err(VerificationError::UnexpectedPresenceOfTokenBinding)
        );
    }

    #[test]
    fn test_token_binding_id_mismatch() {
        let challenge = Challenge::new(b"test".to_vec());
        let json = r#"{"type":"webauthn.get","challenge":"dGVzdA","origin":"https://example.com",
               "tokenBinding":{"status":"present","id":"b3RoZXI"}}"#.as_bytes().to_vec();

        let result = check(
            CeremonyType::Get,
            &challenge,
            &json,
            &test_rp(),
            Some("YmluZGluZw"),
        );
        assert_matches!(result, Err(VerificationError::MismatchedTokenBinding));
    }

    #[test]
    fn test_token_binding_unknown_status_rejected() {
        let challenge = Challenge::new(b"test".to_vec());
        let json = r#"{"type":"webauthn.get","challenge":"dGVzdA","origin":"https://example.com",
               "tokenBinding":{"status":"negotiated"}}"#.as_bytes().to_vec();

        let result = check(CeremonyType::Get, &challenge, &json, &test_rp(), None);
        assert_matches!(result, Err(VerificationError::JsonDecode(_)));
    }

    #[test]
    fn test_unknown_members_are_ignored() {
        let challenge = Challenge::new(b"test".to_vec());
        let json = r#"{"type":"webauthn.get","challenge":"dGVzdA","origin":"https://example.com",
               "crossOrigin":false,"other":123}"#.as_bytes().to_vec();

        assert!(check(CeremonyType::Get, &challenge, &json, &test_rp(), None).is_ok());
    }
}
