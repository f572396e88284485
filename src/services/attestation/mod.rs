//! Attestation object decoding and format dispatch
//!
//! Decodes the registration `attestationObject` CBOR envelope
//! `{fmt, attStmt, authData}` and dispatches to the format-specific
//! verifier. The raw `authData` bytes are preserved verbatim because they
//! are an input to every format's signature.

pub mod fido_u2f;
pub mod packed;
pub mod safetynet;
pub mod tpm;

use ciborium::Value;

use crate::error::VerificationError;
use crate::services::authenticator_data::AuthenticatorData;
use crate::services::cert_store::CertificateStore;

pub use fido_u2f::FidoU2fStatement;
pub use packed::PackedStatement;
pub use safetynet::SafetyNetStatement;
pub use tpm::TpmStatement;

/// Format-specific attestation statement. The variant set is closed; a new
/// format means a new variant with its own verifier module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttestationStatement {
    Packed(PackedStatement),
    Tpm(TpmStatement),
    FidoU2f(FidoU2fStatement),
    AndroidSafetyNet(SafetyNetStatement),
    None,
}

impl AttestationStatement {
    /// The wire identifier of this statement's format.
    pub fn format(&self) -> &'static str {
        match self {
            AttestationStatement::Packed(_) => "packed",
            AttestationStatement::Tpm(_) => "tpm",
            AttestationStatement::FidoU2f(_) => "fido-u2f",
            AttestationStatement::AndroidSafetyNet(_) => "android-safetynet",
            AttestationStatement::None => "none",
        }
    }
}

/// Decoded `attestationObject`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestationObject {
    /// Raw authenticator data, preserved byte-for-byte for signatures.
    pub auth_data_raw: Vec<u8>,
    pub statement: AttestationStatement,
}

/// Decodes the attestation object envelope and its format-specific
/// statement. Unknown formats (including the enumerated but unimplemented
/// `android-key`) fail with `UnsupportedAttestationFormat`.
pub fn decode(attestation_object: &[u8]) -> Result<AttestationObject, VerificationError> {
    let value: Value = ciborium::from_reader(attestation_object)
        .map_err(|e| VerificationError::cbor("attestation object", e))?;
    let map = value
        .as_map()
        .ok_or_else(|| VerificationError::cbor("attestation object", "expected a CBOR map"))?;

    let fmt = find_text(map, "fmt")
        .ok_or_else(|| VerificationError::cbor("attestation object", "missing 'fmt'"))?;
    let auth_data_raw = find_bytes(map, "authData")
        .ok_or_else(|| VerificationError::cbor("attestation object", "missing 'authData'"))?
        .to_vec();
    let att_stmt = find_map(map, "attStmt")
        .ok_or_else(|| VerificationError::cbor("attestation object", "missing 'attStmt'"))?;

    let statement = match fmt {
        "packed" => AttestationStatement::Packed(packed::decode(att_stmt)?),
        "tpm" => AttestationStatement::Tpm(tpm::decode(att_stmt)?),
        "fido-u2f" => AttestationStatement::FidoU2f(fido_u2f::decode(att_stmt)?),
        "android-safetynet" => AttestationStatement::AndroidSafetyNet(safetynet::decode(att_stmt)?),
        "none" => AttestationStatement::None,
        other => {
            return Err(VerificationError::UnsupportedAttestationFormat(
                other.to_string(),
            ))
        }
    };

    Ok(AttestationObject {
        auth_data_raw,
        statement,
    })
}

/// Runs the format-specific verifier for a decoded attestation object.
pub fn verify_statement(
    object: &AttestationObject,
    ad: &AuthenticatorData,
    client_data_hash: &[u8; 32],
    cert_store: &CertificateStore,
) -> Result<(), VerificationError> {
    match &object.statement {
        AttestationStatement::Packed(stmt) => {
            packed::verify(stmt, ad, &object.auth_data_raw, client_data_hash)
        }
        AttestationStatement::Tpm(stmt) => {
            tpm::verify(stmt, ad, &object.auth_data_raw, client_data_hash)
        }
        AttestationStatement::FidoU2f(stmt) => {
            fido_u2f::verify(stmt, ad, client_data_hash)
        }
        AttestationStatement::AndroidSafetyNet(stmt) => {
            safetynet::verify(stmt, &object.auth_data_raw, client_data_hash, cert_store)
        }
        AttestationStatement::None => Ok(()),
    }
}

// ============================================================================
// CBOR map helpers
// ============================================================================

pub(crate) fn find_text<'a>(map: &'a [(Value, Value)], key: &str) -> Option<&'a str> {
    map.iter()
        .find(|(k, _)| k.as_text() == Some(key))
        .and_then(|(_, v)| v.as_text())
}

pub(crate) fn find_bytes<'a>(map: &'a [(Value, Value)], key: &str) -> Option<&'a [u8]> {
    map.iter()
        .find(|(k, _)| k.as_text() == Some(key))
        .and_then(|(_, v)| v.as_bytes())
        .map(|v| v.as_slice())
}

pub(crate) fn find_map<'a>(map: &'a [(Value, Value)], key: &str) -> Option<&'a [(Value, Value)]> {
    map.iter()
        .find(|(k, _)| k.as_text() == Some(key))
        .and_then(|(_, v)| v.as_map())
        .map(|v| v.as_slice())
}

pub(crate) fn find_int(map: &[(Value, Value)], key: &str) -> Option<i64> {
    map.iter()
        .find(|(k, _)| k.as_text() == Some(key))
        .and_then(|(_, v)| v.as_integer())
        .and_then(|i| i.try_into().ok())
}

/// Collects an `x5c` entry into DER certificate bytes, leaf first.
///
/// An absent key is `Ok(None)`; a present key that is not an array is a
/// decode error, so a malformed field can never reroute a verifier onto
/// its no-certificate path.
pub(crate) fn collect_x5c(
    map: &[(Value, Value)],
    context: &'static str,
) -> Result<Option<Vec<Vec<u8>>>, VerificationError> {
    let Some((_, value)) = map.iter().find(|(k, _)| k.as_text() == Some("x5c")) else {
        return Ok(None);
    };
    let array = value
        .as_array()
        .ok_or_else(|| VerificationError::cbor(context, "x5c is not an array"))?;

    let mut certs = Vec::with_capacity(array.len());
    for entry in array {
        let der = entry
            .as_bytes()
            .ok_or_else(|| VerificationError::cbor(context, "x5c entry is not a byte string"))?;
        certs.push(der.clone());
    }
    if certs.is_empty() {
        return Err(VerificationError::cbor(context, "x5c is empty"));
    }
    Ok(Some(certs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn encode_map(entries: Vec<(Value, Value)>) -> Vec<u8> {
        let mut out = Vec::new();
        ciborium::into_writer(&Value::Map(entries), &mut out).unwrap();
        out
    }

    fn attestation_object(fmt: &str, auth_data: &[u8], att_stmt: Vec<(Value, Value)>) -> Vec<u8> {
        encode_map(vec![
            (Value::Text("fmt".into()), Value::Text(fmt.into())),
            (Value::Text("attStmt".into()), Value::Map(att_stmt)),
            (
                Value::Text("authData".into()),
                Value::Bytes(auth_data.to_vec()),
            ),
        ])
    }

    #[test]
    fn test_decode_rejects_non_cbor() {
        assert_matches!(
            decode(&[0xFF, 0xFF]),
            Err(VerificationError::CborDecode { .. })
        );
    }

    #[test]
    fn test_decode_rejects_missing_fmt() {
        let object = encode_map(vec![(
            Value::Text("authData".into()),
            Value::Bytes(vec![0; 37]),
        )]);
        assert_matches!(
            decode(&object),
            Err(VerificationError::CborDecode { .. })
        );
    }

    #[test]
    fn test_decode_rejects_unknown_format() {
        let object = attestation_object("apple-appattest", &[0; 37], vec![]);
        assert_matches!(
            decode(&object),
            Err(VerificationError::UnsupportedAttestationFormat(fmt)) if fmt == "apple-appattest"
        );
    }

    #[test]
    fn test_decode_android_key_is_unsupported() {
        let object = attestation_object("android-key", &[0; 37], vec![]);
        assert_matches!(
            decode(&object),
            Err(VerificationError::UnsupportedAttestationFormat(fmt)) if fmt == "android-key"
        );
    }

    #[test]
    fn test_decode_none_format() {
        let object = attestation_object("none", &[1, 2, 3], vec![]);
        let decoded = decode(&object).expect("none format decodes");
        assert_eq!(decoded.statement, AttestationStatement::None);
        assert_eq!(decoded.statement.format(), "none");
        assert_eq!(decoded.auth_data_raw, vec![1, 2, 3]);
    }
}
