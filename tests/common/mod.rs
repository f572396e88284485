//! Shared ceremony builders for the integration suites.
//!
//! Fabricates complete WebAuthn artifacts in-process: real keys, real
//! signatures, hand-encoded authenticator data, and CBOR attestation
//! objects.
#![allow(dead_code)] // each suite uses a different subset of builders

use ciborium::Value;
use coset::iana;
use coset::{CborSerializable, CoseKeyBuilder};
use p256::ecdsa::SigningKey;
use sha2::{Digest, Sha256};

use webauthn_rp_core::Challenge;

pub const FLAG_UP: u8 = 0x01;
pub const FLAG_UV: u8 = 0x04;
pub const FLAG_AT: u8 = 0x40;

/// Deterministic P-256 signing key for ceremony fabrication.
pub fn es256_signing_key() -> SigningKey {
    SigningKey::from_slice(&[0x2A; 32]).expect("fixed scalar is a valid P-256 key")
}

/// COSE_Key encoding of a P-256 verifying key.
pub fn es256_cose_key(signing_key: &SigningKey) -> Vec<u8> {
    let point = signing_key.verifying_key().to_encoded_point(false);
    CoseKeyBuilder::new_ec2_pub_key(
        iana::EllipticCurve::P_256,
        point.x().expect("uncompressed point").as_slice().to_vec(),
        point.y().expect("uncompressed point").as_slice().to_vec(),
    )
    .algorithm(iana::Algorithm::ES256)
    .build()
    .to_vec()
    .expect("COSE key serializes")
}

/// COSE_Key encoding of an Ed25519 verifying key
/// (kty OKP, alg EdDSA, crv Ed25519).
pub fn ed25519_cose_key(verifying_key: &ed25519_dalek::VerifyingKey) -> Vec<u8> {
    encode_cbor_map(vec![
        (Value::Integer(1.into()), Value::Integer(1.into())),
        (Value::Integer(3.into()), Value::Integer((-8).into())),
        (Value::Integer((-1).into()), Value::Integer(6.into())),
        (
            Value::Integer((-2).into()),
            Value::Bytes(verifying_key.to_bytes().to_vec()),
        ),
    ])
}

/// COSE_Key encoding of an RSA public key (kty RSA, alg RS256).
pub fn rs256_cose_key(n: Vec<u8>, e: Vec<u8>) -> Vec<u8> {
    encode_cbor_map(vec![
        (Value::Integer(1.into()), Value::Integer(3.into())),
        (Value::Integer(3.into()), Value::Integer((-257).into())),
        (Value::Integer((-1).into()), Value::Bytes(n)),
        (Value::Integer((-2).into()), Value::Bytes(e)),
    ])
}

/// Encodes authenticator data: header only, or with attested credential
/// data when `attested` is given.
pub fn auth_data(
    rp_id: &str,
    flags: u8,
    sign_count: u32,
    attested: Option<(&[u8; 16], &[u8], &[u8])>,
) -> Vec<u8> {
    let mut out = Vec::new();
    let rp_id_hash: [u8; 32] = Sha256::digest(rp_id.as_bytes()).into();
    out.extend_from_slice(&rp_id_hash);
    out.push(if attested.is_some() {
        flags | FLAG_AT
    } else {
        flags
    });
    out.extend_from_slice(&sign_count.to_be_bytes());
    if let Some((aaguid, credential_id, cose_key)) = attested {
        out.extend_from_slice(aaguid);
        out.extend_from_slice(&(credential_id.len() as u16).to_be_bytes());
        out.extend_from_slice(credential_id);
        out.extend_from_slice(cose_key);
    }
    out
}

/// Client data JSON the way a browser encodes it.
pub fn client_data_json(ceremony_type: &str, challenge: &Challenge, origin: &str) -> Vec<u8> {
    serde_json::json!({
        "type": ceremony_type,
        "challenge": challenge.to_base64url(),
        "origin": origin,
        "crossOrigin": false,
    })
    .to_string()
    .into_bytes()
}

/// CBOR attestation object `{fmt, attStmt, authData}`.
pub fn attestation_object(fmt: &str, auth_data: &[u8], att_stmt: Vec<(Value, Value)>) -> Vec<u8> {
    encode_cbor_map(vec![
        (Value::Text("fmt".into()), Value::Text(fmt.into())),
        (Value::Text("attStmt".into()), Value::Map(att_stmt)),
        (
            Value::Text("authData".into()),
            Value::Bytes(auth_data.to_vec()),
        ),
    ])
}

/// `authData || SHA256(clientDataJSON)`, the assertion signature base.
pub fn signature_base(auth_data: &[u8], client_data_json: &[u8]) -> Vec<u8> {
    let mut message = auth_data.to_vec();
    message.extend_from_slice(&Sha256::digest(client_data_json));
    message
}

fn encode_cbor_map(entries: Vec<(Value, Value)>) -> Vec<u8> {
    let mut out = Vec::new();
    ciborium::into_writer(&Value::Map(entries), &mut out).expect("CBOR map serializes");
    out
}
