//! COSE public key decoding and signature verification
//!
//! Decodes the credential's COSE_Key CBOR map and dispatches signature
//! checks to the matching primitive:
//! - EC2 / P-256 / ES256  (ECDSA over SHA-256, DER or raw `r || s`)
//! - RSA / RS256          (PKCS#1 v1.5 over SHA-256)
//! - OKP / Ed25519 / EdDSA (raw 64-byte signatures)
//!
//! The message is always a byte string assembled by the caller; for
//! assertions it is `authData || SHA256(clientDataJSON)`.

use coset::iana;
use coset::{Algorithm, CborSerializable, CoseKey, KeyType, Label};
use ed25519_dalek::Verifier as _;
use p256::ecdsa::signature::Verifier as _;
use rsa::{BigUint, Pkcs1v15Sign, RsaPublicKey};
use sha2::{Digest, Sha256};

use crate::error::VerificationError;

/// COSE algorithm identifiers used on the wire.
pub const COSE_ALG_ES256: i64 = -7;
pub const COSE_ALG_EDDSA: i64 = -8;
pub const COSE_ALG_RS256: i64 = -257;

const COSE_CRV_P256: i64 = 1;
const COSE_CRV_ED25519: i64 = 6;

/// A decoded credential public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CosePublicKey {
    Es256 { x: [u8; 32], y: [u8; 32] },
    Rs256 { n: Vec<u8>, e: Vec<u8> },
    Ed25519 { x: [u8; 32] },
}

impl CosePublicKey {
    /// Decodes a COSE_Key CBOR map. Unrecognized key types, curves, or
    /// algorithms are `MalformedPublicKey`.
    pub fn decode(cose_key_cbor: &[u8]) -> Result<Self, VerificationError> {
        let key = CoseKey::from_slice(cose_key_cbor)
            .map_err(|_| VerificationError::MalformedPublicKey)?;

        let alg = match key.alg {
            Some(Algorithm::Assigned(alg)) => alg as i64,
            _ => return Err(VerificationError::MalformedPublicKey),
        };

        match key.kty {
            KeyType::Assigned(iana::KeyType::EC2) => {
                if alg != COSE_ALG_ES256 || param_int(&key, -1)? != COSE_CRV_P256 {
                    return Err(VerificationError::MalformedPublicKey);
                }
                Ok(CosePublicKey::Es256 {
                    x: param_bytes_fixed::<32>(&key, -2)?,
                    y: param_bytes_fixed::<32>(&key, -3)?,
                })
            }
            KeyType::Assigned(iana::KeyType::RSA) => {
                if alg != COSE_ALG_RS256 {
                    return Err(VerificationError::MalformedPublicKey);
                }
                Ok(CosePublicKey::Rs256 {
                    n: param_bytes(&key, -1)?,
                    e: param_bytes(&key, -2)?,
                })
            }
            KeyType::Assigned(iana::KeyType::OKP) => {
                if alg != COSE_ALG_EDDSA || param_int(&key, -1)? != COSE_CRV_ED25519 {
                    return Err(VerificationError::MalformedPublicKey);
                }
                Ok(CosePublicKey::Ed25519 {
                    x: param_bytes_fixed::<32>(&key, -2)?,
                })
            }
            _ => Err(VerificationError::MalformedPublicKey),
        }
    }

    /// The COSE algorithm identifier this key verifies under.
    pub fn cose_alg(&self) -> i64 {
        match self {
            CosePublicKey::Es256 { .. } => COSE_ALG_ES256,
            CosePublicKey::Rs256 { .. } => COSE_ALG_RS256,
            CosePublicKey::Ed25519 { .. } => COSE_ALG_EDDSA,
        }
    }

    /// Uncompressed SEC1 point `0x04 || x || y`, for formats that need the
    /// raw EC key (FIDO U2F). Only meaningful for ES256 keys.
    pub fn to_uncompressed_point(&self) -> Option<[u8; 65]> {
        match self {
            CosePublicKey::Es256 { x, y } => {
                let mut point = [0u8; 65];
                point[0] = 0x04;
                point[1..33].copy_from_slice(x);
                point[33..65].copy_from_slice(y);
                Some(point)
            }
            _ => None,
        }
    }

    /// Verifies `signature` over `message` under this key.
    pub fn verify_signature(
        &self,
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), VerificationError> {
        match self {
            CosePublicKey::Es256 { .. } => {
                let point = self
                    .to_uncompressed_point()
                    .ok_or(VerificationError::MalformedPublicKey)?;
                verify_es256(&point, message, signature)
            }
            CosePublicKey::Rs256 { n, e } => verify_rs256(n, e, message, signature),
            CosePublicKey::Ed25519 { x } => {
                let key = ed25519_dalek::VerifyingKey::from_bytes(x)
                    .map_err(|_| VerificationError::MalformedPublicKey)?;
                let sig = ed25519_dalek::Signature::from_slice(signature)
                    .map_err(|_| VerificationError::MalformedSignature)?;
                key.verify(message, &sig)
                    .map_err(|_| VerificationError::SignatureFailure)
            }
        }
    }
}

/// ECDSA-SHA256 verification over an uncompressed P-256 point.
pub fn verify_es256(
    sec1_point: &[u8],
    message: &[u8],
    signature: &[u8],
) -> Result<(), VerificationError> {
    let key = p256::ecdsa::VerifyingKey::from_sec1_bytes(sec1_point)
        .map_err(|_| VerificationError::MalformedPublicKey)?;
    let sig = parse_es256_signature(signature)?;
    key.verify(message, &sig)
        .map_err(|_| VerificationError::SignatureFailure)
}

/// RSASSA-PKCS1-v1_5 with SHA-256 from raw modulus and exponent bytes.
pub fn verify_rs256(
    n: &[u8],
    e: &[u8],
    message: &[u8],
    signature: &[u8],
) -> Result<(), VerificationError> {
    let key = RsaPublicKey::new(BigUint::from_bytes_be(n), BigUint::from_bytes_be(e))
        .map_err(|_| VerificationError::MalformedPublicKey)?;
    let digest = Sha256::digest(message);
    key.verify(Pkcs1v15Sign::new::<Sha256>(), &digest, signature)
        .map_err(|_| VerificationError::SignatureFailure)
}

/// Parses an ES256 signature: DER first, raw 64-byte `r || s` fallback.
fn parse_es256_signature(sig_bytes: &[u8]) -> Result<p256::ecdsa::Signature, VerificationError> {
    if let Ok(sig) = p256::ecdsa::Signature::from_der(sig_bytes) {
        return Ok(sig);
    }

    if sig_bytes.len() == 64 {
        if let Ok(sig) = p256::ecdsa::Signature::from_slice(sig_bytes) {
            return Ok(sig);
        }
    }

    Err(VerificationError::MalformedSignature)
}

fn param_int(key: &CoseKey, label: i64) -> Result<i64, VerificationError> {
    key.params
        .iter()
        .find(|(l, _)| *l == Label::Int(label))
        .and_then(|(_, v)| v.as_integer())
        .and_then(|i| i.try_into().ok())
        .ok_or(VerificationError::MalformedPublicKey)
}

fn param_bytes(key: &CoseKey, label: i64) -> Result<Vec<u8>, VerificationError> {
    key.params
        .iter()
        .find(|(l, _)| *l == Label::Int(label))
        .and_then(|(_, v)| v.as_bytes())
        .map(|b| b.to_vec())
        .ok_or(VerificationError::MalformedPublicKey)
}

fn param_bytes_fixed<const N: usize>(
    key: &CoseKey,
    label: i64,
) -> Result<[u8; N], VerificationError> {
    param_bytes(key, label)?
        .as_slice()
        .try_into()
        .map_err(|_| VerificationError::MalformedPublicKey)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use coset::CoseKeyBuilder;
    use p256::ecdsa::signature::Signer as _;
    use p256::ecdsa::SigningKey;

    fn test_signing_key() -> SigningKey {
        SigningKey::from_slice(&[0x11; 32]).expect("fixed scalar is a valid key")
    }

    fn es256_cose_key(signing_key: &SigningKey) -> Vec<u8> {
        let point = signing_key.verifying_key().to_encoded_point(false);
        CoseKeyBuilder::new_ec2_pub_key(
            iana::EllipticCurve::P_256,
            point.x().expect("uncompressed").as_slice().to_vec(),
            point.y().expect("uncompressed").as_slice().to_vec(),
        )
        .algorithm(iana::Algorithm::ES256)
        .build()
        .to_vec()
        .expect("COSE key serializes")
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert_matches!(
            CosePublicKey::decode(&[0xFF, 0xFF]),
            Err(VerificationError::MalformedPublicKey)
        );
    }

    #[test]
    fn test_decode_rejects_missing_algorithm() {
        let key = CoseKeyBuilder::new_ec2_pub_key(
            iana::EllipticCurve::P_256,
            vec![0u8; 32],
            vec![0u8; 32],
        )
        .build()
        .to_vec()
        .expect("COSE key serializes");

        assert_matches!(
            CosePublicKey::decode(&key),
            Err(VerificationError::MalformedPublicKey)
        );
    }

    #[test]
    fn test_decode_rejects_unknown_curve() {
        let key = CoseKeyBuilder::new_ec2_pub_key(
            iana::EllipticCurve::P_384,
            vec![0u8; 48],
            vec![0u8; 48],
        )
        .algorithm(iana::Algorithm::ES256)
        .build()
        .to_vec()
        .expect("COSE key serializes");

        assert_matches!(
            CosePublicKey::decode(&key),
            Err(VerificationError::MalformedPublicKey)
        );
    }

    #[test]
    fn test_decode_es256_key() {
        let signing_key = test_signing_key();
        let decoded = CosePublicKey::decode(&es256_cose_key(&signing_key))
            .expect("well-formed key decodes");
        assert_eq!(decoded.cose_alg(), COSE_ALG_ES256);

        let point = decoded.to_uncompressed_point().expect("EC2 key");
        let expected = signing_key.verifying_key().to_encoded_point(false);
        assert_eq!(&point[..], expected.as_bytes());
    }

    #[test]
    fn test_es256_verify_der_signature() {
        let signing_key = test_signing_key();
        let key = CosePublicKey::decode(&es256_cose_key(&signing_key)).expect("decodes");

        let message = b"message under test";
        let sig: p256::ecdsa::Signature = signing_key.sign(message);

        assert!(key
            .verify_signature(message, sig.to_der().as_bytes())
            .is_ok());
    }

    #[test]
    fn test_es256_verify_raw_signature() {
        let signing_key = test_signing_key();
        let key = CosePublicKey::decode(&es256_cose_key(&signing_key)).expect("decodes");

        let message = b"message under test";
        let sig: p256::ecdsa::Signature = signing_key.sign(message);

        assert!(key.verify_signature(message, &sig.to_bytes()).is_ok());
    }

    #[test]
    fn test_es256_rejects_wrong_message() {
        let signing_key = test_signing_key();
        let key = CosePublicKey::decode(&es256_cose_key(&signing_key)).expect("decodes");

        let sig: p256::ecdsa::Signature = signing_key.sign(b"signed message");
        let result = key.verify_signature(b"different message", sig.to_der().as_bytes());
        assert_matches!(result, Err(VerificationError::SignatureFailure));
    }

    #[test]
    fn test_es256_rejects_undecodable_signature() {
        let signing_key = test_signing_key();
        let key = CosePublicKey::decode(&es256_cose_key(&signing_key)).expect("decodes");

        let result = key.verify_signature(b"message", &[0x01, 0x02, 0x03]);
        assert_matches!(result, Err(VerificationError::MalformedSignature));
    }

    #[test]
    fn test_ed25519_roundtrip() {
        use ed25519_dalek::Signer as _;

        let signing_key = ed25519_dalek::SigningKey::from_bytes(&[0x42; 32]);
        let key = CosePublicKey::Ed25519 {
            x: signing_key.verifying_key().to_bytes(),
        };

        let message = b"eddsa message";
        let sig = signing_key.sign(message);

        assert!(key.verify_signature(message, &sig.to_bytes()).is_ok());
        assert_matches!(
            key.verify_signature(b"other", &sig.to_bytes()),
            Err(VerificationError::SignatureFailure)
        );
    }
}
