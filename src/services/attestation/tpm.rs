//! `tpm` attestation statement verifier
//!
//! A TPM 2.0 attestation identity key certifies the freshly created
//! credential key. Verification checks, in order:
//! - statement version is "2.0"
//! - `pubArea` (TPMT_PUBLIC) holds the same key as the credential
//! - `certInfo` (TPMS_ATTEST) is a CERTIFY attestation whose `extraData`
//!   binds the ceremony and whose `attested.name` names `pubArea`
//! - the AIK certificate meets the WebAuthn TPM profile
//! - `sig` verifies over `certInfo` under the AIK certificate

use byteorder::{BigEndian, ReadBytesExt};
use sha2::{Digest, Sha256, Sha384};
use std::io::{Cursor, Read};
use x509_parser::prelude::*;

use crate::error::VerificationError;
use crate::services::attestation::{collect_x5c, find_bytes, find_int, find_text};
use crate::services::authenticator_data::AuthenticatorData;
use crate::services::cert_store::{parse_certificate, verify_signature_with_cert};
use crate::services::cose::{CosePublicKey, COSE_ALG_ES256, COSE_ALG_RS256};

// TPM 2.0 constants (TPM_ALG_ID / TPM_ST / TPM_ECC_CURVE registries).
const TPM_GENERATED_VALUE: u32 = 0xFF54_4347;
const TPM_ST_ATTEST_CERTIFY: u16 = 0x8017;
const TPM_ALG_RSA: u16 = 0x0001;
const TPM_ALG_SHA256: u16 = 0x000B;
const TPM_ALG_SHA384: u16 = 0x000C;
const TPM_ALG_NULL: u16 = 0x0010;
const TPM_ALG_ECC: u16 = 0x0023;
const TPM_ECC_NIST_P256: u16 = 0x0003;

const TCG_AT_TPM_MANUFACTURER_RAW: &[u8] = &der_parser::oid!(raw 2.23.133 .2 .1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TpmStatement {
    pub ver: String,
    pub alg: i64,
    /// AIK certificate chain, leaf first.
    pub x5c: Vec<Vec<u8>>,
    pub sig: Vec<u8>,
    /// Raw TPMS_ATTEST bytes; the signature covers them verbatim.
    pub cert_info: Vec<u8>,
    /// Raw TPMT_PUBLIC bytes; hashed for the name check.
    pub pub_area: Vec<u8>,
}

pub(crate) fn decode(
    att_stmt: &[(ciborium::Value, ciborium::Value)],
) -> Result<TpmStatement, VerificationError> {
    let ver = find_text(att_stmt, "ver")
        .ok_or_else(|| VerificationError::cbor("tpm statement", "missing 'ver'"))?
        .to_string();
    let alg = find_int(att_stmt, "alg")
        .ok_or_else(|| VerificationError::cbor("tpm statement", "missing 'alg'"))?;
    let x5c = collect_x5c(att_stmt, "tpm statement")?
        .ok_or_else(|| VerificationError::cbor("tpm statement", "missing 'x5c'"))?;
    let sig = find_bytes(att_stmt, "sig")
        .ok_or_else(|| VerificationError::cbor("tpm statement", "missing 'sig'"))?
        .to_vec();
    let cert_info = find_bytes(att_stmt, "certInfo")
        .ok_or_else(|| VerificationError::cbor("tpm statement", "missing 'certInfo'"))?
        .to_vec();
    let pub_area = find_bytes(att_stmt, "pubArea")
        .ok_or_else(|| VerificationError::cbor("tpm statement", "missing 'pubArea'"))?
        .to_vec();

    Ok(TpmStatement {
        ver,
        alg,
        x5c,
        sig,
        cert_info,
        pub_area,
    })
}

pub(crate) fn verify(
    stmt: &TpmStatement,
    ad: &AuthenticatorData,
    auth_data_raw: &[u8],
    client_data_hash: &[u8; 32],
) -> Result<(), VerificationError> {
    if stmt.ver != "2.0" {
        return Err(VerificationError::InvalidTpmAttestation);
    }

    let credential = ad
        .attested_credential_data
        .as_ref()
        .ok_or(VerificationError::MalformedAuthenticatorData)?;
    let credential_key = CosePublicKey::decode(credential.credential_public_key.as_bytes())?;

    let pub_area = parse_tpmt_public(&stmt.pub_area)?;
    check_pub_area_matches_credential(&pub_area, &credential_key)?;

    let attest = parse_tpms_attest(&stmt.cert_info)?;
    if attest.magic != TPM_GENERATED_VALUE || attest.attest_type != TPM_ST_ATTEST_CERTIFY {
        return Err(VerificationError::InvalidTpmAttestation);
    }

    // extraData binds the ceremony: the hash (selected by `alg`) of the
    // attestation message.
    let mut message = auth_data_raw.to_vec();
    message.extend_from_slice(client_data_hash);
    if attest.extra_data != digest_by_cose_alg(stmt.alg, &message)? {
        return Err(VerificationError::InvalidTpmAttestation);
    }

    // attested.name = nameAlg identifier || H_nameAlg(pubArea).
    if attest.attested_name.len() < 2 {
        return Err(VerificationError::InvalidTpmAttestation);
    }
    let name_alg = u16::from_be_bytes(
        attest.attested_name[0..2]
            .try_into()
            .map_err(|_| VerificationError::InvalidTpmAttestation)?,
    );
    if attest.attested_name[2..] != digest_by_tpm_alg(name_alg, &stmt.pub_area)? {
        return Err(VerificationError::InvalidTpmAttestation);
    }

    let leaf = parse_certificate(&stmt.x5c[0])?;
    check_aik_certificate(&leaf)?;

    verify_signature_with_cert(&leaf, stmt.alg, &stmt.cert_info, &stmt.sig)
}

// ============================================================================
// TPM binary structures
// ============================================================================

/// Key material from a TPMT_PUBLIC structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TpmPublicKey {
    Rsa { modulus: Vec<u8>, exponent: u64 },
    Ecc { curve_id: u16, x: Vec<u8>, y: Vec<u8> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TpmtPublic {
    pub name_alg: u16,
    pub key: TpmPublicKey,
}

/// Attestation fields from a TPMS_ATTEST structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TpmsAttest {
    pub magic: u32,
    pub attest_type: u16,
    pub extra_data: Vec<u8>,
    pub attested_name: Vec<u8>,
}

fn read_u8(cursor: &mut Cursor<&[u8]>) -> Result<u8, VerificationError> {
    cursor
        .read_u8()
        .map_err(|_| VerificationError::InvalidTpmAttestation)
}

fn read_u16(cursor: &mut Cursor<&[u8]>) -> Result<u16, VerificationError> {
    cursor
        .read_u16::<BigEndian>()
        .map_err(|_| VerificationError::InvalidTpmAttestation)
}

fn read_u32(cursor: &mut Cursor<&[u8]>) -> Result<u32, VerificationError> {
    cursor
        .read_u32::<BigEndian>()
        .map_err(|_| VerificationError::InvalidTpmAttestation)
}

fn read_u64(cursor: &mut Cursor<&[u8]>) -> Result<u64, VerificationError> {
    cursor
        .read_u64::<BigEndian>()
        .map_err(|_| VerificationError::InvalidTpmAttestation)
}

/// Reads a TPM2B sized buffer (u16 length prefix).
fn read_tpm2b(cursor: &mut Cursor<&[u8]>) -> Result<Vec<u8>, VerificationError> {
    let len = read_u16(cursor)? as usize;
    let mut buf = vec![0u8; len];
    cursor
        .read_exact(&mut buf)
        .map_err(|_| VerificationError::InvalidTpmAttestation)?;
    Ok(buf)
}

/// Reads a TPMT_SYM_DEF_OBJECT: algorithm, plus key bits and mode when the
/// algorithm is not TPM_ALG_NULL.
fn skip_sym_def_object(cursor: &mut Cursor<&[u8]>) -> Result<(), VerificationError> {
    if read_u16(cursor)? != TPM_ALG_NULL {
        read_u16(cursor)?;
        read_u16(cursor)?;
    }
    Ok(())
}

/// Reads a TPMT scheme (RSA, ECC, or KDF): scheme id plus a hash algorithm
/// when the scheme is not TPM_ALG_NULL.
fn skip_scheme(cursor: &mut Cursor<&[u8]>) -> Result<(), VerificationError> {
    if read_u16(cursor)? != TPM_ALG_NULL {
        read_u16(cursor)?;
    }
    Ok(())
}

fn expect_consumed(cursor: &Cursor<&[u8]>) -> Result<(), VerificationError> {
    if cursor.position() != cursor.get_ref().len() as u64 {
        return Err(VerificationError::InvalidTpmAttestation);
    }
    Ok(())
}

/// Parses a TPMT_PUBLIC structure.
pub(crate) fn parse_tpmt_public(data: &[u8]) -> Result<TpmtPublic, VerificationError> {
    let mut cursor = Cursor::new(data);

    let key_type = read_u16(&mut cursor)?;
    let name_alg = read_u16(&mut cursor)?;
    let _object_attributes = read_u32(&mut cursor)?;
    let _auth_policy = read_tpm2b(&mut cursor)?;

    let key = match key_type {
        TPM_ALG_RSA => {
            skip_sym_def_object(&mut cursor)?;
            skip_scheme(&mut cursor)?;
            let _key_bits = read_u16(&mut cursor)?;
            let exponent = match read_u32(&mut cursor)? {
                0 => 65537,
                e => u64::from(e),
            };
            let modulus = read_tpm2b(&mut cursor)?;
            TpmPublicKey::Rsa { modulus, exponent }
        }
        TPM_ALG_ECC => {
            skip_sym_def_object(&mut cursor)?;
            skip_scheme(&mut cursor)?;
            let curve_id = read_u16(&mut cursor)?;
            skip_scheme(&mut cursor)?;
            let x = read_tpm2b(&mut cursor)?;
            let y = read_tpm2b(&mut cursor)?;
            TpmPublicKey::Ecc { curve_id, x, y }
        }
        _ => return Err(VerificationError::InvalidTpmAttestation),
    };

    expect_consumed(&cursor)?;
    Ok(TpmtPublic { name_alg, key })
}

/// Parses a TPMS_ATTEST structure.
pub(crate) fn parse_tpms_attest(data: &[u8]) -> Result<TpmsAttest, VerificationError> {
    let mut cursor = Cursor::new(data);

    let magic = read_u32(&mut cursor)?;
    let attest_type = read_u16(&mut cursor)?;
    let _qualified_signer = read_tpm2b(&mut cursor)?;
    let extra_data = read_tpm2b(&mut cursor)?;
    // TPMS_CLOCK_INFO: clock, resetCount, restartCount, safe.
    let _clock = read_u64(&mut cursor)?;
    let _reset_count = read_u32(&mut cursor)?;
    let _restart_count = read_u32(&mut cursor)?;
    let _safe = read_u8(&mut cursor)?;
    let _firmware_version = read_u64(&mut cursor)?;
    // TPMS_CERTIFY_INFO: name, qualifiedName.
    let attested_name = read_tpm2b(&mut cursor)?;
    let _qualified_name = read_tpm2b(&mut cursor)?;

    expect_consumed(&cursor)?;
    Ok(TpmsAttest {
        magic,
        attest_type,
        extra_data,
        attested_name,
    })
}

// ============================================================================
// Checks
// ============================================================================

/// The TPM-certified key must be the credential key, parameter-wise.
fn check_pub_area_matches_credential(
    pub_area: &TpmtPublic,
    credential_key: &CosePublicKey,
) -> Result<(), VerificationError> {
    let matches = match (&pub_area.key, credential_key) {
        (TpmPublicKey::Rsa { modulus, exponent }, CosePublicKey::Rs256 { n, e }) => {
            trim_leading_zeros(modulus) == trim_leading_zeros(n)
                && Some(*exponent) == exponent_bytes_to_u64(e)
        }
        (TpmPublicKey::Ecc { curve_id, x, y }, CosePublicKey::Es256 { x: kx, y: ky }) => {
            *curve_id == TPM_ECC_NIST_P256
                && trim_leading_zeros(x) == trim_leading_zeros(kx.as_slice())
                && trim_leading_zeros(y) == trim_leading_zeros(ky.as_slice())
        }
        _ => false,
    };

    if matches {
        Ok(())
    } else {
        Err(VerificationError::InvalidTpmAttestation)
    }
}

fn trim_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}

fn exponent_bytes_to_u64(e: &[u8]) -> Option<u64> {
    let e = trim_leading_zeros(e);
    if e.len() > 8 {
        return None;
    }
    Some(e.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
}

// Restricted to the algorithms `verify_signature_with_cert` can dispatch;
// both hash with SHA-256.
fn digest_by_cose_alg(cose_alg: i64, data: &[u8]) -> Result<Vec<u8>, VerificationError> {
    match cose_alg {
        COSE_ALG_ES256 | COSE_ALG_RS256 => Ok(Sha256::digest(data).to_vec()),
        _ => Err(VerificationError::InvalidTpmAttestation),
    }
}

fn digest_by_tpm_alg(tpm_alg: u16, data: &[u8]) -> Result<Vec<u8>, VerificationError> {
    match tpm_alg {
        TPM_ALG_SHA256 => Ok(Sha256::digest(data).to_vec()),
        TPM_ALG_SHA384 => Ok(Sha384::digest(data).to_vec()),
        _ => Err(VerificationError::InvalidTpmAttestation),
    }
}

/// WebAuthn TPM attestation certificate profile: version 3, empty subject,
/// critical SAN carrying the TCG manufacturer attribute, the
/// tcg-kp-AIKCertificate EKU, and CA=false.
fn check_aik_certificate(cert: &X509Certificate<'_>) -> Result<(), VerificationError> {
    if cert.version != X509Version::V3 {
        return Err(VerificationError::InvalidTpmAttestation);
    }

    if cert.subject().iter_attributes().next().is_some() {
        return Err(VerificationError::InvalidTpmAttestation);
    }

    let san = cert
        .subject_alternative_name()
        .map_err(|_| VerificationError::InvalidTpmAttestation)?
        .ok_or(VerificationError::InvalidTpmAttestation)?;
    let has_manufacturer = san.value.general_names.iter().any(|name| {
        if let GeneralName::DirectoryName(dir_name) = name {
            dir_name
                .iter_attributes()
                .any(|attr| attr.attr_type().as_bytes() == TCG_AT_TPM_MANUFACTURER_RAW)
        } else {
            false
        }
    });
    if !has_manufacturer {
        return Err(VerificationError::InvalidTpmAttestation);
    }

    let eku = cert
        .extended_key_usage()
        .map_err(|_| VerificationError::InvalidTpmAttestation)?
        .ok_or(VerificationError::InvalidTpmAttestation)?;
    if !eku.value.other.contains(&der_parser::oid!(2.23.133 .8 .3)) {
        return Err(VerificationError::InvalidTpmAttestation);
    }

    let basic_constraints = cert
        .basic_constraints()
        .map_err(|_| VerificationError::InvalidTpmAttestation)?;
    if basic_constraints.map(|bc| bc.value.ca).unwrap_or(false) {
        return Err(VerificationError::InvalidTpmAttestation);
    }

    Ok(())
}
