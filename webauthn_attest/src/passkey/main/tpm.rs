//! Decoders for the TPM 2.0 structures carried by the `tpm` attestation
//! format: `TPMS_ATTEST` (certInfo) and `TPMT_PUBLIC` (pubArea).
//!
//! All integers are big-endian. Variable-length fields are `TPM2B` buffers,
//! a `u16` size followed by that many bytes.

use ring::digest;

use crate::passkey::errors::WebAuthnError;

use super::cose::{CRV_P256, CRV_P384, ec_public_key_der, rsa_public_key_der};

/// `0xFF` followed by "TCG"
pub const TPM_GENERATED_VALUE: u32 = 0xff54_4347;
pub const TPM_ST_ATTEST_CERTIFY: u16 = 0x8017;

pub const TPM_ALG_RSA: u16 = 0x0001;
pub const TPM_ALG_SHA1: u16 = 0x0004;
pub const TPM_ALG_SHA256: u16 = 0x000b;
pub const TPM_ALG_SHA384: u16 = 0x000c;
pub const TPM_ALG_SHA512: u16 = 0x000d;
pub const TPM_ALG_NULL: u16 = 0x0010;
pub const TPM_ALG_ECDAA: u16 = 0x001a;
pub const TPM_ALG_ECC: u16 = 0x0023;

pub const TPM_ECC_NIST_P256: u16 = 0x0003;
pub const TPM_ECC_NIST_P384: u16 = 0x0004;

const TPM_RSA_DEFAULT_EXPONENT: u32 = 65537;

/// `TPMS_CLOCK_INFO`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TpmClockInfo {
    pub clock: u64,
    pub reset_count: u32,
    pub restart_count: u32,
    pub safe: bool,
}

/// `TPMS_ATTEST` with a `TPMS_CERTIFY_INFO` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TpmCertInfo {
    pub magic: u32,
    pub type_: u16,
    pub qualified_signer: Vec<u8>,
    pub extra_data: Vec<u8>,
    pub clock_info: TpmClockInfo,
    pub firmware_version: u64,
    /// `TPM2B_NAME` of the certified object: nameAlg followed by its digest
    pub name: Vec<u8>,
    pub qualified_name: Vec<u8>,
}

/// `TPMU_PUBLIC_PARMS` for the two key types WebAuthn uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TpmKeyParameters {
    Rsa {
        symmetric: u16,
        scheme: u16,
        key_bits: u16,
        /// 0 means the default exponent 65537
        exponent: u32,
    },
    Ecc {
        symmetric: u16,
        scheme: u16,
        curve_id: u16,
        kdf: u16,
    },
}

/// `TPMU_PUBLIC_ID`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TpmUnique {
    Rsa { n: Vec<u8> },
    Ecc { x: Vec<u8>, y: Vec<u8> },
}

/// `TPMT_PUBLIC`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TpmPubArea {
    pub type_: u16,
    pub name_alg: u16,
    pub object_attributes: u32,
    pub auth_policy: Vec<u8>,
    pub parameters: TpmKeyParameters,
    pub unique: TpmUnique,
    raw: Vec<u8>,
}

struct TpmReader<'a> {
    data: &'a [u8],
    pos: usize,
    structure: &'static str,
}

impl<'a> TpmReader<'a> {
    fn new(data: &'a [u8], structure: &'static str) -> Self {
        Self {
            data,
            pos: 0,
            structure,
        }
    }

    fn take(&mut self, len: usize, field: &str) -> Result<&'a [u8], WebAuthnError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| {
                WebAuthnError::Format(format!(
                    "{} too short to parse {field}: need {len} bytes at offset {}, have {}",
                    self.structure,
                    self.pos,
                    self.data.len() - self.pos
                ))
            })?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self, field: &str) -> Result<u8, WebAuthnError> {
        Ok(self.take(1, field)?[0])
    }

    fn u16(&mut self, field: &str) -> Result<u16, WebAuthnError> {
        let bytes = self.take(2, field)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn u32(&mut self, field: &str) -> Result<u32, WebAuthnError> {
        let bytes = self.take(4, field)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn u64(&mut self, field: &str) -> Result<u64, WebAuthnError> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8, field)?);
        Ok(u64::from_be_bytes(buf))
    }

    /// `TPM2B_*`: u16 size, then the buffer.
    fn sized(&mut self, field: &str) -> Result<Vec<u8>, WebAuthnError> {
        let len = self.u16(field)? as usize;
        Ok(self.take(len, field)?.to_vec())
    }

    fn finish(&self) -> Result<(), WebAuthnError> {
        if self.pos != self.data.len() {
            return Err(WebAuthnError::Format(format!(
                "{} has {} trailing bytes",
                self.structure,
                self.data.len() - self.pos
            )));
        }
        Ok(())
    }
}

/// Decodes a `TPMS_ATTEST` structure.
///
/// Only `TPM_ST_ATTEST_CERTIFY` is accepted. `magic` is returned as found;
/// checking it against [`TPM_GENERATED_VALUE`] is up to the verifier.
///
/// # Errors
/// * `WebAuthnError::Format` - If the structure is truncated, has trailing
///   bytes, or is not a certify attestation
pub fn decode_tpm_cert_info(data: &[u8]) -> Result<TpmCertInfo, WebAuthnError> {
    let mut reader = TpmReader::new(data, "TPM certInfo");

    let magic = reader.u32("magic")?;
    let type_ = reader.u16("type")?;
    if type_ != TPM_ST_ATTEST_CERTIFY {
        tracing::warn!("Unexpected TPMS_ATTEST type: {:#06x}", type_);
        return Err(WebAuthnError::Format(format!(
            "Invalid TPM attestation type: {type_:#06x}"
        )));
    }

    let qualified_signer = reader.sized("qualifiedSigner")?;
    let extra_data = reader.sized("extraData")?;
    let clock_info = TpmClockInfo {
        clock: reader.u64("clockInfo.clock")?,
        reset_count: reader.u32("clockInfo.resetCount")?,
        restart_count: reader.u32("clockInfo.restartCount")?,
        safe: reader.u8("clockInfo.safe")? != 0,
    };
    let firmware_version = reader.u64("firmwareVersion")?;
    let name = reader.sized("attested.name")?;
    let qualified_name = reader.sized("attested.qualifiedName")?;
    reader.finish()?;

    Ok(TpmCertInfo {
        magic,
        type_,
        qualified_signer,
        extra_data,
        clock_info,
        firmware_version,
        name,
        qualified_name,
    })
}

/// Decodes a `TPMT_PUBLIC` structure for an RSA or ECC key.
pub fn decode_tpm_pub_area(data: &[u8]) -> Result<TpmPubArea, WebAuthnError> {
    let mut reader = TpmReader::new(data, "TPM pubArea");

    let type_ = reader.u16("type")?;
    let name_alg = reader.u16("nameAlg")?;
    let object_attributes = reader.u32("objectAttributes")?;
    let auth_policy = reader.sized("authPolicy")?;

    let (parameters, unique) = match type_ {
        TPM_ALG_RSA => {
            let symmetric = read_symmetric(&mut reader)?;
            let scheme = reader.u16("parameters.scheme")?;
            if scheme != TPM_ALG_NULL {
                reader.u16("parameters.scheme.hashAlg")?;
            }
            let key_bits = reader.u16("parameters.keyBits")?;
            let exponent = reader.u32("parameters.exponent")?;
            let n = reader.sized("unique.rsa")?;
            (
                TpmKeyParameters::Rsa {
                    symmetric,
                    scheme,
                    key_bits,
                    exponent,
                },
                TpmUnique::Rsa { n },
            )
        }
        TPM_ALG_ECC => {
            let symmetric = read_symmetric(&mut reader)?;
            let scheme = reader.u16("parameters.scheme")?;
            if scheme != TPM_ALG_NULL {
                reader.u16("parameters.scheme.hashAlg")?;
                if scheme == TPM_ALG_ECDAA {
                    reader.u16("parameters.scheme.count")?;
                }
            }
            let curve_id = reader.u16("parameters.curveID")?;
            let kdf = reader.u16("parameters.kdf")?;
            if kdf != TPM_ALG_NULL {
                reader.u16("parameters.kdf.hashAlg")?;
            }
            let x = reader.sized("unique.ecc.x")?;
            let y = reader.sized("unique.ecc.y")?;
            (
                TpmKeyParameters::Ecc {
                    symmetric,
                    scheme,
                    curve_id,
                    kdf,
                },
                TpmUnique::Ecc { x, y },
            )
        }
        other => {
            return Err(WebAuthnError::Format(format!(
                "Unsupported TPM public key type: {other:#06x}"
            )));
        }
    };
    reader.finish()?;

    Ok(TpmPubArea {
        type_,
        name_alg,
        object_attributes,
        auth_policy,
        parameters,
        unique,
        raw: data.to_vec(),
    })
}

// TPMT_SYM_DEF_OBJECT: keyBits and mode follow unless the algorithm is NULL
fn read_symmetric(reader: &mut TpmReader<'_>) -> Result<u16, WebAuthnError> {
    let symmetric = reader.u16("parameters.symmetric")?;
    if symmetric != TPM_ALG_NULL {
        reader.u16("parameters.symmetric.keyBits")?;
        reader.u16("parameters.symmetric.mode")?;
    }
    Ok(symmetric)
}

/// Digest of `data` under a TPM hash algorithm identifier.
pub(crate) fn tpm_digest(alg: u16, data: &[u8]) -> Option<Vec<u8>> {
    let algorithm = match alg {
        TPM_ALG_SHA1 => &digest::SHA1_FOR_LEGACY_USE_ONLY,
        TPM_ALG_SHA256 => &digest::SHA256,
        TPM_ALG_SHA384 => &digest::SHA384,
        TPM_ALG_SHA512 => &digest::SHA512,
        _ => return None,
    };
    Some(digest::digest(algorithm, data).as_ref().to_vec())
}

impl TpmPubArea {
    /// The encoded structure this was decoded from.
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    /// TPM Name of the object: `nameAlg || H_nameAlg(pubArea)`.
    pub fn name(&self) -> Result<Vec<u8>, WebAuthnError> {
        let digest = tpm_digest(self.name_alg, &self.raw).ok_or_else(|| {
            WebAuthnError::Verification(format!(
                "Unsupported TPM name algorithm: {:#06x}",
                self.name_alg
            ))
        })?;
        let mut name = self.name_alg.to_be_bytes().to_vec();
        name.extend_from_slice(&digest);
        Ok(name)
    }

    /// Re-encodes the public key as a DER SubjectPublicKeyInfo.
    pub fn to_der(&self) -> Result<Vec<u8>, WebAuthnError> {
        match (&self.parameters, &self.unique) {
            (TpmKeyParameters::Rsa { exponent, .. }, TpmUnique::Rsa { n }) => {
                let exponent = if *exponent == 0 {
                    TPM_RSA_DEFAULT_EXPONENT
                } else {
                    *exponent
                };
                rsa_public_key_der(n, &exponent.to_be_bytes())
            }
            (TpmKeyParameters::Ecc { curve_id, .. }, TpmUnique::Ecc { x, y }) => {
                let (curve, size) = match *curve_id {
                    TPM_ECC_NIST_P256 => (CRV_P256, 32),
                    TPM_ECC_NIST_P384 => (CRV_P384, 48),
                    other => {
                        return Err(WebAuthnError::Crypto(format!(
                            "Unsupported TPM curve: {other:#06x}"
                        )));
                    }
                };
                ec_public_key_der(curve, &left_pad(x, size)?, &left_pad(y, size)?)
            }
            _ => Err(WebAuthnError::Format(
                "TPM pubArea parameters do not match unique".to_string(),
            )),
        }
    }
}

// TPMs may drop leading zero bytes of a coordinate
fn left_pad(coordinate: &[u8], size: usize) -> Result<Vec<u8>, WebAuthnError> {
    if coordinate.len() > size {
        return Err(WebAuthnError::Format(format!(
            "ECC coordinate of {} bytes exceeds field size {size}",
            coordinate.len()
        )));
    }
    let mut padded = vec![0u8; size - coordinate.len()];
    padded.extend_from_slice(coordinate);
    Ok(padded)
}
