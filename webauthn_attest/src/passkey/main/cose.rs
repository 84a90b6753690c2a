use ciborium::value::Value as CborValue;
use ring::digest;
use ring::signature::{self, RsaParameters, UnparsedPublicKey, VerificationAlgorithm};
use std::fmt;

use crate::passkey::errors::WebAuthnError;

use super::utils::cbor_int;

// COSE_Key common and type-specific labels (RFC 9052 / RFC 9053)
const LABEL_KTY: i64 = 1;
const LABEL_ALG: i64 = 3;
const LABEL_CRV_OR_N: i64 = -1;
const LABEL_X_OR_E: i64 = -2;
const LABEL_Y: i64 = -3;

pub(crate) const KTY_OKP: i64 = 1;
pub(crate) const KTY_EC2: i64 = 2;
pub(crate) const KTY_RSA: i64 = 3;

pub(crate) const CRV_P256: i64 = 1;
pub(crate) const CRV_P384: i64 = 2;
pub(crate) const CRV_ED25519: i64 = 6;

/// COSE signature algorithms accepted for credentials and attestation
/// statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoseAlgorithm {
    /// ECDSA w/ SHA-256 on P-256
    ES256,
    /// ECDSA w/ SHA-384 on P-384
    ES384,
    /// EdDSA on Ed25519
    EdDSA,
    /// RSASSA-PSS w/ SHA-256
    PS256,
    /// RSASSA-PKCS1-v1_5 w/ SHA-256
    RS256,
    RS384,
    RS512,
    /// RSASSA-PKCS1-v1_5 w/ SHA-1, still emitted by TPMs
    RS1,
}

impl CoseAlgorithm {
    pub fn id(&self) -> i64 {
        match self {
            Self::ES256 => -7,
            Self::ES384 => -35,
            Self::EdDSA => -8,
            Self::PS256 => -37,
            Self::RS256 => -257,
            Self::RS384 => -258,
            Self::RS512 => -259,
            Self::RS1 => -65535,
        }
    }

    pub(crate) fn verification_algorithm(&self) -> &'static dyn VerificationAlgorithm {
        match self {
            Self::ES256 => &signature::ECDSA_P256_SHA256_ASN1,
            Self::ES384 => &signature::ECDSA_P384_SHA384_ASN1,
            Self::EdDSA => &signature::ED25519,
            Self::PS256 => &signature::RSA_PSS_2048_8192_SHA256,
            Self::RS256 => &signature::RSA_PKCS1_2048_8192_SHA256,
            Self::RS384 => &signature::RSA_PKCS1_2048_8192_SHA384,
            Self::RS512 => &signature::RSA_PKCS1_2048_8192_SHA512,
            Self::RS1 => &signature::RSA_PKCS1_2048_8192_SHA1_FOR_LEGACY_USE_ONLY,
        }
    }

    fn rsa_parameters(&self) -> Option<&'static RsaParameters> {
        match self {
            Self::PS256 => Some(&signature::RSA_PSS_2048_8192_SHA256),
            Self::RS256 => Some(&signature::RSA_PKCS1_2048_8192_SHA256),
            Self::RS384 => Some(&signature::RSA_PKCS1_2048_8192_SHA384),
            Self::RS512 => Some(&signature::RSA_PKCS1_2048_8192_SHA512),
            Self::RS1 => Some(&signature::RSA_PKCS1_2048_8192_SHA1_FOR_LEGACY_USE_ONLY),
            _ => None,
        }
    }

    /// Hash function the algorithm signs with.
    pub(crate) fn digest(&self, data: &[u8]) -> Vec<u8> {
        let algorithm = match self {
            Self::RS1 => &digest::SHA1_FOR_LEGACY_USE_ONLY,
            Self::ES384 | Self::RS384 => &digest::SHA384,
            Self::EdDSA | Self::RS512 => &digest::SHA512,
            Self::ES256 | Self::PS256 | Self::RS256 => &digest::SHA256,
        };
        digest::digest(algorithm, data).as_ref().to_vec()
    }
}

impl TryFrom<i64> for CoseAlgorithm {
    type Error = WebAuthnError;

    fn try_from(id: i64) -> Result<Self, Self::Error> {
        match id {
            -7 => Ok(Self::ES256),
            -35 => Ok(Self::ES384),
            -8 => Ok(Self::EdDSA),
            -37 => Ok(Self::PS256),
            -257 => Ok(Self::RS256),
            -258 => Ok(Self::RS384),
            -259 => Ok(Self::RS512),
            -65535 => Ok(Self::RS1),
            other => Err(WebAuthnError::Crypto(format!(
                "Unsupported COSE algorithm: {other}"
            ))),
        }
    }
}

impl fmt::Display for CoseAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.id())
    }
}

/// Key material of a COSE_Key, selected by `kty`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoseKeyParams {
    Ec2 { curve: i64, x: Vec<u8>, y: Vec<u8> },
    Rsa { n: Vec<u8>, e: Vec<u8> },
    Okp { curve: i64, x: Vec<u8> },
    /// `kty` this crate cannot use, or a key with missing members
    Unsupported,
}

/// A credential public key as a decoded COSE_Key map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoseKey {
    pub kty: i64,
    pub alg: Option<i64>,
    pub params: CoseKeyParams,
    raw: Vec<u8>,
}

impl CoseKey {
    /// Decodes a COSE_Key from its CBOR encoding, e.g. a key stored after
    /// registration.
    pub fn from_cbor_bytes(bytes: &[u8]) -> Result<Self, WebAuthnError> {
        let mut rest = bytes;
        let value: CborValue = ciborium::de::from_reader(&mut rest)
            .map_err(|e| WebAuthnError::Format(format!("Invalid public key CBOR: {e}")))?;
        if !rest.is_empty() {
            return Err(WebAuthnError::Format(
                "Trailing bytes after public key CBOR".to_string(),
            ));
        }
        Self::from_cbor_value(&value, bytes.to_vec())
    }

    /// `raw` is the encoding `value` was decoded from.
    pub(super) fn from_cbor_value(value: &CborValue, raw: Vec<u8>) -> Result<Self, WebAuthnError> {
        let entries = value
            .as_map()
            .ok_or_else(|| WebAuthnError::Format("COSE key is not a map".to_string()))?;

        let get = |label: i64| {
            entries
                .iter()
                .find(|(k, _)| cbor_int(k) == Some(label))
                .map(|(_, v)| v)
        };

        let kty = get(LABEL_KTY)
            .and_then(cbor_int)
            .ok_or_else(|| WebAuthnError::Format("COSE key is missing kty".to_string()))?;
        let alg = get(LABEL_ALG).and_then(cbor_int);

        let bytes = |label: i64| get(label).and_then(|v| v.as_bytes()).cloned();
        let int = |label: i64| get(label).and_then(cbor_int);

        let params = match kty {
            KTY_EC2 => match (int(LABEL_CRV_OR_N), bytes(LABEL_X_OR_E), bytes(LABEL_Y)) {
                (Some(curve), Some(x), Some(y)) => CoseKeyParams::Ec2 { curve, x, y },
                _ => CoseKeyParams::Unsupported,
            },
            KTY_RSA => match (bytes(LABEL_CRV_OR_N), bytes(LABEL_X_OR_E)) {
                (Some(n), Some(e)) => CoseKeyParams::Rsa { n, e },
                _ => CoseKeyParams::Unsupported,
            },
            KTY_OKP => match (int(LABEL_CRV_OR_N), bytes(LABEL_X_OR_E)) {
                (Some(curve), Some(x)) => CoseKeyParams::Okp { curve, x },
                _ => CoseKeyParams::Unsupported,
            },
            _ => CoseKeyParams::Unsupported,
        };

        Ok(Self {
            kty,
            alg,
            params,
            raw,
        })
    }

    /// CBOR encoding as received from the authenticator.
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    /// The key's declared algorithm.
    ///
    /// # Errors
    /// * `WebAuthnError::Crypto` - If `alg` is absent or not supported
    pub fn algorithm(&self) -> Result<CoseAlgorithm, WebAuthnError> {
        let alg = self
            .alg
            .ok_or_else(|| WebAuthnError::Crypto("COSE key has no alg".to_string()))?;
        CoseAlgorithm::try_from(alg)
    }

    /// Uncompressed SEC1 point `0x04 || x || y` of an EC2 key.
    pub(crate) fn ec_point(&self) -> Option<Vec<u8>> {
        match &self.params {
            CoseKeyParams::Ec2 { x, y, .. } => {
                let mut point = Vec::with_capacity(1 + x.len() + y.len());
                point.push(0x04);
                point.extend_from_slice(x);
                point.extend_from_slice(y);
                Some(point)
            }
            _ => None,
        }
    }

    /// Re-encodes the key as a DER SubjectPublicKeyInfo.
    pub fn to_der(&self) -> Result<Vec<u8>, WebAuthnError> {
        match &self.params {
            CoseKeyParams::Ec2 { curve, x, y } => ec_public_key_der(*curve, x, y),
            CoseKeyParams::Rsa { n, e } => rsa_public_key_der(n, e),
            CoseKeyParams::Okp { curve, x } if *curve == CRV_ED25519 => ed25519_public_key_der(x),
            _ => Err(WebAuthnError::Crypto(format!(
                "Cannot export COSE key of kty {} to DER",
                self.kty
            ))),
        }
    }

    /// Verifies `signature` over `message` with this key and `alg`.
    pub fn verify_signature(
        &self,
        alg: CoseAlgorithm,
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), WebAuthnError> {
        let result = match (&self.params, alg) {
            (CoseKeyParams::Ec2 { curve, .. }, CoseAlgorithm::ES256) if *curve == CRV_P256 => {
                self.verify_ec(alg, message, signature)
            }
            (CoseKeyParams::Ec2 { curve, .. }, CoseAlgorithm::ES384) if *curve == CRV_P384 => {
                self.verify_ec(alg, message, signature)
            }
            (CoseKeyParams::Okp { curve, x }, CoseAlgorithm::EdDSA) if *curve == CRV_ED25519 => {
                UnparsedPublicKey::new(alg.verification_algorithm(), x)
                    .verify(message, signature)
                    .is_ok()
            }
            (CoseKeyParams::Rsa { n, e }, _) if alg.rsa_parameters().is_some() => {
                let components = signature::RsaPublicKeyComponents {
                    n: strip_leading_zeros(n),
                    e: strip_leading_zeros(e),
                };
                alg.rsa_parameters()
                    .is_some_and(|params| components.verify(params, message, signature).is_ok())
            }
            _ => {
                return Err(WebAuthnError::Crypto(format!(
                    "Key type {} cannot be used with {}",
                    self.kty, alg
                )));
            }
        };

        if !result {
            tracing::error!("Signature verification failed with {}", alg);
            tracing::debug!("Signature: {}", hex::encode(signature));
            tracing::debug!("Signed data: {}", hex::encode(message));
            tracing::debug!("Public key: {}", hex::encode(&self.raw));
            return Err(WebAuthnError::Crypto(
                "Signature verification failed".to_string(),
            ));
        }

        Ok(())
    }

    fn verify_ec(&self, alg: CoseAlgorithm, message: &[u8], signature: &[u8]) -> bool {
        self.ec_point().is_some_and(|point| {
            UnparsedPublicKey::new(alg.verification_algorithm(), point)
                .verify(message, signature)
                .is_ok()
        })
    }
}

/// DER SubjectPublicKeyInfo of an uncompressed NIST P-256 or P-384 point.
pub(crate) fn ec_public_key_der(curve: i64, x: &[u8], y: &[u8]) -> Result<Vec<u8>, WebAuthnError> {
    let mut point = Vec::with_capacity(1 + x.len() + y.len());
    point.push(0x04);
    point.extend_from_slice(x);
    point.extend_from_slice(y);

    let der = match curve {
        CRV_P256 => {
            let key = p256::PublicKey::from_sec1_bytes(&point)
                .map_err(|e| WebAuthnError::Crypto(format!("Invalid P-256 point: {e}")))?;
            p256::pkcs8::EncodePublicKey::to_public_key_der(&key)
        }
        CRV_P384 => {
            let key = p384::PublicKey::from_sec1_bytes(&point)
                .map_err(|e| WebAuthnError::Crypto(format!("Invalid P-384 point: {e}")))?;
            p384::pkcs8::EncodePublicKey::to_public_key_der(&key)
        }
        other => {
            return Err(WebAuthnError::Crypto(format!(
                "Unsupported EC curve: {other}"
            )));
        }
    }
    .map_err(|e| WebAuthnError::Crypto(format!("Failed to encode EC key: {e}")))?;

    Ok(der.as_bytes().to_vec())
}

/// DER SubjectPublicKeyInfo of a compressed Ed25519 point.
pub(crate) fn ed25519_public_key_der(x: &[u8]) -> Result<Vec<u8>, WebAuthnError> {
    let bytes: &[u8; 32] = x.try_into().map_err(|_| {
        WebAuthnError::Format(format!("Ed25519 key must be 32 bytes, got {}", x.len()))
    })?;
    let key = ed25519_dalek::VerifyingKey::from_bytes(bytes)
        .map_err(|e| WebAuthnError::Format(format!("Invalid Ed25519 point: {e}")))?;
    let der = ed25519_dalek::pkcs8::EncodePublicKey::to_public_key_der(&key)
        .map_err(|e| WebAuthnError::Crypto(format!("Failed to encode Ed25519 key: {e}")))?;
    Ok(der.as_bytes().to_vec())
}

/// DER SubjectPublicKeyInfo of an RSA key given big-endian modulus and
/// exponent.
pub(crate) fn rsa_public_key_der(n: &[u8], e: &[u8]) -> Result<Vec<u8>, WebAuthnError> {
    let key = rsa::RsaPublicKey::new(
        rsa::BigUint::from_bytes_be(n),
        rsa::BigUint::from_bytes_be(e),
    )
    .map_err(|e| WebAuthnError::Crypto(format!("Invalid RSA key: {e}")))?;
    let der = rsa::pkcs8::EncodePublicKey::to_public_key_der(&key)
        .map_err(|e| WebAuthnError::Crypto(format!("Failed to encode RSA key: {e}")))?;
    Ok(der.as_bytes().to_vec())
}

fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}
