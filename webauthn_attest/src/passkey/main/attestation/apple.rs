use subtle::ConstantTimeEq;

use crate::passkey::errors::WebAuthnError;
use crate::passkey::types::AttestationLevel;
use crate::utils::sha256;

use super::core::{AttestationInput, VerifyAttestation};
use super::utils::{
    check_certificate_key_matches, find_extension, leaf_certificate, parse_certificate,
    parse_der_value, tagged_content,
};

const OID_APPLE_NONCE: &str = "1.2.840.113635.100.8.2";

/// `apple`: Apple anonymous attestation. The certificate binds the ceremony
/// through a nonce extension; there is no separate signature.
pub(super) struct AppleAttestation;

impl VerifyAttestation for AppleAttestation {
    fn verify(&self, input: &AttestationInput<'_>) -> Result<AttestationLevel, WebAuthnError> {
        let stmt = input.statement()?;
        let cert = parse_certificate(leaf_certificate(stmt)?)?;

        let expected_nonce = sha256(&input.signed_data());
        let ext = find_extension(&cert, OID_APPLE_NONCE).ok_or_else(|| {
            WebAuthnError::Verification(
                "Apple attestation certificate lacks nonce extension".to_string(),
            )
        })?;
        let nonce = extract_nonce(ext.value)?;

        if !bool::from(nonce.ct_eq(&expected_nonce)) {
            tracing::warn!(
                "Apple nonce mismatch. Expected: {}, Got: {}",
                hex::encode(expected_nonce),
                hex::encode(nonce)
            );
            return Err(WebAuthnError::Verification(
                "Apple attestation nonce does not match".to_string(),
            ));
        }

        check_certificate_key_matches(&cert, input.credential_key)?;
        Ok(AttestationLevel::AnonCa)
    }
}

// SEQUENCE { [1] EXPLICIT OCTET STRING }
fn extract_nonce(value: &[u8]) -> Result<Vec<u8>, WebAuthnError> {
    let malformed = || WebAuthnError::Verification("Malformed Apple nonce extension".to_string());

    let outer = parse_der_value(value)?;
    let (tag, inner) = outer
        .as_sequence()
        .ok()
        .and_then(|items| items.first())
        .and_then(tagged_content)
        .ok_or_else(malformed)?;
    if tag != 1 {
        return Err(malformed());
    }
    let nonce = parse_der_value(inner)?;
    nonce.as_slice().map(<[u8]>::to_vec).map_err(|_| malformed())
}
