use uuid::Uuid;

use crate::passkey::config::RelyingPartyConfig;
use crate::passkey::errors::WebAuthnError;
use crate::passkey::types::AttestationLevel;

use super::super::cose::CoseKey;
use super::super::types::{AttestationFormat, AttestationObject, AttestationStatement, AuthData};
use super::android_key::AndroidKeyAttestation;
use super::apple::AppleAttestation;
use super::none::NoneAttestation;
use super::packed::PackedAttestation;
use super::tpm::TpmAttestation;
use super::u2f::FidoU2fAttestation;

/// Everything an attestation statement is checked against.
pub(crate) struct AttestationInput<'a> {
    pub(crate) statement: Option<&'a AttestationStatement>,
    pub(crate) auth_data_raw: &'a [u8],
    pub(crate) auth_data: &'a AuthData,
    pub(crate) client_data_hash: &'a [u8; 32],
    pub(crate) credential_id: &'a [u8],
    pub(crate) credential_key: &'a CoseKey,
    pub(crate) aaguid: Uuid,
    pub(crate) config: &'a RelyingPartyConfig,
}

impl AttestationInput<'_> {
    /// `authData || clientDataHash`, the signature base of most formats
    pub(crate) fn signed_data(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.auth_data_raw.len() + 32);
        data.extend_from_slice(self.auth_data_raw);
        data.extend_from_slice(self.client_data_hash);
        data
    }

    pub(crate) fn statement(&self) -> Result<&AttestationStatement, WebAuthnError> {
        self.statement.ok_or_else(|| {
            WebAuthnError::Verification("Missing attestation statement".to_string())
        })
    }
}

/// One attestation statement format.
pub(crate) trait VerifyAttestation {
    fn verify(&self, input: &AttestationInput<'_>) -> Result<AttestationLevel, WebAuthnError>;
}

/// Runs the verification procedure for `fmt` and returns the attestation level
/// it establishes.
///
/// # Errors
/// * `WebAuthnError::UnsupportedFormat` - For android-safetynet, apple-appattest
///   and unregistered formats
/// * `WebAuthnError::Verification` / `WebAuthnError::Crypto` - If the statement
///   does not verify
pub(crate) fn verify_attestation(
    attestation: &AttestationObject,
    input: &AttestationInput<'_>,
) -> Result<AttestationLevel, WebAuthnError> {
    let verifier: &dyn VerifyAttestation = match &attestation.fmt {
        AttestationFormat::None => &NoneAttestation,
        AttestationFormat::Packed => &PackedAttestation,
        AttestationFormat::Tpm => &TpmAttestation,
        AttestationFormat::AndroidKey => &AndroidKeyAttestation,
        AttestationFormat::FidoU2f => &FidoU2fAttestation,
        AttestationFormat::Apple => &AppleAttestation,
        unsupported @ (AttestationFormat::AndroidSafetyNet
        | AttestationFormat::AppleAppAttest
        | AttestationFormat::Unknown(_)) => {
            tracing::warn!("Attestation format '{}' is not verified", unsupported);
            return Err(WebAuthnError::UnsupportedFormat(format!(
                "Unsupported attestation format: {unsupported}"
            )));
        }
    };

    tracing::debug!("Using '{}' attestation format", attestation.fmt);
    let level = verifier.verify(input)?;
    tracing::debug!(
        "'{}' attestation verified with level {}",
        attestation.fmt,
        level
    );
    Ok(level)
}
