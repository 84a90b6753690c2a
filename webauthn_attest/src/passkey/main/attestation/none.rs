use crate::passkey::errors::WebAuthnError;
use crate::passkey::types::AttestationLevel;

use super::core::{AttestationInput, VerifyAttestation};

/// `none`: the authenticator supplied no attestation.
pub(super) struct NoneAttestation;

impl VerifyAttestation for NoneAttestation {
    fn verify(&self, input: &AttestationInput<'_>) -> Result<AttestationLevel, WebAuthnError> {
        if input.statement.is_some() {
            return Err(WebAuthnError::Format(
                "attStmt must be empty for none attestation".to_string(),
            ));
        }

        if input.config.attestation_required() {
            tracing::warn!("Attestation required but authenticator sent 'none'");
            return Err(WebAuthnError::Verification(
                "Attestation is required but none was provided".to_string(),
            ));
        }

        Ok(AttestationLevel::None)
    }
}
