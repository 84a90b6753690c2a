use subtle::ConstantTimeEq;
use x509_parser::der_parser::ber::BerObject;

use crate::passkey::errors::WebAuthnError;
use crate::passkey::types::AttestationLevel;

use super::core::{AttestationInput, VerifyAttestation};
use super::utils::{
    check_certificate_key_matches, find_extension, leaf_certificate, parse_certificate,
    parse_der_value, statement_alg, statement_sig, tagged_content, verify_with_certificate,
};

const OID_ANDROID_KEY_DESCRIPTION: &str = "1.3.6.1.4.1.11129.2.1.17";

// KeyDescription field positions
const ATTESTATION_CHALLENGE: usize = 4;
const SOFTWARE_ENFORCED: usize = 6;
const TEE_ENFORCED: usize = 7;

// AuthorizationList tags
const TAG_PURPOSE: u32 = 1;
const TAG_ALL_APPLICATIONS: u32 = 600;
const TAG_ORIGIN: u32 = 702;

const KM_PURPOSE_SIGN: u64 = 2;
const KM_ORIGIN_GENERATED: u64 = 0;

/// `android-key`: Android Keystore hardware attestation.
pub(super) struct AndroidKeyAttestation;

impl VerifyAttestation for AndroidKeyAttestation {
    fn verify(&self, input: &AttestationInput<'_>) -> Result<AttestationLevel, WebAuthnError> {
        let stmt = input.statement()?;
        let alg = statement_alg(stmt)?;
        let sig = statement_sig(stmt)?;

        let cert = parse_certificate(leaf_certificate(stmt)?)?;
        verify_with_certificate(&cert, alg, &input.signed_data(), sig)?;
        check_certificate_key_matches(&cert, input.credential_key)?;

        let ext = find_extension(&cert, OID_ANDROID_KEY_DESCRIPTION).ok_or_else(|| {
            WebAuthnError::Verification(
                "Android key attestation certificate lacks key description".to_string(),
            )
        })?;
        let description = parse_der_value(ext.value)?;
        let fields = description.as_sequence().map_err(|e| {
            WebAuthnError::Verification(format!("Key description is not a sequence: {e}"))
        })?;
        if fields.len() <= TEE_ENFORCED {
            return Err(WebAuthnError::Verification(format!(
                "Key description has {} fields",
                fields.len()
            )));
        }

        let challenge = fields[ATTESTATION_CHALLENGE].as_slice().map_err(|e| {
            WebAuthnError::Verification(format!("Invalid attestationChallenge: {e}"))
        })?;
        if !bool::from(challenge.ct_eq(input.client_data_hash)) {
            tracing::warn!(
                "Android attestationChallenge mismatch. Expected: {}, Got: {}",
                hex::encode(input.client_data_hash),
                hex::encode(challenge)
            );
            return Err(WebAuthnError::Verification(
                "attestationChallenge does not match clientDataHash".to_string(),
            ));
        }

        let mut authorizations = Authorizations::default();
        authorizations.collect(&fields[SOFTWARE_ENFORCED])?;
        authorizations.collect(&fields[TEE_ENFORCED])?;
        authorizations.check()?;

        Ok(AttestationLevel::Basic)
    }
}

/// Union of the software and TEE enforced authorization lists.
#[derive(Debug, Default)]
struct Authorizations {
    purposes: Vec<u64>,
    all_applications: bool,
    origin: Option<u64>,
}

impl Authorizations {
    fn collect(&mut self, list: &BerObject<'_>) -> Result<(), WebAuthnError> {
        let entries = list.as_sequence().map_err(|e| {
            WebAuthnError::Verification(format!("AuthorizationList is not a sequence: {e}"))
        })?;

        for entry in entries {
            let Some((tag, inner)) = tagged_content(entry) else {
                continue;
            };
            match tag {
                TAG_PURPOSE => {
                    let set = parse_der_value(inner)?;
                    let values = set.as_set().map_err(|e| {
                        WebAuthnError::Verification(format!("Invalid purpose: {e}"))
                    })?;
                    self.purposes
                        .extend(values.iter().filter_map(|v| v.as_u64().ok()));
                }
                TAG_ALL_APPLICATIONS => self.all_applications = true,
                TAG_ORIGIN => {
                    let origin = parse_der_value(inner)?.as_u64().map_err(|e| {
                        WebAuthnError::Verification(format!("Invalid origin: {e}"))
                    })?;
                    self.origin = Some(origin);
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn check(&self) -> Result<(), WebAuthnError> {
        if self.all_applications {
            return Err(WebAuthnError::Verification(
                "Android key must not be scoped to all applications".to_string(),
            ));
        }
        if self.origin != Some(KM_ORIGIN_GENERATED) {
            tracing::warn!("Android key origin: {:?}", self.origin);
            return Err(WebAuthnError::Verification(
                "Android key origin must be KM_ORIGIN_GENERATED".to_string(),
            ));
        }
        if !self.purposes.contains(&KM_PURPOSE_SIGN) {
            tracing::warn!("Android key purposes: {:?}", self.purposes);
            return Err(WebAuthnError::Verification(
                "Android key purpose must include KM_PURPOSE_SIGN".to_string(),
            ));
        }
        Ok(())
    }
}
