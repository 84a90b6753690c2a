use x509_parser::prelude::*;

use crate::passkey::errors::WebAuthnError;
use crate::passkey::types::AttestationLevel;

use super::core::{AttestationInput, VerifyAttestation};
use super::utils::{
    check_aaguid_extension, check_not_ca, check_version_3, leaf_certificate, parse_certificate,
    statement_alg, statement_sig, verify_with_certificate,
};

const PACKED_SUBJECT_OU: &str = "Authenticator Attestation";

/// `packed`: full attestation with an x5c chain, or self attestation signed by
/// the credential key itself.
pub(super) struct PackedAttestation;

impl VerifyAttestation for PackedAttestation {
    fn verify(&self, input: &AttestationInput<'_>) -> Result<AttestationLevel, WebAuthnError> {
        let stmt = input.statement()?;
        let alg = statement_alg(stmt)?;
        let sig = statement_sig(stmt)?;
        let signed_data = input.signed_data();

        if stmt.ecdaa_key_id.is_some() {
            tracing::warn!("Packed attestation uses ECDAA");
            return Err(WebAuthnError::UnsupportedFormat(
                "ECDAA attestation is not supported".to_string(),
            ));
        }

        if stmt.x5c.is_some() {
            tracing::debug!("Full attestation with certificate chain");
            let cert = parse_certificate(leaf_certificate(stmt)?)?;
            verify_with_certificate(&cert, alg, &signed_data, sig)?;
            verify_packed_certificate(&cert, input)?;
            return Ok(AttestationLevel::Basic);
        }

        tracing::debug!("Self attestation");
        if input.credential_key.alg != Some(alg.id()) {
            tracing::warn!(
                "Self attestation alg {} does not match credential key alg {:?}",
                alg,
                input.credential_key.alg
            );
            return Err(WebAuthnError::Verification(
                "Self attestation algorithm does not match credential key".to_string(),
            ));
        }
        input
            .credential_key
            .verify_signature(alg, &signed_data, sig)?;
        Ok(AttestationLevel::SelfAttestation)
    }
}

fn verify_packed_certificate(
    cert: &X509Certificate<'_>,
    input: &AttestationInput<'_>,
) -> Result<(), WebAuthnError> {
    check_version_3(cert)?;

    let subject = cert.subject();
    let country = attribute_text(subject.iter_country().next());
    let organization = attribute_text(subject.iter_organization().next());
    let unit = attribute_text(subject.iter_organizational_unit().next());
    let common_name = attribute_text(subject.iter_common_name().next());

    if country.is_none_or(|c| c.len() != 2) {
        return Err(WebAuthnError::Verification(
            "Attestation certificate subject needs a two letter country".to_string(),
        ));
    }
    if organization.is_none_or(|o| o.is_empty()) {
        return Err(WebAuthnError::Verification(
            "Attestation certificate subject has no organization".to_string(),
        ));
    }
    if unit.as_deref() != Some(PACKED_SUBJECT_OU) {
        tracing::warn!("Attestation certificate OU: {:?}", unit);
        return Err(WebAuthnError::Verification(format!(
            "Attestation certificate OU must be '{PACKED_SUBJECT_OU}'"
        )));
    }
    if common_name.is_none_or(|cn| cn.is_empty()) {
        return Err(WebAuthnError::Verification(
            "Attestation certificate subject has no common name".to_string(),
        ));
    }

    check_not_ca(cert)?;
    check_aaguid_extension(cert, &input.aaguid)
}

fn attribute_text(attr: Option<&AttributeTypeAndValue>) -> Option<String> {
    attr.and_then(|a| a.as_str().ok()).map(str::to_string)
}
