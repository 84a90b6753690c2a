use subtle::ConstantTimeEq;
use x509_parser::prelude::*;

use crate::passkey::errors::WebAuthnError;
use crate::passkey::types::AttestationLevel;

use super::super::tpm::{TPM_GENERATED_VALUE, decode_tpm_cert_info, decode_tpm_pub_area};
use super::core::{AttestationInput, VerifyAttestation};
use super::utils::{
    check_aaguid_extension, check_not_ca, check_version_3, leaf_certificate, parse_certificate,
    statement_alg, statement_sig, verify_with_certificate,
};

const OID_TCG_KP_AIK_CERTIFICATE: &str = "2.23.133.8.3";
const OID_TPM_MANUFACTURER: &str = "2.23.133.2.1";
const OID_TPM_MODEL: &str = "2.23.133.2.2";
const OID_TPM_VERSION: &str = "2.23.133.2.3";

/// `tpm`: a TPM 2.0 certifies the credential key with its attestation
/// identity key (AIK).
pub(super) struct TpmAttestation;

impl VerifyAttestation for TpmAttestation {
    fn verify(&self, input: &AttestationInput<'_>) -> Result<AttestationLevel, WebAuthnError> {
        let stmt = input.statement()?;

        let ver = stmt.ver.as_deref().unwrap_or_default();
        if ver != "2.0" {
            return Err(WebAuthnError::Verification(format!(
                "Unsupported TPM version: {ver}"
            )));
        }

        let alg = statement_alg(stmt)?;
        let sig = statement_sig(stmt)?;
        let pub_area_raw = stmt.pub_area.as_deref().ok_or_else(|| {
            WebAuthnError::Verification("Missing pubArea in TPM attestation".to_string())
        })?;
        let cert_info_raw = stmt.cert_info.as_deref().ok_or_else(|| {
            WebAuthnError::Verification("Missing certInfo in TPM attestation".to_string())
        })?;

        let pub_area = decode_tpm_pub_area(pub_area_raw)?;
        if pub_area.to_der()? != input.credential_key.to_der()? {
            tracing::warn!("TPM pubArea key differs from the credential public key");
            return Err(WebAuthnError::Verification(
                "Public key in pubArea does not match credential public key".to_string(),
            ));
        }

        let cert_info = decode_tpm_cert_info(cert_info_raw)?;
        if cert_info.magic != TPM_GENERATED_VALUE {
            tracing::warn!("TPM certInfo magic: {:#010x}", cert_info.magic);
            return Err(WebAuthnError::Verification(
                "Invalid TPM magic value".to_string(),
            ));
        }

        let expected_extra_data = alg.digest(&input.signed_data());
        if !bool::from(cert_info.extra_data.ct_eq(&expected_extra_data)) {
            tracing::warn!(
                "TPM extraData mismatch. Expected: {}, Got: {}",
                hex::encode(&expected_extra_data),
                hex::encode(&cert_info.extra_data)
            );
            return Err(WebAuthnError::Verification(
                "TPM extraData does not match hash of attToBeSigned".to_string(),
            ));
        }

        if cert_info.name != pub_area.name()? {
            tracing::warn!("TPM certInfo name does not match pubArea");
            return Err(WebAuthnError::Verification(
                "TPM certified name does not match pubArea".to_string(),
            ));
        }

        let aik = parse_certificate(leaf_certificate(stmt)?)?;
        verify_with_certificate(&aik, alg, cert_info_raw, sig)?;
        verify_aik_certificate(&aik, input)?;

        Ok(AttestationLevel::AttCa)
    }
}

fn verify_aik_certificate(
    cert: &X509Certificate<'_>,
    input: &AttestationInput<'_>,
) -> Result<(), WebAuthnError> {
    check_version_3(cert)?;

    if cert.subject().iter().next().is_some() {
        tracing::debug!("AIK certificate subject: {}", cert.subject());
        return Err(WebAuthnError::Verification(
            "AIK certificate must have an empty subject field".to_string(),
        ));
    }

    let san = cert
        .subject_alternative_name()
        .map_err(|e| WebAuthnError::Verification(format!("Invalid AIK subjectAltName: {e}")))?
        .ok_or_else(|| {
            WebAuthnError::Verification(
                "AIK certificate must have Subject Alternative Name extension".to_string(),
            )
        })?;
    let has_tpm_device_attributes = san.value.general_names.iter().any(|name| match name {
        GeneralName::DirectoryName(dn) => [OID_TPM_MANUFACTURER, OID_TPM_MODEL, OID_TPM_VERSION]
            .iter()
            .all(|oid| {
                dn.iter_attributes().any(|attr| {
                    attr.attr_type().to_id_string() == *oid
                        && attr.as_str().is_ok_and(|v| !v.is_empty())
                })
            }),
        _ => false,
    });
    if !has_tpm_device_attributes {
        return Err(WebAuthnError::Verification(
            "AIK subjectAltName lacks TPM manufacturer, model or version".to_string(),
        ));
    }

    let eku = cert
        .extended_key_usage()
        .map_err(|e| WebAuthnError::Verification(format!("Invalid AIK extKeyUsage: {e}")))?;
    let has_aik_usage = eku.is_some_and(|eku| {
        eku.value
            .other
            .iter()
            .any(|oid| oid.to_id_string() == OID_TCG_KP_AIK_CERTIFICATE)
    });
    if !has_aik_usage {
        return Err(WebAuthnError::Verification(
            "AIK certificate must have TCG-KP-AIKCertificate EKU".to_string(),
        ));
    }

    check_not_ca(cert)?;
    check_aaguid_extension(cert, &input.aaguid)
}
