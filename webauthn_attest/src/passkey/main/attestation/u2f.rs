use oid_registry::{OID_EC_P256, OID_KEY_TYPE_EC_PUBLIC_KEY};
use x509_parser::prelude::*;

use crate::passkey::errors::WebAuthnError;
use crate::passkey::types::AttestationLevel;

use super::super::cose::{CRV_P256, CoseAlgorithm, CoseKeyParams};
use super::core::{AttestationInput, VerifyAttestation};
use super::utils::{
    leaf_certificate, parse_certificate, spki_algorithm_oids, statement_sig,
    verify_with_certificate,
};

/// `fido-u2f`: legacy U2F authenticators attesting with a P-256 certificate.
pub(super) struct FidoU2fAttestation;

impl VerifyAttestation for FidoU2fAttestation {
    fn verify(&self, input: &AttestationInput<'_>) -> Result<AttestationLevel, WebAuthnError> {
        let stmt = input.statement()?;
        let sig = statement_sig(stmt)?;

        if stmt.x5c.as_ref().is_none_or(|chain| chain.len() != 1) {
            return Err(WebAuthnError::Verification(
                "FIDO-U2F attestation requires exactly one certificate".to_string(),
            ));
        }

        let cert = parse_certificate(leaf_certificate(stmt)?)?;
        check_p256_certificate(&cert)?;

        let (x, y) = match &input.credential_key.params {
            CoseKeyParams::Ec2 { curve, x, y }
                if *curve == CRV_P256 && x.len() == 32 && y.len() == 32 =>
            {
                (x, y)
            }
            _ => {
                return Err(WebAuthnError::Verification(
                    "FIDO-U2F credential key must be an uncompressed P-256 key".to_string(),
                ));
            }
        };

        // 0x00 || rpIdHash || clientDataHash || credentialId || 0x04 || x || y
        let mut verification_data =
            Vec::with_capacity(1 + 32 + 32 + input.credential_id.len() + 65);
        verification_data.push(0x00);
        verification_data.extend_from_slice(&input.auth_data.rp_id_hash);
        verification_data.extend_from_slice(input.client_data_hash);
        verification_data.extend_from_slice(input.credential_id);
        verification_data.push(0x04);
        verification_data.extend_from_slice(x);
        verification_data.extend_from_slice(y);

        verify_with_certificate(&cert, CoseAlgorithm::ES256, &verification_data, sig)?;
        Ok(AttestationLevel::Basic)
    }
}

fn check_p256_certificate(cert: &X509Certificate<'_>) -> Result<(), WebAuthnError> {
    let oids = spki_algorithm_oids(cert.public_key().raw)?;
    let is_p256 = oids.len() == 2
        && oids[0] == OID_KEY_TYPE_EC_PUBLIC_KEY.as_bytes()
        && oids[1] == OID_EC_P256.as_bytes();

    if !is_p256 {
        tracing::warn!(
            "FIDO-U2F certificate key algorithm: {}",
            cert.public_key().algorithm.algorithm.to_id_string()
        );
        return Err(WebAuthnError::Verification(
            "FIDO-U2F certificate public key must be on curve P-256".to_string(),
        ));
    }
    Ok(())
}
