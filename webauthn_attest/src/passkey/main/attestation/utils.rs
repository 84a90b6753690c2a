use ring::signature::UnparsedPublicKey;
use uuid::Uuid;
use x509_parser::der_parser::ber::{BerObject, BerObjectContent};
use x509_parser::der_parser::der::parse_der;
use x509_parser::prelude::*;

use crate::passkey::errors::WebAuthnError;

use super::super::cose::{CoseAlgorithm, CoseKey};
use super::super::types::AttestationStatement;

// id-fido-gen-ce-aaguid
pub(super) const OID_FIDO_GEN_CE_AAGUID: &str = "1.3.6.1.4.1.45724.1.1.4";

/// Parses a DER certificate from `x5c`.
pub(super) fn parse_certificate(der: &[u8]) -> Result<X509Certificate<'_>, WebAuthnError> {
    let (rest, cert) = X509Certificate::from_der(der).map_err(|e| {
        tracing::warn!("Failed to parse attestation certificate: {}", e);
        WebAuthnError::Verification(format!("Failed to parse X509 certificate: {e}"))
    })?;
    if !rest.is_empty() {
        return Err(WebAuthnError::Verification(
            "Trailing bytes after X509 certificate".to_string(),
        ));
    }
    Ok(cert)
}

/// First certificate of `x5c`, the attestation certificate.
pub(super) fn leaf_certificate(stmt: &AttestationStatement) -> Result<&[u8], WebAuthnError> {
    stmt.x5c
        .as_ref()
        .and_then(|chain| chain.first())
        .map(Vec::as_slice)
        .ok_or_else(|| WebAuthnError::Verification("Missing x5c in attestation statement".into()))
}

pub(super) fn statement_alg(stmt: &AttestationStatement) -> Result<CoseAlgorithm, WebAuthnError> {
    let alg = stmt
        .alg
        .ok_or_else(|| WebAuthnError::Verification("Missing alg in attestation statement".into()))?;
    CoseAlgorithm::try_from(alg)
}

pub(super) fn statement_sig(stmt: &AttestationStatement) -> Result<&[u8], WebAuthnError> {
    stmt.sig
        .as_deref()
        .ok_or_else(|| WebAuthnError::Verification("Missing sig in attestation statement".into()))
}

/// Verifies `signature` over `message` with the certificate's subject key.
pub(super) fn verify_with_certificate(
    cert: &X509Certificate<'_>,
    alg: CoseAlgorithm,
    message: &[u8],
    signature: &[u8],
) -> Result<(), WebAuthnError> {
    let key = cert.public_key().subject_public_key.data.as_ref();
    UnparsedPublicKey::new(alg.verification_algorithm(), key)
        .verify(message, signature)
        .map_err(|_| {
            tracing::error!("Attestation signature verification failed with {}", alg);
            tracing::debug!("Signature: {}", hex::encode(signature));
            tracing::debug!("Signed data: {}", hex::encode(message));
            tracing::debug!("Certificate key: {}", hex::encode(key));
            WebAuthnError::Crypto("Attestation signature invalid".to_string())
        })
}

/// Requires the certificate's SubjectPublicKeyInfo to encode the credential
/// key.
pub(super) fn check_certificate_key_matches(
    cert: &X509Certificate<'_>,
    credential_key: &CoseKey,
) -> Result<(), WebAuthnError> {
    let cert_key = cert.public_key().raw;
    let credential_der = credential_key.to_der()?;
    if cert_key != credential_der.as_slice() {
        tracing::warn!(
            "Certificate key mismatch. Certificate: {}, Credential: {}",
            hex::encode(cert_key),
            hex::encode(&credential_der)
        );
        return Err(WebAuthnError::Verification(
            "Certificate public key does not match credential public key".to_string(),
        ));
    }
    Ok(())
}

pub(super) fn check_version_3(cert: &X509Certificate<'_>) -> Result<(), WebAuthnError> {
    if cert.version() != X509Version::V3 {
        tracing::warn!("Attestation certificate version: {:?}", cert.version());
        return Err(WebAuthnError::Verification(
            "Attestation certificate version must be 3".to_string(),
        ));
    }
    Ok(())
}

/// Rejects CA certificates. A missing basicConstraints extension passes.
pub(super) fn check_not_ca(cert: &X509Certificate<'_>) -> Result<(), WebAuthnError> {
    let constraints = cert.basic_constraints().map_err(|e| {
        WebAuthnError::Verification(format!("Invalid basic constraints extension: {e}"))
    })?;
    if constraints.is_some_and(|bc| bc.value.ca) {
        tracing::warn!("Attestation certificate is a CA certificate");
        return Err(WebAuthnError::Verification(
            "Certificate must not be a CA certificate".to_string(),
        ));
    }
    Ok(())
}

pub(super) fn find_extension<'a, 'b>(
    cert: &'b X509Certificate<'a>,
    oid: &str,
) -> Option<&'b X509Extension<'a>> {
    cert.extensions()
        .iter()
        .find(|ext| ext.oid.to_id_string() == oid)
}

/// When the certificate carries id-fido-gen-ce-aaguid, it must be non-critical
/// and equal the AAGUID from authenticator data.
pub(super) fn check_aaguid_extension(
    cert: &X509Certificate<'_>,
    aaguid: &Uuid,
) -> Result<(), WebAuthnError> {
    let Some(ext) = find_extension(cert, OID_FIDO_GEN_CE_AAGUID) else {
        return Ok(());
    };

    if ext.critical {
        return Err(WebAuthnError::Verification(
            "AAGUID extension must not be critical".to_string(),
        ));
    }

    // OCTET STRING (16 bytes)
    let value = ext.value;
    if value.len() != 18 || value[0] != 0x04 || value[1] != 0x10 {
        return Err(WebAuthnError::Verification(
            "Invalid AAGUID extension encoding".to_string(),
        ));
    }
    if &value[2..] != aaguid.as_bytes() {
        tracing::warn!(
            "AAGUID mismatch. Certificate: {}, Authenticator data: {}",
            hex::encode(&value[2..]),
            aaguid
        );
        return Err(WebAuthnError::Verification(
            "AAGUID in certificate does not match authenticator data".to_string(),
        ));
    }
    Ok(())
}

/// Parses one DER value from an extension payload.
pub(super) fn parse_der_value(data: &[u8]) -> Result<BerObject<'_>, WebAuthnError> {
    parse_der(data)
        .map(|(_, obj)| obj)
        .map_err(|e| WebAuthnError::Verification(format!("Invalid DER in extension: {e}")))
}

/// Tag number and inner bytes of a context-specific explicit tag.
pub(super) fn tagged_content<'a>(obj: &BerObject<'a>) -> Option<(u32, &'a [u8])> {
    if !obj.header.is_contextspecific() {
        return None;
    }
    obj.as_slice().ok().map(|data| (obj.header.tag().0, data))
}

/// OIDs of the AlgorithmIdentifier in a DER SubjectPublicKeyInfo, algorithm
/// first.
pub(super) fn spki_algorithm_oids(spki: &[u8]) -> Result<Vec<Vec<u8>>, WebAuthnError> {
    let spki = parse_der_value(spki)?;
    let algorithm = spki
        .as_sequence()
        .ok()
        .and_then(|items| items.first())
        .and_then(|alg| alg.as_sequence().ok())
        .ok_or_else(|| WebAuthnError::Verification("Malformed SubjectPublicKeyInfo".into()))?;

    Ok(algorithm
        .iter()
        .filter_map(|item| match &item.content {
            BerObjectContent::OID(oid) => Some(oid.as_bytes().to_vec()),
            _ => None,
        })
        .collect())
}
