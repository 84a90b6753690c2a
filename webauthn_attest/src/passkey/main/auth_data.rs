use ciborium::value::Value as CborValue;
use uuid::Uuid;

use crate::passkey::errors::WebAuthnError;

use super::cose::CoseKey;
use super::types::{AuthData, auth_data_flags};

const RP_ID_HASH_LEN: usize = 32;
const HEADER_LEN: usize = 37;
const AAGUID_LEN: usize = 16;

/// Decodes authenticatorData.
///
/// Layout:
/// - RP ID hash (32 bytes)
/// - Flags (1 byte)
/// - Counter (4 bytes, big-endian)
/// - Attested credential data, when the AT flag is set: AAGUID (16 bytes),
///   credential ID length (2 bytes, big-endian), credential ID, COSE key
/// - One CBOR value of extensions, if any bytes remain
///
/// Flags are only used to find the parts; whether they are acceptable is a
/// verifier decision.
///
/// # Errors
/// * `WebAuthnError::Format` - If the data is truncated, the COSE key lacks
///   `kty`, or bytes are left after the extensions
pub fn decode_auth_data(data: &[u8]) -> Result<AuthData, WebAuthnError> {
    if data.len() < HEADER_LEN {
        tracing::warn!("Authenticator data too short: {} bytes", data.len());
        return Err(WebAuthnError::Format(format!(
            "Authenticator data too short: {} bytes",
            data.len()
        )));
    }

    let mut rp_id_hash = [0u8; RP_ID_HASH_LEN];
    rp_id_hash.copy_from_slice(&data[..RP_ID_HASH_LEN]);
    let flags = data[32];
    let sign_count = u32::from_be_bytes([data[33], data[34], data[35], data[36]]);

    let mut rest = &data[HEADER_LEN..];
    let mut aaguid = None;
    let mut credential_id = None;
    let mut credential_public_key = None;

    if flags & auth_data_flags::AT != 0 {
        if rest.len() < AAGUID_LEN + 2 {
            tracing::warn!("Attested credential data truncated");
            return Err(WebAuthnError::Format(
                "Authenticator data too short for attested credential data".to_string(),
            ));
        }
        let id = Uuid::from_slice(&rest[..AAGUID_LEN])
            .map_err(|e| WebAuthnError::Format(format!("Failed to parse AAGUID: {e}")))?;
        let id_len = u16::from_be_bytes([rest[AAGUID_LEN], rest[AAGUID_LEN + 1]]) as usize;
        rest = &rest[AAGUID_LEN + 2..];

        if rest.len() < id_len {
            tracing::warn!(
                "Credential ID length {} exceeds remaining {} bytes",
                id_len,
                rest.len()
            );
            return Err(WebAuthnError::Format(
                "Credential ID length exceeds authenticator data".to_string(),
            ));
        }
        credential_id = Some(rest[..id_len].to_vec());
        rest = &rest[id_len..];

        let key_start = rest;
        let key_value: CborValue = ciborium::de::from_reader(&mut rest).map_err(|e| {
            tracing::warn!("Invalid credential public key CBOR: {}", e);
            WebAuthnError::Format(format!("Invalid public key CBOR: {e}"))
        })?;
        let key_bytes = key_start[..key_start.len() - rest.len()].to_vec();
        credential_public_key = Some(CoseKey::from_cbor_value(&key_value, key_bytes).map_err(
            |e| {
                tracing::warn!("Invalid credential public key: {}", e);
                e
            },
        )?);
        aaguid = Some(id);
    }

    let extensions = if rest.is_empty() {
        None
    } else {
        let value: CborValue = ciborium::de::from_reader(&mut rest).map_err(|e| {
            tracing::warn!("Invalid extensions CBOR: {}", e);
            WebAuthnError::Format(format!("Invalid extensions CBOR: {e}"))
        })?;
        if !rest.is_empty() {
            tracing::warn!("{} bytes left after authenticator data", rest.len());
            return Err(WebAuthnError::Format(format!(
                "{} trailing bytes in authenticator data",
                rest.len()
            )));
        }
        Some(value)
    };

    Ok(AuthData {
        rp_id_hash,
        flags,
        sign_count,
        aaguid,
        credential_id,
        credential_public_key,
        extensions,
    })
}
