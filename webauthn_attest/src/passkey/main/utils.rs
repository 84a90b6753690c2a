use ciborium::value::Value as CborValue;
use subtle::ConstantTimeEq;

use crate::passkey::config::RelyingPartyConfig;
use crate::passkey::errors::WebAuthnError;
use crate::utils::sha256;

use super::types::{AuthData, ClientData, ClientDataType};

/// Converts a CBOR integer to `i64`, rejecting values outside its range.
pub(super) fn cbor_int(value: &CborValue) -> Option<i64> {
    value
        .as_integer()
        .and_then(|i| i64::try_from(i128::from(i)).ok())
}

/// Looks up a text key in a CBOR map.
pub(super) fn cbor_map_get<'a>(
    map: &'a [(CborValue, CborValue)],
    key: &str,
) -> Option<&'a CborValue> {
    map.iter()
        .find(|(k, _)| k.as_text() == Some(key))
        .map(|(_, v)| v)
}

/// Checks type, challenge and origin of decoded client data.
pub(super) fn verify_client_data(
    client_data: &ClientData,
    expected_type: ClientDataType,
    known_challenge: &[u8],
    config: &RelyingPartyConfig,
) -> Result<(), WebAuthnError> {
    if client_data.type_ != expected_type {
        tracing::warn!(
            "Client data type mismatch. Expected: {}, Got: {}",
            expected_type,
            client_data.type_
        );
        return Err(WebAuthnError::ClientData(format!(
            "Invalid type. Expected '{}', Got: '{}'",
            expected_type, client_data.type_
        )));
    }

    if !bool::from(client_data.challenge.ct_eq(known_challenge)) {
        tracing::warn!(
            "Challenge mismatch. Expected: {}, Got: {}",
            hex::encode(known_challenge),
            hex::encode(&client_data.challenge)
        );
        return Err(WebAuthnError::Challenge(
            "Challenge mismatch. For more details, run with RUST_LOG=debug".into(),
        ));
    }

    if client_data.origin != config.origin() {
        tracing::warn!(
            "Origin mismatch. Expected: {}, Got: {}",
            config.origin(),
            client_data.origin
        );
        return Err(WebAuthnError::ClientData(format!(
            "Invalid origin. Expected: {}, Got: {}",
            config.origin(),
            client_data.origin
        )));
    }

    Ok(())
}

/// Checks the RP ID hash and the UP/UV flags of decoded authenticator data.
pub(super) fn verify_auth_data(
    auth_data: &AuthData,
    config: &RelyingPartyConfig,
) -> Result<(), WebAuthnError> {
    let expected_hash = sha256(config.rp_id().as_bytes());
    if !bool::from(auth_data.rp_id_hash.ct_eq(&expected_hash)) {
        tracing::warn!(
            "RP ID hash mismatch. Expected: {}, Got: {}",
            hex::encode(expected_hash),
            hex::encode(auth_data.rp_id_hash)
        );
        return Err(WebAuthnError::AuthenticatorData(
            "Invalid RP ID hash".to_string(),
        ));
    }

    if !auth_data.is_user_present() {
        tracing::warn!("User Present flag not set. Flags: {:02x}", auth_data.flags);
        return Err(WebAuthnError::AuthenticatorData(
            "User Present flag not set".to_string(),
        ));
    }

    if config.user_verification().is_required() && !auth_data.is_user_verified() {
        tracing::warn!(
            "User verification required but flag not set. Flags: {:02x}",
            auth_data.flags
        );
        return Err(WebAuthnError::AuthenticatorData(format!(
            "User verification required but flag not set. Flags: {:02x}",
            auth_data.flags
        )));
    }

    tracing::debug!("Authenticator data verification passed");
    tracing::debug!("User present: {}", auth_data.is_user_present());
    tracing::debug!("User verified: {}", auth_data.is_user_verified());
    tracing::debug!("Backup eligible: {}", auth_data.is_backup_eligible());
    tracing::debug!("Backed up: {}", auth_data.is_backed_up());

    Ok(())
}
