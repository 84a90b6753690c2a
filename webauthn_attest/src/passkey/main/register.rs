use subtle::ConstantTimeEq;

use crate::passkey::config::RelyingPartyConfig;
use crate::passkey::errors::WebAuthnError;
use crate::passkey::types::{RegisteredCredential, RegistrationResponse};
use crate::utils::sha256;

use super::aaguid::MetadataProvider;
use super::attestation::{AttestationInput, verify_attestation};
use super::attestation_object::decode_attestation_object;
use super::client_data::decode_client_data;
use super::types::{AttestationObject, ClientDataType};
use super::utils::{verify_auth_data, verify_client_data};

/// Verifies a registration ceremony.
///
/// Runs the client data checks (type `webauthn.create`, challenge, origin),
/// the authenticator data checks (RP ID hash, UP, UV when required), requires
/// an attested credential with an acceptable algorithm, and then verifies the
/// attestation statement for `attestation.fmt`.
///
/// Acceptable attestation levels from `config` are logged next to the levels
/// the metadata provider declares for the AAGUID, but are not enforced.
///
/// The engine stores nothing. The caller must bind the returned public key to
/// the credential ID at most once and reject IDs that are already registered.
///
/// # Arguments
/// * `config` - Relying party the ceremony must belong to
/// * `metadata` - AAGUID lookup used to label the authenticator
/// * `client_data_json` - Raw `clientDataJSON` bytes as sent by the browser
/// * `attestation` - The decoded attestation object
/// * `known_challenge` - Challenge issued for this ceremony
///
/// # Returns
/// * `Ok(RegisteredCredential)` - The credential ID, public key, initial
///   counter and attestation level to store
/// * `Err(WebAuthnError)` - If any check fails
///
/// # Errors
/// * `WebAuthnError::ClientData` / `WebAuthnError::Challenge` - If the client
///   data does not belong to this ceremony
/// * `WebAuthnError::AuthenticatorData` - If RP ID hash or flags are wrong, or
///   no credential is attested
/// * `WebAuthnError::UnsupportedFormat` - If the attestation format is not verified
/// * `WebAuthnError::Verification` - If the credential algorithm is not
///   acceptable
/// * `WebAuthnError::Verification` / `WebAuthnError::Crypto` - If the
///   attestation statement does not verify
pub fn verify_registration(
    config: &RelyingPartyConfig,
    metadata: &dyn MetadataProvider,
    client_data_json: &[u8],
    attestation: &AttestationObject,
    known_challenge: &[u8],
) -> Result<RegisteredCredential, WebAuthnError> {
    let client_data = decode_client_data(client_data_json)?;
    tracing::debug!("Parsed client data: {:?}", client_data);
    verify_client_data(
        &client_data,
        ClientDataType::Create,
        known_challenge,
        config,
    )?;

    let auth_data = &attestation.auth_data;
    verify_auth_data(auth_data, config)?;

    let (Some(aaguid), Some(credential_id), Some(credential_key)) = (
        auth_data.aaguid,
        auth_data.credential_id.as_deref(),
        auth_data.credential_public_key.as_ref(),
    ) else {
        tracing::error!("No attested credential data present");
        return Err(WebAuthnError::AuthenticatorData(
            "No attested credential data".to_string(),
        ));
    };

    let algorithm = credential_key.algorithm()?;
    if !config.acceptable_algorithms().contains(&algorithm) {
        tracing::warn!(
            "Credential algorithm {} not in {:?}",
            algorithm,
            config.acceptable_algorithms()
        );
        return Err(WebAuthnError::Verification(format!(
            "Credential algorithm {algorithm} is not acceptable"
        )));
    }

    let client_data_hash = sha256(client_data_json);
    let input = AttestationInput {
        statement: attestation.att_stmt.as_ref(),
        auth_data_raw: &attestation.auth_data_raw,
        auth_data,
        client_data_hash: &client_data_hash,
        credential_id,
        credential_key,
        aaguid,
        config,
    };
    let attestation_level = verify_attestation(attestation, &input)?;

    let metadata = metadata.lookup(&aaguid);
    match &metadata {
        Some(info) => tracing::debug!(
            "Authenticator {} ({}) declares attestation types {:?}",
            info.name,
            aaguid,
            info.attestation_types
        ),
        None => tracing::debug!("No metadata for AAGUID {}", aaguid),
    }
    let acceptable = config.acceptable_attestation_levels();
    if !acceptable.is_empty() && !acceptable.contains(&attestation_level) {
        tracing::info!(
            "Attestation level {} is outside the acceptable levels {:?} (not enforced)",
            attestation_level,
            acceptable
        );
    }

    tracing::debug!(
        "Registered credential: format {}, level {}, UV {}, BE {}, BS {}",
        attestation.fmt,
        attestation_level,
        auth_data.is_user_verified(),
        auth_data.is_backup_eligible(),
        auth_data.is_backed_up()
    );

    Ok(RegisteredCredential {
        credential_id: credential_id.to_vec(),
        public_key: credential_key.clone(),
        aaguid,
        sign_count: auth_data.sign_count,
        format: attestation.fmt.clone(),
        attestation_level,
        user_verified: auth_data.is_user_verified(),
        backup_eligible: auth_data.is_backup_eligible(),
        backed_up: auth_data.is_backed_up(),
        metadata,
    })
}

/// Verifies the browser's `PublicKeyCredential` JSON from
/// `navigator.credentials.create()`.
///
/// In addition to [`verify_registration`], `rawId` must equal the credential ID
/// in authenticator data.
///
/// # Arguments
/// * `config` - Relying party the ceremony must belong to
/// * `metadata` - AAGUID lookup used to label the authenticator
/// * `response` - The credential as serialized by the browser
/// * `known_challenge` - Challenge issued for this ceremony
///
/// # Returns
/// * `Ok(RegisteredCredential)` - The credential to store
/// * `Err(WebAuthnError)` - If decoding or any check fails
///
/// # Errors
/// * `WebAuthnError::Format` - If the credential type is not `public-key` or the
///   attestation object is malformed
/// * `WebAuthnError::Utils` - If a field is not valid base64url
/// * `WebAuthnError::Verification` - If `rawId` differs from the attested
///   credential ID
/// * Any error of [`verify_registration`]
pub fn verify_registration_response(
    config: &RelyingPartyConfig,
    metadata: &dyn MetadataProvider,
    response: &RegistrationResponse,
    known_challenge: &[u8],
) -> Result<RegisteredCredential, WebAuthnError> {
    if response.type_ != "public-key" {
        return Err(WebAuthnError::Format(format!(
            "Invalid credential type: {}",
            response.type_
        )));
    }

    let decoded = response.decode()?;
    let attestation = decode_attestation_object(&decoded.attestation_object)?;
    let registered = verify_registration(
        config,
        metadata,
        &decoded.client_data_json,
        &attestation,
        known_challenge,
    )?;

    if !bool::from(registered.credential_id.ct_eq(&decoded.credential_id)) {
        tracing::warn!(
            "rawId {} differs from attested credential ID {}",
            response.raw_id,
            registered.credential_id_base64url()
        );
        return Err(WebAuthnError::Verification(
            "rawId does not match attested credential ID".to_string(),
        ));
    }

    Ok(registered)
}
