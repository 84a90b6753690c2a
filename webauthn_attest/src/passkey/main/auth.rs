use crate::passkey::config::RelyingPartyConfig;
use crate::passkey::errors::WebAuthnError;
use crate::passkey::types::{AssertionOutcome, AssertionResponse};
use crate::utils::sha256;

use super::auth_data::decode_auth_data;
use super::client_data::decode_client_data;
use super::cose::{CoseAlgorithm, CoseKey};
use super::types::ClientDataType;
use super::utils::{verify_auth_data, verify_client_data};

/// Inputs of an authentication ceremony, all taken from the caller's records
/// or the browser response.
#[derive(Debug, Clone, Copy)]
pub struct AssertionRequest<'a> {
    pub client_data_json: &'a [u8],
    pub authenticator_data: &'a [u8],
    pub signature: &'a [u8],
    /// Challenge issued for this ceremony
    pub known_challenge: &'a [u8],
    /// Key stored at registration
    pub public_key: &'a CoseKey,
    /// Algorithm the credential was registered with
    pub algorithm: CoseAlgorithm,
    /// Counter stored after the previous ceremony
    pub last_sign_count: u32,
}

/// Verifies an authentication ceremony.
///
/// Checks client data (type `webauthn.get`, challenge, origin), authenticator
/// data (RP ID hash, UP, UV when required), the signature over
/// `authenticatorData || SHA-256(clientDataJSON)` with the stored key, and the
/// signature counter.
///
/// The caller must serialize the read-compare-write of `last_sign_count` per
/// credential and persist `AssertionOutcome::sign_count` afterwards.
///
/// # Arguments
/// * `config` - Relying party the ceremony must belong to
/// * `request` - Browser response fields plus the stored key, algorithm and
///   counter
///
/// # Returns
/// * `Ok(AssertionOutcome)` - The new counter value to persist and the UV/BS
///   flags of this assertion
/// * `Err(WebAuthnError)` - If any check fails
///
/// # Errors
/// * `WebAuthnError::ClientData` / `WebAuthnError::Challenge` - If the client
///   data does not belong to this ceremony
/// * `WebAuthnError::AuthenticatorData` - If RP ID hash or flags are wrong
/// * `WebAuthnError::Crypto` - If `algorithm` differs from the key's `alg`, or
///   the signature does not verify
/// * `WebAuthnError::Authentication` - If the counter did not advance
pub fn verify_assertion(
    config: &RelyingPartyConfig,
    request: &AssertionRequest<'_>,
) -> Result<AssertionOutcome, WebAuthnError> {
    let client_data = decode_client_data(request.client_data_json)?;
    tracing::debug!("Parsed client data: {:?}", client_data);
    verify_client_data(
        &client_data,
        ClientDataType::Get,
        request.known_challenge,
        config,
    )?;

    let auth_data = decode_auth_data(request.authenticator_data)?;
    tracing::debug!("Parsed authenticator data: {:?}", auth_data);
    verify_auth_data(&auth_data, config)?;

    let algorithm = request.algorithm;
    if let Some(alg) = request.public_key.alg.filter(|alg| *alg != algorithm.id()) {
        tracing::warn!(
            "Algorithm mismatch - expected: {}, key declares: {}",
            algorithm,
            alg
        );
        return Err(WebAuthnError::Crypto(format!(
            "Stored key declares alg {alg}, expected {algorithm}"
        )));
    }

    let mut signed_data = Vec::with_capacity(request.authenticator_data.len() + 32);
    signed_data.extend_from_slice(request.authenticator_data);
    signed_data.extend_from_slice(&sha256(request.client_data_json));
    request
        .public_key
        .verify_signature(algorithm, &signed_data, request.signature)?;
    tracing::debug!("Signature verification successful");

    verify_sign_count(request.last_sign_count, auth_data.sign_count)?;

    Ok(AssertionOutcome {
        sign_count: auth_data.sign_count,
        user_verified: auth_data.is_user_verified(),
        backed_up: auth_data.is_backed_up(),
    })
}

/// Verifies the browser's `PublicKeyCredential` JSON from
/// `navigator.credentials.get()` against a stored key and counter.
///
/// The algorithm is the one declared by the stored key.
///
/// # Arguments
/// * `config` - Relying party the ceremony must belong to
/// * `response` - The credential as serialized by the browser
/// * `known_challenge` - Challenge issued for this ceremony
/// * `public_key` - Key stored at registration
/// * `last_sign_count` - Counter stored after the previous ceremony
///
/// # Returns
/// * `Ok(AssertionOutcome)` - The new counter value to persist
/// * `Err(WebAuthnError)` - If decoding or any check fails
///
/// # Errors
/// * `WebAuthnError::Format` - If the credential type is not `public-key`
/// * `WebAuthnError::Utils` - If a field is not valid base64url
/// * `WebAuthnError::Crypto` - If the stored key has no supported `alg`
/// * Any error of [`verify_assertion`]
pub fn verify_assertion_response(
    config: &RelyingPartyConfig,
    response: &AssertionResponse,
    known_challenge: &[u8],
    public_key: &CoseKey,
    last_sign_count: u32,
) -> Result<AssertionOutcome, WebAuthnError> {
    if response.type_ != "public-key" {
        return Err(WebAuthnError::Format(format!(
            "Invalid credential type: {}",
            response.type_
        )));
    }

    let decoded = response.decode()?;
    verify_assertion(
        config,
        &AssertionRequest {
            client_data_json: &decoded.client_data_json,
            authenticator_data: &decoded.authenticator_data,
            signature: &decoded.signature,
            known_challenge,
            public_key,
            algorithm: public_key.algorithm()?,
            last_sign_count,
        },
    )
}

/// The counter must grow. Authenticators without a counter report 0 every
/// time, which passes only while the stored value is also 0.
fn verify_sign_count(last_sign_count: u32, sign_count: u32) -> Result<(), WebAuthnError> {
    tracing::debug!(
        "Counter verification - stored: {}, received: {}",
        last_sign_count,
        sign_count
    );

    if sign_count == 0 && last_sign_count == 0 {
        tracing::debug!("Authenticator does not support counters");
        return Ok(());
    }

    if sign_count <= last_sign_count {
        tracing::warn!(
            "Counter verification failed - stored: {}, received: {}",
            last_sign_count,
            sign_count
        );
        return Err(WebAuthnError::Authentication(
            "Counter value did not increase - possible credential cloning detected".into(),
        ));
    }

    Ok(())
}
