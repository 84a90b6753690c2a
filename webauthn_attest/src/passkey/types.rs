use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::utils::{base64url_decode, base64url_encode};

use super::errors::WebAuthnError;
use super::main::{AttestationFormat, AuthenticatorMetadata, CoseKey};

/// Trust level established by an attestation statement.
///
/// Serialized with the FIDO metadata service names (`basic_full`, `attca`, ...)
/// so that entries from an AAGUID metadata file deserialize directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttestationLevel {
    #[serde(rename = "none")]
    None,
    #[serde(rename = "basic_surrogate")]
    SelfAttestation,
    #[serde(rename = "basic_full")]
    Basic,
    #[serde(rename = "attca")]
    AttCa,
    #[serde(rename = "anonca")]
    AnonCa,
    #[serde(rename = "ecdaa")]
    Ecdaa,
}

impl AttestationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::SelfAttestation => "basic_surrogate",
            Self::Basic => "basic_full",
            Self::AttCa => "attca",
            Self::AnonCa => "anonca",
            Self::Ecdaa => "ecdaa",
        }
    }
}

impl fmt::Display for AttestationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttestationLevel {
    type Err = WebAuthnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "basic_surrogate" | "self" => Ok(Self::SelfAttestation),
            "basic_full" | "basic" => Ok(Self::Basic),
            "attca" => Ok(Self::AttCa),
            "anonca" => Ok(Self::AnonCa),
            "ecdaa" => Ok(Self::Ecdaa),
            other => Err(WebAuthnError::Config(format!(
                "Unknown attestation level: {other}"
            ))),
        }
    }
}

/// Outcome of a successful registration ceremony.
///
/// The engine stores nothing. The caller persists `credential_id`,
/// `public_key` and `sign_count`, and must bind the key to the credential ID
/// at most once.
#[derive(Debug, Clone)]
pub struct RegisteredCredential {
    pub credential_id: Vec<u8>,
    pub public_key: CoseKey,
    pub aaguid: Uuid,
    pub sign_count: u32,
    pub format: AttestationFormat,
    pub attestation_level: AttestationLevel,
    pub user_verified: bool,
    pub backup_eligible: bool,
    pub backed_up: bool,
    /// Metadata the provider holds for `aaguid`, if any
    pub metadata: Option<AuthenticatorMetadata>,
}

impl RegisteredCredential {
    pub fn credential_id_base64url(&self) -> String {
        base64url_encode(&self.credential_id)
    }
}

/// Outcome of a successful assertion ceremony.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssertionOutcome {
    /// Counter to persist in place of the previous one
    pub sign_count: u32,
    pub user_verified: bool,
    pub backed_up: bool,
}

/// `PublicKeyCredential` JSON posted by the browser after
/// `navigator.credentials.create()`.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResponse {
    pub id: String,
    pub raw_id: String,
    pub response: AuthenticatorAttestationResponse,
    #[serde(rename = "type")]
    pub type_: String,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorAttestationResponse {
    #[serde(rename = "clientDataJSON", alias = "client_data_json")]
    pub client_data_json: String,
    #[serde(alias = "attestation_object")]
    pub attestation_object: String,
}

/// Raw bytes of a [`RegistrationResponse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedRegistration {
    pub credential_id: Vec<u8>,
    pub client_data_json: Vec<u8>,
    pub attestation_object: Vec<u8>,
}

impl RegistrationResponse {
    pub fn decode(&self) -> Result<DecodedRegistration, WebAuthnError> {
        Ok(DecodedRegistration {
            credential_id: base64url_decode(&self.raw_id)?,
            client_data_json: base64url_decode(&self.response.client_data_json)?,
            attestation_object: base64url_decode(&self.response.attestation_object)?,
        })
    }
}

/// `PublicKeyCredential` JSON posted by the browser after
/// `navigator.credentials.get()`.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AssertionResponse {
    pub id: String,
    pub raw_id: String,
    pub response: AuthenticatorAssertionResponse,
    #[serde(rename = "type")]
    pub type_: String,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorAssertionResponse {
    #[serde(rename = "clientDataJSON", alias = "client_data_json")]
    pub client_data_json: String,
    #[serde(alias = "authenticator_data")]
    pub authenticator_data: String,
    pub signature: String,
    #[serde(default, alias = "user_handle")]
    pub user_handle: Option<String>,
}

/// Raw bytes of an [`AssertionResponse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedAssertion {
    pub credential_id: Vec<u8>,
    pub client_data_json: Vec<u8>,
    pub authenticator_data: Vec<u8>,
    pub signature: Vec<u8>,
    pub user_handle: Option<Vec<u8>>,
}

impl AssertionResponse {
    pub fn decode(&self) -> Result<DecodedAssertion, WebAuthnError> {
        let user_handle = match self.response.user_handle.as_deref() {
            None | Some("") => None,
            Some(handle) => Some(base64url_decode(handle)?),
        };

        Ok(DecodedAssertion {
            credential_id: base64url_decode(&self.raw_id)?,
            client_data_json: base64url_decode(&self.response.client_data_json)?,
            authenticator_data: base64url_decode(&self.response.authenticator_data)?,
            signature: base64url_decode(&self.response.signature)?,
            user_handle,
        })
    }
}
