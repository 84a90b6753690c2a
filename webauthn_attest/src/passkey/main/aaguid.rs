use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::passkey::errors::WebAuthnError;
use crate::passkey::types::AttestationLevel;

/// Display information and declared attestation types of an authenticator
/// model.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct AuthenticatorMetadata {
    pub name: String,
    pub icon_dark: Option<String>,
    pub icon_light: Option<String>,
    #[serde(default)]
    pub attestation_types: Vec<AttestationLevel>,
}

impl Default for AuthenticatorMetadata {
    fn default() -> Self {
        Self {
            name: "Unknown Authenticator".to_string(),
            icon_dark: None,
            icon_light: None,
            attestation_types: Vec::new(),
        }
    }
}

/// Source of authenticator metadata, keyed by AAGUID.
///
/// Implementations are passed into each registration call.
pub trait MetadataProvider {
    fn lookup(&self, aaguid: &Uuid) -> Option<AuthenticatorMetadata>;
}

/// Provider for deployments without metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMetadata;

impl MetadataProvider for NoMetadata {
    fn lookup(&self, _aaguid: &Uuid) -> Option<AuthenticatorMetadata> {
        None
    }
}

const AAGUID_JSON: &str = include_str!("../../../assets/aaguid.json");

/// In-memory AAGUID map in the community `combined_aaguid.json` format.
#[derive(Debug, Clone, Default)]
pub struct AaguidMetadataStore {
    entries: HashMap<Uuid, AuthenticatorMetadata>,
}

impl AaguidMetadataStore {
    /// Parses a JSON object mapping AAGUID strings to metadata entries.
    ///
    /// # Errors
    /// * `WebAuthnError::Format` - If the JSON is malformed or a key is not a UUID
    pub fn from_json(json: &str) -> Result<Self, WebAuthnError> {
        let raw: HashMap<String, AuthenticatorMetadata> =
            serde_json::from_str(json).map_err(|e| {
                tracing::error!("Failed to parse AAGUID JSON: {}", e);
                WebAuthnError::Format(format!("Invalid AAGUID JSON: {e}"))
            })?;

        let entries = raw
            .into_iter()
            .map(|(aaguid, info)| {
                Uuid::parse_str(&aaguid)
                    .map(|id| (id, info))
                    .map_err(|e| WebAuthnError::Format(format!("Invalid AAGUID {aaguid}: {e}")))
            })
            .collect::<Result<HashMap<_, _>, _>>()?;

        tracing::debug!("Loaded {} AAGUID mappings", entries.len());
        Ok(Self { entries })
    }

    /// The mappings bundled with the crate.
    pub fn builtin() -> Result<Self, WebAuthnError> {
        Self::from_json(AAGUID_JSON)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl MetadataProvider for AaguidMetadataStore {
    fn lookup(&self, aaguid: &Uuid) -> Option<AuthenticatorMetadata> {
        self.entries.get(aaguid).cloned()
    }
}
