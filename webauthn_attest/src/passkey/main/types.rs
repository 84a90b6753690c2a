use ciborium::value::Value as CborValue;
use std::fmt;
use uuid::Uuid;

use super::cose::CoseKey;

/// `type` member of clientDataJSON
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientDataType {
    /// `webauthn.create`
    Create,
    /// `webauthn.get`
    Get,
}

impl ClientDataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "webauthn.create",
            Self::Get => "webauthn.get",
        }
    }
}

impl fmt::Display for ClientDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded and shape-checked clientDataJSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientData {
    pub type_: ClientDataType,
    /// Challenge as raw bytes
    pub challenge: Vec<u8>,
    pub origin: String,
    pub cross_origin: bool,
    pub top_origin: Option<String>,
}

/// Flags for AuthData as defined in WebAuthn Level 2
pub mod auth_data_flags {
    /// User Present (UP) - Bit 0
    pub const UP: u8 = 1 << 0;
    /// User Verified (UV) - Bit 2
    pub const UV: u8 = 1 << 2;
    /// Backup Eligibility (BE) - Bit 3
    pub const BE: u8 = 1 << 3;
    /// Backup State (BS) - Bit 4
    pub const BS: u8 = 1 << 4;
    /// Attested Credential Data Present (AT) - Bit 6
    pub const AT: u8 = 1 << 6;
    /// Extension Data Present (ED) - Bit 7
    pub const ED: u8 = 1 << 7;
}

/// authenticatorData as defined in WebAuthn Level 2
/// https://www.w3.org/TR/webauthn-2/#sctn-authenticator-data
#[derive(Debug, Clone, PartialEq)]
pub struct AuthData {
    /// SHA-256 hash of the RP ID
    pub rp_id_hash: [u8; 32],
    pub flags: u8,
    /// Signature counter, big-endian on the wire
    pub sign_count: u32,
    /// Present only with attested credential data
    pub aaguid: Option<Uuid>,
    pub credential_id: Option<Vec<u8>>,
    pub credential_public_key: Option<CoseKey>,
    pub extensions: Option<CborValue>,
}

impl AuthData {
    pub fn is_user_present(&self) -> bool {
        (self.flags & auth_data_flags::UP) != 0
    }

    pub fn is_user_verified(&self) -> bool {
        (self.flags & auth_data_flags::UV) != 0
    }

    pub fn is_backup_eligible(&self) -> bool {
        (self.flags & auth_data_flags::BE) != 0
    }

    pub fn is_backed_up(&self) -> bool {
        (self.flags & auth_data_flags::BS) != 0
    }

    pub fn has_attested_credential_data(&self) -> bool {
        (self.flags & auth_data_flags::AT) != 0
    }

    pub fn has_extension_data(&self) -> bool {
        (self.flags & auth_data_flags::ED) != 0
    }
}

/// Attestation statement formats registered with IANA for WebAuthn.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttestationFormat {
    Packed,
    Tpm,
    AndroidKey,
    AndroidSafetyNet,
    FidoU2f,
    Apple,
    AppleAppAttest,
    None,
    /// Syntactically valid but unregistered identifier
    Unknown(String),
}

impl AttestationFormat {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Packed => "packed",
            Self::Tpm => "tpm",
            Self::AndroidKey => "android-key",
            Self::AndroidSafetyNet => "android-safetynet",
            Self::FidoU2f => "fido-u2f",
            Self::Apple => "apple",
            Self::AppleAppAttest => "apple-appattest",
            Self::None => "none",
            Self::Unknown(fmt) => fmt,
        }
    }
}

impl From<&str> for AttestationFormat {
    fn from(fmt: &str) -> Self {
        match fmt {
            "packed" => Self::Packed,
            "tpm" => Self::Tpm,
            "android-key" => Self::AndroidKey,
            "android-safetynet" => Self::AndroidSafetyNet,
            "fido-u2f" => Self::FidoU2f,
            "apple" => Self::Apple,
            "apple-appattest" => Self::AppleAppAttest,
            "none" => Self::None,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for AttestationFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// attStmt with every member any registered format uses. Which members are
/// set depends on the format.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttestationStatement {
    /// COSE algorithm identifier
    pub alg: Option<i64>,
    pub sig: Option<Vec<u8>>,
    /// DER certificates, attestation certificate first
    pub x5c: Option<Vec<Vec<u8>>>,
    pub ecdaa_key_id: Option<Vec<u8>>,
    pub ver: Option<String>,
    /// TPMT_PUBLIC
    pub pub_area: Option<Vec<u8>>,
    /// TPMS_ATTEST
    pub cert_info: Option<Vec<u8>>,
    /// SafetyNet JWS
    pub response: Option<Vec<u8>>,
    pub receipt: Option<Vec<u8>>,
    /// The attStmt map as received
    pub members: Vec<(CborValue, CborValue)>,
}

/// Decoded attestationObject.
#[derive(Debug, Clone, PartialEq)]
pub struct AttestationObject {
    pub fmt: AttestationFormat,
    /// Undecoded authData, the signature base of most formats
    pub auth_data_raw: Vec<u8>,
    pub auth_data: AuthData,
    pub att_stmt: Option<AttestationStatement>,
}
