use thiserror::Error;

use crate::utils::UtilError;

/// Errors that can occur while decoding or verifying WebAuthn ceremonies.
///
/// Every failure is terminal for the ceremony in progress. Use
/// [`WebAuthnError::category`] to branch on the coarse failure kind.
#[derive(Debug, Error)]
pub enum WebAuthnError {
    /// Misuse of the API, e.g. an empty RP ID or origin
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed CBOR, JSON, Base64URL, TPM or ASN.1 input
    #[error("Invalid format: {0}")]
    Format(String),

    /// clientDataJSON is well-formed but has the wrong shape or type
    #[error("Invalid client data: {0}")]
    ClientData(String),

    /// Challenge in clientDataJSON does not match the expected one
    #[error("Invalid challenge: {0}")]
    Challenge(String),

    /// authenticatorData failed an RP ID hash or flag check
    #[error("Invalid authenticator data: {0}")]
    AuthenticatorData(String),

    /// An attestation statement check failed
    #[error("Verification error: {0}")]
    Verification(String),

    /// The attestation format is recognised but cannot be verified
    #[error("Unsupported attestation format: {0}")]
    UnsupportedFormat(String),

    /// Signature verification or key material failure
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// Assertion rejected, e.g. signature counter regression
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Error from utility operations
    #[error("Utils error: {0}")]
    Utils(#[from] UtilError),
}

/// Coarse failure kinds for callers that do not care about the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Decode,
    Validation,
    UnsupportedFormat,
    Crypto,
    Misuse,
}

impl WebAuthnError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_) => ErrorCategory::Misuse,
            Self::Format(_) | Self::Utils(_) => ErrorCategory::Decode,
            Self::ClientData(_)
            | Self::Challenge(_)
            | Self::AuthenticatorData(_)
            | Self::Verification(_)
            | Self::Authentication(_) => ErrorCategory::Validation,
            Self::UnsupportedFormat(_) => ErrorCategory::UnsupportedFormat,
            Self::Crypto(_) => ErrorCategory::Crypto,
        }
    }
}
