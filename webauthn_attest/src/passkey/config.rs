use std::env;
use std::str::FromStr;

use super::errors::WebAuthnError;
use super::main::CoseAlgorithm;
use super::types::AttestationLevel;

/// User verification requirement of the relying party.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserVerification {
    Required,
    Preferred,
    #[default]
    Discouraged,
}

impl UserVerification {
    pub fn is_required(&self) -> bool {
        matches!(self, Self::Required)
    }
}

impl FromStr for UserVerification {
    type Err = WebAuthnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "required" => Ok(Self::Required),
            "preferred" => Ok(Self::Preferred),
            "discouraged" => Ok(Self::Discouraged),
            other => Err(WebAuthnError::Config(format!(
                "Invalid user verification: {other}"
            ))),
        }
    }
}

/// Relying party parameters every ceremony is checked against.
///
/// Passed explicitly into [`verify_registration`](crate::verify_registration) and
/// [`verify_assertion`](crate::verify_assertion); nothing is read from globals.
#[derive(Debug, Clone, PartialEq)]
pub struct RelyingPartyConfig {
    rp_id: String,
    origin: String,
    user_verification: UserVerification,
    attestation_required: bool,
    acceptable_attestation_levels: Vec<AttestationLevel>,
    acceptable_algorithms: Vec<CoseAlgorithm>,
}

const DEFAULT_ALGORITHMS: [CoseAlgorithm; 2] = [CoseAlgorithm::ES256, CoseAlgorithm::RS256];

impl RelyingPartyConfig {
    /// Creates a config for `rp_id` (e.g. `example.com`) and `origin`
    /// (e.g. `https://example.com`).
    ///
    /// # Errors
    /// * `WebAuthnError::Config` - If either value is empty
    pub fn new(rp_id: impl Into<String>, origin: impl Into<String>) -> Result<Self, WebAuthnError> {
        let rp_id = rp_id.into();
        let origin = origin.into();

        if rp_id.trim().is_empty() {
            return Err(WebAuthnError::Config("RP ID must not be empty".to_string()));
        }
        if origin.trim().is_empty() {
            return Err(WebAuthnError::Config("Origin must not be empty".to_string()));
        }

        Ok(Self {
            rp_id,
            origin,
            user_verification: UserVerification::default(),
            attestation_required: false,
            acceptable_attestation_levels: Vec::new(),
            acceptable_algorithms: DEFAULT_ALGORITHMS.to_vec(),
        })
    }

    pub fn with_user_verification(mut self, user_verification: UserVerification) -> Self {
        self.user_verification = user_verification;
        self
    }

    pub fn with_attestation_required(mut self, required: bool) -> Self {
        self.attestation_required = required;
        self
    }

    /// Attestation levels the caller is willing to accept. Carried through to
    /// registration and logged; no policy is applied to them.
    pub fn with_acceptable_attestation_levels(mut self, levels: Vec<AttestationLevel>) -> Self {
        self.acceptable_attestation_levels = levels;
        self
    }

    pub fn with_acceptable_algorithms(mut self, algorithms: Vec<CoseAlgorithm>) -> Self {
        self.acceptable_algorithms = algorithms;
        self
    }

    /// Builds a config from the process environment.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `ORIGIN` | required |
    /// | `PASSKEY_RP_ID` | host of `ORIGIN` |
    /// | `PASSKEY_USER_VERIFICATION` | `discouraged` |
    /// | `PASSKEY_ATTESTATION_REQUIRED` | `false` |
    /// | `PASSKEY_ACCEPTABLE_ATTESTATION` | empty |
    /// | `PASSKEY_ALGORITHMS` | `-7,-257` |
    ///
    /// Invalid optional values are logged and replaced by their default.
    pub fn from_env() -> Result<Self, WebAuthnError> {
        let origin = env::var("ORIGIN")
            .map_err(|_| WebAuthnError::Config("ORIGIN must be set".to_string()))?;
        let origin = origin.trim_end_matches('/').to_string();

        let rp_id = match env::var("PASSKEY_RP_ID") {
            Ok(rp_id) => rp_id,
            Err(_) => rp_id_from_origin(&origin)?,
        };

        let user_verification = env::var("PASSKEY_USER_VERIFICATION").map_or(
            UserVerification::Discouraged,
            |v| match v.parse() {
                Ok(uv) => uv,
                Err(_) => {
                    tracing::warn!(
                        "Invalid user verification: {}. Using default 'discouraged'",
                        v
                    );
                    UserVerification::Discouraged
                }
            },
        );

        let attestation_required = match env::var("PASSKEY_ATTESTATION_REQUIRED") {
            Ok(v) => match v.to_lowercase().as_str() {
                "true" => true,
                "false" => false,
                invalid => {
                    tracing::warn!(
                        "Invalid attestation_required: {}. Using default 'false'",
                        invalid
                    );
                    false
                }
            },
            Err(_) => false,
        };

        let acceptable_attestation_levels = env::var("PASSKEY_ACCEPTABLE_ATTESTATION")
            .map(|v| parse_list(&v, |s| s.parse::<AttestationLevel>().ok()))
            .unwrap_or_default();

        let acceptable_algorithms = env::var("PASSKEY_ALGORITHMS")
            .map(|v| {
                parse_list(&v, |s| {
                    s.parse::<i64>()
                        .ok()
                        .and_then(|id| CoseAlgorithm::try_from(id).ok())
                })
            })
            .unwrap_or_default();
        let acceptable_algorithms = if acceptable_algorithms.is_empty() {
            DEFAULT_ALGORITHMS.to_vec()
        } else {
            acceptable_algorithms
        };

        Ok(Self::new(rp_id, origin)?
            .with_user_verification(user_verification)
            .with_attestation_required(attestation_required)
            .with_acceptable_attestation_levels(acceptable_attestation_levels)
            .with_acceptable_algorithms(acceptable_algorithms))
    }

    pub fn rp_id(&self) -> &str {
        &self.rp_id
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn user_verification(&self) -> UserVerification {
        self.user_verification
    }

    pub fn attestation_required(&self) -> bool {
        self.attestation_required
    }

    pub fn acceptable_attestation_levels(&self) -> &[AttestationLevel] {
        &self.acceptable_attestation_levels
    }

    pub fn acceptable_algorithms(&self) -> &[CoseAlgorithm] {
        &self.acceptable_algorithms
    }
}

fn rp_id_from_origin(origin: &str) -> Result<String, WebAuthnError> {
    let url = url::Url::parse(origin)
        .map_err(|e| WebAuthnError::Config(format!("Invalid ORIGIN {origin}: {e}")))?;
    url.host_str()
        .map(|host| host.to_string())
        .ok_or_else(|| WebAuthnError::Config(format!("Could not extract RP ID from {origin}")))
}

fn parse_list<T>(raw: &str, parse: impl Fn(&str) -> Option<T>) -> Vec<T> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| {
            let parsed = parse(s);
            if parsed.is_none() {
                tracing::warn!("Ignoring invalid list entry: {}", s);
            }
            parsed
        })
        .collect()
}
