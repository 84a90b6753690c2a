mod config;
mod errors;
mod main;
mod types;

pub use config::{RelyingPartyConfig, UserVerification};
pub use errors::{ErrorCategory, WebAuthnError};

pub use main::{
    AaguidMetadataStore, AssertionRequest, AttestationFormat, AttestationObject,
    AttestationStatement, AuthData, AuthenticatorMetadata, ClientData, ClientDataType,
    CoseAlgorithm, CoseKey, CoseKeyParams, MetadataProvider, NoMetadata, TpmCertInfo, TpmClockInfo,
    TpmKeyParameters, TpmPubArea, TpmUnique, auth_data_flags, decode_attestation_object,
    decode_auth_data, decode_client_data, decode_tpm_cert_info, decode_tpm_pub_area,
    verify_assertion, verify_assertion_response, verify_registration, verify_registration_response,
};

pub use types::{
    AssertionOutcome, AssertionResponse, AttestationLevel, AuthenticatorAssertionResponse,
    AuthenticatorAttestationResponse, DecodedAssertion, DecodedRegistration, RegisteredCredential,
    RegistrationResponse,
};
