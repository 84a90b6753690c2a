//! webauthn-attest - WebAuthn attestation and assertion verification
//!
//! This crate verifies the two WebAuthn ceremonies on the relying party side:
//! registration (attestation objects in the `packed`, `tpm`, `android-key`,
//! `fido-u2f`, `apple` and `none` formats) and authentication (assertion
//! signatures and signature counters). It holds no state; challenges,
//! credentials and counters are stored by the caller.

mod passkey;
mod utils;

// Ceremony verification
pub use passkey::{
    AssertionRequest, verify_assertion, verify_assertion_response, verify_registration,
    verify_registration_response,
};

// Decoders for the binary structures
pub use passkey::{
    decode_attestation_object, decode_auth_data, decode_client_data, decode_tpm_cert_info,
    decode_tpm_pub_area,
};

pub use passkey::{
    AssertionOutcome, AssertionResponse, AttestationFormat, AttestationLevel, AttestationObject,
    AttestationStatement, AuthData, AuthenticatorAssertionResponse,
    AuthenticatorAttestationResponse, ClientData, ClientDataType, CoseAlgorithm, CoseKey,
    CoseKeyParams, DecodedAssertion, DecodedRegistration, RegisteredCredential,
    RegistrationResponse, TpmCertInfo, TpmClockInfo, TpmKeyParameters, TpmPubArea, TpmUnique,
    auth_data_flags,
};

pub use passkey::{AaguidMetadataStore, AuthenticatorMetadata, MetadataProvider, NoMetadata};

pub use passkey::{ErrorCategory, RelyingPartyConfig, UserVerification, WebAuthnError};

pub use utils::UtilError;
