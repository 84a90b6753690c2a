mod aaguid;
mod attestation;
mod attestation_object;
mod auth;
mod auth_data;
mod client_data;
mod cose;
mod register;
#[cfg(test)]
mod test_utils;
mod tpm;
mod types;
mod utils;

pub use aaguid::{AaguidMetadataStore, AuthenticatorMetadata, MetadataProvider, NoMetadata};

pub use attestation_object::decode_attestation_object;
pub use auth_data::decode_auth_data;
pub use client_data::decode_client_data;
pub use tpm::{
    TpmCertInfo, TpmClockInfo, TpmKeyParameters, TpmPubArea, TpmUnique, decode_tpm_cert_info,
    decode_tpm_pub_area,
};

pub use cose::{CoseAlgorithm, CoseKey, CoseKeyParams};

pub use types::{
    AttestationFormat, AttestationObject, AttestationStatement, AuthData, ClientData,
    ClientDataType, auth_data_flags,
};

pub use auth::{AssertionRequest, verify_assertion, verify_assertion_response};
pub use register::{verify_registration, verify_registration_response};
