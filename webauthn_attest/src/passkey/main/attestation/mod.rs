mod android_key;
mod apple;
mod core;
mod none;
mod packed;
mod tpm;
mod u2f;
mod utils;

pub(crate) use self::core::{AttestationInput, verify_attestation};
