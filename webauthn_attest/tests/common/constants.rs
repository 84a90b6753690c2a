/// Relying party the mock authenticator is bound to
pub const RP_ID: &str = "login.example.org";
pub const ORIGIN: &str = "https://login.example.org";

/// AAGUID of the YubiKey 5 Series entry in the bundled metadata
pub const YUBIKEY_5_AAGUID: [u8; 16] = [
    0xcb, 0x69, 0x48, 0x1e, 0x8f, 0xf7, 0x40, 0x39, 0x93, 0xec, 0x0a, 0x27, 0x29, 0xa1, 0x54,
    0xa8,
];

pub const FLAG_UP: u8 = 0x01;
pub const FLAG_UV: u8 = 0x04;
pub const FLAG_BE: u8 = 0x08;
pub const FLAG_BS: u8 = 0x10;

/// P-256 attestation key (PKCS#8) and its certificate: packed subject,
/// CA:FALSE, and the YubiKey 5 AAGUID in id-fido-gen-ce-aaguid
pub const ATTESTATION_KEY_PKCS8: &[u8] =
    include_bytes!("../../testdata/packed_attestation_p256.pk8");
pub const ATTESTATION_CERT_DER: &[u8] =
    include_bytes!("../../testdata/packed_attestation_p256.der");
