//! Fixture builders for ceremony tests
//!
//! Keys are generated with ring, authenticator data and attestation objects
//! are assembled byte by byte, and X.509 certificates are written with a small
//! DER encoder so every field a verifier inspects can be controlled.

use ciborium::value::Value;
use ring::rand::SystemRandom;
use ring::signature::{
    ECDSA_P256_SHA256_ASN1_SIGNING, ECDSA_P384_SHA384_ASN1_SIGNING, EcdsaKeyPair, Ed25519KeyPair,
    KeyPair,
};
use serde_json::json;

use crate::passkey::config::RelyingPartyConfig;
use crate::utils::{base64url_encode, sha256};

use super::attestation::AttestationInput;
use super::auth_data::decode_auth_data;
use super::cose::{CRV_P256, CRV_P384, CoseAlgorithm, CoseKey};
use super::tpm::{TPM_ALG_ECC, TPM_ALG_NULL, TPM_ALG_RSA, TPM_ALG_SHA256, TPM_GENERATED_VALUE};
use super::types::{AttestationStatement, AuthData, auth_data_flags};

pub(crate) const TEST_RP_ID: &str = "example.com";
pub(crate) const TEST_ORIGIN: &str = "https://example.com";
pub(crate) const TEST_AAGUID: [u8; 16] = [0x42; 16];
pub(crate) const TEST_CREDENTIAL_ID: [u8; 32] = [0x0c; 32];

/// Registration state shared by the attestation format tests
pub(crate) struct AttestationFixture {
    pub(crate) auth_data_raw: Vec<u8>,
    pub(crate) auth_data: AuthData,
    pub(crate) client_data_hash: [u8; 32],
    pub(crate) config: RelyingPartyConfig,
}

impl AttestationFixture {
    pub(crate) fn new(credential_key: &[u8]) -> Self {
        let auth_data_raw = AuthDataBuilder::new(TEST_RP_ID)
            .flags(auth_data_flags::UP | auth_data_flags::UV)
            .attested_credential(&TEST_AAGUID, &TEST_CREDENTIAL_ID, credential_key)
            .build();
        let auth_data = decode_auth_data(&auth_data_raw).unwrap();
        Self {
            auth_data_raw,
            auth_data,
            client_data_hash: sha256(b"client data json"),
            config: RelyingPartyConfig::new(TEST_RP_ID, TEST_ORIGIN).unwrap(),
        }
    }

    pub(crate) fn signed_data(&self) -> Vec<u8> {
        [self.auth_data_raw.as_slice(), &self.client_data_hash].concat()
    }

    pub(crate) fn input<'a>(
        &'a self,
        statement: Option<&'a AttestationStatement>,
    ) -> AttestationInput<'a> {
        AttestationInput {
            statement,
            auth_data_raw: &self.auth_data_raw,
            auth_data: &self.auth_data,
            client_data_hash: &self.client_data_hash,
            credential_id: self.auth_data.credential_id.as_deref().unwrap(),
            credential_key: self.auth_data.credential_public_key.as_ref().unwrap(),
            aaguid: self.auth_data.aaguid.unwrap(),
            config: &self.config,
        }
    }
}

pub(crate) const OID_FIDO_GEN_CE_AAGUID: &str = "1.3.6.1.4.1.45724.1.1.4";
pub(crate) const OID_BASIC_CONSTRAINTS: &str = "2.5.29.19";
pub(crate) const OID_EXT_KEY_USAGE: &str = "2.5.29.37";
pub(crate) const OID_SUBJECT_ALT_NAME: &str = "2.5.29.17";
pub(crate) const OID_TCG_KP_AIK_CERTIFICATE: &str = "2.23.133.8.3";
pub(crate) const OID_TPM_MANUFACTURER: &str = "2.23.133.2.1";
pub(crate) const OID_TPM_MODEL: &str = "2.23.133.2.2";
pub(crate) const OID_TPM_VERSION: &str = "2.23.133.2.3";
pub(crate) const OID_ANDROID_KEY_DESCRIPTION: &str = "1.3.6.1.4.1.11129.2.1.17";
pub(crate) const OID_APPLE_NONCE: &str = "1.2.840.113635.100.8.2";

/// An ECDSA key pair on P-256 or P-384
pub(crate) struct TestEcKey {
    pair: EcdsaKeyPair,
    curve: i64,
    rng: SystemRandom,
}

impl TestEcKey {
    pub(crate) fn generate() -> Self {
        Self::generate_on(CRV_P256)
    }

    pub(crate) fn generate_on(curve: i64) -> Self {
        let alg = if curve == CRV_P384 {
            &ECDSA_P384_SHA384_ASN1_SIGNING
        } else {
            &ECDSA_P256_SHA256_ASN1_SIGNING
        };
        let rng = SystemRandom::new();
        let pkcs8 = EcdsaKeyPair::generate_pkcs8(alg, &rng).unwrap();
        let pair = EcdsaKeyPair::from_pkcs8(alg, pkcs8.as_ref(), &rng).unwrap();
        Self { pair, curve, rng }
    }

    /// Uncompressed SEC1 point
    pub(crate) fn public_point(&self) -> Vec<u8> {
        self.pair.public_key().as_ref().to_vec()
    }

    pub(crate) fn coordinates(&self) -> (Vec<u8>, Vec<u8>) {
        let point = self.public_point();
        let size = (point.len() - 1) / 2;
        (point[1..1 + size].to_vec(), point[1 + size..].to_vec())
    }

    pub(crate) fn cose_alg(&self) -> i64 {
        if self.curve == CRV_P384 { -35 } else { -7 }
    }

    pub(crate) fn cose_key_bytes(&self) -> Vec<u8> {
        let (x, y) = self.coordinates();
        cose_key_bytes(&ec2_map(self.curve, &x, &y, self.cose_alg()))
    }

    pub(crate) fn cose_key(&self) -> CoseKey {
        CoseKey::from_cbor_bytes(&self.cose_key_bytes()).unwrap()
    }

    /// SubjectPublicKeyInfo written out by hand
    pub(crate) fn spki_der(&self) -> Vec<u8> {
        let curve_oid = if self.curve == CRV_P384 {
            der::oid("1.3.132.0.34")
        } else {
            der::oid("1.2.840.10045.3.1.7")
        };
        der::seq(&[
            der::seq(&[der::oid("1.2.840.10045.2.1"), curve_oid]),
            der::bit_string(&self.public_point()),
        ])
    }

    pub(crate) fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.pair
            .sign(&self.rng, message)
            .unwrap()
            .as_ref()
            .to_vec()
    }
}

pub(crate) struct TestEdKey {
    pair: Ed25519KeyPair,
}

impl TestEdKey {
    pub(crate) fn generate() -> Self {
        let rng = SystemRandom::new();
        let pkcs8 = Ed25519KeyPair::generate_pkcs8(&rng).unwrap();
        let pair = Ed25519KeyPair::from_pkcs8(pkcs8.as_ref()).unwrap();
        Self { pair }
    }

    pub(crate) fn cose_key_bytes(&self) -> Vec<u8> {
        let map = Value::Map(vec![
            (Value::Integer(1i64.into()), Value::Integer(1i64.into())),
            (Value::Integer(3i64.into()), Value::Integer((-8i64).into())),
            (Value::Integer((-1i64).into()), Value::Integer(6i64.into())),
            (
                Value::Integer((-2i64).into()),
                Value::Bytes(self.pair.public_key().as_ref().to_vec()),
            ),
        ]);
        cose_key_bytes(&map)
    }

    pub(crate) fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.pair.sign(message).as_ref().to_vec()
    }
}

const RSA_CREDENTIAL_PKCS8: &[u8] = include_bytes!("../../../testdata/rsa2048_credential.pk8");
const RSA_ATTESTATION_PKCS8: &[u8] = include_bytes!("../../../testdata/rsa2048_attestation.pk8");

// DigestInfo prefixes for EMSA-PKCS1-v1_5 (RFC 8017 section 9.2)
const SHA1_DIGEST_INFO: [u8; 15] = [
    0x30, 0x21, 0x30, 0x09, 0x06, 0x05, 0x2b, 0x0e, 0x03, 0x02, 0x1a, 0x05, 0x00, 0x04, 0x14,
];
const SHA256_DIGEST_INFO: [u8; 19] = [
    0x30, 0x31, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x01, 0x05,
    0x00, 0x04, 0x20,
];

/// An RSA-2048 key read from `testdata/`
pub(crate) struct TestRsaKey {
    key: rsa::RsaPrivateKey,
}

impl TestRsaKey {
    pub(crate) fn credential() -> Self {
        Self::from_pkcs8(RSA_CREDENTIAL_PKCS8)
    }

    pub(crate) fn attestation() -> Self {
        Self::from_pkcs8(RSA_ATTESTATION_PKCS8)
    }

    fn from_pkcs8(der: &[u8]) -> Self {
        use rsa::pkcs8::DecodePrivateKey;
        Self {
            key: rsa::RsaPrivateKey::from_pkcs8_der(der).unwrap(),
        }
    }

    /// Big-endian modulus
    pub(crate) fn modulus(&self) -> Vec<u8> {
        use rsa::traits::PublicKeyParts;
        self.key.n().to_bytes_be()
    }

    pub(crate) fn exponent(&self) -> Vec<u8> {
        use rsa::traits::PublicKeyParts;
        self.key.e().to_bytes_be()
    }

    pub(crate) fn cose_key_bytes(&self, alg: i64) -> Vec<u8> {
        let map = Value::Map(vec![
            (Value::Integer(1i64.into()), Value::Integer(3i64.into())),
            (Value::Integer(3i64.into()), Value::Integer(alg.into())),
            (Value::Integer((-1i64).into()), Value::Bytes(self.modulus())),
            (Value::Integer((-2i64).into()), Value::Bytes(self.exponent())),
        ]);
        cose_key_bytes(&map)
    }

    pub(crate) fn spki_der(&self) -> Vec<u8> {
        use rsa::pkcs8::EncodePublicKey;
        self.key
            .to_public_key()
            .to_public_key_der()
            .unwrap()
            .as_bytes()
            .to_vec()
    }

    /// RSASSA-PKCS1-v1_5 signature for `RS256` or `RS1`.
    pub(crate) fn sign(&self, alg: CoseAlgorithm, message: &[u8]) -> Vec<u8> {
        let prefix: &[u8] = match alg {
            CoseAlgorithm::RS1 => &SHA1_DIGEST_INFO,
            CoseAlgorithm::RS256 => &SHA256_DIGEST_INFO,
            other => panic!("TestRsaKey cannot sign with {other}"),
        };
        let digest = alg.digest(message);
        let padding = rsa::Pkcs1v15Sign {
            hash_len: Some(digest.len()),
            prefix: prefix.into(),
        };
        self.key.sign(padding, &digest).unwrap()
    }
}

fn ec2_map(curve: i64, x: &[u8], y: &[u8], alg: i64) -> Value {
    Value::Map(vec![
        (Value::Integer(1i64.into()), Value::Integer(2i64.into())),
        (Value::Integer(3i64.into()), Value::Integer(alg.into())),
        (Value::Integer((-1i64).into()), Value::Integer(curve.into())),
        (Value::Integer((-2i64).into()), Value::Bytes(x.to_vec())),
        (Value::Integer((-3i64).into()), Value::Bytes(y.to_vec())),
    ])
}

pub(crate) fn cose_key_bytes(map: &Value) -> Vec<u8> {
    let mut bytes = Vec::new();
    ciborium::ser::into_writer(map, &mut bytes).unwrap();
    bytes
}

pub(crate) fn cose_ec2_key(x: &[u8], y: &[u8], alg: i64) -> CoseKey {
    CoseKey::from_cbor_bytes(&cose_key_bytes(&ec2_map(CRV_P256, x, y, alg))).unwrap()
}

pub(crate) fn cose_rsa_key(n: &[u8], e: &[u8]) -> CoseKey {
    let map = Value::Map(vec![
        (Value::Integer(1i64.into()), Value::Integer(3i64.into())),
        (Value::Integer(3i64.into()), Value::Integer((-257i64).into())),
        (Value::Integer((-1i64).into()), Value::Bytes(n.to_vec())),
        (Value::Integer((-2i64).into()), Value::Bytes(e.to_vec())),
    ]);
    CoseKey::from_cbor_bytes(&cose_key_bytes(&map)).unwrap()
}

/// Builds authenticatorData. AT and ED are set automatically when the
/// corresponding parts are added.
pub(crate) struct AuthDataBuilder {
    rp_id: String,
    flags: u8,
    sign_count: u32,
    attested: Option<Vec<u8>>,
    extensions: Option<Vec<u8>>,
}

impl AuthDataBuilder {
    pub(crate) fn new(rp_id: &str) -> Self {
        Self {
            rp_id: rp_id.to_string(),
            flags: auth_data_flags::UP,
            sign_count: 0,
            attested: None,
            extensions: None,
        }
    }

    pub(crate) fn flags(mut self, flags: u8) -> Self {
        self.flags = flags;
        self
    }

    pub(crate) fn sign_count(mut self, sign_count: u32) -> Self {
        self.sign_count = sign_count;
        self
    }

    pub(crate) fn attested_credential(
        mut self,
        aaguid: &[u8],
        credential_id: &[u8],
        cose_key: &[u8],
    ) -> Self {
        let mut attested = aaguid.to_vec();
        attested.extend_from_slice(&(credential_id.len() as u16).to_be_bytes());
        attested.extend_from_slice(credential_id);
        attested.extend_from_slice(cose_key);
        self.attested = Some(attested);
        self
    }

    pub(crate) fn extensions(mut self, extensions: &Value) -> Self {
        self.extensions = Some(cose_key_bytes(extensions));
        self
    }

    pub(crate) fn build(self) -> Vec<u8> {
        let mut flags = self.flags;
        let mut data = sha256(self.rp_id.as_bytes()).to_vec();
        if self.attested.is_some() {
            flags |= auth_data_flags::AT;
        }
        if self.extensions.is_some() {
            flags |= auth_data_flags::ED;
        }
        data.push(flags);
        data.extend_from_slice(&self.sign_count.to_be_bytes());
        if let Some(attested) = self.attested {
            data.extend_from_slice(&attested);
        }
        if let Some(extensions) = self.extensions {
            data.extend_from_slice(&extensions);
        }
        data
    }
}

pub(crate) fn attestation_object_bytes(
    fmt: &str,
    auth_data: &[u8],
    att_stmt: Vec<(Value, Value)>,
) -> Vec<u8> {
    let map = Value::Map(vec![
        (Value::Text("fmt".into()), Value::Text(fmt.into())),
        (Value::Text("attStmt".into()), Value::Map(att_stmt)),
        (Value::Text("authData".into()), Value::Bytes(auth_data.to_vec())),
    ]);
    cose_key_bytes(&map)
}

/// Attestation statement map from `(name, value)` pairs
pub(crate) fn att_stmt(entries: Vec<(&str, Value)>) -> Vec<(Value, Value)> {
    entries
        .into_iter()
        .map(|(k, v)| (Value::Text(k.to_string()), v))
        .collect()
}

pub(crate) fn x5c(certs: &[&[u8]]) -> Value {
    Value::Array(certs.iter().map(|c| Value::Bytes(c.to_vec())).collect())
}

pub(crate) fn client_data_json(type_: &str, challenge: &[u8], origin: &str) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "type": type_,
        "challenge": base64url_encode(challenge),
        "origin": origin,
        "crossOrigin": false
    }))
    .unwrap()
}

/// TPMS_ATTEST with fixed clock info and an empty qualifiedName
pub(crate) fn tpm_cert_info(extra_data: &[u8], name: &[u8]) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&TPM_GENERATED_VALUE.to_be_bytes());
    data.extend_from_slice(&0x8017u16.to_be_bytes());
    push_sized(&mut data, &[0x00, 0x0b, 0x11, 0x22]);
    push_sized(&mut data, extra_data);
    data.extend_from_slice(&0x0102_0304_0506_0708u64.to_be_bytes());
    data.extend_from_slice(&7u32.to_be_bytes());
    data.extend_from_slice(&9u32.to_be_bytes());
    data.push(1);
    data.extend_from_slice(&0x2000_0000_0000_0001u64.to_be_bytes());
    push_sized(&mut data, name);
    push_sized(&mut data, &[]);
    data
}

fn tpm_pub_area_header(type_: u16) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&type_.to_be_bytes());
    data.extend_from_slice(&TPM_ALG_SHA256.to_be_bytes());
    data.extend_from_slice(&0x0006_0472u32.to_be_bytes());
    push_sized(&mut data, &[]);
    data
}

pub(crate) fn tpm_ecc_pub_area(x: &[u8], y: &[u8], curve_id: u16) -> Vec<u8> {
    let mut data = tpm_pub_area_header(TPM_ALG_ECC);
    data.extend_from_slice(&TPM_ALG_NULL.to_be_bytes());
    data.extend_from_slice(&TPM_ALG_NULL.to_be_bytes());
    data.extend_from_slice(&curve_id.to_be_bytes());
    data.extend_from_slice(&TPM_ALG_NULL.to_be_bytes());
    push_sized(&mut data, x);
    push_sized(&mut data, y);
    data
}

pub(crate) fn tpm_rsa_pub_area(n: &[u8], exponent: u32) -> Vec<u8> {
    let mut data = tpm_pub_area_header(TPM_ALG_RSA);
    data.extend_from_slice(&TPM_ALG_NULL.to_be_bytes());
    data.extend_from_slice(&TPM_ALG_NULL.to_be_bytes());
    data.extend_from_slice(&((n.len() * 8) as u16).to_be_bytes());
    data.extend_from_slice(&exponent.to_be_bytes());
    push_sized(&mut data, n);
    data
}

fn push_sized(data: &mut Vec<u8>, buffer: &[u8]) {
    data.extend_from_slice(&(buffer.len() as u16).to_be_bytes());
    data.extend_from_slice(buffer);
}

/// Minimal DER writer
pub(crate) mod der {
    pub(crate) fn tlv(tag: &[u8], content: &[u8]) -> Vec<u8> {
        let mut out = tag.to_vec();
        let len = content.len();
        if len < 0x80 {
            out.push(len as u8);
        } else {
            let bytes: Vec<u8> = len
                .to_be_bytes()
                .iter()
                .copied()
                .skip_while(|b| *b == 0)
                .collect();
            out.push(0x80 | bytes.len() as u8);
            out.extend_from_slice(&bytes);
        }
        out.extend_from_slice(content);
        out
    }

    pub(crate) fn seq(parts: &[Vec<u8>]) -> Vec<u8> {
        tlv(&[0x30], &parts.concat())
    }

    pub(crate) fn set(parts: &[Vec<u8>]) -> Vec<u8> {
        tlv(&[0x31], &parts.concat())
    }

    pub(crate) fn integer(value: u64) -> Vec<u8> {
        let mut bytes: Vec<u8> = value
            .to_be_bytes()
            .iter()
            .copied()
            .skip_while(|b| *b == 0)
            .collect();
        if bytes.is_empty() || bytes[0] & 0x80 != 0 {
            bytes.insert(0, 0);
        }
        tlv(&[0x02], &bytes)
    }

    pub(crate) fn enumerated(value: u8) -> Vec<u8> {
        tlv(&[0x0a], &[value])
    }

    pub(crate) fn boolean(value: bool) -> Vec<u8> {
        tlv(&[0x01], &[if value { 0xff } else { 0x00 }])
    }

    pub(crate) fn null() -> Vec<u8> {
        vec![0x05, 0x00]
    }

    pub(crate) fn octet_string(content: &[u8]) -> Vec<u8> {
        tlv(&[0x04], content)
    }

    pub(crate) fn bit_string(content: &[u8]) -> Vec<u8> {
        let mut bits = vec![0x00];
        bits.extend_from_slice(content);
        tlv(&[0x03], &bits)
    }

    pub(crate) fn utf8(s: &str) -> Vec<u8> {
        tlv(&[0x0c], s.as_bytes())
    }

    pub(crate) fn utc_time(s: &str) -> Vec<u8> {
        tlv(&[0x17], s.as_bytes())
    }

    pub(crate) fn oid(dotted: &str) -> Vec<u8> {
        let arcs: Vec<u64> = dotted.split('.').map(|a| a.parse().unwrap()).collect();
        let mut content = vec![(arcs[0] * 40 + arcs[1]) as u8];
        for arc in &arcs[2..] {
            let mut chunk = vec![(arc & 0x7f) as u8];
            let mut rest = arc >> 7;
            while rest > 0 {
                chunk.insert(0, 0x80 | (rest & 0x7f) as u8);
                rest >>= 7;
            }
            content.extend_from_slice(&chunk);
        }
        tlv(&[0x06], &content)
    }

    /// Context-specific constructed tag, i.e. `[n] EXPLICIT`
    pub(crate) fn explicit(tag: u32, content: &[u8]) -> Vec<u8> {
        if tag < 31 {
            return tlv(&[0xa0 | tag as u8], content);
        }
        let mut tag_bytes = vec![(tag & 0x7f) as u8];
        let mut rest = tag >> 7;
        while rest > 0 {
            tag_bytes.insert(0, 0x80 | (rest & 0x7f) as u8);
            rest >>= 7;
        }
        tag_bytes.insert(0, 0xbf);
        tlv(&tag_bytes, content)
    }

    /// RDNSequence with one attribute per RDN
    pub(crate) fn name(attributes: &[(&str, &str)]) -> Vec<u8> {
        let rdns: Vec<Vec<u8>> = attributes
            .iter()
            .map(|(oid_str, value)| set(&[seq(&[oid(oid_str), utf8(value)])]))
            .collect();
        seq(&rdns)
    }
}

/// Builds a syntactically valid v3 certificate. The signature is filler;
/// nothing in the engine checks certificate signatures.
pub(crate) struct CertBuilder {
    subject: Vec<(String, String)>,
    spki: Vec<u8>,
    extensions: Vec<(String, bool, Vec<u8>)>,
}

impl CertBuilder {
    pub(crate) fn new(spki: Vec<u8>) -> Self {
        Self {
            subject: Vec::new(),
            spki,
            extensions: Vec::new(),
        }
    }

    /// Subject required of packed attestation certificates
    pub(crate) fn packed_subject(self) -> Self {
        self.subject_attr("2.5.4.6", "US")
            .subject_attr("2.5.4.10", "Example Vendor")
            .subject_attr("2.5.4.11", "Authenticator Attestation")
            .subject_attr("2.5.4.3", "Example Authenticator")
    }

    pub(crate) fn subject_attr(mut self, oid: &str, value: &str) -> Self {
        self.subject.push((oid.to_string(), value.to_string()));
        self
    }

    pub(crate) fn extension(mut self, oid: &str, critical: bool, value: Vec<u8>) -> Self {
        self.extensions.push((oid.to_string(), critical, value));
        self
    }

    pub(crate) fn basic_constraints(self, ca: bool) -> Self {
        let value = if ca {
            der::seq(&[der::boolean(true)])
        } else {
            der::seq(&[])
        };
        self.extension(OID_BASIC_CONSTRAINTS, true, value)
    }

    pub(crate) fn aaguid(self, aaguid: &[u8], critical: bool) -> Self {
        self.extension(OID_FIDO_GEN_CE_AAGUID, critical, der::octet_string(aaguid))
    }

    pub(crate) fn build(self) -> Vec<u8> {
        let signature_alg = der::seq(&[der::oid("1.2.840.10045.4.3.2")]);
        let subject: Vec<(&str, &str)> = self
            .subject
            .iter()
            .map(|(o, v)| (o.as_str(), v.as_str()))
            .collect();

        let mut tbs = vec![
            der::explicit(0, &der::integer(2)),
            der::integer(0x1234),
            signature_alg.clone(),
            der::name(&[("2.5.4.3", "Test Attestation Root")]),
            der::seq(&[
                der::utc_time("250101000000Z"),
                der::utc_time("450101000000Z"),
            ]),
            der::name(&subject),
            self.spki,
        ];

        if !self.extensions.is_empty() {
            let extensions: Vec<Vec<u8>> = self
                .extensions
                .iter()
                .map(|(oid, critical, value)| {
                    let mut parts = vec![der::oid(oid)];
                    if *critical {
                        parts.push(der::boolean(true));
                    }
                    parts.push(der::octet_string(value));
                    der::seq(&parts)
                })
                .collect();
            tbs.push(der::explicit(3, &der::seq(&extensions)));
        }

        der::seq(&[
            der::seq(&tbs),
            signature_alg,
            der::bit_string(&[0x30, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01, 0x01]),
        ])
    }
}

/// SubjectAltName with a directoryName carrying the TCG TPM attributes
pub(crate) fn tpm_san(manufacturer: &str, model: &str, version: &str) -> Vec<u8> {
    let directory_name = der::name(&[
        (OID_TPM_MANUFACTURER, manufacturer),
        (OID_TPM_MODEL, model),
        (OID_TPM_VERSION, version),
    ]);
    der::seq(&[der::explicit(4, &directory_name)])
}

pub(crate) fn ext_key_usage(oids: &[&str]) -> Vec<u8> {
    der::seq(&oids.iter().map(|o| der::oid(o)).collect::<Vec<_>>())
}

/// Apple anonymous attestation extension: SEQUENCE { [1] OCTET STRING }
pub(crate) fn apple_nonce_extension(nonce: &[u8]) -> Vec<u8> {
    der::seq(&[der::explicit(1, &der::octet_string(nonce))])
}

/// Options for an Android KeyDescription extension
pub(crate) struct KeyDescription {
    pub(crate) challenge: Vec<u8>,
    pub(crate) purposes: Vec<u64>,
    pub(crate) origin: Option<u64>,
    pub(crate) all_applications: bool,
    /// Put purpose and origin in softwareEnforced instead of teeEnforced
    pub(crate) software_enforced: bool,
}

impl KeyDescription {
    pub(crate) fn valid(challenge: &[u8]) -> Self {
        Self {
            challenge: challenge.to_vec(),
            purposes: vec![2],
            origin: Some(0),
            all_applications: false,
            software_enforced: false,
        }
    }

    pub(crate) fn to_der(&self) -> Vec<u8> {
        let mut enforced = Vec::new();
        if !self.purposes.is_empty() {
            let purposes: Vec<Vec<u8>> = self.purposes.iter().map(|p| der::integer(*p)).collect();
            enforced.push(der::explicit(1, &der::set(&purposes)));
        }
        // keySize [3]
        enforced.push(der::explicit(3, &der::integer(256)));
        if let Some(origin) = self.origin {
            enforced.push(der::explicit(702, &der::integer(origin)));
        }

        let mut other = Vec::new();
        if self.all_applications {
            other.push(der::explicit(600, &der::null()));
        }

        let (software, tee) = if self.software_enforced {
            (enforced, other)
        } else {
            (other, enforced)
        };

        der::seq(&[
            der::integer(3),
            der::enumerated(1),
            der::integer(4),
            der::enumerated(1),
            der::octet_string(&self.challenge),
            der::octet_string(&[]),
            der::seq(&software),
            der::seq(&tee),
        ])
    }
}
