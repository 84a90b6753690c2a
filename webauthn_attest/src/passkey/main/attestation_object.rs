use ciborium::value::Value as CborValue;

use crate::passkey::errors::WebAuthnError;
use crate::utils::base64url_decode;

use super::auth_data::decode_auth_data;
use super::types::{AttestationFormat, AttestationObject, AttestationStatement};
use super::utils::{cbor_int, cbor_map_get};

/// Decodes a CBOR attestationObject.
///
/// `fmt` must be an HTTP token and `authData` a byte string. The statement
/// members each format relies on are checked for presence and type; unknown
/// formats are decoded with whatever members they carry and left for the
/// verifier to reject.
///
/// # Errors
/// * `WebAuthnError::Format` - On malformed CBOR, a missing or mistyped
///   member, or invalid authData
pub fn decode_attestation_object(data: &[u8]) -> Result<AttestationObject, WebAuthnError> {
    let mut rest = data;
    let value: CborValue = ciborium::de::from_reader(&mut rest).map_err(|e| {
        tracing::warn!("Invalid attestation object CBOR: {}", e);
        WebAuthnError::Format(format!("Invalid CBOR data: {e}"))
    })?;
    if !rest.is_empty() {
        tracing::warn!("{} bytes left after attestation object", rest.len());
        return Err(WebAuthnError::Format(
            "Trailing bytes after attestation object".to_string(),
        ));
    }

    let map = value
        .as_map()
        .ok_or_else(|| format_error("Attestation object is not a map".to_string()))?;

    let fmt = cbor_map_get(map, "fmt")
        .and_then(CborValue::as_text)
        .ok_or_else(|| format_error("Missing or invalid fmt".to_string()))?;
    if !is_http_token(fmt) {
        return Err(format_error(format!("fmt is not a valid token: {fmt:?}")));
    }
    let fmt = AttestationFormat::from(fmt);

    let auth_data_raw = cbor_map_get(map, "authData")
        .and_then(CborValue::as_bytes)
        .ok_or_else(|| format_error("Missing or invalid authData".to_string()))?
        .clone();

    let att_stmt = match cbor_map_get(map, "attStmt") {
        None => None,
        Some(CborValue::Map(entries)) => Some(entries.as_slice()),
        Some(_) => return Err(format_error("attStmt is not a map".to_string())),
    };

    tracing::debug!("Attestation format: {}", fmt);
    let att_stmt = decode_statement(&fmt, att_stmt)?;
    let auth_data = decode_auth_data(&auth_data_raw)?;

    Ok(AttestationObject {
        fmt,
        auth_data_raw,
        auth_data,
        att_stmt,
    })
}

impl AttestationObject {
    /// Decodes the base64url `attestationObject` member sent by browsers.
    pub fn from_base64url(encoded: &str) -> Result<Self, WebAuthnError> {
        let data = base64url_decode(encoded)
            .map_err(|e| WebAuthnError::Format(format!("Failed to decode: {e}")))?;
        decode_attestation_object(&data)
    }
}

fn format_error(msg: String) -> WebAuthnError {
    tracing::warn!("{}", msg);
    WebAuthnError::Format(msg)
}

// token = 1*tchar, RFC 9110 section 5.6.2
fn is_http_token(s: &str) -> bool {
    !s.is_empty()
        && s.bytes().all(|b| {
            b.is_ascii_alphanumeric()
                || matches!(
                    b,
                    b'!' | b'#'
                        | b'$'
                        | b'%'
                        | b'&'
                        | b'\''
                        | b'*'
                        | b'+'
                        | b'-'
                        | b'.'
                        | b'^'
                        | b'_'
                        | b'`'
                        | b'|'
                        | b'~'
                )
        })
}

fn decode_statement(
    fmt: &AttestationFormat,
    entries: Option<&[(CborValue, CborValue)]>,
) -> Result<Option<AttestationStatement>, WebAuthnError> {
    let entries = entries.unwrap_or_default();

    if *fmt == AttestationFormat::None {
        if !entries.is_empty() {
            return Err(format_error(
                "attStmt must be empty for none attestation".to_string(),
            ));
        }
        return Ok(None);
    }

    let stmt = AttestationStatement {
        alg: typed_member(fmt, "alg", int_field(fmt, entries, "alg"))?,
        sig: typed_member(fmt, "sig", bytes_field(fmt, entries, "sig"))?,
        x5c: typed_member(fmt, "x5c", x5c_field(fmt, entries))?,
        ecdaa_key_id: typed_member(fmt, "ecdaaKeyId", bytes_field(fmt, entries, "ecdaaKeyId"))?,
        ver: typed_member(fmt, "ver", text_field(fmt, entries, "ver"))?,
        pub_area: typed_member(fmt, "pubArea", bytes_field(fmt, entries, "pubArea"))?,
        cert_info: typed_member(fmt, "certInfo", bytes_field(fmt, entries, "certInfo"))?,
        response: typed_member(fmt, "response", bytes_field(fmt, entries, "response"))?,
        receipt: typed_member(fmt, "receipt", bytes_field(fmt, entries, "receipt"))?,
        members: entries.to_vec(),
    };

    let required: Vec<(&str, bool)> = match fmt {
        AttestationFormat::Packed | AttestationFormat::AndroidKey => vec![
            ("alg", stmt.alg.is_some()),
            ("sig", stmt.sig.is_some()),
        ],
        AttestationFormat::Tpm => vec![
            ("ver", stmt.ver.is_some()),
            ("alg", stmt.alg.is_some()),
            ("x5c", stmt.x5c.is_some()),
            ("sig", stmt.sig.is_some()),
            ("certInfo", stmt.cert_info.is_some()),
            ("pubArea", stmt.pub_area.is_some()),
        ],
        AttestationFormat::AndroidSafetyNet => vec![
            ("ver", stmt.ver.is_some()),
            ("response", stmt.response.is_some()),
        ],
        AttestationFormat::FidoU2f => vec![
            ("sig", stmt.sig.is_some()),
            ("x5c", stmt.x5c.as_ref().is_some_and(|x5c| x5c.len() == 1)),
        ],
        AttestationFormat::Apple => vec![("x5c", stmt.x5c.is_some())],
        AttestationFormat::AppleAppAttest => vec![
            ("x5c", stmt.x5c.is_some()),
            ("receipt", stmt.receipt.is_some()),
        ],
        AttestationFormat::None | AttestationFormat::Unknown(_) => Vec::new(),
    };

    if let Some((field, _)) = required.iter().find(|(_, present)| !present) {
        return Err(format_error(format!(
            "Missing or invalid {field} in {fmt} attestation statement"
        )));
    }

    if matches!(fmt, AttestationFormat::Unknown(_)) && entries.is_empty() {
        return Ok(None);
    }

    Ok(Some(stmt))
}

fn field_error(fmt: &AttestationFormat, field: &str) -> WebAuthnError {
    WebAuthnError::Format(format!(
        "Invalid type for {field} in {fmt} attestation statement"
    ))
}

/// Registered formats fix the type of each member. An unregistered format may
/// reuse a member name with another type; such members stay unset and remain
/// available through `AttestationStatement::members`.
fn typed_member<T>(
    fmt: &AttestationFormat,
    field: &str,
    member: Result<Option<T>, WebAuthnError>,
) -> Result<Option<T>, WebAuthnError> {
    match member {
        Err(e) if matches!(fmt, AttestationFormat::Unknown(_)) => {
            tracing::debug!(
                "Leaving {} unset in {} attestation statement: {}",
                field,
                fmt,
                e
            );
            Ok(None)
        }
        Err(e) => {
            tracing::warn!("{}", e);
            Err(e)
        }
        ok => ok,
    }
}

fn int_field(
    fmt: &AttestationFormat,
    entries: &[(CborValue, CborValue)],
    field: &str,
) -> Result<Option<i64>, WebAuthnError> {
    match cbor_map_get(entries, field) {
        None => Ok(None),
        Some(v) => cbor_int(v).map(Some).ok_or_else(|| field_error(fmt, field)),
    }
}

fn text_field(
    fmt: &AttestationFormat,
    entries: &[(CborValue, CborValue)],
    field: &str,
) -> Result<Option<String>, WebAuthnError> {
    match cbor_map_get(entries, field) {
        None => Ok(None),
        Some(v) => v
            .as_text()
            .map(|t| Some(t.to_string()))
            .ok_or_else(|| field_error(fmt, field)),
    }
}

fn bytes_field(
    fmt: &AttestationFormat,
    entries: &[(CborValue, CborValue)],
    field: &str,
) -> Result<Option<Vec<u8>>, WebAuthnError> {
    match cbor_map_get(entries, field) {
        None => Ok(None),
        Some(v) => v
            .as_bytes()
            .cloned()
            .map(Some)
            .ok_or_else(|| field_error(fmt, field)),
    }
}

fn x5c_field(
    fmt: &AttestationFormat,
    entries: &[(CborValue, CborValue)],
) -> Result<Option<Vec<Vec<u8>>>, WebAuthnError> {
    let Some(value) = cbor_map_get(entries, "x5c") else {
        return Ok(None);
    };
    let certs = value.as_array().ok_or_else(|| field_error(fmt, "x5c"))?;
    if certs.is_empty() {
        return Err(WebAuthnError::Format(format!(
            "Empty x5c in {fmt} attestation statement"
        )));
    }
    certs
        .iter()
        .map(|cert| cert.as_bytes().cloned().ok_or_else(|| field_error(fmt, "x5c")))
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}
