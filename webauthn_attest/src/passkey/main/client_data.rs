use serde_json::Value;

use crate::passkey::errors::WebAuthnError;
use crate::utils::base64url_decode;

use super::types::{ClientData, ClientDataType};

/// Decodes clientDataJSON and checks its shape.
///
/// `type`, `challenge` and `origin` must be strings; `type` must be one of
/// `webauthn.create` / `webauthn.get` and `challenge` must be base64url.
/// Nothing is compared against expected values here.
///
/// # Errors
/// * `WebAuthnError::Format` - If the bytes are not UTF-8 JSON or the challenge
///   is not base64url
/// * `WebAuthnError::ClientData` - If a member is missing or has the wrong type
pub fn decode_client_data(client_data_json: &[u8]) -> Result<ClientData, WebAuthnError> {
    let data_str = std::str::from_utf8(client_data_json).map_err(|e| {
        tracing::warn!("clientDataJSON is not UTF-8: {}", e);
        WebAuthnError::Format(format!("Invalid UTF-8: {e}"))
    })?;

    let data: Value = serde_json::from_str(data_str).map_err(|e| {
        tracing::warn!("clientDataJSON is not valid JSON: {}", e);
        WebAuthnError::Format(format!("Invalid JSON: {e}"))
    })?;

    if !data.is_object() {
        tracing::warn!("clientDataJSON is not a JSON object");
        return Err(WebAuthnError::ClientData(
            "Client data is not an object".into(),
        ));
    }

    let type_ = match required_str(&data, "type")? {
        "webauthn.create" => ClientDataType::Create,
        "webauthn.get" => ClientDataType::Get,
        other => {
            tracing::warn!("clientDataJSON has unknown type: {}", other);
            return Err(WebAuthnError::ClientData(format!("Unknown type: {other}")));
        }
    };

    let challenge = base64url_decode(required_str(&data, "challenge")?).map_err(|e| {
        tracing::warn!("clientDataJSON challenge is not base64url: {}", e);
        WebAuthnError::Format(format!("Invalid challenge encoding: {e}"))
    })?;

    let origin = required_str(&data, "origin")?.to_string();

    let cross_origin = match data.get("crossOrigin") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(_) => {
            tracing::warn!("clientDataJSON crossOrigin is not a boolean");
            return Err(WebAuthnError::ClientData(
                "crossOrigin must be a boolean".into(),
            ));
        }
    };

    let top_origin = data
        .get("topOrigin")
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(ClientData {
        type_,
        challenge,
        origin,
        cross_origin,
        top_origin,
    })
}

fn required_str<'a>(data: &'a Value, field: &str) -> Result<&'a str, WebAuthnError> {
    match data.get(field) {
        Some(Value::String(s)) => Ok(s),
        Some(_) => {
            tracing::warn!("clientDataJSON field '{}' is not a string", field);
            Err(WebAuthnError::ClientData(format!("{field} must be a string")))
        }
        None => {
            tracing::warn!("clientDataJSON is missing field '{}'", field);
            Err(WebAuthnError::ClientData(format!("Missing {field}")))
        }
    }
}
