//! Response envelope
//!
//! Every API response is wrapped as
//! `{"status": "success"|"error", "message": ..., "data": ..., "status_code": N}`.
//! Framework-level failures (validation, raised HTTP errors) instead come back
//! as `{"detail": ...}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Envelope status flag
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiStatus {
    /// Request succeeded
    Success,
    /// Request was rejected
    Error,
}

/// Standard response wrapper
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope<T = Value> {
    /// Outcome flag
    pub status: ApiStatus,
    /// Human-readable message
    #[serde(default)]
    pub message: Option<String>,
    /// Payload
    pub data: Option<T>,
    /// Status code echoed by the server
    #[serde(default)]
    pub status_code: Option<u16>,
}

impl<T> ApiEnvelope<T> {
    /// Whether the server flagged success
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == ApiStatus::Success
    }
}

/// Pick the message to show for a failed request
///
/// Tries the envelope `message`, then the framework `detail`, then falls back
/// to `HTTP error! Status: <code>`.
#[must_use]
pub fn resolve_error_message(status: u16, body: Option<&Value>) -> String {
    let message = body
        .and_then(|b| b.get("message"))
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty());
    if let Some(message) = message {
        return message.to_string();
    }

    match body.and_then(|b| b.get("detail")) {
        Some(Value::String(detail)) if !detail.is_empty() => detail.clone(),
        Some(Value::String(_) | Value::Null) | None => format!("HTTP error! Status: {status}"),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use serde::de::DeserializeOwned;

    use super::*;

    /// A payload type with no `Default` impl
    #[derive(Debug, PartialEq, Deserialize)]
    struct Image {
        tag: String,
    }

    fn decode<T: DeserializeOwned>(value: Value) -> ApiEnvelope<T> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_envelope_payload_needs_no_default() {
        let envelope: ApiEnvelope<Image> = decode(json!({
            "status": "success",
            "data": {"tag": "python:3.12"}
        }));
        assert_eq!(envelope.data, Some(Image { tag: "python:3.12".into() }));

        let envelope: ApiEnvelope<Image> = decode(json!({"status": "success"}));
        assert_eq!(envelope.data, None);
        assert_eq!(envelope.message, None);
    }

    #[test]
    fn test_envelope_parses_without_data() {
        let envelope: ApiEnvelope = serde_json::from_value(json!({
            "status": "success",
            "message": "Server is up",
            "status_code": 200
        }))
        .unwrap();
        assert!(envelope.is_success());
        assert_eq!(envelope.message.as_deref(), Some("Server is up"));
        assert!(envelope.data.is_none());
    }

    #[test]
    fn test_error_message_prefers_message() {
        let body = json!({"status": "error", "message": "Script not found", "detail": "ignored"});
        assert_eq!(resolve_error_message(404, Some(&body)), "Script not found");
    }

    #[test]
    fn test_error_message_falls_back_to_detail() {
        let body = json!({"detail": "Instance creation failed: port in use"});
        assert_eq!(
            resolve_error_message(500, Some(&body)),
            "Instance creation failed: port in use"
        );

        let validation = json!({"detail": [{"loc": ["body", "name"], "msg": "field required"}]});
        assert!(resolve_error_message(422, Some(&validation)).contains("field required"));
    }

    #[test]
    fn test_error_message_falls_back_to_status() {
        assert_eq!(resolve_error_message(502, None), "HTTP error! Status: 502");
        assert_eq!(
            resolve_error_message(500, Some(&json!({"message": ""}))),
            "HTTP error! Status: 500"
        );
    }
}
