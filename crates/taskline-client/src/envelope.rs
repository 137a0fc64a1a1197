//! Response envelope decoding
//!
//! The server answers either with a standardized envelope
//! (`{"success": true, "data": ...}` / `{"success": false, "error": {...}}`) or,
//! on older endpoints, with the bare payload or `{"error": "..."}`.

use serde_json::Value;

use crate::error::{ApiError, Result};

/// Decode a response body into its payload
///
/// `204` and non-JSON success bodies yield `Value::Null`.
pub fn decode_response(status: u16, body: &[u8]) -> Result<Value> {
    if status == 204 {
        return Ok(Value::Null);
    }

    let data: Option<Value> = serde_json::from_slice(body).ok();

    if !(200..300).contains(&status) {
        return Err(decode_error(status, data));
    }

    match data {
        Some(Value::Object(mut map)) if map.get("success") == Some(&Value::Bool(true)) => {
            Ok(map.remove("data").unwrap_or(Value::Null))
        }
        Some(value) => Ok(value),
        None => Ok(Value::Null),
    }
}

fn decode_error(status: u16, data: Option<Value>) -> ApiError {
    let Some(data) = data else {
        return ApiError::new(status, format!("HTTP {}", status));
    };

    if data.get("success") == Some(&Value::Bool(false)) {
        if let Some(error) = data.get("error").and_then(Value::as_object) {
            let code = error
                .get("code")
                .and_then(Value::as_u64)
                .and_then(|code| u16::try_from(code).ok())
                .unwrap_or(status);
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let api_error = ApiError::new(code, message);
            return match error.get("details") {
                Some(details) if !details.is_null() => api_error.with_details(details.clone()),
                _ => api_error,
            };
        }
    }

    let message = text_field(&data, "error")
        .or_else(|| text_field(&data, "message"))
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", status));
    ApiError::new(status, message)
}

fn text_field<'a>(data: &'a Value, field: &str) -> Option<&'a str> {
    data.get(field)
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn test_unwraps_success_envelope() {
        let body = br#"{"success":true,"data":{"auto_lock_minutes":10}}"#;
        assert_eq!(
            decode_response(200, body).unwrap(),
            json!({ "auto_lock_minutes": 10 })
        );
    }

    #[test]
    fn test_bare_success_payload() {
        let body = br#"{"message":"Logged out"}"#;
        assert_eq!(decode_response(200, body).unwrap(), json!({ "message": "Logged out" }));
    }

    #[rstest]
    #[case(204, b"" as &[u8])]
    #[case(200, b"")]
    #[case(200, b"<html>ok</html>")]
    fn test_empty_success(#[case] status: u16, #[case] body: &[u8]) {
        assert_eq!(decode_response(status, body).unwrap(), Value::Null);
    }

    #[test]
    fn test_standardized_error() {
        let body = br#"{"success":false,"error":{"code":409,"message":"Username already exists","details":{"field":"username"}}}"#;
        let error = decode_response(400, body).unwrap_err();
        assert_eq!(error.code, 409);
        assert_eq!(error.message, "Username already exists");
        assert_eq!(error.details, Some(json!({ "field": "username" })));
    }

    #[rstest]
    #[case(br#"{"error":"Invalid username or PIN"}"# as &[u8], "Invalid username or PIN")]
    #[case(br#"{"message":"Authentication required"}"#, "Authentication required")]
    #[case(br#"{"error":"","message":"Fallback"}"#, "Fallback")]
    #[case(br#"{"detail":"nope"}"#, "HTTP 401")]
    #[case(b"Unauthorized", "HTTP 401")]
    fn test_legacy_error(#[case] body: &[u8], #[case] message: &str) {
        let error = decode_response(401, body).unwrap_err();
        assert_eq!(error.code, 401);
        assert_eq!(error.message, message);
        assert!(error.details.is_none());
    }
}
