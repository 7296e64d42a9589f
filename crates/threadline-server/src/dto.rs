//! Data transfer objects for HTTP message serialization.

use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;

/// A validated `POST /invoke` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeRequest {
    pub message: String,
    pub thread_id: String,
}

impl InvokeRequest {
    /// Extracts both fields from a JSON object.
    ///
    /// A field that is absent, not a string, or empty counts as missing.
    pub fn from_json(body: &Value) -> Result<Self, ApiError> {
        let fields = body.as_object().ok_or(ApiError::InvalidJson)?;
        let field = |name: &str| {
            fields
                .get(name)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(String::from)
        };

        match (field("message"), field("thread_id")) {
            (Some(message), Some(thread_id)) => Ok(Self { message, thread_id }),
            _ => Err(ApiError::Validation),
        }
    }

    /// First characters of the message, for log lines.
    pub fn preview(&self) -> &str {
        let end = self
            .message
            .char_indices()
            .nth(50)
            .map_or(self.message.len(), |(i, _)| i);
        &self.message[..end]
    }
}

/// Structured error body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn accepts_both_fields() {
        let req = InvokeRequest::from_json(&json!({ "message": "hello", "thread_id": "t1", "extra": 1 })).unwrap();
        assert_eq!(req, InvokeRequest { message: "hello".into(), thread_id: "t1".into() });
    }

    #[test]
    fn missing_empty_or_mistyped_fields_fail_validation() {
        let bodies = [
            json!({ "thread_id": "t1" }),
            json!({ "message": "hello" }),
            json!({}),
            json!({ "message": "", "thread_id": "t1" }),
            json!({ "message": "hello", "thread_id": "" }),
            json!({ "message": 42, "thread_id": "t1" }),
            json!({ "message": "hello", "thread_id": null }),
        ];
        for body in bodies {
            assert_eq!(InvokeRequest::from_json(&body), Err(ApiError::Validation), "{}", body);
        }
    }

    #[test]
    fn non_object_bodies_are_invalid_json() {
        assert_eq!(InvokeRequest::from_json(&json!(["hello", "t1"])), Err(ApiError::InvalidJson));
        assert_eq!(InvokeRequest::from_json(&json!("hello")), Err(ApiError::InvalidJson));
    }

    #[test]
    fn preview_truncates_on_char_boundaries() {
        let req = InvokeRequest { message: "é".repeat(60), thread_id: "t".into() };
        assert_eq!(req.preview().chars().count(), 50);

        let short = InvokeRequest { message: "hi".into(), thread_id: "t".into() };
        assert_eq!(short.preview(), "hi");
    }
}
