use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NotFound,
    Validation,
    Conflict,
    Internal,
}

impl ErrorCode {
    pub fn from_status(status: u16) -> Self {
        match status {
            404 => ErrorCode::NotFound,
            400 | 413 | 415 | 422 => ErrorCode::Validation,
            409 => ErrorCode::Conflict,
            _ => ErrorCode::Internal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Builds an error from a failed response body.
    ///
    /// The backend answers with one of `{"errors": [..]}`, `{"error": ".."}`,
    /// `{"detail": ".."}` or plain text; anything else falls back to the status.
    pub fn from_body(status: u16, body: &str) -> Self {
        let code = ErrorCode::from_status(status);
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|value| message_from_json(&value))
            .or_else(|| {
                let trimmed = body.trim();
                (!trimmed.is_empty() && !trimmed.starts_with('{') && !trimmed.starts_with('<'))
                    .then(|| trimmed.to_string())
            })
            .unwrap_or_else(|| format!("request failed with status {status}"));
        Self { code, message }
    }
}

fn message_from_json(value: &Value) -> Option<String> {
    if let Some(errors) = value.get("errors").and_then(Value::as_array) {
        let joined = errors
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join("; ");
        if !joined.is_empty() {
            return Some(joined);
        }
    }
    ["error", "detail", "message"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_error_lists_from_upload_responses() {
        let err = ApiError::from_body(
            400,
            r#"{"success": false, "errors": ["Only PDF files are allowed", "bad scan"]}"#,
        );
        assert_eq!(err.code, ErrorCode::Validation);
        assert_eq!(err.message, "Only PDF files are allowed; bad scan");
    }

    #[test]
    fn reads_single_error_field() {
        let err = ApiError::from_body(400, r#"{"error": "Child deletion not allowed. Select only parents."}"#);
        assert_eq!(err.message, "Child deletion not allowed. Select only parents.");
    }

    #[test]
    fn falls_back_to_status_for_html_bodies() {
        let err = ApiError::from_body(502, "<html>bad gateway</html>");
        assert_eq!(err.code, ErrorCode::Internal);
        assert_eq!(err.message, "request failed with status 502");
    }

    #[test]
    fn keeps_plain_text_bodies() {
        let err = ApiError::from_body(404, "Not Found");
        assert_eq!(err.code, ErrorCode::NotFound);
        assert_eq!(err.message, "Not Found");
    }
}
