use std::collections::BTreeMap;

use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized - session may be invalid or expired")]
    Unauthorized,

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {message}")]
    ValidationFailed {
        message: String,
        errors: BTreeMap<String, Vec<String>>,
    },

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid API base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("Invalid identifier: {0:?}")]
    InvalidId(String),

    #[error("Unexpected response ({status}): {body}")]
    Unknown { status: u16, body: String },
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Shape of a 422 body: `{"message": "...", "errors": {"field": ["..."]}}`
#[derive(Debug, Deserialize)]
struct ValidationBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    errors: BTreeMap<String, FieldMessages>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FieldMessages {
    Many(Vec<String>),
    One(String),
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut cut = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..cut], body.len())
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(truncated),
            404 => ApiError::NotFound(truncated),
            422 => Self::validation(body),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(truncated),
            code => ApiError::Unknown {
                status: code,
                body: truncated,
            },
        }
    }

    fn validation(body: &str) -> Self {
        match serde_json::from_str::<ValidationBody>(body) {
            Ok(parsed) => {
                let errors: BTreeMap<String, Vec<String>> = parsed
                    .errors
                    .into_iter()
                    .map(|(field, messages)| {
                        let messages = match messages {
                            FieldMessages::Many(list) => list,
                            FieldMessages::One(single) => vec![single],
                        };
                        (field, messages)
                    })
                    .collect();
                let message = parsed
                    .message
                    .or_else(|| errors.values().flatten().next().cloned())
                    .unwrap_or_else(|| "The given data was invalid.".to_string());
                ApiError::ValidationFailed { message, errors }
            }
            Err(_) => ApiError::ValidationFailed {
                message: Self::truncate_body(body),
                errors: BTreeMap::new(),
            },
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }

    /// Text suitable for an alert shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Unauthorized => "Your session has expired. Please log in again.".to_string(),
            ApiError::AccessDenied(_) => "You do not have permission to do that.".to_string(),
            ApiError::NotFound(_) => "This feature is not available yet.".to_string(),
            ApiError::ValidationFailed { message, errors } => {
                let details: Vec<&str> = errors.values().flatten().map(String::as_str).collect();
                if details.is_empty() || (details.len() == 1 && details[0] == message.as_str()) {
                    message.clone()
                } else {
                    details.join("\n")
                }
            }
            ApiError::RateLimited => "Server is busy. Please wait a moment and try again.".to_string(),
            ApiError::ServerError(_) => "Something went wrong on our side. Please try again.".to_string(),
            ApiError::NetworkError(e) if e.is_timeout() => {
                "Connection timed out. Please try again.".to_string()
            }
            ApiError::NetworkError(_) => {
                "Unable to connect to server. Check your internet connection.".to_string()
            }
            ApiError::InvalidId(_) => "That item could not be found.".to_string(),
            ApiError::InvalidBaseUrl(_) => "The app is misconfigured: the server address is invalid.".to_string(),
            ApiError::InvalidResponse(_) | ApiError::Unknown { .. } => {
                "Unexpected response from server. Please try again.".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_classification() {
        assert!(matches!(ApiError::from_status(StatusCode::UNAUTHORIZED, ""), ApiError::Unauthorized));
        assert!(matches!(ApiError::from_status(StatusCode::NOT_FOUND, "missing"), ApiError::NotFound(b) if b == "missing"));
        assert!(matches!(ApiError::from_status(StatusCode::TOO_MANY_REQUESTS, ""), ApiError::RateLimited));
        assert!(matches!(ApiError::from_status(StatusCode::BAD_GATEWAY, "oops"), ApiError::ServerError(_)));
        assert!(matches!(
            ApiError::from_status(StatusCode::IM_A_TEAPOT, "tea"),
            ApiError::Unknown { status: 418, .. }
        ));
    }

    #[test]
    fn test_validation_body_parsed() {
        let body = r#"{"message": "The email has already been taken.", "errors": {"email": ["The email has already been taken."], "phone": "The phone field is required."}}"#;
        match ApiError::from_status(StatusCode::UNPROCESSABLE_ENTITY, body) {
            ApiError::ValidationFailed { message, errors } => {
                assert_eq!(message, "The email has already been taken.");
                assert_eq!(errors["phone"], vec!["The phone field is required.".to_string()]);
                assert_eq!(errors.len(), 2);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_validation_without_json_keeps_body() {
        match ApiError::from_status(StatusCode::UNPROCESSABLE_ENTITY, "bad input") {
            ApiError::ValidationFailed { message, errors } => {
                assert_eq!(message, "bad input");
                assert!(errors.is_empty());
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_user_message_lists_field_errors() {
        let mut errors = BTreeMap::new();
        errors.insert("amount".to_string(), vec!["Amount is too low.".to_string()]);
        errors.insert("phone_number".to_string(), vec!["Phone is invalid.".to_string()]);
        let err = ApiError::ValidationFailed {
            message: "The given data was invalid.".to_string(),
            errors,
        };
        assert_eq!(err.user_message(), "Amount is too low.\nPhone is invalid.");
    }

    #[test]
    fn test_truncate_body() {
        let long = "x".repeat(MAX_ERROR_BODY_LENGTH + 20);
        let truncated = ApiError::truncate_body(&long);
        assert!(truncated.starts_with(&"x".repeat(MAX_ERROR_BODY_LENGTH)));
        assert!(truncated.ends_with(&format!("({} total bytes)", long.len())));
    }
}
