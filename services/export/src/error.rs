use thiserror::Error;

/// Errors that can end an export run
///
/// Every variant is terminal: the job never retries and never reports
/// partial success.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Secret {name} is unavailable: {reason}")]
    SecretUnavailable { name: String, reason: String },

    #[error("Access denied to secret {name}")]
    AccessDenied { name: String },

    #[error("Invalid storage credentials: {0}")]
    InvalidCredentials(String),

    #[error("Analytics request could not be completed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Analytics request failed with status {status}: {body}")]
    HttpRequestFailed { status: u16, body: String },

    #[error("Failed to decode analytics response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Failed to encode CSV: {0}")]
    Csv(String),

    #[error("Object storage unavailable while writing {key}: {message}")]
    StorageUnavailable { key: String, message: String },

    #[error("Permission denied writing {key}")]
    PermissionDenied { key: String },
}

impl From<csv::Error> for ExportError {
    fn from(e: csv::Error) -> Self {
        ExportError::Csv(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_failure_message_carries_status_and_body() {
        let err = ExportError::HttpRequestFailed {
            status: 401,
            body: "{\"error\":\"unauthorized\"}".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("401"));
        assert!(message.contains("unauthorized"));
    }
}
