//! Transport error types.

/// Errors that can occur while performing an HTTP GET.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider rejected the credentials at the HTTP level
    #[error("unauthorized (status {status})")]
    Unauthorized { status: u16 },

    /// API returned a non-success status
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response JSON
    #[error("JSON parse error: {message}")]
    Json { message: String },

    /// A header name or value could not be encoded
    #[error("invalid header {name}")]
    InvalidHeader { name: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = TransportError::Api {
            status: 500,
            message: "Internal Server Error".into(),
        };
        assert_eq!(err.to_string(), "API error 500: Internal Server Error");

        let err = TransportError::Unauthorized { status: 401 };
        assert_eq!(err.to_string(), "unauthorized (status 401)");

        let err = TransportError::InvalidHeader {
            name: "accessToken".into(),
        };
        assert!(err.to_string().contains("accessToken"));
    }
}
