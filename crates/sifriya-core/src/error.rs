//! Error types for Sifriya Core

use std::time::Duration;
use thiserror::Error;

/// Result type alias using ApiError
pub type Result<T> = std::result::Result<T, ApiError>;

/// Failures of a single logical fetch (all attempts included)
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("client error {status} from {url}: {message}")]
    Client {
        url: String,
        status: u16,
        message: String,
    },

    #[error("network error for {url} after {attempts} attempts: {}", describe_last(*status, message))]
    Network {
        url: String,
        attempts: u32,
        status: Option<u16>,
        message: String,
    },

    #[error("unexpected status {status} {status_text} from {url}")]
    Api {
        url: String,
        status: u16,
        status_text: String,
    },

    #[error("invalid JSON from {url}: {message}")]
    Decode { url: String, message: String },
}

fn describe_last(status: Option<u16>, message: &str) -> String {
    match status {
        Some(status) => format!("last status {} ({})", status, message),
        None => message.to_string(),
    }
}

impl FetchError {
    pub fn url(&self) -> &str {
        match self {
            FetchError::Timeout { url, .. }
            | FetchError::Client { url, .. }
            | FetchError::Network { url, .. }
            | FetchError::Api { url, .. }
            | FetchError::Decode { url, .. } => url,
        }
    }

    /// Final HTTP status, if the failure got as far as a response
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Client { status, .. } | FetchError::Api { status, .. } => Some(*status),
            FetchError::Network { status, .. } => *status,
            FetchError::Timeout { .. } | FetchError::Decode { .. } => None,
        }
    }
}

/// Errors reported by the API facade. Every variant names the operation
/// and, where there is one, the input that failed.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{operation}: missing required argument `{argument}`")]
    InvalidArgument {
        operation: &'static str,
        argument: &'static str,
    },

    #[error("{operation} failed for {input:?}: {source}")]
    Request {
        operation: &'static str,
        input: String,
        #[source]
        source: FetchError,
    },

    #[error("{operation} returned an invalid response for {input:?}: {detail}")]
    InvalidResponse {
        operation: &'static str,
        input: String,
        detail: String,
    },
}

/// Coarse classification of a failure, independent of the operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    Timeout,
    ClientError,
    NetworkError,
    ApiError,
    InvalidResponse,
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            ApiError::InvalidResponse { .. } => ErrorKind::InvalidResponse,
            ApiError::Request { source, .. } => match source {
                FetchError::Timeout { .. } => ErrorKind::Timeout,
                FetchError::Client { .. } => ErrorKind::ClientError,
                FetchError::Network { .. } => ErrorKind::NetworkError,
                FetchError::Api { .. } => ErrorKind::ApiError,
                FetchError::Decode { .. } => ErrorKind::InvalidResponse,
            },
        }
    }

    pub fn operation(&self) -> &'static str {
        match self {
            ApiError::InvalidArgument { operation, .. }
            | ApiError::Request { operation, .. }
            | ApiError::InvalidResponse { operation, .. } => operation,
        }
    }

    /// 404 is an ordinary client error; this only saves callers the match.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ApiError::Request {
                source: FetchError::Client { status: 404, .. },
                ..
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_request_error_names_operation_and_input() {
        let err = ApiError::Request {
            operation: "get_text",
            input: "Genesis 1".to_string(),
            source: FetchError::Client {
                url: "https://example.org/api/texts/Genesis%201".to_string(),
                status: 404,
                message: "Not Found".to_string(),
            },
        };

        let message = err.to_string();
        assert!(message.contains("get_text"));
        assert!(message.contains("Genesis 1"));
        assert!(message.contains("404"));
        assert_eq!(err.kind(), ErrorKind::ClientError);
        assert!(err.is_not_found());

        let source = err.source().expect("root cause preserved");
        assert!(source.to_string().contains("texts/Genesis%201"));
    }

    #[test]
    fn test_network_error_reports_last_status() {
        let err = FetchError::Network {
            url: "https://example.org/api/index".to_string(),
            attempts: 4,
            status: Some(503),
            message: "Service Unavailable".to_string(),
        };
        assert_eq!(err.status(), Some(503));
        assert!(err.to_string().contains("after 4 attempts"));
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn test_kind_for_decode_failure_is_invalid_response() {
        let err = ApiError::Request {
            operation: "get_index",
            input: "Genesis".to_string(),
            source: FetchError::Decode {
                url: "u".to_string(),
                message: "expected value".to_string(),
            },
        };
        assert_eq!(err.kind(), ErrorKind::InvalidResponse);
        assert!(!err.is_not_found());
    }
}
