//! Error types for tagcheck.
//!
//! Every fallible operation in the library returns [`TagCheckError`]. Errors
//! reported by a registry in its structured JSON error document are kept in
//! [`TagCheckError::Api`] so that callers can classify them by error code
//! instead of by message text.

use serde::Deserialize;
use std::fmt;
use thiserror::Error;


/// Error code a registry returns when the requested manifest or tag is unknown.
pub const MANIFEST_UNKNOWN: &str = "MANIFEST_UNKNOWN";

/// Error code a registry returns when the requested repository is unknown.
pub const NAME_UNKNOWN: &str = "NAME_UNKNOWN";

/// A single entry of a registry error document.
///
/// Registries answer failed requests with a body of the form
/// `{"errors": [{"code": "...", "message": "...", "detail": ...}]}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiError {
    /// Machine readable error code, e.g. `MANIFEST_UNKNOWN`.
    pub code: String,
    /// Human readable message.
    #[serde(default)]
    pub message: String,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.code)
        } else {
            write!(f, "{}: {}", self.code, self.message)
        }
    }
}

/// Wire shape of the registry error document.
#[derive(Debug, Deserialize)]
struct ApiErrors {
    #[serde(default)]
    errors: Vec<ApiError>,
}

/// Parses a registry error document, returning `None` when the body is not one.
pub fn parse_api_errors(body: &str) -> Option<Vec<ApiError>> {
    let parsed: ApiErrors = serde_json::from_str(body).ok()?;
    if parsed.errors.is_empty() {
        None
    } else {
        Some(parsed.errors)
    }
}

/// Main error type for tagcheck operations
#[derive(Error, Debug)]
pub enum TagCheckError {
    /// Network-related errors (connection, timeout, DNS)
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Authentication errors (401, 403, token issues)
    #[error("Authentication error (status: {status_code:?}): {message}")]
    Authentication {
        message: String,
        status_code: Option<u16>,
    },

    /// Structured error document returned by the registry
    #[error("Registry error (status: {status}): {}", join_api_errors(.errors))]
    Api { status: u16, errors: Vec<ApiError> },

    /// Unstructured 404 responses
    #[error("{resource_type} not found: {name}")]
    NotFound { resource_type: String, name: String },

    /// Rate limiting errors (429)
    #[error("Rate limit: {message}")]
    RateLimit {
        message: String,
        retry_after: Option<u64>,
    },

    /// Server errors (500, 503)
    #[error("Server error (status: {status_code}): {message}")]
    Server { message: String, status_code: u16 },

    /// Validation errors (invalid reference, digest, malformed response)
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration errors (invalid config file, bad mirror URL)
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        path: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Local file errors (credential files, marker files)
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

fn join_api_errors(errors: &[ApiError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type alias for tagcheck operations
pub type Result<T> = std::result::Result<T, TagCheckError>;

impl TagCheckError {
    /// Creates a new network error.
    ///
    /// # Examples
    ///
    /// ```
    /// use libtagcheck::error::TagCheckError;
    ///
    /// let err = TagCheckError::network("connection refused");
    /// assert!(matches!(err, TagCheckError::Network { .. }));
    /// ```
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new network error with a source error.
    pub fn network_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Network {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new authentication error.
    pub fn authentication<S: Into<String>>(message: S, status_code: Option<u16>) -> Self {
        Self::Authentication {
            message: message.into(),
            status_code,
        }
    }

    /// Creates a new structured registry error.
    ///
    /// # Examples
    ///
    /// ```
    /// use libtagcheck::error::{ApiError, TagCheckError, MANIFEST_UNKNOWN};
    ///
    /// let err = TagCheckError::api(404, vec![ApiError {
    ///     code: MANIFEST_UNKNOWN.to_string(),
    ///     message: "manifest unknown".to_string(),
    /// }]);
    /// assert_eq!(err.api_code(), Some(MANIFEST_UNKNOWN));
    /// ```
    pub fn api(status: u16, errors: Vec<ApiError>) -> Self {
        Self::Api { status, errors }
    }

    /// Creates a new not found error.
    pub fn not_found<S: Into<String>>(resource_type: S, name: S) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
            name: name.into(),
        }
    }

    /// Creates a new rate limit error.
    pub fn rate_limit<S: Into<String>>(message: S, retry_after: Option<u64>) -> Self {
        Self::RateLimit {
            message: message.into(),
            retry_after,
        }
    }

    /// Creates a new server error.
    pub fn server<S: Into<String>>(message: S, status_code: u16) -> Self {
        Self::Server {
            message: message.into(),
            status_code,
        }
    }

    /// Creates a new validation error.
    ///
    /// # Examples
    ///
    /// ```
    /// use libtagcheck::error::TagCheckError;
    ///
    /// let err = TagCheckError::validation("image must have a tag");
    /// assert!(matches!(err, TagCheckError::Validation { .. }));
    /// ```
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new validation error with a source error.
    pub fn validation_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Validation {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new configuration error.
    pub fn config<S: Into<String>>(message: S, path: Option<S>) -> Self {
        Self::Config {
            message: message.into(),
            path: path.map(|p| p.into()),
            source: None,
        }
    }

    /// Creates a new configuration error with a source error.
    pub fn config_with_source<S, E>(message: S, path: Option<S>, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Config {
            message: message.into(),
            path: path.map(|p| p.into()),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new local I/O error for `path`.
    pub fn io<P: Into<String>>(path: P, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns the registry error code when the registry answered with
    /// exactly one structured error.
    ///
    /// Multi-error documents and every other variant return `None`; only an
    /// unambiguous code is ever used to classify an outcome.
    pub fn api_code(&self) -> Option<&str> {
        match self {
            Self::Api { errors, .. } if errors.len() == 1 => Some(errors[0].code.as_str()),
            _ => None,
        }
    }
}
