use std::path::PathBuf;

use thiserror::Error;

/// Main error type for everything below the front-ends.
///
/// None of these are fatal to a run: callers fold them into a boolean
/// validation result, an inline diagnostic, or a silent fallback.
#[derive(Error, Debug)]
pub enum ConformanceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status error: {status} for {url} - {message}")]
    HttpStatus {
        url: String,
        status: u16,
        message: String,
    },

    #[error("Request timeout: {url} after {timeout_seconds} seconds")]
    Timeout { url: String, timeout_seconds: u64 },

    #[error("Schema parsing error: {url} - {details}")]
    SchemaParsing { url: String, details: String },

    #[error("Schema not found: {url}")]
    SchemaNotFound { url: String },

    #[error("Schema URL extraction failed: {file} - no schema location found")]
    SchemaUrlNotFound { file: PathBuf },

    #[error("LibXML2 internal error: {details}")]
    LibXml2Internal { details: String },

    #[error("Preference store error: {0}")]
    Preferences(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Concurrent operation error: {details}")]
    Concurrency { details: String },
}

/// LibXML2-specific error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LibXml2Error {
    #[error("Schema parsing failed: null pointer returned")]
    SchemaParseFailed,

    #[error("Validation context creation failed")]
    ValidationContextCreationFailed,

    #[error("File validation failed with code {code}: {file}")]
    ValidationFailed { code: i32, file: PathBuf },

    #[error("Memory allocation failed in libxml2")]
    MemoryAllocation,
}

impl From<LibXml2Error> for ConformanceError {
    fn from(err: LibXml2Error) -> Self {
        ConformanceError::LibXml2Internal {
            details: err.to_string(),
        }
    }
}

impl From<crate::config::ConfigError> for ConformanceError {
    fn from(err: crate::config::ConfigError) -> Self {
        ConformanceError::Config(err.to_string())
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ConformanceError>;

/// LibXML2 result type alias
pub type LibXml2Result<T> = std::result::Result<T, LibXml2Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conformance_error_display() {
        let io_error = ConformanceError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "File not found",
        ));
        assert!(io_error.to_string().contains("IO error"));

        let schema_error = ConformanceError::SchemaParsing {
            url: "http://example.com/schema.xsd".to_string(),
            details: "Invalid XML syntax".to_string(),
        };
        assert!(schema_error.to_string().contains("Schema parsing error"));
        assert!(
            schema_error
                .to_string()
                .contains("http://example.com/schema.xsd")
        );

        let status = ConformanceError::HttpStatus {
            url: "https://example.com/version".to_string(),
            status: 403,
            message: "HTTP 403: Forbidden".to_string(),
        };
        assert!(status.to_string().contains("403"));
    }

    #[test]
    fn test_libxml2_error_conversion() {
        let err: ConformanceError = LibXml2Error::SchemaParseFailed.into();
        match err {
            ConformanceError::LibXml2Internal { details } => {
                assert!(details.contains("Schema parsing failed"))
            }
            _ => panic!("Expected ConformanceError::LibXml2Internal"),
        }
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "Access denied");
        let err: ConformanceError = io_error.into();

        match err {
            ConformanceError::Io(_) => (),
            _ => panic!("Expected ConformanceError::Io"),
        }
    }

    #[test]
    fn test_error_source_chain() {
        use std::error::Error;

        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err = ConformanceError::Io(io_error);

        let source = err.source().unwrap();
        assert_eq!(source.to_string(), "File not found");
    }
}
