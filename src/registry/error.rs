//! Schema registry errors

use thiserror::Error;

/// Confluent-compatible error codes returned in REST error bodies.
pub mod error_codes {
    pub const SUBJECT_NOT_FOUND: u32 = 40401;
    pub const VERSION_NOT_FOUND: u32 = 40402;
    pub const SCHEMA_NOT_FOUND: u32 = 40403;

    pub const INVALID_SCHEMA: u32 = 42201;
    pub const INCOMPATIBLE_SCHEMA: u32 = 409;
}

/// Errors raised by [`SchemaRegistryClient`](super::SchemaRegistryClient) implementations.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Subject not found: {0}")]
    SubjectNotFound(String),

    #[error("Schema not found: {0}")]
    SchemaNotFound(String),

    #[error("Schema id {0} not found")]
    IdNotFound(u32),

    #[error("Incompatible schema: {0}")]
    Incompatible(String),

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Registry request failed with status {status} (error code {error_code}): {message}")]
    Http {
        status: u16,
        error_code: u32,
        message: String,
    },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid registry response: {0}")]
    InvalidResponse(String),

    #[error("Unsupported registry URL: {0}")]
    UnsupportedUrl(String),
}

impl RegistryError {
    /// Maps a Confluent REST error body onto the matching variant.
    pub fn from_api(status: u16, error_code: u32, message: String) -> Self {
        match error_code {
            error_codes::SUBJECT_NOT_FOUND => RegistryError::SubjectNotFound(message),
            error_codes::SCHEMA_NOT_FOUND | error_codes::VERSION_NOT_FOUND => {
                RegistryError::SchemaNotFound(message)
            }
            error_codes::INVALID_SCHEMA => RegistryError::InvalidSchema(message),
            _ if status == 409 || error_code == error_codes::INCOMPATIBLE_SCHEMA => {
                RegistryError::Incompatible(message)
            }
            _ => RegistryError::Http {
                status,
                error_code,
                message,
            },
        }
    }

    /// Whether the failure is worth another attempt.
    pub fn is_retriable(&self) -> bool {
        match self {
            RegistryError::Transport(_) => true,
            RegistryError::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
