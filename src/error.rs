//! Error types and result handling for kafka-avro-serde.
//!
//! This module defines the main error type [`Error`] and a convenience
//! [`Result`] type alias used throughout the crate. Registry failures keep
//! their own [`RegistryError`] so callers can tell a missing subject from a
//! network outage.
//!
//! # Example
//!
//! ```rust
//! use kafka_avro_serde::avro::framing;
//! use kafka_avro_serde::Error;
//!
//! match framing::decode_frame(&[1, 0, 0, 0, 7]) {
//!     Err(Error::Framing(msg)) => eprintln!("not a registry frame: {}", msg),
//!     Err(e) => eprintln!("Other error: {}", e),
//!     Ok(frame) => println!("schema id {}", frame.schema_id),
//! }
//! ```

use thiserror::Error;

pub use crate::registry::RegistryError;

/// The main error type for serializer and deserializer operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or missing configuration option.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failure loading a configuration file or environment overlay.
    #[error("Configuration source error: {0}")]
    ConfigSource(#[from] config::ConfigError),

    /// Bad magic byte or truncated header on the wire.
    #[error("Framing error: {0}")]
    Framing(String),

    /// Registration, lookup or transport failure reported by the registry client.
    #[error("Schema registry error: {0}")]
    Registry(#[from] RegistryError),

    /// No registered record type matches the writer schema.
    #[error("Type resolution error: {0}")]
    TypeResolution(String),

    /// A type's schema could not be derived or adjusted.
    #[error("Schema error: {0}")]
    Schema(String),

    /// The value does not fit the schema it is written with.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// The payload does not decode against the writer schema or into the target type.
    #[error("Decoding error: {0}")]
    Decoding(String),

    /// Kafka client or producer error.
    #[error("Kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    /// JSON error, typically when rendering decoded payloads.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error, typically from reading input files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenient Result type alias for kafka-avro-serde operations.
///
/// This is equivalent to `std::result::Result<T, kafka_avro_serde::Error>`.
pub type Result<T> = std::result::Result<T, Error>;
