pub mod avro;
pub mod config;
pub mod error;
pub mod kafka;
pub mod registry;

pub use avro::{AvroRecord, DecodedRecord, RecordLookup, SchemaMetadata};
pub use config::SerdeConfig;
pub use error::{Error, Result};
pub use kafka::{AvroDeserializer, AvroSerde, AvroSerializer};
