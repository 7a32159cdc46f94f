//! Registry-framed Avro deserializer.
//!
//! The frame carries only a schema id. After fetching the writer schema the
//! concrete Rust type is chosen through a [`RecordLookup`] by the record's
//! full name, limited to the configured record packages.

use crate::avro::{self, AvroRecord, DecodedRecord, RecordLookup};
use crate::config::SerdeConfig;
use crate::registry::{self, SchemaRegistryClient};
use crate::{Error, Result};
use apache_avro::types::Value;
use apache_avro::Schema;
use rdkafka::Message;
use std::sync::Arc;
use tracing::{debug, instrument};

pub struct AvroDeserializer {
    client: Option<Arc<dyn SchemaRegistryClient>>,
    config: Option<SerdeConfig>,
    is_key: bool,
    lookup: Arc<RecordLookup>,
}

impl AvroDeserializer {
    /// An unconfigured deserializer resolving types through `lookup`.
    pub fn new(lookup: impl Into<Arc<RecordLookup>>) -> Self {
        Self {
            client: None,
            config: None,
            is_key: false,
            lookup: lookup.into(),
        }
    }

    /// An unconfigured deserializer that will use `client` instead of one built from the URL.
    pub fn with_client(
        client: Arc<dyn SchemaRegistryClient>,
        lookup: impl Into<Arc<RecordLookup>>,
    ) -> Self {
        Self {
            client: Some(client),
            ..Self::new(lookup)
        }
    }

    pub fn configure<I, K, V>(&mut self, properties: I, is_key: bool) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let config = SerdeConfig::from_properties(properties)?;
        self.configure_with(config, is_key)
    }

    pub fn configure_with(&mut self, config: SerdeConfig, is_key: bool) -> Result<()> {
        if self.client.is_none() {
            self.client = Some(registry::client_for_config(&config)?);
        }
        debug!(
            is_key,
            record_packages = ?config.record_packages,
            known_records = self.lookup.len(),
            "Configured Avro deserializer"
        );
        self.config = Some(config);
        self.is_key = is_key;
        Ok(())
    }

    pub fn is_key(&self) -> bool {
        self.is_key
    }

    pub fn lookup(&self) -> &RecordLookup {
        &self.lookup
    }

    /// Releases the registry client. The deserializer must be configured again before reuse.
    pub fn close(&mut self) {
        self.client = None;
        self.config = None;
    }

    /// Decodes a framed message. `None` or empty input yields `None`, as does
    /// a payload holding the null branch of a nullable schema.
    #[instrument(skip(self, bytes), fields(len = bytes.map_or(0, |b| b.len())))]
    pub async fn deserialize(
        &self,
        topic: &str,
        bytes: Option<&[u8]>,
    ) -> Result<Option<DecodedRecord>> {
        let bytes = match bytes {
            Some(bytes) if !bytes.is_empty() => bytes,
            _ => return Ok(None),
        };
        let (client, config) = self.configured()?;

        let frame = avro::decode_frame(bytes)?;
        let writer_schema = client.get_by_id(frame.schema_id).await?;
        let value = avro::record::decode_datum(&writer_schema, frame.payload)?;

        let (branch, value) = match select_branch(&writer_schema, value)? {
            Some(selected) => selected,
            None => {
                debug!(schema_id = frame.schema_id, "Decoded null record");
                return Ok(None);
            }
        };

        let record_name = avro::full_name(branch).ok_or_else(|| {
            Error::TypeResolution(format!(
                "schema {} is not a named record",
                frame.schema_id
            ))
        })?;

        let decoded = self
            .lookup
            .decode(&record_name, &config.record_packages, value)?;
        debug!(
            schema_id = frame.schema_id,
            record = %record_name,
            "Deserialized record"
        );
        Ok(Some(decoded))
    }

    /// Decodes a framed message straight into `T`.
    pub async fn deserialize_into<T: AvroRecord>(
        &self,
        topic: &str,
        bytes: Option<&[u8]>,
    ) -> Result<Option<T>> {
        match self.deserialize(topic, bytes).await? {
            None => Ok(None),
            Some(record) => record.downcast::<T>().map(Some).map_err(|record| {
                Error::TypeResolution(format!(
                    "'{}' decodes to {}, not {}",
                    record.schema_name(),
                    record.type_name(),
                    std::any::type_name::<T>()
                ))
            }),
        }
    }

    /// Decodes the key or payload of a consumed message, depending on how
    /// the deserializer was configured.
    pub async fn deserialize_message<M: Message>(&self, message: &M) -> Result<Option<DecodedRecord>> {
        let bytes = if self.is_key {
            message.key()
        } else {
            message.payload()
        };
        self.deserialize(message.topic(), bytes).await
    }

    fn configured(&self) -> Result<(&Arc<dyn SchemaRegistryClient>, &SerdeConfig)> {
        match (&self.client, &self.config) {
            (Some(client), Some(config)) => Ok((client, config)),
            _ => Err(Error::Config(
                "deserializer used before configure()".to_string(),
            )),
        }
    }
}

/// Picks the union branch a value was written with. `None` means null.
fn select_branch(schema: &Schema, value: Value) -> Result<Option<(&Schema, Value)>> {
    match (schema, value) {
        (Schema::Union(union), Value::Union(index, inner)) => {
            let branch = union.variants().get(index as usize).ok_or_else(|| {
                Error::Decoding(format!("union branch {} out of range", index))
            })?;
            match *inner {
                Value::Null => Ok(None),
                inner => Ok(Some((branch, inner))),
            }
        }
        (_, Value::Null) => Ok(None),
        (schema, value) => Ok(Some((schema, value))),
    }
}
