//! Registry-framed Avro serializer.
//!
//! # Example
//!
//! ```rust,no_run
//! use apache_avro::AvroSchema;
//! use kafka_avro_serde::avro::AvroRecord;
//! use kafka_avro_serde::kafka::AvroSerializer;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Serialize, Deserialize, AvroSchema)]
//! struct Heartbeat {
//!     beat: i64,
//! }
//!
//! impl AvroRecord for Heartbeat {}
//!
//! # async fn example() -> kafka_avro_serde::Result<()> {
//! let mut serializer = AvroSerializer::new();
//! serializer.configure(
//!     [
//!         ("schema.registry.url", "http://localhost:8081"),
//!         ("auto.register.schemas", "true"),
//!     ],
//!     false,
//! )?;
//!
//! let bytes = serializer.serialize("heartbeats", Some(&Heartbeat { beat: 3 })).await?;
//! assert!(bytes.is_some());
//! # Ok(())
//! # }
//! ```

use crate::avro::{self, AvroRecord};
use crate::config::SerdeConfig;
use crate::registry::{self, SchemaRegistryClient};
use crate::{Error, Result};
use std::sync::Arc;
use tracing::{debug, instrument};

#[derive(Default)]
pub struct AvroSerializer {
    client: Option<Arc<dyn SchemaRegistryClient>>,
    config: Option<SerdeConfig>,
    is_key: bool,
}

impl AvroSerializer {
    /// An unconfigured serializer; the registry client is created by [`configure`](Self::configure).
    pub fn new() -> Self {
        Self::default()
    }

    /// An unconfigured serializer that will use `client` instead of one built from the URL.
    pub fn with_client(client: Arc<dyn SchemaRegistryClient>) -> Self {
        Self {
            client: Some(client),
            config: None,
            is_key: false,
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
            auto_register = config.auto_register_schemas,
            "Configured Avro serializer"
        );
        self.config = Some(config);
        self.is_key = is_key;
        Ok(())
    }

    pub fn is_key(&self) -> bool {
        self.is_key
    }

    pub fn config(&self) -> Option<&SerdeConfig> {
        self.config.as_ref()
    }

    /// Releases the registry client. The serializer must be configured again before reuse.
    pub fn close(&mut self) {
        self.client = None;
        self.config = None;
    }

    /// Frames `value` for `topic`. `None` produces no bytes.
    #[instrument(skip(self, value))]
    pub async fn serialize<T: AvroRecord>(
        &self,
        topic: &str,
        value: Option<&T>,
    ) -> Result<Option<Vec<u8>>> {
        let value = match value {
            Some(value) => value,
            None => return Ok(None),
        };
        let (client, config) = self.configured()?;

        let record_schema = T::record_schema()?;
        let record_name = avro::full_name(&record_schema)
            .ok_or_else(|| Error::Schema("record schema has no name".to_string()))?;
        let schema = avro::nullable_schema(record_schema)?;
        let subject = config
            .subject_name_strategy(self.is_key)
            .subject_name(topic, self.is_key, &record_name);

        let schema_id = if config.auto_register_schemas {
            client.register(&subject, &schema).await?
        } else {
            client.get_id(&subject, &schema).await?
        };

        let payload = avro::record::encode(value, &schema)?;
        debug!(
            subject = %subject,
            schema_id,
            payload_len = payload.len(),
            "Serialized record"
        );

        Ok(Some(avro::encode_frame(schema_id, &payload)))
    }

    fn configured(&self) -> Result<(&Arc<dyn SchemaRegistryClient>, &SerdeConfig)> {
        match (&self.client, &self.config) {
            (Some(client), Some(config)) => Ok((client, config)),
            _ => Err(Error::Config(
                "serializer used before configure()".to_string(),
            )),
        }
    }
}
