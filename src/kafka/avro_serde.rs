use super::{AvroDeserializer, AvroSerializer};
use crate::avro::RecordLookup;
use crate::config::SerdeConfig;
use crate::registry::{self, SchemaRegistryClient};
use crate::Result;
use std::sync::Arc;

/// A serializer and deserializer pair sharing one registry client.
pub struct AvroSerde {
    serializer: AvroSerializer,
    deserializer: AvroDeserializer,
}

impl AvroSerde {
    pub fn new(client: Arc<dyn SchemaRegistryClient>, lookup: RecordLookup) -> Self {
        Self {
            serializer: AvroSerializer::with_client(client.clone()),
            deserializer: AvroDeserializer::with_client(client, lookup),
        }
    }

    /// Builds the registry client from `config` and configures both halves.
    pub fn from_config(config: SerdeConfig, lookup: RecordLookup, is_key: bool) -> Result<Self> {
        let client = registry::client_for_config(&config)?;
        let mut serde = Self::new(client, lookup);
        serde.configure_with(config, is_key)?;
        Ok(serde)
    }

    pub fn configure<I, K, V>(&mut self, properties: I, is_key: bool) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.configure_with(SerdeConfig::from_properties(properties)?, is_key)
    }

    pub fn configure_with(&mut self, config: SerdeConfig, is_key: bool) -> Result<()> {
        self.serializer.configure_with(config.clone(), is_key)?;
        self.deserializer.configure_with(config, is_key)
    }

    pub fn serializer(&self) -> &AvroSerializer {
        &self.serializer
    }

    pub fn deserializer(&self) -> &AvroDeserializer {
        &self.deserializer
    }

    pub fn close(&mut self) {
        self.serializer.close();
        self.deserializer.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avro::AvroRecord;
    use crate::registry::MockSchemaRegistryClient;
    use apache_avro::AvroSchema;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize, AvroSchema)]
    struct Reading {
        sensor: String,
        celsius: f64,
    }

    impl AvroRecord for Reading {}

    #[tokio::test]
    async fn test_serde_round_trip() {
        let registry = Arc::new(MockSchemaRegistryClient::new());
        let lookup = RecordLookup::new().with::<Reading>().unwrap();
        let mut serde = AvroSerde::new(registry, lookup);
        serde
            .configure(
                [
                    ("schema.registry.url", "mock://serde-tests"),
                    ("auto.register.schemas", "true"),
                ],
                false,
            )
            .unwrap();

        let reading = Reading {
            sensor: "kitchen".to_string(),
            celsius: 21.5,
        };
        let bytes = serde
            .serializer()
            .serialize("readings", Some(&reading))
            .await
            .unwrap();
        let decoded = serde
            .deserializer()
            .deserialize_into::<Reading>("readings", bytes.as_deref())
            .await
            .unwrap();

        assert_eq!(decoded, Some(reading));
    }

    #[tokio::test]
    async fn test_from_config_uses_mock_scope() {
        let mut config = SerdeConfig::new("mock://serde-from-config");
        config.auto_register_schemas = true;
        let lookup = RecordLookup::new().with::<Reading>().unwrap();

        let serde = AvroSerde::from_config(config, lookup, false).unwrap();
        let reading = Reading {
            sensor: "attic".to_string(),
            celsius: -3.0,
        };
        serde
            .serializer()
            .serialize("readings", Some(&reading))
            .await
            .unwrap();

        let shared = MockSchemaRegistryClient::for_scope("serde-from-config");
        assert_eq!(shared.subjects().await, vec!["readings-value"]);
        MockSchemaRegistryClient::drop_scope("serde-from-config");
    }
}
