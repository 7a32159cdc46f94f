use super::AvroSerializer;
use crate::avro::AvroRecord;
use crate::{Error, Result};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::ClientConfig;
use tracing::debug;

/// Produces registry-framed Avro values to Kafka.
pub struct AvroProducer {
    producer: FutureProducer,
    serializer: AvroSerializer,
}

impl AvroProducer {
    pub fn new(brokers: &[String], serializer: AvroSerializer) -> Result<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers.join(","))
            .set("acks", "all")
            .create()
            .map_err(Error::Kafka)?;

        Ok(Self::from_producer(producer, serializer))
    }

    pub fn from_producer(producer: FutureProducer, serializer: AvroSerializer) -> Self {
        Self {
            producer,
            serializer,
        }
    }

    pub fn serializer(&self) -> &AvroSerializer {
        &self.serializer
    }

    /// Sends `value` to `topic`; `None` sends a tombstone. Returns partition and offset.
    pub async fn send<T: AvroRecord>(
        &self,
        topic: &str,
        key: Option<&str>,
        value: Option<&T>,
    ) -> Result<(i32, i64)> {
        let payload = self.serializer.serialize(topic, value).await?;

        let mut record: FutureRecord<'_, str, [u8]> = FutureRecord::to(topic);
        if let Some(key) = key {
            record = record.key(key);
        }
        if let Some(payload) = payload.as_deref() {
            record = record.payload(payload);
        }

        let (partition, offset) = self
            .producer
            .send(record, rdkafka::util::Timeout::Never)
            .await
            .map_err(|(e, _)| Error::Kafka(e))?;

        debug!(topic, partition, offset, "Delivered record");
        Ok((partition, offset))
    }
}
