#![allow(dead_code)]

use apache_avro::{AvroSchema, Schema};
use async_trait::async_trait;
use kafka_avro_serde::registry::{MockSchemaRegistryClient, RegistryResult, SchemaRegistryClient};
use kafka_avro_serde::{AvroRecord, AvroSerde, RecordLookup, SchemaMetadata};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, AvroSchema)]
pub struct OrderCreated {
    pub order_id: i64,
    pub customer: String,
    pub note: Option<String>,
}

impl AvroRecord for OrderCreated {
    fn metadata() -> SchemaMetadata {
        SchemaMetadata::namespace("shop.orders")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, AvroSchema)]
pub struct OrderShipped {
    pub order_id: i64,
    pub carrier: String,
}

impl AvroRecord for OrderShipped {
    fn metadata() -> SchemaMetadata {
        SchemaMetadata::name("Shipped").with_namespace("shop.shipping")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, AvroSchema)]
pub struct AuditEntry {
    pub actor: String,
}

impl AvroRecord for AuditEntry {
    fn metadata() -> SchemaMetadata {
        SchemaMetadata::namespace("internal.audit")
    }
}

pub fn test_lookup() -> RecordLookup {
    RecordLookup::new()
        .with::<OrderCreated>()
        .unwrap()
        .with::<OrderShipped>()
        .unwrap()
        .with::<AuditEntry>()
        .unwrap()
}

pub fn order(order_id: i64) -> OrderCreated {
    OrderCreated {
        order_id,
        customer: format!("customer-{}", order_id),
        note: None,
    }
}

/// Unique mock scope per test so parallel tests never share a registry.
pub fn mock_url(test_name: &str) -> String {
    format!("mock://{}-{}", test_name, std::process::id())
}

/// Wraps the in-memory registry and counts calls per operation.
#[derive(Default)]
pub struct RecordingRegistry {
    pub inner: MockSchemaRegistryClient,
    register_calls: AtomicUsize,
    get_id_calls: AtomicUsize,
    get_by_id_calls: AtomicUsize,
}

impl RecordingRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn register_calls(&self) -> usize {
        self.register_calls.load(Ordering::SeqCst)
    }

    pub fn get_id_calls(&self) -> usize {
        self.get_id_calls.load(Ordering::SeqCst)
    }

    pub fn get_by_id_calls(&self) -> usize {
        self.get_by_id_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SchemaRegistryClient for RecordingRegistry {
    async fn register(&self, subject: &str, schema: &Schema) -> RegistryResult<u32> {
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.register(subject, schema).await
    }

    async fn get_by_id(&self, id: u32) -> RegistryResult<Schema> {
        self.get_by_id_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.get_by_id(id).await
    }

    async fn get_id(&self, subject: &str, schema: &Schema) -> RegistryResult<u32> {
        self.get_id_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.get_id(subject, schema).await
    }
}

/// A value serde backed by `registry`.
pub fn recording_serde(registry: Arc<RecordingRegistry>, auto_register: bool) -> AvroSerde {
    let mut serde = AvroSerde::new(registry, test_lookup());
    serde
        .configure(
            [
                ("schema.registry.url", "mock://recording"),
                (
                    "auto.register.schemas",
                    if auto_register { "true" } else { "false" },
                ),
            ],
            false,
        )
        .unwrap();
    serde
}
