//! Schema derivation and Avro binary conversion for typed records.
//!
//! A record type derives its structural schema with `apache_avro`'s
//! `AvroSchema` derive and may override the wire name and namespace through
//! [`AvroRecord::metadata`]. A type without any namespace is placed in the
//! namespace of its Rust module path (`my_app::events` becomes
//! `my_app.events`).
//!
//! # Example
//!
//! ```rust
//! use apache_avro::AvroSchema;
//! use kafka_avro_serde::avro::{AvroRecord, SchemaMetadata};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Serialize, Deserialize, AvroSchema)]
//! struct Heartbeat {
//!     beat: i64,
//! }
//!
//! impl AvroRecord for Heartbeat {
//!     fn metadata() -> SchemaMetadata {
//!         SchemaMetadata::namespace("nl.openweb.data")
//!     }
//! }
//!
//! let schema = Heartbeat::record_schema().unwrap();
//! assert_eq!(kafka_avro_serde::avro::full_name(&schema).unwrap(), "nl.openweb.data.Heartbeat");
//! ```

use crate::{Error, Result};
use apache_avro::schema::{Name, UnionSchema};
use apache_avro::types::Value;
use apache_avro::{from_avro_datum, to_avro_datum, AvroSchema, Schema};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Wire name overrides attached to a record type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchemaMetadata {
    pub name: Option<&'static str>,
    pub namespace: Option<&'static str>,
}

impl SchemaMetadata {
    pub fn name(name: &'static str) -> Self {
        Self {
            name: Some(name),
            namespace: None,
        }
    }

    pub fn namespace(namespace: &'static str) -> Self {
        Self {
            name: None,
            namespace: Some(namespace),
        }
    }

    pub fn with_namespace(mut self, namespace: &'static str) -> Self {
        self.namespace = Some(namespace);
        self
    }
}

/// A value that can travel as a registry-framed Avro record.
pub trait AvroRecord: AvroSchema + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Name and namespace overrides for the derived schema.
    fn metadata() -> SchemaMetadata {
        SchemaMetadata::default()
    }

    /// The derived record schema with [`metadata`](Self::metadata) applied.
    fn record_schema() -> Result<Schema> {
        apply_metadata(
            Self::get_schema(),
            Self::metadata(),
            module_namespace(std::any::type_name::<Self>()),
        )
    }
}

fn apply_metadata(
    schema: Schema,
    metadata: SchemaMetadata,
    default_namespace: Option<String>,
) -> Result<Schema> {
    let record_name = match &schema {
        Schema::Record(record) => record.name.clone(),
        other => {
            return Err(Error::Schema(format!(
                "only record schemas can be framed, got {}",
                other.canonical_form()
            )))
        }
    };

    let name = metadata
        .name
        .map(str::to_string)
        .unwrap_or_else(|| record_name.name.clone());
    let namespace = metadata
        .namespace
        .map(str::to_string)
        .or_else(|| record_name.namespace.clone())
        .or(default_namespace);
    let renamed = Name { name, namespace };

    // Nested named types without a namespace inherit the new one on re-parse,
    // so their definitions and references keep resolving.
    let mut json = serde_json::to_value(&schema)
        .map_err(|e| Error::Schema(format!("cannot render derived schema: {}", e)))?;
    if let serde_json::Value::Object(map) = &mut json {
        if let Some(fields) = map.get_mut("fields") {
            rename_refs(fields, &record_name.fullname(None), &renamed.fullname(None));
        }
        map.insert("name".to_string(), renamed.name.clone().into());
        match &renamed.namespace {
            Some(namespace) => map.insert("namespace".to_string(), namespace.clone().into()),
            None => map.remove("namespace"),
        };
    }

    Schema::parse(&json).map_err(|e| {
        Error::Schema(format!(
            "cannot apply name {}: {}",
            renamed.fullname(None),
            e
        ))
    })
}

/// Points self references of a recursive record at its new name.
fn rename_refs(json: &mut serde_json::Value, old: &str, new: &str) {
    match json {
        serde_json::Value::String(name) if name.as_str() == old => *name = new.to_string(),
        serde_json::Value::Array(items) => {
            for item in items {
                rename_refs(item, old, new);
            }
        }
        serde_json::Value::Object(map) => {
            for key in ["type", "items", "values", "fields"] {
                if let Some(inner) = map.get_mut(key) {
                    rename_refs(inner, old, new);
                }
            }
        }
        _ => {}
    }
}

/// Namespace from a Rust type path, e.g. `app::events::Order` -> `app.events`.
fn module_namespace(type_name: &str) -> Option<String> {
    // generic arguments carry their own paths
    let path = type_name.split('<').next().unwrap_or(type_name);
    let (module, _) = path.rsplit_once("::")?;
    Some(module.replace("::", "."))
}

/// Full name of a named schema.
pub fn full_name(schema: &Schema) -> Option<String> {
    match schema {
        Schema::Record(record) => Some(record.name.fullname(None)),
        Schema::Enum(inner) => Some(inner.name.fullname(None)),
        Schema::Fixed(inner) => Some(inner.name.fullname(None)),
        _ => None,
    }
}

/// Wraps `schema` in a union with null, leaving already nullable unions alone.
pub fn nullable_schema(schema: Schema) -> Result<Schema> {
    if let Schema::Union(union) = &schema {
        if union.is_nullable() {
            return Ok(schema);
        }
    }
    let union = UnionSchema::new(vec![Schema::Null, schema])
        .map_err(|e| Error::Schema(format!("cannot make schema nullable: {}", e)))?;
    Ok(Schema::Union(union))
}

/// Encodes `value` as Avro binary against `schema`.
pub fn encode<T: Serialize>(value: &T, schema: &Schema) -> Result<Vec<u8>> {
    let value = apache_avro::to_value(value).map_err(|e| Error::Encoding(e.to_string()))?;
    let value = value
        .resolve(schema)
        .map_err(|e| Error::Encoding(e.to_string()))?;
    to_avro_datum(schema, value).map_err(|e| Error::Encoding(e.to_string()))
}

/// Decodes an Avro binary datum written with `schema`.
pub fn decode_datum(schema: &Schema, mut payload: &[u8]) -> Result<Value> {
    from_avro_datum(schema, &mut payload, None).map_err(|e| Error::Decoding(e.to_string()))
}

/// Converts a decoded value into `T`, resolving it against `T`'s own schema first.
pub fn from_avro_value<T: AvroRecord>(value: Value) -> Result<T> {
    let reader_schema = T::record_schema()?;
    let value = value
        .resolve(&reader_schema)
        .map_err(|e| Error::Decoding(e.to_string()))?;
    apache_avro::from_value::<T>(&value).map_err(|e| Error::Decoding(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize, AvroSchema)]
    struct Plain {
        id: i64,
        label: Option<String>,
    }

    impl AvroRecord for Plain {}

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize, AvroSchema)]
    struct Renamed {
        amount: f64,
    }

    impl AvroRecord for Renamed {
        fn metadata() -> SchemaMetadata {
            SchemaMetadata::name("Payment").with_namespace("billing.v1")
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize, AvroSchema)]
    struct Address {
        city: String,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize, AvroSchema)]
    struct Person {
        home: Address,
        work: Address,
    }

    impl AvroRecord for Person {}

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize, AvroSchema)]
    struct Node {
        value: i64,
        next: Option<Box<Node>>,
    }

    impl AvroRecord for Node {
        fn metadata() -> SchemaMetadata {
            SchemaMetadata::name("ListNode")
        }
    }

    #[test]
    fn test_default_namespace_is_module_path() {
        let schema = Plain::record_schema().unwrap();
        assert_eq!(
            full_name(&schema).unwrap(),
            "kafka_avro_serde.avro.record.tests.Plain"
        );
    }

    #[test]
    fn test_metadata_overrides_name_and_namespace() {
        let schema = Renamed::record_schema().unwrap();
        assert_eq!(full_name(&schema).unwrap(), "billing.v1.Payment");
    }

    #[test]
    fn test_nested_types_follow_record_namespace() {
        let schema = Person::record_schema().unwrap();
        let canonical = schema.canonical_form();
        assert!(canonical.contains("kafka_avro_serde.avro.record.tests.Address"));

        let value = Person {
            home: Address {
                city: "Utrecht".to_string(),
            },
            work: Address {
                city: "Delft".to_string(),
            },
        };
        let payload = encode(&value, &schema).unwrap();
        let decoded = decode_datum(&schema, &payload).unwrap();
        assert_eq!(from_avro_value::<Person>(decoded).unwrap(), value);
    }

    #[test]
    fn test_renamed_recursive_record() {
        let schema = Node::record_schema().unwrap();
        assert_eq!(
            full_name(&schema).unwrap(),
            "kafka_avro_serde.avro.record.tests.ListNode"
        );
        assert!(!schema.canonical_form().contains(".Node\""));

        let value = Node {
            value: 1,
            next: Some(Box::new(Node {
                value: 2,
                next: None,
            })),
        };
        let payload = encode(&value, &schema).unwrap();
        let decoded = decode_datum(&schema, &payload).unwrap();
        assert_eq!(from_avro_value::<Node>(decoded).unwrap(), value);
    }

    #[test]
    fn test_module_namespace() {
        assert_eq!(module_namespace("app::events::Order").as_deref(), Some("app.events"));
        assert_eq!(
            module_namespace("app::Wrapper<other::Inner>").as_deref(),
            Some("app")
        );
        assert_eq!(module_namespace("Order"), None);
    }

    #[test]
    fn test_non_record_schema_is_rejected() {
        let err = apply_metadata(Schema::Long, SchemaMetadata::default(), None).unwrap_err();
        assert!(matches!(err, Error::Schema(_)));
    }

    #[test]
    fn test_nullable_schema() {
        let schema = nullable_schema(Plain::record_schema().unwrap()).unwrap();
        match &schema {
            Schema::Union(union) => {
                assert_eq!(union.variants().len(), 2);
                assert_eq!(union.variants()[0], Schema::Null);
            }
            other => panic!("expected union, got {:?}", other),
        }

        // already nullable schemas are kept as they are
        let again = nullable_schema(schema.clone()).unwrap();
        assert_eq!(again, schema);
    }

    #[test]
    fn test_encode_decode_through_union() {
        let schema = nullable_schema(Plain::record_schema().unwrap()).unwrap();
        let value = Plain {
            id: 42,
            label: Some("answer".to_string()),
        };

        let payload = encode(&value, &schema).unwrap();
        let decoded = decode_datum(&schema, &payload).unwrap();

        match decoded {
            Value::Union(1, inner) => {
                assert_eq!(from_avro_value::<Plain>(*inner).unwrap(), value);
            }
            other => panic!("expected second union branch, got {:?}", other),
        }
    }

    #[test]
    fn test_encode_rejects_mismatched_schema() {
        let value = Plain { id: 1, label: None };
        let err = encode(&value, &Renamed::record_schema().unwrap()).unwrap_err();
        assert!(matches!(err, Error::Encoding(_)));
    }

    #[test]
    fn test_decode_truncated_payload() {
        let schema = Renamed::record_schema().unwrap();
        let err = decode_datum(&schema, &[0x01, 0x02]).unwrap_err();
        assert!(matches!(err, Error::Decoding(_)));
    }
}
