//! Decode-time record type resolution.
//!
//! The wire format carries only a schema id, so the deserializer needs a way
//! back from a writer schema's full name to a concrete Rust type. Types are
//! registered up front; record packages (namespace prefixes) restrict which
//! of them a given deserializer may pick.

use super::record::{from_avro_value, AvroRecord};
use super::full_name;
use crate::{Error, Result};
use apache_avro::types::Value;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

type DecodeFn = Arc<dyn Fn(Value) -> Result<Box<dyn Any + Send + Sync>> + Send + Sync>;

#[derive(Clone)]
struct LookupEntry {
    namespace: Option<String>,
    type_id: TypeId,
    type_name: &'static str,
    decode: DecodeFn,
}

/// Registered record types keyed by schema full name.
#[derive(Clone, Default)]
pub struct RecordLookup {
    entries: HashMap<String, LookupEntry>,
}

impl fmt::Debug for RecordLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<(&String, &str)> = self
            .entries
            .iter()
            .map(|(name, entry)| (name, entry.type_name))
            .collect();
        names.sort();
        f.debug_struct("RecordLookup").field("entries", &names).finish()
    }
}

impl RecordLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `T` resolvable under its record full name.
    ///
    /// Registering the same type twice is a no-op; registering a different
    /// type under an already taken name fails.
    pub fn register<T: AvroRecord>(&mut self) -> Result<&mut Self> {
        let schema = T::record_schema()?;
        let name = full_name(&schema)
            .ok_or_else(|| Error::Schema(format!("{} has no named schema", std::any::type_name::<T>())))?;

        if let Some(existing) = self.entries.get(&name) {
            if existing.type_id == TypeId::of::<T>() {
                return Ok(self);
            }
            return Err(Error::Schema(format!(
                "schema name '{}' is already bound to {}",
                name, existing.type_name
            )));
        }

        let namespace = name.rsplit_once('.').map(|(ns, _)| ns.to_string());
        debug!("Registered record type {} as '{}'", std::any::type_name::<T>(), name);
        self.entries.insert(
            name,
            LookupEntry {
                namespace,
                type_id: TypeId::of::<T>(),
                type_name: std::any::type_name::<T>(),
                decode: Arc::new(|value: Value| -> Result<Box<dyn Any + Send + Sync>> {
                    let typed: T = from_avro_value(value)?;
                    Ok(Box::new(typed))
                }),
            },
        );
        Ok(self)
    }

    /// Builder form of [`register`](Self::register).
    pub fn with<T: AvroRecord>(mut self) -> Result<Self> {
        self.register::<T>()?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, full_name: &str) -> bool {
        self.entries.contains_key(full_name)
    }

    /// Decodes `value` into the type registered for `full_name`.
    ///
    /// With a non-empty `packages` list, only types whose namespace equals
    /// or lies below one of the packages are eligible.
    pub fn decode(&self, full_name: &str, packages: &[String], value: Value) -> Result<DecodedRecord> {
        let entry = self.entries.get(full_name).ok_or_else(|| {
            Error::TypeResolution(format!("no record type registered for '{}'", full_name))
        })?;

        if !packages.is_empty() && !in_packages(entry.namespace.as_deref(), packages) {
            return Err(Error::TypeResolution(format!(
                "record type for '{}' is outside the configured packages {:?}",
                full_name, packages
            )));
        }

        let value = (entry.decode)(value)?;
        Ok(DecodedRecord {
            schema_name: full_name.to_string(),
            type_name: entry.type_name,
            value,
        })
    }
}

fn in_packages(namespace: Option<&str>, packages: &[String]) -> bool {
    let namespace = namespace.unwrap_or("");
    packages.iter().any(|package| {
        namespace == package
            || (namespace.starts_with(package.as_str())
                && namespace[package.len()..].starts_with('.'))
    })
}

/// A deserialized record of a type chosen at runtime.
pub struct DecodedRecord {
    schema_name: String,
    type_name: &'static str,
    value: Box<dyn Any + Send + Sync>,
}

impl fmt::Debug for DecodedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedRecord")
            .field("schema_name", &self.schema_name)
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

impl DecodedRecord {
    /// Full name of the writer schema's record.
    pub fn schema_name(&self) -> &str {
        &self.schema_name
    }

    /// Rust type the record was decoded into.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is<T: Any>(&self) -> bool {
        self.value.is::<T>()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Takes the value out as `T`, handing `self` back when it is another type.
    pub fn downcast<T: Any>(self) -> std::result::Result<T, Self> {
        let Self {
            schema_name,
            type_name,
            value,
        } = self;
        match value.downcast::<T>() {
            Ok(typed) => Ok(*typed),
            Err(value) => Err(Self {
                schema_name,
                type_name,
                value,
            }),
        }
    }
}
