use super::RegistryError;
use apache_avro::Schema;
use async_trait::async_trait;

/// Result type for registry operations.
pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

/// Access to a schema registry.
///
/// Implementations must be safe to share between tasks. They may cache
/// id/schema mappings; callers add no cache of their own.
#[async_trait]
pub trait SchemaRegistryClient: Send + Sync {
    /// Registers `schema` under `subject`, returning its id. Registering an
    /// already known schema returns the existing id.
    async fn register(&self, subject: &str, schema: &Schema) -> RegistryResult<u32>;

    /// Fetches the schema registered with `id`.
    async fn get_by_id(&self, id: u32) -> RegistryResult<Schema>;

    /// Looks up the id of `schema` under `subject` without registering it.
    async fn get_id(&self, subject: &str, schema: &Schema) -> RegistryResult<u32>;
}
