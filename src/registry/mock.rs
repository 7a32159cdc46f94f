//! In-memory schema registry for tests and local development.
//!
//! Clients are shared per scope: every serializer configured with
//! `mock://orders` talks to the same instance, so a value written by one
//! serde can be read by another without a running registry.

use super::client::{RegistryResult, SchemaRegistryClient};
use super::RegistryError;
use apache_avro::Schema;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};
use tokio::sync::RwLock;
use tracing::debug;

/// URL scheme selecting the in-memory registry.
pub const MOCK_URL_PREFIX: &str = "mock://";

static SCOPES: OnceLock<Mutex<HashMap<String, Arc<MockSchemaRegistryClient>>>> = OnceLock::new();

fn scopes() -> &'static Mutex<HashMap<String, Arc<MockSchemaRegistryClient>>> {
    SCOPES.get_or_init(|| Mutex::new(HashMap::new()))
}

#[derive(Debug, Default)]
struct MockState {
    last_id: u32,
    schemas: HashMap<u32, Schema>,
    ids_by_canonical: HashMap<String, u32>,
    subjects: HashMap<String, Vec<u32>>,
}

/// A registry living entirely in process memory.
///
/// Ids are assigned sequentially from 1. Identical schemas (by parsing
/// canonical form) share one id across subjects, as in a real registry.
#[derive(Debug, Default)]
pub struct MockSchemaRegistryClient {
    state: RwLock<MockState>,
}

impl MockSchemaRegistryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the shared client for `scope`, creating it on first use.
    pub fn for_scope(scope: &str) -> Arc<Self> {
        let mut scopes = scopes().lock().unwrap_or_else(|e| e.into_inner());
        scopes
            .entry(scope.to_string())
            .or_insert_with(|| {
                debug!("Creating mock schema registry scope '{}'", scope);
                Arc::new(Self::new())
            })
            .clone()
    }

    /// Forgets the shared client for `scope`.
    pub fn drop_scope(scope: &str) {
        let mut scopes = scopes().lock().unwrap_or_else(|e| e.into_inner());
        scopes.remove(scope);
    }

    /// Extracts the scope from a `mock://scope` URL.
    pub fn scope_from_url(url: &str) -> Option<&str> {
        url.strip_prefix(MOCK_URL_PREFIX)
            .map(|scope| scope.trim_end_matches('/'))
    }

    /// All subjects with at least one registered version.
    pub async fn subjects(&self) -> Vec<String> {
        let state = self.state.read().await;
        let mut subjects: Vec<String> = state.subjects.keys().cloned().collect();
        subjects.sort();
        subjects
    }

    /// Schema ids registered under `subject`, oldest first.
    pub async fn versions(&self, subject: &str) -> Vec<u32> {
        let state = self.state.read().await;
        state.subjects.get(subject).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl SchemaRegistryClient for MockSchemaRegistryClient {
    async fn register(&self, subject: &str, schema: &Schema) -> RegistryResult<u32> {
        let canonical = schema.canonical_form();
        let mut state = self.state.write().await;

        let id = match state.ids_by_canonical.get(&canonical) {
            Some(id) => *id,
            None => {
                state.last_id += 1;
                let id = state.last_id;
                state.ids_by_canonical.insert(canonical, id);
                state.schemas.insert(id, schema.clone());
                id
            }
        };

        let versions = state.subjects.entry(subject.to_string()).or_default();
        if !versions.contains(&id) {
            versions.push(id);
            debug!(subject, id, version = versions.len(), "Registered schema");
        }

        Ok(id)
    }

    async fn get_by_id(&self, id: u32) -> RegistryResult<Schema> {
        let state = self.state.read().await;
        state
            .schemas
            .get(&id)
            .cloned()
            .ok_or(RegistryError::IdNotFound(id))
    }

    async fn get_id(&self, subject: &str, schema: &Schema) -> RegistryResult<u32> {
        let state = self.state.read().await;
        let versions = state
            .subjects
            .get(subject)
            .ok_or_else(|| RegistryError::SubjectNotFound(subject.to_string()))?;

        state
            .ids_by_canonical
            .get(&schema.canonical_form())
            .copied()
            .filter(|id| versions.contains(id))
            .ok_or_else(|| {
                RegistryError::SchemaNotFound(format!("schema not registered under '{}'", subject))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(name: &str) -> Schema {
        Schema::parse_str(&format!(
            r#"{{"type":"record","name":"{}","namespace":"test","fields":[{{"name":"id","type":"long"}}]}}"#,
            name
        ))
        .unwrap()
    }

    #[tokio::test]
    async fn test_register_assigns_sequential_ids() {
        let registry = MockSchemaRegistryClient::new();

        let first = registry.register("a-value", &schema("A")).await.unwrap();
        let second = registry.register("b-value", &schema("B")).await.unwrap();

        assert_eq!(first, 1);
        assert_eq!(second, 2);
    }

    #[tokio::test]
    async fn test_same_schema_shares_id_across_subjects() {
        let registry = MockSchemaRegistryClient::new();

        let id = registry.register("a-value", &schema("A")).await.unwrap();
        let again = registry.register("a-value", &schema("A")).await.unwrap();
        let other_subject = registry.register("b-value", &schema("A")).await.unwrap();

        assert_eq!(id, again);
        assert_eq!(id, other_subject);
        assert_eq!(registry.versions("a-value").await, vec![id]);
        assert_eq!(registry.subjects().await, vec!["a-value", "b-value"]);
    }

    #[tokio::test]
    async fn test_get_id_requires_registration_under_subject() {
        let registry = MockSchemaRegistryClient::new();

        let err = registry.get_id("a-value", &schema("A")).await.unwrap_err();
        assert!(matches!(err, RegistryError::SubjectNotFound(_)));

        registry.register("a-value", &schema("A")).await.unwrap();
        registry.register("b-value", &schema("B")).await.unwrap();

        let err = registry.get_id("a-value", &schema("B")).await.unwrap_err();
        assert!(matches!(err, RegistryError::SchemaNotFound(_)));

        assert_eq!(registry.get_id("a-value", &schema("A")).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_get_by_id() {
        let registry = MockSchemaRegistryClient::new();
        let id = registry.register("a-value", &schema("A")).await.unwrap();

        let fetched = registry.get_by_id(id).await.unwrap();
        assert_eq!(fetched.canonical_form(), schema("A").canonical_form());

        let err = registry.get_by_id(99).await.unwrap_err();
        assert!(matches!(err, RegistryError::IdNotFound(99)));
    }

    #[tokio::test]
    async fn test_scopes_are_shared() {
        let first = MockSchemaRegistryClient::for_scope("mock-scope-shared");
        let second = MockSchemaRegistryClient::for_scope("mock-scope-shared");
        assert!(Arc::ptr_eq(&first, &second));

        MockSchemaRegistryClient::drop_scope("mock-scope-shared");
        let third = MockSchemaRegistryClient::for_scope("mock-scope-shared");
        assert!(!Arc::ptr_eq(&first, &third));
        MockSchemaRegistryClient::drop_scope("mock-scope-shared");
    }

    #[test]
    fn test_scope_from_url() {
        assert_eq!(MockSchemaRegistryClient::scope_from_url("mock://registry"), Some("registry"));
        assert_eq!(MockSchemaRegistryClient::scope_from_url("mock://registry/"), Some("registry"));
        assert_eq!(MockSchemaRegistryClient::scope_from_url("http://localhost:8081"), None);
    }
}
