//! HTTP client for the Confluent Schema Registry REST API.
//!
//! Keeps an id -> schema cache and a (subject, schema) -> id cache, both
//! unbounded: schema ids never change meaning once assigned. Requests are
//! retried with exponential backoff on transport failures and 5xx responses;
//! 4xx responses fail immediately.

use super::client::{RegistryResult, SchemaRegistryClient};
use super::RegistryError;
use apache_avro::Schema;
use async_trait::async_trait;
use reqwest::{Client, Method, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

const CONTENT_TYPE: &str = "application/vnd.schemaregistry.v1+json";

/// Upper bound for a single backoff sleep.
const MAX_RETRY_BACKOFF: Duration = Duration::from_secs(60);

/// Connection settings for [`CachedSchemaRegistryClient`].
#[derive(Debug, Clone)]
pub struct RegistryClientConfig {
    /// Base URLs, tried in rotation across retry attempts.
    pub urls: Vec<String>,
    pub basic_auth: Option<(String, String)>,
    pub max_retries: u32,
    pub retry_backoff: Duration,
    pub request_timeout: Duration,
}

impl RegistryClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            basic_auth: None,
            max_retries: 3,
            retry_backoff: Duration::from_millis(100),
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Serialize)]
struct SchemaRequest<'a> {
    schema: &'a str,
}

#[derive(Debug, Deserialize)]
struct IdResponse {
    id: u32,
}

#[derive(Debug, Deserialize)]
struct SchemaResponse {
    schema: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    error_code: u32,
    #[serde(default)]
    message: String,
}

pub struct CachedSchemaRegistryClient {
    http_client: Client,
    config: RegistryClientConfig,
    schemas_by_id: RwLock<HashMap<u32, Schema>>,
    ids_by_subject: RwLock<HashMap<(String, String), u32>>,
}

impl CachedSchemaRegistryClient {
    pub fn new(config: RegistryClientConfig) -> RegistryResult<Self> {
        if config.urls.is_empty() {
            return Err(RegistryError::UnsupportedUrl(
                "no schema registry URL configured".to_string(),
            ));
        }
        for url in &config.urls {
            let parsed =
                Url::parse(url).map_err(|e| RegistryError::UnsupportedUrl(format!("{}: {}", url, e)))?;
            if parsed.cannot_be_a_base() || !matches!(parsed.scheme(), "http" | "https") {
                return Err(RegistryError::UnsupportedUrl(url.clone()));
            }
        }

        let http_client = Client::builder().timeout(config.request_timeout).build()?;

        Ok(Self {
            http_client,
            config,
            schemas_by_id: RwLock::new(HashMap::new()),
            ids_by_subject: RwLock::new(HashMap::new()),
        })
    }

    fn endpoint(&self, attempt: u32, segments: &[&str]) -> RegistryResult<Url> {
        let base = &self.config.urls[attempt as usize % self.config.urls.len()];
        let mut url =
            Url::parse(base).map_err(|e| RegistryError::UnsupportedUrl(format!("{}: {}", base, e)))?;
        url.path_segments_mut()
            .map_err(|_| RegistryError::UnsupportedUrl(base.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<String>,
    ) -> RegistryResult<T> {
        let mut attempt = 0;
        loop {
            match self.send_once::<T>(method.clone(), attempt, segments, body.clone()).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retriable() && attempt < self.config.max_retries => {
                    let delay = backoff_delay(self.config.retry_backoff, attempt);
                    warn!(
                        "Schema registry request failed (attempt {}), retrying in {:?}: {}",
                        attempt + 1,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_once<T: DeserializeOwned>(
        &self,
        method: Method,
        attempt: u32,
        segments: &[&str],
        body: Option<String>,
    ) -> RegistryResult<T> {
        let url = self.endpoint(attempt, segments)?;
        debug!("{} {}", method, url);

        let mut request = self
            .http_client
            .request(method, url)
            .header(reqwest::header::ACCEPT, CONTENT_TYPE);

        if let Some((username, password)) = &self.config.basic_auth {
            request = request.basic_auth(username, Some(password));
        }
        if let Some(body) = body {
            request = request
                .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE)
                .body(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| RegistryError::InvalidResponse(e.to_string()));
        }

        let text = response.text().await.unwrap_or_default();
        let error = serde_json::from_str::<ErrorResponse>(&text).unwrap_or(ErrorResponse {
            error_code: 0,
            message: text,
        });
        Err(RegistryError::from_api(
            status.as_u16(),
            error.error_code,
            error.message,
        ))
    }

    fn schema_body(schema: &Schema) -> RegistryResult<String> {
        let schema_json = serde_json::to_string(schema)
            .map_err(|e| RegistryError::InvalidSchema(e.to_string()))?;
        serde_json::to_string(&SchemaRequest {
            schema: &schema_json,
        })
        .map_err(|e| RegistryError::InvalidSchema(e.to_string()))
    }

    async fn cached_id(&self, subject: &str, canonical: &str) -> Option<u32> {
        let cache = self.ids_by_subject.read().await;
        cache
            .get(&(subject.to_string(), canonical.to_string()))
            .copied()
    }

    async fn cache_id(&self, subject: &str, schema: &Schema, id: u32) {
        self.ids_by_subject
            .write()
            .await
            .insert((subject.to_string(), schema.canonical_form()), id);
        self.schemas_by_id
            .write()
            .await
            .entry(id)
            .or_insert_with(|| schema.clone());
    }
}

/// `base * 2^attempt`, saturating and capped at [`MAX_RETRY_BACKOFF`].
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2_u32.saturating_pow(attempt))
        .min(MAX_RETRY_BACKOFF)
}

#[async_trait]
impl SchemaRegistryClient for CachedSchemaRegistryClient {
    #[instrument(skip(self, schema))]
    async fn register(&self, subject: &str, schema: &Schema) -> RegistryResult<u32> {
        if let Some(id) = self.cached_id(subject, &schema.canonical_form()).await {
            return Ok(id);
        }

        let body = Self::schema_body(schema)?;
        let response: IdResponse = self
            .execute(Method::POST, &["subjects", subject, "versions"], Some(body))
            .await?;

        debug!("Registered schema under '{}' with id {}", subject, response.id);
        self.cache_id(subject, schema, response.id).await;
        Ok(response.id)
    }

    #[instrument(skip(self))]
    async fn get_by_id(&self, id: u32) -> RegistryResult<Schema> {
        if let Some(schema) = self.schemas_by_id.read().await.get(&id) {
            return Ok(schema.clone());
        }

        let id_segment = id.to_string();
        let response: SchemaResponse = self
            .execute(Method::GET, &["schemas", "ids", &id_segment], None)
            .await?;

        let schema = Schema::parse_str(&response.schema)
            .map_err(|e| RegistryError::InvalidResponse(format!("schema {}: {}", id, e)))?;
        self.schemas_by_id.write().await.insert(id, schema.clone());
        Ok(schema)
    }

    #[instrument(skip(self, schema))]
    async fn get_id(&self, subject: &str, schema: &Schema) -> RegistryResult<u32> {
        if let Some(id) = self.cached_id(subject, &schema.canonical_form()).await {
            return Ok(id);
        }

        let body = Self::schema_body(schema)?;
        let response: IdResponse = self
            .execute(Method::POST, &["subjects", subject], Some(body))
            .await?;

        self.cache_id(subject, schema, response.id).await;
        Ok(response.id)
    }
}
