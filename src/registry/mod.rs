//! Schema registry clients.
//!
//! [`client_for_config`] picks the implementation from the configured URL:
//! `mock://scope` yields the shared in-memory [`MockSchemaRegistryClient`]
//! for that scope, anything else the HTTP [`CachedSchemaRegistryClient`].

pub mod cached;
pub mod client;
pub mod error;
pub mod mock;

pub use cached::{CachedSchemaRegistryClient, RegistryClientConfig};
pub use client::{RegistryResult, SchemaRegistryClient};
pub use error::RegistryError;
pub use mock::MockSchemaRegistryClient;

use crate::config::SerdeConfig;
use std::sync::Arc;
use tracing::{debug, info};

pub fn client_for_config(config: &SerdeConfig) -> RegistryResult<Arc<dyn SchemaRegistryClient>> {
    let urls = config.registry_urls();

    if let Some(scope) = urls
        .first()
        .and_then(|url| MockSchemaRegistryClient::scope_from_url(url))
    {
        if urls.len() > 1 {
            return Err(RegistryError::UnsupportedUrl(format!(
                "a mock registry URL cannot be combined with others: {}",
                config.schema_registry_url
            )));
        }
        debug!("Using mock schema registry scope '{}'", scope);
        return Ok(MockSchemaRegistryClient::for_scope(scope));
    }

    if !config.passthrough.is_empty() {
        debug!(
            "Ignoring options not used by the registry client: {:?}",
            config.passthrough.keys().collect::<Vec<_>>()
        );
    }

    let client_config = RegistryClientConfig {
        urls,
        basic_auth: config.basic_auth(),
        max_retries: config.max_retries,
        retry_backoff: config.retry_backoff(),
        request_timeout: config.request_timeout(),
    };

    info!(urls = ?client_config.urls, "Connecting to schema registry");
    Ok(Arc::new(CachedSchemaRegistryClient::new(client_config)?))
}
