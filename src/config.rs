use crate::kafka::SubjectNameStrategy;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Property names understood by [`SerdeConfig::from_properties`].
pub mod keys {
    pub const SCHEMA_REGISTRY_URL: &str = "schema.registry.url";
    pub const AUTO_REGISTER_SCHEMAS: &str = "auto.register.schemas";
    pub const RECORD_PACKAGES: &str = "record.packages";
    pub const VALUE_SUBJECT_NAME_STRATEGY: &str = "value.subject.name.strategy";
    pub const KEY_SUBJECT_NAME_STRATEGY: &str = "key.subject.name.strategy";
    pub const BASIC_AUTH_USER_INFO: &str = "basic.auth.user.info";
    pub const MAX_RETRIES: &str = "schema.registry.max.retries";
    pub const RETRY_BACKOFF_MS: &str = "schema.registry.retry.backoff.ms";
    pub const REQUEST_TIMEOUT_MS: &str = "schema.registry.request.timeout.ms";
}

/// Settings shared by the Avro serializer and deserializer.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SerdeConfig {
    /// Comma separated registry URLs, or `mock://scope`.
    pub schema_registry_url: String,
    #[serde(default)]
    pub auto_register_schemas: bool,
    /// Namespace prefixes eligible for decode-time type lookup; empty allows all.
    #[serde(default)]
    pub record_packages: Vec<String>,
    #[serde(default)]
    pub value_subject_name_strategy: SubjectNameStrategy,
    #[serde(default)]
    pub key_subject_name_strategy: SubjectNameStrategy,
    #[serde(default)]
    pub basic_auth_user_info: Option<String>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Unrecognized properties, handed through to the registry client.
    #[serde(default)]
    pub passthrough: HashMap<String, String>,
}

impl SerdeConfig {
    pub fn new(schema_registry_url: impl Into<String>) -> Self {
        Self {
            schema_registry_url: schema_registry_url.into(),
            auto_register_schemas: false,
            record_packages: Vec::new(),
            value_subject_name_strategy: SubjectNameStrategy::default(),
            key_subject_name_strategy: SubjectNameStrategy::default(),
            basic_auth_user_info: None,
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            passthrough: HashMap::new(),
        }
    }

    /// Builds a config from Kafka-style string properties.
    pub fn from_properties<I, K, V>(properties: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut url = None;
        let mut config = Self::new(String::new());

        for (key, value) in properties {
            let (key, value) = (key.as_ref(), value.as_ref().trim());
            match key {
                keys::SCHEMA_REGISTRY_URL => url = Some(value.to_string()),
                keys::AUTO_REGISTER_SCHEMAS => {
                    config.auto_register_schemas = parse_bool(key, value)?
                }
                keys::RECORD_PACKAGES => config.record_packages = parse_list(value),
                keys::VALUE_SUBJECT_NAME_STRATEGY => {
                    config.value_subject_name_strategy = parse_strategy(key, value)?
                }
                keys::KEY_SUBJECT_NAME_STRATEGY => {
                    config.key_subject_name_strategy = parse_strategy(key, value)?
                }
                keys::BASIC_AUTH_USER_INFO => {
                    config.basic_auth_user_info = Some(value.to_string())
                }
                keys::MAX_RETRIES => config.max_retries = parse_number(key, value)?,
                keys::RETRY_BACKOFF_MS => config.retry_backoff_ms = parse_number(key, value)?,
                keys::REQUEST_TIMEOUT_MS => {
                    config.request_timeout_ms = parse_number(key, value)?
                }
                _ => {
                    config
                        .passthrough
                        .insert(key.to_string(), value.to_string());
                }
            }
        }

        config.schema_registry_url = url.ok_or_else(|| {
            Error::Config(format!("missing required option '{}'", keys::SCHEMA_REGISTRY_URL))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads settings from a file overlaid with `KAFKA_AVRO_*` environment variables.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("KAFKA_AVRO")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("record_packages")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.registry_urls().is_empty() {
            return Err(Error::Config(format!(
                "'{}' must not be empty",
                keys::SCHEMA_REGISTRY_URL
            )));
        }
        if let Some(user_info) = &self.basic_auth_user_info {
            if !user_info.contains(':') {
                return Err(Error::Config(format!(
                    "'{}' must have the form user:password",
                    keys::BASIC_AUTH_USER_INFO
                )));
            }
        }
        Ok(())
    }

    pub fn registry_urls(&self) -> Vec<String> {
        parse_list(&self.schema_registry_url)
    }

    pub fn subject_name_strategy(&self, is_key: bool) -> SubjectNameStrategy {
        if is_key {
            self.key_subject_name_strategy
        } else {
            self.value_subject_name_strategy
        }
    }

    pub fn basic_auth(&self) -> Option<(String, String)> {
        self.basic_auth_user_info.as_ref().and_then(|info| {
            info.split_once(':')
                .map(|(user, password)| (user.to_string(), password.to_string()))
        })
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(Error::Config(format!(
            "'{}' expects true or false, got '{}'",
            key, value
        ))),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::Config(format!("'{}' expects a number, got '{}'", key, value)))
}

fn parse_strategy(key: &str, value: &str) -> Result<SubjectNameStrategy> {
    value
        .parse()
        .map_err(|_| Error::Config(format!("'{}' has unknown strategy '{}'", key, value)))
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    100
}

fn default_request_timeout_ms() -> u64 {
    30_000
}
