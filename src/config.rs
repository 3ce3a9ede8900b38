//! Hub configuration
//!
//! The application hands over an [`RpcMainConfig`] (usually deserialized from its
//! own configuration files). [`MercureConfig::from_async_config`] validates the
//! asynchronous transport section once and produces the immutable hub settings
//! used by every subscription and publication.

use crate::transport::{Result, TransportError};
use serde::{Deserialize, Serialize};
use url::form_urlencoded;
use url::Url;

/// Default lifetime of tokens issued by [`FactoryTokenProvider`](crate::jwt::FactoryTokenProvider)
pub const DEFAULT_JWT_TTL_SECS: u64 = 3600;

/// Top-level RPC configuration, as far as this crate is concerned
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RpcMainConfig {
    /// Asynchronous transport section; absent when async RPC is disabled
    #[serde(default)]
    pub async_config: Option<RpcAsyncConfig>,
}

/// Asynchronous transport section of the RPC configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RpcAsyncConfig {
    /// Hub URL, e.g. `https://hub.example.com/.well-known/mercure`
    #[serde(default)]
    pub mercure_dsn: Option<String>,

    /// Prefix that turns a topic name into a topic IRI
    ///
    /// Defaults to `<hub origin>/rpc/`.
    #[serde(default)]
    pub topic_base: Option<String>,

    /// HMAC secret used to sign hub tokens
    #[serde(default)]
    pub jwt_secret: Option<String>,

    /// Lifetime of signed hub tokens, in seconds
    #[serde(default = "default_jwt_ttl")]
    pub jwt_ttl_secs: u64,

    /// Topic name outbound requests and responses are published to
    #[serde(default = "default_response_topic")]
    pub response_topic: String,
}

fn default_jwt_ttl() -> u64 {
    DEFAULT_JWT_TTL_SECS
}

fn default_response_topic() -> String {
    "rpc".to_string()
}

/// Validated hub settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MercureConfig {
    /// Hub URL, exactly as configured
    pub dsn: String,
    topic_base: String,
    /// Topic name used for outbound publications
    pub response_topic: String,
    /// Secret for token signing, if configured
    pub jwt_secret: Option<String>,
    /// Lifetime of signed tokens, in seconds
    pub jwt_ttl_secs: u64,
}

impl MercureConfig {
    /// Build the hub settings from the async section of the main configuration
    ///
    /// # Errors
    ///
    /// Returns a [`TransportErrorCode::ConfigError`](crate::transport::TransportErrorCode::ConfigError)
    /// when the section or its DSN is missing, or when the DSN is not an
    /// `http`/`https` URL.
    pub fn from_async_config(config: Option<&RpcAsyncConfig>) -> Result<Self> {
        let config = config.ok_or_else(|| TransportError::config("async config is not set"))?;

        let dsn = config
            .mercure_dsn
            .as_deref()
            .map(str::trim)
            .filter(|dsn| !dsn.is_empty())
            .ok_or_else(|| TransportError::config("mercure dsn is not configured"))?;

        let url = Url::parse(dsn).map_err(|e| {
            TransportError::with_source(
                crate::transport::TransportErrorCode::ConfigError,
                format!("invalid mercure dsn: {dsn}"),
                e,
            )
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(TransportError::config(format!(
                "unsupported mercure dsn scheme: {}",
                url.scheme()
            )));
        }

        let topic_base = match config.topic_base.as_deref() {
            Some(base) if !base.trim().is_empty() => base.trim().to_string(),
            _ => format!("{}/rpc/", url.origin().ascii_serialization()),
        };

        let response_topic = config.response_topic.trim();
        if response_topic.is_empty() {
            return Err(TransportError::config("response topic must not be empty"));
        }

        Ok(Self {
            dsn: dsn.to_string(),
            topic_base,
            response_topic: response_topic.to_string(),
            jwt_secret: config.jwt_secret.clone(),
            jwt_ttl_secs: config.jwt_ttl_secs,
        })
    }

    /// Build the hub settings from the main configuration
    pub fn from_main_config(config: &RpcMainConfig) -> Result<Self> {
        Self::from_async_config(config.async_config.as_ref())
    }

    /// Topic IRI for a topic name
    pub fn topic_url(&self, topic_name: &str) -> String {
        format!("{}{}", self.topic_base, topic_name)
    }

    /// Subscribe path for a topic name, to be appended to [`MercureConfig::dsn`]
    pub fn get_topic(&self, topic_name: &str) -> String {
        let separator = if self.dsn.contains('?') { '&' } else { '?' };
        let query: String = form_urlencoded::Serializer::new(String::new())
            .append_pair("topic", &self.topic_url(topic_name))
            .finish();
        format!("{separator}{query}")
    }

    /// Full subscribe URL for a topic name
    pub fn subscribe_url(&self, topic_name: &str) -> String {
        format!("{}{}", self.dsn, self.get_topic(topic_name))
    }
}
