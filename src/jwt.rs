//! Hub tokens
//!
//! The Mercure hub authorizes publishers and subscribers with a JWT carrying a
//! `mercure` claim that lists the topics the bearer may publish to and
//! subscribe to.

use crate::config::MercureConfig;
use crate::transport::{Result, TransportError};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of bearer tokens for hub requests
///
/// Called once per subscription or publication. Implementations that want to
/// reuse tokens are responsible for their own caching.
pub trait TokenProvider: Send + Sync {
    /// Return a token to send as `Authorization: Bearer <token>`
    fn get_jwt(&self) -> Result<String>;
}

/// Topic permissions of a hub token
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MercureClaim {
    /// Topic selectors the bearer may publish to
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub publish: Vec<String>,
    /// Topic selectors the bearer may subscribe to
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subscribe: Vec<String>,
}

/// Claims in a hub token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Topic permissions
    pub mercure: MercureClaim,
    /// Issued at timestamp
    pub iat: u64,
    /// Expiration timestamp
    pub exp: u64,
}

/// Provider returning the same pre-issued token every time
#[derive(Clone)]
pub struct StaticTokenProvider(String);

impl StaticTokenProvider {
    /// Wrap an already issued token
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl std::fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("StaticTokenProvider").field(&"<token>").finish()
    }
}

impl TokenProvider for StaticTokenProvider {
    fn get_jwt(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Provider signing a fresh HS256 token on every call
///
/// # Examples
///
/// ```
/// use rpc_mercure::jwt::{FactoryTokenProvider, TokenProvider};
///
/// let provider = FactoryTokenProvider::new("!ChangeThisMercureHubJWTSecretKey!")
///     .subscribe(["*"])
///     .publish(["https://example.com/rpc/{topic}"]);
///
/// let token = provider.get_jwt().unwrap();
/// assert_eq!(token.split('.').count(), 3);
/// ```
#[derive(Clone)]
pub struct FactoryTokenProvider {
    secret: String,
    claim: MercureClaim,
    ttl_secs: u64,
}

impl std::fmt::Debug for FactoryTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FactoryTokenProvider")
            .field("secret", &"<secret>")
            .field("claim", &self.claim)
            .field("ttl_secs", &self.ttl_secs)
            .finish()
    }
}

impl FactoryTokenProvider {
    /// Create a provider signing with `secret`, without any topic permission yet
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            claim: MercureClaim::default(),
            ttl_secs: crate::config::DEFAULT_JWT_TTL_SECS,
        }
    }

    /// Create a provider from the hub settings, allowed to publish and subscribe to every topic
    ///
    /// Fails with a configuration error if no secret is configured.
    pub fn from_config(config: &MercureConfig) -> Result<Self> {
        let secret = config
            .jwt_secret
            .as_deref()
            .filter(|secret| !secret.is_empty())
            .ok_or_else(|| TransportError::config("jwt secret is not configured"))?;

        Ok(Self::new(secret)
            .publish(["*"])
            .subscribe(["*"])
            .ttl_secs(config.jwt_ttl_secs))
    }

    /// Add topic selectors the token may publish to
    pub fn publish<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.claim.publish.extend(topics.into_iter().map(Into::into));
        self
    }

    /// Add topic selectors the token may subscribe to
    pub fn subscribe<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.claim.subscribe.extend(topics.into_iter().map(Into::into));
        self
    }

    /// Set the token lifetime
    pub fn ttl_secs(mut self, ttl_secs: u64) -> Self {
        self.ttl_secs = ttl_secs;
        self
    }
}

impl TokenProvider for FactoryTokenProvider {
    fn get_jwt(&self) -> Result<String> {
        let iat = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| {
                TransportError::with_source(
                    crate::transport::TransportErrorCode::InternalError,
                    "system clock is before the unix epoch",
                    e,
                )
            })?
            .as_secs();

        let claims = Claims {
            mercure: self.claim.clone(),
            iat,
            exp: iat + self.ttl_secs,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RpcAsyncConfig;
    use jsonwebtoken::{decode, DecodingKey, Validation};

    const SECRET: &str = "!ChangeThisMercureHubJWTSecretKey!";

    #[test]
    fn test_static_provider() {
        let provider = StaticTokenProvider::new("abc.def.ghi");
        assert_eq!(provider.get_jwt().unwrap(), "abc.def.ghi");
        assert!(!format!("{provider:?}").contains("abc"));
    }

    #[test]
    fn test_factory_token_round_trip() {
        let provider = FactoryTokenProvider::new(SECRET)
            .subscribe(["https://example.com/rpc/orders"])
            .ttl_secs(60);

        let token = provider.get_jwt().unwrap();
        let decoded = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(SECRET.as_bytes()),
            &Validation::default(),
        )
        .unwrap();

        assert_eq!(decoded.claims.mercure.subscribe, vec!["https://example.com/rpc/orders"]);
        assert!(decoded.claims.mercure.publish.is_empty());
        assert_eq!(decoded.claims.exp - decoded.claims.iat, 60);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = FactoryTokenProvider::new(SECRET).publish(["*"]).get_jwt().unwrap();
        let result = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"another secret"),
            &Validation::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_from_config_requires_secret() {
        let mut raw = RpcAsyncConfig {
            mercure_dsn: Some("http://localhost/.well-known/mercure".to_string()),
            jwt_ttl_secs: 10,
            response_topic: "rpc".to_string(),
            ..Default::default()
        };
        let config = MercureConfig::from_async_config(Some(&raw)).unwrap();
        assert!(FactoryTokenProvider::from_config(&config).is_err());

        raw.jwt_secret = Some(SECRET.to_string());
        let config = MercureConfig::from_async_config(Some(&raw)).unwrap();
        let provider = FactoryTokenProvider::from_config(&config).unwrap();
        assert_eq!(provider.claim.publish, vec!["*"]);
        assert_eq!(provider.claim.subscribe, vec!["*"]);
        assert_eq!(provider.ttl_secs, 10);
    }
}
