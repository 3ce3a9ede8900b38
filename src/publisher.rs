//! Publishing updates to the hub
//!
//! A Mercure publication is a form-encoded `POST` to the hub URL with one or
//! more `topic` fields, a `data` field and optionally `id` and `private`. The
//! hub answers with the id it assigned to the update.

use crate::config::MercureConfig;
use crate::jwt::TokenProvider;
use crate::transport::{Result, TransportError, TransportErrorCode};
use std::sync::Arc;
use tracing::debug;

/// An update to publish
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Update {
    /// Topic IRIs the update is published to
    pub topics: Vec<String>,
    /// Update body
    pub data: String,
    /// Update id; the hub generates one when absent
    pub id: Option<String>,
    /// Only deliver to subscribers authorized for the topics
    pub private: bool,
}

impl Update {
    /// Public update on a single topic
    pub fn new(topic: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            topics: vec![topic.into()],
            data: data.into(),
            ..Default::default()
        }
    }

    /// Set the update id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Mark the update as private
    pub fn private(mut self) -> Self {
        self.private = true;
        self
    }

    /// Form fields of the publish request, in order
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields: Vec<(&'static str, String)> = self
            .topics
            .iter()
            .map(|topic| ("topic", topic.clone()))
            .collect();
        fields.push(("data", self.data.clone()));
        if let Some(id) = &self.id {
            fields.push(("id", id.clone()));
        }
        if self.private {
            fields.push(("private", "on".to_string()));
        }
        fields
    }
}

/// Client for the hub publish endpoint
#[derive(Clone)]
pub struct HubPublisher {
    hub_url: String,
    token_provider: Arc<dyn TokenProvider>,
    client: reqwest::Client,
}

impl std::fmt::Debug for HubPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubPublisher")
            .field("hub_url", &self.hub_url)
            .field("token_provider", &"<TokenProvider>")
            .finish()
    }
}

impl HubPublisher {
    /// Create a publisher for the hub at `config.dsn`
    pub fn new(config: &MercureConfig, token_provider: Arc<dyn TokenProvider>) -> Self {
        Self::with_client(config, token_provider, reqwest::Client::new())
    }

    /// Create a publisher reusing an existing HTTP client
    pub fn with_client(
        config: &MercureConfig,
        token_provider: Arc<dyn TokenProvider>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            hub_url: config.dsn.clone(),
            token_provider,
            client,
        }
    }

    /// Publish an update and return the id the hub assigned to it
    pub async fn publish(&self, update: &Update) -> Result<String> {
        if update.topics.is_empty() {
            return Err(TransportError::new(
                TransportErrorCode::InvalidMessage,
                "update has no topic",
            ));
        }

        let token = self.token_provider.get_jwt()?;
        debug!(topics = ?update.topics, "Publishing update to {}", self.hub_url);

        let response = self
            .client
            .post(&self.hub_url)
            .bearer_auth(token)
            .form(&update.form_fields())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let code = match status.as_u16() {
                401 | 403 => TransportErrorCode::AuthenticationFailed,
                _ => TransportErrorCode::PublishFailed,
            };
            return Err(TransportError::new(code, format!("hub answered HTTP {status}")));
        }

        Ok(response.text().await?.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RpcAsyncConfig;
    use crate::jwt::StaticTokenProvider;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn hub_answering(response: &'static str) -> (MercureConfig, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            loop {
                if let Some(end) = request.windows(4).position(|w| w == b"\r\n\r\n") {
                    let head = String::from_utf8_lossy(&request[..end]).to_ascii_lowercase();
                    let body_len = head
                        .lines()
                        .find_map(|line| line.strip_prefix("content-length:"))
                        .and_then(|len| len.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if request.len() >= end + 4 + body_len {
                        break;
                    }
                }
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&request).into_owned()
        });

        let config = MercureConfig::from_async_config(Some(&RpcAsyncConfig {
            mercure_dsn: Some(format!("http://{addr}/.well-known/mercure")),
            jwt_ttl_secs: 60,
            response_topic: "rpc".to_string(),
            ..Default::default()
        }))
        .unwrap();
        (config, handle)
    }

    #[tokio::test]
    async fn test_publish_returns_update_id() {
        let (config, hub) = hub_answering(
            "HTTP/1.1 200 OK\r\nContent-Length: 15\r\nConnection: close\r\n\r\nurn:uuid:1234\r\n",
        )
        .await;
        let publisher = HubPublisher::new(&config, Arc::new(StaticTokenProvider::new("pub-token")));

        let id = publisher
            .publish(&Update::new("urn:rpc:orders", "{}"))
            .await
            .unwrap();
        assert_eq!(id, "urn:uuid:1234");

        let request = hub.await.unwrap().to_ascii_lowercase();
        assert!(request.starts_with("post /.well-known/mercure "));
        assert!(request.contains("authorization: bearer pub-token"));
        assert!(request.contains("content-type: application/x-www-form-urlencoded"));
        assert!(request.ends_with("topic=urn%3arpc%3aorders&data=%7b%7d"));
    }

    #[tokio::test]
    async fn test_publish_rejected() {
        let (config, _hub) = hub_answering(
            "HTTP/1.1 403 Forbidden\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;
        let publisher = HubPublisher::new(&config, Arc::new(StaticTokenProvider::new("t")));

        let err = publisher
            .publish(&Update::new("urn:rpc:orders", "{}"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(TransportErrorCode::AuthenticationFailed));
    }

    #[tokio::test]
    async fn test_publish_without_topic() {
        let config = MercureConfig::from_async_config(Some(&RpcAsyncConfig {
            mercure_dsn: Some("http://127.0.0.1:9/hub".to_string()),
            jwt_ttl_secs: 60,
            response_topic: "rpc".to_string(),
            ..Default::default()
        }))
        .unwrap();
        let publisher = HubPublisher::new(&config, Arc::new(StaticTokenProvider::new("t")));

        let err = publisher.publish(&Update::default()).await.unwrap_err();
        assert_eq!(err.code(), Some(TransportErrorCode::InvalidMessage));
    }

    #[test]
    fn test_form_fields() {
        let update = Update {
            topics: vec!["urn:a".to_string(), "urn:b".to_string()],
            data: "{}".to_string(),
            ..Default::default()
        }
        .with_id("u-1")
        .private();

        assert_eq!(
            update.form_fields(),
            vec![
                ("topic", "urn:a".to_string()),
                ("topic", "urn:b".to_string()),
                ("data", "{}".to_string()),
                ("id", "u-1".to_string()),
                ("private", "on".to_string()),
            ]
        );
    }

    #[test]
    fn test_public_update_fields() {
        let update = Update::new("urn:rpc:orders", "hello");
        assert_eq!(
            update.form_fields(),
            vec![("topic", "urn:rpc:orders".to_string()), ("data", "hello".to_string())]
        );
    }
}
