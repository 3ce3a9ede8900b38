//! HTTP side of a hub subscription
//!
//! A subscription is a long-lived `GET` whose body is a `text/event-stream`.
//! [`SubscribeClient`] opens it and exposes the body as a lazy stream of
//! [`Chunk`]s; parsing happens further up, in
//! [`RpcSocketTransport::fetch`](super::RpcSocketTransport::fetch).
//!
//! # Examples
//!
//! ```no_run
//! use rpc_mercure::transport::{Chunk, ReqwestSubscriber, SubscribeClient};
//! use futures::StreamExt;
//! use std::time::Duration;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ReqwestSubscriber::new().with_idle_timeout(Duration::from_secs(30));
//!     let mut chunks = client
//!         .subscribe("https://hub.example.com/.well-known/mercure?topic=urn%3Aorders", "token")
//!         .await?;
//!
//!     while let Some(chunk) = chunks.next().await {
//!         if let Chunk::Data(bytes) = chunk? {
//!             println!("{} bytes", bytes.len());
//!         }
//!     }
//!     Ok(())
//! }
//! ```

use super::{Result, TransportError, TransportErrorCode};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::header::ACCEPT;
use std::pin::Pin;
use std::time::Duration;
use tracing::debug;

/// One piece of a subscription body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    /// Bytes received from the hub
    Data(Bytes),
    /// Nothing arrived within the idle window; the connection is still open
    Heartbeat,
}

/// Stream of chunks of one subscription
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<Chunk>> + Send>>;

#[async_trait]
/// Opens authenticated event streams
pub trait SubscribeClient: Send + Sync {
    /// Send `GET url` with `Authorization: Bearer <token>` and return the body as chunks
    ///
    /// # Errors
    ///
    /// - `TransportErrorCode::ConnectionFailed` if the hub cannot be reached
    /// - `TransportErrorCode::SseConnectionFailed` if the hub answers with a non-success status
    /// - `TransportErrorCode::AuthenticationFailed` if the hub rejects the token
    async fn subscribe(&self, url: &str, token: &str) -> Result<ChunkStream>;
}

/// [`SubscribeClient`] backed by reqwest
#[derive(Debug, Clone, Default)]
pub struct ReqwestSubscriber {
    client: reqwest::Client,
    idle_timeout: Option<Duration>,
}

impl ReqwestSubscriber {
    /// Create a subscriber with a default reqwest client and no idle timeout
    pub fn new() -> Self {
        Self::default()
    }

    /// Reuse an existing reqwest client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            idle_timeout: None,
        }
    }

    /// Yield a [`Chunk::Heartbeat`] whenever the hub stays silent for `timeout`
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl SubscribeClient for ReqwestSubscriber {
    async fn subscribe(&self, url: &str, token: &str) -> Result<ChunkStream> {
        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| {
                TransportError::with_source(
                    TransportErrorCode::ConnectionFailed,
                    format!("failed to connect to {url}"),
                    e,
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            let code = match status.as_u16() {
                401 | 403 => TransportErrorCode::AuthenticationFailed,
                _ => TransportErrorCode::SseConnectionFailed,
            };
            return Err(TransportError::new(code, format!("hub answered HTTP {status}")));
        }

        let idle_timeout = self.idle_timeout;
        let mut body = Box::pin(response.bytes_stream());

        let stream = async_stream::stream! {
            loop {
                let next = match idle_timeout {
                    Some(window) => match tokio::time::timeout(window, body.next()).await {
                        Ok(next) => next,
                        Err(_) => {
                            yield Ok(Chunk::Heartbeat);
                            continue;
                        }
                    },
                    None => body.next().await,
                };

                match next {
                    Some(Ok(bytes)) => yield Ok(Chunk::Data(bytes)),
                    Some(Err(e)) => {
                        yield Err(TransportError::with_source(
                            TransportErrorCode::SseStreamError,
                            "event stream terminated abnormally",
                            e,
                        ));
                        break;
                    }
                    None => {
                        debug!("Event stream closed by hub");
                        break;
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    const SSE_HEAD: &str =
        "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nConnection: close\r\n\r\n";

    /// Accept one connection, answer with `parts` (pausing `pause` between them)
    /// and return the raw request head.
    async fn serve_once(parts: Vec<String>, pause: Duration) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                head.extend_from_slice(&buf[..n]);
            }

            for (i, part) in parts.iter().enumerate() {
                if i > 0 {
                    tokio::time::sleep(pause).await;
                }
                socket.write_all(part.as_bytes()).await.unwrap();
                socket.flush().await.unwrap();
            }
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&head).into_owned()
        });

        (format!("http://{addr}/.well-known/mercure?topic=urn%3Ax"), handle)
    }

    async fn collect(mut chunks: ChunkStream) -> (Vec<u8>, usize) {
        let mut data = Vec::new();
        let mut heartbeats = 0;
        while let Some(chunk) = chunks.next().await {
            match chunk.unwrap() {
                Chunk::Data(bytes) => data.extend_from_slice(&bytes),
                Chunk::Heartbeat => heartbeats += 1,
            }
        }
        (data, heartbeats)
    }

    #[tokio::test]
    async fn test_subscribe_streams_body_with_bearer_token() {
        let body = "id: 1\ndata: hello\n\n";
        let (url, server) = serve_once(
            vec![SSE_HEAD.to_string(), body.to_string()],
            Duration::from_millis(10),
        )
        .await;

        let chunks = ReqwestSubscriber::new().subscribe(&url, "tok3n").await.unwrap();
        let (data, heartbeats) = collect(chunks).await;

        assert_eq!(data, body.as_bytes());
        assert_eq!(heartbeats, 0);

        let head = server.await.unwrap().to_ascii_lowercase();
        assert!(head.starts_with("get /.well-known/mercure?topic=urn%3ax "));
        assert!(head.contains("authorization: bearer tok3n"));
        assert!(head.contains("accept: text/event-stream"));
    }

    #[tokio::test]
    async fn test_idle_timeout_yields_heartbeat() {
        let (url, _server) = serve_once(
            vec![
                SSE_HEAD.to_string(),
                "id: 1\nda".to_string(),
                "ta: late\n\n".to_string(),
            ],
            Duration::from_millis(300),
        )
        .await;

        let chunks = ReqwestSubscriber::new()
            .with_idle_timeout(Duration::from_millis(50))
            .subscribe(&url, "t")
            .await
            .unwrap();
        let (data, heartbeats) = collect(chunks).await;

        assert_eq!(data, b"id: 1\ndata: late\n\n");
        assert!(heartbeats >= 1);
    }

    #[tokio::test]
    async fn test_unauthorized_status() {
        let (url, _server) = serve_once(
            vec!["HTTP/1.1 401 Unauthorized\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_string()],
            Duration::ZERO,
        )
        .await;

        let err = match ReqwestSubscriber::new().subscribe(&url, "bad").await {
            Err(err) => err,
            Ok(_) => panic!("expected an authentication error"),
        };
        assert_eq!(err.code(), Some(TransportErrorCode::AuthenticationFailed));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = match ReqwestSubscriber::new()
            .subscribe(&format!("http://{addr}/hub"), "t")
            .await
        {
            Err(err) => err,
            Ok(_) => panic!("expected a connection error"),
        };
        assert_eq!(err.code(), Some(TransportErrorCode::ConnectionFailed));
    }
}
