//! RPC transport over a Mercure hub
//!
//! # Examples
//!
//! ```no_run
//! use rpc_mercure::config::{RpcAsyncConfig, RpcMainConfig};
//! use rpc_mercure::dispatcher::ChannelDispatcher;
//! use rpc_mercure::events::UpdateCallback;
//! use rpc_mercure::transport::{Params, RpcSocketTransport};
//! use std::sync::Arc;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let config: RpcMainConfig = serde_json::from_str(r#"{
//!         "async_config": {
//!             "mercure_dsn": "https://hub.example.com/.well-known/mercure",
//!             "jwt_secret": "!ChangeThisMercureHubJWTSecretKey!"
//!         }
//!     }"#)?;
//!
//!     let (dispatcher, mut events) = ChannelDispatcher::new(100);
//!     let transport = RpcSocketTransport::with_defaults(&config, Arc::new(dispatcher))?;
//!
//!     transport.fire_event("user.created", Params::new()).await?;
//!
//!     let callback = UpdateCallback::new(|data| {
//!         println!("update: {data}");
//!         Ok(())
//!     });
//!     tokio::spawn(async move { transport.fetch("orders", callback).await });
//!
//!     while let Some(event) = events.recv().await {
//!         println!("{}", event.name());
//!     }
//!     Ok(())
//! }
//! ```

use super::{
    Chunk, JsonRpcResponse, Params, ReqwestSubscriber, RequestId, Result, SubscribeClient,
};
use crate::config::{MercureConfig, RpcMainConfig};
use crate::dispatcher::EventDispatcher;
use crate::events::{MercureEvent, RpcSocketRequestEvent, RpcSocketResponseEvent, UpdateCallback};
use crate::jwt::{FactoryTokenProvider, TokenProvider};
use crate::sse::FrameParser;
use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, info};

/// Prefix prepended to event names by [`RpcSocketTransport::fire_event`]
pub const EVENT_METHOD_PREFIX: &str = "event.";

/// Transport publishing RPC traffic as events and subscribing to hub topics
///
/// Outbound operations only fire events; what happens to them is decided by
/// the [`EventDispatcher`]. [`RpcSocketTransport::fetch`] is the only operation
/// that talks to the hub itself.
#[derive(Clone)]
pub struct RpcSocketTransport {
    mercure_config: MercureConfig,
    token_provider: Arc<dyn TokenProvider>,
    http: Arc<dyn SubscribeClient>,
    dispatcher: Arc<dyn EventDispatcher>,
}

impl std::fmt::Debug for RpcSocketTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcSocketTransport")
            .field("mercure_config", &self.mercure_config)
            .field("token_provider", &"<TokenProvider>")
            .field("http", &"<SubscribeClient>")
            .field("dispatcher", &"<EventDispatcher>")
            .finish()
    }
}

impl RpcSocketTransport {
    /// Create a transport from the main configuration and its collaborators
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the hub settings cannot be derived from
    /// `main_config.async_config`.
    pub fn new(
        main_config: &RpcMainConfig,
        token_provider: Arc<dyn TokenProvider>,
        http: Arc<dyn SubscribeClient>,
        dispatcher: Arc<dyn EventDispatcher>,
    ) -> Result<Self> {
        let mercure_config = MercureConfig::from_main_config(main_config)?;
        Ok(Self {
            mercure_config,
            token_provider,
            http,
            dispatcher,
        })
    }

    /// Create a transport signing its own tokens and subscribing through reqwest
    ///
    /// Requires `jwt_secret` in the async configuration.
    pub fn with_defaults(
        main_config: &RpcMainConfig,
        dispatcher: Arc<dyn EventDispatcher>,
    ) -> Result<Self> {
        let mercure_config = MercureConfig::from_main_config(main_config)?;
        let token_provider = FactoryTokenProvider::from_config(&mercure_config)?;
        Ok(Self {
            mercure_config,
            token_provider: Arc::new(token_provider),
            http: Arc::new(ReqwestSubscriber::new()),
            dispatcher,
        })
    }

    /// Hub settings this transport was built with
    pub fn mercure_config(&self) -> &MercureConfig {
        &self.mercure_config
    }

    /// Fire an outbound request event
    ///
    /// Dispatcher errors are returned unchanged.
    pub async fn request(
        &self,
        method: impl Into<String>,
        params: Params,
        id: Option<RequestId>,
    ) -> Result<()> {
        let event = RpcSocketRequestEvent {
            method: method.into(),
            params,
            id,
        };
        debug!(method = %event.method, "Firing socket request");
        self.dispatcher.fire(event.into()).await
    }

    /// Fire an outbound request for `event.<event_name>` without an id
    pub async fn fire_event(&self, event_name: &str, event_data: Params) -> Result<()> {
        self.request(format!("{EVENT_METHOD_PREFIX}{event_name}"), event_data, None)
            .await
    }

    /// Fire an outbound response event for an already built response
    pub async fn response(&self, response: JsonRpcResponse) -> Result<()> {
        self.dispatcher
            .fire(RpcSocketResponseEvent { response }.into())
            .await
    }

    /// Subscribe to `topic_name` and dispatch every update until the stream ends
    ///
    /// Each complete frame with a non-empty id and at least one data line becomes
    /// one [`MercureEvent`] carrying `callback`; other frames are dropped. The
    /// call returns `Ok(())` once the hub closes the stream and the first error
    /// of the connection, the stream or the dispatcher otherwise. There is no
    /// reconnection.
    pub async fn fetch(&self, topic_name: &str, callback: UpdateCallback) -> Result<()> {
        let url = self.mercure_config.subscribe_url(topic_name);
        let token = self.token_provider.get_jwt()?;

        info!(topic = topic_name, "Subscribing to {}", url);
        let mut chunks = self.http.subscribe(&url, &token).await?;
        let mut parser = FrameParser::new();

        while let Some(chunk) = chunks.next().await {
            let bytes = match chunk? {
                Chunk::Heartbeat => continue,
                Chunk::Data(bytes) => bytes,
            };

            for frame in parser.feed(&bytes) {
                let Some((id, data)) = frame.into_update() else {
                    debug!(topic = topic_name, "Dropping SSE frame without id or data");
                    continue;
                };

                debug!(topic = topic_name, id = %id, "Received update");
                let event = MercureEvent {
                    topic: topic_name.to_string(),
                    data,
                    callback: callback.clone(),
                };
                self.dispatcher.fire(event.into()).await?;
            }
        }

        info!(topic = topic_name, "Subscription stream ended");
        Ok(())
    }
}
