//! Event dispatching
//!
//! [`EventDispatcher`] is the seam between the transport and the rest of the
//! application. Two implementations ship with the crate:
//!
//! * [`ChannelDispatcher`] pushes every event into a tokio channel, leaving all
//!   handling to the receiving task.
//! * [`HubDispatcher`] publishes outbound requests and responses to the hub and
//!   hands inbound updates to the callback they carry.

use crate::config::MercureConfig;
use crate::events::RpcEvent;
use crate::publisher::{HubPublisher, Update};
use crate::transport::{Result, TransportError, TransportErrorCode};
use async_trait::async_trait;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

#[async_trait]
/// Receiver of every event fired by the transport
///
/// Errors returned here reach the caller of the transport operation unchanged.
pub trait EventDispatcher: Send + Sync {
    /// Deliver one event
    async fn fire(&self, event: RpcEvent) -> Result<()>;
}

/// Dispatcher forwarding events into a bounded channel
#[derive(Debug, Clone)]
pub struct ChannelDispatcher {
    tx: Sender<RpcEvent>,
}

impl ChannelDispatcher {
    /// Create a dispatcher and the receiving end of its channel
    pub fn new(capacity: usize) -> (Self, Receiver<RpcEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Create a dispatcher whose events are consumed as a stream
    pub fn new_with_stream(capacity: usize) -> (Self, ReceiverStream<RpcEvent>) {
        let (dispatcher, rx) = Self::new(capacity);
        (dispatcher, ReceiverStream::new(rx))
    }
}

#[async_trait]
impl EventDispatcher for ChannelDispatcher {
    async fn fire(&self, event: RpcEvent) -> Result<()> {
        debug!("Dispatching {}", event.name());
        self.tx.send(event).await?;
        Ok(())
    }
}

/// Dispatcher talking to the hub
#[derive(Debug, Clone)]
pub struct HubDispatcher {
    publisher: HubPublisher,
    outbound_topic: String,
}

impl HubDispatcher {
    /// Publish outbound messages to the configured response topic
    pub fn new(config: &MercureConfig, publisher: HubPublisher) -> Self {
        Self {
            publisher,
            outbound_topic: config.topic_url(&config.response_topic),
        }
    }

    /// Topic IRI outbound messages are published to
    pub fn outbound_topic(&self) -> &str {
        &self.outbound_topic
    }

    /// Hub update carrying an outbound event, or `None` for inbound updates
    pub fn outbound_update(&self, event: &RpcEvent) -> Result<Option<Update>> {
        let update = match event {
            RpcEvent::Request(request) => {
                let body = serde_json::to_string(&request.to_request())?;
                let update = Update::new(self.outbound_topic.clone(), body);
                match &request.id {
                    Some(id) => update.with_id(id.to_string()),
                    None => update,
                }
            }
            RpcEvent::Response(response) => {
                let body = serde_json::to_string(&response.response)?;
                Update::new(self.outbound_topic.clone(), body)
            }
            RpcEvent::Update(_) => return Ok(None),
        };
        Ok(Some(update))
    }
}

#[async_trait]
impl EventDispatcher for HubDispatcher {
    async fn fire(&self, event: RpcEvent) -> Result<()> {
        if let RpcEvent::Update(update) = &event {
            debug!(topic = %update.topic, "Handing update to callback");
            return update.dispatch_to_callback().map_err(|e| {
                TransportError::with_source(
                    TransportErrorCode::DispatchFailed,
                    format!("callback failed for topic {}", update.topic),
                    e,
                )
            });
        }

        if let Some(update) = self.outbound_update(&event)? {
            let id = self.publisher.publish(&update).await?;
            debug!("Published {} as update {}", event.name(), id);
        }
        Ok(())
    }
}
