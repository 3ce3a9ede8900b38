//! Events handed to the [`EventDispatcher`](crate::dispatcher::EventDispatcher)
//!
//! The transport never talks to the hub directly when publishing; it fires one
//! of these events and lets the dispatcher decide what to do with it.

use crate::transport::{JsonRpcRequest, JsonRpcResponse, Params, RequestId};
use std::fmt;
use std::sync::Arc;

type CallbackFn = dyn Fn(&str) -> anyhow::Result<()> + Send + Sync;

/// Caller-supplied handler for the data of inbound updates
///
/// The transport only carries the callback inside [`MercureEvent`]s; invoking
/// it is up to whoever consumes the event.
#[derive(Clone)]
pub struct UpdateCallback(Arc<CallbackFn>);

impl UpdateCallback {
    /// Wrap a closure receiving the joined data of an update
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&str) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Invoke the callback
    pub fn call(&self, data: &str) -> anyhow::Result<()> {
        (self.0)(data)
    }

    /// Whether two handles point to the same closure
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for UpdateCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("UpdateCallback(<fn>)")
    }
}

/// Outbound RPC request to be sent over the socket
#[derive(Debug, Clone, PartialEq)]
pub struct RpcSocketRequestEvent {
    /// Method name
    pub method: String,
    /// Method parameters
    pub params: Params,
    /// Request id; `None` for fire-and-forget events
    pub id: Option<RequestId>,
}

impl RpcSocketRequestEvent {
    /// Event name used for routing and logging
    pub const NAME: &'static str = "rpc.socket.request";

    /// The JSON-RPC request this event stands for
    pub fn to_request(&self) -> JsonRpcRequest {
        JsonRpcRequest {
            id: self.id.clone(),
            method: self.method.clone(),
            params: self.params.clone(),
            ..Default::default()
        }
    }
}

/// Outbound RPC response to be sent over the socket
#[derive(Debug, Clone, PartialEq)]
pub struct RpcSocketResponseEvent {
    /// The already built response
    pub response: JsonRpcResponse,
}

impl RpcSocketResponseEvent {
    /// Event name used for routing and logging
    pub const NAME: &'static str = "rpc.socket.response";
}

/// Update received from the hub on a subscribed topic
#[derive(Debug, Clone)]
pub struct MercureEvent {
    /// Topic name the update was received on
    pub topic: String,
    /// Data lines of the update, joined
    pub data: String,
    /// Handler supplied to [`RpcSocketTransport::fetch`](crate::transport::RpcSocketTransport::fetch)
    pub callback: UpdateCallback,
}

impl MercureEvent {
    /// Event name used for routing and logging
    pub const NAME: &'static str = "rpc.mercure.update";

    /// Hand the update data to the callback carried by this event
    pub fn dispatch_to_callback(&self) -> anyhow::Result<()> {
        self.callback.call(&self.data)
    }
}

/// Every event the transport fires
#[derive(Debug, Clone)]
pub enum RpcEvent {
    /// Outbound request
    Request(RpcSocketRequestEvent),
    /// Outbound response
    Response(RpcSocketResponseEvent),
    /// Inbound hub update
    Update(MercureEvent),
}

impl RpcEvent {
    /// Name of the wrapped event
    pub fn name(&self) -> &'static str {
        match self {
            Self::Request(_) => RpcSocketRequestEvent::NAME,
            Self::Response(_) => RpcSocketResponseEvent::NAME,
            Self::Update(_) => MercureEvent::NAME,
        }
    }
}

impl From<RpcSocketRequestEvent> for RpcEvent {
    fn from(event: RpcSocketRequestEvent) -> Self {
        Self::Request(event)
    }
}

impl From<RpcSocketResponseEvent> for RpcEvent {
    fn from(event: RpcSocketResponseEvent) -> Self {
        Self::Response(event)
    }
}

impl From<MercureEvent> for RpcEvent {
    fn from(event: MercureEvent) -> Self {
        Self::Update(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_callback_receives_data() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let callback = UpdateCallback::new(move |data| {
            sink.lock().unwrap().push(data.to_string());
            Ok(())
        });

        let event = MercureEvent {
            topic: "orders".to_string(),
            data: "{\"id\":1}".to_string(),
            callback: callback.clone(),
        };
        event.dispatch_to_callback().unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["{\"id\":1}".to_string()]);
        assert!(event.callback.ptr_eq(&callback));
    }

    #[test]
    fn test_event_names() {
        let request = RpcEvent::from(RpcSocketRequestEvent {
            method: "ping".to_string(),
            params: Params::new(),
            id: None,
        });
        assert_eq!(request.name(), "rpc.socket.request");

        let response = RpcEvent::from(RpcSocketResponseEvent {
            response: JsonRpcResponse::default(),
        });
        assert_eq!(response.name(), "rpc.socket.response");
    }

    #[test]
    fn test_request_event_to_request() {
        let mut params = Params::new();
        params.insert("a".to_string(), serde_json::json!(1));
        let event = RpcSocketRequestEvent {
            method: "sum".to_string(),
            params,
            id: Some("r-1".into()),
        };

        let value = serde_json::to_value(event.to_request()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"id": "r-1", "method": "sum", "params": {"a": 1}, "jsonrpc": "2.0"})
        );
    }
}
