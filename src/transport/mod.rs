//! # Mercure transport for JSON-RPC
//!
//! The transport module connects the RPC event system to a Mercure hub.
//!
//! ## Overview
//!
//! Two directions are covered:
//!
//! * **Outbound**: [`RpcSocketTransport::request`], [`RpcSocketTransport::fire_event`]
//!   and [`RpcSocketTransport::response`] turn an intent into an [`RpcEvent`](crate::events::RpcEvent)
//!   and hand it to the configured [`EventDispatcher`](crate::dispatcher::EventDispatcher).
//! * **Inbound**: [`RpcSocketTransport::fetch`] opens an authenticated Server-Sent Events
//!   stream on a topic, splits it into frames and dispatches one update event per frame.
//!
//! The HTTP side of a subscription lives behind the [`SubscribeClient`] trait; the crate
//! ships a reqwest implementation in [`ReqwestSubscriber`].
//!
//! ## Message Types
//!
//! Requests and responses use JSON-RPC 2.0:
//!
//! * **Requests**: a method name, optional parameters and an optional id.
//! * **Responses**: a result or an error, matched to the request by id.
//!
//! ## Error Handling
//!
//! All operations report failures through [`TransportError`], which carries a
//! [`TransportErrorCode`] for errors raised by this crate.

use serde::{Deserialize, Serialize};
use std::fmt;

mod error;
pub use error::{TransportError, TransportErrorCode};

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;

mod http_transport;
pub use http_transport::*;
mod socket_transport;
pub use socket_transport::*;

/// Ordered JSON object used for request parameters
pub type Params = serde_json::Map<String, serde_json::Value>;

/// Request ID used in JSON-RPC messages
///
/// JSON-RPC allows both numbers and strings as identifiers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric identifier
    Number(u64),
    /// String identifier
    String(String),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

impl From<u64> for RequestId {
    fn from(id: u64) -> Self {
        Self::Number(id)
    }
}

impl From<String> for RequestId {
    fn from(id: String) -> Self {
        Self::String(id)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self::String(id.to_owned())
    }
}

/// JSON RPC version type
///
/// Represents the version of the JSON-RPC protocol being used.
/// The default version is "2.0".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct JsonRpcVersion(String);

impl Default for JsonRpcVersion {
    fn default() -> Self {
        JsonRpcVersion("2.0".to_owned())
    }
}

impl JsonRpcVersion {
    /// Returns the string representation of the JSON-RPC version
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
/// A JSON-RPC request message
///
/// A request without an id is a notification and expects no response.
pub struct JsonRpcRequest {
    /// The request ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,

    /// The method name to invoke
    pub method: String,

    /// Parameters for the method
    #[serde(default, skip_serializing_if = "Params::is_empty")]
    pub params: Params,

    /// The JSON-RPC version
    pub jsonrpc: JsonRpcVersion,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
/// A JSON-RPC response message
///
/// Contains either a result or an error in response to a request.
pub struct JsonRpcResponse {
    /// The request ID this response corresponds to
    pub id: Option<RequestId>,

    /// The result of the request, if successful
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,

    /// The error, if the request failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,

    /// The JSON-RPC version
    pub jsonrpc: JsonRpcVersion,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
/// A JSON-RPC error object
pub struct JsonRpcError {
    /// Error code
    ///
    /// Standard JSON-RPC error codes are in the range -32768 to -32000.
    pub code: i32,

    /// A short description of the error
    pub message: String,

    /// Optional additional error data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}
