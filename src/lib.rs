//! # rpc_mercure
//!
//! `rpc_mercure` carries JSON-RPC traffic over a [Mercure](https://mercure.rocks) hub.
//!
//! ## Features
//!
//! - Outbound requests, responses and `event.*` notifications fired into a pluggable event dispatcher
//! - Topic subscriptions over Server-Sent Events, re-dispatched as update events
//! - HS256 hub tokens with Mercure publish/subscribe claims
//! - Publication of updates through the hub publish endpoint
//! - Async support using Tokio
//!
//! ## Main Components
//!
//! - `transport`: [`RpcSocketTransport`], JSON-RPC message types and the HTTP subscribe client
//! - `sse`: frame parser for `text/event-stream` bodies
//! - `events`: events handed to the dispatcher
//! - `dispatcher`: the [`EventDispatcher`] seam and its channel and hub implementations
//! - `publisher`: hub publish client
//! - `jwt`: token providers
//! - `config`: hub configuration

#![warn(missing_docs)]

/// Hub configuration derived from the RPC configuration
pub mod config;

/// Event dispatching and the bundled dispatchers
pub mod dispatcher;

/// Events fired by the transport
pub mod events;

/// Hub token providers
pub mod jwt;

/// Hub publish client
pub mod publisher;

/// Server-Sent Events frame parsing
pub mod sse;

/// Mercure transport and JSON-RPC message types
pub mod transport;

// Re-export main components for easier access
pub use config::{MercureConfig, RpcAsyncConfig, RpcMainConfig};
pub use dispatcher::{ChannelDispatcher, EventDispatcher, HubDispatcher};
pub use events::{MercureEvent, RpcEvent, UpdateCallback};
pub use jwt::{FactoryTokenProvider, StaticTokenProvider, TokenProvider};
pub use transport::{RpcSocketTransport, TransportError, TransportErrorCode};
