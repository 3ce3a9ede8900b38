//! # Server-Sent Events (SSE) Module
//!
//! Mercure hubs deliver updates as a `text/event-stream` body. Each update is a
//! frame of labelled lines terminated by a blank line:
//!
//! ```text
//! id: urn:uuid:5e94c686-2c0b-4f9b-958c-92ccc3bbb4eb
//! data: {"method":"user.created","params":{"id":12}}
//!
//! ```
//!
//! This module turns that byte stream into [`SseFrame`]s. It knows nothing
//! about HTTP or dispatching; see [`crate::transport`] for the subscription loop.

/// Streaming frame parser
pub mod parser;

pub use parser::{parse_frame, FrameParser, SseFrame, LINE_SEPARATOR};
