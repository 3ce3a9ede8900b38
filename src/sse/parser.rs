//! Mercure update frame parser
//!
//! Splits a Server-Sent Events byte stream into frames:
//! - Frames end at a blank line (`\n\n`); the delimiter is discarded
//! - `id:` lines set the frame id (surrounding whitespace trimmed)
//! - `data:` lines are collected in order (may span multiple lines)
//! - Every other line (comments starting with `:`, `event:`, `retry:`) is ignored
//!
//! A frame is only worth dispatching when it carries both a non-empty id and
//! at least one data line; see [`SseFrame::is_deliverable`].

/// Separator used when joining the data lines of one frame
#[cfg(windows)]
pub const LINE_SEPARATOR: &str = "\r\n";
/// Separator used when joining the data lines of one frame
#[cfg(not(windows))]
pub const LINE_SEPARATOR: &str = "\n";

const FRAME_DELIMITER: &[u8] = b"\n\n";

/// One blank-line delimited SSE frame
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseFrame {
    /// Value of the last `id:` line, if any
    pub id: Option<String>,
    /// Bodies of the `data:` lines, in stream order
    pub data: Vec<String>,
}

impl SseFrame {
    /// Whether the frame has a non-empty id and at least one data line
    pub fn is_deliverable(&self) -> bool {
        self.id.as_deref().is_some_and(|id| !id.is_empty()) && !self.data.is_empty()
    }

    /// Data lines joined with [`LINE_SEPARATOR`]
    pub fn joined_data(&self) -> String {
        self.data.join(LINE_SEPARATOR)
    }

    /// Consume the frame into `(id, data)` if it is deliverable
    pub fn into_update(self) -> Option<(String, String)> {
        if !self.is_deliverable() {
            return None;
        }
        let data = self.joined_data();
        self.id.map(|id| (id, data))
    }
}

/// Parse the text of one frame (without its trailing blank line)
pub fn parse_frame(raw: &str) -> SseFrame {
    let mut frame = SseFrame::default();

    for line in raw.split('\n') {
        if let Some(value) = line.strip_prefix("id:") {
            frame.id = Some(value.trim().to_string());
        } else if let Some(value) = line.strip_prefix("data:") {
            // "data: value" and "data:value" carry the same body
            let value = value.strip_prefix(' ').unwrap_or(value);
            frame.data.push(value.to_string());
        }
    }

    frame
}

/// Streaming frame parser that accumulates bytes and yields complete frames
///
/// The buffer holds raw bytes, so a chunk boundary may fall anywhere: inside a
/// line, inside a field prefix or inside a multi-byte character.
#[derive(Debug, Default)]
pub struct FrameParser {
    buffer: Vec<u8>,
}

impl FrameParser {
    /// Create a new parser with an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes into the parser and return every frame completed by them
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(bytes);

        let mut frames = Vec::new();
        let mut start = 0;

        while let Some(pos) = find_delimiter(&self.buffer[start..]) {
            let raw = &self.buffer[start..start + pos];
            let text = match std::str::from_utf8(raw) {
                Ok(text) => std::borrow::Cow::Borrowed(text),
                Err(_) => {
                    tracing::warn!("Received invalid UTF-8 in SSE frame");
                    String::from_utf8_lossy(raw)
                }
            };
            frames.push(parse_frame(&text));
            start += pos + FRAME_DELIMITER.len();
        }

        if start > 0 {
            self.buffer.drain(..start);
        }

        frames
    }

    /// Bytes received but not yet closed by a blank line
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    /// Drop any buffered bytes
    pub fn reset(&mut self) {
        self.buffer.clear();
    }
}

fn find_delimiter(buf: &[u8]) -> Option<usize> {
    buf.windows(FRAME_DELIMITER.len())
        .position(|window| window == FRAME_DELIMITER)
}
