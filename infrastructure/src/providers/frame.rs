//! Byte-level framing for streaming HTTP responses.
//!
//! Providers deliver either Server-Sent Events (frames separated by a blank
//! line) or newline-delimited JSON. [`FrameDecoder`] buffers raw bytes and
//! hands out complete frames only, so a frame split across network reads is
//! never lost or parsed early.

/// Wire framing used by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameFormat {
    /// `text/event-stream`: frames end with `\n\n`
    Sse,
    /// `application/x-ndjson`: frames end with `\n`
    Ndjson,
}

impl FrameFormat {
    fn delimiter(&self) -> &'static [u8] {
        match self {
            FrameFormat::Sse => b"\n\n",
            FrameFormat::Ndjson => b"\n",
        }
    }
}

/// Incremental frame splitter.
#[derive(Debug)]
pub struct FrameDecoder {
    format: FrameFormat,
    buffer: Vec<u8>,
}

impl FrameDecoder {
    pub fn new(format: FrameFormat) -> Self {
        Self {
            format,
            buffer: Vec::new(),
        }
    }

    /// Feed bytes and return every frame completed by them.
    ///
    /// Carriage returns are dropped so `\r\n` line endings behave like `\n`.
    /// Blank frames are not returned.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend(bytes.iter().copied().filter(|&b| b != b'\r'));

        let delimiter = self.format.delimiter();
        let mut frames = Vec::new();
        while let Some(pos) = self
            .buffer
            .windows(delimiter.len())
            .position(|window| window == delimiter)
        {
            let frame: Vec<u8> = self.buffer.drain(..pos + delimiter.len()).collect();
            let text = String::from_utf8_lossy(&frame[..pos]);
            if !text.trim().is_empty() {
                frames.push(text.into_owned());
            }
        }
        frames
    }

    /// Take whatever is left once the byte stream has ended.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        let text = String::from_utf8_lossy(&rest);
        let text = text.trim_end_matches('\n');
        if text.trim().is_empty() {
            None
        } else {
            Some(text.to_string())
        }
    }

    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }
}

/// One parsed Server-Sent Event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
}

/// Parse an SSE frame. Comment-only (heartbeat) frames and frames without a
/// `data` field yield `None`.
pub fn parse_sse_frame(frame: &str) -> Option<SseEvent> {
    let mut event = None;
    let mut data: Vec<&str> = Vec::new();

    for line in frame.lines() {
        if line.starts_with(':') {
            continue;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => event = Some(value.to_string()),
            "data" => data.push(value),
            _ => {}
        }
    }

    if data.is_empty() {
        None
    } else {
        Some(SseEvent {
            event,
            data: data.join("\n"),
        })
    }
}
