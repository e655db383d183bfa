//! Turning a response byte stream into a normalized chunk stream.
//!
//! [`decode_stream`] couples a [`FrameDecoder`] with a provider-specific
//! [`FrameParser`] and exposes the result as a lazy [`StreamHandle`]. The
//! handle ends right after the first completion chunk or the first error.

use super::frame::{FrameDecoder, FrameFormat};
use futures::stream::{self, Stream, StreamExt};
use std::collections::VecDeque;
use thinktank_application::ports::llm_adapter::{AdapterError, StreamHandle};
use thinktank_domain::StreamChunk;
use tracing::debug;

/// What a single frame means for the chunk stream.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    Chunk(StreamChunk),
    /// Heartbeats, bookkeeping events and malformed frames
    Skip,
    Fail(AdapterError),
}

/// Maps one provider's frames onto chunks. Parsers may keep state across
/// frames, e.g. a stop reason announced before the final event.
pub trait FrameParser: Send + 'static {
    fn parse_frame(&mut self, frame: &str) -> FrameOutcome;
}

struct DecodeState<S, P> {
    bytes: S,
    decoder: FrameDecoder,
    parser: P,
    pending: VecDeque<Result<StreamChunk, AdapterError>>,
    eof: bool,
    finished: bool,
}

impl<S, P: FrameParser> DecodeState<S, P> {
    fn enqueue(&mut self, frame: &str) {
        match self.parser.parse_frame(frame) {
            FrameOutcome::Chunk(chunk) => self.pending.push_back(Ok(chunk)),
            FrameOutcome::Skip => {}
            FrameOutcome::Fail(e) => self.pending.push_back(Err(e)),
        }
    }
}

/// Decode `bytes` into a chunk stream.
///
/// Transport errors surface as a single [`AdapterError::Network`] item. A
/// byte stream that ends before the parser reports completion yields
/// [`AdapterError::Incomplete`].
pub fn decode_stream<S, B, E, P>(bytes: S, format: FrameFormat, parser: P) -> StreamHandle
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
    P: FrameParser,
{
    let state = DecodeState {
        bytes: Box::pin(bytes),
        decoder: FrameDecoder::new(format),
        parser,
        pending: VecDeque::new(),
        eof: false,
        finished: false,
    };

    StreamHandle::new(stream::unfold(state, |mut state| async move {
        loop {
            if state.finished {
                return None;
            }
            if let Some(item) = state.pending.pop_front() {
                let terminal = match &item {
                    Ok(chunk) => chunk.is_complete,
                    Err(_) => true,
                };
                if terminal {
                    state.finished = true;
                    state.pending.clear();
                }
                return Some((item, state));
            }
            if state.eof {
                debug!("Byte stream ended without a completion event");
                state.finished = true;
                return Some((Err(AdapterError::Incomplete), state));
            }

            match state.bytes.next().await {
                Some(Ok(bytes)) => {
                    for frame in state.decoder.push(bytes.as_ref()) {
                        state.enqueue(&frame);
                    }
                }
                Some(Err(e)) => {
                    debug!("Transport error while streaming: {}", e);
                    state.pending.push_back(Err(AdapterError::Network(e.to_string())));
                }
                None => {
                    if let Some(frame) = state.decoder.finish() {
                        state.enqueue(&frame);
                    }
                    state.eof = true;
                }
            }
        }
    }))
}
