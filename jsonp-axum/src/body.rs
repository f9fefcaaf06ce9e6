//! Buffered and streamed response payloads.
//!
//! The inner service hands back a body it may still be producing. Padding
//! needs the whole thing in one piece, so the transform always drains the
//! stream before rewriting. The two states are kept explicit instead of
//! re-buffering blindly: a payload the transform already owns in memory (the
//! error-code literal) never goes through another drain.

use axum::body::Body;
use bytes::{Bytes, BytesMut};

/// A response body in one of its two lifecycle states.
#[derive(Debug)]
pub enum ResponsePayload {
    /// Fully materialized in memory.
    Buffered(Bytes),
    /// Still owned by the inner service's body stream, not yet read.
    Streamed(Body),
}

impl ResponsePayload {
    /// Drain the payload into a single contiguous buffer.
    ///
    /// Streamed chunks are concatenated in order with no separators. A
    /// failure while reading the stream is handed back to the caller; the
    /// transform never papers over a broken body.
    pub async fn into_buffered(self) -> Result<Bytes, axum::Error> {
        match self {
            ResponsePayload::Buffered(bytes) => Ok(bytes),
            ResponsePayload::Streamed(body) => axum::body::to_bytes(body, usize::MAX).await,
        }
    }
}

/// Wrap a drained body in the callback invocation: `<callback>(<body>)`.
///
/// Plain concatenation, no whitespace, no trailing semicolon. An empty
/// callback name degenerates to `(<body>)`.
pub fn pad(callback: &str, body: &[u8]) -> Bytes {
    let mut padded = BytesMut::with_capacity(callback.len() + body.len() + 2);
    padded.extend_from_slice(callback.as_bytes());
    padded.extend_from_slice(b"(");
    padded.extend_from_slice(body);
    padded.extend_from_slice(b")");
    padded.freeze()
}

/// Body that reproduces an already-observed read failure on first poll.
///
/// Used when buffering a request or response body fails: the caller gets the
/// same error the transform saw, in the same place it would have surfaced
/// without the transform in the stack.
pub(crate) fn failing_body(error: axum::Error) -> Body {
    Body::from_stream(futures::stream::once(async move {
        Err::<Bytes, axum::Error>(error)
    }))
}
