//! Incremental byte-stream decoder.
//!
//! Turns a chunked response body into one growing, normalized text buffer and
//! publishes the whole buffer after every chunk.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{BoxStream, Stream, StreamExt};
use thiserror::Error;

/// A boxed response body as produced by the transport layer.
pub type ByteStream = BoxStream<'static, Result<Bytes, StreamError>>;

/// Errors raised while consuming a response body.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// The response exposes no readable body.
    #[error("response has no readable body")]
    MissingBody,
    /// Reading a chunk failed.
    #[error("stream read failed: {0}")]
    Read(String),
}

/// Converts line feeds to markup line breaks and drops carriage returns.
///
/// Idempotent: normalized text contains neither `\n` nor `\r`.
pub fn normalize(text: &str) -> String {
    text.replace('\n', "<br>").replace('\r', "")
}

/// Receives full-buffer snapshots from a [`StreamDecoder`].
#[async_trait]
pub trait SnapshotSink: Send {
    /// Called with the entire normalized buffer after each chunk.
    async fn publish(&mut self, snapshot: &str);
}

#[async_trait]
impl SnapshotSink for Vec<String> {
    async fn publish(&mut self, snapshot: &str) {
        self.push(snapshot.to_string());
    }
}

/// Accumulates decoded text across chunks.
///
/// Multi-byte characters split across chunk boundaries are held back until
/// complete, so the rendered text does not depend on how the bytes were
/// chunked. Invalid sequences decode to U+FFFD.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    /// Normalized text decoded so far.
    rendered: String,
    /// Trailing bytes of an incomplete UTF-8 sequence.
    pending: Vec<u8>,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes one chunk and appends it to the buffer.
    pub fn push(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);

        let mut decoded = String::new();
        let mut rest: &[u8] = &self.pending;
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    decoded.push_str(valid);
                    rest = &[];
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    decoded.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            decoded.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        // incomplete sequence at the end: wait for the next chunk
                        None => {
                            rest = after;
                            break;
                        }
                    }
                }
            }
        }
        let remaining = rest.to_vec();
        self.pending = remaining;
        self.rendered.push_str(&normalize(&decoded));
    }

    /// Flushes an incomplete trailing sequence as U+FFFD.
    ///
    /// Returns true if the buffer changed.
    pub fn finish(&mut self) -> bool {
        if self.pending.is_empty() {
            return false;
        }
        self.pending.clear();
        self.rendered.push(char::REPLACEMENT_CHARACTER);
        true
    }

    /// The normalized text decoded so far.
    pub fn rendered(&self) -> &str {
        &self.rendered
    }

    pub fn into_rendered(self) -> String {
        self.rendered
    }

    /// Reads `body` to completion, publishing a snapshot after every chunk.
    ///
    /// There is no separate completion signal: the last snapshot is the final
    /// text. A missing body is a hard error and nothing is published.
    ///
    /// # Errors
    ///
    /// - `StreamError::MissingBody` if `body` is `None`
    /// - `StreamError::Read` if a chunk fails; earlier snapshots stay published
    pub async fn drive<S>(
        body: Option<S>,
        sink: &mut (dyn SnapshotSink + '_),
    ) -> Result<String, StreamError>
    where
        S: Stream<Item = Result<Bytes, StreamError>> + Unpin + Send,
    {
        let mut body = body.ok_or(StreamError::MissingBody)?;
        let mut decoder = Self::new();
        let mut chunks = 0usize;

        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            chunks += 1;
            decoder.push(&chunk);
            sink.publish(decoder.rendered()).await;
        }

        if decoder.finish() {
            sink.publish(decoder.rendered()).await;
        }

        tracing::debug!(
            "[StreamDecoder] Stream complete: {} chunk(s), {} byte(s) rendered",
            chunks,
            decoder.rendered().len()
        );
        Ok(decoder.into_rendered())
    }
}
