//! Streaming response decoding.

mod decoder;

pub use decoder::{ByteStream, SnapshotSink, StreamDecoder, StreamError, normalize};
