//! Agent transport trait and structured reply decoding.

use crate::error::{PolyError, Result};
use crate::stream::{ByteStream, StreamError};
use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

/// Request body posted to every agent endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentRequest {
    pub message: String,
}

impl AgentRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Sends a request to an agent endpoint and hands back the raw body.
///
/// Implementations must map non-success HTTP statuses to
/// `PolyError::Transport`; a `None` body means the response exposed no
/// readable stream.
#[async_trait]
pub trait AgentTransport: Send + Sync {
    async fn post(&self, endpoint: &str, request: &AgentRequest) -> Result<Option<ByteStream>>;
}

/// Wire form of a structured agent reply.
#[derive(Debug, Clone, Deserialize)]
struct StructuredReply {
    success: Option<bool>,
    response: Option<String>,
    error: Option<String>,
}

/// Reads a whole body into memory.
pub async fn collect_body(body: Option<ByteStream>) -> std::result::Result<Vec<u8>, StreamError> {
    let mut body = body.ok_or(StreamError::MissingBody)?;
    let mut bytes = Vec::new();
    while let Some(chunk) = body.next().await {
        bytes.extend_from_slice(&chunk?);
    }
    Ok(bytes)
}

/// Extracts the response text from a `{success, response?, error?}` body.
///
/// # Errors
///
/// Returns `PolyError::Decode` when the body is not JSON, the success
/// discriminant is missing or false, or a successful reply carries no text.
pub fn parse_structured_reply(body: &[u8]) -> Result<String> {
    let reply: StructuredReply = serde_json::from_slice(body)
        .map_err(|e| PolyError::decode(format!("malformed structured reply: {}", e)))?;

    match reply.success {
        None => Err(PolyError::decode("structured reply has no success discriminant")),
        Some(false) => Err(PolyError::decode(format!(
            "agent reported failure: {}",
            reply.error.unwrap_or_else(|| "no error given".to_string())
        ))),
        Some(true) => reply
            .response
            .ok_or_else(|| PolyError::decode("successful reply carries no response text")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use futures::stream;

    #[test]
    fn test_parse_success() {
        let text = parse_structured_reply(br#"{"success":true,"response":"Hi\nthere"}"#).unwrap();
        assert_eq!(text, "Hi\nthere");
    }

    #[test]
    fn test_missing_discriminant_is_an_error() {
        let err = parse_structured_reply(br#"{"response":"looks fine"}"#).unwrap_err();
        assert!(matches!(err, PolyError::Decode(_)));
    }

    #[test]
    fn test_false_discriminant_is_an_error() {
        let err = parse_structured_reply(br#"{"success":false,"error":"out of stock"}"#).unwrap_err();
        assert!(err.to_string().contains("out of stock"));
    }

    #[test]
    fn test_success_without_text_is_an_error() {
        assert!(parse_structured_reply(br#"{"success":true}"#).is_err());
        assert!(parse_structured_reply(b"<html>502</html>").is_err());
    }

    #[tokio::test]
    async fn test_collect_body_concatenates_chunks() {
        let body: ByteStream = stream::iter(vec![
            Ok(Bytes::from_static(b"{\"success\":")),
            Ok(Bytes::from_static(b"true,\"response\":\"ok\"}")),
        ])
        .boxed();

        let bytes = collect_body(Some(body)).await.unwrap();
        assert_eq!(parse_structured_reply(&bytes).unwrap(), "ok");
        assert_eq!(collect_body(None).await.unwrap_err(), StreamError::MissingBody);
    }
}
