use async_trait::async_trait;
use futures::StreamExt;
use polyagent_core::agent::{AgentRequest, AgentTransport};
use polyagent_core::error::{PolyError, Result};
use polyagent_core::stream::{ByteStream, StreamError};
use reqwest::{Client, StatusCode};

const MAX_ERROR_BODY_CHARS: usize = 200;

/// Agent transport that POSTs JSON to the PolyAgent backend over HTTP.
#[derive(Clone, Default)]
pub struct HttpAgentTransport {
    client: Client,
}

impl HttpAgentTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AgentTransport for HttpAgentTransport {
    async fn post(&self, endpoint: &str, request: &AgentRequest) -> Result<Option<ByteStream>> {
        tracing::debug!("[HttpAgentTransport] POST {}", endpoint);

        let response = self
            .client
            .post(endpoint)
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|err| PolyError::transport(format!("request to {} failed: {}", endpoint, err)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(map_http_error(status, body_text));
        }

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|err| StreamError::Read(err.to_string())))
            .boxed();
        Ok(Some(body))
    }
}

fn map_http_error(status: StatusCode, body: String) -> PolyError {
    let excerpt: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
    PolyError::transport(format!("HTTP {}: {}", status.as_u16(), excerpt.trim()))
}
