use super::types::{ChatRequest, StopRequest};
use crate::config::{Config, CHAT_COMPLETIONS, CHAT_STOP};
use crate::error::{ChatError, Result};
use reqwest::{Client, Response};
use tracing::debug;

/// The body of a chat response, by content type
pub enum ChatResponse {
    /// Non-streaming JSON body
    Complete(Response),
    /// NDJSON / SSE stream
    Stream(Response),
}

#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    completions_url: String,
    stop_url: String,
    model: String,
}

impl ChatClient {
    pub fn new(config: &Config) -> Self {
        Self::new_with_base_url(&config.backend_url, config.model.clone())
    }

    pub fn new_with_base_url(base_url: &str, model: String) -> Self {
        Self {
            client: Client::new(),
            completions_url: format!("{}{}", base_url, CHAT_COMPLETIONS),
            stop_url: format!("{}{}", base_url, CHAT_STOP),
            model,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn start(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let response = self
            .client
            .post(&self.completions_url)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
            .to_string();
        debug!("Chat response status={} content-type={}", status, content_type);

        if !status.is_success() {
            return Err(ChatError::Status(status));
        }

        if content_type.contains("application/json") {
            Ok(ChatResponse::Complete(response))
        } else {
            Ok(ChatResponse::Stream(response))
        }
    }

    /// Ask the backend to stop generating for a session
    pub async fn stop(&self, session_id: &str) -> Result<()> {
        let response = self
            .client
            .post(&self.stop_url)
            .json(&StopRequest { session_id })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::Status(status));
        }
        Ok(())
    }
}
