//! HTTP implementation of the session API

use crate::error::{ChatError, Result};
use crate::types::identifiers::SessionId;
use crate::types::messages::ChatMessage;

use super::{CreateSessionRequest, CreateSessionResponse, PersistMessageRequest, SessionApi};

/// Session API client backed by the PharmaDesk REST backend
#[derive(Debug, Clone)]
pub struct HttpSessionApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSessionApi {
    /// Create a client for the given API base URL, e.g. `https://host/api`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Create a client reusing an existing `reqwest::Client`
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Map a non-success response into [`ChatError::Api`] with its body
    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(ChatError::api(status.as_u16(), message))
    }
}

impl SessionApi for HttpSessionApi {
    async fn create_session(&self, request: CreateSessionRequest) -> Result<CreateSessionResponse> {
        let response = self
            .client
            .post(self.url("/sessions"))
            .json(&request)
            .send()
            .await
            .map_err(|e| ChatError::session_creation(format!("Request failed: {e}")))?;

        let response = Self::check(response)
            .await
            .map_err(|e| ChatError::session_creation(e.to_string()))?;

        Ok(response.json().await?)
    }

    async fn fetch_messages(&self, session_id: &SessionId) -> Result<Vec<ChatMessage>> {
        let response = self
            .client
            .get(self.url(&format!("/sessions/{session_id}/messages")))
            .send()
            .await?;

        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }

    async fn persist_message(
        &self,
        session_id: &SessionId,
        request: PersistMessageRequest,
    ) -> Result<()> {
        let response = self
            .client
            .post(self.url(&format!("/sessions/{session_id}/messages")))
            .json(&request)
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }

    async fn close_session(&self, session_id: &SessionId) -> Result<()> {
        let response = self
            .client
            .post(self.url(&format!("/sessions/{session_id}/close")))
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }
}
