use std::sync::Arc;
use async_trait::async_trait;
use tracing::debug;

use shared_api::PortalClient;
use shared_models::error::ApiError;

use crate::models::{ChatRequest, ChatResponse};

/// Where assistant turns are sent.
#[async_trait]
pub trait AssistantBackend: Send + Sync {
    async fn send(&self, request: ChatRequest) -> Result<ChatResponse, ApiError>;
}

/// The portal's `/chat` endpoint.
pub struct RemoteAssistant {
    client: Arc<PortalClient>,
}

impl RemoteAssistant {
    pub fn new(client: Arc<PortalClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AssistantBackend for RemoteAssistant {
    async fn send(&self, request: ChatRequest) -> Result<ChatResponse, ApiError> {
        debug!("Sending chat turn with {} history entries", request.conversation_history.len());

        let body = serde_json::to_value(&request)
            .map_err(|e| ApiError::Decode(e.to_string()))?;

        self.client.post("/chat", body).await
    }
}
