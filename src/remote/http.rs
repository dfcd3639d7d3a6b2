//! # HTTP Backend
//!
//! Production [`RemoteBackend`] over two HTTP services: the retrieval
//! backend (`/ask`, `/upload`, message history) and the application API
//! (conversation CRUD, message persistence, profile and settings).
//!
//! Contract handling: a non-2xx status, an `error` field in the body, or a
//! body missing its required field are all the same failure class
//! ([`crate::error::ChatError::Remote`]); callers cannot tell them apart
//! and should not need to.

use reqwest::multipart;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use async_trait::async_trait;

use crate::auth::Session;
use crate::config::Config;
use crate::error::{ChatError, Result};
use crate::ids::ConversationId;
use crate::remote::{DocumentReceipt, RemoteBackend};
use crate::types::{ChatMessage, Conversation, MessageSender, Settings, UserProfile};

/// HTTP implementation of [`RemoteBackend`].
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    config: Config,
}

#[derive(Debug, Serialize)]
struct AskTurn<'a> {
    sender: MessageSender,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct AskRequest<'a> {
    user_id: &'a str,
    conversation_id: &'a str,
    messages: Vec<AskTurn<'a>>,
}

#[derive(Debug, Deserialize)]
struct AskResponse {
    answer: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    text: Option<String>,
    filename: Option<String>,
    // Older deployments report `stored`, newer ones `chunks`.
    #[serde(alias = "stored")]
    chunks: Option<u32>,
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateConversationRequest<'a> {
    user_id: &'a str,
    title: &'a str,
}

#[derive(Debug, Serialize)]
struct RenameConversationRequest<'a> {
    title: &'a str,
}

impl HttpBackend {
    pub fn new(config: Config) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn with_client(client: Client, config: Config) -> Self {
        Self { client, config }
    }

    /// Map a non-2xx response to a remote error carrying the status and any
    /// body text the server returned.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(ChatError::remote(format!("HTTP {status}: {body}")))
    }
}

#[async_trait]
impl RemoteBackend for HttpBackend {
    async fn ask(
        &self,
        user_id: &str,
        conversation_id: &ConversationId,
        history: &[ChatMessage],
    ) -> Result<String> {
        let request = AskRequest {
            user_id,
            conversation_id: conversation_id.as_str(),
            messages: history
                .iter()
                .map(|m| AskTurn {
                    sender: m.sender,
                    content: &m.content,
                })
                .collect(),
        };
        debug!(conversation_id = %conversation_id, turns = request.messages.len(), "asking");

        let response = self
            .client
            .post(self.config.rag_url("/ask"))
            .json(&request)
            .send()
            .await?;
        let body: AskResponse = Self::check(response).await?.json().await?;

        if let Some(error) = body.error {
            return Err(ChatError::Remote(error));
        }
        body.answer
            .ok_or_else(|| ChatError::remote("response carried no answer"))
    }

    async fn upload_document(
        &self,
        conversation_id: &ConversationId,
        filename: &str,
        content: Vec<u8>,
    ) -> Result<DocumentReceipt> {
        let form = multipart::Form::new()
            .part(
                "file",
                multipart::Part::bytes(content).file_name(filename.to_string()),
            )
            .text("conversation_id", conversation_id.to_string());

        let response = self
            .client
            .post(self.config.rag_url("/upload"))
            .multipart(form)
            .send()
            .await?;
        let body: UploadResponse = Self::check(response).await?.json().await?;

        if let Some(error) = body.error {
            return Err(ChatError::Remote(error));
        }
        let chunks = body.chunks.unwrap_or(0);
        if chunks == 0 {
            return Err(ChatError::remote(format!(
                "document '{filename}' was not ingested"
            )));
        }
        Ok(DocumentReceipt {
            text: body.text,
            filename: body.filename.unwrap_or_else(|| filename.to_string()),
            chunks,
        })
    }

    async fn list_conversations(&self, user_id: &str) -> Result<Vec<Conversation>> {
        let response = self
            .client
            .get(self.config.api_url(&format!("/conversations/{user_id}")))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn create_conversation(&self, user_id: &str, title: &str) -> Result<Conversation> {
        let response = self
            .client
            .post(self.config.api_url("/conversations"))
            .json(&CreateConversationRequest { user_id, title })
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn rename_conversation(
        &self,
        conversation_id: &ConversationId,
        title: &str,
    ) -> Result<()> {
        let response = self
            .client
            .put(
                self.config
                    .api_url(&format!("/conversations/{conversation_id}")),
            )
            .json(&RenameConversationRequest { title })
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn delete_conversation(
        &self,
        conversation_id: &ConversationId,
        session: &Session,
    ) -> Result<()> {
        let response = self
            .client
            .delete(
                self.config
                    .api_url(&format!("/conversations/{conversation_id}")),
            )
            .bearer_auth(&session.access_token)
            .header("X-User-Id", &session.user_id)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn fetch_messages_page(
        &self,
        conversation_id: &ConversationId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<ChatMessage>> {
        let response = self
            .client
            .get(self.config.rag_url(&format!("/messages/{conversation_id}")))
            .query(&[("offset", offset), ("limit", limit)])
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn append_message(&self, message: &ChatMessage) -> Result<ChatMessage> {
        let response = self
            .client
            .post(self.config.api_url(&format!(
                "/conversations/{}/messages",
                message.conversation_id
            )))
            .json(message)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn update_settings(&self, user_id: &str, settings: &Settings) -> Result<()> {
        let response = self
            .client
            .put(self.config.api_url(&format!("/users/{user_id}/settings")))
            .json(settings)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn update_user_data(&self, profile: &UserProfile) -> Result<()> {
        let response = self
            .client
            .put(self.config.api_url(&format!("/users/{}", profile.id)))
            .json(profile)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}
