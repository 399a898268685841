use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::blocks::{HomeView, MessageTemplate, ModalView};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ChatClientError {
    #[error("slack request failed: {0}")]
    Transport(String),
    #[error("slack method `{method}` returned error `{error}`")]
    Api { method: String, error: String },
    #[error("slack response could not be decoded: {0}")]
    Decode(String),
}

/// Where a posted message landed; `ts` addresses it for later updates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageRef {
    pub channel_id: String,
    pub ts: String,
}

/// Outbound side of the chat platform as the flows see it.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn post_message(
        &self,
        channel_id: &str,
        message: &MessageTemplate,
    ) -> Result<MessageRef, ChatClientError>;

    /// Replies to a slash command through its `response_url`, visible only to
    /// the caller.
    async fn respond_to_command(
        &self,
        response_url: &str,
        message: &MessageTemplate,
    ) -> Result<(), ChatClientError>;

    async fn update_message(
        &self,
        channel_id: &str,
        ts: &str,
        message: &MessageTemplate,
    ) -> Result<(), ChatClientError>;

    /// Returns the scheduled message id.
    async fn schedule_message(
        &self,
        channel_id: &str,
        text: &str,
        send_at: DateTime<Utc>,
    ) -> Result<String, ChatClientError>;

    async fn open_view(&self, trigger_id: &str, view: &ModalView) -> Result<(), ChatClientError>;

    async fn publish_home_view(
        &self,
        user_id: &str,
        view: &HomeView,
        hash: Option<&str>,
    ) -> Result<(), ChatClientError>;

    async fn user_name(&self, user_id: &str) -> Result<String, ChatClientError>;

    async fn channel_name(&self, channel_id: &str) -> Result<String, ChatClientError>;
}
