//! In-memory collaborators that record every call, for exercising flows
//! without a Slack workspace or a Jira instance. Built for tests and behind
//! the `test-support` feature.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use deskbot_core::{Issue, IssueKey, IssueTracker, TrackerError};
use tokio::sync::Mutex;

use crate::{
    blocks::{HomeView, MessageTemplate, ModalView},
    client::{ChatClient, ChatClientError, MessageRef},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatCall {
    PostMessage { channel_id: String, message: MessageTemplate },
    RespondToCommand { response_url: String, message: MessageTemplate },
    UpdateMessage { channel_id: String, ts: String, message: MessageTemplate },
    ScheduleMessage { channel_id: String, text: String, send_at: DateTime<Utc> },
    OpenView { trigger_id: String, view: ModalView },
    PublishHomeView { user_id: String, view: HomeView, hash: Option<String> },
}

#[derive(Default)]
pub struct RecordingChatClient {
    calls: Mutex<Vec<ChatCall>>,
    user_names: HashMap<String, String>,
    channel_names: HashMap<String, String>,
    failure: Option<ChatClientError>,
}

impl RecordingChatClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user_id: &str, name: &str) -> Self {
        self.user_names.insert(user_id.to_owned(), name.to_owned());
        self
    }

    pub fn with_channel(mut self, channel_id: &str, name: &str) -> Self {
        self.channel_names.insert(channel_id.to_owned(), name.to_owned());
        self
    }

    /// Every outbound call fails with `error` (name lookups included).
    pub fn failing_with(mut self, error: ChatClientError) -> Self {
        self.failure = Some(error);
        self
    }

    pub async fn calls(&self) -> Vec<ChatCall> {
        self.calls.lock().await.clone()
    }

    pub async fn posted_messages(&self) -> Vec<(String, MessageTemplate)> {
        self.calls
            .lock()
            .await
            .iter()
            .filter_map(|call| match call {
                ChatCall::PostMessage { channel_id, message } => {
                    Some((channel_id.clone(), message.clone()))
                }
                _ => None,
            })
            .collect()
    }

    pub async fn opened_views(&self) -> Vec<ModalView> {
        self.calls
            .lock()
            .await
            .iter()
            .filter_map(|call| match call {
                ChatCall::OpenView { view, .. } => Some(view.clone()),
                _ => None,
            })
            .collect()
    }

    async fn record(&self, call: ChatCall) -> Result<(), ChatClientError> {
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        self.calls.lock().await.push(call);
        Ok(())
    }
}

#[async_trait]
impl ChatClient for RecordingChatClient {
    async fn post_message(
        &self,
        channel_id: &str,
        message: &MessageTemplate,
    ) -> Result<MessageRef, ChatClientError> {
        self.record(ChatCall::PostMessage {
            channel_id: channel_id.to_owned(),
            message: message.clone(),
        })
        .await?;
        let ts = format!("1730000000.{:04}", self.calls.lock().await.len());
        Ok(MessageRef { channel_id: channel_id.to_owned(), ts })
    }

    async fn respond_to_command(
        &self,
        response_url: &str,
        message: &MessageTemplate,
    ) -> Result<(), ChatClientError> {
        self.record(ChatCall::RespondToCommand {
            response_url: response_url.to_owned(),
            message: message.clone(),
        })
        .await
    }

    async fn update_message(
        &self,
        channel_id: &str,
        ts: &str,
        message: &MessageTemplate,
    ) -> Result<(), ChatClientError> {
        self.record(ChatCall::UpdateMessage {
            channel_id: channel_id.to_owned(),
            ts: ts.to_owned(),
            message: message.clone(),
        })
        .await
    }

    async fn schedule_message(
        &self,
        channel_id: &str,
        text: &str,
        send_at: DateTime<Utc>,
    ) -> Result<String, ChatClientError> {
        self.record(ChatCall::ScheduleMessage {
            channel_id: channel_id.to_owned(),
            text: text.to_owned(),
            send_at,
        })
        .await?;
        Ok(format!("Q{}", send_at.timestamp()))
    }

    async fn open_view(&self, trigger_id: &str, view: &ModalView) -> Result<(), ChatClientError> {
        self.record(ChatCall::OpenView { trigger_id: trigger_id.to_owned(), view: view.clone() })
            .await
    }

    async fn publish_home_view(
        &self,
        user_id: &str,
        view: &HomeView,
        hash: Option<&str>,
    ) -> Result<(), ChatClientError> {
        self.record(ChatCall::PublishHomeView {
            user_id: user_id.to_owned(),
            view: view.clone(),
            hash: hash.map(str::to_owned),
        })
        .await
    }

    async fn user_name(&self, user_id: &str) -> Result<String, ChatClientError> {
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        self.user_names.get(user_id).cloned().ok_or_else(|| ChatClientError::Api {
            method: "users.info".to_owned(),
            error: "user_not_found".to_owned(),
        })
    }

    async fn channel_name(&self, channel_id: &str) -> Result<String, ChatClientError> {
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        self.channel_names.get(channel_id).cloned().ok_or_else(|| ChatClientError::Api {
            method: "conversations.info".to_owned(),
            error: "channel_not_found".to_owned(),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedWorklog {
    pub key: IssueKey,
    pub duration: Duration,
    pub date: NaiveDate,
    pub note: String,
}

/// Tracker answering every query with a fixed issue list.
#[derive(Default)]
pub struct StaticIssueTracker {
    issues: Vec<Issue>,
    queries: Mutex<Vec<String>>,
    worklogs: Mutex<Vec<RecordedWorklog>>,
    failure: Option<TrackerError>,
    record_limit: Option<(usize, TrackerError)>,
}

impl StaticIssueTracker {
    pub fn new(issues: Vec<Issue>) -> Self {
        Self { issues, ..Self::default() }
    }

    pub fn failing_with(mut self, error: TrackerError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Accepts `accepted` worklogs, then rejects every further one.
    pub fn rejecting_worklogs_after(mut self, accepted: usize, error: TrackerError) -> Self {
        self.record_limit = Some((accepted, error));
        self
    }

    pub async fn queries(&self) -> Vec<String> {
        self.queries.lock().await.clone()
    }

    pub async fn worklogs(&self) -> Vec<RecordedWorklog> {
        self.worklogs.lock().await.clone()
    }
}

#[async_trait]
impl IssueTracker for StaticIssueTracker {
    async fn query_issues(&self, jql: &str) -> Result<Vec<Issue>, TrackerError> {
        self.queries.lock().await.push(jql.to_owned());
        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(self.issues.clone()),
        }
    }

    async fn get_issue(&self, key: &IssueKey) -> Result<Option<Issue>, TrackerError> {
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        Ok(self.issues.iter().find(|issue| &issue.key == key).cloned())
    }

    async fn record_work(
        &self,
        key: &IssueKey,
        duration: Duration,
        date: NaiveDate,
        note: &str,
    ) -> Result<(), TrackerError> {
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        let mut worklogs = self.worklogs.lock().await;
        if let Some((accepted, error)) = &self.record_limit {
            if worklogs.len() >= *accepted {
                return Err(error.clone());
            }
        }
        worklogs.push(RecordedWorklog {
            key: key.clone(),
            duration,
            date,
            note: note.to_owned(),
        });
        Ok(())
    }
}
