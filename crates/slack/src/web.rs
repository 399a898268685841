//! `reqwest` implementation of [`ChatClient`] against the Slack Web API.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deskbot_core::config::SlackConfig;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use tracing::debug;

use crate::{
    blocks::{HomeView, MessageTemplate, ModalView},
    client::{ChatClient, ChatClientError, MessageRef},
};

const COMMAND_RESPONSE: &str = "response_url";

pub struct SlackWebClient {
    http: reqwest::Client,
    base_url: String,
    bot_token: SecretString,
}

impl SlackWebClient {
    pub fn new(
        base_url: impl Into<String>,
        bot_token: SecretString,
        timeout: Duration,
    ) -> Result<Self, ChatClientError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| ChatClientError::Transport(error.to_string()))?;
        Ok(Self { http, base_url: base_url.into().trim_end_matches('/').to_owned(), bot_token })
    }

    pub fn from_config(config: &SlackConfig) -> Result<Self, ChatClientError> {
        Self::new(
            config.api_base_url.clone(),
            config.bot_token.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{method}", self.base_url)
    }

    async fn call(&self, method: &str, body: Value) -> Result<Value, ChatClientError> {
        debug!(slack_method = method, "calling slack web api");
        let response = self
            .http
            .post(self.method_url(method))
            .bearer_auth(self.bot_token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|error| ChatClientError::Transport(error.to_string()))?;
        let payload = response
            .json::<Value>()
            .await
            .map_err(|error| ChatClientError::Decode(error.to_string()))?;
        check_envelope(method, payload)
    }

    async fn query(&self, method: &str, params: &[(&str, &str)]) -> Result<Value, ChatClientError> {
        debug!(slack_method = method, "querying slack web api");
        let response = self
            .http
            .get(self.method_url(method))
            .bearer_auth(self.bot_token.expose_secret())
            .query(params)
            .send()
            .await
            .map_err(|error| ChatClientError::Transport(error.to_string()))?;
        let payload = response
            .json::<Value>()
            .await
            .map_err(|error| ChatClientError::Decode(error.to_string()))?;
        check_envelope(method, payload)
    }
}

#[async_trait]
impl ChatClient for SlackWebClient {
    async fn post_message(
        &self,
        channel_id: &str,
        message: &MessageTemplate,
    ) -> Result<MessageRef, ChatClientError> {
        let payload = self.call("chat.postMessage", message_body(channel_id, None, message)?).await?;
        Ok(MessageRef {
            channel_id: string_field(&payload, "channel")
                .unwrap_or(channel_id)
                .to_owned(),
            ts: required_string(&payload, "chat.postMessage", "ts")?,
        })
    }

    async fn respond_to_command(
        &self,
        response_url: &str,
        message: &MessageTemplate,
    ) -> Result<(), ChatClientError> {
        debug!(slack_method = COMMAND_RESPONSE, "replying through response_url");
        let response = self
            .http
            .post(response_url)
            .json(&command_response_body(message)?)
            .send()
            .await
            .map_err(|error| ChatClientError::Transport(error.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let detail = response.text().await.unwrap_or_default();
        Err(ChatClientError::Api {
            method: COMMAND_RESPONSE.to_owned(),
            error: format!("{} {}", status.as_u16(), detail.trim()).trim().to_owned(),
        })
    }

    async fn update_message(
        &self,
        channel_id: &str,
        ts: &str,
        message: &MessageTemplate,
    ) -> Result<(), ChatClientError> {
        self.call("chat.update", message_body(channel_id, Some(ts), message)?).await?;
        Ok(())
    }

    async fn schedule_message(
        &self,
        channel_id: &str,
        text: &str,
        send_at: DateTime<Utc>,
    ) -> Result<String, ChatClientError> {
        let body = json!({ "channel": channel_id, "text": text, "post_at": send_at.timestamp() });
        let payload = self.call("chat.scheduleMessage", body).await?;
        required_string(&payload, "chat.scheduleMessage", "scheduled_message_id")
    }

    async fn open_view(&self, trigger_id: &str, view: &ModalView) -> Result<(), ChatClientError> {
        let view = serde_json::to_value(view)
            .map_err(|error| ChatClientError::Decode(error.to_string()))?;
        self.call("views.open", json!({ "trigger_id": trigger_id, "view": view })).await?;
        Ok(())
    }

    async fn publish_home_view(
        &self,
        user_id: &str,
        view: &HomeView,
        hash: Option<&str>,
    ) -> Result<(), ChatClientError> {
        let view = serde_json::to_value(view)
            .map_err(|error| ChatClientError::Decode(error.to_string()))?;
        let mut body = json!({ "user_id": user_id, "view": view });
        if let Some(hash) = hash {
            body["hash"] = Value::String(hash.to_owned());
        }
        self.call("views.publish", body).await?;
        Ok(())
    }

    async fn user_name(&self, user_id: &str) -> Result<String, ChatClientError> {
        let payload = self.query("users.info", &[("user", user_id)]).await?;
        user_display_name(&payload)
            .map(str::to_owned)
            .ok_or_else(|| ChatClientError::Decode("users.info response has no user name".to_owned()))
    }

    async fn channel_name(&self, channel_id: &str) -> Result<String, ChatClientError> {
        let payload = self.query("conversations.info", &[("channel", channel_id)]).await?;
        payload
            .pointer("/channel/name")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| {
                ChatClientError::Decode("conversations.info response has no channel name".to_owned())
            })
    }
}

/// Slack answers HTTP 200 for most failures; `ok` decides.
pub(crate) fn check_envelope(method: &str, payload: Value) -> Result<Value, ChatClientError> {
    if payload.get("ok").and_then(Value::as_bool) == Some(true) {
        return Ok(payload);
    }
    let error = string_field(&payload, "error").unwrap_or("unknown_error").to_owned();
    Err(ChatClientError::Api { method: method.to_owned(), error })
}

fn message_body(
    channel_id: &str,
    ts: Option<&str>,
    message: &MessageTemplate,
) -> Result<Value, ChatClientError> {
    let mut body = json!({ "channel": channel_id });
    if let Some(ts) = ts {
        body["ts"] = Value::String(ts.to_owned());
    }
    append_content(body, message)
}

fn command_response_body(message: &MessageTemplate) -> Result<Value, ChatClientError> {
    append_content(json!({ "response_type": "ephemeral" }), message)
}

fn append_content(mut body: Value, message: &MessageTemplate) -> Result<Value, ChatClientError> {
    body["text"] = Value::String(message.fallback_text.clone());
    if !message.blocks.is_empty() {
        body["blocks"] = serde_json::to_value(&message.blocks)
            .map_err(|error| ChatClientError::Decode(error.to_string()))?;
    }
    Ok(body)
}

fn string_field<'a>(payload: &'a Value, field: &str) -> Option<&'a str> {
    payload.get(field).and_then(Value::as_str)
}

fn required_string(payload: &Value, method: &str, field: &str) -> Result<String, ChatClientError> {
    string_field(payload, field)
        .map(str::to_owned)
        .ok_or_else(|| ChatClientError::Decode(format!("{method} response has no `{field}`")))
}

fn user_display_name(payload: &Value) -> Option<&str> {
    ["/user/profile/display_name", "/user/real_name", "/user/name"]
        .into_iter()
        .filter_map(|pointer| payload.pointer(pointer).and_then(Value::as_str))
        .find(|name| !name.trim().is_empty())
}
