//! Jira REST v2 implementation of [`IssueTracker`].

use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as WorkDuration, NaiveDate};
use deskbot_core::{
    config::JiraConfig, worklog::format_jira_duration, Issue, IssueKey, IssueTracker,
    TrackerError,
};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

const SEARCH_PAGE_SIZE: u32 = 100;

#[derive(Debug, Error)]
pub enum JiraSetupError {
    #[error("jira.{0} is not configured")]
    Missing(&'static str),
    #[error("jira http client could not be built: {0}")]
    HttpClient(#[source] reqwest::Error),
}

pub struct JiraRestClient {
    http: Client,
    base_url: String,
    login: String,
    api_token: SecretString,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    issues: Vec<RawIssue>,
}

#[derive(Deserialize)]
struct RawIssue {
    key: String,
    #[serde(default)]
    fields: RawFields,
}

#[derive(Default, Deserialize)]
struct RawFields {
    #[serde(default)]
    summary: Option<String>,
}

impl From<RawIssue> for Issue {
    fn from(raw: RawIssue) -> Self {
        Issue::new(raw.key, raw.fields.summary.unwrap_or_default())
    }
}

impl JiraRestClient {
    pub fn new(
        base_url: impl Into<String>,
        login: impl Into<String>,
        api_token: SecretString,
        timeout: Duration,
    ) -> Result<Self, JiraSetupError> {
        let http =
            Client::builder().timeout(timeout).build().map_err(JiraSetupError::HttpClient)?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            login: login.into(),
            api_token,
        })
    }

    pub fn from_config(config: &JiraConfig) -> Result<Self, JiraSetupError> {
        let url = config.url.as_deref().ok_or(JiraSetupError::Missing("url"))?;
        let login = config.login.as_deref().ok_or(JiraSetupError::Missing("login"))?;
        let api_token = config.api_token.clone().ok_or(JiraSetupError::Missing("api_token"))?;
        Self::new(url, login, api_token, Duration::from_secs(config.timeout_secs))
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/rest/api/2/{path}", self.base_url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.basic_auth(&self.login, Some(self.api_token.expose_secret()))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, TrackerError> {
        self.authorized(request)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|error| TrackerError::Transport(error.to_string()))
    }
}

#[async_trait]
impl IssueTracker for JiraRestClient {
    async fn query_issues(&self, jql: &str) -> Result<Vec<Issue>, TrackerError> {
        debug!(jql, "searching jira issues");
        let page_size = SEARCH_PAGE_SIZE.to_string();
        let response = self
            .send(self.http.get(self.endpoint("search")).query(&[
                ("jql", jql),
                ("fields", "summary"),
                ("maxResults", page_size.as_str()),
            ]))
            .await?;
        let response = ensure_success(response).await?;
        let page = response
            .json::<SearchResponse>()
            .await
            .map_err(|error| TrackerError::Decode(error.to_string()))?;
        Ok(page.issues.into_iter().map(Issue::from).collect())
    }

    async fn get_issue(&self, key: &IssueKey) -> Result<Option<Issue>, TrackerError> {
        let response = self
            .send(
                self.http
                    .get(self.endpoint(&format!("issue/{key}")))
                    .query(&[("fields", "summary")]),
            )
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = ensure_success(response).await?;
        let issue = response
            .json::<RawIssue>()
            .await
            .map_err(|error| TrackerError::Decode(error.to_string()))?;
        Ok(Some(issue.into()))
    }

    async fn record_work(
        &self,
        key: &IssueKey,
        duration: WorkDuration,
        date: NaiveDate,
        note: &str,
    ) -> Result<(), TrackerError> {
        debug!(issue = %key, minutes = duration.num_minutes(), %date, "recording jira worklog");
        let response = self
            .send(
                self.http
                    .post(self.endpoint(&format!("issue/{key}/worklog")))
                    .json(&worklog_body(duration, date, note)),
            )
            .await?;
        ensure_success(response).await?;
        Ok(())
    }
}

/// Worklogs start at 09:00 UTC on the chosen day.
pub fn worklog_started(date: NaiveDate) -> String {
    format!("{}T09:00:00.000+0000", date.format("%Y-%m-%d"))
}

pub fn worklog_body(duration: WorkDuration, date: NaiveDate, note: &str) -> Value {
    json!({
        "timeSpent": format_jira_duration(duration),
        "started": worklog_started(date),
        "comment": note,
    })
}

async fn ensure_success(response: Response) -> Result<Response, TrackerError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(TrackerError::Api { status: status.as_u16(), message: error_message(&body) })
}

/// Jira reports failures as `errorMessages` plus a field map in `errors`.
pub fn error_message(body: &str) -> String {
    let Ok(payload) = serde_json::from_str::<Value>(body) else {
        return if body.trim().is_empty() { "empty response body".to_owned() } else { body.trim().to_owned() };
    };

    let mut messages: Vec<String> = payload
        .get("errorMessages")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).map(str::to_owned).collect())
        .unwrap_or_default();
    if let Some(fields) = payload.get("errors").and_then(Value::as_object) {
        messages.extend(
            fields
                .iter()
                .filter_map(|(field, message)| message.as_str().map(|text| format!("{field}: {text}"))),
        );
    }

    if messages.is_empty() {
        "unspecified jira error".to_owned()
    } else {
        messages.join("; ")
    }
}
