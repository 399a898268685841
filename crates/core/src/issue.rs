use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IssueKey(pub String);

impl IssueKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for IssueKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub key: IssueKey,
    pub summary: String,
}

impl Issue {
    pub fn new(key: impl Into<String>, summary: impl Into<String>) -> Self {
        Self { key: IssueKey(key.into()), summary: summary.into() }
    }

    pub fn label(&self) -> String {
        if self.summary.trim().is_empty() {
            self.key.to_string()
        } else {
            format!("{} {}", self.key, self.summary.trim())
        }
    }
}

/// Keeps the first occurrence of every key, preserving order.
pub fn dedupe_by_key(issues: Vec<Issue>) -> Vec<Issue> {
    let mut seen = HashSet::new();
    issues.into_iter().filter(|issue| seen.insert(issue.key.clone())).collect()
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TrackerError {
    #[error("issue tracker request failed: {0}")]
    Transport(String),
    #[error("issue tracker rejected request ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("issue tracker response could not be decoded: {0}")]
    Decode(String),
}

#[async_trait]
pub trait IssueTracker: Send + Sync {
    async fn query_issues(&self, jql: &str) -> Result<Vec<Issue>, TrackerError>;

    async fn get_issue(&self, key: &IssueKey) -> Result<Option<Issue>, TrackerError>;

    async fn record_work(
        &self,
        key: &IssueKey,
        duration: Duration,
        date: NaiveDate,
        note: &str,
    ) -> Result<(), TrackerError>;
}

/// JQL selecting the issues an assignee had in progress on `date`.
pub fn in_progress_jql(assignee: &str, date: NaiveDate) -> String {
    format!(
        "assignee={assignee} AND type in standardIssueTypes() AND (Status was in (\"In Development\",\"In Progress\") ON {})",
        date.format("%Y-%m-%d")
    )
}

/// JQL for a free-text search, optionally scoped to an assignee.
pub fn text_search_jql(text: &str, assignee: Option<&str>) -> String {
    let escaped = text.replace('\\', "\\\\").replace('"', "\\\"");
    match assignee {
        Some(assignee) => format!("assignee={assignee} AND text ~ \"{escaped}\" ORDER BY updated DESC"),
        None => format!("text ~ \"{escaped}\" ORDER BY updated DESC"),
    }
}
