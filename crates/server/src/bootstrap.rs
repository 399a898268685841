use std::{sync::Arc, time::Duration};

use chrono::Duration as WorkDuration;
use deskbot_core::{
    config::{AppConfig, ConfigError, LoadOptions},
    IssueTracker,
};
use deskbot_slack::{
    client::{ChatClient, ChatClientError},
    flows::{register_default_flows, system_clock, FlowDependencies, WorklogSettings},
    router::{EventRouter, RouterError},
    socket::{ReconnectPolicy, SocketModeRunner, TransportError},
    web::SlackWebClient,
    ws::WebSocketTransport,
};
use thiserror::Error;
use tracing::info;

use crate::jira::{JiraRestClient, JiraSetupError};

pub struct Application {
    pub config: AppConfig,
    pub router: Arc<EventRouter>,
    pub slack_runner: SocketModeRunner,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("event router configuration failed: {0}")]
    Router(#[from] RouterError),
    #[error("slack web client could not be built: {0}")]
    SlackClient(#[source] ChatClientError),
    #[error("slack socket transport could not be built: {0}")]
    SlackTransport(#[source] TransportError),
    #[error("jira client could not be built: {0}")]
    Jira(#[from] JiraSetupError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let chat: Arc<dyn ChatClient> =
        Arc::new(SlackWebClient::from_config(&config.slack).map_err(BootstrapError::SlackClient)?);

    let mut deps = FlowDependencies::new(Arc::clone(&chat));
    if config.jira.enabled {
        let tracker: Arc<dyn IssueTracker> = Arc::new(JiraRestClient::from_config(&config.jira)?);
        deps = deps.with_tracker(tracker, worklog_settings(&config));
        info!(
            event_name = "system.bootstrap.jira_enabled",
            correlation_id = "bootstrap",
            "jira work logging enabled"
        );
    }

    let mut builder = EventRouter::builder();
    register_default_flows(&mut builder, deps)?;
    let router = Arc::new(builder.build());
    info!(
        event_name = "system.bootstrap.router_ready",
        correlation_id = "bootstrap",
        handler_count = router.handler_count(),
        "event router built"
    );

    let transport = WebSocketTransport::new(
        config.slack.api_base_url.clone(),
        config.slack.app_token.clone(),
        Duration::from_secs(config.slack.timeout_secs),
    )
    .map_err(BootstrapError::SlackTransport)?;
    let slack_runner = SocketModeRunner::new(
        Arc::new(transport),
        Arc::clone(&router),
        chat,
        ReconnectPolicy::default(),
    );

    Ok(Application { config, router, slack_runner })
}

fn worklog_settings(config: &AppConfig) -> WorklogSettings {
    WorklogSettings {
        assignee: config.jira.effective_assignee().map(str::to_owned),
        budget: WorkDuration::minutes(i64::from(config.jira.worklog_budget_minutes)),
        clock: system_clock,
    }
}
