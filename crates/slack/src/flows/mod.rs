//! The interactive features the bot ships with, and their registration.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use deskbot_core::IssueTracker;
use tracing::debug;

use crate::{
    client::ChatClient,
    commands::{EchoCommand, ECHO_COMMAND},
    router::{RouterBuilder, RouterError},
};

pub mod counter;
pub mod home;
pub mod modal;
pub mod ping;
pub mod worklog;

pub use counter::CounterFlow;
pub use home::AppHomeFlow;
pub use modal::ModalDemoFlow;
pub use ping::PingFlow;
pub use worklog::{WorklogFlow, WorklogSettings};

pub type Clock = fn() -> DateTime<Utc>;

pub fn system_clock() -> DateTime<Utc> {
    Utc::now()
}

pub struct FlowDependencies {
    pub chat: Arc<dyn ChatClient>,
    /// Work logging is only registered when a tracker is configured.
    pub tracker: Option<Arc<dyn IssueTracker>>,
    pub worklog: WorklogSettings,
}

impl FlowDependencies {
    pub fn new(chat: Arc<dyn ChatClient>) -> Self {
        Self { chat, tracker: None, worklog: WorklogSettings::default() }
    }

    pub fn with_tracker(mut self, tracker: Arc<dyn IssueTracker>, settings: WorklogSettings) -> Self {
        self.tracker = Some(tracker);
        self.worklog = settings;
        self
    }
}

pub fn register_default_flows(
    builder: &mut RouterBuilder,
    deps: FlowDependencies,
) -> Result<(), RouterError> {
    let ping = Arc::new(PingFlow::new(Arc::clone(&deps.chat)));
    builder.on_message(ping::PING_TRIGGER, ping)?;

    let counter = Arc::new(CounterFlow::new(Arc::clone(&deps.chat)));
    builder.on_message(counter::COUNTER_TRIGGER, counter.clone())?;
    for (action_id, _) in counter::INCREMENT_BUTTONS {
        builder.on_action(action_id, counter.clone())?;
    }

    let modal = Arc::new(ModalDemoFlow::new(Arc::clone(&deps.chat)));
    builder.on_message(modal::MODAL_TRIGGER, modal.clone())?;
    builder.on_action(modal::OPEN_MODAL_ACTION, modal.clone())?;
    builder.on_view(modal::MODAL_CALLBACK_ID, modal)?;

    if let Some(tracker) = deps.tracker {
        let worklog = Arc::new(WorklogFlow::new(Arc::clone(&deps.chat), tracker, deps.worklog));
        builder.on_message(worklog::JIRA_TRIGGER, worklog.clone())?;
        builder.on_action(worklog::OPEN_WORKLOG_ACTION, worklog.clone())?;
        builder.on_view(worklog::WORKLOG_CALLBACK_ID, worklog)?;
    }

    builder.on_slash_command(ECHO_COMMAND, Arc::new(EchoCommand))?;
    builder.on_home_opened(home::HOME_TAB, Arc::new(AppHomeFlow::new(deps.chat)))?;

    Ok(())
}

/// User and channel names for log lines; ids stand in when lookups fail.
pub(crate) async fn display_names(
    chat: &dyn ChatClient,
    user_id: &str,
    channel_id: &str,
) -> (String, String) {
    let user = match chat.user_name(user_id).await {
        Ok(name) => name,
        Err(error) => {
            debug!(user_id, error = %error, "user lookup failed; logging id");
            user_id.to_owned()
        }
    };
    let channel = match chat.channel_name(channel_id).await {
        Ok(name) => name,
        Err(error) => {
            debug!(channel_id, error = %error, "channel lookup failed; logging id");
            channel_id.to_owned()
        }
    };
    (user, channel)
}
