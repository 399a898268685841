use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use deskbot_core::{ApplicationError, TrackerError};
use thiserror::Error;

use crate::{
    blocks::{Block, MessageTemplate},
    client::ChatClientError,
    commands::SlashCommandPayload,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlackEnvelope {
    pub envelope_id: String,
    pub event: InboundEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InboundEvent {
    TextMessage(TextMessageEvent),
    SlashCommand(SlashCommandPayload),
    ComponentAction(ComponentActionEvent),
    FormSubmission(FormSubmissionEvent),
    FormClosed(FormClosedEvent),
    HomeOpened(HomeOpenedEvent),
    Unsupported { event_type: String },
}

impl InboundEvent {
    pub fn kind(&self) -> Option<EventKind> {
        match self {
            Self::TextMessage(_) => Some(EventKind::TextMessage),
            Self::SlashCommand(_) => Some(EventKind::SlashCommand),
            Self::ComponentAction(_) => Some(EventKind::ComponentAction),
            Self::FormSubmission(_) => Some(EventKind::FormSubmission),
            Self::FormClosed(_) => Some(EventKind::FormClosed),
            Self::HomeOpened(_) => Some(EventKind::HomeOpened),
            Self::Unsupported { .. } => None,
        }
    }

    /// The string registrations are matched against.
    pub fn matching_key(&self) -> Option<&str> {
        match self {
            Self::TextMessage(event) => Some(&event.text),
            Self::SlashCommand(payload) => Some(&payload.command),
            Self::ComponentAction(event) => Some(&event.action_id),
            Self::FormSubmission(event) => Some(&event.callback_id),
            Self::FormClosed(event) => Some(&event.callback_id),
            Self::HomeOpened(event) => Some(&event.tab),
            Self::Unsupported { .. } => None,
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::TextMessage(event) => Some(&event.user_id),
            Self::SlashCommand(payload) => Some(&payload.user_id),
            Self::ComponentAction(event) => Some(&event.user_id),
            Self::FormSubmission(event) => Some(&event.user_id),
            Self::FormClosed(event) => Some(&event.user_id),
            Self::HomeOpened(event) => Some(&event.user_id),
            Self::Unsupported { .. } => None,
        }
    }

    /// Conversation the event originated in, when Slack tells us.
    pub fn channel_id(&self) -> Option<&str> {
        match self {
            Self::TextMessage(event) => Some(&event.channel_id),
            Self::SlashCommand(payload) => Some(&payload.channel_id),
            Self::ComponentAction(event) => event.channel_id.as_deref(),
            Self::FormSubmission(_)
            | Self::FormClosed(_)
            | Self::HomeOpened(_)
            | Self::Unsupported { .. } => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    TextMessage,
    SlashCommand,
    ComponentAction,
    FormSubmission,
    FormClosed,
    HomeOpened,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TextMessage => "text_message",
            Self::SlashCommand => "slash_command",
            Self::ComponentAction => "component_action",
            Self::FormSubmission => "form_submission",
            Self::FormClosed => "form_closed",
            Self::HomeOpened => "home_opened",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextMessageEvent {
    pub channel_id: String,
    pub user_id: String,
    pub text: String,
    pub ts: String,
    pub thread_ts: Option<String>,
}

/// The message a clicked component lives in, as Slack reports it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageSnapshot {
    pub ts: String,
    pub text: String,
    pub blocks: Vec<Block>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentActionEvent {
    pub user_id: String,
    pub user_name: Option<String>,
    pub channel_id: Option<String>,
    pub channel_name: Option<String>,
    pub action_id: String,
    pub block_id: String,
    pub value: Option<String>,
    pub trigger_id: String,
    pub message: Option<MessageSnapshot>,
    pub view_metadata: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectedOption {
    pub text: String,
    pub value: String,
}

impl SelectedOption {
    pub fn new(text: impl Into<String>, value: impl Into<String>) -> Self {
        Self { text: text.into(), value: value.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FormValue {
    PlainText(Option<String>),
    StaticSelect(Option<SelectedOption>),
    MultiStaticSelect(Vec<SelectedOption>),
    Date(Option<NaiveDate>),
    Time(Option<NaiveTime>),
    RadioButtons(Option<SelectedOption>),
    Checkboxes(Vec<SelectedOption>),
    User(Option<String>),
}

/// Submitted modal values keyed by the input element's action id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormState {
    values: BTreeMap<String, FormValue>,
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, action_id: impl Into<String>, value: FormValue) -> Self {
        self.insert(action_id, value);
        self
    }

    pub fn insert(&mut self, action_id: impl Into<String>, value: FormValue) {
        self.values.insert(action_id.into(), value);
    }

    pub fn get(&self, action_id: &str) -> Option<&FormValue> {
        self.values.get(action_id)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn text(&self, action_id: &str) -> Option<&str> {
        match self.get(action_id) {
            Some(FormValue::PlainText(value)) => {
                value.as_deref().filter(|value| !value.trim().is_empty())
            }
            _ => None,
        }
    }

    pub fn selected_option(&self, action_id: &str) -> Option<&SelectedOption> {
        match self.get(action_id) {
            Some(FormValue::StaticSelect(option)) | Some(FormValue::RadioButtons(option)) => {
                option.as_ref()
            }
            _ => None,
        }
    }

    pub fn selected_options(&self, action_id: &str) -> &[SelectedOption] {
        match self.get(action_id) {
            Some(FormValue::MultiStaticSelect(options)) | Some(FormValue::Checkboxes(options)) => {
                options
            }
            _ => &[],
        }
    }

    pub fn date(&self, action_id: &str) -> Option<NaiveDate> {
        match self.get(action_id) {
            Some(FormValue::Date(date)) => *date,
            _ => None,
        }
    }

    pub fn time(&self, action_id: &str) -> Option<NaiveTime> {
        match self.get(action_id) {
            Some(FormValue::Time(time)) => *time,
            _ => None,
        }
    }

    pub fn user(&self, action_id: &str) -> Option<&str> {
        match self.get(action_id) {
            Some(FormValue::User(user)) => user.as_deref(),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormSubmissionEvent {
    pub user_id: String,
    pub user_name: Option<String>,
    pub view_id: String,
    pub callback_id: String,
    pub state: FormState,
    pub private_metadata: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormClosedEvent {
    pub user_id: String,
    pub user_name: Option<String>,
    pub view_id: String,
    pub callback_id: String,
    pub private_metadata: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HomeOpenedEvent {
    pub user_id: String,
    pub tab: String,
    pub view_hash: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    /// A reply the runner should post to the originating channel.
    Responded(MessageTemplate),
    Processed,
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HandlerError {
    #[error(transparent)]
    Chat(#[from] ChatClientError),
    #[error(transparent)]
    Tracker(#[from] TrackerError),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl From<HandlerError> for ApplicationError {
    fn from(value: HandlerError) -> Self {
        match value {
            HandlerError::Chat(error) => Self::Chat(error.to_string()),
            HandlerError::Tracker(error) => Self::Tracker(error),
            HandlerError::InvalidInput(message) => Self::InvalidInput(message),
        }
    }
}

/// One interactive feature. Each capability defaults to ignoring the event, so
/// a flow only implements what it registers for.
#[async_trait]
pub trait EventHandler: Send + Sync {
    fn name(&self) -> &'static str;

    async fn on_message(
        &self,
        _event: &TextMessageEvent,
        _ctx: &EventContext,
    ) -> Result<HandlerResult, HandlerError> {
        Ok(HandlerResult::Ignored)
    }

    async fn on_slash_command(
        &self,
        _payload: &SlashCommandPayload,
        _ctx: &EventContext,
    ) -> Result<HandlerResult, HandlerError> {
        Ok(HandlerResult::Ignored)
    }

    async fn on_action(
        &self,
        _event: &ComponentActionEvent,
        _ctx: &EventContext,
    ) -> Result<HandlerResult, HandlerError> {
        Ok(HandlerResult::Ignored)
    }

    async fn on_submission(
        &self,
        _event: &FormSubmissionEvent,
        _ctx: &EventContext,
    ) -> Result<HandlerResult, HandlerError> {
        Ok(HandlerResult::Ignored)
    }

    async fn on_close(
        &self,
        _event: &FormClosedEvent,
        _ctx: &EventContext,
    ) -> Result<HandlerResult, HandlerError> {
        Ok(HandlerResult::Ignored)
    }

    async fn on_home_opened(
        &self,
        _event: &HomeOpenedEvent,
        _ctx: &EventContext,
    ) -> Result<HandlerResult, HandlerError> {
        Ok(HandlerResult::Ignored)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{
        FormState, FormValue, HomeOpenedEvent, InboundEvent, SelectedOption, TextMessageEvent,
    };
    use crate::events::EventKind;

    #[test]
    fn text_message_key_is_the_message_text() {
        let event = InboundEvent::TextMessage(TextMessageEvent {
            channel_id: "C1".to_owned(),
            user_id: "U1".to_owned(),
            text: "please run a counter demo".to_owned(),
            ts: "1730000000.0001".to_owned(),
            thread_ts: None,
        });

        assert_eq!(event.kind(), Some(EventKind::TextMessage));
        assert_eq!(event.matching_key(), Some("please run a counter demo"));
        assert_eq!(event.channel_id(), Some("C1"));
    }

    #[test]
    fn home_and_unsupported_events_have_no_channel() {
        let home = InboundEvent::HomeOpened(HomeOpenedEvent {
            user_id: "U1".to_owned(),
            tab: "home".to_owned(),
            view_hash: None,
        });
        assert_eq!(home.channel_id(), None);
        assert_eq!(home.matching_key(), Some("home"));

        let unsupported = InboundEvent::Unsupported { event_type: "reaction_added".to_owned() };
        assert_eq!(unsupported.kind(), None);
        assert_eq!(unsupported.matching_key(), None);
    }

    #[test]
    fn form_state_accessors_are_typed() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 9).expect("date");
        let state = FormState::new()
            .with("text_input", FormValue::PlainText(Some("  ".to_owned())))
            .with("single_select", FormValue::StaticSelect(Some(SelectedOption::new("One", "1"))))
            .with(
                "multi_select",
                FormValue::MultiStaticSelect(vec![
                    SelectedOption::new("One", "1"),
                    SelectedOption::new("Two", "2"),
                ]),
            )
            .with("date_picker", FormValue::Date(Some(date)));

        assert_eq!(state.text("text_input"), None);
        assert_eq!(state.selected_option("single_select").map(|o| o.value.as_str()), Some("1"));
        assert_eq!(state.selected_options("multi_select").len(), 2);
        assert!(state.selected_options("single_select").is_empty());
        assert_eq!(state.date("date_picker"), Some(date));
        assert_eq!(state.time("date_picker"), None);
        assert_eq!(state.user("missing"), None);
    }
}
