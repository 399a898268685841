//! Decoding of Socket Mode frames into [`InboundEvent`]s.
//!
//! Slack wraps every delivery in a frame with a `type` and an `envelope_id`.
//! Three frame types carry events (`events_api`, `slash_commands`,
//! `interactive`); `hello` and `disconnect` are connection control. Payloads we
//! do not route, or cannot decode, become [`InboundEvent::Unsupported`] so they
//! are still acknowledged.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    blocks::Block,
    commands::SlashCommandPayload,
    events::{
        ComponentActionEvent, FormClosedEvent, FormState, FormSubmissionEvent, FormValue,
        HomeOpenedEvent, InboundEvent, MessageSnapshot, SelectedOption, SlackEnvelope,
        TextMessageEvent,
    },
};

#[derive(Debug, Error)]
pub enum WireError {
    #[error("socket mode frame is not valid json: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WireMessage {
    Hello,
    Disconnect { reason: String },
    Envelope(SlackEnvelope),
}

pub fn parse_frame(text: &str) -> Result<WireMessage, WireError> {
    let frame: RawFrame = serde_json::from_str(text)?;

    let event = match frame.frame_type.as_str() {
        "hello" => return Ok(WireMessage::Hello),
        "disconnect" => {
            return Ok(WireMessage::Disconnect {
                reason: frame.reason.unwrap_or_else(|| "unspecified".to_owned()),
            })
        }
        "events_api" => decode_payload::<RawEventCallback>("events_api", frame.payload)
            .map(events_api_event),
        "slash_commands" => {
            decode_payload::<RawSlashCommand>("slash_commands", frame.payload).map(slash_event)
        }
        "interactive" => {
            decode_payload::<RawInteraction>("interactive", frame.payload).map(interactive_event)
        }
        other => {
            debug!(frame_type = other, "ignoring unknown socket mode frame type");
            None
        }
    }
    .unwrap_or_else(|| InboundEvent::Unsupported { event_type: frame.frame_type.clone() });

    let envelope_id = frame.envelope_id.unwrap_or_else(|| Uuid::new_v4().to_string());
    Ok(WireMessage::Envelope(SlackEnvelope { envelope_id, event }))
}

fn decode_payload<T: DeserializeOwned>(frame_type: &str, payload: Value) -> Option<T> {
    match serde_json::from_value(payload) {
        Ok(decoded) => Some(decoded),
        Err(error) => {
            warn!(frame_type, error = %error, "socket mode payload could not be decoded");
            None
        }
    }
}

#[derive(Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    frame_type: String,
    #[serde(default)]
    envelope_id: Option<String>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    payload: Value,
}

#[derive(Deserialize)]
struct RawEventCallback {
    event: RawEvent,
}

#[derive(Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    subtype: Option<String>,
    #[serde(default)]
    bot_id: Option<String>,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    ts: Option<String>,
    #[serde(default)]
    thread_ts: Option<String>,
    #[serde(default)]
    tab: Option<String>,
    #[serde(default)]
    view: Option<RawView>,
}

fn events_api_event(callback: RawEventCallback) -> InboundEvent {
    let event = callback.event;
    match event.event_type.as_str() {
        "message" if event.bot_id.is_some() => {
            InboundEvent::Unsupported { event_type: "message.bot".to_owned() }
        }
        "message" if event.subtype.is_some() => InboundEvent::Unsupported {
            event_type: format!("message.{}", event.subtype.unwrap_or_default()),
        },
        "message" => match (event.user, event.channel) {
            (Some(user_id), Some(channel_id)) => InboundEvent::TextMessage(TextMessageEvent {
                channel_id,
                user_id,
                text: event.text.unwrap_or_default(),
                ts: event.ts.unwrap_or_default(),
                thread_ts: event.thread_ts,
            }),
            _ => InboundEvent::Unsupported { event_type: "message.anonymous".to_owned() },
        },
        "app_home_opened" => match event.user {
            Some(user_id) => InboundEvent::HomeOpened(HomeOpenedEvent {
                user_id,
                tab: event.tab.unwrap_or_else(|| "home".to_owned()),
                view_hash: event.view.and_then(|view| view.hash),
            }),
            None => InboundEvent::Unsupported { event_type: "app_home_opened".to_owned() },
        },
        _ => InboundEvent::Unsupported { event_type: event.event_type },
    }
}

#[derive(Deserialize)]
struct RawSlashCommand {
    command: String,
    #[serde(default)]
    text: String,
    channel_id: String,
    #[serde(default)]
    channel_name: Option<String>,
    user_id: String,
    #[serde(default)]
    user_name: Option<String>,
    #[serde(default)]
    trigger_id: String,
    #[serde(default)]
    response_url: Option<String>,
}

fn slash_event(raw: RawSlashCommand) -> InboundEvent {
    InboundEvent::SlashCommand(SlashCommandPayload {
        command: raw.command,
        text: raw.text,
        channel_id: raw.channel_id,
        channel_name: raw.channel_name,
        user_id: raw.user_id,
        user_name: raw.user_name,
        trigger_id: raw.trigger_id,
        response_url: raw.response_url.filter(|url| !url.is_empty()),
    })
}

#[derive(Deserialize)]
struct RawInteraction {
    #[serde(rename = "type")]
    interaction_type: String,
    user: RawUser,
    #[serde(default)]
    channel: Option<RawChannel>,
    #[serde(default)]
    trigger_id: String,
    #[serde(default)]
    actions: Vec<RawAction>,
    #[serde(default)]
    message: Option<RawMessage>,
    #[serde(default)]
    view: Option<RawView>,
}

#[derive(Deserialize)]
struct RawUser {
    id: String,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

impl RawUser {
    fn display_name(&self) -> Option<String> {
        self.username.clone().or_else(|| self.name.clone())
    }
}

#[derive(Deserialize)]
struct RawChannel {
    id: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
struct RawAction {
    action_id: String,
    #[serde(default)]
    block_id: String,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    selected_option: Option<RawOption>,
}

#[derive(Deserialize)]
struct RawMessage {
    ts: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    blocks: Vec<Block>,
}

#[derive(Deserialize)]
struct RawView {
    #[serde(default)]
    id: String,
    #[serde(default)]
    callback_id: String,
    #[serde(default)]
    private_metadata: String,
    #[serde(default)]
    hash: Option<String>,
    #[serde(default)]
    state: Option<RawViewState>,
}

#[derive(Deserialize)]
struct RawViewState {
    #[serde(default)]
    values: BTreeMap<String, BTreeMap<String, RawStateValue>>,
}

#[derive(Deserialize)]
struct RawStateValue {
    #[serde(rename = "type")]
    element_type: String,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    selected_option: Option<RawOption>,
    #[serde(default)]
    selected_options: Vec<RawOption>,
    #[serde(default)]
    selected_date: Option<String>,
    #[serde(default)]
    selected_time: Option<String>,
    #[serde(default)]
    selected_user: Option<String>,
}

#[derive(Deserialize)]
struct RawOption {
    text: RawText,
    value: String,
}

#[derive(Deserialize)]
struct RawText {
    text: String,
}

impl From<RawOption> for SelectedOption {
    fn from(option: RawOption) -> Self {
        SelectedOption::new(option.text.text, option.value)
    }
}

fn interactive_event(raw: RawInteraction) -> InboundEvent {
    let user_name = raw.user.display_name();
    match raw.interaction_type.as_str() {
        "block_actions" => {
            let Some(action) = raw.actions.into_iter().next() else {
                return InboundEvent::Unsupported { event_type: "block_actions.empty".to_owned() };
            };
            let (channel_id, channel_name) = match raw.channel {
                Some(channel) => (Some(channel.id), channel.name),
                None => (None, None),
            };
            let value =
                action.value.or_else(|| action.selected_option.map(|option| option.value));
            InboundEvent::ComponentAction(ComponentActionEvent {
                user_id: raw.user.id,
                user_name,
                channel_id,
                channel_name,
                action_id: action.action_id,
                block_id: action.block_id,
                value,
                trigger_id: raw.trigger_id,
                message: raw.message.map(|message| MessageSnapshot {
                    ts: message.ts,
                    text: message.text,
                    blocks: message.blocks,
                }),
                view_metadata: raw.view.map(|view| view.private_metadata),
            })
        }
        "view_submission" => match raw.view {
            Some(view) => InboundEvent::FormSubmission(FormSubmissionEvent {
                user_id: raw.user.id,
                user_name,
                view_id: view.id,
                callback_id: view.callback_id,
                state: view.state.map(form_state).unwrap_or_default(),
                private_metadata: view.private_metadata,
            }),
            None => InboundEvent::Unsupported { event_type: "view_submission".to_owned() },
        },
        "view_closed" => match raw.view {
            Some(view) => InboundEvent::FormClosed(FormClosedEvent {
                user_id: raw.user.id,
                user_name,
                view_id: view.id,
                callback_id: view.callback_id,
                private_metadata: view.private_metadata,
            }),
            None => InboundEvent::Unsupported { event_type: "view_closed".to_owned() },
        },
        other => InboundEvent::Unsupported { event_type: format!("interactive.{other}") },
    }
}

/// Flattens `block_id -> action_id -> value` into a map keyed by action id.
fn form_state(raw: RawViewState) -> FormState {
    let mut state = FormState::new();
    for (action_id, value) in raw.values.into_values().flatten() {
        match form_value(value) {
            Some(value) => state.insert(action_id, value),
            None => debug!(action_id = %action_id, "skipping unsupported form element"),
        }
    }
    state
}

fn form_value(raw: RawStateValue) -> Option<FormValue> {
    let value = match raw.element_type.as_str() {
        "plain_text_input" => FormValue::PlainText(raw.value),
        "static_select" => FormValue::StaticSelect(raw.selected_option.map(Into::into)),
        "multi_static_select" => {
            FormValue::MultiStaticSelect(raw.selected_options.into_iter().map(Into::into).collect())
        }
        "datepicker" => FormValue::Date(
            raw.selected_date
                .and_then(|date| NaiveDate::parse_from_str(&date, "%Y-%m-%d").ok()),
        ),
        "timepicker" => FormValue::Time(
            raw.selected_time.and_then(|time| NaiveTime::parse_from_str(&time, "%H:%M").ok()),
        ),
        "radio_buttons" => FormValue::RadioButtons(raw.selected_option.map(Into::into)),
        "checkboxes" => {
            FormValue::Checkboxes(raw.selected_options.into_iter().map(Into::into).collect())
        }
        "users_select" => FormValue::User(raw.selected_user),
        _ => return None,
    };
    Some(value)
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};
    use serde_json::json;

    use super::{parse_frame, WireMessage};
    use crate::{
        blocks::TextObject,
        events::{InboundEvent, SlackEnvelope},
    };

    fn decode(frame: serde_json::Value) -> SlackEnvelope {
        match parse_frame(&frame.to_string()).expect("frame should parse") {
            WireMessage::Envelope(envelope) => envelope,
            other => panic!("expected envelope, got {other:?}"),
        }
    }

    #[test]
    fn control_frames_are_recognised() {
        assert_eq!(
            parse_frame(r#"{"type":"hello","num_connections":1}"#).expect("hello"),
            WireMessage::Hello
        );
        assert_eq!(
            parse_frame(r#"{"type":"disconnect","reason":"refresh_requested"}"#).expect("disconnect"),
            WireMessage::Disconnect { reason: "refresh_requested".to_owned() }
        );
        assert!(parse_frame("not json").is_err());
    }

    #[test]
    fn user_message_becomes_text_message() {
        let envelope = decode(json!({
            "type": "events_api",
            "envelope_id": "env-1",
            "payload": {"event": {
                "type": "message", "channel": "C1", "user": "U1",
                "text": "please run a counter demo", "ts": "1730000000.0001"
            }}
        }));

        assert_eq!(envelope.envelope_id, "env-1");
        let InboundEvent::TextMessage(message) = envelope.event else {
            panic!("expected text message");
        };
        assert_eq!(message.channel_id, "C1");
        assert_eq!(message.text, "please run a counter demo");
        assert_eq!(message.thread_ts, None);
    }

    #[test]
    fn bot_and_edited_messages_are_unsupported() {
        let bot = decode(json!({
            "type": "events_api", "envelope_id": "env-2",
            "payload": {"event": {"type": "message", "channel": "C1", "bot_id": "B1", "text": "pong"}}
        }));
        assert_eq!(bot.event, InboundEvent::Unsupported { event_type: "message.bot".to_owned() });

        let edited = decode(json!({
            "type": "events_api", "envelope_id": "env-3",
            "payload": {"event": {"type": "message", "subtype": "message_changed", "channel": "C1"}}
        }));
        assert_eq!(
            edited.event,
            InboundEvent::Unsupported { event_type: "message.message_changed".to_owned() }
        );
    }

    #[test]
    fn app_home_opened_carries_tab_and_hash() {
        let envelope = decode(json!({
            "type": "events_api", "envelope_id": "env-4",
            "payload": {"event": {"type": "app_home_opened", "user": "U1", "tab": "home", "view": {"hash": "h-1"}}}
        }));

        let InboundEvent::HomeOpened(home) = envelope.event else {
            panic!("expected home opened");
        };
        assert_eq!(home.tab, "home");
        assert_eq!(home.view_hash.as_deref(), Some("h-1"));
    }

    #[test]
    fn slash_command_payload_is_mapped() {
        let envelope = decode(json!({
            "type": "slash_commands", "envelope_id": "env-5",
            "payload": {
                "command": "/echo", "text": "hello world", "channel_id": "C1",
                "channel_name": "general", "user_id": "U1", "user_name": "jane",
                "trigger_id": "T1", "response_url": "https://hooks.slack.com/commands/T1/1/abc"
            }
        }));

        let InboundEvent::SlashCommand(payload) = envelope.event else {
            panic!("expected slash command");
        };
        assert_eq!(payload.command, "/echo");
        assert_eq!(payload.text, "hello world");
        assert_eq!(payload.channel_name.as_deref(), Some("general"));
        assert_eq!(payload.response_url.as_deref(), Some("https://hooks.slack.com/commands/T1/1/abc"));
    }

    #[test]
    fn block_action_keeps_message_snapshot() {
        let envelope = decode(json!({
            "type": "interactive", "envelope_id": "env-6",
            "payload": {
                "type": "block_actions",
                "user": {"id": "U1", "username": "jane"},
                "channel": {"id": "C1", "name": "general"},
                "trigger_id": "T1",
                "actions": [{"type": "button", "action_id": "add5", "block_id": "counter.actions.v1", "value": "5"}],
                "message": {"ts": "1730000000.0001", "text": "Counter", "blocks": [
                    {"type": "section", "block_id": "counter.value.v1", "text": {"type": "plain_text", "text": "Counter: 3", "emoji": true}},
                    {"type": "actions", "block_id": "counter.actions.v1", "elements": []}
                ]}
            }
        }));

        let InboundEvent::ComponentAction(action) = envelope.event else {
            panic!("expected component action");
        };
        assert_eq!(action.action_id, "add5");
        assert_eq!(action.value.as_deref(), Some("5"));
        assert_eq!(action.user_name.as_deref(), Some("jane"));
        assert_eq!(action.channel_name.as_deref(), Some("general"));
        let message = action.message.expect("snapshot");
        assert_eq!(message.ts, "1730000000.0001");
        assert_eq!(message.blocks[0].section_text(), Some(&TextObject::plain("Counter: 3")));
    }

    #[test]
    fn view_submission_flattens_state_by_action_id() {
        let envelope = decode(json!({
            "type": "interactive", "envelope_id": "env-7",
            "payload": {
                "type": "view_submission",
                "user": {"id": "U1", "name": "jane"},
                "view": {
                    "id": "V1", "callback_id": "modal_demo",
                    "private_metadata": "{\"channel_id\":\"C1\",\"channel_name\":\"general\"}",
                    "state": {"values": {
                        "input_block": {"text_input": {"type": "plain_text_input", "value": "hi"}},
                        "single_select_block": {"single_select": {"type": "static_select",
                            "selected_option": {"text": {"type": "plain_text", "text": "Two"}, "value": "2"}}},
                        "multi_select_block": {"multi_select": {"type": "multi_static_select", "selected_options": []}},
                        "date_block": {"date_picker": {"type": "datepicker", "selected_date": "2026-03-09"}},
                        "time_block": {"time_picker": {"type": "timepicker", "selected_time": "14:30"}},
                        "single_user_block": {"single_user": {"type": "users_select", "selected_user": "U2"}},
                        "other_block": {"rich": {"type": "rich_text_input"}}
                    }}
                }
            }
        }));

        let InboundEvent::FormSubmission(submission) = envelope.event else {
            panic!("expected submission");
        };
        assert_eq!(submission.callback_id, "modal_demo");
        assert_eq!(submission.user_name.as_deref(), Some("jane"));
        let state = &submission.state;
        assert_eq!(state.text("text_input"), Some("hi"));
        assert_eq!(state.selected_option("single_select").map(|o| o.text.as_str()), Some("Two"));
        assert!(state.selected_options("multi_select").is_empty());
        assert_eq!(state.date("date_picker"), NaiveDate::from_ymd_opt(2026, 3, 9));
        assert_eq!(state.time("time_picker"), NaiveTime::from_hms_opt(14, 30, 0));
        assert_eq!(state.user("single_user"), Some("U2"));
        assert!(state.get("rich").is_none());
    }

    #[test]
    fn view_closed_keeps_private_metadata() {
        let envelope = decode(json!({
            "type": "interactive", "envelope_id": "env-8",
            "payload": {
                "type": "view_closed",
                "user": {"id": "U1"},
                "view": {"id": "V1", "callback_id": "modal_demo", "private_metadata": "token"}
            }
        }));

        let InboundEvent::FormClosed(closed) = envelope.event else {
            panic!("expected close");
        };
        assert_eq!(closed.private_metadata, "token");
    }

    #[test]
    fn unknown_frames_are_acknowledgeable_but_unsupported() {
        let envelope = decode(json!({"type": "options_request", "envelope_id": "env-9", "payload": {}}));
        assert_eq!(envelope.envelope_id, "env-9");
        assert_eq!(
            envelope.event,
            InboundEvent::Unsupported { event_type: "options_request".to_owned() }
        );

        let undecodable = decode(json!({"type": "slash_commands", "payload": {"text": "x"}}));
        assert!(!undecodable.envelope_id.is_empty());
        assert_eq!(
            undecodable.event,
            InboundEvent::Unsupported { event_type: "slash_commands".to_owned() }
        );
    }
}
