//! Modal with one of every input kind. The channel the modal was opened from
//! travels in the view's private metadata and is where results get posted.

use std::sync::Arc;

use async_trait::async_trait;
use deskbot_core::{state, ChannelContext};
use tracing::{info, warn};

use super::display_names;
use crate::{
    blocks::{BlockElement, ButtonElement, MessageBuilder, MessageTemplate, ModalBuilder, ModalView, SelectOption},
    client::ChatClient,
    events::{
        ComponentActionEvent, EventContext, EventHandler, FormClosedEvent, FormState,
        FormSubmissionEvent, HandlerError, HandlerResult, SelectedOption, TextMessageEvent,
    },
};

pub const MODAL_TRIGGER: &str = "modal demo";
pub const OPEN_MODAL_ACTION: &str = "open_modal";
pub const MODAL_CALLBACK_ID: &str = "modal_demo";

const TEXT_INPUT: &str = "text_input";
const SINGLE_SELECT: &str = "single_select";
const MULTI_SELECT: &str = "multi_select";
const DATE_PICKER: &str = "date_picker";
const TIME_PICKER: &str = "time_picker";
const RADIO: &str = "radio";
const CHECKBOX: &str = "checkbox";
const SINGLE_USER: &str = "single_user";

const NONE: &str = "none";

fn example_options() -> Vec<SelectOption> {
    vec![SelectOption::new("One", "1"), SelectOption::new("Two", "2"), SelectOption::new("Three", "3")]
}

pub fn intro_message() -> MessageTemplate {
    MessageBuilder::new("Here's the modal view demo")
        .section("modal_demo.intro.v1", |section| {
            section.plain("Here's the modal view demo");
        })
        .actions("modal_demo.actions.v1", |actions| {
            actions.button(ButtonElement::new(OPEN_MODAL_ACTION, "Open modal"));
        })
        .build()
}

pub fn demo_modal(context_token: String) -> ModalView {
    ModalBuilder::new(MODAL_CALLBACK_ID, "Example Modal")
        .submit("Submit")
        .notify_on_close()
        .private_metadata(context_token)
        .input("input_block", "Input", BlockElement::plain_text_input(TEXT_INPUT, "Enter some text"), true)
        .input(
            "single_select_block",
            "Single-select",
            BlockElement::static_select(SINGLE_SELECT, example_options()),
            true,
        )
        .input(
            "multi_select_block",
            "Multi-select",
            BlockElement::multi_static_select(MULTI_SELECT, example_options()),
            true,
        )
        .input("date_block", "Date", BlockElement::datepicker(DATE_PICKER, None), true)
        .input("time_block", "Time", BlockElement::timepicker(TIME_PICKER), true)
        .input("radio_block", "Radio options", BlockElement::radio_buttons(RADIO, example_options()), true)
        .input(
            "checkbox_block",
            "Checkbox options",
            BlockElement::checkboxes(CHECKBOX, example_options()),
            true,
        )
        .input("single_user_block", "Single user select", BlockElement::users_select(SINGLE_USER), true)
        .build()
}

fn option_text(option: Option<&SelectedOption>) -> String {
    option.map(|option| option.text.clone()).unwrap_or_else(|| NONE.to_owned())
}

fn options_text(options: &[SelectedOption]) -> String {
    if options.is_empty() {
        return NONE.to_owned();
    }
    options.iter().map(|option| option.text.as_str()).collect::<Vec<_>>().join(", ")
}

/// The "You entered:" summary, one `*Label:* value` line per field.
pub fn submission_summary(state: &FormState) -> MessageTemplate {
    let lines = [
        ("Input", state.text(TEXT_INPUT).map(str::to_owned).unwrap_or_else(|| NONE.to_owned())),
        ("Single-select", option_text(state.selected_option(SINGLE_SELECT))),
        ("Multi-select", options_text(state.selected_options(MULTI_SELECT))),
        (
            "Date",
            state
                .date(DATE_PICKER)
                .map(|date| date.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| NONE.to_owned()),
        ),
        (
            "Time",
            state
                .time(TIME_PICKER)
                .map(|time| time.format("%H:%M").to_string())
                .unwrap_or_else(|| NONE.to_owned()),
        ),
        ("Radio options", option_text(state.selected_option(RADIO))),
        ("Checkbox options", options_text(state.selected_options(CHECKBOX))),
        (
            "Single user select",
            state.user(SINGLE_USER).map(|user| format!("<@{user}>")).unwrap_or_else(|| NONE.to_owned()),
        ),
    ];
    let body = lines
        .iter()
        .map(|(label, value)| format!("*{label}:* {value}"))
        .collect::<Vec<_>>()
        .join("\n");

    MessageBuilder::new(format!("You entered: {}", state.text(TEXT_INPUT).unwrap_or_default()))
        .section("modal_demo.summary.v1", |section| {
            section.mrkdwn(format!("You entered:\n{body}"));
        })
        .build()
}

/// Recovers the originating channel, logging and dropping bad tokens.
fn channel_context(token: &str, ctx: &EventContext) -> Option<ChannelContext> {
    match state::decode::<ChannelContext>(token) {
        Ok(Some(context)) => Some(context),
        Ok(None) => {
            warn!(correlation_id = %ctx.correlation_id, "modal carried no channel context; nothing to post");
            None
        }
        Err(error) => {
            warn!(correlation_id = %ctx.correlation_id, error = %error, "modal channel context unreadable; nothing to post");
            None
        }
    }
}

pub struct ModalDemoFlow {
    chat: Arc<dyn ChatClient>,
}

impl ModalDemoFlow {
    pub fn new(chat: Arc<dyn ChatClient>) -> Self {
        Self { chat }
    }
}

#[async_trait]
impl EventHandler for ModalDemoFlow {
    fn name(&self) -> &'static str {
        "modal_demo"
    }

    async fn on_message(
        &self,
        event: &TextMessageEvent,
        ctx: &EventContext,
    ) -> Result<HandlerResult, HandlerError> {
        let (user, channel) =
            display_names(self.chat.as_ref(), &event.user_id, &event.channel_id).await;
        info!(
            event_name = "flow.modal_demo.requested",
            correlation_id = %ctx.correlation_id,
            user = %user,
            channel = %channel,
            "modal demo requested"
        );

        self.chat.post_message(&event.channel_id, &intro_message()).await?;
        Ok(HandlerResult::Processed)
    }

    async fn on_action(
        &self,
        event: &ComponentActionEvent,
        ctx: &EventContext,
    ) -> Result<HandlerResult, HandlerError> {
        let token = match event.channel_id.as_deref() {
            Some(channel_id) => {
                let channel_name = match event.channel_name.clone() {
                    Some(name) => name,
                    None => display_names(self.chat.as_ref(), &event.user_id, channel_id).await.1,
                };
                state::encode(&ChannelContext::new(channel_id, channel_name))
            }
            None => String::new(),
        };
        info!(
            event_name = "flow.modal_demo.opened",
            correlation_id = %ctx.correlation_id,
            user = event.user_name.as_deref().unwrap_or(&event.user_id),
            channel = event.channel_name.as_deref().unwrap_or("unknown"),
            "opening demo modal"
        );

        self.chat.open_view(&event.trigger_id, &demo_modal(token)).await?;
        Ok(HandlerResult::Processed)
    }

    async fn on_submission(
        &self,
        event: &FormSubmissionEvent,
        ctx: &EventContext,
    ) -> Result<HandlerResult, HandlerError> {
        let Some(context) = channel_context(&event.private_metadata, ctx) else {
            return Ok(HandlerResult::Ignored);
        };
        info!(
            event_name = "flow.modal_demo.submitted",
            correlation_id = %ctx.correlation_id,
            user = event.user_name.as_deref().unwrap_or(&event.user_id),
            channel = %context.channel_name,
            "demo modal submitted"
        );

        self.chat.post_message(&context.channel_id, &submission_summary(&event.state)).await?;
        Ok(HandlerResult::Processed)
    }

    async fn on_close(
        &self,
        event: &FormClosedEvent,
        ctx: &EventContext,
    ) -> Result<HandlerResult, HandlerError> {
        let Some(context) = channel_context(&event.private_metadata, ctx) else {
            return Ok(HandlerResult::Ignored);
        };
        info!(
            event_name = "flow.modal_demo.cancelled",
            correlation_id = %ctx.correlation_id,
            user = event.user_name.as_deref().unwrap_or(&event.user_id),
            channel = %context.channel_name,
            "demo modal cancelled"
        );

        self.chat
            .post_message(&context.channel_id, &MessageTemplate::plain("You cancelled the modal"))
            .await?;
        Ok(HandlerResult::Processed)
    }
}
