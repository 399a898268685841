use async_trait::async_trait;
use tracing::info;

use crate::{
    blocks::MessageTemplate,
    events::{EventContext, EventHandler, HandlerError, HandlerResult},
};

pub const ECHO_COMMAND: &str = "/echo";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlashCommandPayload {
    pub command: String,
    pub text: String,
    pub channel_id: String,
    pub channel_name: Option<String>,
    pub user_id: String,
    pub user_name: Option<String>,
    pub trigger_id: String,
    /// Slack's per-invocation webhook; replies posted here reach the caller
    /// even where the bot is not a channel member.
    pub response_url: Option<String>,
}

/// `/echo <text>` replies with the argument text as typed. A blank argument
/// gets no reply since Slack rejects empty messages.
#[derive(Default)]
pub struct EchoCommand;

#[async_trait]
impl EventHandler for EchoCommand {
    fn name(&self) -> &'static str {
        "echo"
    }

    async fn on_slash_command(
        &self,
        payload: &SlashCommandPayload,
        ctx: &EventContext,
    ) -> Result<HandlerResult, HandlerError> {
        info!(
            event_name = "flow.echo.received",
            correlation_id = %ctx.correlation_id,
            user_id = %payload.user_id,
            channel_id = %payload.channel_id,
            "echo command received"
        );

        if payload.text.trim().is_empty() {
            return Ok(HandlerResult::Processed);
        }
        Ok(HandlerResult::Responded(MessageTemplate::plain(payload.text.clone())))
    }
}
