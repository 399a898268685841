use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::display_names;
use crate::{
    blocks::MessageTemplate,
    client::ChatClient,
    events::{EventContext, EventHandler, HandlerError, HandlerResult, TextMessageEvent},
};

pub const PING_TRIGGER: &str = "ping";

pub struct PingFlow {
    chat: Arc<dyn ChatClient>,
}

impl PingFlow {
    pub fn new(chat: Arc<dyn ChatClient>) -> Self {
        Self { chat }
    }
}

#[async_trait]
impl EventHandler for PingFlow {
    fn name(&self) -> &'static str {
        "ping"
    }

    async fn on_message(
        &self,
        event: &TextMessageEvent,
        ctx: &EventContext,
    ) -> Result<HandlerResult, HandlerError> {
        let (user, channel) =
            display_names(self.chat.as_ref(), &event.user_id, &event.channel_id).await;
        info!(
            event_name = "flow.ping.received",
            correlation_id = %ctx.correlation_id,
            user = %user,
            channel = %channel,
            "received ping"
        );

        self.chat.post_message(&event.channel_id, &MessageTemplate::plain("pong")).await?;
        Ok(HandlerResult::Processed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::PingFlow;
    use crate::{
        blocks::MessageTemplate,
        client::ChatClientError,
        events::{EventContext, EventHandler, HandlerError, HandlerResult, TextMessageEvent},
        recording::RecordingChatClient,
    };

    fn ping(text: &str) -> TextMessageEvent {
        TextMessageEvent {
            channel_id: "C1".to_owned(),
            user_id: "U1".to_owned(),
            text: text.to_owned(),
            ts: "1730000000.0001".to_owned(),
            thread_ts: None,
        }
    }

    #[tokio::test]
    async fn answers_pong_in_the_same_channel() {
        let chat = Arc::new(RecordingChatClient::default().with_user("U1", "jane"));
        let flow = PingFlow::new(chat.clone());

        let result = flow.on_message(&ping("Ping?"), &EventContext::default()).await.expect("ping");

        assert_eq!(result, HandlerResult::Processed);
        assert_eq!(chat.posted_messages().await, vec![("C1".to_owned(), MessageTemplate::plain("pong"))]);
    }

    #[tokio::test]
    async fn post_failure_surfaces_as_chat_error() {
        let error = ChatClientError::Api {
            method: "chat.postMessage".to_owned(),
            error: "not_in_channel".to_owned(),
        };
        let flow = PingFlow::new(Arc::new(RecordingChatClient::default().failing_with(error.clone())));

        let result = flow.on_message(&ping("ping"), &EventContext::default()).await;
        assert_eq!(result, Err(HandlerError::Chat(error)));
    }
}
