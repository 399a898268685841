use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::{counter::COUNTER_TRIGGER, modal::MODAL_TRIGGER, ping::PING_TRIGGER};
use crate::{
    blocks::{HomeView, MessageBuilder},
    client::ChatClient,
    commands::ECHO_COMMAND,
    events::{EventContext, EventHandler, HandlerError, HandlerResult, HomeOpenedEvent},
};

pub const HOME_TAB: &str = "home";

pub fn home_view() -> HomeView {
    let welcome = format!(
        "*Welcome to deskbot!* Here's what you can do:\n\
         • Say `{PING_TRIGGER}` and I'll answer `pong`\n\
         • Say `{COUNTER_TRIGGER}` for a message that counts button clicks\n\
         • Say `{MODAL_TRIGGER}` to try every modal input\n\
         • Use `{ECHO_COMMAND} <text>` to have your text repeated\n\
         • Say `jira autolog` to log today's work (when Jira is configured)"
    );
    let blocks = MessageBuilder::new("Welcome")
        .section("home.welcome.v1", |section| {
            section.mrkdwn(welcome);
        })
        .build()
        .blocks;
    HomeView::new(blocks)
}

pub struct AppHomeFlow {
    chat: Arc<dyn ChatClient>,
}

impl AppHomeFlow {
    pub fn new(chat: Arc<dyn ChatClient>) -> Self {
        Self { chat }
    }
}

#[async_trait]
impl EventHandler for AppHomeFlow {
    fn name(&self) -> &'static str {
        "app_home"
    }

    async fn on_home_opened(
        &self,
        event: &HomeOpenedEvent,
        ctx: &EventContext,
    ) -> Result<HandlerResult, HandlerError> {
        info!(
            event_name = "flow.app_home.opened",
            correlation_id = %ctx.correlation_id,
            user_id = %event.user_id,
            "publishing home tab"
        );

        self.chat
            .publish_home_view(&event.user_id, &home_view(), event.view_hash.as_deref())
            .await?;
        Ok(HandlerResult::Processed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{home_view, AppHomeFlow};
    use crate::{
        blocks::TextObject,
        events::{EventContext, EventHandler, HandlerResult, HomeOpenedEvent},
        recording::{ChatCall, RecordingChatClient},
    };

    #[test]
    fn home_view_lists_every_entry_point() {
        let view = home_view();
        let text = view.blocks[0].section_text().map(TextObject::text).unwrap_or_default();

        assert_eq!(view.kind, "home");
        for entry in ["`ping`", "`counter demo`", "`modal demo`", "`/echo <text>`", "`jira autolog`"] {
            assert!(text.contains(entry), "{entry}");
        }
    }

    #[tokio::test]
    async fn publishes_with_the_previous_view_hash() {
        let chat = Arc::new(RecordingChatClient::default());
        let flow = AppHomeFlow::new(chat.clone());
        let event = HomeOpenedEvent {
            user_id: "U1".to_owned(),
            tab: "home".to_owned(),
            view_hash: Some("h-1".to_owned()),
        };

        let result = flow.on_home_opened(&event, &EventContext::default()).await.expect("publish");

        assert_eq!(result, HandlerResult::Processed);
        assert_eq!(
            chat.calls().await,
            vec![ChatCall::PublishHomeView {
                user_id: "U1".to_owned(),
                view: home_view(),
                hash: Some("h-1".to_owned()),
            }]
        );
    }
}
