//! A message that counts clicks by rewriting its own text.

use std::sync::Arc;

use async_trait::async_trait;
use deskbot_core::{counter, NotACounter};
use thiserror::Error;
use tracing::{debug, info};

use super::display_names;
use crate::{
    blocks::{Block, ButtonElement, MessageBuilder, MessageTemplate},
    client::ChatClient,
    events::{
        ComponentActionEvent, EventContext, EventHandler, HandlerError, HandlerResult,
        TextMessageEvent,
    },
};

pub const COUNTER_TRIGGER: &str = "counter demo";
pub const COUNTER_VALUE_BLOCK: &str = "counter.value.v1";
pub const COUNTER_ACTIONS_BLOCK: &str = "counter.actions.v1";
pub const INCREMENT_BUTTONS: [(&str, u64); 3] = [("add1", 1), ("add5", 5), ("add10", 10)];

/// Why a click left the message alone.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CounterMiss {
    #[error("clicked block `{0}` is not in the message")]
    ActionsBlockMissing(String),
    #[error("no section precedes the clicked block")]
    NoPrecedingSection,
    #[error(transparent)]
    NotACounter(#[from] NotACounter),
}

pub fn counter_message(value: u64) -> MessageTemplate {
    MessageBuilder::new("Counter demo")
        .section(COUNTER_VALUE_BLOCK, |section| {
            section.plain(counter::render(value));
        })
        .actions(COUNTER_ACTIONS_BLOCK, |actions| {
            for (action_id, increment) in INCREMENT_BUTTONS {
                actions.button(
                    ButtonElement::new(action_id, format!("Add {increment}"))
                        .value(increment.to_string()),
                );
            }
        })
        .build()
}

/// Applies `increment` to the counter section sitting directly above the
/// actions block `actions_block_id`, returning the rewritten block list.
pub fn apply_click(
    blocks: &[Block],
    actions_block_id: &str,
    increment: u64,
) -> Result<Vec<Block>, CounterMiss> {
    let actions_index = blocks
        .iter()
        .position(|block| block.block_id() == Some(actions_block_id))
        .ok_or_else(|| CounterMiss::ActionsBlockMissing(actions_block_id.to_owned()))?;
    let section_index = actions_index.checked_sub(1).ok_or(CounterMiss::NoPrecedingSection)?;

    let Block::Section { block_id, text: Some(text) } = &blocks[section_index] else {
        return Err(CounterMiss::NoPrecedingSection);
    };
    let next = counter::advance(text.text(), increment)?;

    let mut updated = blocks.to_vec();
    updated[section_index] =
        Block::Section { block_id: block_id.clone(), text: Some(text.with_text(next)) };
    Ok(updated)
}

pub struct CounterFlow {
    chat: Arc<dyn ChatClient>,
}

impl CounterFlow {
    pub fn new(chat: Arc<dyn ChatClient>) -> Self {
        Self { chat }
    }
}

#[async_trait]
impl EventHandler for CounterFlow {
    fn name(&self) -> &'static str {
        "counter"
    }

    async fn on_message(
        &self,
        event: &TextMessageEvent,
        ctx: &EventContext,
    ) -> Result<HandlerResult, HandlerError> {
        let (user, channel) =
            display_names(self.chat.as_ref(), &event.user_id, &event.channel_id).await;
        info!(
            event_name = "flow.counter.requested",
            correlation_id = %ctx.correlation_id,
            user = %user,
            channel = %channel,
            "counter demo requested"
        );

        self.chat.post_message(&event.channel_id, &counter_message(0)).await?;
        Ok(HandlerResult::Processed)
    }

    async fn on_action(
        &self,
        event: &ComponentActionEvent,
        ctx: &EventContext,
    ) -> Result<HandlerResult, HandlerError> {
        info!(
            event_name = "flow.counter.clicked",
            correlation_id = %ctx.correlation_id,
            user = event.user_name.as_deref().unwrap_or(&event.user_id),
            channel = event.channel_name.as_deref().unwrap_or("unknown"),
            button_value = event.value.as_deref().unwrap_or("none"),
            "counter button clicked"
        );

        let (Some(channel_id), Some(message)) = (event.channel_id.as_deref(), &event.message)
        else {
            debug!(correlation_id = %ctx.correlation_id, "counter click without a message; ignoring");
            return Ok(HandlerResult::Ignored);
        };
        let Some(increment) = event.value.as_deref().and_then(|value| value.trim().parse::<u64>().ok())
        else {
            debug!(correlation_id = %ctx.correlation_id, "counter click without numeric value; ignoring");
            return Ok(HandlerResult::Ignored);
        };

        let blocks = match apply_click(&message.blocks, &event.block_id, increment) {
            Ok(blocks) => blocks,
            Err(miss) => {
                debug!(correlation_id = %ctx.correlation_id, reason = %miss, "counter not updated");
                return Ok(HandlerResult::Ignored);
            }
        };

        let updated = MessageTemplate { fallback_text: message.text.clone(), blocks };
        self.chat.update_message(channel_id, &message.ts, &updated).await?;
        Ok(HandlerResult::Processed)
    }
}
