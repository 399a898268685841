use std::{sync::Arc, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use deskbot_core::ApplicationError;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::{
    blocks::{failure_message, MessageTemplate},
    client::ChatClient,
    commands::SlashCommandPayload,
    events::{EventContext, HandlerResult, InboundEvent, SlackEnvelope},
    router::{DispatchError, DispatchOutcome, EventRouter},
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport failed to connect: {0}")]
    Connect(String),
    #[error("transport read failed: {0}")]
    Receive(String),
    #[error("transport ack failed: {0}")]
    Acknowledge(String),
    #[error("transport disconnect failed: {0}")]
    Disconnect(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl ReconnectPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

#[async_trait]
pub trait SocketTransport: Send + Sync {
    async fn connect(&self) -> Result<(), TransportError>;
    /// `Ok(None)` means the stream ended cleanly and the runner should stop.
    async fn next_envelope(&self) -> Result<Option<SlackEnvelope>, TransportError>;
    async fn acknowledge(&self, envelope_id: &str) -> Result<(), TransportError>;
    async fn disconnect(&self) -> Result<(), TransportError>;
}

/// Pumps envelopes from a transport into the router. Each envelope is
/// acknowledged first, then handled on its own task.
pub struct SocketModeRunner {
    transport: Arc<dyn SocketTransport>,
    router: Arc<EventRouter>,
    chat: Arc<dyn ChatClient>,
    reconnect_policy: ReconnectPolicy,
}

impl SocketModeRunner {
    pub fn new(
        transport: Arc<dyn SocketTransport>,
        router: Arc<EventRouter>,
        chat: Arc<dyn ChatClient>,
        reconnect_policy: ReconnectPolicy,
    ) -> Self {
        Self { transport, router, chat, reconnect_policy }
    }

    pub async fn start(&self) -> Result<()> {
        let mut attempt = 0;
        loop {
            let mut connected = false;
            match self.connect_and_pump(attempt, &mut connected).await {
                Ok(()) => return Ok(()),
                Err(transport_error) => {
                    if connected {
                        attempt = 0;
                    }
                    warn!(
                        attempt,
                        max_retries = self.reconnect_policy.max_retries,
                        error = %transport_error,
                        "socket mode transport failed"
                    );

                    if attempt >= self.reconnect_policy.max_retries {
                        warn!(
                            max_retries = self.reconnect_policy.max_retries,
                            "socket mode retries exhausted; continuing process without crash"
                        );
                        return Ok(());
                    }

                    let delay = self.reconnect_policy.backoff(attempt);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
            }
        }
    }

    /// Closes the transport; used on process shutdown after `start` was abandoned.
    pub async fn shutdown(&self) -> Result<(), TransportError> {
        self.transport.disconnect().await
    }

    async fn connect_and_pump(
        &self,
        attempt: u32,
        connected: &mut bool,
    ) -> Result<(), TransportError> {
        info!(attempt, "opening socket mode transport connection");
        self.transport.connect().await?;
        *connected = true;
        info!(attempt, "socket mode transport connected");

        let mut in_flight = JoinSet::new();
        let outcome = self.pump(attempt, &mut in_flight).await;
        while in_flight.join_next().await.is_some() {}
        outcome
    }

    async fn pump(&self, attempt: u32, in_flight: &mut JoinSet<()>) -> Result<(), TransportError> {
        loop {
            // Reap finished handlers so the set does not grow unbounded.
            while in_flight.try_join_next().is_some() {}

            let Some(envelope) = self.transport.next_envelope().await? else {
                info!(attempt, "socket mode transport stream closed");
                self.transport.disconnect().await?;
                return Ok(());
            };
            let (user_id, channel_id) = correlation_fields(&envelope);

            info!(
                event_name = "ingress.slack.envelope_received",
                envelope_id = %envelope.envelope_id,
                event_kind = envelope.event.kind().map(|kind| kind.as_str()).unwrap_or("unsupported"),
                correlation_id = %envelope.envelope_id,
                user_id = user_id.unwrap_or("unknown"),
                channel_id = channel_id.unwrap_or("unknown"),
                "received slack envelope"
            );

            if let Err(error) = self.transport.acknowledge(&envelope.envelope_id).await {
                warn!(
                    event_name = "ingress.slack.ack_sent",
                    envelope_id = %envelope.envelope_id,
                    correlation_id = %envelope.envelope_id,
                    error = %error,
                    "failed to acknowledge slack envelope"
                );
            } else {
                debug!(
                    event_name = "ingress.slack.ack_sent",
                    envelope_id = %envelope.envelope_id,
                    correlation_id = %envelope.envelope_id,
                    "acknowledged slack envelope"
                );
            }

            let router = Arc::clone(&self.router);
            let chat = Arc::clone(&self.chat);
            in_flight.spawn(async move {
                handle_envelope(router, chat, envelope).await;
            });
        }
    }
}

async fn handle_envelope(router: Arc<EventRouter>, chat: Arc<dyn ChatClient>, envelope: SlackEnvelope) {
    let context = EventContext { correlation_id: envelope.envelope_id.clone() };

    match router.dispatch(&envelope, &context).await {
        Ok(DispatchOutcome::Unmatched) => {}
        Ok(DispatchOutcome::Handled(results)) => {
            for result in results {
                if let HandlerResult::Responded(message) = result {
                    deliver_reply(chat.as_ref(), &context, &envelope.event, &message).await;
                }
            }
        }
        Err(error) => report_failure(chat.as_ref(), &context, &envelope.event, error).await,
    }
}

/// Slash commands answer through their `response_url`; everything else is
/// posted to the originating channel.
async fn deliver_reply(
    chat: &dyn ChatClient,
    context: &EventContext,
    event: &InboundEvent,
    message: &MessageTemplate,
) {
    let delivery = match event {
        InboundEvent::SlashCommand(SlashCommandPayload { response_url: Some(response_url), .. }) => {
            chat.respond_to_command(response_url, message).await
        }
        _ => match event.channel_id() {
            Some(channel_id) => chat.post_message(channel_id, message).await.map(|_| ()),
            None => return,
        },
    };

    if let Err(error) = delivery {
        warn!(
            correlation_id = %context.correlation_id,
            channel_id = event.channel_id().unwrap_or("unknown"),
            error = %error,
            "failed to deliver handler reply"
        );
    }
}

async fn report_failure(
    chat: &dyn ChatClient,
    context: &EventContext,
    event: &InboundEvent,
    error: DispatchError,
) {
    warn!(
        event_name = "dispatch.handler_failed",
        correlation_id = %context.correlation_id,
        error = %error,
        "event dispatch failed; continuing socket loop"
    );

    if error.channel_id().is_none() {
        return;
    }
    let DispatchError::HandlerExecution { source, .. } = error;
    let interface = ApplicationError::from(source).into_interface(context.correlation_id.clone());
    let notice = failure_message(interface.user_message(), interface.correlation_id());
    deliver_reply(chat, context, event, &notice).await;
}

fn correlation_fields(envelope: &SlackEnvelope) -> (Option<&str>, Option<&str>) {
    match &envelope.event {
        InboundEvent::Unsupported { .. } => (None, None),
        event => (event.user_id(), event.channel_id()),
    }
}
