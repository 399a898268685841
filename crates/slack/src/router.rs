//! Routes inbound events to registered handlers.
//!
//! Registrations are collected by [`RouterBuilder`] at startup and frozen into
//! an [`EventRouter`], which is read-only afterwards and can be shared across
//! concurrently dispatched events.
//!
//! Text messages fan out to every handler whose trigger occurs in the text,
//! case-insensitively, in registration order. Every other event kind resolves
//! to at most one handler by exact key. Events nobody registered for are not
//! errors.

use std::{collections::HashMap, sync::Arc};

use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    events::{EventContext, EventHandler, EventKind, HandlerError, HandlerResult, InboundEvent, SlackEnvelope},
    matcher::{normalize_trigger, text_matches},
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouterError {
    #[error("duplicate {kind} registration for `{key}`")]
    DuplicateRegistration { kind: EventKind, key: String },
    #[error("{kind} registration requires a non-empty key")]
    EmptyKey { kind: EventKind },
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(
        "handler `{handler}` failed on {kind} `{key}` (user {user_id}, channel {}): {source}",
        .channel_id.as_deref().unwrap_or("none")
    )]
    HandlerExecution {
        kind: EventKind,
        key: String,
        handler: &'static str,
        user_id: String,
        channel_id: Option<String>,
        #[source]
        source: HandlerError,
    },
}

impl DispatchError {
    pub fn channel_id(&self) -> Option<&str> {
        match self {
            Self::HandlerExecution { channel_id, .. } => channel_id.as_deref(),
        }
    }

    pub fn handler_error(&self) -> &HandlerError {
        match self {
            Self::HandlerExecution { source, .. } => source,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    Unmatched,
    Handled(Vec<HandlerResult>),
}

struct TextRoute {
    trigger: String,
    handler: Arc<dyn EventHandler>,
}

#[derive(Default)]
pub struct RouterBuilder {
    text_routes: Vec<TextRoute>,
    exact_routes: HashMap<(EventKind, String), Arc<dyn EventHandler>>,
}

impl RouterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        kind: EventKind,
        key: impl Into<String>,
        handler: Arc<dyn EventHandler>,
    ) -> Result<&mut Self, RouterError> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(RouterError::EmptyKey { kind });
        }

        match kind {
            EventKind::TextMessage => {
                let trigger = normalize_trigger(&key);
                if self.text_routes.iter().any(|route| route.trigger == trigger) {
                    return Err(RouterError::DuplicateRegistration { kind, key });
                }
                self.text_routes.push(TextRoute { trigger, handler });
            }
            EventKind::SlashCommand
            | EventKind::ComponentAction
            | EventKind::FormSubmission
            | EventKind::FormClosed
            | EventKind::HomeOpened => {
                let slot = (kind, key);
                if self.exact_routes.contains_key(&slot) {
                    return Err(RouterError::DuplicateRegistration { kind, key: slot.1 });
                }
                self.exact_routes.insert(slot, handler);
            }
        }

        Ok(self)
    }

    pub fn on_message(
        &mut self,
        trigger: &str,
        handler: Arc<dyn EventHandler>,
    ) -> Result<&mut Self, RouterError> {
        self.register(EventKind::TextMessage, trigger, handler)
    }

    pub fn on_slash_command(
        &mut self,
        command: &str,
        handler: Arc<dyn EventHandler>,
    ) -> Result<&mut Self, RouterError> {
        self.register(EventKind::SlashCommand, command, handler)
    }

    pub fn on_action(
        &mut self,
        action_id: &str,
        handler: Arc<dyn EventHandler>,
    ) -> Result<&mut Self, RouterError> {
        self.register(EventKind::ComponentAction, action_id, handler)
    }

    /// Registers both the submission and the close notification of a modal.
    pub fn on_view(
        &mut self,
        callback_id: &str,
        handler: Arc<dyn EventHandler>,
    ) -> Result<&mut Self, RouterError> {
        self.register(EventKind::FormSubmission, callback_id, Arc::clone(&handler))?;
        self.register(EventKind::FormClosed, callback_id, handler)
    }

    pub fn on_home_opened(
        &mut self,
        tab: &str,
        handler: Arc<dyn EventHandler>,
    ) -> Result<&mut Self, RouterError> {
        self.register(EventKind::HomeOpened, tab, handler)
    }

    pub fn build(self) -> EventRouter {
        EventRouter { text_routes: self.text_routes, exact_routes: self.exact_routes }
    }
}

pub struct EventRouter {
    text_routes: Vec<TextRoute>,
    exact_routes: HashMap<(EventKind, String), Arc<dyn EventHandler>>,
}

impl EventRouter {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    pub fn handler_count(&self) -> usize {
        self.text_routes.len() + self.exact_routes.len()
    }

    pub fn text_triggers(&self) -> Vec<&str> {
        self.text_routes.iter().map(|route| route.trigger.as_str()).collect()
    }

    pub fn is_registered(&self, kind: EventKind, key: &str) -> bool {
        match kind {
            EventKind::TextMessage => {
                let trigger = normalize_trigger(key);
                self.text_routes.iter().any(|route| route.trigger == trigger)
            }
            _ => self.exact_routes.contains_key(&(kind, key.to_owned())),
        }
    }

    pub async fn dispatch(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<DispatchOutcome, DispatchError> {
        let event = &envelope.event;
        let (Some(kind), Some(key)) = (event.kind(), event.matching_key()) else {
            debug!(
                envelope_id = %envelope.envelope_id,
                correlation_id = %ctx.correlation_id,
                "unsupported event; nothing to dispatch"
            );
            return Ok(DispatchOutcome::Unmatched);
        };

        let handlers = self.resolve(kind, key);
        if handlers.is_empty() {
            debug!(
                envelope_id = %envelope.envelope_id,
                correlation_id = %ctx.correlation_id,
                event_kind = %kind,
                "no handler registered for event"
            );
            return Ok(DispatchOutcome::Unmatched);
        }

        let mut results = Vec::with_capacity(handlers.len());
        let mut first_failure = None;
        for (route_key, handler) in handlers {
            match invoke(handler.as_ref(), event, ctx).await {
                Ok(result) => results.push(result),
                Err(source) => {
                    let failure = DispatchError::HandlerExecution {
                        kind,
                        key: route_key.to_owned(),
                        handler: handler.name(),
                        user_id: event.user_id().unwrap_or("unknown").to_owned(),
                        channel_id: event.channel_id().map(str::to_owned),
                        source,
                    };
                    if first_failure.is_none() {
                        first_failure = Some(failure);
                    } else {
                        warn!(
                            correlation_id = %ctx.correlation_id,
                            error = %failure,
                            "additional handler failure on the same event"
                        );
                    }
                }
            }
        }

        match first_failure {
            Some(failure) => Err(failure),
            None => Ok(DispatchOutcome::Handled(results)),
        }
    }

    fn resolve<'a>(&'a self, kind: EventKind, key: &str) -> Vec<(&'a str, &'a Arc<dyn EventHandler>)> {
        match kind {
            EventKind::TextMessage => self
                .text_routes
                .iter()
                .filter(|route| text_matches(&route.trigger, key))
                .map(|route| (route.trigger.as_str(), &route.handler))
                .collect(),
            _ => self
                .exact_routes
                .get_key_value(&(kind, key.to_owned()))
                .map(|((_, route_key), handler)| (route_key.as_str(), handler))
                .into_iter()
                .collect(),
        }
    }
}

async fn invoke(
    handler: &dyn EventHandler,
    event: &InboundEvent,
    ctx: &EventContext,
) -> Result<HandlerResult, HandlerError> {
    match event {
        InboundEvent::TextMessage(message) => handler.on_message(message, ctx).await,
        InboundEvent::SlashCommand(payload) => handler.on_slash_command(payload, ctx).await,
        InboundEvent::ComponentAction(action) => handler.on_action(action, ctx).await,
        InboundEvent::FormSubmission(submission) => handler.on_submission(submission, ctx).await,
        InboundEvent::FormClosed(closed) => handler.on_close(closed, ctx).await,
        InboundEvent::HomeOpened(home) => handler.on_home_opened(home, ctx).await,
        InboundEvent::Unsupported { .. } => Ok(HandlerResult::Ignored),
    }
}
