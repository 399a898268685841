//! Slack integration for deskbot: Socket Mode bot interface
//!
//! - **Socket Mode** (`socket`, `ws`, `wire`) - WebSocket connection to Slack (no public URL needed)
//! - **Routing** (`router`, `matcher`) - one registry from trigger / action / callback to handler
//! - **Events** (`events`) - typed inbound events and the `EventHandler` trait
//! - **Block Kit** (`blocks`) - message, modal and home tab builders
//! - **Web API** (`client`, `web`) - outbound chat calls
//! - **Flows** (`flows`, `commands`) - ping, counter demo, modal demo, work logging, `/echo`, App Home
//!
//! # Architecture
//!
//! ```text
//! Slack ─ws─▶ WebSocketTransport ─▶ SocketModeRunner ─▶ EventRouter ─▶ EventHandler
//!                    ▲ ack                                                  │
//!                    └──────────────── ChatClient (Web API) ◀───────────────┘
//! ```

pub mod blocks;
pub mod client;
pub mod commands;
pub mod events;
pub mod flows;
pub mod matcher;
#[cfg(any(test, feature = "test-support"))]
pub mod recording;
pub mod router;
pub mod socket;
pub mod web;
pub mod wire;
pub mod ws;

pub use client::{ChatClient, ChatClientError, MessageRef};
pub use events::{EventContext, EventHandler, HandlerError, HandlerResult, InboundEvent, SlackEnvelope};
pub use flows::{register_default_flows, FlowDependencies, WorklogSettings};
pub use router::{DispatchError, DispatchOutcome, EventRouter, RouterBuilder, RouterError};
pub use socket::{ReconnectPolicy, SocketModeRunner, SocketTransport, TransportError};
pub use web::SlackWebClient;
pub use ws::WebSocketTransport;
