//! Socket Mode over a real WebSocket.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use tokio::{net::TcpStream, sync::Mutex};
use tokio_tungstenite::{
    connect_async, tungstenite::Message as WsMessage, MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, info, warn};

use crate::{
    events::SlackEnvelope,
    socket::{SocketTransport, TransportError},
    web::check_envelope,
    wire::{parse_frame, WireMessage},
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct WebSocketTransport {
    http: reqwest::Client,
    api_base_url: String,
    app_token: SecretString,
    sink: Mutex<Option<SplitSink<WsStream, WsMessage>>>,
    source: Mutex<Option<SplitStream<WsStream>>>,
}

impl WebSocketTransport {
    pub fn new(
        api_base_url: impl Into<String>,
        app_token: SecretString,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| TransportError::Connect(error.to_string()))?;
        Ok(Self {
            http,
            api_base_url: api_base_url.into().trim_end_matches('/').to_owned(),
            app_token,
            sink: Mutex::new(None),
            source: Mutex::new(None),
        })
    }

    /// Asks Slack for a fresh single-use WebSocket URL.
    async fn open_connection_url(&self) -> Result<String, TransportError> {
        let payload = self
            .http
            .post(format!("{}/apps.connections.open", self.api_base_url))
            .bearer_auth(self.app_token.expose_secret())
            .send()
            .await
            .map_err(|error| TransportError::Connect(error.to_string()))?
            .json::<Value>()
            .await
            .map_err(|error| TransportError::Connect(error.to_string()))?;
        let payload = check_envelope("apps.connections.open", payload)
            .map_err(|error| TransportError::Connect(error.to_string()))?;

        let url = payload.get("url").and_then(Value::as_str).ok_or_else(|| {
            TransportError::Connect("apps.connections.open returned no url".to_owned())
        })?;
        validate_socket_url(url)?;
        Ok(url.to_owned())
    }

    async fn send(&self, message: WsMessage) -> Result<(), TransportError> {
        let mut sink = self.sink.lock().await;
        let sink = sink
            .as_mut()
            .ok_or_else(|| TransportError::Acknowledge("socket is not connected".to_owned()))?;
        sink.send(message).await.map_err(|error| TransportError::Acknowledge(error.to_string()))
    }
}

#[async_trait]
impl SocketTransport for WebSocketTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        let url = self.open_connection_url().await?;
        let (stream, _response) =
            connect_async(url.as_str()).await.map_err(|error| TransportError::Connect(error.to_string()))?;
        let (sink, source) = stream.split();
        *self.sink.lock().await = Some(sink);
        *self.source.lock().await = Some(source);
        info!(event_name = "ingress.slack.socket_opened", "socket mode websocket connected");
        Ok(())
    }

    async fn next_envelope(&self) -> Result<Option<SlackEnvelope>, TransportError> {
        let mut source = self.source.lock().await;
        let source = source
            .as_mut()
            .ok_or_else(|| TransportError::Receive("socket is not connected".to_owned()))?;

        loop {
            let Some(message) = source.next().await else {
                return Err(TransportError::Receive("socket stream ended".to_owned()));
            };
            let message = message.map_err(|error| TransportError::Receive(error.to_string()))?;

            let text = match message {
                WsMessage::Text(text) => text.to_string(),
                WsMessage::Binary(bytes) => String::from_utf8(bytes.to_vec())
                    .map_err(|error| TransportError::Receive(error.to_string()))?,
                WsMessage::Ping(payload) => {
                    self.send(WsMessage::Pong(payload)).await?;
                    continue;
                }
                WsMessage::Close(frame) => {
                    return Err(TransportError::Receive(format!("socket closed by server: {frame:?}")))
                }
                WsMessage::Pong(_) | WsMessage::Frame(_) => continue,
            };

            match parse_frame(&text) {
                Ok(WireMessage::Hello) => debug!("socket mode hello received"),
                Ok(WireMessage::Disconnect { reason }) => {
                    return Err(TransportError::Receive(format!(
                        "slack requested disconnect: {reason}"
                    )))
                }
                Ok(WireMessage::Envelope(envelope)) => return Ok(Some(envelope)),
                Err(error) => warn!(error = %error, "dropping unreadable socket mode frame"),
            }
        }
    }

    async fn acknowledge(&self, envelope_id: &str) -> Result<(), TransportError> {
        let ack = json!({ "envelope_id": envelope_id }).to_string();
        self.send(WsMessage::Text(ack.into())).await
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.source.lock().await.take();
        let Some(mut sink) = self.sink.lock().await.take() else {
            return Ok(());
        };
        sink.close().await.map_err(|error| TransportError::Disconnect(error.to_string()))
    }
}

/// Socket Mode URLs are always `wss://` on a Slack host.
fn validate_socket_url(url: &str) -> Result<(), TransportError> {
    let Some(rest) = url.strip_prefix("wss://") else {
        return Err(TransportError::Connect(format!("socket url must use wss://, got `{url}`")));
    };
    let host = rest.split('/').next().and_then(|authority| authority.split(':').next()).unwrap_or("");
    if host == "slack.com" || host.ends_with(".slack.com") {
        Ok(())
    } else {
        Err(TransportError::Connect(format!("socket url host `{host}` is not a slack host")))
    }
}
