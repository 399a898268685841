//! Opaque state tokens carried by Slack on our behalf.
//!
//! A flow that opens a modal serializes the context it needs later into the
//! view's `private_metadata`; Slack hands the string back untouched on
//! submission or close. Tokens are plain JSON, unversioned and unencrypted, so
//! only non-sensitive routing context belongs in them.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("malformed state token: {reason}")]
pub struct MalformedToken {
    pub reason: String,
}

/// Serializes a state record.
///
/// Records are flat structs of strings, which always serialize; should that
/// ever fail the empty token is returned and the round trip degrades to "no
/// context" instead of aborting the flow.
pub fn encode<T>(record: &T) -> String
where
    T: Serialize,
{
    serde_json::to_string(record).unwrap_or_default()
}

/// Recovers a state record. Empty or blank tokens mean no context was stored.
pub fn decode<T>(token: &str) -> Result<Option<T>, MalformedToken>
where
    T: DeserializeOwned,
{
    if token.trim().is_empty() {
        return Ok(None);
    }

    serde_json::from_str::<T>(token)
        .map(Some)
        .map_err(|error| MalformedToken { reason: error.to_string() })
}

/// Where a flow was started, so follow-ups land back in the same conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelContext {
    pub channel_id: String,
    pub channel_name: String,
}

impl ChannelContext {
    pub fn new(channel_id: impl Into<String>, channel_name: impl Into<String>) -> Self {
        Self { channel_id: channel_id.into(), channel_name: channel_name.into() }
    }
}
