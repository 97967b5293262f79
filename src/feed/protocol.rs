//! Centrifugo JSON client protocol frames
//!
//! Only the subset needed to connect, subscribe to one channel and receive
//! publications is modelled.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Protocol errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Frame is not valid JSON or has an unexpected shape
    #[error("invalid frame: {0}")]
    InvalidFrame(#[from] serde_json::Error),
}

/// Client to server command
#[derive(Debug, Clone, Serialize)]
pub struct Command {
    /// Correlates the server reply
    pub id: u32,
    /// Method payload, serialized as `"connect": {...}` etc.
    #[serde(flatten)]
    pub method: Method,
}

/// Command methods
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    /// Authenticate the connection
    Connect(ConnectRequest),
    /// Subscribe to a channel
    Subscribe(SubscribeRequest),
}

/// Body of a connect command
#[derive(Debug, Clone, Serialize)]
pub struct ConnectRequest {
    /// Connection token, omitted for anonymous access
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Client name reported to the server
    pub name: String,
}

/// Body of a subscribe command
#[derive(Debug, Clone, Serialize)]
pub struct SubscribeRequest {
    /// Channel to subscribe to
    pub channel: String,
}

impl Command {
    /// Serialize to a text frame
    pub fn to_frame(&self) -> String {
        // Plain structs of strings and integers cannot fail to serialize
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Raw server frame: a reply to a command, a push, or an empty ping
#[derive(Debug, Default, Deserialize)]
struct RawReply {
    #[serde(default)]
    id: u32,
    error: Option<ErrorBody>,
    connect: Option<ConnectResult>,
    subscribe: Option<serde_json::Value>,
    push: Option<RawPush>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: u32,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ConnectResult {
    #[serde(default)]
    client: String,
    #[serde(default)]
    pong: bool,
}

#[derive(Debug, Deserialize)]
struct RawPush {
    #[serde(default)]
    channel: String,
    #[serde(rename = "pub")]
    publication: Option<RawPublication>,
    unsubscribe: Option<CodeReason>,
    disconnect: Option<CodeReason>,
}

#[derive(Debug, Deserialize)]
struct RawPublication {
    #[serde(default)]
    data: serde_json::Value,
    offset: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct CodeReason {
    #[serde(default)]
    code: u32,
    #[serde(default)]
    reason: String,
}

/// Decoded server frame
#[derive(Debug, Clone, PartialEq)]
pub enum ServerFrame {
    /// Empty keepalive frame
    Ping,
    /// Connect command succeeded
    Connected { id: u32, client: String, pong: bool },
    /// Subscribe command succeeded
    Subscribed { id: u32 },
    /// A command failed
    Error { id: u32, code: u32, message: String },
    /// Publication on a channel
    Publication {
        channel: String,
        data: serde_json::Value,
        offset: Option<u64>,
    },
    /// Server removed a subscription
    Unsubscribed { channel: String, code: u32, reason: String },
    /// Server is about to close the connection
    Disconnect { code: u32, reason: String },
    /// Anything else (join/leave, unknown replies)
    Other,
}

/// Decode every frame in a text message.
///
/// The server may batch several JSON frames separated by newlines.
pub fn parse_frames(text: &str) -> Vec<Result<ServerFrame, ProtocolError>> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(parse_frame)
        .collect()
}

/// Decode a single JSON frame
pub fn parse_frame(line: &str) -> Result<ServerFrame, ProtocolError> {
    let raw: RawReply = serde_json::from_str(line)?;

    if let Some(error) = raw.error {
        return Ok(ServerFrame::Error {
            id: raw.id,
            code: error.code,
            message: error.message,
        });
    }

    if let Some(push) = raw.push {
        if let Some(publication) = push.publication {
            return Ok(ServerFrame::Publication {
                channel: push.channel,
                data: publication.data,
                offset: publication.offset,
            });
        }
        if let Some(unsub) = push.unsubscribe {
            return Ok(ServerFrame::Unsubscribed {
                channel: push.channel,
                code: unsub.code,
                reason: unsub.reason,
            });
        }
        if let Some(disconnect) = push.disconnect {
            return Ok(ServerFrame::Disconnect {
                code: disconnect.code,
                reason: disconnect.reason,
            });
        }
        return Ok(ServerFrame::Other);
    }

    if let Some(connect) = raw.connect {
        return Ok(ServerFrame::Connected {
            id: raw.id,
            client: connect.client,
            pong: connect.pong,
        });
    }

    if raw.subscribe.is_some() {
        return Ok(ServerFrame::Subscribed { id: raw.id });
    }

    if raw.id == 0 {
        return Ok(ServerFrame::Ping);
    }

    Ok(ServerFrame::Other)
}

/// Reply to a server ping
pub const PONG_FRAME: &str = "{}";
