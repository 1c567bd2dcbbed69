//! Socket.IO (v5) packets carried inside Engine.IO (v4) text frames.
//!
//! Engine frame: `<type>[data]`, where type is
//! `0` open, `1` close, `2` ping, `3` pong, `4` message, `5` upgrade, `6` noop.
//!
//! Socket packet (data of an engine message): `<type>[/nsp,][ack id][json]`, where type is
//! `0` connect, `1` disconnect, `2` event, `3` ack, `4` connect error.
//! Binary packets (`5`, `6`) are not supported.

use crate::{ChannelError, ChannelResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Engine.IO open handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Milliseconds between server pings.
    pub ping_interval: u64,
    /// Milliseconds the server waits for a pong.
    pub ping_timeout: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_payload: Option<u64>,
}

impl Handshake {
    /// How long the client may go without hearing from the server.
    pub fn heartbeat_deadline(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.ping_interval + self.ping_timeout)
    }
}

/// An Engine.IO packet.
#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(Handshake),
    Close,
    Ping,
    Pong,
    Message(SocketPacket),
    Upgrade,
    Noop,
}

/// A Socket.IO packet on the default namespace.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    /// Client request (no data) or server confirmation (`{"sid": ..}`).
    Connect(Option<Value>),
    Disconnect,
    Event {
        id: Option<u64>,
        name: String,
        args: Vec<Value>,
    },
    Ack {
        id: u64,
        args: Vec<Value>,
    },
    ConnectError(Value),
}

impl EnginePacket {
    /// Encode into a WebSocket text frame.
    pub fn encode(&self) -> ChannelResult<String> {
        Ok(match self {
            EnginePacket::Open(handshake) => format!("0{}", serde_json::to_string(handshake)?),
            EnginePacket::Close => "1".to_string(),
            EnginePacket::Ping => "2".to_string(),
            EnginePacket::Pong => "3".to_string(),
            EnginePacket::Message(packet) => format!("4{}", packet.encode()?),
            EnginePacket::Upgrade => "5".to_string(),
            EnginePacket::Noop => "6".to_string(),
        })
    }

    /// Decode a WebSocket text frame.
    pub fn decode(frame: &str) -> ChannelResult<Self> {
        let mut chars = frame.chars();
        let kind = chars
            .next()
            .ok_or_else(|| ChannelError::Protocol("empty engine frame".to_string()))?;
        let data = chars.as_str();

        match kind {
            '0' => Ok(EnginePacket::Open(serde_json::from_str(data)?)),
            '1' => Ok(EnginePacket::Close),
            // Ping and pong may carry a probe payload which is irrelevant here.
            '2' => Ok(EnginePacket::Ping),
            '3' => Ok(EnginePacket::Pong),
            '4' => Ok(EnginePacket::Message(SocketPacket::decode(data)?)),
            '5' => Ok(EnginePacket::Upgrade),
            '6' => Ok(EnginePacket::Noop),
            other => Err(ChannelError::Protocol(format!(
                "unknown engine packet type '{other}'"
            ))),
        }
    }
}

impl SocketPacket {
    /// Build an event packet with a single payload argument.
    pub fn event(name: impl Into<String>, payload: Value, id: Option<u64>) -> Self {
        SocketPacket::Event {
            id,
            name: name.into(),
            args: vec![payload],
        }
    }

    fn encode(&self) -> ChannelResult<String> {
        Ok(match self {
            SocketPacket::Connect(None) => "0".to_string(),
            SocketPacket::Connect(Some(data)) => format!("0{}", serde_json::to_string(data)?),
            SocketPacket::Disconnect => "1".to_string(),
            SocketPacket::Event { id, name, args } => {
                let mut array = Vec::with_capacity(args.len() + 1);
                array.push(Value::String(name.clone()));
                array.extend(args.iter().cloned());
                format!(
                    "2{}{}",
                    id.map(|i| i.to_string()).unwrap_or_default(),
                    serde_json::to_string(&array)?
                )
            }
            SocketPacket::Ack { id, args } => format!("3{}{}", id, serde_json::to_string(args)?),
            SocketPacket::ConnectError(data) => format!("4{}", serde_json::to_string(data)?),
        })
    }

    fn decode(data: &str) -> ChannelResult<Self> {
        let mut chars = data.chars();
        let kind = chars
            .next()
            .ok_or_else(|| ChannelError::Protocol("empty socket packet".to_string()))?;
        let mut rest = chars.as_str();

        // Namespace prefix, e.g. "/admin,". Only the default namespace is served.
        if rest.starts_with('/') {
            rest = match rest.find(',') {
                Some(comma) => &rest[comma + 1..],
                None => "",
            };
        }

        let digits = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        let id = if digits > 0 {
            Some(
                rest[..digits]
                    .parse::<u64>()
                    .map_err(|e| ChannelError::Protocol(format!("bad ack id: {e}")))?,
            )
        } else {
            None
        };
        let body = &rest[digits..];

        match kind {
            '0' => {
                if body.is_empty() {
                    Ok(SocketPacket::Connect(None))
                } else {
                    Ok(SocketPacket::Connect(Some(serde_json::from_str(body)?)))
                }
            }
            '1' => Ok(SocketPacket::Disconnect),
            '2' => {
                let mut array: Vec<Value> = serde_json::from_str(body)?;
                if array.is_empty() {
                    return Err(ChannelError::Protocol("event without a name".to_string()));
                }
                let name = match array.remove(0) {
                    Value::String(name) => name,
                    other => {
                        return Err(ChannelError::Protocol(format!(
                            "event name must be a string, got {other}"
                        )))
                    }
                };
                Ok(SocketPacket::Event {
                    id,
                    name,
                    args: array,
                })
            }
            '3' => {
                let id = id.ok_or_else(|| ChannelError::Protocol("ack without id".to_string()))?;
                let args: Vec<Value> = serde_json::from_str(body)?;
                Ok(SocketPacket::Ack { id, args })
            }
            '4' => {
                let data = if body.is_empty() {
                    Value::Null
                } else {
                    serde_json::from_str(body)?
                };
                Ok(SocketPacket::ConnectError(data))
            }
            '5' | '6' => Err(ChannelError::Protocol(
                "binary packets are not supported".to_string(),
            )),
            other => Err(ChannelError::Protocol(format!(
                "unknown socket packet type '{other}'"
            ))),
        }
    }
}
