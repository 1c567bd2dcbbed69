//! Event channel client for the fiscal printer relay.
//!
//! This crate provides:
//! - One persistent Socket.IO connection over the WebSocket transport
//! - Automatic reconnection with exponential backoff
//! - Connection state transitions and application events as a typed stream
//! - Event emission with optional acknowledgment ids

mod client;
mod error;
mod protocol;

pub use client::{
    socket_io_url, ChannelClient, ChannelConfig, ChannelEmitter, ChannelEvent, ChannelHandle,
    ConnectionState,
};
pub use error::{ChannelError, ChannelResult};
pub use protocol::{EnginePacket, Handshake, SocketPacket};
