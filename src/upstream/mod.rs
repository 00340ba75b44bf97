//! Upstream side of the gateway: the Home Assistant event bus and REST API.
//!
//! - [`message`] classifies inbound event-bus frames.
//! - [`session`] is the auth handshake state machine.
//! - [`connection`] drives the state machine over a real WebSocket.
//! - [`client`] forwards REST calls with the bearer credential.

pub mod client;
pub mod connection;
pub mod message;
pub mod session;

pub use client::HomeAssistantClient;
pub use connection::{UpstreamReader, UpstreamWriter};
pub use message::{InboundKind, InboundMessage};
pub use session::{SessionState, UpstreamSession};
