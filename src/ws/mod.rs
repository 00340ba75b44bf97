//! WebSocket layer: the `/ws` endpoint relaying the upstream event bus.
//!
//! Each browser connection gets its own upstream session. Upstream traffic
//! is filtered against the shared interest registry before it is delivered;
//! browser traffic is forwarded upstream verbatim.

pub mod filter;
pub mod handler;
pub mod relay;
