//! # mmwave-gateway
//!
//! Backend for the mmWave presence-sensor zone configurator.
//!
//! The crate forwards a handful of REST calls to Home Assistant and relays
//! its WebSocket event bus to the browser, filtered down to the entities
//! the configurator is currently displaying.
//!
//! ## Architecture
//!
//! ```text
//! Browser (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/) ──────── HomeAssistantClient (upstream/)
//!     │       └── selected-entities ─┐
//!     │                              ▼
//!     │                     InterestRegistry (domain/)
//!     │                              │
//!     └── WS Relay (ws/) ◀── filter ─┘
//!             │
//!             └── UpstreamSession ── Home Assistant event bus
//! ```

pub mod api;
pub mod app;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod upstream;
pub mod ws;
