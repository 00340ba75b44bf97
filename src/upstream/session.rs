//! Upstream auth handshake as an explicit state machine.
//!
//! ```text
//! Connecting ──opened──▶ AuthPending ──auth_ok──▶ Authenticated
//!      │                     │                          │
//!      └──────── close / error / auth_invalid ──────────┴──▶ Closed
//! ```
//!
//! The machine owns no socket. [`super::connection::UpstreamReader`] feeds
//! it frames and sends whatever auth reply it asks for. State changes are
//! published on a [`watch`] channel so the outbound forwarder can wait for
//! the handshake to settle.

use tokio::sync::watch;

use super::message::{AuthMessage, InboundKind, InboundMessage};
use crate::error::RelayError;

/// Lifecycle of one upstream session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Socket not open yet.
    Connecting,
    /// Socket open, waiting for the handshake to finish.
    AuthPending,
    /// Credentials accepted; commands may flow.
    Authenticated,
    /// Terminal.
    Closed,
}

impl SessionState {
    /// Returns `true` once the handshake can no longer change outcome.
    #[must_use]
    pub const fn is_settled(self) -> bool {
        matches!(self, Self::Authenticated | Self::Closed)
    }

    /// Returns `true` if client commands may be written upstream.
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Authenticated)
    }
}

/// Auth state machine for a single upstream connection.
#[derive(Debug)]
pub struct UpstreamSession {
    access_token: String,
    auth_sent: bool,
    state: watch::Sender<SessionState>,
}

impl UpstreamSession {
    /// Creates a session in [`SessionState::Connecting`].
    #[must_use]
    pub fn new(access_token: impl Into<String>) -> Self {
        let (state, _) = watch::channel(SessionState::Connecting);
        Self {
            access_token: access_token.into(),
            auth_sent: false,
            state,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Receiver that observes every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// The socket opened: Connecting → AuthPending.
    pub fn opened(&mut self) {
        if self.state() == SessionState::Connecting {
            self.transition(SessionState::AuthPending);
        }
    }

    /// The socket errored or closed: any state → Closed.
    pub fn closed(&mut self) {
        self.transition(SessionState::Closed);
    }

    /// Feeds one inbound frame through the handshake.
    ///
    /// Returns the auth frame to send when the upstream asks for it. The
    /// credential is offered at most once per session.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::AuthRejected`] on `auth_invalid`; the session is
    /// closed before returning.
    pub fn handle(&mut self, message: &InboundMessage) -> Result<Option<String>, RelayError> {
        match message.kind() {
            InboundKind::AuthRequired => {
                if self.state() != SessionState::AuthPending || self.auth_sent {
                    tracing::warn!(state = ?self.state(), "ignoring repeated auth_required");
                    return Ok(None);
                }
                self.auth_sent = true;
                Ok(Some(AuthMessage::new(&self.access_token).to_text()))
            }
            InboundKind::AuthOk => {
                if self.state() == SessionState::AuthPending {
                    self.transition(SessionState::Authenticated);
                    tracing::debug!("upstream authenticated");
                }
                Ok(None)
            }
            InboundKind::AuthInvalid => {
                self.closed();
                let reason = message.reason().unwrap_or("no reason given").to_string();
                Err(RelayError::AuthRejected(reason))
            }
            _ => Ok(None),
        }
    }

    fn transition(&self, next: SessionState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            tracing::trace!(from = ?previous, to = ?next, "upstream session transition");
        }
    }
}
