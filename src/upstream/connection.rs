//! Live event-bus connection driving an [`UpstreamSession`].
//!
//! [`connect`] opens the socket and splits it into an [`UpstreamReader`]
//! (owns the read half and the state machine) and an [`UpstreamWriter`]
//! (shared write half). There is no reconnect: once the reader reports a
//! close or error, the session is over.

use std::fmt;
use std::sync::Arc;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use super::message::InboundMessage;
use super::session::{SessionState, UpstreamSession};
use crate::config::{RelayConfig, UpstreamTarget};
use crate::error::RelayError;

type UpstreamStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens the event-bus socket and starts the auth handshake.
///
/// Returns the reader, the writer, and a receiver for session state.
///
/// # Errors
///
/// Returns [`RelayError::UpstreamConnect`] if the socket cannot be opened
/// and [`RelayError::ConnectTimeout`] if opening it exceeds
/// `config.connect_timeout`.
pub async fn connect(
    target: &UpstreamTarget,
    config: &RelayConfig,
) -> Result<(UpstreamReader, UpstreamWriter, watch::Receiver<SessionState>), RelayError> {
    let mut session = UpstreamSession::new(target.access_token());
    let state_rx = session.subscribe();

    tracing::debug!(url = %target.websocket_url(), "connecting to upstream event bus");
    let connecting = tokio_tungstenite::connect_async(target.websocket_url());
    let stream = match tokio::time::timeout(config.connect_timeout, connecting).await {
        Ok(Ok((stream, _response))) => stream,
        Ok(Err(e)) => {
            session.closed();
            return Err(RelayError::UpstreamConnect(e.to_string()));
        }
        Err(_) => {
            session.closed();
            return Err(RelayError::ConnectTimeout(config.connect_timeout));
        }
    };
    session.opened();

    let (sink, source) = stream.split();
    let writer = UpstreamWriter {
        sink: Arc::new(Mutex::new(sink)),
    };
    let reader = UpstreamReader {
        source,
        session,
        writer: writer.clone(),
    };
    Ok((reader, writer, state_rx))
}

/// Read half of the upstream connection plus its handshake state.
pub struct UpstreamReader {
    source: SplitStream<UpstreamStream>,
    session: UpstreamSession,
    writer: UpstreamWriter,
}

impl UpstreamReader {
    /// Waits for the next inbound message.
    ///
    /// Auth-phase frames are run through the session (sending the
    /// credential when asked) and then returned like any other message.
    /// Returns `Ok(None)` when the upstream closes normally.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::UpstreamTransport`] on socket errors,
    /// [`RelayError::UpstreamClosed`] on a non-normal close frame, and
    /// [`RelayError::AuthRejected`] on `auth_invalid`. The session is
    /// `Closed` in every error case.
    pub async fn next_event(&mut self) -> Result<Option<InboundMessage>, RelayError> {
        loop {
            let frame = match self.source.next().await {
                Some(Ok(frame)) => frame,
                Some(Err(e)) => {
                    self.session.closed();
                    return Err(RelayError::UpstreamTransport(e.to_string()));
                }
                None => {
                    self.session.closed();
                    return Ok(None);
                }
            };

            let text = match frame {
                Message::Text(text) => text.to_string(),
                Message::Close(frame) => {
                    self.session.closed();
                    return match frame {
                        Some(cf) if cf.code != CloseCode::Normal => Err(RelayError::UpstreamClosed {
                            code: u16::from(cf.code),
                            reason: cf.reason.to_string(),
                        }),
                        _ => Ok(None),
                    };
                }
                // Binary, Ping, Pong, Frame: tungstenite answers pings itself
                _ => continue,
            };

            let message = InboundMessage::parse(text);
            if let Some(auth) = self.session.handle(&message)? {
                if let Err(e) = self.writer.send_text(auth).await {
                    self.session.closed();
                    return Err(e);
                }
                tracing::debug!("sent upstream auth");
            }
            return Ok(Some(message));
        }
    }
}

impl fmt::Debug for UpstreamReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamReader")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

/// Cloneable write half of the upstream connection.
#[derive(Clone)]
pub struct UpstreamWriter {
    sink: Arc<Mutex<SplitSink<UpstreamStream, Message>>>,
}

impl UpstreamWriter {
    /// Sends one text frame.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::UpstreamTransport`] if the socket write fails.
    pub async fn send_text(&self, text: String) -> Result<(), RelayError> {
        self.sink
            .lock()
            .await
            .send(Message::text(text))
            .await
            .map_err(|e| RelayError::UpstreamTransport(e.to_string()))
    }

    /// Closes the socket. Safe to call more than once.
    pub async fn close(&self) {
        if let Err(e) = self.sink.lock().await.close().await {
            tracing::trace!(error = %e, "upstream already closed");
        }
    }
}

impl fmt::Debug for UpstreamWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamWriter").finish_non_exhaustive()
    }
}
