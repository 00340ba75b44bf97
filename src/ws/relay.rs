//! Bidirectional relay between one browser socket and the upstream event bus.
//!
//! Each relay runs three units of work that share one [`CancellationToken`]:
//!
//! ```text
//!   browser ──▶ downstream loop ──outbound queue──▶ forwarder ──▶ upstream
//!   browser ◀── downstream loop ◀──inbound queue── upstream pump ◀── upstream
//!                                                      │
//!                                               interest filter
//! ```
//!
//! Whichever side stops first cancels the token. The other tasks notice at
//! their next `select!` point, and [`run_relay`] tears down exactly once.
//! Frames the filter already passed are still delivered when the upstream
//! side is the one that stopped.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket, close_code};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::filter::{Verdict, filter_inbound};
use crate::config::{RelayConfig, UpstreamTarget};
use crate::domain::InterestRegistry;
use crate::error::RelayError;
use crate::upstream::connection;
use crate::upstream::{SessionState, UpstreamReader, UpstreamWriter};

/// Runs one relay until either side terminates, then cleans up.
///
/// Errors are logged here; the caller has nothing to recover.
pub async fn run_relay(
    socket: WebSocket,
    target: UpstreamTarget,
    interest: Arc<InterestRegistry>,
    config: RelayConfig,
) {
    let relay_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("relay", %relay_id);

    async move {
        tracing::info!("relay started");
        match relay(socket, &target, interest, config).await {
            Ok(()) => tracing::info!("relay closed"),
            Err(e) => tracing::error!(error = %e, "relay terminated"),
        }
    }
    .instrument(span)
    .await;
}

async fn relay(
    socket: WebSocket,
    target: &UpstreamTarget,
    interest: Arc<InterestRegistry>,
    config: RelayConfig,
) -> Result<(), RelayError> {
    let (mut down_tx, mut down_rx) = socket.split();

    let (reader, writer, state_rx) = match connection::connect(target, &config).await {
        Ok(parts) => parts,
        Err(e) => {
            close_downstream(&mut down_tx, close_code::ERROR, "upstream unavailable").await;
            return Err(e);
        }
    };

    let cancel = CancellationToken::new();
    let (outbound_tx, outbound_rx) = mpsc::channel::<String>(config.channel_capacity);
    let (inbound_tx, mut inbound_rx) = mpsc::channel::<String>(config.channel_capacity);

    let upstream_task = tokio::spawn(
        pump_upstream(reader, interest, inbound_tx, cancel.clone()).in_current_span(),
    );
    let forward_task = tokio::spawn(
        forward_outbound(
            outbound_rx,
            writer.clone(),
            state_rx,
            config.auth_timeout,
            cancel.clone(),
        )
        .in_current_span(),
    );

    let downstream = pump_downstream(
        &mut down_tx,
        &mut down_rx,
        &mut inbound_rx,
        &outbound_tx,
        &cancel,
    )
    .await;

    // Teardown: single path regardless of which side stopped first.
    cancel.cancel();
    let upstream = join(upstream_task).await;
    let forward = join(forward_task).await;
    writer.close().await;

    // The upstream pump has exited, so the inbound queue is final.
    let downstream = match downstream {
        Ok(DownstreamEnd::Cancelled) => drain_inbound(&mut down_tx, &mut inbound_rx).await,
        Ok(DownstreamEnd::Client) => Ok(()),
        Err(e) => Err(e),
    };

    let outcome = upstream.and(forward).and(downstream);
    let code = if outcome.is_ok() {
        close_code::NORMAL
    } else {
        close_code::ERROR
    };
    close_downstream(&mut down_tx, code, "relay closed").await;
    outcome
}

/// Reads upstream frames, filters them, and queues survivors for the browser.
async fn pump_upstream(
    mut reader: UpstreamReader,
    interest: Arc<InterestRegistry>,
    inbound_tx: mpsc::Sender<String>,
    cancel: CancellationToken,
) -> Result<(), RelayError> {
    let _guard = cancel.clone().drop_guard();
    loop {
        let message = tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(()),
            event = reader.next_event() => match event? {
                Some(message) => message,
                None => {
                    tracing::info!("upstream closed");
                    return Ok(());
                }
            },
        };

        let snapshot = interest.snapshot().await;
        let Verdict::Forward(text) = filter_inbound(message, &snapshot) else {
            continue;
        };

        tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(()),
            sent = inbound_tx.send(text) => {
                if sent.is_err() {
                    return Ok(());
                }
            }
        }
    }
}

/// Drains the outbound queue into the upstream socket.
///
/// Nothing is dequeued until the handshake settles, so the auth frame is
/// always first on the wire and early client commands keep their order.
async fn forward_outbound(
    mut outbound_rx: mpsc::Receiver<String>,
    writer: UpstreamWriter,
    mut state_rx: watch::Receiver<SessionState>,
    auth_timeout: Duration,
    cancel: CancellationToken,
) -> Result<(), RelayError> {
    let _guard = cancel.clone().drop_guard();

    let settled = async {
        state_rx
            .wait_for(|state| state.is_settled())
            .await
            .map(|_| ())
    };
    tokio::select! {
        biased;
        () = cancel.cancelled() => return Ok(()),
        waited = tokio::time::timeout(auth_timeout, settled) => match waited {
            Err(_) => return Err(RelayError::AuthTimeout(auth_timeout)),
            // Session dropped: the upstream pump is gone
            Ok(Err(_)) => return Ok(()),
            Ok(Ok(())) => {}
        },
    }

    loop {
        let message = tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(()),
            message = outbound_rx.recv() => match message {
                Some(message) => message,
                None => return Ok(()),
            },
        };

        let state = *state_rx.borrow();
        if state.is_connected() {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return Ok(()),
                sent = writer.send_text(message) => sent?,
            }
        } else {
            tracing::warn!(?state, len = message.len(), "upstream not connected, dropping message");
        }
    }
}

/// Why the downstream loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DownstreamEnd {
    /// The browser closed or went away.
    Client,
    /// Another unit of work cancelled the relay.
    Cancelled,
}

/// Delivers queued inbound frames to the browser and queues its commands.
async fn pump_downstream(
    down_tx: &mut SplitSink<WebSocket, Message>,
    down_rx: &mut SplitStream<WebSocket>,
    inbound_rx: &mut mpsc::Receiver<String>,
    outbound_tx: &mpsc::Sender<String>,
    cancel: &CancellationToken,
) -> Result<DownstreamEnd, RelayError> {
    loop {
        let frame = tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(DownstreamEnd::Cancelled),
            Some(text) = inbound_rx.recv() => {
                down_tx
                    .send(Message::text(text))
                    .await
                    .map_err(|e| RelayError::Downstream(e.to_string()))?;
                continue;
            }
            frame = down_rx.next() => frame,
        };

        let text = match frame {
            Some(Ok(Message::Text(text))) => text.to_string(),
            Some(Ok(Message::Binary(data))) => match std::str::from_utf8(&data) {
                Ok(text) => text.to_string(),
                Err(_) => {
                    tracing::debug!(len = data.len(), "ignoring non-utf8 binary frame from client");
                    continue;
                }
            },
            Some(Ok(Message::Close(frame))) => {
                let code = frame.map(|f| f.code);
                if is_clean_close(code) {
                    tracing::debug!(?code, "client closed");
                } else {
                    tracing::warn!(?code, "client closed abnormally");
                }
                return Ok(DownstreamEnd::Client);
            }
            // Ping/Pong are answered by axum
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(RelayError::Downstream(e.to_string())),
            None => {
                tracing::warn!("client went away without a close frame");
                return Ok(DownstreamEnd::Client);
            }
        };

        tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(DownstreamEnd::Cancelled),
            sent = outbound_tx.send(text) => {
                // The forwarder is gone and has cancelled the relay.
                if sent.is_err() {
                    return Ok(DownstreamEnd::Cancelled);
                }
            }
        }
    }
}

/// Sends whatever the filter queued before the upstream side stopped.
async fn drain_inbound(
    down_tx: &mut SplitSink<WebSocket, Message>,
    inbound_rx: &mut mpsc::Receiver<String>,
) -> Result<(), RelayError> {
    while let Ok(text) = inbound_rx.try_recv() {
        down_tx
            .send(Message::text(text))
            .await
            .map_err(|e| RelayError::Downstream(e.to_string()))?;
    }
    Ok(())
}

/// `NORMAL` and `AWAY` are routine; anything else, or no code, is not.
fn is_clean_close(code: Option<u16>) -> bool {
    matches!(code, Some(close_code::NORMAL | close_code::AWAY))
}

async fn join(task: JoinHandle<Result<(), RelayError>>) -> Result<(), RelayError> {
    match task.await {
        Ok(result) => result,
        Err(e) => Err(RelayError::Task(e.to_string())),
    }
}

async fn close_downstream(
    down_tx: &mut SplitSink<WebSocket, Message>,
    code: u16,
    reason: &'static str,
) {
    let frame = CloseFrame {
        code,
        reason: Utf8Bytes::from_static(reason),
    };
    if let Err(e) = down_tx.send(Message::Close(Some(frame))).await {
        tracing::trace!(error = %e, "client already gone");
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use futures_util::{SinkExt, StreamExt};
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::Message as WsMessage;

    use super::*;

    #[test]
    fn clean_close_codes() {
        assert!(is_clean_close(Some(close_code::NORMAL)));
        assert!(is_clean_close(Some(close_code::AWAY)));
        assert!(!is_clean_close(Some(close_code::ERROR)));
        assert!(!is_clean_close(Some(1006)));
        assert!(!is_clean_close(None));
    }

    /// Accepts one event-bus client, authenticates it, closes normally,
    /// and returns every text frame received after the auth frame.
    async fn closing_upstream(listener: TcpListener) -> Vec<String> {
        let Ok((stream, _)) = listener.accept().await else {
            panic!("accept failed");
        };
        let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
            panic!("handshake failed");
        };
        let hello = WsMessage::text(r#"{"type":"auth_required"}"#.to_string());
        let Ok(()) = ws.send(hello).await else {
            panic!("send failed");
        };
        let Some(Ok(WsMessage::Text(_auth))) = ws.next().await else {
            panic!("expected auth frame");
        };
        let Ok(()) = ws.send(WsMessage::text(r#"{"type":"auth_ok"}"#.to_string())).await else {
            panic!("send failed");
        };
        let Ok(()) = ws.close(None).await else {
            panic!("close failed");
        };

        let mut received = Vec::new();
        while let Some(Ok(frame)) = ws.next().await {
            if let WsMessage::Text(text) = frame {
                received.push(text.to_string());
            }
        }
        received
    }

    #[tokio::test]
    async fn commands_after_upstream_close_are_discarded() {
        let Ok(listener) = TcpListener::bind("127.0.0.1:0").await else {
            panic!("bind failed");
        };
        let Ok(addr) = listener.local_addr() else {
            panic!("no local addr");
        };
        let server = tokio::spawn(closing_upstream(listener));

        let Ok(target) = UpstreamTarget::external(&format!("http://{addr}"), "tok") else {
            panic!("valid target");
        };
        let Ok((mut reader, writer, state_rx)) =
            connection::connect(&target, &RelayConfig::default()).await
        else {
            panic!("connect failed");
        };

        // auth_required, auth_ok, then the normal close
        assert!(matches!(reader.next_event().await, Ok(Some(_))));
        assert!(matches!(reader.next_event().await, Ok(Some(_))));
        assert!(matches!(reader.next_event().await, Ok(None)));
        assert_eq!(*state_rx.borrow(), SessionState::Closed);

        let (outbound_tx, outbound_rx) = mpsc::channel(4);
        let Ok(()) = outbound_tx
            .send(r#"{"id":1,"type":"get_states"}"#.to_string())
            .await
        else {
            panic!("queue closed");
        };
        drop(outbound_tx);

        let cancel = CancellationToken::new();
        let outcome = forward_outbound(
            outbound_rx,
            writer.clone(),
            state_rx,
            Duration::from_secs(1),
            cancel.clone(),
        )
        .await;
        assert!(outcome.is_ok(), "forwarder failed: {outcome:?}");
        assert!(cancel.is_cancelled());

        writer.close().await;
        let Ok(Ok(received)) = tokio::time::timeout(Duration::from_secs(5), server).await else {
            panic!("upstream did not finish");
        };
        assert!(received.is_empty(), "upstream received {received:?}");
    }
}
