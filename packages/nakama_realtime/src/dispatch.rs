//! The dispatch loop.
//!
//! Two tasks per connection:
//!
//! - the **reader** pulls frames off the socket, decodes them and forwards
//!   envelopes over an mpsc channel;
//! - the **dispatcher** owns the write half and the pending table. It writes
//!   outbound requests, registers the ones that expect a reply, routes inbound
//!   envelopes to callers or observers, and periodically sweeps entries whose
//!   caller has gone away.
//!
//! All socket writes and table mutations happen on the dispatcher task.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{self, Message as Frame, Utf8Bytes};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::codec::Format;
use crate::error::{Error, RealtimeError};
use crate::notify::Notifications;
use crate::pending::{Completion, CorrelationIds, PendingCall, PendingTable};
use crate::proto::{Envelope, envelope::Message};

/// How long teardown waits for the close frame to go out.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Lifecycle of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    Connecting,
    Running,
    Closing,
    Closed,
}

/// A request handed from a caller to the dispatcher.
pub(crate) struct Outbound {
    pub message: Message,
    pub expects_reply: bool,
    pub tx: Completion,
}

/// State shared between the connection handle and its tasks.
pub(crate) struct Shared {
    pub pending: PendingTable,
    pub ids: CorrelationIds,
    pub notifications: Notifications,
    pub state: watch::Sender<ConnState>,
}

impl Shared {
    pub fn new(capacity: usize) -> Self {
        let (state, _) = watch::channel(ConnState::Connecting);
        Self {
            pending: PendingTable::new(),
            ids: CorrelationIds::new(),
            notifications: Notifications::new(capacity),
            state,
        }
    }
}

pub(crate) struct Settings {
    pub format: Format,
    pub sweep_interval: Duration,
    pub channel_capacity: usize,
}

/// Split `ws` and start the reader and dispatcher tasks. The returned handle
/// resolves once teardown has finished.
pub(crate) fn spawn<S>(
    ws: WebSocketStream<S>,
    settings: Settings,
    shared: Arc<Shared>,
    out_rx: mpsc::Receiver<Outbound>,
    cancel: CancellationToken,
) -> JoinHandle<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (sink, stream) = ws.split();
    let (in_tx, in_rx) = mpsc::channel(settings.channel_capacity);

    let reader = tokio::spawn(read_loop(stream, settings.format, in_tx, cancel.clone()));

    let dispatcher = Dispatcher {
        sink,
        format: settings.format,
        shared,
    };
    tokio::spawn(dispatcher.run(out_rx, in_rx, reader, cancel, settings.sweep_interval))
}

// ── Reader ──────────────────────────────────────────────────────────────

async fn read_loop<S>(
    mut stream: SplitStream<WebSocketStream<S>>,
    format: Format,
    in_tx: mpsc::Sender<Envelope>,
    cancel: CancellationToken,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => break,
            next = stream.next() => next,
        };

        match next {
            None => {
                debug!("realtime socket stream ended");
                break;
            }
            Some(Ok(Frame::Close(frame))) => {
                debug!(?frame, "realtime socket closed by peer");
                break;
            }
            Some(Ok(Frame::Ping(_) | Frame::Pong(_) | Frame::Frame(_))) => {}
            Some(Ok(frame)) => match format.decode(&frame) {
                Ok(envelope) => {
                    if in_tx.send(envelope).await.is_err() {
                        break;
                    }
                }
                Err(e) => warn!(error = %e, "discarding undecodable frame"),
            },
            Some(Err(e)) if is_disconnect(&e) => {
                debug!(error = %e, "realtime socket disconnected");
                break;
            }
            Some(Err(e)) => warn!(error = %e, "realtime socket read error"),
        }
    }
}

/// Errors after which the socket will never yield another frame.
fn is_disconnect(err: &tungstenite::Error) -> bool {
    matches!(
        err,
        tungstenite::Error::ConnectionClosed
            | tungstenite::Error::AlreadyClosed
            | tungstenite::Error::Io(_)
            | tungstenite::Error::Protocol(
                tungstenite::error::ProtocolError::ResetWithoutClosingHandshake
            )
    )
}

// ── Dispatcher ──────────────────────────────────────────────────────────

struct Dispatcher<S> {
    sink: SplitSink<WebSocketStream<S>, Frame>,
    format: Format,
    shared: Arc<Shared>,
}

impl<S> Dispatcher<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    async fn run(
        mut self,
        mut out_rx: mpsc::Receiver<Outbound>,
        mut in_rx: mpsc::Receiver<Envelope>,
        reader: JoinHandle<()>,
        cancel: CancellationToken,
        sweep_interval: Duration,
    ) {
        self.shared.state.send_replace(ConnState::Running);
        self.shared.notifications.connected();
        info!(format = %self.format, "realtime connection running");

        let sweep_interval = sweep_interval.max(Duration::from_millis(1));
        let mut sweep = tokio::time::interval_at(
            tokio::time::Instant::now() + sweep_interval,
            sweep_interval,
        );
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut stalled = false;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("dispatch loop cancelled");
                    break;
                }
                outbound = out_rx.recv() => match outbound {
                    Some(outbound) => {
                        if self.write(outbound, &cancel).await.is_break() {
                            stalled = true;
                            break;
                        }
                    }
                    None => {
                        debug!("connection handle dropped");
                        break;
                    }
                },
                inbound = in_rx.recv() => match inbound {
                    Some(envelope) => self.receive(envelope).await,
                    None => {
                        debug!("reader finished");
                        break;
                    }
                },
                _ = sweep.tick() => {
                    let swept = self.shared.pending.sweep_abandoned().await;
                    if swept > 0 {
                        debug!(swept, "dropped abandoned calls");
                    }
                }
            }
        }

        // Unblocks a reader parked on a full channel.
        drop(in_rx);
        self.teardown(out_rx, reader, cancel, stalled).await;
    }

    /// Write one request. Breaks when shutdown interrupts a write that the
    /// peer is not draining; the caller gets `Error::Closed`.
    async fn write(&mut self, outbound: Outbound, cancel: &CancellationToken) -> ControlFlow<()> {
        let Outbound {
            message,
            expects_reply,
            tx,
        } = outbound;
        let kind = message.kind();
        let cid = if expects_reply {
            self.shared.ids.next()
        } else {
            String::new()
        };

        let frame = match self.format.encode(&Envelope::reply(cid.clone(), Some(message))) {
            Ok(frame) => frame,
            Err(e) => {
                error!(cid = %cid, kind, error = %e, "failed to encode request");
                let _ = tx.send(Err(e));
                return ControlFlow::Continue(());
            }
        };

        let sent = tokio::select! {
            sent = self.sink.send(frame) => sent,
            _ = cancel.cancelled() => {
                warn!(cid = %cid, kind, "write interrupted by shutdown");
                let _ = tx.send(Err(Error::Closed));
                return ControlFlow::Break(());
            }
        };
        if let Err(e) = sent {
            error!(cid = %cid, kind, error = %e, "failed to write request");
            let _ = tx.send(Err(Error::Send(e.to_string())));
            return ControlFlow::Continue(());
        }

        if !expects_reply {
            debug!(kind, "sent");
            let _ = tx.send(Ok(None));
            return ControlFlow::Continue(());
        }

        debug!(cid = %cid, kind, "sent, awaiting reply");
        self.shared
            .pending
            .insert(cid, PendingCall::new(kind, tx))
            .await;
        ControlFlow::Continue(())
    }

    async fn receive(&mut self, envelope: Envelope) {
        let Envelope { cid, message } = envelope;

        if cid.is_empty() {
            let Some(message) = message else {
                warn!("push without a payload");
                return;
            };
            let kind = message.kind();
            match self.shared.notifications.dispatch(message) {
                Ok(()) => debug!(kind, "push delivered"),
                Err(Error::Realtime(e)) => warn!(error = %e, "server reported an error"),
                Err(e) => warn!(kind, error = %e, "push rejected"),
            }
            return;
        }

        let Some(call) = self.shared.pending.take(&cid).await else {
            warn!(
                cid = %cid,
                kind = message.as_ref().map_or("nothing", Message::kind),
                "no pending call for correlation id"
            );
            return;
        };

        let result = match message {
            Some(Message::Error(e)) => Err(Error::Realtime(RealtimeError::from(e))),
            other => Ok(other),
        };
        debug!(cid = %cid, kind = call.kind, ok = result.is_ok(), "reply received");
        if call.tx.send(result).is_err() {
            debug!(cid = %cid, "caller went away before the reply");
        }
    }

    async fn teardown(
        mut self,
        mut out_rx: mpsc::Receiver<Outbound>,
        reader: JoinHandle<()>,
        cancel: CancellationToken,
        stalled: bool,
    ) {
        self.shared.state.send_replace(ConnState::Closing);

        if stalled {
            debug!("socket left mid-frame, skipping close frame");
        } else {
            let close = self.sink.send(Frame::Close(Some(CloseFrame {
                code: CloseCode::Normal,
                reason: Utf8Bytes::from_static(""),
            })));
            match tokio::time::timeout(CLOSE_TIMEOUT, close).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => debug!(error = %e, "close frame not sent"),
                Err(_) => debug!("close frame timed out"),
            }
        }

        cancel.cancel();
        if let Err(e) = reader.await {
            warn!(error = %e, "reader task failed");
        }

        // Requests queued but never written.
        out_rx.close();
        while let Ok(outbound) = out_rx.try_recv() {
            let _ = outbound.tx.send(Err(Error::Closed));
        }
        let dropped = self.shared.pending.clear().await;

        // Observers run before the state flips so `Conn::closed` implies they ran.
        self.shared.notifications.disconnected();
        self.shared.state.send_replace(ConnState::Closed);
        info!(dropped, "realtime connection closed");
    }
}
