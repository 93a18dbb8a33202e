//! The connection handle.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::WebSocketStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::codec::Format;
use crate::dispatch::{self, ConnState, Outbound, Settings, Shared};
use crate::error::{Error, Result};
use crate::handler::ConnOptions;
use crate::notify::{Event, Notifications};
use crate::pending::PendingInfo;
use crate::proto::envelope::Message;
use crate::request::{FromMessage, Request};

/// A multiplexed realtime connection.
///
/// Cheap to clone; all clones share one socket. The connection shuts down when
/// [`Conn::close`] is called, when the server goes away, or when the last
/// clone is dropped.
#[derive(Clone)]
pub struct Conn {
    inner: Arc<Inner>,
}

struct Inner {
    shared: Arc<Shared>,
    out_tx: mpsc::Sender<Outbound>,
    cancel: CancellationToken,
    format: Format,
    call_timeout: Option<Duration>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl Conn {
    /// Resolve URL and token, open the socket and start the dispatch loop.
    pub async fn connect(options: ConnOptions) -> Result<Self> {
        let endpoint = options.endpoint().await?;
        info!(url = %endpoint.base, format = %options.format, "opening realtime socket");

        let (ws, _response) = tokio_tungstenite::connect_async(endpoint.url.as_str())
            .await
            .map_err(|e| Error::Connect {
                url: endpoint.base.clone(),
                source: Box::new(e),
            })?;

        Ok(Self::from_stream_with(ws, &options))
    }

    /// Run over an already negotiated WebSocket. Must be called inside a
    /// tokio runtime.
    pub fn from_stream<S>(ws: WebSocketStream<S>, format: Format) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        Self::from_stream_with(ws, &ConnOptions::new().with_format(format))
    }

    pub fn from_stream_with<S>(ws: WebSocketStream<S>, options: &ConnOptions) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let shared = Arc::new(Shared::new(options.channel_capacity));
        let (out_tx, out_rx) = mpsc::channel(options.channel_capacity);
        let cancel = CancellationToken::new();

        dispatch::spawn(
            ws,
            Settings {
                format: options.format,
                sweep_interval: options.sweep_interval,
                channel_capacity: options.channel_capacity,
            },
            shared.clone(),
            out_rx,
            cancel.clone(),
        );

        Self {
            inner: Arc::new(Inner {
                shared,
                out_tx,
                cancel,
                format: options.format,
                call_timeout: options.call_timeout,
            }),
        }
    }

    pub fn format(&self) -> Format {
        self.inner.format
    }

    pub fn state(&self) -> ConnState {
        *self.inner.shared.state.borrow()
    }

    pub fn is_closed(&self) -> bool {
        self.state() == ConnState::Closed
    }

    /// Resolves once teardown has finished.
    pub async fn closed(&self) {
        let mut rx = self.inner.shared.state.subscribe();
        let _ = rx.wait_for(|s| *s == ConnState::Closed).await;
    }

    /// Observer registry for server pushes and lifecycle transitions.
    pub fn observers(&self) -> &Notifications {
        &self.inner.shared.notifications
    }

    /// Stream of pushes and lifecycle events. Receivers created after the
    /// connection started never see [`Event::Connected`]; check
    /// [`Conn::state`] instead.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.inner.shared.notifications.subscribe()
    }

    /// Calls currently awaiting a reply, oldest id first.
    pub async fn pending_calls(&self) -> Vec<PendingInfo> {
        self.inner.shared.pending.snapshot().await
    }

    /// Send one payload. With `expects_reply` the future resolves to the reply
    /// payload; without it, as soon as the frame is written.
    pub async fn send(&self, message: Message, expects_reply: bool) -> Result<Option<Message>> {
        let (tx, rx) = oneshot::channel();
        self.inner
            .out_tx
            .send(Outbound {
                message,
                expects_reply,
                tx,
            })
            .await
            .map_err(|_| Error::Closed)?;
        rx.await.map_err(|_| Error::Closed)?
    }

    /// Send a typed request and wait for its typed reply, bounded by the
    /// configured call timeout if one is set.
    pub async fn call<R: Request>(&self, request: R) -> Result<R::Response> {
        match self.inner.call_timeout {
            Some(limit) => self.call_timeout(request, limit).await,
            None => self.call_unbounded(request).await,
        }
    }

    pub async fn call_timeout<R: Request>(&self, request: R, limit: Duration) -> Result<R::Response> {
        tokio::time::timeout(limit, self.call_unbounded(request))
            .await
            .map_err(|_| Error::Timeout)?
    }

    /// Like [`Conn::call`], but gives up with `Error::Cancelled` as soon as
    /// `cancel` fires. A reply arriving later is discarded.
    pub async fn call_with_cancel<R: Request>(
        &self,
        request: R,
        cancel: &CancellationToken,
    ) -> Result<R::Response> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("call cancelled by caller");
                Err(Error::Cancelled)
            }
            result = self.call(request) => result,
        }
    }

    /// Run [`Conn::call`] on its own task and hand the outcome to `f`.
    pub fn call_async<R, F>(&self, request: R, f: F) -> JoinHandle<()>
    where
        R: Request + Send + 'static,
        R::Response: Send,
        F: FnOnce(Result<R::Response>) + Send + 'static,
    {
        let conn = self.clone();
        tokio::spawn(async move { f(conn.call(request).await) })
    }

    /// Close the connection and wait for teardown. Safe to call more than once.
    ///
    /// Calls still in flight, and requests queued but not yet written, fail
    /// with `Error::Closed` rather than waiting forever: no reply can arrive
    /// once the socket is gone.
    pub async fn close(&self) -> Result<()> {
        if !self.inner.cancel.is_cancelled() {
            info!("closing realtime connection");
            self.inner.cancel.cancel();
        }
        self.closed().await;
        Ok(())
    }

    async fn call_unbounded<R: Request>(&self, request: R) -> Result<R::Response> {
        let reply = self.send(request.into_message(), R::EXPECTS_REPLY).await?;
        R::Response::from_message(reply)
    }
}

impl std::fmt::Debug for Conn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conn")
            .field("format", &self.inner.format)
            .field("state", &self.state())
            .finish()
    }
}
