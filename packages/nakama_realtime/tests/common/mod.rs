//! In-process realtime server for driving a `Conn` over an in-memory pipe.

#![allow(dead_code)]

use std::future::Future;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use nakama_realtime::proto::{Envelope, envelope::Message};
use nakama_realtime::{Conn, ConnOptions, Format};
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream};
use tokio::time::timeout;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::protocol::{CloseFrame, Role};
use tokio_tungstenite::tungstenite::Message as Frame;

/// Timeout for each async operation in tests.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Await `fut`, failing the test if it takes longer than [`TEST_TIMEOUT`].
pub async fn within<F: Future>(fut: F) -> F::Output {
    timeout(TEST_TIMEOUT, fut).await.expect("timed out")
}

/// Server end of a socket, speaking the same envelope format as the client.
pub struct FakeServer<S = DuplexStream> {
    ws: WebSocketStream<S>,
    format: Format,
}

/// Connect a `Conn` to a fresh [`FakeServer`] over `tokio::io::duplex`.
pub async fn pair(format: Format) -> (Conn, FakeServer) {
    pair_with(ConnOptions::new().with_format(format)).await
}

pub async fn pair_with(options: ConnOptions) -> (Conn, FakeServer) {
    let (client_io, server_io) = tokio::io::duplex(64 * 1024);
    let client = WebSocketStream::from_raw_socket(client_io, Role::Client, None).await;
    let server = WebSocketStream::from_raw_socket(server_io, Role::Server, None).await;
    let format = options.format();
    (
        Conn::from_stream_with(client, &options),
        FakeServer::new(server, format),
    )
}

impl<S> FakeServer<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(ws: WebSocketStream<S>, format: Format) -> Self {
        Self { ws, format }
    }

    /// Next data frame, skipping control frames.
    pub async fn recv_frame(&mut self) -> Frame {
        loop {
            let frame = within(self.ws.next())
                .await
                .expect("client hung up")
                .expect("read failed");
            match frame {
                Frame::Ping(_) | Frame::Pong(_) => continue,
                other => return other,
            }
        }
    }

    pub async fn recv(&mut self) -> Envelope {
        let frame = self.recv_frame().await;
        self.format.decode(&frame).expect("undecodable frame")
    }

    pub async fn expect_close(&mut self) -> Option<CloseFrame> {
        match self.recv_frame().await {
            Frame::Close(frame) => frame,
            other => panic!("expected close, got {other:?}"),
        }
    }

    pub async fn send(&mut self, envelope: Envelope) {
        let frame = self.format.encode(&envelope).expect("encode failed");
        within(self.ws.send(frame)).await.expect("write failed");
    }

    pub async fn reply(&mut self, cid: &str, message: Message) {
        self.send(Envelope::reply(cid, Some(message))).await;
    }

    pub async fn push(&mut self, message: Message) {
        self.send(Envelope::push(message)).await;
    }

    pub async fn send_raw(&mut self, frame: Frame) {
        within(self.ws.send(frame)).await.expect("write failed");
    }

    pub async fn close(&mut self) {
        within(self.ws.close(None)).await.expect("close failed");
    }
}
