//! Connection setup over a real TCP socket.

mod common;

use std::collections::HashMap;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use nakama_realtime::proto::{self, envelope::Message};
use nakama_realtime::{Conn, ConnHandler, ConnOptions, ConnState, Error, Format};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::Role;

use common::{FakeServer, within};

/// Accept one WebSocket on a random port, reporting the query string the client
/// dialed with.
async fn listen() -> (
    String,
    tokio::task::JoinHandle<(WebSocketStream<tokio::net::TcpStream>, String)>,
) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let (tx, rx) = oneshot::channel();
        let capture = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
            let _ = tx.send(req.uri().query().unwrap_or_default().to_string());
            Ok(resp)
        };
        let ws = tokio_tungstenite::accept_hdr_async(stream, capture)
            .await
            .unwrap();
        (ws, rx.await.unwrap())
    });
    (format!("ws://{addr}/ws"), server)
}

fn query_map(query: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}

struct SessionHandler {
    url: String,
}

impl ConnHandler for SessionHandler {
    fn socket_url(&self) -> anyhow::Result<String> {
        Ok(self.url.clone())
    }

    fn token(&self) -> BoxFuture<'_, anyhow::Result<String>> {
        Box::pin(async { Ok("refreshed-session".to_string()) })
    }
}

#[tokio::test]
async fn connect_sends_token_and_format() {
    let (url, server) = listen().await;

    let conn = within(Conn::connect(
        ConnOptions::new()
            .with_url(&url)
            .with_token("abc")
            .with_lang("en")
            .with_create_status(true)
            .with_query("app", "demo"),
    ))
    .await
    .unwrap();

    let (ws, query) = within(server).await.unwrap();
    let q = query_map(&query);
    assert_eq!(q["token"], "abc");
    assert_eq!(q["format"], "protobuf");
    assert_eq!(q["lang"], "en");
    assert_eq!(q["status"], "true");
    assert_eq!(q["app"], "demo");

    // Calls work end to end over TCP.
    let mut server = FakeServer::new(ws, Format::Binary);
    let call = tokio::spawn({
        let conn = conn.clone();
        async move { conn.call(proto::Ping::new()).await }
    });
    let env = server.recv().await;
    server.reply(&env.cid, Message::Pong(proto::Pong {})).await;
    within(call).await.unwrap().unwrap();

    within(conn.close()).await.unwrap();
}

#[tokio::test]
async fn connect_uses_handler() {
    let (url, server) = listen().await;

    let conn = within(Conn::connect(
        ConnOptions::new()
            .with_handler(SessionHandler { url })
            .with_format(Format::Text),
    ))
    .await
    .unwrap();

    let (_ws, query) = within(server).await.unwrap();
    let q = query_map(&query);
    assert_eq!(q["token"], "refreshed-session");
    assert_eq!(q["format"], "json");
    assert_eq!(conn.format(), Format::Text);
}

#[tokio::test]
async fn connect_failure_hides_token() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = within(Conn::connect(
        ConnOptions::new()
            .with_url(format!("ws://{addr}/ws"))
            .with_token("s3cret"),
    ))
    .await
    .unwrap_err();

    match &err {
        Error::Connect { url, .. } => assert_eq!(url, &format!("ws://{addr}/ws")),
        other => panic!("wrong variant: {other:?}"),
    }
    assert!(!err.to_string().contains("s3cret"));
}

#[tokio::test]
async fn connect_without_token_is_config_error() {
    let err = within(Conn::connect(ConnOptions::new().with_url("ws://127.0.0.1:1/ws")))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Config(_)), "{err}");
}

/// Never readable, and every write fails.
struct BrokenPipe;

impl AsyncRead for BrokenPipe {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Poll::Pending
    }
}

impl AsyncWrite for BrokenPipe {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed")))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[tokio::test]
async fn write_failure_reaches_only_that_caller() {
    let ws = WebSocketStream::from_raw_socket(BrokenPipe, Role::Client, None).await;
    let conn = Conn::from_stream(ws, Format::Binary);

    let err = within(conn.call(proto::Ping::new())).await.unwrap_err();
    assert!(matches!(err, Error::Send(_)), "{err}");
    assert!(conn.pending_calls().await.is_empty());

    within(conn.close()).await.unwrap();
    assert_eq!(conn.state(), ConnState::Closed);
}
