//! Multiplexed realtime socket client.
//!
//! One WebSocket carries many concurrent calls, each tagged with a correlation
//! id and answered exactly once, alongside unsolicited server pushes that are
//! routed to observers.
//!
//! ```no_run
//! use nakama_realtime::{ChannelJoinType, Conn, ConnOptions, proto};
//!
//! # async fn demo() -> nakama_realtime::Result<()> {
//! let conn = Conn::connect(
//!     ConnOptions::new()
//!         .with_url("ws://127.0.0.1:7350/ws")
//!         .with_token("session-token"),
//! )
//! .await?;
//! conn.observers().on_channel_message(|m| println!("{}: {}", m.username, m.content));
//! let channel = conn
//!     .call(proto::ChannelJoin::new("lobby", ChannelJoinType::Room))
//!     .await?;
//! println!("joined {}", channel.id);
//! conn.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod conn;
mod dispatch;
pub mod error;
pub mod handler;
pub mod notify;
pub mod pending;
pub mod proto;
pub mod request;

pub use codec::Format;
pub use config::{ConnConfig, load_config};
pub use conn::Conn;
pub use dispatch::ConnState;
pub use error::{Error, ErrorCode, RealtimeError, Result};
pub use handler::{ConnHandler, ConnOptions};
pub use notify::{Event, Notifications};
pub use pending::PendingInfo;
pub use request::{ChannelJoinType, FromMessage, Request};
