//! Envelope codec.
//!
//! `Binary` frames carry protobuf-encoded envelopes in WebSocket binary
//! messages; `Text` frames carry JSON in WebSocket text messages. The format is
//! fixed for the lifetime of a connection, and a frame of the other type is a
//! decode error.

use std::fmt;
use std::str::FromStr;

use prost::Message as _;
use tokio_tungstenite::tungstenite::Message;

use crate::error::{Error, Result};
use crate::proto::Envelope;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Binary,
    Text,
}

impl Format {
    /// Value sent as the `format` query parameter.
    pub fn query_value(&self) -> &'static str {
        match self {
            Self::Binary => "protobuf",
            Self::Text => "json",
        }
    }

    pub fn encode(&self, envelope: &Envelope) -> Result<Message> {
        match self {
            Self::Binary => Ok(Message::Binary(envelope.encode_to_vec().into())),
            Self::Text => {
                let json = serde_json::to_string(envelope)
                    .map_err(|e| Error::Send(format!("json encode: {e}")))?;
                Ok(Message::Text(json.into()))
            }
        }
    }

    pub fn decode(&self, frame: &Message) -> Result<Envelope> {
        match (self, frame) {
            (Self::Binary, Message::Binary(bytes)) => Envelope::decode(&bytes[..])
                .map_err(|e| Error::Decode(format!("protobuf: {e}"))),
            (Self::Text, Message::Text(text)) => serde_json::from_str(text.as_str())
                .map_err(|e| Error::Decode(format!("json: {e}"))),
            (_, other) => Err(Error::Decode(format!(
                "unexpected {} frame for {} format",
                frame_kind(other),
                self
            ))),
        }
    }
}

fn frame_kind(frame: &Message) -> &'static str {
    match frame {
        Message::Text(_) => "text",
        Message::Binary(_) => "binary",
        Message::Ping(_) => "ping",
        Message::Pong(_) => "pong",
        Message::Close(_) => "close",
        Message::Frame(_) => "raw",
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.query_value())
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "protobuf" | "binary" => Ok(Self::Binary),
            "json" | "text" => Ok(Self::Text),
            other => Err(Error::Config(format!(
                "unknown format {other:?} (expected protobuf or json)"
            ))),
        }
    }
}
