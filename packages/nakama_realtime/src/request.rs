//! Typed requests and their replies.
//!
//! A [`Request`] knows how to become an envelope payload and which payload it
//! expects back. [`FromMessage`] turns the delivered payload into the typed
//! response, rejecting a reply of the wrong kind.

use crate::error::{Error, Result};
use crate::proto::{self, envelope::Message};

pub trait FromMessage: Sized {
    fn from_message(message: Option<Message>) -> Result<Self>;
}

/// Replies that carry nothing useful. Any payload is accepted and discarded.
impl FromMessage for () {
    fn from_message(_: Option<Message>) -> Result<Self> {
        Ok(())
    }
}

/// The raw payload, for callers that dispatch on kind themselves.
impl FromMessage for Option<Message> {
    fn from_message(message: Option<Message>) -> Result<Self> {
        Ok(message)
    }
}

macro_rules! from_message {
    ($($ty:ident => $kind:literal),* $(,)?) => {
        $(
            impl FromMessage for proto::$ty {
                fn from_message(message: Option<Message>) -> Result<Self> {
                    match message {
                        Some(Message::$ty(v)) => Ok(v),
                        other => Err(Error::UnexpectedResponse {
                            expected: $kind,
                            got: other.as_ref().map_or("nothing", Message::kind),
                        }),
                    }
                }
            }
        )*
    };
}

from_message! {
    Channel => "channel",
    ChannelMessageAck => "channel_message_ack",
    Match => "match",
    MatchmakerTicket => "matchmaker_ticket",
    Party => "party",
    Pong => "pong",
    Rpc => "rpc",
    Status => "status",
}

pub trait Request {
    type Response: FromMessage;

    /// `false` for pushes that the server never acknowledges. Such requests go
    /// out without a correlation id and complete as soon as they are written.
    const EXPECTS_REPLY: bool = true;

    fn into_message(self) -> Message;
}

macro_rules! request {
    ($($req:ident => $resp:ty),* $(,)?) => {
        $(
            impl Request for proto::$req {
                type Response = $resp;

                fn into_message(self) -> Message {
                    Message::$req(self)
                }
            }
        )*
    };
}

request! {
    ChannelJoin => proto::Channel,
    ChannelLeave => (),
    ChannelMessageSend => proto::ChannelMessageAck,
    ChannelMessageUpdate => proto::ChannelMessageAck,
    ChannelMessageRemove => proto::ChannelMessageAck,
    MatchCreate => proto::Match,
    MatchJoin => proto::Match,
    MatchLeave => (),
    MatchmakerAdd => proto::MatchmakerTicket,
    MatchmakerRemove => (),
    Ping => proto::Pong,
    Rpc => proto::Rpc,
    StatusFollow => proto::Status,
    StatusUnfollow => (),
    StatusUpdate => (),
    PartyCreate => proto::Party,
    PartyJoin => (),
    PartyLeave => (),
}

impl Request for proto::MatchDataSend {
    type Response = ();
    const EXPECTS_REPLY: bool = false;

    fn into_message(self) -> Message {
        Message::MatchDataSend(self)
    }
}

// ── Builders ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum ChannelJoinType {
    #[default]
    Unspecified = 0,
    Room = 1,
    DirectMessage = 2,
    Group = 3,
}

impl proto::ChannelJoin {
    pub fn new(target: impl Into<String>, kind: ChannelJoinType) -> Self {
        Self {
            target: target.into(),
            r#type: kind as i32,
            ..Default::default()
        }
    }

    pub fn with_persistence(mut self, persistence: bool) -> Self {
        self.persistence = Some(persistence);
        self
    }

    pub fn with_hidden(mut self, hidden: bool) -> Self {
        self.hidden = Some(hidden);
        self
    }
}

impl proto::ChannelLeave {
    pub fn new(channel_id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
        }
    }
}

impl proto::ChannelMessageSend {
    /// `content` must be a JSON object.
    pub fn new(channel_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            content: content.into(),
        }
    }
}

impl proto::ChannelMessageUpdate {
    pub fn new(
        channel_id: impl Into<String>,
        message_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            message_id: message_id.into(),
            content: content.into(),
        }
    }
}

impl proto::ChannelMessageRemove {
    pub fn new(channel_id: impl Into<String>, message_id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            message_id: message_id.into(),
        }
    }
}

impl proto::MatchCreate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl proto::MatchJoin {
    pub fn new(match_id: impl Into<String>) -> Self {
        Self {
            match_id: match_id.into(),
            ..Default::default()
        }
    }

    /// Join the match a matchmaker ticket resolved to.
    pub fn from_token(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            ..Default::default()
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

impl proto::MatchLeave {
    pub fn new(match_id: impl Into<String>) -> Self {
        Self {
            match_id: match_id.into(),
        }
    }
}

impl proto::MatchDataSend {
    pub fn new(match_id: impl Into<String>, op_code: i64, data: impl Into<Vec<u8>>) -> Self {
        Self {
            match_id: match_id.into(),
            op_code,
            data: data.into(),
            ..Default::default()
        }
    }

    pub fn with_presences(mut self, presences: Vec<proto::UserPresence>) -> Self {
        self.presences = presences;
        self
    }

    pub fn with_reliable(mut self, reliable: bool) -> Self {
        self.reliable = reliable;
        self
    }
}

impl proto::MatchmakerAdd {
    pub fn new(query: impl Into<String>, min_count: i32, max_count: i32) -> Self {
        Self {
            query: query.into(),
            min_count,
            max_count,
            ..Default::default()
        }
    }

    pub fn with_string_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.string_properties.insert(key.into(), value.into());
        self
    }

    pub fn with_numeric_property(mut self, key: impl Into<String>, value: f64) -> Self {
        self.numeric_properties.insert(key.into(), value);
        self
    }
}

impl proto::MatchmakerRemove {
    pub fn new(ticket: impl Into<String>) -> Self {
        Self {
            ticket: ticket.into(),
        }
    }
}

impl proto::Ping {
    pub fn new() -> Self {
        Self {}
    }
}

impl proto::Rpc {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Encode `value` as the JSON payload.
    pub fn with_json<T: serde::Serialize>(mut self, value: &T) -> Result<Self> {
        self.payload = serde_json::to_string(value)
            .map_err(|e| Error::Send(format!("rpc payload: {e}")))?;
        Ok(self)
    }

    pub fn with_http_key(mut self, http_key: impl Into<String>) -> Self {
        self.http_key = http_key.into();
        self
    }
}

impl proto::StatusFollow {
    pub fn new<I, S>(user_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            user_ids: user_ids.into_iter().map(Into::into).collect(),
            usernames: Vec::new(),
        }
    }

    pub fn with_usernames<I, S>(mut self, usernames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.usernames = usernames.into_iter().map(Into::into).collect();
        self
    }
}

impl proto::StatusUnfollow {
    pub fn new<I, S>(user_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            user_ids: user_ids.into_iter().map(Into::into).collect(),
        }
    }
}

impl proto::StatusUpdate {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
        }
    }

    /// Clear the status so followers see the user as offline.
    pub fn offline() -> Self {
        Self { status: None }
    }
}

impl proto::PartyCreate {
    pub fn new(open: bool, max_size: i32) -> Self {
        Self { open, max_size }
    }
}

impl proto::PartyJoin {
    pub fn new(party_id: impl Into<String>) -> Self {
        Self {
            party_id: party_id.into(),
        }
    }
}

impl proto::PartyLeave {
    pub fn new(party_id: impl Into<String>) -> Self {
        Self {
            party_id: party_id.into(),
        }
    }
}
