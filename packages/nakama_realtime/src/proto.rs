//! Realtime envelope schema.
//!
//! Every frame on the socket is one [`Envelope`]: an optional correlation id
//! (`cid`) plus exactly one payload from the closed [`envelope::Message`] set.
//! The same types carry both `prost` (binary) and `serde` (JSON) derives so the
//! two wire formats share one schema.
//!
//! JSON shape: `{ "cid": "3", "channel_join": { "target": "lobby", ... } }`
//!
//! The JSON side follows protojson: `google.protobuf.*Value` wrappers are plain
//! optional values, int64 is a decimal string and bytes are base64.

use std::collections::HashMap;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Wire unit. An empty `cid` marks an unsolicited server push.
#[derive(Clone, PartialEq, prost::Message, Serialize)]
pub struct Envelope {
    #[prost(string, tag = "1")]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cid: String,
    #[prost(
        oneof = "envelope::Message",
        tags = "2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25, 26, 27, 28, 29, 30, 31, 32, 33, 34, 35, 36, 37"
    )]
    #[serde(flatten)]
    pub message: Option<envelope::Message>,
}

impl Envelope {
    pub fn push(message: envelope::Message) -> Self {
        Self {
            cid: String::new(),
            message: Some(message),
        }
    }

    pub fn reply(cid: impl Into<String>, message: Option<envelope::Message>) -> Self {
        Self {
            cid: cid.into(),
            message,
        }
    }
}

/// Strict JSON decoding: at most one payload key, and a payload that fails to
/// parse fails the whole envelope.
impl<'de> Deserialize<'de> for Envelope {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut fields = Map::<String, Value>::deserialize(deserializer)?;

        let cid = match fields.remove("cid") {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(cid)) => cid,
            Some(other) => {
                return Err(de::Error::custom(format!("cid must be a string, got {other}")));
            }
        };
        if fields.len() > 1 {
            let keys: Vec<&str> = fields.keys().map(String::as_str).collect();
            return Err(de::Error::custom(format!(
                "envelope carries more than one payload: {}",
                keys.join(", ")
            )));
        }

        let message = match fields.into_iter().next() {
            None => None,
            Some((kind, body)) => {
                let tagged = Value::Object(Map::from_iter([(kind.clone(), body)]));
                let message = envelope::Message::deserialize(tagged)
                    .map_err(|e| de::Error::custom(format!("{kind}: {e}")))?;
                Some(message)
            }
        };

        Ok(Self { cid, message })
    }
}

/// serde adapters for protojson scalar encodings.
mod protojson {
    /// int64 travels as a decimal string; plain numbers are accepted too.
    pub mod int64 {
        use serde::{Deserialize, Deserializer, Serializer, de};

        pub fn serialize<S: Serializer>(value: &i64, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_str(value)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
            #[derive(Deserialize)]
            #[serde(untagged)]
            enum Repr {
                Number(i64),
                Text(String),
            }

            match Repr::deserialize(deserializer)? {
                Repr::Number(n) => Ok(n),
                Repr::Text(s) => s
                    .parse()
                    .map_err(|e| de::Error::custom(format!("invalid int64 {s:?}: {e}"))),
            }
        }
    }

    /// bytes travel as standard base64.
    pub mod bytes {
        use base64::Engine;
        use base64::engine::general_purpose::STANDARD;
        use serde::{Deserialize, Deserializer, Serializer, de};

        pub fn serialize<S, T>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
            T: AsRef<[u8]>,
        {
            serializer.serialize_str(&STANDARD.encode(value.as_ref()))
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
            let text = String::deserialize(deserializer)?;
            STANDARD
                .decode(text.as_bytes())
                .map_err(|e| de::Error::custom(format!("invalid base64: {e}")))
        }
    }
}

pub mod envelope {
    use serde::{Deserialize, Serialize};

    /// Every payload kind the socket understands.
    #[derive(Clone, PartialEq, prost::Oneof, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum Message {
        #[prost(message, tag = "2")]
        Channel(super::Channel),
        #[prost(message, tag = "3")]
        ChannelJoin(super::ChannelJoin),
        #[prost(message, tag = "4")]
        ChannelLeave(super::ChannelLeave),
        #[prost(message, tag = "5")]
        ChannelMessage(super::ChannelMessage),
        #[prost(message, tag = "6")]
        ChannelMessageAck(super::ChannelMessageAck),
        #[prost(message, tag = "7")]
        ChannelMessageSend(super::ChannelMessageSend),
        #[prost(message, tag = "8")]
        ChannelMessageUpdate(super::ChannelMessageUpdate),
        #[prost(message, tag = "9")]
        ChannelMessageRemove(super::ChannelMessageRemove),
        #[prost(message, tag = "10")]
        ChannelPresenceEvent(super::ChannelPresenceEvent),
        #[prost(message, tag = "11")]
        Error(super::Error),
        #[prost(message, tag = "12")]
        Match(super::Match),
        #[prost(message, tag = "13")]
        MatchCreate(super::MatchCreate),
        #[prost(message, tag = "14")]
        MatchData(super::MatchData),
        #[prost(message, tag = "15")]
        MatchDataSend(super::MatchDataSend),
        #[prost(message, tag = "16")]
        MatchJoin(super::MatchJoin),
        #[prost(message, tag = "17")]
        MatchLeave(super::MatchLeave),
        #[prost(message, tag = "18")]
        MatchPresenceEvent(super::MatchPresenceEvent),
        #[prost(message, tag = "19")]
        MatchmakerAdd(super::MatchmakerAdd),
        #[prost(message, tag = "20")]
        MatchmakerMatched(super::MatchmakerMatched),
        #[prost(message, tag = "21")]
        MatchmakerRemove(super::MatchmakerRemove),
        #[prost(message, tag = "22")]
        MatchmakerTicket(super::MatchmakerTicket),
        #[prost(message, tag = "23")]
        Notifications(super::Notifications),
        #[prost(message, tag = "24")]
        Rpc(super::Rpc),
        #[prost(message, tag = "25")]
        Status(super::Status),
        #[prost(message, tag = "26")]
        StatusFollow(super::StatusFollow),
        #[prost(message, tag = "27")]
        StatusPresenceEvent(super::StatusPresenceEvent),
        #[prost(message, tag = "28")]
        StatusUnfollow(super::StatusUnfollow),
        #[prost(message, tag = "29")]
        StatusUpdate(super::StatusUpdate),
        #[prost(message, tag = "30")]
        StreamData(super::StreamData),
        #[prost(message, tag = "31")]
        StreamPresenceEvent(super::StreamPresenceEvent),
        #[prost(message, tag = "32")]
        Ping(super::Ping),
        #[prost(message, tag = "33")]
        Pong(super::Pong),
        #[prost(message, tag = "34")]
        Party(super::Party),
        #[prost(message, tag = "35")]
        PartyCreate(super::PartyCreate),
        #[prost(message, tag = "36")]
        PartyJoin(super::PartyJoin),
        #[prost(message, tag = "37")]
        PartyLeave(super::PartyLeave),
    }

    impl Message {
        /// Wire name of the payload kind, as used in the JSON format.
        pub fn kind(&self) -> &'static str {
            match self {
                Self::Channel(_) => "channel",
                Self::ChannelJoin(_) => "channel_join",
                Self::ChannelLeave(_) => "channel_leave",
                Self::ChannelMessage(_) => "channel_message",
                Self::ChannelMessageAck(_) => "channel_message_ack",
                Self::ChannelMessageSend(_) => "channel_message_send",
                Self::ChannelMessageUpdate(_) => "channel_message_update",
                Self::ChannelMessageRemove(_) => "channel_message_remove",
                Self::ChannelPresenceEvent(_) => "channel_presence_event",
                Self::Error(_) => "error",
                Self::Match(_) => "match",
                Self::MatchCreate(_) => "match_create",
                Self::MatchData(_) => "match_data",
                Self::MatchDataSend(_) => "match_data_send",
                Self::MatchJoin(_) => "match_join",
                Self::MatchLeave(_) => "match_leave",
                Self::MatchPresenceEvent(_) => "match_presence_event",
                Self::MatchmakerAdd(_) => "matchmaker_add",
                Self::MatchmakerMatched(_) => "matchmaker_matched",
                Self::MatchmakerRemove(_) => "matchmaker_remove",
                Self::MatchmakerTicket(_) => "matchmaker_ticket",
                Self::Notifications(_) => "notifications",
                Self::Rpc(_) => "rpc",
                Self::Status(_) => "status",
                Self::StatusFollow(_) => "status_follow",
                Self::StatusPresenceEvent(_) => "status_presence_event",
                Self::StatusUnfollow(_) => "status_unfollow",
                Self::StatusUpdate(_) => "status_update",
                Self::StreamData(_) => "stream_data",
                Self::StreamPresenceEvent(_) => "stream_presence_event",
                Self::Ping(_) => "ping",
                Self::Pong(_) => "pong",
                Self::Party(_) => "party",
                Self::PartyCreate(_) => "party_create",
                Self::PartyJoin(_) => "party_join",
                Self::PartyLeave(_) => "party_leave",
            }
        }
    }
}

// ── Shared ──────────────────────────────────────────────────────────────

#[derive(Clone, PartialEq, Eq, Hash, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct UserPresence {
    #[prost(string, tag = "1")]
    pub user_id: String,
    #[prost(string, tag = "2")]
    pub session_id: String,
    #[prost(string, tag = "3")]
    pub username: String,
    #[prost(bool, tag = "4")]
    pub persistence: bool,
    #[prost(message, optional, tag = "5")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Server-reported failure. Delivered to the waiting caller when tagged with a
/// cid, otherwise to the connection's error observers.
#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct Error {
    #[prost(int32, tag = "1")]
    pub code: i32,
    #[prost(string, tag = "2")]
    pub message: String,
    #[prost(map = "string, string", tag = "3")]
    pub context: HashMap<String, String>,
}

#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
pub struct Ping {}

#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
pub struct Pong {}

#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct Rpc {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub payload: String,
    #[prost(string, tag = "3")]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub http_key: String,
}

// ── Channels ────────────────────────────────────────────────────────────

#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct Channel {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(message, repeated, tag = "2")]
    pub presences: Vec<UserPresence>,
    #[prost(message, optional, tag = "3")]
    #[serde(rename = "self", skip_serializing_if = "Option::is_none")]
    pub self_presence: Option<UserPresence>,
    #[prost(string, tag = "4")]
    pub room_name: String,
    #[prost(string, tag = "5")]
    pub group_id: String,
    #[prost(string, tag = "6")]
    pub user_id_one: String,
    #[prost(string, tag = "7")]
    pub user_id_two: String,
}

#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelJoin {
    #[prost(string, tag = "1")]
    pub target: String,
    #[prost(int32, tag = "2")]
    pub r#type: i32,
    #[prost(message, optional, tag = "3")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistence: Option<bool>,
    #[prost(message, optional, tag = "4")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
}

#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelLeave {
    #[prost(string, tag = "1")]
    pub channel_id: String,
}

#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelMessage {
    #[prost(string, tag = "1")]
    pub channel_id: String,
    #[prost(string, tag = "2")]
    pub message_id: String,
    #[prost(message, optional, tag = "3")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<i32>,
    #[prost(string, tag = "4")]
    pub sender_id: String,
    #[prost(string, tag = "5")]
    pub username: String,
    #[prost(string, tag = "6")]
    pub content: String,
    #[prost(message, optional, tag = "9")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistent: Option<bool>,
    #[prost(string, tag = "10")]
    pub room_name: String,
    #[prost(string, tag = "11")]
    pub group_id: String,
    #[prost(string, tag = "12")]
    pub user_id_one: String,
    #[prost(string, tag = "13")]
    pub user_id_two: String,
}

#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelMessageAck {
    #[prost(string, tag = "1")]
    pub channel_id: String,
    #[prost(string, tag = "2")]
    pub message_id: String,
    #[prost(message, optional, tag = "3")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<i32>,
    #[prost(string, tag = "4")]
    pub username: String,
    #[prost(message, optional, tag = "7")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistent: Option<bool>,
    #[prost(string, tag = "8")]
    pub room_name: String,
    #[prost(string, tag = "9")]
    pub group_id: String,
    #[prost(string, tag = "10")]
    pub user_id_one: String,
    #[prost(string, tag = "11")]
    pub user_id_two: String,
}

#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelMessageSend {
    #[prost(string, tag = "1")]
    pub channel_id: String,
    #[prost(string, tag = "2")]
    pub content: String,
}

#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelMessageUpdate {
    #[prost(string, tag = "1")]
    pub channel_id: String,
    #[prost(string, tag = "2")]
    pub message_id: String,
    #[prost(string, tag = "3")]
    pub content: String,
}

#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelMessageRemove {
    #[prost(string, tag = "1")]
    pub channel_id: String,
    #[prost(string, tag = "2")]
    pub message_id: String,
}

#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelPresenceEvent {
    #[prost(string, tag = "1")]
    pub channel_id: String,
    #[prost(message, repeated, tag = "2")]
    pub joins: Vec<UserPresence>,
    #[prost(message, repeated, tag = "3")]
    pub leaves: Vec<UserPresence>,
    #[prost(string, tag = "4")]
    pub room_name: String,
    #[prost(string, tag = "5")]
    pub group_id: String,
    #[prost(string, tag = "6")]
    pub user_id_one: String,
    #[prost(string, tag = "7")]
    pub user_id_two: String,
}

// ── Matches ─────────────────────────────────────────────────────────────

#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct Match {
    #[prost(string, tag = "1")]
    pub match_id: String,
    #[prost(bool, tag = "2")]
    pub authoritative: bool,
    #[prost(message, optional, tag = "3")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[prost(int32, tag = "4")]
    pub size: i32,
    #[prost(message, repeated, tag = "5")]
    pub presences: Vec<UserPresence>,
    #[prost(message, optional, tag = "6")]
    #[serde(rename = "self", skip_serializing_if = "Option::is_none")]
    pub self_presence: Option<UserPresence>,
}

#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchCreate {
    #[prost(string, tag = "1")]
    pub name: String,
}

#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchData {
    #[prost(string, tag = "1")]
    pub match_id: String,
    #[prost(message, optional, tag = "2")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence: Option<UserPresence>,
    #[prost(int64, tag = "3")]
    #[serde(with = "protojson::int64")]
    pub op_code: i64,
    #[prost(bytes = "vec", tag = "4")]
    #[serde(with = "protojson::bytes")]
    pub data: Vec<u8>,
    #[prost(bool, tag = "5")]
    pub reliable: bool,
}

#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchDataSend {
    #[prost(string, tag = "1")]
    pub match_id: String,
    #[prost(int64, tag = "2")]
    #[serde(with = "protojson::int64")]
    pub op_code: i64,
    #[prost(bytes = "vec", tag = "3")]
    #[serde(with = "protojson::bytes")]
    pub data: Vec<u8>,
    #[prost(message, repeated, tag = "4")]
    pub presences: Vec<UserPresence>,
    #[prost(bool, tag = "5")]
    pub reliable: bool,
}

/// Join by `match_id` or by matchmaker `token`; exactly one should be set.
#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchJoin {
    #[prost(string, tag = "1")]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub match_id: String,
    #[prost(string, tag = "2")]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub token: String,
    #[prost(map = "string, string", tag = "3")]
    pub metadata: HashMap<String, String>,
}

#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchLeave {
    #[prost(string, tag = "1")]
    pub match_id: String,
}

#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchPresenceEvent {
    #[prost(string, tag = "1")]
    pub match_id: String,
    #[prost(message, repeated, tag = "2")]
    pub joins: Vec<UserPresence>,
    #[prost(message, repeated, tag = "3")]
    pub leaves: Vec<UserPresence>,
}

// ── Matchmaker ──────────────────────────────────────────────────────────

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchmakerAdd {
    #[prost(int32, tag = "1")]
    pub min_count: i32,
    #[prost(int32, tag = "2")]
    pub max_count: i32,
    #[prost(string, tag = "3")]
    pub query: String,
    #[prost(map = "string, string", tag = "4")]
    pub string_properties: HashMap<String, String>,
    #[prost(map = "string, double", tag = "5")]
    pub numeric_properties: HashMap<String, f64>,
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchmakerUser {
    #[prost(message, optional, tag = "1")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence: Option<UserPresence>,
    #[prost(string, tag = "2")]
    pub party_id: String,
    #[prost(map = "string, string", tag = "5")]
    pub string_properties: HashMap<String, String>,
    #[prost(map = "string, double", tag = "6")]
    pub numeric_properties: HashMap<String, f64>,
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchmakerMatched {
    #[prost(string, tag = "1")]
    pub ticket: String,
    #[prost(string, tag = "2")]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub match_id: String,
    #[prost(string, tag = "3")]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub token: String,
    #[prost(message, repeated, tag = "4")]
    pub users: Vec<MatchmakerUser>,
    #[prost(message, optional, tag = "5")]
    #[serde(rename = "self", skip_serializing_if = "Option::is_none")]
    pub self_user: Option<MatchmakerUser>,
}

#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchmakerRemove {
    #[prost(string, tag = "1")]
    pub ticket: String,
}

#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchmakerTicket {
    #[prost(string, tag = "1")]
    pub ticket: String,
}

// ── Notifications ───────────────────────────────────────────────────────

#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct Notification {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub subject: String,
    #[prost(string, tag = "3")]
    pub content: String,
    #[prost(int32, tag = "4")]
    pub code: i32,
    #[prost(string, tag = "5")]
    pub sender_id: String,
    #[prost(bool, tag = "7")]
    pub persistent: bool,
}

#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct Notifications {
    #[prost(message, repeated, tag = "1")]
    pub notifications: Vec<Notification>,
}

// ── Status ──────────────────────────────────────────────────────────────

#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct Status {
    #[prost(message, repeated, tag = "1")]
    pub presences: Vec<UserPresence>,
}

#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusFollow {
    #[prost(string, repeated, tag = "1")]
    pub user_ids: Vec<String>,
    #[prost(string, repeated, tag = "2")]
    pub usernames: Vec<String>,
}

#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusPresenceEvent {
    #[prost(message, repeated, tag = "2")]
    pub joins: Vec<UserPresence>,
    #[prost(message, repeated, tag = "3")]
    pub leaves: Vec<UserPresence>,
}

#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusUnfollow {
    #[prost(string, repeated, tag = "1")]
    pub user_ids: Vec<String>,
}

#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusUpdate {
    /// `None` appears offline.
    #[prost(message, optional, tag = "1")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

// ── Streams ─────────────────────────────────────────────────────────────

#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct Stream {
    #[prost(int32, tag = "1")]
    pub mode: i32,
    #[prost(string, tag = "2")]
    pub subject: String,
    #[prost(string, tag = "3")]
    pub subcontext: String,
    #[prost(string, tag = "4")]
    pub label: String,
}

#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamData {
    #[prost(message, optional, tag = "1")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<Stream>,
    #[prost(message, optional, tag = "2")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<UserPresence>,
    #[prost(string, tag = "3")]
    pub data: String,
    #[prost(bool, tag = "4")]
    pub reliable: bool,
}

#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamPresenceEvent {
    #[prost(message, optional, tag = "1")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<Stream>,
    #[prost(message, repeated, tag = "2")]
    pub joins: Vec<UserPresence>,
    #[prost(message, repeated, tag = "3")]
    pub leaves: Vec<UserPresence>,
}

// ── Parties ─────────────────────────────────────────────────────────────

#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct Party {
    #[prost(string, tag = "1")]
    pub party_id: String,
    #[prost(bool, tag = "2")]
    pub open: bool,
    #[prost(int32, tag = "3")]
    pub max_size: i32,
    #[prost(message, optional, tag = "4")]
    #[serde(rename = "self", skip_serializing_if = "Option::is_none")]
    pub self_presence: Option<UserPresence>,
    #[prost(message, optional, tag = "5")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leader: Option<UserPresence>,
    #[prost(message, repeated, tag = "6")]
    pub presences: Vec<UserPresence>,
}

#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct PartyCreate {
    #[prost(bool, tag = "1")]
    pub open: bool,
    #[prost(int32, tag = "2")]
    pub max_size: i32,
}

#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct PartyJoin {
    #[prost(string, tag = "1")]
    pub party_id: String,
}

#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct PartyLeave {
    #[prost(string, tag = "1")]
    pub party_id: String,
}
