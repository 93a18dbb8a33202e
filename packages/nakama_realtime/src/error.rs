//! Error taxonomy for the realtime connection.

use std::collections::HashMap;
use std::fmt;

use crate::proto;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid connection settings: {0}")]
    Config(String),

    #[error("unable to open realtime websocket {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: Box<tokio_tungstenite::tungstenite::Error>,
    },

    #[error("send failed: {0}")]
    Send(String),

    #[error("decode failed: {0}")]
    Decode(String),

    #[error("protocol violation: {0}")]
    Protocol(String),

    #[error(transparent)]
    Realtime(#[from] RealtimeError),

    #[error("call cancelled")]
    Cancelled,

    #[error("call timed out")]
    Timeout,

    #[error("connection closed")]
    Closed,

    #[error("unexpected response: expected {expected}, got {got}")]
    UnexpectedResponse {
        expected: &'static str,
        got: &'static str,
    },
}

impl Error {
    pub fn error_code(&self) -> &str {
        match self {
            Self::Config(_) => "config",
            Self::Connect { .. } => "connect",
            Self::Send(_) => "send",
            Self::Decode(_) => "decode",
            Self::Protocol(_) => "protocol",
            Self::Realtime(_) => "realtime",
            Self::Cancelled => "cancelled",
            Self::Timeout => "timeout",
            Self::Closed => "closed",
            Self::UnexpectedResponse { .. } => "unexpected_response",
        }
    }

    /// True when the server answered with an error payload carrying `code`.
    pub fn is_realtime_code(&self, code: i32) -> bool {
        matches!(self, Self::Realtime(e) if e.code == code)
    }
}

/// Error codes the server reports in an error payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    RuntimeException,
    UnrecognizedPayload,
    MissingPayload,
    BadInput,
    InvalidArgument,
    MatchNotFound,
    MatchJoinRejected,
    RuntimeFunctionNotFound,
    RuntimeFunctionException,
}

impl ErrorCode {
    pub fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            0 => Self::RuntimeException,
            1 => Self::UnrecognizedPayload,
            2 => Self::MissingPayload,
            3 => Self::BadInput,
            4 => Self::InvalidArgument,
            5 => Self::MatchNotFound,
            6 => Self::MatchJoinRejected,
            7 => Self::RuntimeFunctionNotFound,
            8 => Self::RuntimeFunctionException,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RuntimeException => "RUNTIME_EXCEPTION",
            Self::UnrecognizedPayload => "UNRECOGNIZED_PAYLOAD",
            Self::MissingPayload => "MISSING_PAYLOAD",
            Self::BadInput => "BAD_INPUT",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::MatchNotFound => "MATCH_NOT_FOUND",
            Self::MatchJoinRejected => "MATCH_JOIN_REJECTED",
            Self::RuntimeFunctionNotFound => "RUNTIME_FUNCTION_NOT_FOUND",
            Self::RuntimeFunctionException => "RUNTIME_FUNCTION_EXCEPTION",
        }
    }
}

/// Server error payload lifted into a Rust error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealtimeError {
    pub code: i32,
    pub message: String,
    pub context: HashMap<String, String>,
}

impl RealtimeError {
    pub fn code_name(&self) -> &'static str {
        ErrorCode::from_code(self.code)
            .map(|c| c.as_str())
            .unwrap_or("UNKNOWN")
    }
}

impl From<proto::Error> for RealtimeError {
    fn from(e: proto::Error) -> Self {
        Self {
            code: e.code,
            message: e.message,
            context: e.context,
        }
    }
}

impl fmt::Display for RealtimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "realtime socket error {} ({}): {}",
            self.code_name(),
            self.code,
            self.message
        )?;
        if !self.context.is_empty() {
            let mut keys: Vec<&String> = self.context.keys().collect();
            keys.sort();
            let pairs: Vec<String> = keys
                .into_iter()
                .map(|k| format!("{}:{}", k, self.context[k]))
                .collect();
            write!(f, " <{}>", pairs.join(" "))?;
        }
        Ok(())
    }
}

impl std::error::Error for RealtimeError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn realtime(code: i32, message: &str, context: &[(&str, &str)]) -> RealtimeError {
        RealtimeError {
            code,
            message: message.to_string(),
            context: context
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn renders_invalid_argument() {
        let e = realtime(4, "bad id", &[]);
        assert_eq!(
            e.to_string(),
            "realtime socket error INVALID_ARGUMENT (4): bad id"
        );
    }

    #[test]
    fn renders_context_sorted_by_key() {
        let e = realtime(3, "nope", &[("zeta", "1"), ("alpha", "2"), ("mid", "3")]);
        assert_eq!(
            e.to_string(),
            "realtime socket error BAD_INPUT (3): nope <alpha:2 mid:3 zeta:1>"
        );
    }

    #[test]
    fn unknown_code_renders_unknown() {
        let e = realtime(42, "huh", &[]);
        assert_eq!(e.to_string(), "realtime socket error UNKNOWN (42): huh");
        assert_eq!(realtime(-1, "", &[]).code_name(), "UNKNOWN");
    }

    #[test]
    fn every_known_code_has_a_name() {
        for code in 0..=8 {
            assert!(ErrorCode::from_code(code).is_some(), "code {code}");
        }
        assert_eq!(ErrorCode::from_code(9), None);
    }

    #[test]
    fn realtime_error_converts_from_payload() {
        let payload = proto::Error {
            code: 5,
            message: "gone".into(),
            context: HashMap::from([("match_id".to_string(), "m1".to_string())]),
        };
        let err: Error = RealtimeError::from(payload).into();
        assert!(err.is_realtime_code(5));
        assert!(!err.is_realtime_code(4));
        assert_eq!(err.error_code(), "realtime");
        assert_eq!(
            err.to_string(),
            "realtime socket error MATCH_NOT_FOUND (5): gone <match_id:m1>"
        );
    }

    #[test]
    fn error_codes_are_snake_case() {
        assert_eq!(Error::Closed.error_code(), "closed");
        assert_eq!(
            Error::UnexpectedResponse {
                expected: "channel",
                got: "match"
            }
            .error_code(),
            "unexpected_response"
        );
    }
}
