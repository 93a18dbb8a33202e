use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::codec::Format;
use crate::error::Result;

// =============================================================================
// Connection config (figment-deserialized from defaults / realtime.toml / env)
// =============================================================================
//
//   realtime.toml:   url = "ws://127.0.0.1:7350/ws"
//                    [query]
//                    app = "demo"
//
//   env var:         NAKAMA_URL=ws://...   NAKAMA_QUERY__APP=demo
//                    (double underscore = nesting)

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "realtime.toml";

/// Environment variable prefix for every setting.
pub const ENV_PREFIX: &str = "NAKAMA_";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConnConfig {
    /// WebSocket endpoint, without query string.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    /// `protobuf` or `json`.
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default)]
    pub create_status: Option<bool>,
    /// Extra query parameters appended to the socket URL.
    #[serde(default)]
    pub query: BTreeMap<String, String>,
    /// Per-call deadline; `0` waits forever.
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for ConnConfig {
    fn default() -> Self {
        Self {
            url: None,
            token: None,
            format: default_format(),
            lang: None,
            create_status: None,
            query: BTreeMap::new(),
            call_timeout_secs: default_call_timeout_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_format() -> String {
    Format::Binary.query_value().to_string()
}

fn default_call_timeout_secs() -> u64 {
    30
}

fn default_sweep_interval_secs() -> u64 {
    30
}

fn default_channel_capacity() -> usize {
    64
}

impl ConnConfig {
    pub fn format(&self) -> Result<Format> {
        self.format.parse()
    }

    pub fn call_timeout(&self) -> Option<Duration> {
        (self.call_timeout_secs > 0).then(|| Duration::from_secs(self.call_timeout_secs))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

/// Build a figment that layers: defaults → config file → NAKAMA_* env vars.
pub fn load_config(config_file: &Path) -> figment::Figment {
    use figment::{
        Figment,
        providers::{Env, Format as _, Serialized, Toml},
    };

    Figment::from(Serialized::defaults(ConnConfig::default()))
        .merge(Toml::file(config_file))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}
