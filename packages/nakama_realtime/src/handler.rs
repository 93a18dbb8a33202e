//! Connection setup: where the socket URL and auth token come from, and how
//! they are combined into the URL that is dialed.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use url::Url;

use crate::codec::Format;
use crate::config::ConnConfig;
use crate::error::{Error, Result};

/// Supplies the socket URL and a fresh auth token when the caller does not set
/// them explicitly.
pub trait ConnHandler: Send + Sync {
    fn socket_url(&self) -> anyhow::Result<String>;

    fn token(&self) -> BoxFuture<'_, anyhow::Result<String>>;
}

/// Options for [`Conn::connect`](crate::Conn::connect).
#[derive(Clone)]
pub struct ConnOptions {
    handler: Option<Arc<dyn ConnHandler>>,
    url: Option<String>,
    token: Option<String>,
    pub(crate) format: Format,
    query: BTreeMap<String, String>,
    pub(crate) call_timeout: Option<Duration>,
    pub(crate) sweep_interval: Duration,
    pub(crate) channel_capacity: usize,
}

impl Default for ConnOptions {
    fn default() -> Self {
        let defaults = ConnConfig::default();
        Self {
            handler: None,
            url: None,
            token: None,
            format: Format::default(),
            query: BTreeMap::new(),
            call_timeout: None,
            sweep_interval: defaults.sweep_interval(),
            channel_capacity: defaults.channel_capacity,
        }
    }
}

impl fmt::Debug for ConnOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnOptions")
            .field("handler", &self.handler.is_some())
            .field("url", &self.url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("format", &self.format)
            .field("query", &self.query)
            .field("call_timeout", &self.call_timeout)
            .field("sweep_interval", &self.sweep_interval)
            .field("channel_capacity", &self.channel_capacity)
            .finish()
    }
}

/// URL to dial plus the same URL without its query, safe to log.
#[derive(Debug, Clone)]
pub(crate) struct Endpoint {
    pub base: String,
    pub url: Url,
}

impl ConnOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build options from a loaded [`ConnConfig`].
    pub fn from_config(config: &ConnConfig) -> Result<Self> {
        let mut opts = Self::new()
            .with_format(config.format()?)
            .with_sweep_interval(config.sweep_interval())
            .with_channel_capacity(config.channel_capacity);
        opts.call_timeout = config.call_timeout();
        if let Some(url) = &config.url {
            opts = opts.with_url(url);
        }
        if let Some(token) = &config.token {
            opts = opts.with_token(token);
        }
        for (k, v) in &config.query {
            opts = opts.with_query(k, v);
        }
        if let Some(lang) = &config.lang {
            opts = opts.with_lang(lang);
        }
        if let Some(status) = config.create_status {
            opts = opts.with_create_status(status);
        }
        Ok(opts)
    }

    pub fn with_handler(mut self, handler: impl ConnHandler + 'static) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Add a query parameter. `token` and `format` are always taken from their
    /// own settings and cannot be overridden here.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn with_lang(self, lang: impl Into<String>) -> Self {
        self.with_query("lang", lang)
    }

    /// Ask the server to create a status presence on connect.
    pub fn with_create_status(self, status: bool) -> Self {
        self.with_query("status", status.to_string())
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    pub fn format(&self) -> Format {
        self.format
    }

    fn resolve_url(&self) -> Result<String> {
        if let Some(url) = &self.url {
            return Ok(url.clone());
        }
        match &self.handler {
            Some(h) => h
                .socket_url()
                .map_err(|e| Error::Config(format!("socket url: {e:#}"))),
            None => Err(Error::Config("no socket url or handler configured".into())),
        }
    }

    async fn resolve_token(&self) -> Result<String> {
        if let Some(token) = &self.token {
            return Ok(token.clone());
        }
        match &self.handler {
            Some(h) => h
                .token()
                .await
                .map_err(|e| Error::Config(format!("token: {e:#}"))),
            None => Err(Error::Config("no token or handler configured".into())),
        }
    }

    /// Resolve URL then token and assemble the URL to dial.
    pub(crate) async fn endpoint(&self) -> Result<Endpoint> {
        let base = self.resolve_url()?;
        let token = self.resolve_token().await?;

        let mut url =
            Url::parse(&base).map_err(|e| Error::Config(format!("invalid url {base:?}: {e}")))?;
        url.set_query(None);
        url.set_fragment(None);
        let base = url.to_string();
        {
            let mut q = url.query_pairs_mut();
            for (k, v) in &self.query {
                if k != "token" && k != "format" {
                    q.append_pair(k, v);
                }
            }
            q.append_pair("token", &token);
            q.append_pair("format", self.format.query_value());
        }
        Ok(Endpoint { base, url })
    }
}
