// Kick HTTP client
//
// Wraps `reqwest::Client` with channel URL construction, a hard timeout
// around the whole request/response cycle, and status/body decoding.

use std::time::Duration;

use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::kick::models::ChannelResponse;
use crate::transport::TransportConfig;

/// Default Kick base URL.
pub const DEFAULT_BASE_URL: &str = "https://kick.com";

/// Raw HTTP client for the Kick channel endpoint.
///
/// Stateless: every call issues exactly one GET and never caches.
#[derive(Debug, Clone)]
pub struct KickClient {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl KickClient {
    /// Create a new client from a `TransportConfig`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url,
            timeout: transport.timeout,
        })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    ///
    /// The timeout still bounds each request on top of whatever the
    /// supplied client enforces.
    pub fn with_client(http: reqwest::Client, base_url: Url, timeout: Duration) -> Self {
        Self {
            http,
            base_url,
            timeout,
        }
    }

    /// The API base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The per-request bound.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Build `{base}/api/v1/channels/{slug}`, percent-encoding the slug.
    pub(crate) fn channel_url(&self, slug: &str) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(["api", "v1", "channels", slug]);
        Ok(url)
    }

    /// Fetch the channel record for `slug`.
    ///
    /// The whole exchange, body included, is bounded by the configured
    /// timeout and reported as [`Error::Timeout`] when it fires.
    pub async fn channel(&self, slug: &str) -> Result<ChannelResponse, Error> {
        let url = self.channel_url(slug)?;
        debug!("GET {}", url);

        match tokio::time::timeout(self.timeout, self.get_json(url)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout {
                timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }

    async fn get_json(&self, url: Url) -> Result<ChannelResponse, Error> {
        let resp = self.http.get(url).send().await.map_err(Error::Transport)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
            });
        }

        let body = resp.text().await.map_err(Error::Transport)?;

        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        })
    }
}
