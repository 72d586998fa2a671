//! Client configuration object and helpers.

use std::time::Duration;

use url::Url;

/// Default number of items requested per backfill page.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Default timeout applied to every REST request.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default delay between WebSocket redial attempts.
const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// Builder-style configuration for creating a [`crate::FeedSession`].
///
/// # Examples
/// ```
/// use client::ClientConfig;
/// use url::Url;
///
/// let api = Url::parse("https://api.example.test/v1/").expect("valid URL");
/// let push = Url::parse("wss://push.example.test/socket").expect("valid URL");
/// let config = ClientConfig::new(api, push).with_page_size(25);
/// assert_eq!(config.page_size(), 25);
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub(crate) api_base: Url,
    pub(crate) push_url: Url,
    pub(crate) page_size: usize,
    pub(crate) request_timeout: Duration,
    pub(crate) reconnect_delay: Duration,
}

impl ClientConfig {
    /// Construct a configuration from the REST base URL and the push
    /// channel endpoint.
    #[must_use]
    pub const fn new(api_base: Url, push_url: Url) -> Self {
        Self {
            api_base,
            push_url,
            page_size: DEFAULT_PAGE_SIZE,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }

    /// Override the backfill page size. Values below one are clamped to one.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Override the REST request timeout.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Override the delay between WebSocket redial attempts.
    #[must_use]
    pub const fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Return the REST base URL.
    #[must_use]
    pub const fn api_base(&self) -> &Url {
        &self.api_base
    }

    /// Return the push channel endpoint.
    #[must_use]
    pub const fn push_url(&self) -> &Url {
        &self.push_url
    }

    /// Return the backfill page size.
    #[must_use]
    pub const fn page_size(&self) -> usize {
        self.page_size
    }
}
