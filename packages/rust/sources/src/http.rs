//! Shared HTTP session for connectors and the image store.

use std::time::Duration;

use recipefeed_shared::{HttpConfig, RecipeFeedError, Result};
use reqwest::Client;
use reqwest::header::{ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use tracing::debug;
use url::Url;

/// Resolve `href` against `base`. Empty hrefs stay empty; unparseable input
/// is returned unchanged.
pub fn resolve_href(base: &str, href: &str) -> String {
    let href = href.trim();
    if href.is_empty() {
        return String::new();
    }
    Url::parse(base)
        .and_then(|b| b.join(href))
        .map(String::from)
        .unwrap_or_else(|_| href.to_string())
}

/// A `reqwest` client carrying the configured user agent and timeouts.
#[derive(Clone)]
pub struct HttpSession {
    client: Client,
    image_timeout: Duration,
}

impl HttpSession {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.8"));

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(Duration::from_secs(config.page_timeout_secs))
            .build()
            .map_err(|e| RecipeFeedError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            image_timeout: Duration::from_secs(config.image_timeout_secs),
        })
    }

    /// GET a page body. Non-2xx responses are errors.
    pub async fn get_text(&self, url: &str) -> Result<String> {
        debug!(%url, "fetching page");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RecipeFeedError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RecipeFeedError::Network(format!("{url}: HTTP {status}")));
        }

        response
            .text()
            .await
            .map_err(|e| RecipeFeedError::Network(format!("{url}: {e}")))
    }

    /// GET raw bytes with the image timeout.
    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        debug!(%url, "fetching image");
        let response = self
            .client
            .get(url)
            .timeout(self.image_timeout)
            .send()
            .await
            .map_err(|e| RecipeFeedError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RecipeFeedError::Network(format!("{url}: HTTP {status}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| RecipeFeedError::Network(format!("{url}: {e}")))?;
        Ok(bytes.to_vec())
    }
}
