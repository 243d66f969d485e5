//! HTTP exchange for a single call.

use crate::classify::Exchange;
use crate::error::{ClientError, Result};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:40.0) Gecko/20100101 Firefox/40.0";

/// POSTs serialized envelopes to `{api_url}/more.php?{method}`.
///
/// Cheap to clone; every in-flight exchange holds its own copy.
#[derive(Debug, Clone)]
pub(crate) struct Transport {
    http: Client,
    api_url: String,
    timeout: Duration,
}

impl Transport {
    /// Build a transport for an already normalized API URL.
    pub fn new(api_url: &str, timeout: Duration) -> Result<Self> {
        let origin = HeaderValue::from_str(&format!("{}/", api_url))
            .map_err(|e| ClientError::InvalidUrl(e.to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/json, text/javascript, */*; q=0.01"),
        );
        headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=UTF-8"),
        );
        headers.insert("X-Requested-With", HeaderValue::from_static("XMLHttpRequest"));
        headers.insert(header::REFERER, origin.clone());
        headers.insert(header::ORIGIN, origin);
        headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));

        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .cookie_store(true)
            .build()?;

        Ok(Self {
            http,
            api_url: api_url.to_string(),
            timeout,
        })
    }

    /// Run one exchange. Never fails; every outcome is reported as an
    /// [`Exchange`] for classification.
    pub async fn post(&self, method: &str, body: Vec<u8>) -> Exchange {
        let url = format!("{}/more.php?{}", self.api_url, method);
        debug!(url = %url, bytes = body.len(), "Posting call");

        let exchange = async {
            let response = self.http.post(&url).body(body).send().await?;
            let status = response.status().as_u16();
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>((status, body))
        };

        match tokio::time::timeout(self.timeout, exchange).await {
            Err(_) => Exchange::TimedOut,
            Ok(Err(e)) if e.is_timeout() => Exchange::TimedOut,
            Ok(Err(e)) => Exchange::Failed(e.to_string()),
            Ok(Ok((status, body))) => Exchange::Response {
                status,
                body: body.to_vec(),
            },
        }
    }
}
