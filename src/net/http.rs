//! HTTP client shared by the adapters, the probe and the tunnel

use reqwest::header::HeaderMap;
use reqwest::{Client, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::HttpSettings;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP {status}: {reason}")]
    Status { status: u16, reason: String },

    #[error("request failed: {0}")]
    Request(String),

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

pub type Result<T> = std::result::Result<T, FetchError>;

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl From<&HttpSettings> for HttpConfig {
    fn from(settings: &HttpSettings) -> Self {
        Self {
            connect_timeout: Duration::from_millis(settings.connect_timeout_ms),
            user_agent: settings.user_agent.clone(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self::from(&HttpSettings::default())
    }
}

/// Thin wrapper over a pooled `reqwest::Client`. Cheap to clone.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    user_agent: String,
}

impl HttpClient {
    pub fn new(config: HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| FetchError::Request(e.to_string()))?;

        Ok(Self {
            client,
            user_agent: config.user_agent,
        })
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// GET a JSON document. The timeout covers the whole exchange.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str, timeout: Duration) -> Result<T> {
        debug!(url, "GET json");
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| map_reqwest(e, timeout))?;

        let response = check_status(response)?;
        response
            .json::<T>()
            .await
            .map_err(|e| map_body_error(e, timeout))
    }

    /// GET a text document with extra headers
    pub async fn get_text(
        &self,
        url: &str,
        headers: HeaderMap,
        timeout: Duration,
    ) -> Result<String> {
        debug!(url, "GET text");
        let response = self
            .client
            .get(url)
            .headers(headers)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| map_reqwest(e, timeout))?;

        let response = check_status(response)?;
        response.text().await.map_err(|e| map_body_error(e, timeout))
    }

    /// POST a JSON body and decode a JSON reply
    pub async fn post_json<B, T>(
        &self,
        url: &str,
        headers: HeaderMap,
        body: &B,
        timeout: Duration,
    ) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!(url, "POST json");
        let response = self
            .client
            .post(url)
            .headers(headers)
            .json(body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| map_reqwest(e, timeout))?;

        let response = check_status(response)?;
        response
            .json::<T>()
            .await
            .map_err(|e| map_body_error(e, timeout))
    }

    /// Open a streaming GET. Only the wait for response headers is bounded
    /// by `timeout`; the body may take as long as the transfer needs.
    pub async fn open(&self, url: &str, headers: HeaderMap, timeout: Duration) -> Result<Response> {
        debug!(url, "GET stream");
        let send = self.client.get(url).headers(headers).send();

        let response = tokio::time::timeout(timeout, send)
            .await
            .map_err(|_| FetchError::Timeout(timeout))?
            .map_err(|e| map_reqwest(e, timeout))?;

        check_status(response)
    }
}

fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
        });
    }
    Ok(response)
}

fn map_reqwest(error: reqwest::Error, timeout: Duration) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout(timeout)
    } else if error.is_builder() {
        FetchError::InvalidUrl(error.to_string())
    } else {
        FetchError::Request(error.to_string())
    }
}

fn map_body_error(error: reqwest::Error, timeout: Duration) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout(timeout)
    } else {
        FetchError::Decode(error.to_string())
    }
}
