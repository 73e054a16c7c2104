use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::net::HttpClient;
use crate::resolver::AdapterError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DecipherRequest<'a> {
    video_id: &'a str,
    signature_cipher: &'a str,
}

#[derive(Debug, Deserialize)]
struct DecipherResponse {
    url: Option<String>,
}

/// External service that turns a `signatureCipher` into a playable URL
#[derive(Debug, Clone)]
pub struct DecipherHelper {
    http: HttpClient,
    endpoint: String,
    timeout: Duration,
}

impl DecipherHelper {
    pub fn new(http: HttpClient, endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            timeout,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn decipher(
        &self,
        content_id: &str,
        signature_cipher: &str,
    ) -> Result<String, AdapterError> {
        let request = DecipherRequest {
            video_id: content_id,
            signature_cipher,
        };
        let response: DecipherResponse = self
            .http
            .post_json(&self.endpoint, HeaderMap::new(), &request, self.timeout)
            .await?;

        response
            .url
            .filter(|url| url.starts_with("http://") || url.starts_with("https://"))
            .ok_or_else(|| AdapterError::Malformed("decipher helper returned no URL".into()))
    }
}
