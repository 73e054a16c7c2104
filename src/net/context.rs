use url::Url;

use super::http::{FetchError, HttpClient};

/// How mirror URLs are addressed from a given network context
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlWrap {
    /// Request the mirror directly
    Direct,
    /// Route GETs through a same-origin relay (`<endpoint>?action=proxy&url=<target>`)
    Relay { endpoint: String },
}

/// The network capability a resolver core runs with
#[derive(Debug, Clone)]
pub struct NetworkContext {
    http: HttpClient,
    wrap: UrlWrap,
}

impl NetworkContext {
    pub fn direct(http: HttpClient) -> Self {
        Self {
            http,
            wrap: UrlWrap::Direct,
        }
    }

    pub fn relayed(http: HttpClient, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            wrap: UrlWrap::Relay {
                endpoint: endpoint.into(),
            },
        }
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    pub fn wrap(&self) -> &UrlWrap {
        &self.wrap
    }

    /// Address `target` according to the wrapping strategy
    pub fn mirror_url(&self, target: &str) -> Result<String, FetchError> {
        match &self.wrap {
            UrlWrap::Direct => Ok(target.to_string()),
            UrlWrap::Relay { endpoint } => {
                let mut url =
                    Url::parse(endpoint).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;
                url.query_pairs_mut()
                    .append_pair("action", "proxy")
                    .append_pair("url", target);
                Ok(url.into())
            }
        }
    }
}
