use super::error::ApiError;
use super::models::ResolveParams;
use super::utils::{is_truthy, non_empty};
use crate::resolver::MediaKind;
use crate::tunnel::RelayRequest;

/// What a resolve call asks for
#[derive(Debug, Clone)]
pub enum ApiRequest {
    /// Generic same-origin relay
    Proxy { url: String },
    /// JSON links for each requested kind
    Probe { content_id: String, kind: MediaKind },
    /// Bytes (`url_only = false`) or just the upstream URL
    Tunnel {
        request: RelayRequest,
        url_only: bool,
    },
}

const MAX_ID_LEN: usize = 64;

fn is_http(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

fn validate_id(id: &str) -> Result<(), ApiError> {
    let well_formed = id.len() <= MAX_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !well_formed {
        return Err(ApiError::InvalidParameter(format!("malformed id '{id}'")));
    }
    Ok(())
}

pub fn parse_request(params: ResolveParams) -> Result<ApiRequest, ApiError> {
    if let Some(action) = non_empty(params.action) {
        if action != "proxy" {
            return Err(ApiError::InvalidParameter(format!("unknown action '{action}'")));
        }
        let url = non_empty(params.url)
            .ok_or_else(|| ApiError::InvalidParameter("action=proxy requires url".into()))?;
        if !is_http(&url) {
            return Err(ApiError::InvalidParameter(format!("url must be http(s), got '{url}'")));
        }
        return Ok(ApiRequest::Proxy { url });
    }

    let kind = match non_empty(params.kind) {
        Some(raw) => raw
            .parse::<MediaKind>()
            .map_err(|e| ApiError::InvalidParameter(e.to_string()))?,
        None => MediaKind::Both,
    };

    let content_id = non_empty(params.id);
    if let Some(id) = &content_id {
        validate_id(id)?;
    }

    let direct_url = non_empty(params.direct_url);
    if let Some(url) = &direct_url {
        if !is_http(url) {
            return Err(ApiError::InvalidParameter(format!(
                "direct_url must be http(s), got '{url}'"
            )));
        }
    }

    let url_only = is_truthy(params.get_url.as_deref());
    let pipe = is_truthy(params.pipe.as_deref());

    match (content_id, direct_url) {
        (None, None) => Err(ApiError::MissingIdentifier),
        // Probe needs an id; a bare direct URL can only be piped
        (Some(content_id), None) if !url_only && !pipe => {
            Ok(ApiRequest::Probe { content_id, kind })
        }
        (content_id, direct_url) => Ok(ApiRequest::Tunnel {
            request: RelayRequest {
                content_id,
                kind: Some(kind),
                direct_url,
                title: non_empty(params.title),
            },
            url_only,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> ResolveParams {
        ResolveParams::from_pairs(pairs.iter().copied())
    }

    #[test]
    fn missing_id_is_rejected() {
        let err = parse_request(params(&[("type", "audio")])).unwrap_err();
        assert!(matches!(err, ApiError::MissingIdentifier));

        let err = parse_request(params(&[("id", "   "), ("pipe", "true")])).unwrap_err();
        assert!(matches!(err, ApiError::MissingIdentifier));
    }

    #[test]
    fn plain_id_is_a_probe_for_both() {
        match parse_request(params(&[("id", "dQw4w9WgXcQ")])).unwrap() {
            ApiRequest::Probe { content_id, kind } => {
                assert_eq!(content_id, "dQw4w9WgXcQ");
                assert_eq!(kind, MediaKind::Both);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn pipe_and_get_url_select_tunnel_modes() {
        match parse_request(params(&[("id", "abc"), ("type", "audio"), ("pipe", "1")])).unwrap() {
            ApiRequest::Tunnel { request, url_only } => {
                assert!(!url_only);
                assert_eq!(request.kind, Some(MediaKind::Audio));
            }
            other => panic!("unexpected {other:?}"),
        }

        match parse_request(params(&[("id", "abc"), ("get_url", "true")])).unwrap() {
            ApiRequest::Tunnel { url_only, .. } => assert!(url_only),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn bare_direct_url_is_piped() {
        match parse_request(params(&[("direct_url", "https://cdn.example/x")])).unwrap() {
            ApiRequest::Tunnel { request, url_only } => {
                assert!(!url_only);
                assert!(request.content_id.is_none());
                assert_eq!(request.direct_url.as_deref(), Some("https://cdn.example/x"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn proxy_action() {
        match parse_request(params(&[("action", "proxy"), ("url", "https://m.example/a")])).unwrap() {
            ApiRequest::Proxy { url } => assert_eq!(url, "https://m.example/a"),
            other => panic!("unexpected {other:?}"),
        }

        let err = parse_request(params(&[("action", "proxy")])).unwrap_err();
        assert!(matches!(err, ApiError::InvalidParameter(_)));

        let err = parse_request(params(&[("action", "proxy"), ("url", "file:///etc/passwd")]))
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidParameter(_)));
    }

    #[test]
    fn bad_values_are_rejected() {
        let err = parse_request(params(&[("id", "abc"), ("type", "podcast")])).unwrap_err();
        assert!(matches!(err, ApiError::InvalidParameter(_)));

        let err = parse_request(params(&[("id", "../etc")])).unwrap_err();
        assert!(matches!(err, ApiError::InvalidParameter(_)));

        let err = parse_request(params(&[("id", "abc"), ("direct_url", "ftp://x")])).unwrap_err();
        assert!(matches!(err, ApiError::InvalidParameter(_)));
    }
}
