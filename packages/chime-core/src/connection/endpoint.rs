//! Hub endpoint derivation from the REST API base URL.

use tokio_tungstenite::tungstenite::client::ClientRequestBuilder;
use tokio_tungstenite::tungstenite::http::Uri;

use crate::connection::{ConnectError, ConnectResult};
use crate::constants::NOTIFICATIONS_HUB_PATH;

/// WebSocket endpoint of the notifications hub.
///
/// Deployments configure one REST base URL like
/// `https://api.example.com/api/v1`; the hub address is derived from it, not
/// configured separately. Derivation swaps the scheme to WebSocket, strips a
/// trailing `/api/vN` version suffix, and appends the hub path, so the above
/// becomes `wss://api.example.com/hubs/notifications`.
#[derive(Debug, Clone)]
pub struct HubEndpoint {
    uri: Uri,
}

impl HubEndpoint {
    /// Derives the hub endpoint from an HTTP(S) API base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError::InvalidEndpoint`] if the URL is empty, uses a
    /// scheme other than `http`/`https`, or does not parse as a URI.
    pub fn resolve(api_base_url: &str) -> ConnectResult<Self> {
        let trimmed = api_base_url.trim().trim_end_matches('/');

        let (scheme, rest) = if let Some(rest) = trimmed.strip_prefix("https://") {
            ("wss", rest)
        } else if let Some(rest) = trimmed.strip_prefix("http://") {
            ("ws", rest)
        } else {
            return Err(ConnectError::InvalidEndpoint(format!(
                "expected http(s) URL, got '{trimmed}'"
            )));
        };
        if rest.is_empty() {
            return Err(ConnectError::InvalidEndpoint(
                "URL has no host".to_string(),
            ));
        }

        let origin = strip_api_suffix(rest);
        let raw = format!("{scheme}://{origin}{NOTIFICATIONS_HUB_PATH}");
        let uri = raw
            .parse::<Uri>()
            .map_err(|e| ConnectError::InvalidEndpoint(format!("'{raw}': {e}")))?;
        Ok(Self { uri })
    }

    /// The derived WebSocket URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Builds the upgrade request for this endpoint carrying `token`.
    ///
    /// The token travels in an `Authorization` header rather than a query
    /// parameter, keeping it out of server URL logs.
    #[must_use]
    pub fn request(&self, token: &str) -> ClientRequestBuilder {
        ClientRequestBuilder::new(self.uri.clone())
            .with_header("Authorization", format!("Bearer {token}"))
    }
}

/// Drops a trailing `/api/vN` from the URL tail, if present.
///
/// Only the exact two-segment suffix is removed. Paths that merely contain
/// a version segment (`/v1/things`) or an `api` segment elsewhere stay
/// untouched.
fn strip_api_suffix(rest: &str) -> &str {
    let Some((prefix, last)) = rest.rsplit_once('/') else {
        return rest;
    };
    if !is_version_segment(last) {
        return rest;
    }
    match prefix.rsplit_once('/') {
        Some((head, "api")) => head,
        _ => rest,
    }
}

fn is_version_segment(segment: &str) -> bool {
    let Some(digits) = segment.strip_prefix('v') else {
        return false;
    };
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_tungstenite::tungstenite::client::IntoClientRequest;

    fn resolve(url: &str) -> String {
        HubEndpoint::resolve(url)
            .expect("resolvable")
            .uri()
            .to_string()
    }

    #[test]
    fn strips_versioned_api_suffix() {
        assert_eq!(
            resolve("http://localhost:5000/api/v1"),
            "ws://localhost:5000/hubs/notifications"
        );
        assert_eq!(
            resolve("http://localhost:5000/api/v12"),
            "ws://localhost:5000/hubs/notifications"
        );
    }

    #[test]
    fn https_becomes_wss() {
        assert_eq!(
            resolve("https://api.example.com/api/v2"),
            "wss://api.example.com/hubs/notifications"
        );
    }

    #[test]
    fn trailing_slash_is_ignored() {
        assert_eq!(
            resolve("http://localhost:5000/api/v1/"),
            "ws://localhost:5000/hubs/notifications"
        );
    }

    #[test]
    fn unversioned_path_is_kept() {
        assert_eq!(
            resolve("http://example.com/backend"),
            "ws://example.com/backend/hubs/notifications"
        );
    }

    #[test]
    fn version_without_api_segment_is_kept() {
        assert_eq!(
            resolve("http://example.com/v1"),
            "ws://example.com/v1/hubs/notifications"
        );
    }

    #[test]
    fn api_without_version_is_kept() {
        assert_eq!(
            resolve("http://example.com/api"),
            "ws://example.com/api/hubs/notifications"
        );
    }

    #[test]
    fn rejects_non_http_schemes_and_empty_urls() {
        assert!(HubEndpoint::resolve("ftp://example.com").is_err());
        assert!(HubEndpoint::resolve("example.com/api/v1").is_err());
        assert!(HubEndpoint::resolve("").is_err());
        assert!(HubEndpoint::resolve("   ").is_err());
        assert!(HubEndpoint::resolve("http://").is_err());
    }

    #[test]
    fn request_carries_bearer_token_header() {
        let endpoint = HubEndpoint::resolve("http://localhost:5000/api/v1").expect("resolvable");
        let request = endpoint
            .request("abc123")
            .into_client_request()
            .expect("valid request");

        assert_eq!(
            request
                .headers()
                .get("Authorization")
                .and_then(|v| v.to_str().ok()),
            Some("Bearer abc123")
        );
        assert_eq!(request.uri().path(), "/hubs/notifications");
    }
}
