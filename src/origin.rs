//! Where the browser thinks it is talking to.
//!
//! The host decides whether cookies get the `Secure` attribute and what
//! callback URL is sent to the issuer.
use std::convert::Infallible;

use axum::extract::FromRequestParts;
use http::{header::HOST, request::Parts};

#[derive(Debug, Clone, PartialEq)]
pub struct RequestOrigin {
    /// Host as sent by the client, port included.
    authority: String,
    /// Host name only.
    hostname: String,
}

impl RequestOrigin {
    pub fn new(authority: &str) -> Self {
        let hostname = url::Url::parse(&format!("http://{}", authority))
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default();
        Self {
            authority: authority.to_string(),
            hostname,
        }
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Only exactly `localhost` is treated as a development origin.
    pub fn is_localhost(&self) -> bool {
        self.hostname == "localhost"
    }

    /// The server itself speaks plain HTTP; anything that is not localhost is
    /// expected to sit behind a TLS terminating proxy.
    pub fn scheme(&self) -> &'static str {
        if self.is_localhost() { "http" } else { "https" }
    }

    /// Absolute URL of `path_and_query` on this origin.
    pub fn url(&self, path_and_query: &str) -> String {
        format!("{}://{}{}", self.scheme(), self.authority, path_and_query)
    }
}

impl<S> FromRequestParts<S> for RequestOrigin
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(authority) = parts.uri.authority() {
            return Ok(Self::new(authority.as_str()));
        }
        let host = parts
            .headers
            .get(HOST)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        Ok(Self::new(host))
    }
}

// ==========Tests==========
#[cfg(test)]
mod tests {
    use axum::extract::FromRequestParts;
    use http::Request;

    use super::RequestOrigin;

    #[test]
    fn test_localhost_with_port() {
        let origin = RequestOrigin::new("localhost:3000");
        assert_eq!(origin.hostname(), "localhost");
        assert!(origin.is_localhost());
        assert_eq!(origin.url("/login/google"), "http://localhost:3000/login/google");
    }

    #[test]
    fn test_other_hosts_are_not_localhost() {
        for host in ["example.com", "127.0.0.1:3000", "localhost.example.com", "[::1]:3000", ""] {
            let origin = RequestOrigin::new(host);
            assert!(!origin.is_localhost(), "{host}");
        }
        assert_eq!(
            RequestOrigin::new("app.example.com").url("/"),
            "https://app.example.com/"
        );
    }

    #[tokio::test]
    async fn test_extract_from_host_header() {
        let (mut parts, _) = Request::builder()
            .uri("/")
            .header("host", "localhost:3000")
            .body(())
            .unwrap()
            .into_parts();

        let origin = RequestOrigin::from_request_parts(&mut parts, &()).await.unwrap();
        assert!(origin.is_localhost());
    }

    #[tokio::test]
    async fn test_extract_without_host() {
        let (mut parts, _) = Request::builder().uri("/").body(()).unwrap().into_parts();

        let origin = RequestOrigin::from_request_parts(&mut parts, &()).await.unwrap();
        assert!(!origin.is_localhost());
    }
}
