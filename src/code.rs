//! This module handles the authorization request and the authorization code
//! the issuer sends back to the login route.
//!
//! # Key Structures
//!
//! ## `CodeRequest`
//! Builds the authorization request URL the browser is redirected to.
//! - Always requests `openid`, plus the issuer's configured `AdditionalScope`s.
//! - Requests offline access so that a refresh token is issued.
//!
//! ## `CodeResponse`
//! What the issuer put in the query of the redirect back to the login route:
//! a code, an error, or nothing at all (the login flow has not started yet).
//!
//! # Flow
//! 1. The login route is hit without a `code`, so a `CodeRequest` URL is built and the user is redirected.
//! 2. After authentication the issuer redirects back to the same login route with `code`.
//! 3. The `Code` is exchanged for tokens with an `IDTokenRequest`.
use itertools::Itertools;
use tracing::error;

use crate::{
    config::{AuthEndPoint, ClientID, IssuerConfig},
    error::Error,
};
use std::collections::{HashMap, HashSet};

/// Optional Scope Parameters
///
/// `openid` is always requested. These variants extend the `scope` parameter
/// so the ID token carries more user information.
///
/// ## `Email`
/// - Requests the user's email address and its verification status.
///
/// ## `Profile`
/// - Requests the user's name, profile picture URL and other basic profile information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AdditionalScope {
    Email,
    Profile,
}

impl AdditionalScope {
    fn as_str(&self) -> &'static str {
        match self {
            AdditionalScope::Email => "email",
            AdditionalScope::Profile => "profile",
        }
    }
}

/// The value of the `code` query parameter sent back by the issuer.
/// It is exchanged for an ID token with an `IDTokenRequest`.
#[derive(Debug, Clone, PartialEq)]
pub struct Code(pub(crate) String);

impl From<String> for Code {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Generates the URL that starts the authorization code flow.
/// # Example
/// ```rust,no_run
/// use cookie_google_oidc::{code::CodeRequest, config::IssuerConfig};
///
/// let config = IssuerConfig::google("your_client_id", "your_client_secret");
/// let request = CodeRequest::new(&config, "http://localhost:3000/login/google");
/// let url = request.into_url().unwrap();
/// println!("Auth URL: {}", url);
/// ```
#[derive(Debug, Clone)]
pub struct CodeRequest {
    auth_endpoint: AuthEndPoint,
    client_id: ClientID,
    response_type: String,
    scope: Vec<AdditionalScope>,
    redirect_uri: String,
    access_type: String,
    prompt: String,
}

impl CodeRequest {
    /// `redirect_uri` must be registered with the issuer, and must be sent
    /// again unchanged when the code is exchanged.
    pub fn new(config: &IssuerConfig, redirect_uri: &str) -> Self {
        Self {
            auth_endpoint: config.auth_endpoint.to_owned(),
            client_id: config.client_id.to_owned(),
            response_type: "code".to_string(),
            scope: config.scopes.to_owned(),
            redirect_uri: redirect_uri.to_string(),
            // Google only hands out a refresh token for offline access with consent.
            access_type: "offline".to_string(),
            prompt: "consent".to_string(),
        }
    }

    /// `openid` first, then the additional scopes deduplicated and sorted.
    fn scope_param(&self) -> String {
        let extra = self
            .scope
            .iter()
            .map(AdditionalScope::as_str)
            .collect::<HashSet<_>>()
            .into_iter()
            .sorted()
            .join(" ");

        if extra.is_empty() {
            "openid".to_string()
        } else {
            format!("openid {}", extra)
        }
    }

    /// Constructs a URL with the required parameters, percent-encoded.
    pub fn into_url(&self) -> Result<String, Error> {
        let scope = self.scope_param();
        let url = url::Url::parse_with_params(
            &self.auth_endpoint.0,
            &[
                ("response_type", self.response_type.as_str()),
                ("client_id", self.client_id.0.as_str()),
                ("scope", scope.as_str()),
                ("access_type", self.access_type.as_str()),
                ("prompt", self.prompt.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
            ],
        )
        .map_err(|e| {
            error!("Failed to build authorization url: {}", e);
            Error::URL
        })?;
        Ok(url.into())
    }
}

/// The query an issuer redirects back with.
#[derive(Debug, Clone, PartialEq)]
pub enum CodeResponse {
    /// No `code` and no `error`: the flow has not started.
    Absent,
    Granted(Code),
    /// The user declined or the issuer failed; carries the `error` value.
    Denied(String),
}

impl CodeResponse {
    /// Needs the full URL, e.g. `http://localhost:3000/login/google?code=...`.
    pub fn from_url(response_url: &str) -> Result<Self, Error> {
        let url = url::Url::parse(response_url).map_err(|e| {
            error!("Failed to parse url from issuer: {}", e);
            Error::URL
        })?;
        let params: HashMap<_, _> = url.query_pairs().collect();

        if let Some(error) = params.get("error") {
            return Ok(Self::Denied(error.to_string()));
        }
        match params.get("code") {
            Some(code) if !code.is_empty() => Ok(Self::Granted(code.to_string().into())),
            _ => Ok(Self::Absent),
        }
    }
}
