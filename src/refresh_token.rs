//! provides functionality for handling refresh tokens.
//!
//! This module includes:
//! - RefreshToken: A structure representing the refresh token.
//! - RefreshTokenRequest: A structure for sending a request to the issuer's token endpoint.
//! - RefreshTokenResponse: A structure for parsing the response from the refresh token request.

use serde::Deserialize;

use crate::{
    config::{ClientID, ClientSecret, IssuerConfig},
    id_token::IDTokenRow,
};

/// Represents an OAuth 2.0 refresh token, which is used to obtain a new ID token without user interaction.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RefreshToken(pub(crate) String);

impl RefreshToken {
    /// Creates a new refresh token from a string.
    pub fn new(value: &str) -> Self {
        Self(value.to_string())
    }
    /// Returns the refresh token as a str.
    pub fn value_as_str(&self) -> &str {
        &self.0
    }
}

/// Represents a request to exchange a refresh token for a new ID token.
#[derive(Debug, Clone)]
pub struct RefreshTokenRequest {
    pub(crate) refresh_token_endpoint: String,
    pub(crate) client_id: ClientID,
    pub(crate) client_secret: ClientSecret,
    pub(crate) refresh_token: RefreshToken,
    pub(crate) grant_type: String,
}

impl RefreshTokenRequest {
    /// Targets the token endpoint of the issuer the ID token came from.
    pub fn new(config: &IssuerConfig, refresh_token: &RefreshToken) -> Self {
        Self {
            refresh_token_endpoint: config.token_endpoint.0.to_owned(),
            client_id: config.client_id.to_owned(),
            client_secret: config.client_secret.to_owned(),
            refresh_token: refresh_token.to_owned(),
            grant_type: "refresh_token".to_string(),
        }
    }
}

/// Represents the token endpoint's answer to a refresh.
///
/// Google sends a fresh `id_token` when `openid` was granted, and only rarely a
/// rotated `refresh_token`.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshTokenResponse {
    id_token: Option<String>,
    refresh_token: Option<String>,
}

impl RefreshTokenResponse {
    /// Retrieves the newly issued ID token, if any.
    pub fn id_token(&self) -> Option<IDTokenRow> {
        self.id_token.as_deref().map(IDTokenRow::new)
    }
    /// Retrieves a rotated refresh token, if the issuer sent one.
    pub fn refresh_token(&self) -> Option<RefreshToken> {
        self.refresh_token.as_deref().map(RefreshToken::new)
    }
}
