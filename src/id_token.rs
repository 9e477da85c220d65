//! Provides the process of requesting and decoding an ID token.
//!
//! This module:
//! IDTokenRequest: A data structure for exchanging an authorization code at the token endpoint.
//! IDTokenResponse: A data structure for parsing the response from the token endpoint.
//! IDToken: A data structure representing the decoded (unverified) payload of an ID token.
//! IDTokenRow: A structure representing an encoded ID token, as stored in the `id_token` cookie.

use base64::{Engine, prelude::BASE64_URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::{
    code::Code,
    config::{ClientID, ClientSecret, IssuerConfig, TokenEndPoint},
    error::Error,
    refresh_token::RefreshToken,
};

/// Represents a decoded ID token payload.
///
/// Decoding does **not** verify the signature. The payload is only used to find
/// the issuer and the expiry; identity comes from `claims::ClaimsExe`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IDToken {
    pub iss: String,  // Issuer (e.g., "https://accounts.google.com")
    pub aud: String,  // Client ID
    pub sub: String,  // User ID (Unique identifier for the account)
    pub azp: Option<String>,  // Authorized party (Optional)
    pub email: Option<String>,
    pub email_verified: Option<bool>,
    pub name: Option<String>,
    pub picture: Option<String>,
    pub iat: u64,  // Issued-at timestamp (UNIX time)
    pub exp: u64,  // Expiration timestamp (UNIX time)
}

impl IDToken {
    /// Decodes an IDTokenRow (encoded ID token) into an IDToken.
    pub fn decode_from_row(id_token: &IDTokenRow) -> Result<Self, Error> {
        let split: Vec<_> = id_token.0.split('.').collect();
        if split.len() != 3 {
            return Err(Error::Decode);
        }
        let bytes = BASE64_URL_SAFE_NO_PAD.decode(split[1]).map_err(|e| {
            error!("Failed to decode IDToken: {}", e);
            Error::Decode
        })?;

        let id_token = serde_json::from_slice::<IDToken>(&bytes).map_err(|e| {
            error!("Failed to deserialize IDToken: {}", e);
            Error::Deserialize
        })?;
        Ok(id_token)
    }

    /// `now` is UNIX time in seconds.
    pub fn is_expired(&self, now: u64) -> bool {
        self.exp <= now
    }
}

/// A structure used to exchange an authorization code at the token endpoint.
#[derive(Debug, Clone)]
pub struct IDTokenRequest {
    token_endpoint: TokenEndPoint,
    code: Code,
    client_id: ClientID,
    client_secret: ClientSecret,
    redirect_uri: String,
    grant_type: String,
}

impl IDTokenRequest {
    /// `redirect_uri` must match the one sent in the `CodeRequest`.
    pub fn new(config: &IssuerConfig, code: Code, redirect_uri: &str) -> Self {
        Self {
            token_endpoint: config.token_endpoint.to_owned(),
            code,
            client_id: config.client_id.to_owned(),
            client_secret: config.client_secret.to_owned(),
            redirect_uri: redirect_uri.to_string(),
            grant_type: "authorization_code".to_string(),
        }
    }

    pub fn token_endpoint(&self) -> &str {
        &self.token_endpoint.0
    }

    pub fn code(&self) -> &str {
        &self.code.0
    }

    pub fn client_id(&self) -> &str {
        &self.client_id.0
    }

    pub fn client_secret(&self) -> &str {
        &self.client_secret.0
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    pub fn grant_type(&self) -> &str {
        &self.grant_type
    }
}

/// Represents the token endpoint's answer to a code exchange.
///
/// Only the two tokens kept in cookies are read; the access token and its
/// metadata are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct IDTokenResponse {
    id_token: IDTokenRow,
    refresh_token: Option<RefreshToken>,
}

impl IDTokenResponse {
    pub fn id_token(&self) -> &IDTokenRow {
        &self.id_token
    }

    pub fn refresh_token(&self) -> &Option<RefreshToken> {
        &self.refresh_token
    }
}

/// Represents an encoded ID token (`header.payload.signature`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IDTokenRow(pub(crate) String);

impl IDTokenRow {
    pub fn new(value: &str) -> Self {
        Self(value.to_string())
    }

    pub fn value_as_str(&self) -> &str {
        &self.0
    }
}
