//! provides functionality for revoking the refresh token on logout.
//!
//! Revoking a refresh token invalidates every access token issued from it, so
//! the access token itself is never kept or revoked.
use crate::{config::IssuerConfig, refresh_token::RefreshToken};

/// Represents a request to revoke a refresh token at the issuer's revocation endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct RevokeTokenRequest {
    pub(crate) end_point: String,
    pub(crate) token: RefreshToken,
}

impl RevokeTokenRequest {
    pub fn new(config: &IssuerConfig, token: &RefreshToken) -> Self {
        Self {
            end_point: config.revocation_endpoint.0.to_owned(),
            token: token.clone(),
        }
    }
    /// Returns the revocation endpoint URL.
    pub fn end_point(&self) -> &str {
        &self.end_point
    }
    /// Returns the token being revoked.
    pub fn inner_value(&self) -> &str {
        self.token.value_as_str()
    }
}
