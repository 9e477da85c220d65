//! Small web application that logs in with Google's OpenID Connect.
//!
//! The ID token and refresh token are kept in the browser as two cookies; no
//! session state lives on the server.
//! [google document](https://developers.google.com/identity/openid-connect/openid-connect)
//! # Feature
//! - Redirect to Google's authorization endpoint and exchange the returned code
//! - Store `id_token` / `refresh_token` in `HttpOnly`, `SameSite=Lax` cookies
//! - Refresh an expired ID token with the refresh token
//! - Verify the ID token against Google's published key set (JWKS)
//! - Gate pages on the verified subject (`sub`)
//! - Revoke the refresh token on logout
//! # Routes
//! - `GET /login/google`
//! - `GET /logout`
//! - `GET /`
//! - `GET /protected` (401 without a valid session)
use std::sync::Arc;

use crate::config::Providers;

pub mod claims;
pub mod code;
pub mod config;
pub mod error;
pub mod executer;
pub mod id_token;
pub mod middleware;
pub mod origin;
pub mod refresh_token;
pub mod revoke_token;
pub mod routes;
pub mod token_store;

/// Shared, read-only application state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub providers: Arc<Providers>,
}

impl AppState {
    pub fn new(providers: Providers) -> Self {
        Self {
            providers: Arc::new(providers),
        }
    }
}
