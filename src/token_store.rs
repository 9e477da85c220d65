//! Client side token storage in two cookies, `id_token` and `refresh_token`.
//!
//! Both cookies are written with the same attributes and lifetime: the issuer
//! to refresh against is read from the `id_token`, so a `refresh_token` left
//! behind without its `id_token` is useless and gets deleted.
use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    response::{IntoResponseParts, ResponseParts},
};
use axum_extra::extract::{
    CookieJar,
    cookie::{Cookie, SameSite},
};
use http::request::Parts;
use tracing::debug;

use crate::origin::RequestOrigin;

pub const ID_TOKEN_COOKIE: &str = "id_token";
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

/// Six months, in seconds.
pub const COOKIE_MAX_AGE: i64 = 60 * 60 * 24 * 30 * 6;

/// Reads and writes the token cookies of one request.
///
/// Changes are sent back as `Set-Cookie` headers when the store is returned as
/// part of the response.
#[derive(Debug, Clone)]
pub struct CookieTokenStore {
    jar: CookieJar,
    secure: bool,
}

impl CookieTokenStore {
    pub fn new(jar: CookieJar, origin: &RequestOrigin) -> Self {
        Self {
            jar,
            secure: !origin.is_localhost(),
        }
    }

    pub fn id_token(&self) -> Option<String> {
        self.get(ID_TOKEN_COOKIE)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.get(REFRESH_TOKEN_COOKIE)
    }

    /// Stores the ID token. `None` or an empty value deletes it together with
    /// the refresh token.
    pub fn set_id_token(&mut self, token: Option<&str>) {
        match token.filter(|t| !t.is_empty()) {
            Some(token) => self.put(ID_TOKEN_COOKIE, token),
            None => self.clear(),
        }
    }

    /// Stores the refresh token. `None` or an empty value deletes it.
    pub fn set_refresh_token(&mut self, token: Option<&str>) {
        match token.filter(|t| !t.is_empty()) {
            Some(token) => self.put(REFRESH_TOKEN_COOKIE, token),
            None => self.remove(REFRESH_TOKEN_COOKIE),
        }
    }

    /// Deletes both cookies.
    pub fn clear(&mut self) {
        self.remove(ID_TOKEN_COOKIE);
        self.remove(REFRESH_TOKEN_COOKIE);
    }

    fn get(&self, name: &str) -> Option<String> {
        self.jar
            .get(name)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
    }

    fn put(&mut self, name: &'static str, value: &str) {
        let cookie = Cookie::build((name, value.to_string()))
            .path("/")
            .same_site(SameSite::Lax)
            .http_only(true)
            .secure(self.secure)
            .max_age(time::Duration::seconds(COOKIE_MAX_AGE));
        self.jar = self.jar.clone().add(cookie);
    }

    fn remove(&mut self, name: &'static str) {
        debug!("Deleting cookie {}", name);
        self.jar = self.jar.clone().remove(Cookie::build(name).path("/"));
    }
}

impl<S> FromRequestParts<S> for CookieTokenStore
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_request_parts(parts, state).await?;
        let origin = RequestOrigin::from_request_parts(parts, state).await?;
        Ok(Self::new(jar, &origin))
    }
}

impl IntoResponseParts for CookieTokenStore {
    type Error = Infallible;

    fn into_response_parts(self, res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        self.jar.into_response_parts(res)
    }
}
