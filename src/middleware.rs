//! Request guards that turn the token cookies into `Option<Claims>`.
//!
//! - `use_claims` resolves the claims and always lets the request through.
//! - `login_required` resolves the claims and answers `401 Unauthorized` when
//!   there are none.
//!
//! Both put the resolved `Option<Claims>` into the request extensions and send
//! any cookie changes made while resolving (refreshed or deleted tokens) with
//! the response.
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http::StatusCode;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::{
    AppState,
    claims::{Claims, ClaimsExe, ClaimsRequest},
    config::{IssuerConfig, Providers},
    executer::{Executer, RefreshTokenExe},
    id_token::{IDToken, IDTokenRow},
    refresh_token::{RefreshToken, RefreshTokenRequest},
    token_store::CookieTokenStore,
};

fn unix_now() -> u64 {
    u64::try_from(OffsetDateTime::now_utc().unix_timestamp()).unwrap_or_default()
}

/// Resolves the claims of the current request from the stored tokens.
///
/// Refreshes an expired ID token when a refresh token is available. Tokens that
/// cannot be used any more are deleted from `store`. A key set that cannot be
/// fetched makes this request anonymous but keeps the cookies.
pub async fn resolve_claims(providers: &Providers, store: &mut CookieTokenStore) -> Option<Claims> {
    let Some(raw) = store.id_token() else {
        if store.refresh_token().is_some() {
            warn!("Dropping refresh token stored without an ID token");
            store.set_refresh_token(None);
        }
        return None;
    };

    let mut id_token = IDTokenRow::new(&raw);
    let Ok(payload) = IDToken::decode_from_row(&id_token) else {
        store.clear();
        return None;
    };
    let Some((issuer, config)) = providers.by_url(&payload.iss) else {
        warn!("ID token from unsupported issuer {}", payload.iss);
        store.clear();
        return None;
    };

    if payload.is_expired(unix_now()) {
        debug!("ID token from {:?} expired, refreshing", issuer);
        id_token = refresh(config, store).await?;
    }

    let req = ClaimsRequest::new(config, id_token);
    match ClaimsExe.execute(&req).await {
        Ok(claims) => Some(claims),
        Err(e) => {
            if e.is_rejection() {
                store.clear();
            }
            None
        }
    }
}

async fn refresh(config: &IssuerConfig, store: &mut CookieTokenStore) -> Option<IDTokenRow> {
    let Some(refresh_token) = store.refresh_token() else {
        info!("ID token expired and no refresh token is stored");
        store.clear();
        return None;
    };

    let req = RefreshTokenRequest::new(config, &RefreshToken::new(&refresh_token));
    let res = match RefreshTokenExe.execute(&req).await {
        Ok(res) => res,
        Err(_) => {
            store.clear();
            return None;
        }
    };
    let Some(id_token) = res.id_token() else {
        warn!("Refresh response carried no ID token");
        store.clear();
        return None;
    };

    store.set_id_token(Some(id_token.value_as_str()));
    if let Some(rotated) = res.refresh_token() {
        store.set_refresh_token(Some(rotated.value_as_str()));
    }
    Some(id_token)
}

/// Resolves claims without blocking anonymous requests.
pub async fn use_claims(
    State(state): State<AppState>,
    mut store: CookieTokenStore,
    mut req: Request,
    next: Next,
) -> Response {
    let claims = resolve_claims(&state.providers, &mut store).await;
    req.extensions_mut().insert(claims);
    (store, next.run(req).await).into_response()
}

/// Resolves claims and rejects anonymous requests with `401`.
pub async fn login_required(
    State(state): State<AppState>,
    mut store: CookieTokenStore,
    mut req: Request,
    next: Next,
) -> Response {
    let claims = resolve_claims(&state.providers, &mut store).await;
    if claims.is_none() {
        return (StatusCode::UNAUTHORIZED, store, "Unauthorized").into_response();
    }
    req.extensions_mut().insert(claims);
    (store, next.run(req).await).into_response()
}
