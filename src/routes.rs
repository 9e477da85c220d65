//! HTTP routes of the application.
//!
//! - `/login/google`: starts and finishes the authorization code flow
//! - `/logout`: revokes the refresh token and deletes both cookies
//! - `/`: greets the user, or offers a login link
//! - `/protected`: only reachable with valid claims
use axum::{
    Extension, Router,
    extract::State,
    http::Uri,
    middleware,
    response::{Html, IntoResponse, Response},
    routing::{MethodRouter, get},
};
use http::{StatusCode, header::LOCATION};
use tracing::{error, info, warn};

use crate::{
    AppState,
    claims::Claims,
    code::{CodeRequest, CodeResponse},
    config::Issuer,
    executer::{Executer, IDTokenExe, RevokeTokenExe},
    id_token::{IDToken, IDTokenRequest, IDTokenRow},
    middleware::{login_required, use_claims},
    origin::RequestOrigin,
    refresh_token::RefreshToken,
    revoke_token::RevokeTokenRequest,
    token_store::CookieTokenStore,
};

pub fn router(state: AppState) -> Router {
    let issuer = Issuer::Google;
    Router::new()
        .route(
            &format!("/login/{}", issuer.path_segment()),
            login_route(issuer),
        )
        .route("/logout", get(logout))
        .route(
            "/",
            get(home).layer(middleware::from_fn_with_state(state.clone(), use_claims)),
        )
        .route(
            "/protected",
            get(protected).layer(middleware::from_fn_with_state(state.clone(), login_required)),
        )
        .with_state(state)
}

/// Login handler bound to one issuer.
fn login_route(issuer: Issuer) -> MethodRouter<AppState> {
    get(
        move |state: State<AppState>, store: CookieTokenStore, origin: RequestOrigin, uri: Uri| {
            login(issuer, state, store, origin, uri)
        },
    )
}

/// The issuer redirects back to this same route, so the handler either starts
/// the flow or exchanges the returned code.
async fn login(
    issuer: Issuer,
    State(state): State<AppState>,
    mut store: CookieTokenStore,
    origin: RequestOrigin,
    uri: Uri,
) -> Response {
    let config = state.providers.get(issuer);
    let redirect_uri = origin.url(uri.path());
    let path = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");

    let code_res = match CodeResponse::from_url(&origin.url(path)) {
        Ok(res) => res,
        Err(_) => return StatusCode::BAD_REQUEST.into_response(),
    };

    match code_res {
        CodeResponse::Absent => match CodeRequest::new(config, &redirect_uri).into_url() {
            Ok(url) => found(&url),
            Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        },
        CodeResponse::Denied(reason) => {
            warn!("Login with {:?} was denied: {}", issuer, reason);
            found("/")
        }
        CodeResponse::Granted(code) => {
            let req = IDTokenRequest::new(config, code, &redirect_uri);
            match IDTokenExe.execute(&req).await {
                Ok(res) => {
                    store.set_id_token(Some(res.id_token().value_as_str()));
                    store.set_refresh_token(
                        res.refresh_token().as_ref().map(|t| t.value_as_str()),
                    );
                    info!("Logged in with {:?}", issuer);
                }
                Err(e) => {
                    error!("Failed to exchange code with {:?}: {}", issuer, e);
                    store.clear();
                }
            }
            (store, found("/")).into_response()
        }
    }
}

async fn logout(State(state): State<AppState>, mut store: CookieTokenStore) -> impl IntoResponse {
    if let Some(refresh_token) = store.refresh_token() {
        // The ID token may be expired; its issuer claim is still good.
        let issuer = store
            .id_token()
            .and_then(|t| IDToken::decode_from_row(&IDTokenRow::new(&t)).ok())
            .and_then(|t| Issuer::from_url(&t.iss))
            .unwrap_or_default();
        let config = state.providers.get(issuer);
        let req = RevokeTokenRequest::new(config, &RefreshToken::new(&refresh_token));
        match RevokeTokenExe.execute(&req).await {
            Ok(status) if status.is_success() => info!("Revoked refresh token at {:?}", issuer),
            Ok(status) => warn!("Revocation at {:?} answered {}", issuer, status),
            Err(e) => warn!("Failed to revoke refresh token at {:?}: {}", issuer, e),
        }
    }
    store.set_id_token(None);
    (store, found("/"))
}

/// `302 Found` to `uri`.
fn found(uri: &str) -> Response {
    (StatusCode::FOUND, [(LOCATION, uri.to_string())]).into_response()
}

async fn home(Extension(claims): Extension<Option<Claims>>) -> Html<String> {
    let body = match claims {
        Some(claims) => format!(
            "<p>Hello, {}!</p><div><a href='/protected'>Protected Page</a></div><div><a href='/logout'>Logout</a></div>",
            escape_html(&claims.sub)
        ),
        None => "<p>Nice to meet you!</p><div><a href='/login/google'>Login</a></div>".to_string(),
    };
    Html(page("Home", &body))
}

async fn protected() -> Html<String> {
    Html(page("Protected", "<div><a href='/'>Home</a></div>"))
}

fn page(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{title}</title>
</head>
<body>
<h1>{title}</h1>
{body}
</body>
</html>
"#
    )
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
