// Drives the router end to end. A local axum server stands in for the
// issuer's token, revocation and key set endpoints, and signs ID tokens with
// tests/fixtures/signing_key.pem (public half in tests/fixtures/jwks.json).
use std::collections::HashMap;

use axum::{
    Form, Json, Router,
    body::{Body, to_bytes},
    http::{Request, Response, StatusCode, header::LOCATION, header::SET_COOKIE},
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::cookie::Cookie;
use cookie_google_oidc::{
    AppState,
    config::{GOOGLE_AUTH_ENDPOINT, GOOGLE_ISSUER, IssuerConfig, Providers},
    routes::router,
    token_store::COOKIE_MAX_AGE,
};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde_json::json;
use time::OffsetDateTime;
use tower::ServiceExt;

const SIGNING_KEY: &[u8] = include_bytes!("fixtures/signing_key.pem");
const JWKS: &str = include_str!("fixtures/jwks.json");
const CLIENT_ID: &str = "test-client";
const SUB: &str = "110169484474386276334";

fn now() -> u64 {
    OffsetDateTime::now_utc().unix_timestamp() as u64
}

fn id_token_with(kid: &str, aud: &str, exp: u64) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());
    let claims = json!({
        "iss": GOOGLE_ISSUER,
        "aud": aud,
        "sub": SUB,
        "iat": now() - 60,
        "exp": exp,
    });
    encode(&header, &claims, &EncodingKey::from_rsa_pem(SIGNING_KEY).unwrap()).unwrap()
}

fn valid_id_token() -> String {
    id_token_with("test-key", CLIENT_ID, now() + 3600)
}

fn expired_id_token() -> String {
    id_token_with("test-key", CLIENT_ID, now() - 3600)
}

async fn token_endpoint(Form(form): Form<HashMap<String, String>>) -> axum::response::Response {
    let grant = form.get("grant_type").map(String::as_str);
    let credential = match grant {
        Some("authorization_code") => form.get("code"),
        Some("refresh_token") => form.get("refresh_token"),
        _ => None,
    };
    if form.get("client_id").map(String::as_str) != Some(CLIENT_ID)
        || form.get("client_secret").map(String::as_str) != Some("test-secret")
    {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "invalid_client"}))).into_response();
    }

    match (grant, credential.map(String::as_str)) {
        (Some("authorization_code"), Some("good-code")) => Json(json!({
            "access_token": "access",
            "expires_in": 3599,
            "id_token": valid_id_token(),
            "refresh_token": "issued-refresh",
            "scope": "openid",
            "token_type": "Bearer",
        }))
        .into_response(),
        (Some("refresh_token"), Some("good-refresh")) => Json(json!({
            "access_token": "access",
            "expires_in": 3599,
            "id_token": valid_id_token(),
            "scope": "openid",
            "token_type": "Bearer",
        }))
        .into_response(),
        (Some("refresh_token"), Some("rotating-refresh")) => Json(json!({
            "access_token": "access",
            "expires_in": 3599,
            "id_token": valid_id_token(),
            "refresh_token": "rotated-refresh",
            "scope": "openid",
            "token_type": "Bearer",
        }))
        .into_response(),
        _ => (StatusCode::BAD_REQUEST, Json(json!({"error": "invalid_grant"}))).into_response(),
    }
}

/// Starts the fake issuer and returns its base URL.
async fn spawn_issuer() -> String {
    let app = Router::new()
        .route("/certs", get(|| async { ([("content-type", "application/json")], JWKS) }))
        .route("/token", post(token_endpoint))
        .route("/revoke", post(|| async { StatusCode::OK }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn config(base: &str, jwks_path: &str) -> IssuerConfig {
    IssuerConfig::builder()
        .issuer(GOOGLE_ISSUER)
        .auth_endpoint(GOOGLE_AUTH_ENDPOINT)
        .token_endpoint(&format!("{}/token", base))
        .revocation_endpoint(&format!("{}/revoke", base))
        .jwks_uri(&format!("{}{}", base, jwks_path))
        .client_id(CLIENT_ID)
        .client_secret("test-secret")
        .build()
}

struct TestApp {
    app: Router,
}

impl TestApp {
    async fn new() -> Self {
        let base = spawn_issuer().await;
        Self::with_config(config(&base, "/certs"))
    }

    fn with_config(config: IssuerConfig) -> Self {
        Self {
            app: router(AppState::new(Providers::new(config))),
        }
    }

    async fn get(&self, uri: &str, host: &str, cookies: Option<&str>) -> Response<Body> {
        let mut req = Request::builder().uri(uri).header("host", host);
        if let Some(c) = cookies {
            req = req.header("cookie", c);
        }
        self.app
            .clone()
            .oneshot(req.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }
}

async fn body_string(res: Response<Body>) -> String {
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn set_cookies(res: &Response<Body>) -> Vec<Cookie<'static>> {
    res.headers()
        .get_all(SET_COOKIE)
        .iter()
        .map(|v| Cookie::parse(v.to_str().unwrap().to_string()).unwrap())
        .collect()
}

fn cookie<'a>(cookies: &'a [Cookie<'static>], name: &str) -> Option<&'a Cookie<'static>> {
    cookies.iter().find(|c| c.name() == name)
}

fn assert_deleted(cookies: &[Cookie<'static>], name: &str) {
    let removal = cookie(cookies, name).unwrap_or_else(|| panic!("{name} was not deleted"));
    assert_eq!(removal.value(), "");
    assert_eq!(removal.max_age(), Some(time::Duration::ZERO));
}

#[tokio::test]
async fn anonymous_home_offers_login() {
    let app = TestApp::new().await;

    let res = app.get("/", "localhost:3000", None).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(set_cookies(&res).is_empty());

    let body = body_string(res).await;
    assert!(body.contains("Nice to meet you!"));
    assert!(body.contains("<a href='/login/google'>Login</a>"));
}

#[tokio::test]
async fn protected_without_cookies_is_unauthorized() {
    let app = TestApp::new().await;

    let res = app.get("/protected", "localhost:3000", None).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_string(res).await, "Unauthorized");
}

#[tokio::test]
async fn valid_session_greets_subject() {
    let app = TestApp::new().await;
    let cookies = format!("id_token={}; refresh_token=good-refresh", valid_id_token());

    let res = app.get("/", "localhost:3000", Some(&cookies)).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(set_cookies(&res).is_empty());
    let body = body_string(res).await;
    assert!(body.contains(&format!("Hello, {}!", SUB)));
    assert!(body.contains("<a href='/logout'>Logout</a>"));

    let res = app.get("/protected", "localhost:3000", Some(&cookies)).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(body_string(res).await.contains("<h1>Protected</h1>"));
}

#[tokio::test]
async fn wrong_audience_is_anonymous_and_clears_cookies() {
    let app = TestApp::new().await;
    let token = id_token_with("test-key", "someone-else", now() + 3600);
    let cookies = format!("id_token={}; refresh_token=good-refresh", token);

    let res = app.get("/", "localhost:3000", Some(&cookies)).await;
    assert_eq!(res.status(), StatusCode::OK);
    let jar = set_cookies(&res);
    assert_deleted(&jar, "id_token");
    assert_deleted(&jar, "refresh_token");
    assert!(body_string(res).await.contains("Nice to meet you!"));
}

#[tokio::test]
async fn unknown_signing_key_is_unauthorized() {
    let app = TestApp::new().await;
    let token = id_token_with("rotated-away", CLIENT_ID, now() + 3600);
    let cookies = format!("id_token={}; refresh_token=good-refresh", token);

    let res = app.get("/protected", "localhost:3000", Some(&cookies)).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let jar = set_cookies(&res);
    assert_deleted(&jar, "id_token");
    assert_deleted(&jar, "refresh_token");
}

#[tokio::test]
async fn tampered_payload_is_unauthorized_and_clears_cookies() {
    let app = TestApp::new().await;
    let signed: Vec<String> = valid_id_token().split('.').map(str::to_string).collect();
    let other = id_token_with("test-key", CLIENT_ID, now() + 7200);
    let other_payload = other.split('.').nth(1).unwrap();
    let forged = format!("{}.{}.{}", signed[0], other_payload, signed[2]);
    let cookies = format!("id_token={}; refresh_token=good-refresh", forged);

    let res = app.get("/protected", "localhost:3000", Some(&cookies)).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let jar = set_cookies(&res);
    assert_deleted(&jar, "id_token");
    assert_deleted(&jar, "refresh_token");
    assert_eq!(body_string(res).await, "Unauthorized");
}

#[tokio::test]
async fn unavailable_key_set_keeps_cookies() {
    let base = spawn_issuer().await;
    let app = TestApp::with_config(config(&base, "/missing-certs"));
    let cookies = format!("id_token={}; refresh_token=good-refresh", valid_id_token());

    let res = app.get("/protected", "localhost:3000", Some(&cookies)).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookies(&res).is_empty());
}

#[tokio::test]
async fn expired_id_token_is_refreshed() {
    let app = TestApp::new().await;
    let old = expired_id_token();
    let cookies = format!("id_token={}; refresh_token=good-refresh", old);

    let res = app.get("/", "localhost:3000", Some(&cookies)).await;
    assert_eq!(res.status(), StatusCode::OK);

    let jar = set_cookies(&res);
    let id_token = cookie(&jar, "id_token").unwrap();
    assert!(!id_token.value().is_empty());
    assert_ne!(id_token.value(), old);
    assert_ne!(id_token.secure(), Some(true));
    assert!(cookie(&jar, "refresh_token").is_none());

    assert!(body_string(res).await.contains(&format!("Hello, {}!", SUB)));
}

#[tokio::test]
async fn rotated_refresh_token_is_stored() {
    let app = TestApp::new().await;
    let cookies = format!("id_token={}; refresh_token=rotating-refresh", expired_id_token());

    let res = app.get("/protected", "localhost:3000", Some(&cookies)).await;
    assert_eq!(res.status(), StatusCode::OK);

    let jar = set_cookies(&res);
    assert!(!cookie(&jar, "id_token").unwrap().value().is_empty());
    let refresh = cookie(&jar, "refresh_token").unwrap();
    assert_eq!(refresh.value(), "rotated-refresh");
    assert_eq!(refresh.path(), Some("/"));
    assert_eq!(refresh.http_only(), Some(true));
    assert_eq!(
        refresh.max_age(),
        Some(time::Duration::seconds(COOKIE_MAX_AGE))
    );
}

#[tokio::test]
async fn refreshed_cookie_is_secure_off_localhost() {
    let app = TestApp::new().await;
    let cookies = format!("id_token={}; refresh_token=good-refresh", expired_id_token());

    let res = app.get("/", "app.example.com", Some(&cookies)).await;
    let jar = set_cookies(&res);
    let id_token = cookie(&jar, "id_token").unwrap();
    assert_eq!(id_token.secure(), Some(true));
    assert_eq!(id_token.http_only(), Some(true));
    assert_eq!(id_token.path(), Some("/"));
}

#[tokio::test]
async fn failed_refresh_clears_both_tokens() {
    let app = TestApp::new().await;
    let cookies = format!("id_token={}; refresh_token=revoked-refresh", expired_id_token());

    let res = app.get("/protected", "localhost:3000", Some(&cookies)).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let jar = set_cookies(&res);
    assert_deleted(&jar, "id_token");
    assert_deleted(&jar, "refresh_token");
}

#[tokio::test]
async fn logout_clears_tokens_and_redirects_home() {
    let app = TestApp::new().await;
    let cookies = format!("id_token={}; refresh_token=good-refresh", valid_id_token());

    let res = app.get("/logout", "localhost:3000", Some(&cookies)).await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(res.headers()[LOCATION], "/");
    let jar = set_cookies(&res);
    assert_deleted(&jar, "id_token");
    assert_deleted(&jar, "refresh_token");
}

#[tokio::test]
async fn logout_without_session_redirects_home() {
    let app = TestApp::new().await;

    let res = app.get("/logout", "localhost:3000", None).await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(res.headers()[LOCATION], "/");
}

#[tokio::test]
async fn login_redirects_to_authorization_endpoint() {
    let app = TestApp::new().await;

    let res = app.get("/login/google", "localhost:3000", None).await;
    assert_eq!(res.status(), StatusCode::FOUND);

    let location = url::Url::parse(res.headers()[LOCATION].to_str().unwrap()).unwrap();
    assert!(location.as_str().starts_with(GOOGLE_AUTH_ENDPOINT));
    let query: HashMap<_, _> = location.query_pairs().into_owned().collect();
    assert_eq!(query["client_id"], CLIENT_ID);
    assert_eq!(query["response_type"], "code");
    assert_eq!(query["scope"], "openid");
    assert_eq!(query["redirect_uri"], "http://localhost:3000/login/google");
}

#[tokio::test]
async fn login_callback_stores_tokens() {
    let app = TestApp::new().await;

    let res = app
        .get("/login/google?code=good-code&scope=openid", "localhost:3000", None)
        .await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(res.headers()[LOCATION], "/");

    let jar = set_cookies(&res);
    assert!(!cookie(&jar, "id_token").unwrap().value().is_empty());
    assert_eq!(cookie(&jar, "refresh_token").unwrap().value(), "issued-refresh");

    let cookies = jar
        .iter()
        .map(|c| format!("{}={}", c.name(), c.value()))
        .collect::<Vec<_>>()
        .join("; ");
    let res = app.get("/", "localhost:3000", Some(&cookies)).await;
    assert!(body_string(res).await.contains(&format!("Hello, {}!", SUB)));
}

#[tokio::test]
async fn login_callback_with_bad_code_stays_anonymous() {
    let app = TestApp::new().await;

    let res = app.get("/login/google?code=bad-code", "localhost:3000", None).await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(res.headers()[LOCATION], "/");
    assert!(set_cookies(&res).iter().all(|c| c.value().is_empty()));
}

#[tokio::test]
async fn login_denied_redirects_home() {
    let app = TestApp::new().await;

    let res = app
        .get("/login/google?error=access_denied", "localhost:3000", None)
        .await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(res.headers()[LOCATION], "/");
    assert!(set_cookies(&res).is_empty());
}

#[tokio::test]
async fn unknown_provider_is_not_found() {
    let app = TestApp::new().await;

    let res = app.get("/login/github", "localhost:3000", None).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}
