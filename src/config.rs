//! Defines the identity providers this application can log in with.
//!
//! Only Google is supported today, but the shape is a closed set of issuers
//! (`Issuer`) mapped to immutable configuration records (`IssuerConfig`)
//! through the `Providers` registry.
//!
//! ## Structures
//! - `Issuer`: The supported issuers.
//! - `IssuerConfig`: Endpoints, credentials and scopes of one issuer.
//! - `IssuerConfigBuilder`: A builder for constructing an `IssuerConfig` instance.
//! - `Providers`: Lookup from `Issuer` to its `IssuerConfig`.
//!
//! # Example
//! ```rust,no_run
//! use cookie_google_oidc::config::{Issuer, IssuerConfig, Providers};
//!
//! let google = IssuerConfig::google_from_env().expect("credentials in env");
//! let providers = Providers::new(google);
//! assert_eq!(providers.get(Issuer::Google).issuer(), "https://accounts.google.com");
//! ```
use thiserror::Error;
use tracing::error;

use crate::code::AdditionalScope;

pub const GOOGLE_ISSUER: &str = "https://accounts.google.com";
pub const GOOGLE_AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const GOOGLE_TOKEN_ENDPOINT: &str = "https://www.googleapis.com/oauth2/v4/token";
pub const GOOGLE_REVOCATION_ENDPOINT: &str = "https://oauth2.googleapis.com/revoke";
pub const GOOGLE_JWKS_URI: &str = "https://www.googleapis.com/oauth2/v3/certs";

pub const GOOGLE_CLIENT_ENV: &str = "OIDC_GOOGLE_CLIENT";
pub const GOOGLE_SECRET_ENV: &str = "OIDC_GOOGLE_SECRET";

/// Issuers this application accepts tokens from.
///
/// The default is the issuer used when a request carries no ID token to tell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Issuer {
    #[default]
    Google,
}

impl Issuer {
    /// The `iss` value the issuer puts in its ID tokens.
    pub fn url(&self) -> &'static str {
        match self {
            Issuer::Google => GOOGLE_ISSUER,
        }
    }

    /// The path segment of the login route for this issuer.
    pub fn path_segment(&self) -> &'static str {
        match self {
            Issuer::Google => "google",
        }
    }

    /// Maps an `iss` claim back to a supported issuer.
    pub fn from_url(iss: &str) -> Option<Self> {
        match iss {
            GOOGLE_ISSUER => Some(Issuer::Google),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),
}

#[derive(Debug, Clone, Default)]
pub(crate) struct IssuerURL(pub String);

#[derive(Debug, Clone, Default)]
pub(crate) struct AuthEndPoint(pub String);

#[derive(Debug, Clone, Default)]
pub(crate) struct TokenEndPoint(pub String);

#[derive(Debug, Clone, Default)]
pub(crate) struct RevocationEndPoint(pub String);

#[derive(Debug, Clone, Default)]
pub(crate) struct JwksURI(pub String);

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ClientID(pub String);

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ClientSecret(pub String);

/// Holds everything needed to talk to one OpenID Connect issuer.
///
/// It is immutable once constructed.
///
/// # Fields
/// - `issuer`: The issuer URL, matched against the `iss` claim.
/// - `auth_endpoint`: The authorization endpoint URL.
/// - `token_endpoint`: The endpoint used for code exchange and refresh.
/// - `revocation_endpoint`: The token revocation endpoint URL.
/// - `jwks_uri`: Where the issuer publishes its signing keys.
/// - `client_id` / `client_secret`: OAuth client credentials.
/// - `use_local_jwt`: Trust the decoded ID token payload without fetching the key set.
/// - `scopes`: Scopes requested in addition to `openid`.
#[derive(Debug, Clone)]
pub struct IssuerConfig {
    pub(crate) issuer: IssuerURL,
    pub(crate) auth_endpoint: AuthEndPoint,
    pub(crate) token_endpoint: TokenEndPoint,
    pub(crate) revocation_endpoint: RevocationEndPoint,
    pub(crate) jwks_uri: JwksURI,
    pub(crate) client_id: ClientID,
    pub(crate) client_secret: ClientSecret,
    pub(crate) use_local_jwt: bool,
    pub(crate) scopes: Vec<AdditionalScope>,
}

// ==========impl IssuerConfig==========
impl IssuerConfig {
    /// Returns a new `IssuerConfigBuilder` instance.
    pub fn builder() -> IssuerConfigBuilder {
        IssuerConfigBuilder::default()
    }

    /// Google's endpoints with the given credentials.
    pub fn google(client_id: &str, client_secret: &str) -> Self {
        Self::builder()
            .issuer(GOOGLE_ISSUER)
            .auth_endpoint(GOOGLE_AUTH_ENDPOINT)
            .token_endpoint(GOOGLE_TOKEN_ENDPOINT)
            .revocation_endpoint(GOOGLE_REVOCATION_ENDPOINT)
            .jwks_uri(GOOGLE_JWKS_URI)
            .client_id(client_id)
            .client_secret(client_secret)
            .use_local_jwt(false)
            .build()
    }

    /// Google's configuration with credentials read from `OIDC_GOOGLE_CLIENT`
    /// and `OIDC_GOOGLE_SECRET`. A `.env` file is honored.
    pub fn google_from_env() -> Result<Self, ConfigError> {
        let client_id = read_env(GOOGLE_CLIENT_ENV)?;
        let client_secret = read_env(GOOGLE_SECRET_ENV)?;
        Ok(Self::google(&client_id, &client_secret))
    }

    pub fn issuer(&self) -> &str {
        &self.issuer.0
    }

    pub fn auth_endpoint(&self) -> &str {
        &self.auth_endpoint.0
    }

    pub fn token_endpoint(&self) -> &str {
        &self.token_endpoint.0
    }

    pub fn revocation_endpoint(&self) -> &str {
        &self.revocation_endpoint.0
    }

    pub fn jwks_uri(&self) -> &str {
        &self.jwks_uri.0
    }

    pub fn client_id(&self) -> &str {
        &self.client_id.0
    }

    pub fn use_local_jwt(&self) -> bool {
        self.use_local_jwt
    }

    pub fn scopes(&self) -> &[AdditionalScope] {
        &self.scopes
    }
}

fn read_env(key: &'static str) -> Result<String, ConfigError> {
    dotenvy::var(key).map_err(|e| {
        error!("Failed to read {}: {}", key, e);
        ConfigError::MissingEnv(key)
    })
}

/// Provides a convenient way to create an `IssuerConfig` instance step by step.
#[derive(Debug, Clone, Default)]
pub struct IssuerConfigBuilder {
    issuer: IssuerURL,
    auth_endpoint: AuthEndPoint,
    token_endpoint: TokenEndPoint,
    revocation_endpoint: RevocationEndPoint,
    jwks_uri: JwksURI,
    client_id: ClientID,
    client_secret: ClientSecret,
    use_local_jwt: bool,
    scopes: Vec<AdditionalScope>,
}

// ==========impl IssuerConfigBuilder==========
impl IssuerConfigBuilder {
    /// Creates a new `IssuerConfigBuilder` instance with default values.
    pub fn new() -> Self {
        IssuerConfigBuilder::default()
    }

    /// Sets the issuer URL.
    pub fn issuer(mut self, issuer: &str) -> Self {
        self.issuer = IssuerURL(issuer.to_string());
        self
    }

    /// Sets the authorization endpoint URL.
    pub fn auth_endpoint(mut self, auth_endpoint: &str) -> Self {
        self.auth_endpoint = AuthEndPoint(auth_endpoint.to_string());
        self
    }

    /// Sets the token endpoint URL.
    pub fn token_endpoint(mut self, token_endpoint: &str) -> Self {
        self.token_endpoint = TokenEndPoint(token_endpoint.to_string());
        self
    }

    /// Sets the revocation endpoint URL.
    pub fn revocation_endpoint(mut self, revocation_endpoint: &str) -> Self {
        self.revocation_endpoint = RevocationEndPoint(revocation_endpoint.to_string());
        self
    }

    /// Sets the JWKS URI.
    pub fn jwks_uri(mut self, jwks_uri: &str) -> Self {
        self.jwks_uri = JwksURI(jwks_uri.to_string());
        self
    }

    /// Sets the client ID. It is also the expected ID token audience.
    pub fn client_id(mut self, client_id: &str) -> Self {
        self.client_id = ClientID(client_id.to_string());
        self
    }

    /// Sets the client secret associated with the client ID.
    pub fn client_secret(mut self, client_secret: &str) -> Self {
        self.client_secret = ClientSecret(client_secret.to_string());
        self
    }

    pub fn use_local_jwt(mut self, use_local_jwt: bool) -> Self {
        self.use_local_jwt = use_local_jwt;
        self
    }

    /// Adds a scope requested on top of `openid`.
    pub fn scope(mut self, scope: AdditionalScope) -> Self {
        self.scopes.push(scope);
        self
    }

    /// Constructs an `IssuerConfig` instance with the provided values.
    pub fn build(self) -> IssuerConfig {
        IssuerConfig {
            issuer: self.issuer,
            auth_endpoint: self.auth_endpoint,
            token_endpoint: self.token_endpoint,
            revocation_endpoint: self.revocation_endpoint,
            jwks_uri: self.jwks_uri,
            client_id: self.client_id,
            client_secret: self.client_secret,
            use_local_jwt: self.use_local_jwt,
            scopes: self.scopes,
        }
    }
}

/// Configuration of every supported issuer, built once at startup.
#[derive(Debug, Clone)]
pub struct Providers {
    google: IssuerConfig,
}

impl Providers {
    pub fn new(google: IssuerConfig) -> Self {
        Self { google }
    }

    pub fn get(&self, issuer: Issuer) -> &IssuerConfig {
        match issuer {
            Issuer::Google => &self.google,
        }
    }

    /// Looks up the configuration for an `iss` claim.
    pub fn by_url(&self, iss: &str) -> Option<(Issuer, &IssuerConfig)> {
        Issuer::from_url(iss).map(|issuer| (issuer, self.get(issuer)))
    }
}
