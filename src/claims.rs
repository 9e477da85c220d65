//! Turns a stored ID token into verified `Claims`.
//!
//! For issuers configured with `use_local_jwt = false` (Google) the issuer's
//! key set is fetched on every call and the token's signature, issuer,
//! audience and expiry are checked with `jsonwebtoken`. With
//! `use_local_jwt = true` the payload is decoded and only its issuer and
//! audience are compared.
use std::pin::Pin;

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

use crate::{
    config::IssuerConfig,
    executer::{ExecuteError, Executer, JwksExe, JwksRequest},
    id_token::{IDToken, IDTokenRow},
};

/// What this application knows about the logged in user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
}

#[derive(Debug, Error)]
pub enum ClaimsError {
    /// The key set could not be fetched; says nothing about the token itself.
    #[error("Failed to fetch key set: {0}")]
    KeySet(#[from] ExecuteError),
    #[error("No key in the key set matches the token")]
    UnknownKey,
    #[error("Invalid ID token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),
    #[error("ID token was not issued for this client")]
    Mismatch,
    #[error("Failed to decode ID token: {0}")]
    Decode(#[from] crate::error::Error),
}

impl ClaimsError {
    /// `true` when the token itself was rejected, as opposed to the key set
    /// being unavailable.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, ClaimsError::KeySet(_))
    }
}

/// Everything needed to verify one ID token for one issuer.
#[derive(Debug, Clone)]
pub struct ClaimsRequest {
    id_token: IDTokenRow,
    issuer: String,
    audience: String,
    use_local_jwt: bool,
    jwks: JwksRequest,
}

impl ClaimsRequest {
    pub fn new(config: &IssuerConfig, id_token: IDTokenRow) -> Self {
        Self {
            id_token,
            issuer: config.issuer().to_string(),
            audience: config.client_id().to_string(),
            use_local_jwt: config.use_local_jwt(),
            jwks: JwksRequest::new(config),
        }
    }

    fn local_claims(&self) -> Result<Claims, ClaimsError> {
        let payload = IDToken::decode_from_row(&self.id_token)?;
        if payload.iss != self.issuer || payload.aud != self.audience {
            return Err(ClaimsError::Mismatch);
        }
        Ok(Claims { sub: payload.sub })
    }

    async fn remote_claims(&self) -> Result<Claims, ClaimsError> {
        let token = self.id_token.value_as_str();
        let header = decode_header(token)?;
        let kid = header.kid.ok_or(ClaimsError::UnknownKey)?;

        let jwks = JwksExe.execute(&self.jwks).await?;
        let jwk = jwks.find(&kid).ok_or(ClaimsError::UnknownKey)?;
        let key = DecodingKey::from_jwk(jwk)?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);

        let data = decode::<Claims>(token, &key, &validation)?;
        Ok(data.claims)
    }
}

/// Extracts `Claims` from an ID token.
pub struct ClaimsExe;

impl<'a> Executer<'a, ClaimsRequest> for ClaimsExe {
    type Response = Claims;
    type Error = ClaimsError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'a>>;

    fn execute(&'a self, req: &'a ClaimsRequest) -> Self::Future {
        Box::pin(async move {
            let claims = if req.use_local_jwt {
                req.local_claims()
            } else {
                req.remote_claims().await
            };
            claims.map_err(|e| {
                error!("Failed to verify ID token: {}", e);
                e
            })
        })
    }
}
