//! Provides an asynchronous execution framework for sending HTTP requests to the issuer.
//!
//! This module:
//! - Defines the Executer trait, which provides a unified interface for making HTTP requests.
//! - Implements executers for code exchange, refresh, revocation and key set requests.

use std::{collections::HashMap, error::Error, pin::Pin};

use crate::{
    config::IssuerConfig,
    id_token::{IDTokenRequest, IDTokenResponse},
    refresh_token::{RefreshTokenRequest, RefreshTokenResponse},
    revoke_token::RevokeTokenRequest,
};
use http::StatusCode;
use jsonwebtoken::jwk::JwkSet;
use reqwest::{Client, Url};
use thiserror::Error;
use tracing::error;

/// generic asynchronous execution interface for sending HTTP requests.
/// Key Components:
/// - Req: The request type that the executer will handle.
/// - Response: The expected response type.
/// - Error: The error type that will be returned on failure.
/// - Future: The asynchronous execution result, returning either Response or Error
pub trait Executer<'a, Req>
where
    Req: Send,
{
    type Response;
    type Error: Error;
    type Future: Future<Output = Result<Self::Response, Self::Error>> + Send + 'a;

    fn execute(&'a self, req: &'a Req) -> Self::Future;
}

/// Defines possible errors that can occur during request execution.
#[derive(Debug, Clone, Error)]
pub enum ExecuteError {
    #[error("Issuer answered with status {0}")]
    Status(StatusCode),
    #[error("Failed to parse data")]
    Parse,
    #[error("Failed to send request")]
    Send,
    #[error("Failed to parse url")]
    URL,
}

fn parse_url(url: &str) -> Result<Url, ExecuteError> {
    Url::parse(url).map_err(|e| {
        error!("Failed to parse url: {:?}", e);
        ExecuteError::URL
    })
}

async fn post_form(
    url: Url,
    params: &HashMap<&str, &str>,
) -> Result<reqwest::Response, ExecuteError> {
    let client = Client::new();
    let res = client
        .post(url)
        .header("Content-Type", "application/x-www-form-urlencoded")
        .form(params)
        .send()
        .await
        .map_err(|e| {
            error!("Failed to send request: {:?}", e);
            ExecuteError::Send
        })?;
    if !res.status().is_success() {
        error!("Token endpoint answered with status {}", res.status());
        return Err(ExecuteError::Status(res.status()));
    }
    Ok(res)
}

/// Handles code exchange requests to obtain an ID token and a refresh token.
pub struct IDTokenExe;

/// Request Workflow
/// 1. Parse the token endpoint URL.
/// 2. Prepare the request parameters.
/// 3. Send an HTTP POST request.
/// 4. Parse and return the response as IDTokenResponse.
impl<'a> Executer<'a, IDTokenRequest> for IDTokenExe {
    type Response = IDTokenResponse;
    type Error = ExecuteError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'a>>;

    fn execute(&'a self, req: &'a IDTokenRequest) -> Self::Future {
        Box::pin(async move {
            let url = parse_url(req.token_endpoint())?;

            let mut params = HashMap::new();
            params.insert("code", req.code());
            params.insert("client_id", req.client_id());
            params.insert("client_secret", req.client_secret());
            params.insert("redirect_uri", req.redirect_uri());
            params.insert("grant_type", req.grant_type());

            let res = post_form(url, &params).await?;
            let res_json = res.json::<IDTokenResponse>().await.map_err(|e| {
                error!("Failed to parse JSON: {:?}", e);
                ExecuteError::Parse
            })?;
            Ok(res_json)
        })
    }
}

/// Handles revocation of access tokens or refresh tokens.
pub struct RevokeTokenExe;

/// Request Workflow
/// 1. Prepare the revocation endpoint URL.
/// 2. Send the token to be revoked.
/// 3. Return the HTTP status code indicating success or failure.
impl<'a> Executer<'a, RevokeTokenRequest> for RevokeTokenExe {
    type Response = StatusCode;
    type Error = ExecuteError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'a>>;

    fn execute(&'a self, req: &'a RevokeTokenRequest) -> Self::Future {
        Box::pin(async move {
            let url = parse_url(req.end_point())?;

            let mut param = HashMap::new();
            param.insert("token", req.inner_value());
            let client = Client::new();
            let status_code = client
                .post(url)
                .header("Content-Type", "application/x-www-form-urlencoded")
                .form(&param)
                .send()
                .await
                .map_err(|e| {
                    error!("Failed to send request: {:?}", e);
                    ExecuteError::Send
                })?
                .status();
            Ok(status_code)
        })
    }
}

/// Handles refreshing the ID token using a refresh token.
pub struct RefreshTokenExe;

/// Request Workflow
/// 1. Prepare the request parameters.
/// 2. Send an HTTP POST request to the issuer's token endpoint.
/// 3. Parse and return the new RefreshTokenResponse.
impl<'a> Executer<'a, RefreshTokenRequest> for RefreshTokenExe {
    type Response = RefreshTokenResponse;
    type Error = ExecuteError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'a>>;

    fn execute(&'a self, req: &'a RefreshTokenRequest) -> Self::Future {
        Box::pin(async move {
            let url = parse_url(&req.refresh_token_endpoint)?;

            let mut param = HashMap::new();
            param.insert("client_id", req.client_id.0.as_str());
            param.insert("client_secret", req.client_secret.0.as_str());
            param.insert("refresh_token", req.refresh_token.0.as_str());
            param.insert("grant_type", req.grant_type.as_str());

            let res = post_form(url, &param).await?;
            let res_json = res.json::<RefreshTokenResponse>().await.map_err(|e| {
                error!("Failed to parse JSON: {:?}", e);
                ExecuteError::Parse
            })?;
            Ok(res_json)
        })
    }
}

/// A request for an issuer's published signing keys.
#[derive(Debug, Clone)]
pub struct JwksRequest {
    jwks_uri: String,
}

impl JwksRequest {
    pub fn new(config: &IssuerConfig) -> Self {
        Self {
            jwks_uri: config.jwks_uri.0.to_owned(),
        }
    }
}

/// Fetches a JSON Web Key Set.
pub struct JwksExe;

impl<'a> Executer<'a, JwksRequest> for JwksExe {
    type Response = JwkSet;
    type Error = ExecuteError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'a>>;

    fn execute(&'a self, req: &'a JwksRequest) -> Self::Future {
        Box::pin(async move {
            let url = parse_url(&req.jwks_uri)?;

            let res = Client::new().get(url).send().await.map_err(|e| {
                error!("Failed to fetch key set: {:?}", e);
                ExecuteError::Send
            })?;
            if !res.status().is_success() {
                error!("Key set endpoint answered with status {}", res.status());
                return Err(ExecuteError::Status(res.status()));
            }
            let jwks = res.json::<JwkSet>().await.map_err(|e| {
                error!("Failed to parse key set: {:?}", e);
                ExecuteError::Parse
            })?;
            Ok(jwks)
        })
    }
}
