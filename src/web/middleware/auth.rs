//! Bearer token authentication.

use axum::{
    async_trait,
    body::Body,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, Request},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::auth::{JwtClaims, TokenIssuer};
use crate::model::Identity;
use crate::web::error::ApiError;

/// Extractor for authenticated callers.
///
/// Reads the `Authorization: Bearer` header and verifies the token with the
/// [`TokenIssuer`] installed by [`jwt_auth`].
#[derive(Debug, Clone)]
pub struct AuthUser(pub JwtClaims);

impl AuthUser {
    /// The caller as an identity.
    pub fn identity(&self) -> Identity {
        claims_identity(&self.0)
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

fn claims_identity(claims: &JwtClaims) -> Identity {
    Identity {
        id: claims.sub.clone(),
        email: claims.email.clone(),
        display_name: claims.name.clone(),
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token =
            bearer_token(parts).ok_or_else(|| ApiError::unauthorized("Missing authorization"))?;

        let issuer = parts
            .extensions
            .get::<Arc<TokenIssuer>>()
            .ok_or_else(|| ApiError::internal("Token issuer not configured"))?;

        let claims = issuer.verify(token)?;
        Ok(AuthUser(claims))
    }
}

/// Optional authentication extractor.
///
/// Like [`AuthUser`] but yields `None` for a missing or invalid token.
#[derive(Debug, Clone)]
pub struct OptionalAuthUser(pub Option<JwtClaims>);

impl OptionalAuthUser {
    /// The caller as an identity, if authenticated.
    pub fn identity(&self) -> Option<Identity> {
        self.0.as_ref().map(claims_identity)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for OptionalAuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts) else {
            return Ok(OptionalAuthUser(None));
        };
        let Some(issuer) = parts.extensions.get::<Arc<TokenIssuer>>() else {
            return Ok(OptionalAuthUser(None));
        };
        Ok(OptionalAuthUser(issuer.verify(token).ok()))
    }
}

/// Middleware installing the token issuer into request extensions.
pub async fn jwt_auth(issuer: Arc<TokenIssuer>, mut request: Request<Body>, next: Next) -> Response {
    request.extensions_mut().insert(issuer);
    next.run(request).await
}
