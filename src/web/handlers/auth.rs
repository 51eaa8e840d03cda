//! Account and session handlers.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use super::AppState;
use crate::model::Identity;
use crate::web::dto::{
    ApiResponse, LogoutQuery, LogoutRequest, SignUpRequest, TokenQuery, TokenRequest,
    TokenResponse, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::middleware::AuthUser;

/// POST /auth/v1/signup - Register a user.
///
/// Email confirmation is not required; the caller signs in afterwards.
pub async fn signup(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<SignUpRequest>,
) -> Result<Json<ApiResponse<Identity>>, ApiError> {
    let identity = state
        .auth
        .sign_up(&req.email, &req.password, &req.data.full_name)
        .await?;
    Ok(Json(ApiResponse::new(identity)))
}

/// POST /auth/v1/token - Issue a session.
///
/// `grant_type=password` exchanges credentials; `grant_type=refresh_token`
/// rotates a refresh token.
pub async fn token(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TokenQuery>,
    Json(req): Json<TokenRequest>,
) -> Result<Json<ApiResponse<TokenResponse>>, ApiError> {
    let session = match query.grant_type.as_str() {
        "password" => {
            let (Some(email), Some(password)) = (req.email, req.password) else {
                return Err(ApiError::bad_request("Email and password are required"));
            };
            state.auth.sign_in(&email, &password).await?
        }
        "refresh_token" => {
            let refresh_token = req
                .refresh_token
                .ok_or_else(|| ApiError::bad_request("refresh_token is required"))?;
            state.auth.refresh(&refresh_token).await?
        }
        other => {
            return Err(ApiError::bad_request(format!(
                "Unsupported grant_type: {other}"
            )))
        }
    };

    let expires_in = state.auth.issuer().access_token_expiry();
    Ok(Json(ApiResponse::new(TokenResponse::from_session(
        session, expires_in,
    ))))
}

/// POST /auth/v1/logout - Revoke refresh tokens of the caller.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Query(query): Query<LogoutQuery>,
    body: Option<Json<LogoutRequest>>,
) -> Result<StatusCode, ApiError> {
    let refresh_token = body.and_then(|Json(b)| b.refresh_token);
    state
        .auth
        .sign_out(&claims.sub, query.scope, refresh_token.as_deref())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /auth/v1/user - The caller's user record.
pub async fn user(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<ApiResponse<Identity>>, ApiError> {
    let identity = state.auth.identity(&claims.sub).await?;
    Ok(Json(ApiResponse::new(identity)))
}
