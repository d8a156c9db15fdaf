//! Sign-in/sign-out endpoints and the extractors that gate admin routes.

use crate::{
    errors::AppError,
    services::session::{AuthState, AuthUser, Session, SessionStore},
};
use axum::{
    Json,
    extract::{FromRef, FromRequestParts, State},
    http::{StatusCode, header, request::Parts},
    response::IntoResponse,
};
use serde::Deserialize;
use std::convert::Infallible;

#[derive(Debug, Deserialize)]
pub struct SignInReq {
    pub email: String,
    pub password: String,
}

/// `POST /auth/sign-in`
pub async fn sign_in(
    State(sessions): State<SessionStore>,
    Json(req): Json<SignInReq>,
) -> Result<Json<Session>, AppError> {
    Ok(Json(sessions.sign_in(&req.email, &req.password)?))
}

/// `POST /auth/sign-out`: revokes the bearer token, if any.
pub async fn sign_out(
    State(sessions): State<SessionStore>,
    BearerToken(token): BearerToken,
) -> impl IntoResponse {
    if let Some(token) = token {
        sessions.sign_out(&token);
    }
    StatusCode::NO_CONTENT
}

/// The raw `Authorization: Bearer` token, if present.
pub struct BearerToken(pub Option<String>);

impl<S: Send + Sync> FromRequestParts<S> for BearerToken {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty());
        Ok(BearerToken(token))
    }
}

impl<S> FromRequestParts<S> for AuthState
where
    S: Send + Sync,
    SessionStore: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;
        Ok(SessionStore::from_ref(state).resolve(token.as_deref()))
    }
}

/// Extractor that only succeeds for an authenticated admin.
pub struct RequireAdmin(pub AuthUser);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
    SessionStore: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = match AuthState::from_request_parts(parts, state).await {
            Ok(auth) => auth,
            Err(never) => match never {},
        };
        match auth {
            AuthState {
                authenticated: true,
                user: Some(user),
            } => Ok(RequireAdmin(user)),
            _ => Err(AppError::unauthorized("sign in required")),
        }
    }
}
