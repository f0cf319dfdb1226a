use async_trait::async_trait;
use axum::{
    extract::{rejection::JsonRejection, FromRef, FromRequestParts, State},
    http::{header, request::Parts, HeaderMap},
    routing::{get, post},
    Json, Router,
};
use log::debug;
use std::sync::Arc;

use crate::core::urls::ApiUrls;
use crate::onboarding::{Identity, LoginRequest, LoginResponse, OnboardingError, SessionUser};
use crate::security::jwt::extract_bearer_token;
use crate::shared::state::AppState;

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(extract_bearer_token)
}

/// Caller with a valid bearer token.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser(pub Identity);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
    Arc<AppState>: FromRef<S>,
{
    type Rejection = OnboardingError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = Arc::<AppState>::from_ref(state);
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| OnboardingError::unauthorized("No authentication token"))?;

        let claims = state.jwt.verify(token).map_err(|e| {
            debug!("[AUTH] rejected token: {e}");
            OnboardingError::unauthorized("Invalid or expired token")
        })?;
        let identity = claims
            .identity()
            .map_err(|_| OnboardingError::unauthorized("Invalid or expired token"))?;
        Ok(Self(identity))
    }
}

/// Identity when a valid token was sent, `None` otherwise. Never rejects.
pub struct OptionalAuth(pub Option<Identity>);

#[async_trait]
impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
    Arc<AppState>: FromRef<S>,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match AuthenticatedUser::from_request_parts(parts, state).await {
            Ok(AuthenticatedUser(identity)) => Ok(OptionalAuth(Some(identity))),
            Err(_) => Ok(OptionalAuth(None)),
        }
    }
}

pub fn auth_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(ApiUrls::AUTH_LOGIN, post(login_handler))
        .route(ApiUrls::AUTH_ME, get(me_handler))
}

pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, OnboardingError> {
    let user = state.service.authenticate(body?.0).await?;
    let token = state
        .jwt
        .issue(&user)
        .map_err(|e| OnboardingError::storage(e.to_string()))?;
    Ok(Json(LoginResponse {
        token,
        user: SessionUser::from(&user),
    }))
}

pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(identity): AuthenticatedUser,
) -> Result<Json<SessionUser>, OnboardingError> {
    Ok(Json(state.service.current_user(Some(&identity)).await?))
}
