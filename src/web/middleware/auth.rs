//! Session token middleware and extractors.
//!
//! [`jwt_auth`] puts the shared [`SessionKeys`] into every request's extensions.
//! [`AuthUser`] then verifies the bearer token and exposes its claims, and
//! [`AdminUser`] additionally requires the admin role. Handlers downstream
//! trust the claims without touching the store.

use axum::{
    body::Body,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, Request},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::auth::{SessionClaims, SessionKeys};
use crate::submission::Caller;
use crate::web::error::ApiError;

/// Extractor for authenticated users.
///
/// Rejects with 401 when the token is missing, malformed, badly signed or expired.
#[derive(Debug, Clone)]
pub struct AuthUser(pub SessionClaims);

impl AuthUser {
    /// Identity and role for moderation checks.
    pub fn caller(&self) -> Caller {
        Caller::new(self.0.sub, self.0.role())
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn authenticate(parts: &Parts) -> Result<SessionClaims, ApiError> {
    let Some(token) = bearer_token(parts) else {
        tracing::debug!(method = %parts.method, path = %parts.uri.path(), "request without token");
        return Err(ApiError::unauthorized("No token"));
    };

    let keys = parts
        .extensions
        .get::<Arc<SessionKeys>>()
        .ok_or_else(|| ApiError::internal("Session keys not configured"))?;

    keys.verify(token).map_err(|_| {
        tracing::debug!(method = %parts.method, path = %parts.uri.path(), "invalid or expired token");
        ApiError::unauthorized("Invalid or expired token")
    })
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move { authenticate(parts).map(AuthUser) })
    }
}

/// Extractor for authenticated admins.
///
/// Runs the [`AuthUser`] check first, then rejects non-admins with 403.
#[derive(Debug, Clone)]
pub struct AdminUser(pub SessionClaims);

impl AdminUser {
    /// Identity and role for moderation checks.
    pub fn caller(&self) -> Caller {
        Caller::new(self.0.sub, self.0.role())
    }
}

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let claims = authenticate(parts)?;
            if !claims.role().is_admin() {
                tracing::info!(
                    user_id = claims.sub,
                    role = %claims.role,
                    path = %parts.uri.path(),
                    "admin route denied"
                );
                return Err(ApiError::forbidden("Admin only"));
            }
            Ok(AdminUser(claims))
        })
    }
}

/// Middleware function to inject session keys into request extensions.
pub async fn jwt_auth(keys: Arc<SessionKeys>, mut request: Request<Body>, next: Next) -> Response {
    request.extensions_mut().insert(keys);
    next.run(request).await
}
