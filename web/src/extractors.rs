//! Request extractors.
//!
//! - [`Bearer`]: the raw token from `Authorization: Bearer <token>`
//! - [`CurrentUser`]: the stored user the token belongs to
//! - [`CurrentActor`]: the same user as the lifecycle sees it
//!
//! A missing or invalid token rejects the request with `401`.

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use helpdesk_core::{Actor, User};

/// Bearer token of the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bearer(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for Bearer
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing bearer token"))?;

        let (scheme, token) = value
            .split_once(' ')
            .ok_or_else(|| AppError::unauthorized("Malformed authorization header"))?;
        if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
            return Err(AppError::unauthorized("Malformed authorization header"));
        }
        Ok(Self(token.trim().to_string()))
    }
}

/// The authenticated user.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Bearer(token) = Bearer::from_request_parts(parts, state).await?;
        let user = state.auth.resolve(&token).await?;
        Ok(Self(user))
    }
}

/// The authenticated user as an actor of ticket operations.
#[derive(Debug, Clone)]
pub struct CurrentActor(pub Actor);

#[async_trait]
impl FromRequestParts<AppState> for CurrentActor {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        tracing::Span::current().record("user_id", tracing::field::display(user.id));
        Ok(Self(Actor::from(&user)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode};

    async fn bearer(value: Option<&str>) -> Result<Bearer, AppError> {
        let mut builder = Request::builder();
        if let Some(value) = value {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        let (mut parts, ()) = builder.body(()).unwrap().into_parts();
        Bearer::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn reads_bearer_tokens() {
        assert_eq!(
            bearer(Some("Bearer abc.def")).await.unwrap(),
            Bearer("abc.def".into())
        );
        assert_eq!(
            bearer(Some("bearer abc")).await.unwrap(),
            Bearer("abc".into())
        );
    }

    #[tokio::test]
    async fn rejects_missing_or_foreign_schemes() {
        for value in [None, Some("Basic dXNlcjpwdw=="), Some("Bearer "), Some("token")] {
            let err = bearer(value).await.unwrap_err();
            assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        }
    }
}
