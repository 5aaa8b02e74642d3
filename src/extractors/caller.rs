//! Bearer-token authentication and caller extraction.

use crate::auth::{bearer_token, AuthService};
use crate::error::AppError;
use crate::policy::Caller;
use crate::state::AppState;
use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};

const UNAUTHENTICATED: &str = "Unauthenticated.";

/// The bearer token a request was authenticated with.
#[derive(Clone, Debug)]
pub struct AccessToken(pub String);

/// Resolves the bearer token and stores the caller in request extensions.
/// Requests without a valid token stop here with 401.
pub async fn require_caller(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)
        .map(str::to_string)
        .ok_or_else(|| AppError::Unauthenticated(UNAUTHENTICATED.into()))?;
    let caller = AuthService::caller_for_token(&state.pool, &token)
        .await?
        .ok_or_else(|| AppError::Unauthenticated(UNAUTHENTICATED.into()))?;
    tracing::debug!(user_id = caller.id, role = %caller.role, "authenticated");
    request.extensions_mut().insert(caller);
    request.extensions_mut().insert(AccessToken(token));
    Ok(next.run(request).await)
}

/// Authenticated caller; only mounted behind `require_caller`.
#[derive(Clone, Debug)]
pub struct AuthCaller(pub Caller);

#[async_trait]
impl<S> FromRequestParts<S> for AuthCaller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Caller>()
            .cloned()
            .map(AuthCaller)
            .ok_or_else(|| AppError::Unauthenticated(UNAUTHENTICATED.into()))
    }
}

/// Caller when the route is authenticated, `None` on public routes.
#[derive(Clone, Debug)]
pub struct Viewer(pub Option<Caller>);

impl Viewer {
    pub fn caller(&self) -> Option<&Caller> {
        self.0.as_ref()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Viewer(parts.extensions.get::<Caller>().cloned()))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AccessToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AccessToken>()
            .cloned()
            .ok_or_else(|| AppError::Unauthenticated(UNAUTHENTICATED.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Role;
    use axum::http::Request as HttpRequest;

    fn parts_with(caller: Option<Caller>) -> Parts {
        let (mut parts, _) = HttpRequest::builder().uri("/").body(()).unwrap().into_parts();
        if let Some(c) = caller {
            parts.extensions.insert(c);
        }
        parts
    }

    fn caller() -> Caller {
        Caller {
            id: 1,
            name: "Admin".into(),
            email: "admin@masjid.example".into(),
            role: Role::Admin,
        }
    }

    #[tokio::test]
    async fn viewer_is_optional() {
        let mut parts = parts_with(None);
        let Viewer(v) = Viewer::from_request_parts(&mut parts, &()).await.unwrap();
        assert!(v.is_none());

        let mut parts = parts_with(Some(caller()));
        let Viewer(v) = Viewer::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(v.map(|c| c.id), Some(1));
    }

    #[tokio::test]
    async fn auth_caller_requires_extension() {
        let mut parts = parts_with(None);
        let err = AuthCaller::from_request_parts(&mut parts, &()).await.unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::UNAUTHORIZED);

        let mut parts = parts_with(Some(caller()));
        let AuthCaller(c) = AuthCaller::from_request_parts(&mut parts, &()).await.unwrap();
        assert!(c.is_admin());
    }
}
