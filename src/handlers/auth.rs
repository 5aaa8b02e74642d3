//! Account handlers: register, login, logout and the current user.

use crate::auth::{AuthService, Credentials, Registration, UserInfo};
use crate::error::AppError;
use crate::extractors::{AccessToken, AuthCaller, WriteBody};
use crate::policy::Role;
use crate::response::{created, done, ok, Reply};
use crate::state::AppState;
use axum::extract::State;
use serde::Serialize;

#[derive(Serialize, Debug)]
pub struct TokenGrant {
    pub token: String,
    pub token_type: &'static str,
    pub user: UserInfo,
}

impl TokenGrant {
    fn bearer(token: String, user: UserInfo) -> Self {
        TokenGrant {
            token,
            token_type: "Bearer",
            user,
        }
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permissions {
    pub can_create: bool,
    pub can_read: bool,
    pub can_update: bool,
    pub can_delete: bool,
}

impl Permissions {
    pub fn for_role(role: Role) -> Self {
        let admin = role == Role::Admin;
        Permissions {
            can_create: admin,
            can_read: true,
            can_update: admin,
            can_delete: admin,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct CurrentUser {
    #[serde(flatten)]
    pub user: UserInfo,
    pub permissions: Permissions,
}

pub async fn register(
    State(state): State<AppState>,
    WriteBody(submission): WriteBody,
) -> Result<Reply<TokenGrant>, AppError> {
    let registration = Registration::parse(&submission.fields).map_err(AppError::Validation)?;
    let (token, user) =
        AuthService::register(&state.pool, registration, state.settings.register_role).await?;
    Ok(created("Registration successful", TokenGrant::bearer(token, user)))
}

pub async fn login(
    State(state): State<AppState>,
    WriteBody(submission): WriteBody,
) -> Result<Reply<TokenGrant>, AppError> {
    let credentials = Credentials::parse(&submission.fields).map_err(AppError::Validation)?;
    let (token, user) = AuthService::login(&state.pool, credentials).await?;
    tracing::info!(user_id = user.id, "login");
    Ok(ok("Login successful", TokenGrant::bearer(token, user)))
}

pub async fn logout(
    State(state): State<AppState>,
    AuthCaller(caller): AuthCaller,
    AccessToken(token): AccessToken,
) -> Result<Reply<()>, AppError> {
    AuthService::revoke(&state.pool, &token).await?;
    tracing::info!(user_id = caller.id, "logout");
    Ok(done("Logged out successfully"))
}

pub async fn user(
    State(state): State<AppState>,
    AuthCaller(caller): AuthCaller,
) -> Result<Reply<CurrentUser>, AppError> {
    let user = AuthService::user(&state.pool, caller.id)
        .await?
        .ok_or_else(|| AppError::Unauthenticated("Unauthenticated.".into()))?;
    let permissions = Permissions::for_role(user.role);
    Ok(ok(
        "User data retrieved successfully",
        CurrentUser { user, permissions },
    ))
}
