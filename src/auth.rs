//! Stub authentication: register, login, and bearer-token sessions.
//!
//! Tokens are random UUID v4 strings mapped to a user id in process memory.
//! Passwords are compared as plaintext. None of this is meant to protect
//! anything; it gives the browser client a login flow to exercise.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/auth/register` | Create an account, returns `{user, token}` |
//! | `POST` | `/api/auth/login` | Check credentials, returns `{user, token}` |
//! | `GET`  | `/api/auth/me` | The user behind the bearer token |
//! | `GET`  | `/api/auth/verify` | `{valid: true, user}` for a live token |
//! | `POST` | `/api/auth/logout` | Revoke the bearer token |

use std::collections::HashMap;
use std::sync::RwLock;

use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use skillsync_core::models::{NewUser, Role, User};
use skillsync_core::store::StoreError;
use uuid::Uuid;

use crate::server::{unauthorized, ApiJson, AppError, AppState};

/// Live session tokens, token to user id.
///
/// Tokens live until logout or restart; there is no expiry.
#[derive(Default)]
pub struct Sessions {
    tokens: RwLock<HashMap<String, String>>,
}

impl Sessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a token for `user_id`.
    pub fn issue(&self, user_id: &str) -> String {
        let token = Uuid::new_v4().to_string();
        self.tokens
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(token.clone(), user_id.to_string());
        token
    }

    pub fn resolve(&self, token: &str) -> Option<String> {
        self.tokens
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(token)
            .cloned()
    }

    /// Returns `true` if the token was live.
    pub fn revoke(&self, token: &str) -> bool {
        self.tokens
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(token)
            .is_some()
    }
}

/// The token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Resolve the bearer token to an active user, or 401.
pub async fn current_user(state: &AppState, headers: &HeaderMap) -> Result<User, AppError> {
    let token = bearer_token(headers).ok_or_else(|| unauthorized("missing bearer token"))?;
    let user_id = state
        .sessions
        .resolve(token)
        .ok_or_else(|| unauthorized("invalid or expired token"))?;

    match state.store.get_user(&user_id).await {
        Ok(user) if user.is_active => Ok(user),
        Ok(_) => Err(unauthorized("account is disabled")),
        Err(StoreError::NotFound { .. }) => Err(unauthorized("invalid or expired token")),
        Err(e) => Err(e.into()),
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    username: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    user: User,
    token: String,
}

#[derive(Serialize)]
pub struct VerifyResponse {
    valid: bool,
    user: User,
}

pub async fn handle_register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let user = state
        .store
        .create_user(NewUser {
            username: req.username,
            email: req.email,
            password: req.password,
            role: Role::User,
        })
        .await?;
    let token = state.sessions.issue(&user.id);
    tracing::info!(username = %user.username, "registered user");

    Ok((StatusCode::CREATED, Json(AuthResponse { user, token })))
}

pub async fn handle_login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let user = state
        .store
        .find_user_by_username(&req.username)
        .await?
        .filter(|u| u.is_active && u.password == req.password)
        .ok_or_else(|| unauthorized("invalid username or password"))?;

    let token = state.sessions.issue(&user.id);
    tracing::info!(username = %user.username, "user logged in");
    Ok(Json(AuthResponse { user, token }))
}

pub async fn handle_me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<User>, AppError> {
    Ok(Json(current_user(&state, &headers).await?))
}

pub async fn handle_verify(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<VerifyResponse>, AppError> {
    let user = current_user(&state, &headers).await?;
    Ok(Json(VerifyResponse { valid: true, user }))
}

pub async fn handle_logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Json<serde_json::Value> {
    if let Some(token) = bearer_token(&headers) {
        state.sessions.revoke(token);
    }
    Json(serde_json::json!({ "message": "Logged out" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&headers_with("Bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers_with("bearer  abc ")), Some("abc"));
        assert_eq!(bearer_token(&headers_with("Basic abc")), None);
        assert_eq!(bearer_token(&headers_with("Bearer")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_sessions_issue_resolve_revoke() {
        let sessions = Sessions::new();
        let a = sessions.issue("1");
        let b = sessions.issue("1");
        assert_ne!(a, b);
        assert_eq!(sessions.resolve(&a).as_deref(), Some("1"));

        assert!(sessions.revoke(&a));
        assert!(!sessions.revoke(&a));
        assert_eq!(sessions.resolve(&a), None);
        assert_eq!(sessions.resolve(&b).as_deref(), Some("1"));
    }
}
