//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for registration, login, logout and the current user.

use axum::{
    extract::State,
    http::{header, HeaderName, StatusCode},
    Extension, Json,
};
use edugen_core::domain::Role;
use edugen_core::ledger::{normalize_email, Registration};
use edugen_core::ports::PortError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::error::{reject, Rejection};
use crate::web::middleware::AuthUser;
use crate::web::state::AppState;
use crate::web::token::{cleared_cookie, session_cookie};
use crate::web::users::{
    check_password_strength, hash_password, password_matches, MessageResponse, UserResponse,
};

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub referral_code: Option<String>,
    /// Only `student` is accepted here.
    pub role: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserResponse,
}

type WithCookie<T> = (StatusCode, [(HeaderName, String); 1], Json<T>);

fn requested_role(role: Option<&str>) -> Result<Role, Rejection> {
    match role.map(str::trim) {
        None | Some("") | Some("student") => Ok(Role::Student),
        Some("admin") => Err((
            StatusCode::FORBIDDEN,
            "Admin accounts cannot be self-registered".to_string(),
        )),
        Some(other) => Err((StatusCode::BAD_REQUEST, format!("Unknown role '{}'", other))),
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/register - Create a new account, optionally with a referral code
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Invalid request"),
        (status = 403, description = "Requested an admin role"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<WithCookie<AuthResponse>, Rejection> {
    // 1. Validate before any side effect
    let role = requested_role(req.role.as_deref())?;
    check_password_strength(&req.password)?;

    // 2. Hash the password
    let password_hash = hash_password(&req.password)?;

    // 3. Create the account (and pay the referrer) in one store transaction
    let account = state
        .ledger
        .register(Registration {
            name: req.name,
            email: req.email,
            password_hash,
            role,
            referral_code: req.referral_code,
        })
        .await
        .map_err(|e| reject("Registration", e))?;

    // 4. Issue the token
    let token = state
        .tokens
        .issue(account.id, state.ledger.now())
        .map_err(|e| reject("Registration", e))?;
    let cookie = session_cookie(&token, state.tokens.ttl());

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse {
            token,
            user: UserResponse::from(&account),
        }),
    ))
}

/// POST /auth/login - Login with an existing account; advances the login streak
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<WithCookie<AuthResponse>, Rejection> {
    let invalid = || {
        (
            StatusCode::UNAUTHORIZED,
            "Invalid email or password".to_string(),
        )
    };

    // 1. Look the account up by its normalized email
    let email = normalize_email(&req.email).map_err(|_| invalid())?;
    let credentials = match state.db.get_credentials_by_email(&email).await {
        Ok(credentials) => credentials,
        Err(PortError::NotFound(_)) => {
            warn!("Login attempt for an unknown email");
            return Err(invalid());
        }
        Err(e) => return Err(reject("Login", e)),
    };

    // 2. Verify the password
    if !password_matches(&req.password, &credentials.password_hash)? {
        warn!(account_id = %credentials.account.id, "Login with a wrong password");
        return Err(invalid());
    }

    // 3. Advance the streak
    let account = state
        .ledger
        .record_login(credentials.account.id)
        .await
        .map_err(|e| reject("Login", e))?;

    // 4. Issue the token
    let token = state
        .tokens
        .issue(account.id, state.ledger.now())
        .map_err(|e| reject("Login", e))?;
    let cookie = session_cookie(&token, state.tokens.ttl());

    info!(account_id = %account.id, streak = account.streak, "Login successful");
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse {
            token,
            user: UserResponse::from(&account),
        }),
    ))
}

/// POST /auth/logout - Clear the token cookie
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 200, description = "Logout successful", body = MessageResponse))
)]
pub async fn logout_handler() -> WithCookie<MessageResponse> {
    (
        StatusCode::OK,
        [(header::SET_COOKIE, cleared_cookie())],
        Json(MessageResponse::new("Logged out")),
    )
}

/// GET /auth/me - The authenticated account
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "The current account", body = UserResponse),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserResponse>, Rejection> {
    let account = state
        .db
        .get_account(user.id)
        .await
        .map_err(|e| reject("Load account", e))?;
    Ok(Json(UserResponse::from(&account)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_student_role_is_self_assignable() {
        assert_eq!(requested_role(None).unwrap(), Role::Student);
        assert_eq!(requested_role(Some("student")).unwrap(), Role::Student);
        assert_eq!(requested_role(Some("admin")).unwrap_err().0, StatusCode::FORBIDDEN);
        assert_eq!(requested_role(Some("teacher")).unwrap_err().0, StatusCode::BAD_REQUEST);
    }
}
