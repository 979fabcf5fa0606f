//! services/api/src/web/users.rs
//!
//! Profile, leaderboard, dashboard and daily-spin endpoints.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use chrono::{DateTime, Utc};
use edugen_core::domain::{Account, ProfileUpdate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{reject, Rejection};
use crate::web::middleware::AuthUser;
use crate::web::quiz::QuizResultResponse;
use crate::web::state::AppState;

pub const LEADERBOARD_SIZE: usize = 10;
pub const DASHBOARD_RECENT_RESULTS: usize = 7;
pub const MIN_PASSWORD_LEN: usize = 6;

//=========================================================================================
// Request/Response Types
//=========================================================================================

/// The public view of an account. Never carries the password hash.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub xp: u64,
    pub level: String,
    pub streak: u32,
    pub total_study_hours: f64,
    pub avatar: String,
    pub theme: String,
    pub language: String,
    pub referral_code: String,
    pub referred_by: Option<Uuid>,
    pub referral_count: u32,
    pub last_login_date: Option<DateTime<Utc>>,
    pub last_spin_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&Account> for UserResponse {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            name: account.name.clone(),
            email: account.email.clone(),
            role: account.role.as_str().to_string(),
            xp: account.xp(),
            level: account.level().to_string(),
            streak: account.streak,
            total_study_hours: account.total_study_hours,
            avatar: account.avatar.clone(),
            theme: account.theme.clone(),
            language: account.language.clone(),
            referral_code: account.referral_code.clone(),
            referred_by: account.referred_by,
            referral_count: account.referral_count,
            last_login_date: account.last_login_at,
            last_spin_date: account.last_spin_at,
            created_at: account.created_at,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub avatar: Option<String>,
    pub theme: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LeaderboardEntry {
    pub name: String,
    pub avatar: String,
    pub xp: u64,
    pub level: String,
    pub streak: u32,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub user: UserResponse,
    pub recent_quiz_results: Vec<QuizResultResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SpinResponse {
    pub reward: u64,
    pub xp: u64,
    pub level: String,
    pub last_spin_date: Option<DateTime<Utc>>,
}

//=========================================================================================
// Password Helpers
//=========================================================================================

pub fn check_password_strength(password: &str) -> Result<(), Rejection> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("Password must be at least {} characters", MIN_PASSWORD_LEN),
        ));
    }
    Ok(())
}

pub fn hash_password(password: &str) -> Result<String, Rejection> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to hash password".to_string(),
            )
        })
}

pub fn password_matches(password: &str, password_hash: &str) -> Result<bool, Rejection> {
    let parsed_hash = PasswordHash::new(password_hash).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Authentication error".to_string(),
        )
    })?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /users/profile - The caller's account
#[utoipa::path(
    get,
    path = "/users/profile",
    responses(
        (status = 200, description = "The caller's profile", body = UserResponse),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserResponse>, Rejection> {
    let account = state
        .db
        .get_account(user.id)
        .await
        .map_err(|e| reject("Load profile", e))?;
    Ok(Json(UserResponse::from(&account)))
}

/// PUT /users/update - Edit name, avatar, theme or language
#[utoipa::path(
    put,
    path = "/users/update",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated profile", body = UserResponse),
        (status = 400, description = "Invalid field value")
    )
)]
pub async fn update_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, Rejection> {
    let update = ProfileUpdate {
        name: req.name,
        avatar: req.avatar,
        theme: req.theme,
        language: req.language,
    };
    update.validate().map_err(|e| reject("Update profile", e))?;

    let account = state
        .db
        .update_account(user.id, &|account: &mut Account| {
            update.apply(account);
            Ok(())
        })
        .await
        .map_err(|e| reject("Update profile", e))?;
    Ok(Json(UserResponse::from(&account)))
}

/// PUT /users/change-password - Replace the password after checking the current one
#[utoipa::path(
    put,
    path = "/users/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password updated", body = MessageResponse),
        (status = 400, description = "Current password incorrect or new password too short")
    )
)]
pub async fn change_password_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, Rejection> {
    check_password_strength(&req.new_password)?;

    let account = state
        .db
        .get_account(user.id)
        .await
        .map_err(|e| reject("Change password", e))?;
    let credentials = state
        .db
        .get_credentials_by_email(&account.email)
        .await
        .map_err(|e| reject("Change password", e))?;

    if !password_matches(&req.current_password, &credentials.password_hash)? {
        warn!(account_id = %user.id, "Password change with wrong current password");
        return Err((
            StatusCode::BAD_REQUEST,
            "Current password incorrect".to_string(),
        ));
    }

    let password_hash = hash_password(&req.new_password)?;
    state
        .db
        .set_password_hash(user.id, &password_hash)
        .await
        .map_err(|e| reject("Change password", e))?;

    info!(account_id = %user.id, "Password changed");
    Ok(Json(MessageResponse::new("Password updated")))
}

/// GET /users/leaderboard - Top students by XP
#[utoipa::path(
    get,
    path = "/users/leaderboard",
    responses((status = 200, description = "Top ten students", body = [LeaderboardEntry]))
)]
pub async fn leaderboard_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<LeaderboardEntry>>, Rejection> {
    let accounts = state
        .ledger
        .leaderboard(LEADERBOARD_SIZE)
        .await
        .map_err(|e| reject("Load leaderboard", e))?;

    Ok(Json(
        accounts
            .into_iter()
            .map(|a| LeaderboardEntry {
                xp: a.xp(),
                level: a.level().to_string(),
                streak: a.streak,
                name: a.name,
                avatar: a.avatar,
            })
            .collect(),
    ))
}

/// GET /users/dashboard - Profile plus the most recent quiz results
#[utoipa::path(
    get,
    path = "/users/dashboard",
    responses((status = 200, description = "Dashboard data", body = DashboardResponse))
)]
pub async fn dashboard_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<DashboardResponse>, Rejection> {
    let account = state
        .db
        .get_account(user.id)
        .await
        .map_err(|e| reject("Load dashboard", e))?;
    let results = state
        .db
        .list_quiz_results(user.id, DASHBOARD_RECENT_RESULTS)
        .await
        .map_err(|e| reject("Load dashboard", e))?;

    Ok(Json(DashboardResponse {
        user: UserResponse::from(&account),
        recent_quiz_results: results.iter().map(QuizResultResponse::from).collect(),
    }))
}

/// POST /users/claim-spin - Claim the once-per-day spin reward
#[utoipa::path(
    post,
    path = "/users/claim-spin",
    responses(
        (status = 200, description = "Reward credited", body = SpinResponse),
        (status = 400, description = "Already spun today")
    )
)]
pub async fn claim_spin_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<SpinResponse>, Rejection> {
    let outcome = state
        .ledger
        .claim_spin(user.id)
        .await
        .map_err(|e| reject("Claim spin", e))?;

    Ok(Json(SpinResponse {
        reward: outcome.reward,
        xp: outcome.account.xp(),
        level: outcome.account.level().to_string(),
        last_spin_date: outcome.account.last_spin_at,
    }))
}
