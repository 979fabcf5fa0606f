//! services/api/src/web/admin.rs
//!
//! Administrator endpoints. Every route here sits behind `require_admin`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use edugen_core::domain::{Account, Role};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{reject, Rejection};
use crate::web::middleware::AuthUser;
use crate::web::quiz::{QuestionRequest, QuestionResponse};
use crate::web::state::AppState;
use crate::web::users::{MessageResponse, UserResponse};

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetRoleRequest {
    pub role: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetXpRequest {
    pub xp: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubjectCount {
    pub subject: String,
    pub count: u64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsResponse {
    pub total_users: u64,
    pub total_quizzes: u64,
    /// Mean accuracy in percent, one decimal place.
    pub avg_accuracy: f64,
    pub by_subject: Vec<SubjectCount>,
}

/// GET /admin/users - Every account, newest first
#[utoipa::path(
    get,
    path = "/admin/users",
    responses(
        (status = 200, description = "All accounts", body = [UserResponse]),
        (status = 403, description = "Admin access required")
    )
)]
pub async fn list_users_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<UserResponse>>, Rejection> {
    let accounts = state
        .db
        .list_accounts()
        .await
        .map_err(|e| reject("List users", e))?;
    Ok(Json(accounts.iter().map(UserResponse::from).collect()))
}

/// DELETE /admin/users/{id} - Hard-delete an account and its records
#[utoipa::path(
    delete,
    path = "/admin/users/{id}",
    params(("id" = Uuid, Path, description = "Account id")),
    responses(
        (status = 200, description = "Account deleted", body = MessageResponse),
        (status = 400, description = "Administrators cannot delete themselves"),
        (status = 404, description = "No such account")
    )
)]
pub async fn delete_user_handler(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    Path(account_id): Path<Uuid>,
) -> Result<Json<MessageResponse>, Rejection> {
    if account_id == admin.id {
        return Err((
            StatusCode::BAD_REQUEST,
            "Administrators cannot delete their own account".to_string(),
        ));
    }
    state
        .db
        .delete_account(account_id)
        .await
        .map_err(|e| reject("Delete user", e))?;

    warn!(account_id = %account_id, admin_id = %admin.id, "Account deleted by administrator");
    Ok(Json(MessageResponse::new("User deleted")))
}

/// PUT /admin/users/{id}/role - Grant or revoke admin rights
#[utoipa::path(
    put,
    path = "/admin/users/{id}/role",
    params(("id" = Uuid, Path, description = "Account id")),
    request_body = SetRoleRequest,
    responses(
        (status = 200, description = "Role updated", body = UserResponse),
        (status = 400, description = "Unknown role"),
        (status = 404, description = "No such account")
    )
)]
pub async fn set_role_handler(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    Path(account_id): Path<Uuid>,
    Json(req): Json<SetRoleRequest>,
) -> Result<Json<UserResponse>, Rejection> {
    let role: Role = req
        .role
        .trim()
        .parse()
        .map_err(|e| reject("Set role", e))?;

    let account = state
        .db
        .update_account(account_id, &|account: &mut Account| {
            account.role = role;
            Ok(())
        })
        .await
        .map_err(|e| reject("Set role", e))?;

    info!(account_id = %account_id, admin_id = %admin.id, role = role.as_str(), "Role changed");
    Ok(Json(UserResponse::from(&account)))
}

/// PUT /admin/users/{id}/xp - Set an account's XP to an absolute value
#[utoipa::path(
    put,
    path = "/admin/users/{id}/xp",
    params(("id" = Uuid, Path, description = "Account id")),
    request_body = SetXpRequest,
    responses(
        (status = 200, description = "XP set and level recomputed", body = UserResponse),
        (status = 404, description = "No such account")
    )
)]
pub async fn set_xp_handler(
    State(state): State<Arc<AppState>>,
    Path(account_id): Path<Uuid>,
    Json(req): Json<SetXpRequest>,
) -> Result<Json<UserResponse>, Rejection> {
    let account = state
        .ledger
        .set_xp(account_id, req.xp)
        .await
        .map_err(|e| reject("Set XP", e))?;
    Ok(Json(UserResponse::from(&account)))
}

/// GET /admin/questions - The whole question bank, answers included
#[utoipa::path(
    get,
    path = "/admin/questions",
    responses((status = 200, description = "All questions", body = [QuestionResponse]))
)]
pub async fn list_questions_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<QuestionResponse>>, Rejection> {
    let questions = state
        .db
        .list_questions()
        .await
        .map_err(|e| reject("List questions", e))?;
    Ok(Json(questions.into_iter().map(QuestionResponse::from).collect()))
}

/// PUT /admin/questions/{id} - Replace a question
#[utoipa::path(
    put,
    path = "/admin/questions/{id}",
    params(("id" = Uuid, Path, description = "Question id")),
    request_body = QuestionRequest,
    responses(
        (status = 200, description = "Question updated", body = QuestionResponse),
        (status = 400, description = "Invalid question"),
        (status = 404, description = "No such question")
    )
)]
pub async fn update_question_handler(
    State(state): State<Arc<AppState>>,
    Path(question_id): Path<Uuid>,
    Json(req): Json<QuestionRequest>,
) -> Result<Json<QuestionResponse>, Rejection> {
    let question = req
        .into_new_question()
        .map_err(|e| reject("Update question", e))?;
    let question = state
        .db
        .update_question(question_id, question)
        .await
        .map_err(|e| reject("Update question", e))?;
    Ok(Json(QuestionResponse::from(question)))
}

/// GET /admin/analytics - Platform-wide totals
#[utoipa::path(
    get,
    path = "/admin/analytics",
    responses((status = 200, description = "Totals", body = AnalyticsResponse))
)]
pub async fn analytics_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AnalyticsResponse>, Rejection> {
    let analytics = state
        .db
        .analytics()
        .await
        .map_err(|e| reject("Load analytics", e))?;

    Ok(Json(AnalyticsResponse {
        total_users: analytics.total_accounts,
        total_quizzes: analytics.total_quizzes,
        avg_accuracy: (analytics.average_accuracy * 10.0).round() / 10.0,
        by_subject: analytics
            .quizzes_by_subject
            .into_iter()
            .map(|(subject, count)| SubjectCount { subject, count })
            .collect(),
    }))
}
