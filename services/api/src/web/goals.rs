//! services/api/src/web/goals.rs
//!
//! Daily and weekly goals. Completing one pays its XP reward exactly once.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use edugen_core::domain::{
    Goal, GoalKind, GoalUpdate, NewGoal, DEFAULT_GOAL_ICON, DEFAULT_GOAL_XP,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{reject, Rejection};
use crate::web::middleware::AuthUser;
use crate::web::state::AppState;
use crate::web::users::{MessageResponse, UserResponse};

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateGoalRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub xp_reward: Option<u64>,
    pub due_date: Option<DateTime<Utc>>,
    pub icon: Option<String>,
}

/// Completion state and reward cannot be edited.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGoalRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub icon: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GoalResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub xp_reward: u64,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub icon: String,
    pub created_at: DateTime<Utc>,
}

impl From<Goal> for GoalResponse {
    fn from(g: Goal) -> Self {
        Self {
            id: g.id,
            title: g.title,
            description: g.description,
            kind: g.kind.as_str().to_string(),
            xp_reward: g.xp_reward,
            completed: g.completed,
            completed_at: g.completed_at,
            due_date: g.due_date,
            icon: g.icon,
            created_at: g.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompleteGoalResponse {
    pub goal: GoalResponse,
    pub xp_earned: u64,
    pub user: UserResponse,
}

fn parse_kind(raw: Option<&str>) -> Result<Option<GoalKind>, Rejection> {
    raw.map(|k| k.parse::<GoalKind>())
        .transpose()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /goals - The caller's goals, newest first
#[utoipa::path(
    get,
    path = "/goals",
    responses((status = 200, description = "Goals", body = [GoalResponse]))
)]
pub async fn list_goals_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<GoalResponse>>, Rejection> {
    let goals = state
        .db
        .list_goals(user.id)
        .await
        .map_err(|e| reject("Load goals", e))?;
    Ok(Json(goals.into_iter().map(GoalResponse::from).collect()))
}

/// POST /goals - Create a goal
#[utoipa::path(
    post,
    path = "/goals",
    request_body = CreateGoalRequest,
    responses(
        (status = 201, description = "Goal created", body = GoalResponse),
        (status = 400, description = "Missing title or unknown type")
    )
)]
pub async fn create_goal_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<CreateGoalRequest>,
) -> Result<(StatusCode, Json<GoalResponse>), Rejection> {
    let title = req.title.trim().to_string();
    if title.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Goal title is required".to_string()));
    }
    let goal = NewGoal {
        title,
        description: req.description,
        kind: parse_kind(req.kind.as_deref())?.unwrap_or(GoalKind::Daily),
        xp_reward: req.xp_reward.unwrap_or(DEFAULT_GOAL_XP),
        due_date: req.due_date,
        icon: req.icon.unwrap_or_else(|| DEFAULT_GOAL_ICON.to_string()),
    };

    let goal = state
        .db
        .create_goal(user.id, goal, state.ledger.now())
        .await
        .map_err(|e| reject("Create goal", e))?;
    Ok((StatusCode::CREATED, Json(GoalResponse::from(goal))))
}

/// PUT /goals/{id} - Edit a goal's descriptive fields
#[utoipa::path(
    put,
    path = "/goals/{id}",
    params(("id" = Uuid, Path, description = "Goal id")),
    request_body = UpdateGoalRequest,
    responses(
        (status = 200, description = "Goal updated", body = GoalResponse),
        (status = 404, description = "No such goal for this account")
    )
)]
pub async fn update_goal_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(goal_id): Path<Uuid>,
    Json(req): Json<UpdateGoalRequest>,
) -> Result<Json<GoalResponse>, Rejection> {
    if req.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err((StatusCode::BAD_REQUEST, "Goal title must not be empty".to_string()));
    }
    let update = GoalUpdate {
        title: req.title.map(|t| t.trim().to_string()),
        description: req.description,
        kind: parse_kind(req.kind.as_deref())?,
        due_date: req.due_date,
        icon: req.icon,
    };

    let goal = state
        .db
        .update_goal(user.id, goal_id, update)
        .await
        .map_err(|e| reject("Update goal", e))?;
    Ok(Json(GoalResponse::from(goal)))
}

/// PUT /goals/{id}/complete - Complete a goal and collect its reward
#[utoipa::path(
    put,
    path = "/goals/{id}/complete",
    params(("id" = Uuid, Path, description = "Goal id")),
    responses(
        (status = 200, description = "Goal completed", body = CompleteGoalResponse),
        (status = 404, description = "No such goal for this account"),
        (status = 409, description = "Goal already completed")
    )
)]
pub async fn complete_goal_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(goal_id): Path<Uuid>,
) -> Result<Json<CompleteGoalResponse>, Rejection> {
    let (goal, account) = state
        .ledger
        .complete_goal(user.id, goal_id)
        .await
        .map_err(|e| reject("Complete goal", e))?;

    Ok(Json(CompleteGoalResponse {
        xp_earned: goal.xp_reward,
        goal: GoalResponse::from(goal),
        user: UserResponse::from(&account),
    }))
}

/// DELETE /goals/{id} - Delete a goal
#[utoipa::path(
    delete,
    path = "/goals/{id}",
    params(("id" = Uuid, Path, description = "Goal id")),
    responses(
        (status = 200, description = "Goal deleted", body = MessageResponse),
        (status = 404, description = "No such goal for this account")
    )
)]
pub async fn delete_goal_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(goal_id): Path<Uuid>,
) -> Result<Json<MessageResponse>, Rejection> {
    state
        .db
        .delete_goal(user.id, goal_id)
        .await
        .map_err(|e| reject("Delete goal", e))?;
    Ok(Json(MessageResponse::new("Goal deleted")))
}
