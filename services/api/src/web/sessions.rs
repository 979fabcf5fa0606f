//! services/api/src/web/sessions.rs
//!
//! Timed study sessions. Ending one credits study hours and XP.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use edugen_core::domain::{NewSession, SessionKind, StudySession};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{reject, Rejection};
use crate::web::middleware::AuthUser;
use crate::web::state::AppState;
use crate::web::users::UserResponse;

pub const SESSION_HISTORY_SIZE: usize = 20;
pub const DEFAULT_SESSION_SUBJECT: &str = "General";

#[derive(Debug, Deserialize, ToSchema)]
pub struct StartSessionRequest {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Planned length in minutes.
    pub duration: u32,
    pub subject: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EndSessionRequest {
    pub xp_earned: Option<u64>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: String,
    pub duration: u32,
    pub subject: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub completed: bool,
    pub xp_earned: u64,
}

impl From<StudySession> for SessionResponse {
    fn from(s: StudySession) -> Self {
        Self {
            id: s.id,
            kind: s.kind.as_str().to_string(),
            duration: s.duration_minutes,
            subject: s.subject,
            started_at: s.started_at,
            ended_at: s.ended_at,
            completed: s.completed,
            xp_earned: s.xp_earned,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EndSessionResponse {
    pub session: SessionResponse,
    pub user: UserResponse,
}

/// GET /sessions - The caller's most recent sessions
#[utoipa::path(
    get,
    path = "/sessions",
    responses((status = 200, description = "Newest sessions first", body = [SessionResponse]))
)]
pub async fn list_sessions_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<SessionResponse>>, Rejection> {
    let sessions = state
        .db
        .list_sessions(user.id, SESSION_HISTORY_SIZE)
        .await
        .map_err(|e| reject("Load sessions", e))?;
    Ok(Json(sessions.into_iter().map(SessionResponse::from).collect()))
}

/// POST /sessions/start - Start a study session
#[utoipa::path(
    post,
    path = "/sessions/start",
    request_body = StartSessionRequest,
    responses(
        (status = 201, description = "Session started", body = SessionResponse),
        (status = 400, description = "Zero duration or unknown type")
    )
)]
pub async fn start_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<StartSessionRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), Rejection> {
    if req.duration == 0 {
        return Err((
            StatusCode::BAD_REQUEST,
            "Session duration must be at least one minute".to_string(),
        ));
    }
    let kind = match req.kind.as_deref() {
        Some(raw) => raw
            .parse::<SessionKind>()
            .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?,
        None => SessionKind::Pomodoro,
    };
    let subject = req
        .subject
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_SESSION_SUBJECT.to_string());

    let session = state
        .db
        .create_session(
            user.id,
            NewSession {
                kind,
                duration_minutes: req.duration,
                subject,
            },
            state.ledger.now(),
        )
        .await
        .map_err(|e| reject("Start session", e))?;
    Ok((StatusCode::CREATED, Json(SessionResponse::from(session))))
}

/// PUT /sessions/{id}/end - End a session and collect its XP
#[utoipa::path(
    put,
    path = "/sessions/{id}/end",
    params(("id" = Uuid, Path, description = "Session id")),
    request_body = EndSessionRequest,
    responses(
        (status = 200, description = "Session ended", body = EndSessionResponse),
        (status = 404, description = "No such session for this account"),
        (status = 409, description = "Session already ended")
    )
)]
pub async fn end_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(session_id): Path<Uuid>,
    body: Option<Json<EndSessionRequest>>,
) -> Result<Json<EndSessionResponse>, Rejection> {
    let xp_earned = body.and_then(|Json(req)| req.xp_earned);

    let (session, account) = state
        .ledger
        .end_session(user.id, session_id, xp_earned)
        .await
        .map_err(|e| reject("End session", e))?;

    Ok(Json(EndSessionResponse {
        session: SessionResponse::from(session),
        user: UserResponse::from(&account),
    }))
}
