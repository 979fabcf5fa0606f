//! services/api/src/web/rest.rs
//!
//! The health check and the master definition for the OpenAPI specification.

use axum::Json;
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

use crate::web::{admin, auth, chat, goals, quiz, sessions, users};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        auth::register_handler,
        auth::login_handler,
        auth::logout_handler,
        auth::me_handler,
        users::profile_handler,
        users::update_profile_handler,
        users::change_password_handler,
        users::leaderboard_handler,
        users::dashboard_handler,
        users::claim_spin_handler,
        quiz::get_questions_handler,
        quiz::submit_quiz_handler,
        quiz::history_handler,
        quiz::result_handler,
        quiz::create_question_handler,
        quiz::delete_question_handler,
        goals::list_goals_handler,
        goals::create_goal_handler,
        goals::update_goal_handler,
        goals::complete_goal_handler,
        goals::delete_goal_handler,
        sessions::list_sessions_handler,
        sessions::start_session_handler,
        sessions::end_session_handler,
        chat::chat_handler,
        admin::list_users_handler,
        admin::delete_user_handler,
        admin::set_role_handler,
        admin::set_xp_handler,
        admin::list_questions_handler,
        admin::update_question_handler,
        admin::analytics_handler,
    ),
    components(
        schemas(
            HealthResponse,
            auth::RegisterRequest, auth::LoginRequest, auth::AuthResponse,
            users::UserResponse, users::UpdateProfileRequest, users::ChangePasswordRequest,
            users::MessageResponse, users::LeaderboardEntry, users::DashboardResponse,
            users::SpinResponse,
            quiz::PublicQuestion, quiz::QuestionResponse, quiz::QuestionRequest,
            quiz::AnswerRequest, quiz::SubmitQuizRequest, quiz::GradedAnswerResponse,
            quiz::QuizResultResponse, quiz::SubmitQuizResponse,
            goals::CreateGoalRequest, goals::UpdateGoalRequest, goals::GoalResponse,
            goals::CompleteGoalResponse,
            sessions::StartSessionRequest, sessions::EndSessionRequest,
            sessions::SessionResponse, sessions::EndSessionResponse,
            chat::ChatRequest, chat::ChatResponse,
            admin::SetRoleRequest, admin::SetXpRequest, admin::SubjectCount,
            admin::AnalyticsResponse,
        )
    ),
    tags(
        (name = "EduGEN API", description = "Learning platform with XP, levels, streaks, referrals and a daily spin.")
    )
)]
pub struct ApiDoc;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// GET /health - Liveness check
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
