//! services/api/src/web/routes.rs
//!
//! Assembles the HTTP router. CORS and Swagger UI are added by the binary.

use axum::{
    handler::Handler,
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;

use crate::web::middleware::{require_admin, require_auth};
use crate::web::state::AppState;
use crate::web::{admin, auth, chat, goals, quiz, rest, sessions, users};

pub fn build_router(state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(rest::health_handler))
        .route("/auth/register", post(auth::register_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler));

    let admin_only = || axum_middleware::from_fn(require_admin);

    // Admin routes: require_admin runs after require_auth has identified the caller
    let admin_routes = Router::new()
        .route("/admin/users", get(admin::list_users_handler))
        .route("/admin/users/{id}", delete(admin::delete_user_handler))
        .route("/admin/users/{id}/role", put(admin::set_role_handler))
        .route("/admin/users/{id}/xp", put(admin::set_xp_handler))
        .route("/admin/questions", get(admin::list_questions_handler))
        .route("/admin/questions/{id}", put(admin::update_question_handler))
        .route("/admin/analytics", get(admin::analytics_handler))
        .route_layer(admin_only());

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me_handler))
        .route("/users/profile", get(users::profile_handler))
        .route("/users/update", put(users::update_profile_handler))
        .route("/users/change-password", put(users::change_password_handler))
        .route("/users/leaderboard", get(users::leaderboard_handler))
        .route("/users/dashboard", get(users::dashboard_handler))
        .route("/users/claim-spin", post(users::claim_spin_handler))
        .route(
            "/quiz/questions",
            get(quiz::get_questions_handler)
                .post(quiz::create_question_handler.layer(admin_only())),
        )
        .route(
            "/quiz/questions/{id}",
            delete(quiz::delete_question_handler.layer(admin_only())),
        )
        .route("/quiz/submit", post(quiz::submit_quiz_handler))
        .route("/quiz/history", get(quiz::history_handler))
        .route("/quiz/result/{id}", get(quiz::result_handler))
        .route(
            "/goals",
            get(goals::list_goals_handler).post(goals::create_goal_handler),
        )
        .route(
            "/goals/{id}",
            put(goals::update_goal_handler).delete(goals::delete_goal_handler),
        )
        .route("/goals/{id}/complete", put(goals::complete_goal_handler))
        .route("/sessions", get(sessions::list_sessions_handler))
        .route("/sessions/start", post(sessions::start_session_handler))
        .route("/sessions/{id}/end", put(sessions::end_session_handler))
        .route("/chat", post(chat::chat_handler))
        .merge(admin_routes)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
