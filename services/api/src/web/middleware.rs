//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use edugen_core::domain::Role;
use edugen_core::ports::PortError;
use std::sync::Arc;
use tracing::{error, warn};
use uuid::Uuid;

use crate::error::Rejection;
use crate::web::state::AppState;
use crate::web::token::extract_token;

/// The authenticated caller, inserted into request extensions by `require_auth`.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
}

fn unauthorized(message: &str) -> Rejection {
    (StatusCode::UNAUTHORIZED, message.to_string())
}

/// Middleware that validates the bearer token (or `token` cookie).
///
/// The account must still exist; a token for a deleted account is rejected.
/// If valid, inserts an `AuthUser` into request extensions for handlers to use.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, Rejection> {
    // 1. Extract the token
    let token = extract_token(req.headers()).ok_or_else(|| unauthorized("Not authorized, no token"))?;

    // 2. Verify signature and expiry
    let claims = state
        .tokens
        .verify(&token, state.ledger.now())
        .map_err(|_| unauthorized("Not authorized, token failed"))?;

    // 3. Resolve the account
    let account = state.db.get_account(claims.sub).await.map_err(|e| match e {
        PortError::NotFound(_) => {
            warn!(account_id = %claims.sub, "Token presented for a missing account");
            unauthorized("Not authorized, account not found")
        }
        other => {
            error!("Failed to load account for token: {:?}", other);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Authentication failed".to_string(),
            )
        }
    })?;

    // 4. Insert the caller into request extensions
    req.extensions_mut().insert(AuthUser {
        id: account.id,
        role: account.role,
    });

    // 5. Continue to the handler
    Ok(next.run(req).await)
}

/// Layered inside `require_auth`; rejects non-admin callers with 403.
pub async fn require_admin(req: Request, next: Next) -> Result<Response, Rejection> {
    match req.extensions().get::<AuthUser>() {
        Some(user) if user.role == Role::Admin => Ok(next.run(req).await),
        Some(user) => {
            warn!(account_id = %user.id, "Non-admin caller on an admin route");
            Err((StatusCode::FORBIDDEN, "Admin access required".to_string()))
        }
        None => Err(unauthorized("Not authorized")),
    }
}
