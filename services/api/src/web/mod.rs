pub mod admin;
pub mod auth;
pub mod chat;
pub mod goals;
pub mod middleware;
pub mod quiz;
pub mod rest;
pub mod routes;
pub mod sessions;
pub mod state;
pub mod token;
pub mod users;

pub use middleware::{require_admin, require_auth, AuthUser};
pub use rest::ApiDoc;
pub use routes::build_router;
pub use state::AppState;
