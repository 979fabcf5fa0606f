//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use crate::web::token::TokenSigner;
use edugen_core::ports::{ChatService, DatabaseService};
use edugen_core::RewardLedger;
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub config: Arc<Config>,
    /// Every XP-moving operation goes through the ledger, never `db` directly.
    pub ledger: Arc<RewardLedger>,
    pub tokens: Arc<TokenSigner>,
    pub chat: Arc<dyn ChatService>,
}
