//! services/api/src/lib.rs
//!
//! The HTTP service around the `edugen_core` reward economy: configuration,
//! storage and chat adapters, and the axum web layer.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
