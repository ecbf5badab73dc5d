//! Library borrowing server
//!
//! A REST JSON API recording the borrowing and returning of books in a
//! PostgreSQL ledger, enforcing availability, duplicate-borrow and
//! per-user borrow-limit rules.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
