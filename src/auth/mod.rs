use crate::state::AppState;
use axum::{routing::get, Router};

mod dto;
pub mod extractors;
pub mod handlers;
pub mod notifier;
pub mod password;
pub mod repo;
pub mod repo_types;
pub mod services;
pub mod session;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(handlers::login_page).post(handlers::login))
        .route("/register", get(handlers::register_page).post(handlers::register))
        .route("/logout", get(handlers::logout))
        .route(
            "/forgot-password",
            get(handlers::forgot_password_page).post(handlers::forgot_password),
        )
        .route(
            "/reset-password/:token",
            get(handlers::reset_password_page).post(handlers::reset_password),
        )
        .route("/profile", get(handlers::profile))
}

/// JSON routes mounted under `/api`.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/forgot-password", axum::routing::post(handlers::forgot_password))
        .route("/me", get(handlers::me))
}
