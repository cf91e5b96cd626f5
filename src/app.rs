use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/test", get(handlers::health))
        .route("/api/auth/register", post(handlers::register))
        .route("/api/auth/login", post(handlers::login))
        .route("/api/auth/logout", post(handlers::logout))
        .route("/api/auth/verify", get(handlers::verify))
        .route("/api/auth/profile", put(handlers::update_profile))
        .route("/api/users/:user_id", get(handlers::get_user))
        .route(
            "/api/readings",
            post(handlers::create_reading)
                .put(handlers::update_reading)
                .delete(handlers::delete_reading),
        )
        .route("/api/readings/:user_id", get(handlers::list_readings))
        .route("/api/readings/:user_id/stats", get(handlers::reading_stats))
        .route("/api/readings/:user_id/trends", get(handlers::reading_trends))
        .with_state(state)
}
