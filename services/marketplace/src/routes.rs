use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::handlers;
use crate::services::AppState;

pub fn create_routes() -> Router<AppState> {
    Router::new()
        // Health checks
        .route("/health", get(handlers::health_check))
        .route("/health/db", get(handlers::db_health_check))

        // Authentication routes
        .route("/auth/signup", post(handlers::signup))
        .route("/auth/login", post(handlers::login))
        .route("/auth/logout", post(handlers::logout))
        .route("/auth/me", get(handlers::me))

        // Mentor routes
        .route("/mentors", get(handlers::list_mentors))
        .route(
            "/mentors/profile",
            get(handlers::get_mentor_profile).put(handlers::update_mentor_profile),
        )
        .route("/mentors/:id", get(handlers::get_mentor))

        // Learner routes
        .route(
            "/learners/profile",
            get(handlers::get_learner_profile).put(handlers::update_learner_profile),
        )

        // Session routes
        .route(
            "/sessions",
            post(handlers::book_session).get(handlers::list_sessions),
        )
        .route(
            "/sessions/:id",
            get(handlers::get_session)
                .patch(handlers::update_session)
                .delete(handlers::delete_session),
        )

        // Review routes
        .route(
            "/reviews",
            post(handlers::create_review).get(handlers::list_reviews),
        )
        .route("/reviews/:id", delete(handlers::delete_review))
}
