//! HTTP server and routes.

mod gateway;
mod handlers;
mod state;

pub use gateway::CurrentUser;
pub use state::AppState;

use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Create the application router.
///
/// Write routes take a [`CurrentUser`], so they are rejected before the
/// handler runs when the bearer token is missing or invalid.
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/signup", post(handlers::signup))
        .route("/login", post(handlers::login))
        .route("/books", get(handlers::list_books).post(handlers::add_book))
        .route("/books/{id}", get(handlers::get_book))
        .route("/books/{id}/reviews", post(handlers::add_review))
        .route(
            "/reviews/{id}",
            put(handlers::update_review).delete(handlers::delete_review),
        )
        .route("/search", get(handlers::search_books));

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
