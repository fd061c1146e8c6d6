pub mod auth;
pub mod forum;
pub mod home;
pub mod stats;
pub mod timer;

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// The full application router with request tracing.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(home::index))
        .merge(auth::router())
        .merge(timer::router())
        .merge(stats::router())
        .merge(forum::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
