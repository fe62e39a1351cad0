use axum::Router;

use crate::state::SharedState;

pub mod auth;
pub mod connections;
pub mod docs;
pub mod feud;
pub mod games;
pub mod health;
pub mod jeopardy;
pub mod oauth;
pub mod sessions;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_v1 = auth::router()
        .merge(jeopardy::router())
        .merge(feud::router())
        .merge(connections::router())
        .merge(sessions::router())
        .merge(games::router());

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(health::router())
        .merge(oauth::router())
        .merge(docs::router())
        .with_state(state)
}
