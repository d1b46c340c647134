pub mod cache;
pub mod config;
pub mod contact;
pub mod content;
pub mod error;
pub mod model;
pub mod open_source;
pub mod palette;
pub mod rate_limit;
pub mod routes;
pub mod shortener;
pub mod state;
pub mod store;
pub mod usage;
pub mod utils;

use axum::routing::{get, post};
use axum::Router;
use routes::{
    command_palette, create_link, get_link_statistics, get_open_source, health, increment_usage,
    list_tools, redirect, send_contact, top_tools,
};
use state::AppState;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/tools/shorten", post(create_link))
        .route("/api/tools/shorten/:code/stats", get(get_link_statistics))
        .route("/s/:code", get(redirect))
        .route("/api/contact", post(send_contact))
        .route("/api/tools/usage", post(increment_usage))
        .route("/api/tools", get(list_tools))
        .route("/api/tools/top", get(top_tools))
        .route("/api/open-source", get(get_open_source))
        .route("/api/palette", get(command_palette))
        .route("/api/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .with_state(state)
}
