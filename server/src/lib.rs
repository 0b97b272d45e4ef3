//! Rooms of clients watching the same video in lock-step.
//!
//! One host per room drives playback; everybody else receives state updates.
//! All room state lives in a single [`registry::Registry`] behind one lock.

pub mod broadcast;
pub mod clock;
pub mod commands;
pub mod config;
pub mod connection;
pub mod error;
pub mod handler;
pub mod logger;
pub mod protocol;
pub mod registry;
pub mod room;
pub mod session;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use handler::{health_check, list_rooms, ws_endpoint, AppState};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_endpoint))
        .route("/rooms", get(list_rooms))
        .route("/healthz", get(health_check))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
