//! HTTP surface over the booking ledger.

mod error;
pub mod routes;

use axum::Router;
use axum::http::{Method, header};
use axum::routing::{delete, get, patch};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::ApiError;

use crate::ledger::BookingLedger;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub ledger: BookingLedger,
}

/// Build the `/api` router with CORS and request tracing.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::PATCH])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/api/test", get(routes::store_check))
        .route(
            "/api/events",
            get(routes::list_events).post(routes::create_event),
        )
        .route("/api/events/{id}", delete(routes::delete_event))
        .route(
            "/api/bookings",
            delete(routes::cancel_booking).post(routes::create_booking),
        )
        .route("/api/bookings/status", patch(routes::update_booking_status))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
