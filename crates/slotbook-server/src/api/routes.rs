use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use tracing::error;

use super::AppState;
use super::error::ApiError;
use crate::ledger::{NewBooking, NewEvent, SlotClaim, StatusUpdate};
use crate::storage::{Booking, Event, EventWithParticipants};

type Payload<T> = Result<Json<T>, JsonRejection>;

/// `GET /api/test` — store liveness.
pub async fn store_check(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    match state.ledger.db().ping().await {
        Ok(time) => Ok(Json(json!({ "message": "Store is reachable", "time": time }))),
        Err(e) => {
            error!(error = %e, "Store liveness check failed");
            Err(ApiError::Internal("Store is unreachable"))
        }
    }
}

/// `GET /api/events`
pub async fn list_events(
    State(state): State<AppState>,
) -> Result<Json<Vec<EventWithParticipants>>, ApiError> {
    let events = state
        .ledger
        .list_events()
        .await
        .map_err(|e| ApiError::from_ledger(e, "Failed to list events"))?;
    Ok(Json(events))
}

/// `POST /api/events`
pub async fn create_event(
    State(state): State<AppState>,
    payload: Payload<NewEvent>,
) -> Result<(StatusCode, Json<Event>), ApiError> {
    let Json(req) = payload?;
    let event = state
        .ledger
        .create_event(req)
        .await
        .map_err(|e| ApiError::from_ledger(e, "Failed to create event"))?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// `DELETE /api/events/{id}`
pub async fn delete_event(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = id?;
    state
        .ledger
        .delete_event(id)
        .await
        .map_err(|e| ApiError::from_ledger(e, "Failed to delete event"))?;
    Ok(Json(json!({ "message": "Event and its bookings deleted" })))
}

/// `POST /api/bookings`
pub async fn create_booking(
    State(state): State<AppState>,
    payload: Payload<NewBooking>,
) -> Result<(StatusCode, Json<Booking>), ApiError> {
    let Json(req) = payload?;
    let booking = state
        .ledger
        .create_booking(req)
        .await
        .map_err(|e| ApiError::from_ledger(e, "Failed to book slot"))?;
    Ok((StatusCode::CREATED, Json(booking)))
}

/// `DELETE /api/bookings`
pub async fn cancel_booking(
    State(state): State<AppState>,
    payload: Payload<SlotClaim>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(claim) = payload?;
    state
        .ledger
        .cancel_booking(claim)
        .await
        .map_err(|e| ApiError::from_ledger(e, "Failed to cancel booking"))?;
    Ok(Json(json!({ "message": "Booking cancelled" })))
}

/// `PATCH /api/bookings/status`
pub async fn update_booking_status(
    State(state): State<AppState>,
    payload: Payload<StatusUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(update) = payload?;
    let updated = state
        .ledger
        .set_booking_status(update)
        .await
        .map_err(|e| ApiError::from_ledger(e, "Failed to update booking status"))?;
    Ok(Json(json!({ "message": "Status updated", "updated": updated })))
}
