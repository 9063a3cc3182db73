use axum::{
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use chrono::{NaiveDate, Utc};
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use stayline_calendar::model::AvailabilityStatus;
use stayline_calendar::query::is_available;
use stayline_core::events::CalendarChangedEvent;
use uuid::Uuid;

use crate::auth::authenticate;
use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/rooms/{id}/calendar",
            post(generate_calendar).patch(update_calendar).get(room_calendar),
        )
        .route("/v1/rooms/{id}/calendar/seed", post(seed_calendar))
        .route("/v1/rooms/{id}/availability", get(check_availability))
        .route("/v1/rooms/{id}/calendar/stream", get(calendar_stream))
}

#[derive(Debug, Deserialize)]
struct GenerateCalendarPayload {
    start_date: NaiveDate,
    end_date: NaiveDate,
    status: AvailabilityStatus,
    price_override: Option<i64>,
}

#[derive(Debug, Serialize)]
struct CalendarWriteResponse {
    status: String,
}

/// Bulk generation: seeding a window or blocking a range for maintenance
async fn generate_calendar(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
    Path(room_id): Path<Uuid>,
    Json(payload): Json<GenerateCalendarPayload>,
) -> Result<Json<CalendarWriteResponse>, AppError> {
    let claims = authenticate(bearer.token(), &state.auth.secret)?;
    claims.require_staff()?;

    state
        .generator
        .generate(
            room_id,
            payload.start_date,
            payload.end_date,
            payload.status,
            payload.price_override,
        )
        .await?;

    let _ = state.sse_tx.send(CalendarChangedEvent {
        room_id,
        start_date: payload.start_date,
        end_date: payload.end_date,
        status: payload.status.as_str().to_string(),
        changed_at: Utc::now().timestamp(),
    });

    Ok(Json(CalendarWriteResponse {
        status: "GENERATED".to_string(),
    }))
}

/// Open a fresh room's availability window (three months by default)
async fn seed_calendar(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
    Path(room_id): Path<Uuid>,
) -> Result<Json<CalendarWriteResponse>, AppError> {
    let claims = authenticate(bearer.token(), &state.auth.secret)?;
    claims.require_staff()?;

    let today = Utc::now().date_naive();
    state
        .generator
        .seed_window(room_id, today, state.business_rules.seed_window_months)
        .await?;

    Ok(Json(CalendarWriteResponse {
        status: "SEEDED".to_string(),
    }))
}

#[derive(Debug, Deserialize)]
struct UpdateCalendarPayload {
    start_date: NaiveDate,
    /// Omitted for a single-day update
    end_date: Option<NaiveDate>,
    status: AvailabilityStatus,
    price_override: Option<i64>,
}

/// Single-day or range status update; both funnel through the generator
async fn update_calendar(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
    Path(room_id): Path<Uuid>,
    Json(payload): Json<UpdateCalendarPayload>,
) -> Result<Json<CalendarWriteResponse>, AppError> {
    let claims = authenticate(bearer.token(), &state.auth.secret)?;
    claims.require_staff()?;

    let end_date = payload.end_date.unwrap_or(payload.start_date);
    state
        .generator
        .generate(
            room_id,
            payload.start_date,
            end_date,
            payload.status,
            payload.price_override,
        )
        .await?;

    let _ = state.sse_tx.send(CalendarChangedEvent {
        room_id,
        start_date: payload.start_date,
        end_date,
        status: payload.status.as_str().to_string(),
        changed_at: Utc::now().timestamp(),
    });

    Ok(Json(CalendarWriteResponse {
        status: "UPDATED".to_string(),
    }))
}

#[derive(Debug, Deserialize)]
struct AvailabilityParams {
    check_in: NaiveDate,
    check_out: NaiveDate,
}

#[derive(Debug, Serialize)]
struct AvailabilityResponse {
    room_id: Uuid,
    check_in: NaiveDate,
    check_out: NaiveDate,
    is_available: bool,
}

async fn check_availability(
    State(state): State<AppState>,
    Path(room_id): Path<Uuid>,
    Query(params): Query<AvailabilityParams>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    if params.check_out <= params.check_in {
        return Err(AppError::ValidationError(
            "check_out must be after check_in".to_string(),
        ));
    }

    let free = is_available(
        state.calendar.as_ref(),
        room_id,
        params.check_in,
        params.check_out,
    )
    .await
    .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    Ok(Json(AvailabilityResponse {
        room_id,
        check_in: params.check_in,
        check_out: params.check_out,
        is_available: free,
    }))
}

async fn room_calendar(
    State(state): State<AppState>,
    Path(room_id): Path<Uuid>,
) -> Result<Json<Vec<stayline_calendar::model::RoomAvailabilityEntry>>, AppError> {
    let entries = state
        .calendar
        .entries_for_room(room_id)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    Ok(Json(entries))
}

/// Server-pushed invalidation: clients watching a room re-fetch the affected
/// range when an event for it arrives, instead of reloading everything.
async fn calendar_stream(
    State(state): State<AppState>,
    Path(room_id): Path<Uuid>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.sse_tx.subscribe();

    let stream = tokio_stream::wrappers::BroadcastStream::new(rx).filter_map(move |result| async move {
        match result {
            Ok(event) if event.room_id == room_id => {
                let data = serde_json::to_string(&event).ok()?;
                Some(Ok(Event::default().event("calendar_changed").data(data)))
            }
            _ => None,
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
