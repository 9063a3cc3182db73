use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use chrono::{Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use stayline_booking::models::{Booking, BookingStatus, CreateBookingRequest};
use stayline_booking::repository::BookingFilter;
use stayline_booking::sweeper::SweepReport;
use stayline_core::events::{
    BookingCancelledEvent, BookingConfirmedEvent, BookingCreatedEvent, CalendarChangedEvent,
};
use stayline_store::events::topics;
use tracing::info;
use uuid::Uuid;

use crate::auth::authenticate;
use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", post(create_booking).get(list_bookings))
        .route("/v1/bookings/sweep", post(sweep_now))
        .route("/v1/bookings/{id}", get(get_booking))
        .route("/v1/bookings/{id}/confirm", post(confirm_booking))
        .route("/v1/bookings/{id}/cancel", post(cancel_booking))
}

#[derive(Debug, Deserialize)]
struct CreateBookingPayload {
    hotel_id: Uuid,
    room_id: Uuid,
    check_in_date: NaiveDate,
    check_out_date: NaiveDate,
    number_of_guests: u32,
    full_name: String,
    email: String,
    phone: String,
    nightly_rate: i64,
}

#[derive(Debug, Serialize)]
struct BookingResponse {
    booking_id: Uuid,
    reference: String,
    status: String,
    total_amount: i64,
    deposit_amount: i64,
    remaining_amount: i64,
}

async fn create_booking(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
    Json(payload): Json<CreateBookingPayload>,
) -> Result<Json<BookingResponse>, AppError> {
    let claims = authenticate(bearer.token(), &state.auth.secret)?;
    let user_id = claims.user_id()?;

    // Cross-process reserve lock; the in-process per-room mutex inside the
    // manager covers this instance, the Redis lock covers its siblings
    let room_key = payload.room_id.to_string();
    let locked = state
        .redis
        .acquire_room_lock(&room_key, &claims.sub, state.business_rules.reserve_lock_seconds)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    if !locked {
        return Err(AppError::ConflictError(
            "Room is being reserved by another request, retry shortly".to_string(),
        ));
    }

    let request = CreateBookingRequest {
        user_id,
        hotel_id: payload.hotel_id,
        room_id: payload.room_id,
        check_in_date: payload.check_in_date,
        check_out_date: payload.check_out_date,
        number_of_guests: payload.number_of_guests,
        full_name: payload.full_name,
        email: payload.email,
        phone: payload.phone,
        nightly_rate: payload.nightly_rate,
    };

    let now = Utc::now();
    let result = state.manager.reserve(request, now).await;
    let _ = state.redis.release_room_lock(&room_key).await;
    let booking = result?;

    let event = BookingCreatedEvent {
        booking_id: booking.id,
        reference: booking.reference.clone(),
        room_id: booking.room_id,
        check_in_date: booking.check_in_date,
        check_out_date: booking.check_out_date,
        total_amount: booking.total_amount,
        deposit_amount: booking.deposit_amount,
        created_at: now.timestamp(),
    };
    let _ = state
        .kafka
        .publish_event(topics::BOOKING_CREATED, &booking.id.to_string(), &event)
        .await;

    notify_calendar_change(&state, &booking, "BOOKED", now.timestamp());

    info!("Booking created: {}", booking.reference);

    Ok(Json(BookingResponse {
        booking_id: booking.id,
        reference: booking.reference.clone(),
        status: booking.status.as_str().to_string(),
        total_amount: booking.total_amount,
        deposit_amount: booking.deposit_amount,
        remaining_amount: booking.remaining_amount,
    }))
}

async fn confirm_booking(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    let claims = authenticate(bearer.token(), &state.auth.secret)?;
    claims.require_staff()?;

    let booking = state.manager.confirm(id).await?;

    let event = BookingConfirmedEvent {
        booking_id: booking.id,
        confirmed_at: Utc::now().timestamp(),
    };
    let _ = state
        .kafka
        .publish_event(topics::BOOKING_CONFIRMED, &booking.id.to_string(), &event)
        .await;

    Ok(Json(booking))
}

#[derive(Debug, Deserialize)]
struct CancelPayload {
    reason: String,
}

async fn cancel_booking(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CancelPayload>,
) -> Result<Json<Booking>, AppError> {
    let claims = authenticate(bearer.token(), &state.auth.secret)?;

    let existing = state.manager.get(id).await?;
    if !claims.is_staff() && existing.user_id != claims.user_id()? {
        return Err(AppError::AuthorizationError(
            "Booking does not belong to you".to_string(),
        ));
    }

    let now = Utc::now();
    let (booking, decision) = state.manager.cancel(id, &payload.reason, now).await?;

    let event = BookingCancelledEvent {
        booking_id: booking.id,
        room_id: booking.room_id,
        reason: payload.reason,
        refund_amount: decision.refund.as_ref().map(|r| r.amount),
        cancelled_at: now.timestamp(),
    };
    let _ = state
        .kafka
        .publish_event(topics::BOOKING_CANCELLED, &booking.id.to_string(), &event)
        .await;

    // Past the cutoff the cancellation still goes through, there is simply
    // no refund instruction to forward
    if let Some(refund) = decision.refund {
        let _ = state
            .kafka
            .publish_event(
                topics::BOOKING_REFUND_REQUESTED,
                &booking.id.to_string(),
                &refund,
            )
            .await;
    }

    notify_calendar_change(&state, &booking, "AVAILABLE", now.timestamp());

    Ok(Json(booking))
}

async fn get_booking(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    let claims = authenticate(bearer.token(), &state.auth.secret)?;
    let booking = state.manager.get(id).await?;

    if !claims.is_staff() && booking.user_id != claims.user_id()? {
        return Err(AppError::AuthorizationError(
            "Booking does not belong to you".to_string(),
        ));
    }
    Ok(Json(booking))
}

#[derive(Debug, Deserialize)]
struct ListParams {
    user_id: Option<Uuid>,
    hotel_id: Option<Uuid>,
    status: Option<String>,
}

async fn list_bookings(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let claims = authenticate(bearer.token(), &state.auth.secret)?;

    let status = match params.status.as_deref() {
        Some(s) => Some(
            BookingStatus::parse(s)
                .ok_or_else(|| AppError::ValidationError(format!("Unknown status '{}'", s)))?,
        ),
        None => None,
    };

    // Guests only ever see their own bookings
    let user_id = if claims.is_staff() {
        params.user_id
    } else {
        Some(claims.user_id()?)
    };

    let filter = BookingFilter {
        user_id,
        hotel_id: params.hotel_id,
        status,
    };
    let bookings = state
        .bookings
        .list(&filter)
        .await
        .map_err(|e| AppError::Anyhow(anyhow::anyhow!(e)))?;
    Ok(Json(bookings))
}

/// Manual trigger for the completion/expiry pass
async fn sweep_now(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<SweepReportResponse>, AppError> {
    let claims = authenticate(bearer.token(), &state.auth.secret)?;
    claims.require_staff()?;

    let report = state.sweeper.run_once(Utc::now()).await;
    Ok(Json(SweepReportResponse::from(report)))
}

#[derive(Debug, Serialize)]
struct SweepReportResponse {
    completed: usize,
    expired: usize,
    failed: usize,
}

impl From<SweepReport> for SweepReportResponse {
    fn from(r: SweepReport) -> Self {
        Self {
            completed: r.completed,
            expired: r.expired,
            failed: r.failed,
        }
    }
}

fn notify_calendar_change(state: &AppState, booking: &Booking, status: &str, at: i64) {
    let Some(last_night) = booking.check_out_date.checked_sub_days(Days::new(1)) else {
        return;
    };
    let _ = state.sse_tx.send(CalendarChangedEvent {
        room_id: booking.room_id,
        start_date: booking.check_in_date,
        end_date: last_night,
        status: status.to_string(),
        changed_at: at,
    });
}
