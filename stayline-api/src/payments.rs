use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use stayline_core::payment::{PaymentEvent, PaymentKind, PaymentResult};
use tracing::info;
use uuid::Uuid;

use crate::auth::authenticate;
use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/bookings/{id}/payments", post(record_payment))
}

/// Payment result delivered by the external payment system
#[derive(Debug, Deserialize)]
struct PaymentEventPayload {
    kind: PaymentKind,
    result: PaymentResult,
    amount: i64,
    currency: String,
}

#[derive(Debug, Serialize)]
struct PaymentRecordedResponse {
    booking_id: Uuid,
    payment_status: String,
    deposit_status: String,
    remaining_amount: i64,
}

async fn record_payment(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
    Path(booking_id): Path<Uuid>,
    Json(payload): Json<PaymentEventPayload>,
) -> Result<Json<PaymentRecordedResponse>, AppError> {
    let claims = authenticate(bearer.token(), &state.auth.secret)?;
    // Payment results come in via trusted integrations only
    claims.require_staff()?;

    if payload.amount <= 0 {
        return Err(AppError::ValidationError(
            "Payment amount must be positive".to_string(),
        ));
    }

    let event = PaymentEvent {
        id: Uuid::new_v4(),
        booking_id,
        kind: payload.kind,
        result: payload.result,
        amount: payload.amount,
        currency: payload.currency,
        occurred_at: Utc::now(),
    };

    let booking = state.tracker.record(&event).await?;

    info!(
        "Payment event recorded for {}: {:?}/{:?}",
        booking.reference, payload.kind, payload.result
    );

    Ok(Json(PaymentRecordedResponse {
        booking_id: booking.id,
        payment_status: booking.payment_status.as_str().to_string(),
        deposit_status: booking.deposit_status.as_str().to_string(),
        remaining_amount: booking.remaining_amount,
    }))
}
