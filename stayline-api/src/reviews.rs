use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use stayline_booking::models::Review;
use uuid::Uuid;

use crate::auth::authenticate;
use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings/{id}/review-eligibility", get(review_eligibility))
        .route("/v1/bookings/{id}/reviews", post(create_review))
}

#[derive(Debug, Serialize)]
struct EligibilityResponse {
    booking_id: Uuid,
    reviewable: bool,
}

async fn review_eligibility(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<EligibilityResponse>, AppError> {
    let claims = authenticate(bearer.token(), &state.auth.secret)?;

    let booking = state.manager.get(booking_id).await?;
    if !claims.is_staff() && booking.user_id != claims.user_id()? {
        return Err(AppError::AuthorizationError(
            "Booking does not belong to you".to_string(),
        ));
    }

    let reviewable = state
        .reviews
        .check_eligibility(booking_id, Utc::now())
        .await?;
    Ok(Json(EligibilityResponse {
        booking_id,
        reviewable,
    }))
}

#[derive(Debug, Deserialize)]
struct CreateReviewPayload {
    rating: u8,
    review_text: String,
}

async fn create_review(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
    Path(booking_id): Path<Uuid>,
    Json(payload): Json<CreateReviewPayload>,
) -> Result<Json<Review>, AppError> {
    let claims = authenticate(bearer.token(), &state.auth.secret)?;

    let booking = state.manager.get(booking_id).await?;
    if booking.user_id != claims.user_id()? {
        return Err(AppError::AuthorizationError(
            "Only the guest who stayed can review".to_string(),
        ));
    }

    let review = state
        .reviews
        .create(booking_id, payload.rating, payload.review_text, Utc::now())
        .await?;
    Ok(Json(review))
}
