use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Published on `booking.created` after a successful reserve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingCreatedEvent {
    pub booking_id: Uuid,
    pub reference: String,
    pub room_id: Uuid,
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
    pub total_amount: i64,
    pub deposit_amount: i64,
    pub created_at: i64,
}

/// Published on `booking.confirmed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConfirmedEvent {
    pub booking_id: Uuid,
    pub confirmed_at: i64,
}

/// Published on `booking.cancelled`; `refund_amount` is set only when the
/// cancellation fell inside the free-cancellation window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingCancelledEvent {
    pub booking_id: Uuid,
    pub room_id: Uuid,
    pub reason: String,
    pub refund_amount: Option<i64>,
    pub cancelled_at: i64,
}

/// Fanned out to calendar subscribers whenever a room's date range changes
/// state, so clients re-fetch the affected range instead of reloading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarChangedEvent {
    pub room_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: String,
    pub changed_at: i64,
}
