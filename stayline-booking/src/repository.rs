use crate::models::{Booking, BookingStatus, PaymentStatus, Review};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Optional filters for booking listings
#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    pub user_id: Option<Uuid>,
    pub hotel_id: Option<Uuid>,
    pub status: Option<BookingStatus>,
}

/// Repository trait for booking persistence.
///
/// The guarded operations are conditional writes: they apply only when the
/// row is still in the expected source state and report whether they did.
/// The sweeper and cancellation both rely on this so a race leaves exactly
/// one winner and turns the loser into a no-op.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn insert(
        &self,
        booking: &Booking,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    async fn get(
        &self,
        id: Uuid,
    ) -> Result<Option<Booking>, Box<dyn std::error::Error + Send + Sync>>;

    /// Full-row save of payment-axis fields (amounts and payment/deposit
    /// status); lifecycle status is not written by this call.
    async fn save_payment_axis(
        &self,
        booking: &Booking,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// `expected -> next` only if the row still holds `expected`
    async fn update_status_guarded(
        &self,
        id: Uuid,
        expected: BookingStatus,
        next: BookingStatus,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;

    /// Guarded cancellation: status, reason and cancelled_at in one write
    async fn cancel_guarded(
        &self,
        id: Uuid,
        expected: BookingStatus,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;

    /// Guarded expiry: Pending -> Expired, marking the payment axis expired
    /// if it was still pending
    async fn expire_guarded(
        &self,
        id: Uuid,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;

    async fn list(
        &self,
        filter: &BookingFilter,
    ) -> Result<Vec<Booking>, Box<dyn std::error::Error + Send + Sync>>;

    async fn list_by_status(
        &self,
        status: BookingStatus,
    ) -> Result<Vec<Booking>, Box<dyn std::error::Error + Send + Sync>> {
        self.list(&BookingFilter {
            status: Some(status),
            ..Default::default()
        })
        .await
    }
}

/// Repository trait for reviews; insertion is the uniqueness gate.
#[async_trait]
pub trait ReviewRepository: Send + Sync {
    async fn exists_for_booking(
        &self,
        booking_id: Uuid,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;

    /// Insert unless a review for the booking already exists. Returns false
    /// on the duplicate, atomically, so two concurrent submissions cannot
    /// both land.
    async fn try_insert(
        &self,
        review: &Review,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;
}

/// In-memory booking repository, rows keyed by id under one mutex
pub struct MemoryBookingRepo {
    bookings: Mutex<HashMap<Uuid, Booking>>,
}

impl MemoryBookingRepo {
    pub fn new() -> Self {
        Self {
            bookings: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryBookingRepo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BookingRepository for MemoryBookingRepo {
    async fn insert(
        &self,
        booking: &Booking,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut bookings = self.bookings.lock().await;
        bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn get(
        &self,
        id: Uuid,
    ) -> Result<Option<Booking>, Box<dyn std::error::Error + Send + Sync>> {
        let bookings = self.bookings.lock().await;
        Ok(bookings.get(&id).cloned())
    }

    async fn save_payment_axis(
        &self,
        booking: &Booking,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut bookings = self.bookings.lock().await;
        if let Some(row) = bookings.get_mut(&booking.id) {
            row.deposit_amount = booking.deposit_amount;
            row.remaining_amount = booking.remaining_amount;
            row.payment_status = booking.payment_status;
            row.deposit_status = booking.deposit_status;
            row.updated_at = booking.updated_at;
        }
        Ok(())
    }

    async fn update_status_guarded(
        &self,
        id: Uuid,
        expected: BookingStatus,
        next: BookingStatus,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let mut bookings = self.bookings.lock().await;
        match bookings.get_mut(&id) {
            Some(row) if row.status == expected => {
                row.set_status(next);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn cancel_guarded(
        &self,
        id: Uuid,
        expected: BookingStatus,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let mut bookings = self.bookings.lock().await;
        match bookings.get_mut(&id) {
            Some(row) if row.status == expected => {
                row.set_status(BookingStatus::Canceled);
                row.cancellation_reason = Some(reason.to_string());
                row.cancelled_at = Some(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn expire_guarded(
        &self,
        id: Uuid,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let mut bookings = self.bookings.lock().await;
        match bookings.get_mut(&id) {
            Some(row) if row.status == BookingStatus::Pending => {
                row.set_status(BookingStatus::Expired);
                if row.payment_status == PaymentStatus::Pending {
                    row.payment_status = PaymentStatus::Expired;
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list(
        &self,
        filter: &BookingFilter,
    ) -> Result<Vec<Booking>, Box<dyn std::error::Error + Send + Sync>> {
        let bookings = self.bookings.lock().await;
        let mut rows: Vec<Booking> = bookings
            .values()
            .filter(|b| filter.user_id.map_or(true, |u| b.user_id == u))
            .filter(|b| filter.hotel_id.map_or(true, |h| b.hotel_id == h))
            .filter(|b| filter.status.map_or(true, |s| b.status == s))
            .cloned()
            .collect();
        rows.sort_by_key(|b| b.created_at);
        Ok(rows)
    }
}

/// In-memory review store keyed by booking id, so the uniqueness check and
/// the insert happen under one lock.
pub struct MemoryReviewRepo {
    reviews: Mutex<HashMap<Uuid, Review>>,
}

impl MemoryReviewRepo {
    pub fn new() -> Self {
        Self {
            reviews: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryReviewRepo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReviewRepository for MemoryReviewRepo {
    async fn exists_for_booking(
        &self,
        booking_id: Uuid,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let reviews = self.reviews.lock().await;
        Ok(reviews.contains_key(&booking_id))
    }

    async fn try_insert(
        &self,
        review: &Review,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let mut reviews = self.reviews.lock().await;
        if reviews.contains_key(&review.booking_id) {
            return Ok(false);
        }
        reviews.insert(review.booking_id, review.clone());
        Ok(true)
    }
}
