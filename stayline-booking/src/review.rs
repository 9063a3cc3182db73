use crate::models::{Booking, BookingStatus, PaymentStatus, Review};
use crate::repository::{BookingRepository, ReviewRepository};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error("Booking {0} already has a review")]
    Duplicate(Uuid),

    #[error("Booking {0} is not eligible for review: {1}")]
    NotEligible(Uuid, String),

    #[error("Rating must be between 1 and 5, got {0}")]
    InvalidRating(u8),

    #[error("Booking not found: {0}")]
    NotFound(Uuid),

    #[error("Storage error: {0}")]
    Store(String),
}

/// Pure review-eligibility predicate.
///
/// Reviewable iff the stay completed, was fully paid, has no review yet and
/// checkout was at most `window_days` ago.
pub fn is_reviewable(
    booking: &Booking,
    has_review: bool,
    now: DateTime<Utc>,
    window_days: i64,
) -> bool {
    booking.status == BookingStatus::Completed
        && booking.payment_status == PaymentStatus::Paid
        && !has_review
        && (now.date_naive() - booking.check_out_date).num_days() <= window_days
}

/// Guarded review creation on top of the pure gate.
pub struct ReviewService {
    bookings: Arc<dyn BookingRepository>,
    reviews: Arc<dyn ReviewRepository>,
    window_days: i64,
}

impl ReviewService {
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        reviews: Arc<dyn ReviewRepository>,
        window_days: i64,
    ) -> Self {
        Self {
            bookings,
            reviews,
            window_days,
        }
    }

    pub async fn check_eligibility(
        &self,
        booking_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool, ReviewError> {
        let booking = self.load(booking_id).await?;
        let has_review = self
            .reviews
            .exists_for_booking(booking_id)
            .await
            .map_err(|e| ReviewError::Store(e.to_string()))?;
        Ok(is_reviewable(&booking, has_review, now, self.window_days))
    }

    /// Create a review if and only if the gate passes.
    ///
    /// The final uniqueness check is the store's atomic try_insert, so two
    /// concurrent submissions that both pass the predicate still end with
    /// one review and one Duplicate error.
    pub async fn create(
        &self,
        booking_id: Uuid,
        rating: u8,
        review_text: String,
        now: DateTime<Utc>,
    ) -> Result<Review, ReviewError> {
        if !(1..=5).contains(&rating) {
            return Err(ReviewError::InvalidRating(rating));
        }

        let booking = self.load(booking_id).await?;
        if booking.status != BookingStatus::Completed {
            return Err(ReviewError::NotEligible(
                booking_id,
                format!("booking is {}", booking.status.as_str()),
            ));
        }
        if booking.payment_status != PaymentStatus::Paid {
            return Err(ReviewError::NotEligible(
                booking_id,
                format!("payment is {}", booking.payment_status.as_str()),
            ));
        }
        if (now.date_naive() - booking.check_out_date).num_days() > self.window_days {
            return Err(ReviewError::NotEligible(
                booking_id,
                "review window has closed".to_string(),
            ));
        }

        let review = Review::new(
            booking_id,
            booking.hotel_id,
            booking.user_id,
            rating,
            review_text,
        );
        let inserted = self
            .reviews
            .try_insert(&review)
            .await
            .map_err(|e| ReviewError::Store(e.to_string()))?;
        if !inserted {
            return Err(ReviewError::Duplicate(booking_id));
        }
        Ok(review)
    }

    async fn load(&self, id: Uuid) -> Result<Booking, ReviewError> {
        self.bookings
            .get(id)
            .await
            .map_err(|e| ReviewError::Store(e.to_string()))?
            .ok_or(ReviewError::NotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GuestContact;
    use crate::repository::{MemoryBookingRepo, MemoryReviewRepo};
    use chrono::NaiveDate;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn ts(s: &str) -> DateTime<Utc> {
        format!("{}T09:00:00Z", s).parse().unwrap()
    }

    fn completed_booking() -> Booking {
        let mut b = Booking::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            d("2025-03-10"),
            d("2025-03-12"),
            2,
            GuestContact {
                full_name: "Vo Thi F".to_string(),
                email: "f@example.com".to_string(),
                phone: "+84 95 555 5555".to_string(),
            },
            2_000_000,
            600_000,
            "VND".to_string(),
        );
        b.status = BookingStatus::Completed;
        b.payment_status = PaymentStatus::Paid;
        b
    }

    #[test]
    fn test_gate_window_boundaries() {
        // Checkout on the 12th, 30-day window
        let booking = completed_booking();
        assert!(is_reviewable(&booking, false, ts("2025-04-10"), 30)); // T+29
        assert!(is_reviewable(&booking, false, ts("2025-04-11"), 30)); // T+30
        assert!(!is_reviewable(&booking, false, ts("2025-04-12"), 30)); // T+31
    }

    #[test]
    fn test_gate_requires_all_conditions() {
        let now = ts("2025-03-20");
        let booking = completed_booking();

        assert!(is_reviewable(&booking, false, now, 30));
        assert!(!is_reviewable(&booking, true, now, 30));

        let mut unpaid = completed_booking();
        unpaid.payment_status = PaymentStatus::PartiallyPaid;
        assert!(!is_reviewable(&unpaid, false, now, 30));

        let mut not_done = completed_booking();
        not_done.status = BookingStatus::Confirmed;
        assert!(!is_reviewable(&not_done, false, now, 30));
    }

    #[tokio::test]
    async fn test_second_review_is_duplicate() {
        let bookings = Arc::new(MemoryBookingRepo::new());
        let reviews = Arc::new(MemoryReviewRepo::new());
        let booking = completed_booking();
        bookings.insert(&booking).await.unwrap();

        let service = ReviewService::new(bookings, reviews, 30);
        let now = ts("2025-03-20");

        service
            .create(booking.id, 5, "Spotless room".to_string(), now)
            .await
            .unwrap();
        let second = service
            .create(booking.id, 4, "Trying again".to_string(), now)
            .await;
        assert!(matches!(second, Err(ReviewError::Duplicate(_))));
    }

    #[tokio::test]
    async fn test_create_rejects_ineligible_booking() {
        let bookings = Arc::new(MemoryBookingRepo::new());
        let reviews = Arc::new(MemoryReviewRepo::new());
        let mut booking = completed_booking();
        booking.status = BookingStatus::Confirmed;
        bookings.insert(&booking).await.unwrap();

        let service = ReviewService::new(bookings, reviews, 30);
        let result = service
            .create(booking.id, 5, "Too early".to_string(), ts("2025-03-11"))
            .await;
        assert!(matches!(result, Err(ReviewError::NotEligible(_, _))));
    }

    #[tokio::test]
    async fn test_create_rejects_bad_rating() {
        let bookings = Arc::new(MemoryBookingRepo::new());
        let reviews = Arc::new(MemoryReviewRepo::new());
        let service = ReviewService::new(bookings, reviews, 30);

        let result = service
            .create(Uuid::new_v4(), 6, "Off the scale".to_string(), ts("2025-03-20"))
            .await;
        assert!(matches!(result, Err(ReviewError::InvalidRating(6))));
    }
}
