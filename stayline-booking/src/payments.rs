use crate::manager::BookingError;
use crate::models::{Booking, DepositStatus, PaymentStatus};
use crate::repository::BookingRepository;
use chrono::Utc;
use std::sync::Arc;
use stayline_core::payment::{PaymentEvent, PaymentKind, PaymentResult};
use tracing::warn;
use uuid::Uuid;

/// Folds external payment transactions into a booking's payment axis.
///
/// This component never touches `booking.status`; the lifecycle manager and
/// the sweeper read the payment axis to decide what is allowed next.
pub struct PaymentTracker {
    bookings: Arc<dyn BookingRepository>,
}

impl PaymentTracker {
    pub fn new(bookings: Arc<dyn BookingRepository>) -> Self {
        Self { bookings }
    }

    /// Apply one event to the payment axis. Pure with respect to storage.
    pub fn apply(booking: &mut Booking, event: &PaymentEvent) {
        match (event.kind, event.result) {
            (PaymentKind::Deposit, PaymentResult::Succeeded) => {
                // The event log is authoritative for the actual split
                if event.amount > 0 && event.amount <= booking.total_amount {
                    booking.set_deposit(event.amount);
                }
                booking.deposit_status = DepositStatus::Paid;
                booking.payment_status = if booking.remaining_amount > 0 {
                    PaymentStatus::PartiallyPaid
                } else {
                    PaymentStatus::Paid
                };
            }
            (PaymentKind::Remaining, PaymentResult::Succeeded)
            | (PaymentKind::FullPayment, PaymentResult::Succeeded) => {
                // Fully settled: the whole total is now secured
                booking.set_deposit(booking.total_amount);
                booking.deposit_status = DepositStatus::Paid;
                booking.payment_status = PaymentStatus::Paid;
            }
            (PaymentKind::Refund, PaymentResult::Succeeded) => {
                booking.payment_status = PaymentStatus::Refunded;
            }
            (PaymentKind::Refund, PaymentResult::Failed) => {
                // A failed refund leaves the paid state alone; the payment
                // system retries on its side
                warn!(
                    "Refund attempt failed for booking {}, leaving payment axis unchanged",
                    booking.id
                );
            }
            (_, PaymentResult::Failed) => {
                booking.payment_status = PaymentStatus::Failed;
            }
        }
        booking.updated_at = Utc::now();
        debug_assert_eq!(
            booking.deposit_amount + booking.remaining_amount,
            booking.total_amount
        );
    }

    /// Load, apply and persist; returns the updated booking.
    pub async fn record(&self, event: &PaymentEvent) -> Result<Booking, BookingError> {
        let mut booking = self.load(event.booking_id).await?;
        Self::apply(&mut booking, event);
        self.bookings
            .save_payment_axis(&booking)
            .await
            .map_err(|e| BookingError::Store(e.to_string()))?;
        Ok(booking)
    }

    async fn load(&self, id: Uuid) -> Result<Booking, BookingError> {
        self.bookings
            .get(id)
            .await
            .map_err(|e| BookingError::Store(e.to_string()))?
            .ok_or(BookingError::NotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BookingStatus, GuestContact};
    use chrono::NaiveDate;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn booking() -> Booking {
        Booking::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            d("2025-03-10"),
            d("2025-03-12"),
            2,
            GuestContact {
                full_name: "Hoang Van E".to_string(),
                email: "e@example.com".to_string(),
                phone: "+84 94 444 4444".to_string(),
            },
            2_000_000,
            600_000,
            "VND".to_string(),
        )
    }

    fn assert_invariant(b: &Booking) {
        assert_eq!(b.deposit_amount + b.remaining_amount, b.total_amount);
    }

    #[test]
    fn test_deposit_success_partially_pays() {
        let mut b = booking();
        let event = PaymentEvent::succeeded(b.id, PaymentKind::Deposit, 600_000, "VND");
        PaymentTracker::apply(&mut b, &event);

        assert_eq!(b.deposit_status, DepositStatus::Paid);
        assert_eq!(b.payment_status, PaymentStatus::PartiallyPaid);
        assert_eq!(b.remaining_amount, 1_400_000);
        assert_invariant(&b);
    }

    #[test]
    fn test_deposit_covering_total_is_fully_paid() {
        let mut b = booking();
        let event = PaymentEvent::succeeded(b.id, PaymentKind::Deposit, 2_000_000, "VND");
        PaymentTracker::apply(&mut b, &event);

        assert_eq!(b.deposit_status, DepositStatus::Paid);
        assert_eq!(b.payment_status, PaymentStatus::Paid);
        assert_eq!(b.remaining_amount, 0);
        assert_invariant(&b);
    }

    #[test]
    fn test_remaining_success_settles() {
        let mut b = booking();
        let id = b.id;
        PaymentTracker::apply(
            &mut b,
            &PaymentEvent::succeeded(id, PaymentKind::Deposit, 600_000, "VND"),
        );
        PaymentTracker::apply(
            &mut b,
            &PaymentEvent::succeeded(id, PaymentKind::Remaining, 1_400_000, "VND"),
        );

        assert_eq!(b.payment_status, PaymentStatus::Paid);
        assert_eq!(b.remaining_amount, 0);
        assert_invariant(&b);
    }

    #[test]
    fn test_full_payment_without_deposit() {
        let mut b = booking();
        let id = b.id;
        PaymentTracker::apply(
            &mut b,
            &PaymentEvent::succeeded(id, PaymentKind::FullPayment, 2_000_000, "VND"),
        );

        assert_eq!(b.payment_status, PaymentStatus::Paid);
        assert_eq!(b.deposit_status, DepositStatus::Paid);
        assert_eq!(b.remaining_amount, 0);
        assert_invariant(&b);
    }

    #[test]
    fn test_failure_marks_payment_axis_only() {
        let mut b = booking();
        let event = PaymentEvent::failed(b.id, PaymentKind::Deposit, 600_000, "VND");
        PaymentTracker::apply(&mut b, &event);

        assert_eq!(b.payment_status, PaymentStatus::Failed);
        assert_eq!(b.deposit_status, DepositStatus::Unpaid);
        // Lifecycle status untouched
        assert_eq!(b.status, BookingStatus::Pending);
        assert_invariant(&b);
    }

    #[test]
    fn test_refund_success_marks_refunded() {
        let mut b = booking();
        let id = b.id;
        PaymentTracker::apply(
            &mut b,
            &PaymentEvent::succeeded(id, PaymentKind::Deposit, 600_000, "VND"),
        );
        PaymentTracker::apply(
            &mut b,
            &PaymentEvent::succeeded(id, PaymentKind::Refund, 600_000, "VND"),
        );

        assert_eq!(b.payment_status, PaymentStatus::Refunded);
        assert_invariant(&b);
    }

    #[test]
    fn test_failed_refund_keeps_paid_state() {
        let mut b = booking();
        let id = b.id;
        PaymentTracker::apply(
            &mut b,
            &PaymentEvent::succeeded(id, PaymentKind::FullPayment, 2_000_000, "VND"),
        );
        PaymentTracker::apply(
            &mut b,
            &PaymentEvent::failed(id, PaymentKind::Refund, 2_000_000, "VND"),
        );

        assert_eq!(b.payment_status, PaymentStatus::Paid);
        assert_invariant(&b);
    }

    #[tokio::test]
    async fn test_record_persists_through_repository() {
        use crate::repository::MemoryBookingRepo;

        let repo = Arc::new(MemoryBookingRepo::new());
        let b = booking();
        repo.insert(&b).await.unwrap();

        let tracker = PaymentTracker::new(repo.clone());
        let event = PaymentEvent::succeeded(b.id, PaymentKind::Deposit, 600_000, "VND");
        let updated = tracker.record(&event).await.unwrap();
        assert_eq!(updated.payment_status, PaymentStatus::PartiallyPaid);

        let stored = repo.get(b.id).await.unwrap().unwrap();
        assert_eq!(stored.payment_status, PaymentStatus::PartiallyPaid);
        assert_eq!(stored.deposit_status, DepositStatus::Paid);
    }
}
