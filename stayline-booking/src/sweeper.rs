use crate::manager::BookingPolicy;
use crate::models::{Booking, BookingStatus, PaymentStatus};
use crate::repository::BookingRepository;
use chrono::{DateTime, Days, Duration, Utc};
use stayline_calendar::store::CalendarStore;
use std::sync::Arc;
use tracing::{error, info};

/// Outcome of one sweep pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub completed: usize,
    pub expired: usize,
    pub failed: usize,
}

/// Advances time-dependent transitions without user action: confirmed stays
/// whose checkout passed become completed, unpaid pending bookings past their
/// deadline expire and give their dates back.
///
/// Every write is a guarded conditional update, so a pass is re-entrant and
/// safe to run alongside live cancellations and payments; a failure on one
/// booking is logged and never aborts the pass.
pub struct Sweeper {
    calendar: Arc<dyn CalendarStore>,
    bookings: Arc<dyn BookingRepository>,
    policy: BookingPolicy,
}

impl Sweeper {
    pub fn new(
        calendar: Arc<dyn CalendarStore>,
        bookings: Arc<dyn BookingRepository>,
        policy: BookingPolicy,
    ) -> Self {
        Self {
            calendar,
            bookings,
            policy,
        }
    }

    pub async fn run_once(&self, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport::default();
        self.complete_pass(now, &mut report).await;
        self.expire_pass(now, &mut report).await;
        info!(
            "Sweep done: {} completed, {} expired, {} failed",
            report.completed, report.expired, report.failed
        );
        report
    }

    /// Confirmed bookings with checkout strictly before today
    async fn complete_pass(&self, now: DateTime<Utc>, report: &mut SweepReport) {
        let confirmed = match self.bookings.list_by_status(BookingStatus::Confirmed).await {
            Ok(rows) => rows,
            Err(e) => {
                error!("Completion pass could not list bookings: {}", e);
                report.failed += 1;
                return;
            }
        };

        let today = now.date_naive();
        for booking in confirmed {
            if booking.check_out_date >= today {
                continue;
            }
            match self
                .bookings
                .update_status_guarded(booking.id, BookingStatus::Confirmed, BookingStatus::Completed)
                .await
            {
                Ok(true) => report.completed += 1,
                Ok(false) => {} // raced with cancel/another sweep, their write won
                Err(e) => {
                    error!("Failed to complete booking {}: {}", booking.id, e);
                    report.failed += 1;
                }
            }
        }
    }

    /// Pending bookings past the payment deadline and not fully paid
    async fn expire_pass(&self, now: DateTime<Utc>, report: &mut SweepReport) {
        let pending = match self.bookings.list_by_status(BookingStatus::Pending).await {
            Ok(rows) => rows,
            Err(e) => {
                error!("Expiry pass could not list bookings: {}", e);
                report.failed += 1;
                return;
            }
        };

        for booking in pending {
            if booking.payment_status == PaymentStatus::Paid {
                continue;
            }
            if !self.past_payment_deadline(&booking, now) {
                continue;
            }
            match self.bookings.expire_guarded(booking.id).await {
                Ok(true) => {
                    report.expired += 1;
                    self.release_hold(&booking).await;
                }
                Ok(false) => {}
                Err(e) => {
                    error!("Failed to expire booking {}: {}", booking.id, e);
                    report.failed += 1;
                }
            }
        }
    }

    /// Deadline is the earlier of: the check-in day having fully passed, or
    /// payment_deadline_hours after creation.
    fn past_payment_deadline(&self, booking: &Booking, now: DateTime<Utc>) -> bool {
        let check_in_passed = now.date_naive() > booking.check_in_date;
        let grace_elapsed =
            now > booking.created_at + Duration::hours(self.policy.payment_deadline_hours);
        check_in_passed || grace_elapsed
    }

    async fn release_hold(&self, booking: &Booking) {
        let Some(last_night) = booking.check_out_date.checked_sub_days(Days::new(1)) else {
            error!("Booking {} has an unreleasable checkout date", booking.id);
            return;
        };
        if let Err(e) = self
            .calendar
            .release_range(booking.room_id, booking.check_in_date, last_night)
            .await
        {
            error!("Failed to release hold for expired booking {}: {}", booking.id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GuestContact;
    use crate::repository::MemoryBookingRepo;
    use chrono::NaiveDate;
    use stayline_calendar::query::is_available;
    use stayline_calendar::store::MemoryCalendar;
    use uuid::Uuid;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn ts(s: &str) -> DateTime<Utc> {
        format!("{}T03:00:00Z", s).parse().unwrap()
    }

    fn booking(check_in: &str, check_out: &str) -> Booking {
        Booking::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            d(check_in),
            d(check_out),
            2,
            GuestContact {
                full_name: "Dang Van G".to_string(),
                email: "g@example.com".to_string(),
                phone: "+84 96 666 6666".to_string(),
            },
            2_000_000,
            600_000,
            "VND".to_string(),
        )
    }

    fn sweeper(
        calendar: Arc<MemoryCalendar>,
        repo: Arc<MemoryBookingRepo>,
    ) -> Sweeper {
        Sweeper::new(calendar, repo, BookingPolicy::default())
    }

    #[tokio::test]
    async fn test_confirmed_past_checkout_completes() {
        let calendar = Arc::new(MemoryCalendar::new());
        let repo = Arc::new(MemoryBookingRepo::new());
        let mut b = booking("2025-03-10", "2025-03-12");
        b.status = BookingStatus::Confirmed;
        repo.insert(&b).await.unwrap();

        // Day after checkout
        let report = sweeper(calendar, repo.clone()).run_once(ts("2025-03-13")).await;
        assert_eq!(report.completed, 1);
        assert_eq!(
            repo.get(b.id).await.unwrap().unwrap().status,
            BookingStatus::Completed
        );
    }

    #[tokio::test]
    async fn test_checkout_today_is_not_completed_yet() {
        let calendar = Arc::new(MemoryCalendar::new());
        let repo = Arc::new(MemoryBookingRepo::new());
        let mut b = booking("2025-03-10", "2025-03-12");
        b.status = BookingStatus::Confirmed;
        repo.insert(&b).await.unwrap();

        let report = sweeper(calendar, repo.clone()).run_once(ts("2025-03-12")).await;
        assert_eq!(report.completed, 0);
    }

    #[tokio::test]
    async fn test_unpaid_pending_past_check_in_expires_and_releases() {
        let calendar = Arc::new(MemoryCalendar::new());
        let repo = Arc::new(MemoryBookingRepo::new());
        let b = booking("2025-03-10", "2025-03-12");
        calendar
            .set_range(
                b.room_id,
                d("2025-03-10"),
                d("2025-03-11"),
                stayline_calendar::model::AvailabilityStatus::Booked,
                None,
            )
            .await
            .unwrap();
        repo.insert(&b).await.unwrap();

        let report = sweeper(calendar.clone(), repo.clone()).run_once(ts("2025-03-11")).await;
        assert_eq!(report.expired, 1);

        let row = repo.get(b.id).await.unwrap().unwrap();
        assert_eq!(row.status, BookingStatus::Expired);
        assert_eq!(row.payment_status, PaymentStatus::Expired);

        // The dates are free again
        let free = is_available(calendar.as_ref(), b.room_id, d("2025-03-10"), d("2025-03-12"))
            .await
            .unwrap();
        assert!(free);
    }

    #[tokio::test]
    async fn test_paid_pending_does_not_expire() {
        let calendar = Arc::new(MemoryCalendar::new());
        let repo = Arc::new(MemoryBookingRepo::new());
        let mut b = booking("2025-03-10", "2025-03-12");
        b.payment_status = PaymentStatus::Paid;
        repo.insert(&b).await.unwrap();

        let report = sweeper(calendar, repo.clone()).run_once(ts("2025-03-11")).await;
        assert_eq!(report.expired, 0);
        assert_eq!(
            repo.get(b.id).await.unwrap().unwrap().status,
            BookingStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_grace_period_expiry_before_check_in() {
        let calendar = Arc::new(MemoryCalendar::new());
        let repo = Arc::new(MemoryBookingRepo::new());
        // Far-future stay, created now; the 48h grace is what expires it
        let b = booking("2025-06-01", "2025-06-05");
        repo.insert(&b).await.unwrap();

        let sweeper = sweeper(calendar, repo.clone());

        // One day in: still within grace
        let soon = Utc::now() + Duration::hours(24);
        assert_eq!(sweeper.run_once(soon).await.expired, 0);

        // Past the grace period
        let later = Utc::now() + Duration::hours(49);
        assert_eq!(sweeper.run_once(later).await.expired, 1);
    }

    #[tokio::test]
    async fn test_sweep_is_reentrant() {
        let calendar = Arc::new(MemoryCalendar::new());
        let repo = Arc::new(MemoryBookingRepo::new());
        let mut b = booking("2025-03-10", "2025-03-12");
        b.status = BookingStatus::Confirmed;
        repo.insert(&b).await.unwrap();

        let sweeper = sweeper(calendar, repo.clone());
        let first = sweeper.run_once(ts("2025-03-13")).await;
        let second = sweeper.run_once(ts("2025-03-13")).await;
        assert_eq!(first.completed, 1);
        assert_eq!(second.completed, 0);
        assert_eq!(second.failed, 0);
    }

    #[tokio::test]
    async fn test_sweep_does_not_clobber_concurrent_cancel() {
        let calendar = Arc::new(MemoryCalendar::new());
        let repo = Arc::new(MemoryBookingRepo::new());
        let mut b = booking("2025-03-10", "2025-03-12");
        b.status = BookingStatus::Confirmed;
        repo.insert(&b).await.unwrap();

        // Cancellation lands between the sweeper's read and its write
        repo.cancel_guarded(b.id, BookingStatus::Confirmed, "guest cancelled", Utc::now())
            .await
            .unwrap();

        let report = sweeper(calendar, repo.clone()).run_once(ts("2025-03-13")).await;
        assert_eq!(report.completed, 0);
        assert_eq!(report.failed, 0);

        // Exactly one terminal state won
        assert_eq!(
            repo.get(b.id).await.unwrap().unwrap().status,
            BookingStatus::Canceled
        );
    }
}
