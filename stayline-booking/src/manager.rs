use crate::cancellation::{CancellationDecision, CancellationEvaluator};
use crate::models::{Booking, BookingStatus, CreateBookingRequest, GuestContact};
use crate::repository::BookingRepository;
use chrono::{DateTime, Days, Utc};
use stayline_calendar::model::AvailabilityStatus;
use stayline_calendar::query::{is_available, validate_stay};
use stayline_calendar::store::{CalendarError, CalendarStore};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};
use uuid::Uuid;

/// Time-windowed business rules the engine enforces
#[derive(Debug, Clone)]
pub struct BookingPolicy {
    /// Free-cancellation cutoff: refundable until check-in minus this many days
    pub free_cancellation_days: u64,
    /// Reviews accepted until this many days after checkout
    pub review_window_days: i64,
    /// Unpaid pending bookings expire this long after creation
    pub payment_deadline_hours: i64,
    /// Share of the total taken as deposit, in percent
    pub deposit_percent: i64,
    pub currency: String,
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self {
            free_cancellation_days: 2,
            review_window_days: 30,
            payment_deadline_hours: 48,
            deposit_percent: 30,
            currency: "VND".to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Room {0} is not available for the requested dates")]
    RoomUnavailable(Uuid),

    #[error("Invalid date range: {0}")]
    InvalidDateRange(String),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Booking not found: {0}")]
    NotFound(Uuid),

    #[error("Storage error: {0}")]
    Store(String),
}

/// Booking lifecycle manager.
///
/// Reservation is the one check-then-act hazard in the system, so
/// `reserve` holds a per-room async mutex across the availability check,
/// the calendar write and the booking insert: of two concurrent overlapping
/// requests exactly one succeeds, the other sees RoomUnavailable and no
/// partial state.
pub struct BookingManager {
    calendar: Arc<dyn CalendarStore>,
    bookings: Arc<dyn BookingRepository>,
    policy: BookingPolicy,
    room_locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl BookingManager {
    pub fn new(
        calendar: Arc<dyn CalendarStore>,
        bookings: Arc<dyn BookingRepository>,
        policy: BookingPolicy,
    ) -> Self {
        Self {
            calendar,
            bookings,
            policy,
            room_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> &BookingPolicy {
        &self.policy
    }

    async fn room_lock(&self, room_id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.room_locks.lock().await;
        locks.entry(room_id).or_default().clone()
    }

    /// Atomically check availability, mark the stay booked and create the
    /// booking row.
    pub async fn reserve(
        &self,
        req: CreateBookingRequest,
        now: DateTime<Utc>,
    ) -> Result<Booking, BookingError> {
        validate_stay(req.check_in_date, req.check_out_date, now.date_naive())
            .map_err(|e| BookingError::InvalidDateRange(e.to_string()))?;

        let lock = self.room_lock(req.room_id).await;
        let _guard = lock.lock().await;

        let free = is_available(
            self.calendar.as_ref(),
            req.room_id,
            req.check_in_date,
            req.check_out_date,
        )
        .await
        .map_err(|e| BookingError::Store(e.to_string()))?;
        if !free {
            return Err(BookingError::RoomUnavailable(req.room_id));
        }

        let total_amount = self.quote(&req).await?;
        let deposit_amount = total_amount * self.policy.deposit_percent / 100;

        let booking = Booking::new(
            req.user_id,
            req.hotel_id,
            req.room_id,
            req.check_in_date,
            req.check_out_date,
            req.number_of_guests,
            GuestContact {
                full_name: req.full_name,
                email: req.email,
                phone: req.phone,
            },
            total_amount,
            deposit_amount,
            self.policy.currency.clone(),
        );

        // Last occupied night is the day before checkout
        let last_night = req
            .check_out_date
            .checked_sub_days(Days::new(1))
            .ok_or_else(|| BookingError::InvalidDateRange("bad check-out date".to_string()))?;

        // A conflict here means another process won the race between our
        // availability check and this write (the store's exclusion guard)
        self.calendar
            .set_range(
                req.room_id,
                req.check_in_date,
                last_night,
                AvailabilityStatus::Booked,
                None,
            )
            .await
            .map_err(|e| match e.downcast::<CalendarError>() {
                Ok(cal) if matches!(*cal, CalendarError::Conflict(_)) => {
                    BookingError::RoomUnavailable(req.room_id)
                }
                Ok(cal) => BookingError::Store(cal.to_string()),
                Err(other) => BookingError::Store(other.to_string()),
            })?;

        if let Err(e) = self.bookings.insert(&booking).await {
            // Roll the hold back so the loser observes no partial effects
            if let Err(release_err) = self
                .calendar
                .release_range(req.room_id, req.check_in_date, last_night)
                .await
            {
                error!(
                    "Failed to release hold for room {} after insert error: {}",
                    req.room_id, release_err
                );
            }
            return Err(BookingError::Store(e.to_string()));
        }

        info!(
            "Reserved booking {} room {} [{} .. {})",
            booking.reference, booking.room_id, booking.check_in_date, booking.check_out_date
        );
        Ok(booking)
    }

    /// Pending -> Confirmed, triggered by an authorized actor, independent of
    /// payment state.
    pub async fn confirm(&self, id: Uuid) -> Result<Booking, BookingError> {
        let booking = self.load(id).await?;
        if !booking.status.can_transition_to(BookingStatus::Confirmed) {
            return Err(BookingError::InvalidTransition {
                from: booking.status.as_str().to_string(),
                to: BookingStatus::Confirmed.as_str().to_string(),
            });
        }

        let applied = self
            .bookings
            .update_status_guarded(id, BookingStatus::Pending, BookingStatus::Confirmed)
            .await
            .map_err(|e| BookingError::Store(e.to_string()))?;
        if !applied {
            // Raced with another transition; report against the fresh state
            let current = self.load(id).await?;
            return Err(BookingError::InvalidTransition {
                from: current.status.as_str().to_string(),
                to: BookingStatus::Confirmed.as_str().to_string(),
            });
        }

        self.load(id).await
    }

    /// Cancel a pending or confirmed booking.
    ///
    /// Always releases the reserved dates; the refund instruction in the
    /// decision is present only inside the free-cancellation window.
    pub async fn cancel(
        &self,
        id: Uuid,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<(Booking, CancellationDecision), BookingError> {
        let booking = self.load(id).await?;
        let decision = CancellationEvaluator::decide(&booking, now, &self.policy)?;

        let applied = self
            .bookings
            .cancel_guarded(id, booking.status, reason, now)
            .await
            .map_err(|e| BookingError::Store(e.to_string()))?;
        if !applied {
            let current = self.load(id).await?;
            return Err(BookingError::InvalidTransition {
                from: current.status.as_str().to_string(),
                to: BookingStatus::Canceled.as_str().to_string(),
            });
        }

        // Release is final once committed; refund outcome does not affect it
        let last_night = booking
            .check_out_date
            .checked_sub_days(Days::new(1))
            .ok_or_else(|| BookingError::InvalidDateRange("bad check-out date".to_string()))?;
        self.calendar
            .release_range(booking.room_id, booking.check_in_date, last_night)
            .await
            .map_err(|e| BookingError::Store(e.to_string()))?;

        info!(
            "Cancelled booking {} (refund: {})",
            booking.reference,
            decision.refund.is_some()
        );

        let updated = self.load(id).await?;
        Ok((updated, decision))
    }

    pub async fn get(&self, id: Uuid) -> Result<Booking, BookingError> {
        self.load(id).await
    }

    async fn load(&self, id: Uuid) -> Result<Booking, BookingError> {
        self.bookings
            .get(id)
            .await
            .map_err(|e| BookingError::Store(e.to_string()))?
            .ok_or(BookingError::NotFound(id))
    }

    /// Total for the stay: per-night price override where the calendar has
    /// one, the catalog-default rate otherwise.
    async fn quote(&self, req: &CreateBookingRequest) -> Result<i64, BookingError> {
        let last_night = req
            .check_out_date
            .checked_sub_days(Days::new(1))
            .ok_or_else(|| BookingError::InvalidDateRange("bad check-out date".to_string()))?;
        let entries = self
            .calendar
            .entries_intersecting(req.room_id, req.check_in_date, last_night)
            .await
            .map_err(|e| BookingError::Store(e.to_string()))?;

        let mut total = 0i64;
        let mut night = req.check_in_date;
        while night <= last_night {
            let rate = entries
                .iter()
                .find(|e| e.intersects(night, night))
                .and_then(|e| e.price_override)
                .unwrap_or(req.nightly_rate);
            total += rate;
            night = night
                .checked_add_days(Days::new(1))
                .ok_or_else(|| BookingError::InvalidDateRange("date overflow".to_string()))?;
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryBookingRepo;
    use chrono::NaiveDate;
    use stayline_calendar::store::MemoryCalendar;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn ts(s: &str) -> DateTime<Utc> {
        format!("{}T12:00:00Z", s).parse().unwrap()
    }

    fn request(room_id: Uuid, check_in: &str, check_out: &str) -> CreateBookingRequest {
        CreateBookingRequest {
            user_id: Uuid::new_v4(),
            hotel_id: Uuid::new_v4(),
            room_id,
            check_in_date: d(check_in),
            check_out_date: d(check_out),
            number_of_guests: 2,
            full_name: "Le Van C".to_string(),
            email: "c@example.com".to_string(),
            phone: "+84 92 222 2222".to_string(),
            nightly_rate: 1_000_000,
        }
    }

    fn manager() -> (Arc<MemoryCalendar>, Arc<MemoryBookingRepo>, BookingManager) {
        let calendar = Arc::new(MemoryCalendar::new());
        let repo = Arc::new(MemoryBookingRepo::new());
        let manager = BookingManager::new(calendar.clone(), repo.clone(), BookingPolicy::default());
        (calendar, repo, manager)
    }

    #[tokio::test]
    async fn test_reserve_on_empty_calendar_then_overlap_fails() {
        let (_, _, manager) = manager();
        let room = Uuid::new_v4();
        let now = ts("2025-03-01");

        // Scenario: [10th, 12th) succeeds, overlapping [11th, 13th) loses
        let first = manager.reserve(request(room, "2025-03-10", "2025-03-12"), now).await;
        assert!(first.is_ok());

        let second = manager.reserve(request(room, "2025-03-11", "2025-03-13"), now).await;
        assert!(matches!(second, Err(BookingError::RoomUnavailable(_))));
    }

    #[tokio::test]
    async fn test_back_to_back_stays_share_the_turnover_day() {
        let (_, _, manager) = manager();
        let room = Uuid::new_v4();
        let now = ts("2025-03-01");

        manager.reserve(request(room, "2025-03-10", "2025-03-12"), now).await.unwrap();
        // Check-in on the previous guest's checkout day
        let next = manager.reserve(request(room, "2025-03-12", "2025-03-14"), now).await;
        assert!(next.is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_overlapping_reserves_one_winner() {
        let calendar = Arc::new(MemoryCalendar::new());
        let repo = Arc::new(MemoryBookingRepo::new());
        let manager = Arc::new(BookingManager::new(
            calendar,
            repo,
            BookingPolicy::default(),
        ));
        let room = Uuid::new_v4();
        let now = ts("2025-03-01");

        let a = {
            let m = manager.clone();
            tokio::spawn(async move { m.reserve(request(room, "2025-03-10", "2025-03-12"), now).await })
        };
        let b = {
            let m = manager.clone();
            tokio::spawn(async move { m.reserve(request(room, "2025-03-11", "2025-03-13"), now).await })
        };

        let results = [a.await.unwrap(), b.await.unwrap()];
        let wins = results.iter().filter(|r| r.is_ok()).count();
        let losses = results
            .iter()
            .filter(|r| matches!(r, Err(BookingError::RoomUnavailable(_))))
            .count();
        assert_eq!(wins, 1);
        assert_eq!(losses, 1);
    }

    #[tokio::test]
    async fn test_reserve_rejects_bad_ranges() {
        let (_, _, manager) = manager();
        let room = Uuid::new_v4();
        let now = ts("2025-03-10");

        // Zero nights
        let zero = manager.reserve(request(room, "2025-03-15", "2025-03-15"), now).await;
        assert!(matches!(zero, Err(BookingError::InvalidDateRange(_))));

        // Past check-in
        let past = manager.reserve(request(room, "2025-03-09", "2025-03-11"), now).await;
        assert!(matches!(past, Err(BookingError::InvalidDateRange(_))));
    }

    #[tokio::test]
    async fn test_quote_honors_price_overrides() {
        let (calendar, _, manager) = manager();
        let room = Uuid::new_v4();
        let now = ts("2025-03-01");

        // 10th night carries an override, 11th falls back to the catalog rate
        calendar
            .set_range(room, d("2025-03-10"), d("2025-03-10"), AvailabilityStatus::Available, Some(1_500_000))
            .await
            .unwrap();

        let booking = manager
            .reserve(request(room, "2025-03-10", "2025-03-12"), now)
            .await
            .unwrap();
        assert_eq!(booking.total_amount, 2_500_000);
        assert_eq!(booking.deposit_amount, 750_000);
        assert_eq!(booking.remaining_amount, 1_750_000);
    }

    #[tokio::test]
    async fn test_confirm_and_double_confirm() {
        let (_, _, manager) = manager();
        let room = Uuid::new_v4();
        let now = ts("2025-03-01");

        let booking = manager.reserve(request(room, "2025-03-10", "2025-03-12"), now).await.unwrap();
        let confirmed = manager.confirm(booking.id).await.unwrap();
        assert_eq!(confirmed.status, BookingStatus::Confirmed);

        let again = manager.confirm(booking.id).await;
        assert!(matches!(again, Err(BookingError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn test_cancel_releases_dates_for_rebooking() {
        let (_, _, manager) = manager();
        let room = Uuid::new_v4();
        let now = ts("2025-03-01");

        let booking = manager.reserve(request(room, "2025-03-10", "2025-03-12"), now).await.unwrap();
        manager.cancel(booking.id, "change of plans", now).await.unwrap();

        // Same dates can be taken again
        let rebooked = manager.reserve(request(room, "2025-03-10", "2025-03-12"), now).await;
        assert!(rebooked.is_ok());
    }

    #[tokio::test]
    async fn test_cancel_terminal_booking_rejected() {
        let (_, _, manager) = manager();
        let room = Uuid::new_v4();
        let now = ts("2025-03-01");

        let booking = manager.reserve(request(room, "2025-03-10", "2025-03-12"), now).await.unwrap();
        manager.cancel(booking.id, "first", now).await.unwrap();

        let again = manager.cancel(booking.id, "second", now).await;
        assert!(matches!(again, Err(BookingError::InvalidTransition { .. })));
    }
}
