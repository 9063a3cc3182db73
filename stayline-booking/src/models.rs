use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Booking lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Canceled,
    Expired,
}

impl BookingStatus {
    /// Terminal states admit no further transition
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::Completed | BookingStatus::Canceled | BookingStatus::Expired
        )
    }

    /// The full transition table of the lifecycle state machine
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (BookingStatus::Pending, BookingStatus::Confirmed)
                | (BookingStatus::Pending, BookingStatus::Expired)
                | (BookingStatus::Pending, BookingStatus::Canceled)
                | (BookingStatus::Confirmed, BookingStatus::Completed)
                | (BookingStatus::Confirmed, BookingStatus::Canceled)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Completed => "COMPLETED",
            BookingStatus::Canceled => "CANCELED",
            BookingStatus::Expired => "EXPIRED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(BookingStatus::Pending),
            "CONFIRMED" => Some(BookingStatus::Confirmed),
            "COMPLETED" => Some(BookingStatus::Completed),
            "CANCELED" => Some(BookingStatus::Canceled),
            "EXPIRED" => Some(BookingStatus::Expired),
            _ => None,
        }
    }
}

/// Payment axis, updated only by the payment tracker
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    PartiallyPaid,
    Failed,
    Refunded,
    Expired,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Paid => "PAID",
            PaymentStatus::PartiallyPaid => "PARTIALLY_PAID",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Refunded => "REFUNDED",
            PaymentStatus::Expired => "EXPIRED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(PaymentStatus::Pending),
            "PAID" => Some(PaymentStatus::Paid),
            "PARTIALLY_PAID" => Some(PaymentStatus::PartiallyPaid),
            "FAILED" => Some(PaymentStatus::Failed),
            "REFUNDED" => Some(PaymentStatus::Refunded),
            "EXPIRED" => Some(PaymentStatus::Expired),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DepositStatus {
    Paid,
    Unpaid,
}

impl DepositStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DepositStatus::Paid => "PAID",
            DepositStatus::Unpaid => "UNPAID",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PAID" => Some(DepositStatus::Paid),
            "UNPAID" => Some(DepositStatus::Unpaid),
            _ => None,
        }
    }
}

/// Guest contact details captured at reservation time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuestContact {
    pub full_name: String,
    pub email: String,
    pub phone: String,
}

/// A reservation for one room over a half-open `[check_in, check_out)` stay.
///
/// `deposit_amount + remaining_amount == total_amount` holds after every
/// mutation; bookings are never deleted, only moved to a terminal status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    /// Human-readable reference shown to guests and staff
    pub reference: String,
    pub user_id: Uuid,
    pub hotel_id: Uuid,
    pub room_id: Uuid,
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
    pub number_of_guests: u32,
    pub contact: GuestContact,
    pub total_amount: i64,
    pub deposit_amount: i64,
    pub remaining_amount: i64,
    pub currency: String,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub deposit_status: DepositStatus,
    pub cancellation_reason: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_id: Uuid,
        hotel_id: Uuid,
        room_id: Uuid,
        check_in_date: NaiveDate,
        check_out_date: NaiveDate,
        number_of_guests: u32,
        contact: GuestContact,
        total_amount: i64,
        deposit_amount: i64,
        currency: String,
    ) -> Self {
        let now = Utc::now();
        let id = Uuid::new_v4();
        Self {
            id,
            reference: generate_reference(&id),
            user_id,
            hotel_id,
            room_id,
            check_in_date,
            check_out_date,
            number_of_guests,
            contact,
            total_amount,
            deposit_amount,
            remaining_amount: total_amount - deposit_amount,
            currency,
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Pending,
            deposit_status: DepositStatus::Unpaid,
            cancellation_reason: None,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn nights(&self) -> i64 {
        (self.check_out_date - self.check_in_date).num_days()
    }

    /// Update lifecycle status, touching updated_at
    pub fn set_status(&mut self, next: BookingStatus) {
        self.status = next;
        self.updated_at = Utc::now();
    }

    /// Reset the deposit/remaining split against the fixed total
    pub fn set_deposit(&mut self, deposit_amount: i64) {
        self.deposit_amount = deposit_amount;
        self.remaining_amount = self.total_amount - deposit_amount;
        self.updated_at = Utc::now();
    }
}

/// `SL-{timestamp}-{SHORT}` reference code
fn generate_reference(id: &Uuid) -> String {
    let timestamp = Utc::now().timestamp();
    let short = &id.simple().to_string()[..8];
    format!("SL-{}-{}", timestamp, short.to_uppercase())
}

/// Incoming reservation request.
///
/// `nightly_rate` is the room's catalog-default price; calendar entries with
/// a price override take precedence per night.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBookingRequest {
    pub user_id: Uuid,
    pub hotel_id: Uuid,
    pub room_id: Uuid,
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
    pub number_of_guests: u32,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub nightly_rate: i64,
}

/// A guest review; at most one per booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub hotel_id: Uuid,
    pub user_id: Uuid,
    pub rating: u8,
    pub review_text: String,
    pub response: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Review {
    pub fn new(booking_id: Uuid, hotel_id: Uuid, user_id: Uuid, rating: u8, review_text: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            booking_id,
            hotel_id,
            user_id,
            rating,
            review_text,
            response: None,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn sample_booking() -> Booking {
        Booking::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            d("2025-03-10"),
            d("2025-03-12"),
            2,
            GuestContact {
                full_name: "Nguyen Van A".to_string(),
                email: "guest@example.com".to_string(),
                phone: "+84 90 000 0000".to_string(),
            },
            2_000_000,
            600_000,
            "VND".to_string(),
        )
    }

    #[test]
    fn test_new_booking_axes_and_amounts() {
        let booking = sample_booking();
        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.payment_status, PaymentStatus::Pending);
        assert_eq!(booking.deposit_status, DepositStatus::Unpaid);
        assert_eq!(booking.remaining_amount, 1_400_000);
        assert_eq!(
            booking.deposit_amount + booking.remaining_amount,
            booking.total_amount
        );
        assert_eq!(booking.nights(), 2);
        assert!(booking.reference.starts_with("SL-"));
    }

    #[test]
    fn test_transition_table() {
        use BookingStatus::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Canceled));
        assert!(Pending.can_transition_to(Expired));
        assert!(Confirmed.can_transition_to(Completed));
        assert!(Confirmed.can_transition_to(Canceled));

        // Nothing leaves a terminal state
        for terminal in [Completed, Canceled, Expired] {
            for next in [Pending, Confirmed, Completed, Canceled, Expired] {
                assert!(!terminal.can_transition_to(next));
            }
        }
        // No skipping pending -> completed
        assert!(!Pending.can_transition_to(Completed));
    }

    #[test]
    fn test_set_deposit_keeps_invariant() {
        let mut booking = sample_booking();
        booking.set_deposit(2_000_000);
        assert_eq!(booking.remaining_amount, 0);
        assert_eq!(
            booking.deposit_amount + booking.remaining_amount,
            booking.total_amount
        );
    }
}
