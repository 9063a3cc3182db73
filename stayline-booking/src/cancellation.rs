use crate::manager::{BookingError, BookingPolicy};
use crate::models::{Booking, BookingStatus, DepositStatus};
use chrono::{DateTime, Days, Utc};
use stayline_core::payment::RefundInstruction;

/// What a cancellation should do besides terminalizing the booking.
///
/// A missing refund is the past-cutoff outcome, not a failure: the
/// cancellation itself still goes through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancellationDecision {
    pub refund: Option<RefundInstruction>,
}

/// Pure policy evaluation for cancellations
pub struct CancellationEvaluator;

impl CancellationEvaluator {
    /// Refundable iff the deposit was paid and `now` is on or before
    /// check-in minus the free-cancellation cutoff, date-granular.
    pub fn refund_eligible(booking: &Booking, now: DateTime<Utc>, cutoff_days: u64) -> bool {
        if booking.deposit_status != DepositStatus::Paid {
            return false;
        }
        match booking.check_in_date.checked_sub_days(Days::new(cutoff_days)) {
            Some(cutoff) => now.date_naive() <= cutoff,
            None => false,
        }
    }

    /// Decide whether the booking may be cancelled and what follows from it
    pub fn decide(
        booking: &Booking,
        now: DateTime<Utc>,
        policy: &BookingPolicy,
    ) -> Result<CancellationDecision, BookingError> {
        if !booking.status.can_transition_to(BookingStatus::Canceled) {
            return Err(BookingError::InvalidTransition {
                from: booking.status.as_str().to_string(),
                to: BookingStatus::Canceled.as_str().to_string(),
            });
        }

        let refund = if Self::refund_eligible(booking, now, policy.free_cancellation_days) {
            Some(RefundInstruction {
                booking_id: booking.id,
                amount: booking.deposit_amount,
                currency: booking.currency.clone(),
                reason: "free-window cancellation".to_string(),
            })
        } else {
            None
        };

        Ok(CancellationDecision { refund })
    }
}
