use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What a payment transaction was for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentKind {
    Deposit,
    Remaining,
    FullPayment,
    Refund,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentResult {
    Succeeded,
    Failed,
}

/// One transaction record from the external payment system.
///
/// The engine treats these as an append-only log; it never issues charges
/// itself, it only folds results into the booking's payment axis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentEvent {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub kind: PaymentKind,
    pub result: PaymentResult,
    pub amount: i64,
    pub currency: String,
    pub occurred_at: DateTime<Utc>,
}

impl PaymentEvent {
    pub fn succeeded(booking_id: Uuid, kind: PaymentKind, amount: i64, currency: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            booking_id,
            kind,
            result: PaymentResult::Succeeded,
            amount,
            currency: currency.to_string(),
            occurred_at: Utc::now(),
        }
    }

    pub fn failed(booking_id: Uuid, kind: PaymentKind, amount: i64, currency: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            booking_id,
            kind,
            result: PaymentResult::Failed,
            amount,
            currency: currency.to_string(),
            occurred_at: Utc::now(),
        }
    }
}

/// Instruction for the external payment system to return a deposit.
///
/// Emitted by the cancellation evaluator when the free-cancellation window
/// still holds; publishing it is the caller's job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefundInstruction {
    pub booking_id: Uuid,
    pub amount: i64,
    pub currency: String,
    pub reason: String,
}
