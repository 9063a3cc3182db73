use crate::store::{CalendarError, CalendarStore};
use chrono::{Days, NaiveDate};
use uuid::Uuid;

/// Number of nights in a half-open stay range
pub fn nights(check_in: NaiveDate, check_out: NaiveDate) -> i64 {
    (check_out - check_in).num_days()
}

/// Validate a requested stay range.
///
/// Checkout must be strictly after check-in (zero-night stays are invalid
/// input, not an availability question) and check-in must not be in the past.
pub fn validate_stay(
    check_in: NaiveDate,
    check_out: NaiveDate,
    today: NaiveDate,
) -> Result<(), CalendarError> {
    if check_out <= check_in {
        return Err(CalendarError::InvalidRange(format!(
            "check-out {} must be after check-in {}",
            check_out, check_in
        )));
    }
    if check_in < today {
        return Err(CalendarError::InvalidRange(format!(
            "check-in {} is in the past",
            check_in
        )));
    }
    Ok(())
}

/// Whether every night of `[check_in, check_out)` is free of booked or
/// maintenance entries.
///
/// The checkout day itself is not occupied: a checkout on day D and a new
/// check-in on day D do not conflict. Dates with no entry at all count as
/// available.
pub async fn is_available(
    store: &dyn CalendarStore,
    room_id: Uuid,
    check_in: NaiveDate,
    check_out: NaiveDate,
) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
    let last_night = check_out
        .checked_sub_days(Days::new(1))
        .ok_or_else(|| CalendarError::InvalidRange(format!("bad check-out {}", check_out)))?;
    let entries = store
        .entries_intersecting(room_id, check_in, last_night)
        .await?;
    Ok(entries.iter().all(|e| !e.status.blocks()))
}
