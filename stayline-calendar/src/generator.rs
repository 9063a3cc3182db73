use crate::model::AvailabilityStatus;
use crate::store::{CalendarError, CalendarStore};
use chrono::{Months, NaiveDate};
use std::sync::Arc;
use uuid::Uuid;

/// Bulk calendar writer for seeding and manual blocking.
///
/// Both granularities (single day and range) funnel through the store's
/// set_range primitive, so repeated calls with identical arguments are
/// harmless.
pub struct CalendarGenerator {
    store: Arc<dyn CalendarStore>,
}

impl CalendarGenerator {
    pub fn new(store: Arc<dyn CalendarStore>) -> Self {
        Self { store }
    }

    /// Overwrite the inclusive range with the given status and price
    pub async fn generate(
        &self,
        room_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
        status: AvailabilityStatus,
        price_override: Option<i64>,
    ) -> Result<(), CalendarError> {
        if start_date > end_date {
            return Err(CalendarError::InvalidRange(format!(
                "{} > {}",
                start_date, end_date
            )));
        }
        if let Some(price) = price_override {
            if price <= 0 {
                return Err(CalendarError::InvalidRange(format!(
                    "price override must be positive, got {}",
                    price
                )));
            }
        }
        self.store
            .set_range(room_id, start_date, end_date, status, price_override)
            .await
            .map_err(|e| CalendarError::Backend(e.to_string()))
    }

    /// Single-day update (`start == end`)
    pub async fn set_day(
        &self,
        room_id: Uuid,
        date: NaiveDate,
        status: AvailabilityStatus,
        price_override: Option<i64>,
    ) -> Result<(), CalendarError> {
        self.generate(room_id, date, date, status, price_override).await
    }

    /// Seed a new room's calendar: an open available window starting at
    /// `from`, three months long by default.
    pub async fn seed_window(
        &self,
        room_id: Uuid,
        from: NaiveDate,
        months: u32,
    ) -> Result<(), CalendarError> {
        let end = from
            .checked_add_months(Months::new(months))
            .ok_or_else(|| CalendarError::InvalidRange("seed window overflow".to_string()))?;
        self.generate(room_id, from, end, AvailabilityStatus::Available, None)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryCalendar;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_generate_twice_same_state() {
        let store = Arc::new(MemoryCalendar::new());
        let generator = CalendarGenerator::new(store.clone());
        let room = Uuid::new_v4();

        generator
            .generate(room, d("2025-04-01"), d("2025-04-30"), AvailabilityStatus::Available, Some(800_000))
            .await
            .unwrap();
        let once = store.entries_for_room(room).await.unwrap();

        generator
            .generate(room, d("2025-04-01"), d("2025-04-30"), AvailabilityStatus::Available, Some(800_000))
            .await
            .unwrap();
        let twice = store.entries_for_room(room).await.unwrap();

        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn test_single_day_block() {
        let store = Arc::new(MemoryCalendar::new());
        let generator = CalendarGenerator::new(store.clone());
        let room = Uuid::new_v4();

        generator
            .seed_window(room, d("2025-04-01"), 3)
            .await
            .unwrap();
        generator
            .set_day(room, d("2025-04-15"), AvailabilityStatus::Maintenance, None)
            .await
            .unwrap();

        let entries = store
            .entries_intersecting(room, d("2025-04-15"), d("2025-04-15"))
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, AvailabilityStatus::Maintenance);
        assert_eq!(entries[0].start_date, d("2025-04-15"));
        assert_eq!(entries[0].end_date, d("2025-04-15"));
    }

    #[tokio::test]
    async fn test_non_positive_price_rejected() {
        let store = Arc::new(MemoryCalendar::new());
        let generator = CalendarGenerator::new(store);
        let room = Uuid::new_v4();

        let result = generator
            .generate(room, d("2025-04-01"), d("2025-04-02"), AvailabilityStatus::Available, Some(0))
            .await;
        assert!(result.is_err());
    }
}
