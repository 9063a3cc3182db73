use crate::model::{AvailabilityStatus, RoomAvailabilityEntry};
use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum CalendarError {
    #[error("Invalid date range: {0}")]
    InvalidRange(String),

    #[error("Date range already blocked: {0}")]
    Conflict(String),

    #[error("Calendar store error: {0}")]
    Backend(String),
}

/// The single mutation path for per-room calendar state.
///
/// All writers (generator, lifecycle manager, cancellation, sweeper) go
/// through this trait; readers must never observe a torn write for a date.
#[async_trait]
pub trait CalendarStore: Send + Sync {
    /// All entries for `room_id` intersecting the inclusive range
    async fn entries_intersecting(
        &self,
        room_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RoomAvailabilityEntry>, Box<dyn std::error::Error + Send + Sync>>;

    /// All entries for `room_id`, ordered by start date
    async fn entries_for_room(
        &self,
        room_id: Uuid,
    ) -> Result<Vec<RoomAvailabilityEntry>, Box<dyn std::error::Error + Send + Sync>>;

    /// Overwrite the inclusive range with one status/price band.
    ///
    /// Pure upsert: intersecting entries are clipped or split, never
    /// duplicated, and adjacent entries of the same band are merged so the
    /// entry count stays minimal. Calling twice with identical arguments
    /// leaves the same state as calling once.
    async fn set_range(
        &self,
        room_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        status: AvailabilityStatus,
        price_override: Option<i64>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Release an inclusive range back to plain availability
    async fn release_range(
        &self,
        room_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.set_range(room_id, start, end, AvailabilityStatus::Available, None)
            .await
    }
}

/// In-memory calendar keyed by room, entries kept sorted and normalized.
///
/// A single mutex guards the whole map, so readers see either the fully-old
/// or fully-new band for a date, never a torn one.
pub struct MemoryCalendar {
    rooms: Mutex<HashMap<Uuid, Vec<RoomAvailabilityEntry>>>,
}

impl MemoryCalendar {
    pub fn new() -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
        }
    }
}

/// Clip existing entries around the incoming band, insert it, merge
/// neighbors. Entries stay sorted by start date.
///
/// This is the one normalization routine every store implementation funnels
/// through, so all of them agree on what "pure upsert" means.
pub fn overwrite_entries(
    entries: &mut Vec<RoomAvailabilityEntry>,
    incoming: RoomAvailabilityEntry,
) {
    let start = incoming.start_date;
    let end = incoming.end_date;
    let mut rebuilt: Vec<RoomAvailabilityEntry> = Vec::with_capacity(entries.len() + 2);

    for entry in entries.drain(..) {
        if !entry.intersects(start, end) {
            rebuilt.push(entry);
            continue;
        }
        // Left remainder survives the overwrite
        if entry.start_date < start {
            let mut left = entry.clone();
            left.end_date = prev_day(start);
            rebuilt.push(left);
        }
        // Right remainder survives the overwrite
        if entry.end_date > end {
            let mut right = entry;
            right.start_date = next_day(end);
            rebuilt.push(right);
        }
    }

    rebuilt.push(incoming);
    rebuilt.sort_by_key(|e| e.start_date);

    // Coalesce adjacent same-band entries
    let mut merged: Vec<RoomAvailabilityEntry> = Vec::with_capacity(rebuilt.len());
    for entry in rebuilt {
        match merged.last_mut() {
            Some(last) if last.same_band(&entry) && next_day(last.end_date) == entry.start_date => {
                last.end_date = entry.end_date;
            }
            _ => merged.push(entry),
        }
    }

    *entries = merged;
}

impl Default for MemoryCalendar {
    fn default() -> Self {
        Self::new()
    }
}

fn next_day(date: NaiveDate) -> NaiveDate {
    date.checked_add_days(Days::new(1)).expect("date overflow")
}

fn prev_day(date: NaiveDate) -> NaiveDate {
    date.checked_sub_days(Days::new(1)).expect("date underflow")
}

#[async_trait]
impl CalendarStore for MemoryCalendar {
    async fn entries_intersecting(
        &self,
        room_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RoomAvailabilityEntry>, Box<dyn std::error::Error + Send + Sync>> {
        if start > end {
            return Err(Box::new(CalendarError::InvalidRange(format!(
                "{} > {}",
                start, end
            ))));
        }
        let rooms = self.rooms.lock().await;
        Ok(rooms
            .get(&room_id)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| e.intersects(start, end))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn entries_for_room(
        &self,
        room_id: Uuid,
    ) -> Result<Vec<RoomAvailabilityEntry>, Box<dyn std::error::Error + Send + Sync>> {
        let rooms = self.rooms.lock().await;
        Ok(rooms.get(&room_id).cloned().unwrap_or_default())
    }

    async fn set_range(
        &self,
        room_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        status: AvailabilityStatus,
        price_override: Option<i64>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if start > end {
            return Err(Box::new(CalendarError::InvalidRange(format!(
                "{} > {}",
                start, end
            ))));
        }
        let mut rooms = self.rooms.lock().await;
        let entries = rooms.entry(room_id).or_default();
        overwrite_entries(
            entries,
            RoomAvailabilityEntry::new(room_id, start, end, status, price_override),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_set_range_is_idempotent() {
        let store = MemoryCalendar::new();
        let room = Uuid::new_v4();

        store
            .set_range(room, d("2025-03-10"), d("2025-03-20"), AvailabilityStatus::Booked, None)
            .await
            .unwrap();
        let once = store.entries_for_room(room).await.unwrap();

        store
            .set_range(room, d("2025-03-10"), d("2025-03-20"), AvailabilityStatus::Booked, None)
            .await
            .unwrap();
        let twice = store.entries_for_room(room).await.unwrap();

        assert_eq!(once, twice);
        assert_eq!(twice.len(), 1);
    }

    #[tokio::test]
    async fn test_overwrite_splits_spanning_entry() {
        let store = MemoryCalendar::new();
        let room = Uuid::new_v4();

        store
            .set_range(room, d("2025-03-01"), d("2025-03-31"), AvailabilityStatus::Available, None)
            .await
            .unwrap();
        store
            .set_range(room, d("2025-03-10"), d("2025-03-12"), AvailabilityStatus::Maintenance, None)
            .await
            .unwrap();

        let entries = store.entries_for_room(room).await.unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].end_date, d("2025-03-09"));
        assert_eq!(entries[1].status, AvailabilityStatus::Maintenance);
        assert_eq!(entries[2].start_date, d("2025-03-13"));
    }

    #[tokio::test]
    async fn test_adjacent_same_band_entries_merge() {
        let store = MemoryCalendar::new();
        let room = Uuid::new_v4();

        store
            .set_range(room, d("2025-03-01"), d("2025-03-05"), AvailabilityStatus::Booked, None)
            .await
            .unwrap();
        store
            .set_range(room, d("2025-03-06"), d("2025-03-10"), AvailabilityStatus::Booked, None)
            .await
            .unwrap();

        let entries = store.entries_for_room(room).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].start_date, d("2025-03-01"));
        assert_eq!(entries[0].end_date, d("2025-03-10"));
    }

    #[tokio::test]
    async fn test_different_price_bands_do_not_merge() {
        let store = MemoryCalendar::new();
        let room = Uuid::new_v4();

        store
            .set_range(room, d("2025-03-01"), d("2025-03-05"), AvailabilityStatus::Available, Some(900_000))
            .await
            .unwrap();
        store
            .set_range(room, d("2025-03-06"), d("2025-03-10"), AvailabilityStatus::Available, Some(1_200_000))
            .await
            .unwrap();

        let entries = store.entries_for_room(room).await.unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[tokio::test]
    async fn test_release_range_rejoins_availability() {
        let store = MemoryCalendar::new();
        let room = Uuid::new_v4();

        store
            .set_range(room, d("2025-03-01"), d("2025-03-31"), AvailabilityStatus::Available, None)
            .await
            .unwrap();
        store
            .set_range(room, d("2025-03-10"), d("2025-03-12"), AvailabilityStatus::Booked, None)
            .await
            .unwrap();
        store
            .release_range(room, d("2025-03-10"), d("2025-03-12"))
            .await
            .unwrap();

        // Back to one available run for the whole month
        let entries = store.entries_for_room(room).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, AvailabilityStatus::Available);
    }

    #[tokio::test]
    async fn test_inverted_range_rejected() {
        let store = MemoryCalendar::new();
        let room = Uuid::new_v4();

        let result = store
            .set_range(room, d("2025-03-12"), d("2025-03-10"), AvailabilityStatus::Booked, None)
            .await;
        assert!(result.is_err());
    }
}
