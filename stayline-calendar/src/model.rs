use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// State of a room's calendar dates
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AvailabilityStatus {
    Available,
    Booked,
    Maintenance,
}

impl AvailabilityStatus {
    /// Whether dates in this state conflict with a new stay
    pub fn blocks(&self) -> bool {
        matches!(self, AvailabilityStatus::Booked | AvailabilityStatus::Maintenance)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AvailabilityStatus::Available => "AVAILABLE",
            AvailabilityStatus::Booked => "BOOKED",
            AvailabilityStatus::Maintenance => "MAINTENANCE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "AVAILABLE" => Some(AvailabilityStatus::Available),
            "BOOKED" => Some(AvailabilityStatus::Booked),
            "MAINTENANCE" => Some(AvailabilityStatus::Maintenance),
            _ => None,
        }
    }
}

/// One date-range record of a room's calendar.
///
/// Dates are inclusive on both ends and date-granular. For a given room,
/// entries never overlap; dates not covered by any entry are implicitly
/// available at the catalog-default price.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomAvailabilityEntry {
    pub room_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: AvailabilityStatus,
    pub price_override: Option<i64>,
}

impl RoomAvailabilityEntry {
    pub fn new(
        room_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
        status: AvailabilityStatus,
        price_override: Option<i64>,
    ) -> Self {
        Self {
            room_id,
            start_date,
            end_date,
            status,
            price_override,
        }
    }

    /// Inclusive intersection test against another inclusive range
    pub fn intersects(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.start_date <= end && self.end_date >= start
    }

    /// Entries in the same band can be merged when adjacent
    pub fn same_band(&self, other: &RoomAvailabilityEntry) -> bool {
        self.status == other.status && self.price_override == other.price_override
    }
}
