pub mod generator;
pub mod model;
pub mod query;
pub mod store;

pub use generator::CalendarGenerator;
pub use model::{AvailabilityStatus, RoomAvailabilityEntry};
pub use query::{is_available, nights, validate_stay};
pub use store::{overwrite_entries, CalendarError, CalendarStore, MemoryCalendar};
