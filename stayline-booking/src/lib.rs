pub mod cancellation;
pub mod manager;
pub mod models;
pub mod payments;
pub mod repository;
pub mod review;
pub mod sweeper;

pub use cancellation::{CancellationDecision, CancellationEvaluator};
pub use manager::{BookingError, BookingManager, BookingPolicy};
pub use models::{Booking, BookingStatus, CreateBookingRequest, DepositStatus, PaymentStatus, Review};
pub use payments::PaymentTracker;
pub use repository::{BookingFilter, BookingRepository, MemoryBookingRepo, MemoryReviewRepo, ReviewRepository};
pub use review::{ReviewError, ReviewService};
pub use sweeper::{SweepReport, Sweeper};
