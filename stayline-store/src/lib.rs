pub mod app_config;
pub mod booking_repo;
pub mod calendar_repo;
pub mod database;
pub mod events;
pub mod redis_repo;
pub mod review_repo;

pub use booking_repo::PgBookingRepo;
pub use calendar_repo::PgCalendar;
pub use database::DbClient;
pub use events::EventProducer;
pub use redis_repo::RedisClient;
pub use review_repo::PgReviewRepo;
