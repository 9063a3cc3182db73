use std::sync::Arc;
use stayline_booking::manager::BookingManager;
use stayline_booking::payments::PaymentTracker;
use stayline_booking::repository::BookingRepository;
use stayline_booking::review::ReviewService;
use stayline_booking::sweeper::Sweeper;
use stayline_calendar::generator::CalendarGenerator;
use stayline_calendar::store::CalendarStore;
use stayline_core::events::CalendarChangedEvent;
use stayline_store::app_config::BusinessRules;
use stayline_store::{EventProducer, RedisClient};
use tokio::sync::broadcast;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub calendar: Arc<dyn CalendarStore>,
    pub generator: Arc<CalendarGenerator>,
    pub bookings: Arc<dyn BookingRepository>,
    pub manager: Arc<BookingManager>,
    pub tracker: Arc<PaymentTracker>,
    pub reviews: Arc<ReviewService>,
    pub sweeper: Arc<Sweeper>,
    pub redis: Arc<RedisClient>,
    pub kafka: Arc<EventProducer>,
    pub sse_tx: broadcast::Sender<CalendarChangedEvent>,
    pub auth: AuthConfig,
    pub business_rules: BusinessRules,
}
