use std::net::SocketAddr;
use std::sync::Arc;
use stayline_api::{app, state::{AppState, AuthConfig}};
use stayline_booking::manager::BookingManager;
use stayline_booking::payments::PaymentTracker;
use stayline_booking::repository::{BookingRepository, ReviewRepository};
use stayline_booking::review::ReviewService;
use stayline_booking::sweeper::Sweeper;
use stayline_calendar::generator::CalendarGenerator;
use stayline_calendar::store::CalendarStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stayline_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = stayline_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Stayline API on port {}", config.server.port);

    // Postgres
    let db = stayline_store::DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    // Per-deployment rule overrides live in the database
    let business_rules = db
        .fetch_business_rules(config.business_rules.clone())
        .await
        .expect("Failed to load business rules");
    let policy = business_rules.to_policy();

    // Redis Connection
    let redis_client = stayline_store::RedisClient::new(&config.redis.url)
        .await
        .expect("Failed to connect to Redis");
    let redis_arc = Arc::new(redis_client);

    // Kafka Connection
    let kafka_producer = stayline_store::EventProducer::new(&config.kafka.brokers)
        .expect("Failed to create Kafka producer");
    let kafka_arc = Arc::new(kafka_producer);

    // Engine assembly
    let calendar: Arc<dyn CalendarStore> = Arc::new(stayline_store::PgCalendar::new(db.pool.clone()));
    let bookings: Arc<dyn BookingRepository> = Arc::new(stayline_store::PgBookingRepo::new(db.pool.clone()));
    let reviews: Arc<dyn ReviewRepository> = Arc::new(stayline_store::PgReviewRepo::new(db.pool.clone()));

    let manager = Arc::new(BookingManager::new(
        calendar.clone(),
        bookings.clone(),
        policy.clone(),
    ));
    let tracker = Arc::new(PaymentTracker::new(bookings.clone()));
    let review_service = Arc::new(ReviewService::new(
        bookings.clone(),
        reviews,
        policy.review_window_days,
    ));
    let sweeper = Arc::new(Sweeper::new(calendar.clone(), bookings.clone(), policy));
    let generator = Arc::new(CalendarGenerator::new(calendar.clone()));

    // SSE Broadcast Channel
    let (sse_tx, _) = tokio::sync::broadcast::channel(100);

    // Background completion/expiry loop
    tokio::spawn(stayline_api::worker::start_sweeper(
        sweeper.clone(),
        business_rules.sweep_interval_seconds,
    ));

    let app_state = AppState {
        calendar,
        generator,
        bookings,
        manager,
        tracker,
        reviews: review_service,
        sweeper,
        redis: redis_arc,
        kafka: kafka_arc,
        sse_tx,
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
        },
        business_rules,
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .unwrap();
}
