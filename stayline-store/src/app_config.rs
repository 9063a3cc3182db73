use serde::Deserialize;
use std::env;
use stayline_booking::manager::BookingPolicy;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub kafka: KafkaConfig,
    pub auth: AuthConfig,
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    /// Refundable until check-in minus this many days
    pub free_cancellation_days: u64,
    /// Reviews accepted until this many days after checkout
    pub review_window_days: i64,
    /// Unpaid pending bookings expire this long after creation
    pub payment_deadline_hours: i64,
    /// Deposit share of the total, in percent
    pub deposit_percent: i64,
    pub sweep_interval_seconds: u64,
    /// TTL of the cross-process per-room reserve lock
    pub reserve_lock_seconds: u64,
    #[serde(default = "default_seed_months")]
    pub seed_window_months: u32,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_seed_months() -> u32 {
    3
}

fn default_currency() -> String {
    "VND".to_string()
}

impl BusinessRules {
    pub fn to_policy(&self) -> BookingPolicy {
        BookingPolicy {
            free_cancellation_days: self.free_cancellation_days,
            review_window_days: self.review_window_days,
            payment_deadline_hours: self.payment_deadline_hours,
            deposit_percent: self.deposit_percent,
            currency: self.currency.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(config::File::with_name("config/default"))
            // Environment-specific file, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `STAYLINE__SERVER__PORT=9000`
            .add_source(config::Environment::with_prefix("STAYLINE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
