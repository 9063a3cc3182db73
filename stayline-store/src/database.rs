use crate::app_config::BusinessRules;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres, Row};
use std::time::Duration;
use tracing::info;

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    pub async fn new(connection_string: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(connection_string)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations").run(&self.pool).await?;
        info!("Migrations completed successfully.");
        Ok(())
    }

    /// Merge per-deployment overrides from the business_rules table over the
    /// config-file defaults. Expected row format: {"value": <number/string>}.
    pub async fn fetch_business_rules(
        &self,
        defaults: BusinessRules,
    ) -> Result<BusinessRules, sqlx::Error> {
        let rows = sqlx::query("SELECT rule_key, rule_value FROM business_rules")
            .fetch_all(&self.pool)
            .await?;

        let mut rules = defaults;

        for row in rows {
            let rule_key: String = row.get("rule_key");
            let rule_value: Value = row.get("rule_value");

            if let Some(v) = rule_value.get("value") {
                match rule_key.as_str() {
                    "free_cancellation_days" => {
                        if let Some(u) = v.as_u64() {
                            rules.free_cancellation_days = u;
                        }
                    }
                    "review_window_days" => {
                        if let Some(i) = v.as_i64() {
                            rules.review_window_days = i;
                        }
                    }
                    "payment_deadline_hours" => {
                        if let Some(i) = v.as_i64() {
                            rules.payment_deadline_hours = i;
                        }
                    }
                    "deposit_percent" => {
                        if let Some(i) = v.as_i64() {
                            rules.deposit_percent = i;
                        }
                    }
                    "sweep_interval_seconds" => {
                        if let Some(u) = v.as_u64() {
                            rules.sweep_interval_seconds = u;
                        }
                    }
                    "reserve_lock_seconds" => {
                        if let Some(u) = v.as_u64() {
                            rules.reserve_lock_seconds = u;
                        }
                    }
                    "seed_window_months" => {
                        if let Some(u) = v.as_u64() {
                            rules.seed_window_months = u as u32;
                        }
                    }
                    "currency" => {
                        if let Some(s) = v.as_str() {
                            rules.currency = String::from(s);
                        }
                    }
                    _ => {}
                }
            }
        }

        Ok(rules)
    }
}
