use async_trait::async_trait;
use sqlx::PgPool;
use stayline_booking::models::Review;
use stayline_booking::repository::ReviewRepository;
use uuid::Uuid;

/// Postgres review store. The unique index on booking_id is what makes
/// try_insert atomic under concurrent submissions.
pub struct PgReviewRepo {
    pool: PgPool,
}

impl PgReviewRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReviewRepository for PgReviewRepo {
    async fn exists_for_booking(
        &self,
        booking_id: Uuid,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let exists: (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM reviews WHERE booking_id = $1)")
                .bind(booking_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists.0)
    }

    async fn try_insert(
        &self,
        review: &Review,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let result = sqlx::query(
            "INSERT INTO reviews (id, booking_id, hotel_id, user_id, rating, review_text, response, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (booking_id) DO NOTHING",
        )
        .bind(review.id)
        .bind(review.booking_id)
        .bind(review.hotel_id)
        .bind(review.user_id)
        .bind(review.rating as i16)
        .bind(&review.review_text)
        .bind(&review.response)
        .bind(review.created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
