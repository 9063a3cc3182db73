use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use stayline_booking::models::{
    Booking, BookingStatus, DepositStatus, GuestContact, PaymentStatus,
};
use stayline_booking::repository::{BookingFilter, BookingRepository};
use uuid::Uuid;

pub struct PgBookingRepo {
    pool: PgPool,
}

impl PgBookingRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal struct for type-safe querying
#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    reference: String,
    user_id: Uuid,
    hotel_id: Uuid,
    room_id: Uuid,
    check_in_date: NaiveDate,
    check_out_date: NaiveDate,
    number_of_guests: i32,
    guest_name: String,
    guest_email: String,
    guest_phone: String,
    total_amount: i64,
    deposit_amount: i64,
    remaining_amount: i64,
    currency: String,
    status: String,
    payment_status: String,
    deposit_status: String,
    cancellation_reason: Option<String>,
    cancelled_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BookingRow {
    fn into_booking(self) -> Result<Booking, Box<dyn std::error::Error + Send + Sync>> {
        let status = BookingStatus::parse(&self.status)
            .ok_or_else(|| format!("unknown booking status '{}'", self.status))?;
        let payment_status = PaymentStatus::parse(&self.payment_status)
            .ok_or_else(|| format!("unknown payment status '{}'", self.payment_status))?;
        let deposit_status = DepositStatus::parse(&self.deposit_status)
            .ok_or_else(|| format!("unknown deposit status '{}'", self.deposit_status))?;

        Ok(Booking {
            id: self.id,
            reference: self.reference,
            user_id: self.user_id,
            hotel_id: self.hotel_id,
            room_id: self.room_id,
            check_in_date: self.check_in_date,
            check_out_date: self.check_out_date,
            number_of_guests: self.number_of_guests as u32,
            contact: GuestContact {
                full_name: self.guest_name,
                email: self.guest_email,
                phone: self.guest_phone,
            },
            total_amount: self.total_amount,
            deposit_amount: self.deposit_amount,
            remaining_amount: self.remaining_amount,
            currency: self.currency,
            status,
            payment_status,
            deposit_status,
            cancellation_reason: self.cancellation_reason,
            cancelled_at: self.cancelled_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const BOOKING_COLUMNS: &str = "id, reference, user_id, hotel_id, room_id, check_in_date, \
    check_out_date, number_of_guests, guest_name, guest_email, guest_phone, total_amount, \
    deposit_amount, remaining_amount, currency, status, payment_status, deposit_status, \
    cancellation_reason, cancelled_at, created_at, updated_at";

#[async_trait]
impl BookingRepository for PgBookingRepo {
    async fn insert(
        &self,
        booking: &Booking,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query(
            "INSERT INTO bookings (id, reference, user_id, hotel_id, room_id, check_in_date, \
             check_out_date, number_of_guests, guest_name, guest_email, guest_phone, \
             total_amount, deposit_amount, remaining_amount, currency, status, payment_status, \
             deposit_status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)",
        )
        .bind(booking.id)
        .bind(&booking.reference)
        .bind(booking.user_id)
        .bind(booking.hotel_id)
        .bind(booking.room_id)
        .bind(booking.check_in_date)
        .bind(booking.check_out_date)
        .bind(booking.number_of_guests as i32)
        .bind(&booking.contact.full_name)
        .bind(&booking.contact.email)
        .bind(&booking.contact.phone)
        .bind(booking.total_amount)
        .bind(booking.deposit_amount)
        .bind(booking.remaining_amount)
        .bind(&booking.currency)
        .bind(booking.status.as_str())
        .bind(booking.payment_status.as_str())
        .bind(booking.deposit_status.as_str())
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(
        &self,
        id: Uuid,
    ) -> Result<Option<Booking>, Box<dyn std::error::Error + Send + Sync>> {
        let row: Option<BookingRow> = sqlx::query_as(&format!(
            "SELECT {} FROM bookings WHERE id = $1",
            BOOKING_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.into_booking()).transpose()
    }

    async fn save_payment_axis(
        &self,
        booking: &Booking,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query(
            "UPDATE bookings SET deposit_amount = $2, remaining_amount = $3, \
             payment_status = $4, deposit_status = $5, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(booking.id)
        .bind(booking.deposit_amount)
        .bind(booking.remaining_amount)
        .bind(booking.payment_status.as_str())
        .bind(booking.deposit_status.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_status_guarded(
        &self,
        id: Uuid,
        expected: BookingStatus,
        next: BookingStatus,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let result = sqlx::query(
            "UPDATE bookings SET status = $3, updated_at = NOW() \
             WHERE id = $1 AND status = $2",
        )
        .bind(id)
        .bind(expected.as_str())
        .bind(next.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn cancel_guarded(
        &self,
        id: Uuid,
        expected: BookingStatus,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let result = sqlx::query(
            "UPDATE bookings SET status = 'CANCELED', cancellation_reason = $3, \
             cancelled_at = $4, updated_at = NOW() \
             WHERE id = $1 AND status = $2",
        )
        .bind(id)
        .bind(expected.as_str())
        .bind(reason)
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn expire_guarded(
        &self,
        id: Uuid,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let result = sqlx::query(
            "UPDATE bookings SET status = 'EXPIRED', \
             payment_status = CASE WHEN payment_status = 'PENDING' THEN 'EXPIRED' ELSE payment_status END, \
             updated_at = NOW() \
             WHERE id = $1 AND status = 'PENDING'",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn list(
        &self,
        filter: &BookingFilter,
    ) -> Result<Vec<Booking>, Box<dyn std::error::Error + Send + Sync>> {
        let rows: Vec<BookingRow> = sqlx::query_as(&format!(
            "SELECT {} FROM bookings \
             WHERE ($1::uuid IS NULL OR user_id = $1) \
               AND ($2::uuid IS NULL OR hotel_id = $2) \
               AND ($3::text IS NULL OR status = $3) \
             ORDER BY created_at DESC",
            BOOKING_COLUMNS
        ))
        .bind(filter.user_id)
        .bind(filter.hotel_id)
        .bind(filter.status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.into_booking()).collect()
    }
}
