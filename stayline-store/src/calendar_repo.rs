use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use sqlx::PgPool;
use stayline_calendar::model::{AvailabilityStatus, RoomAvailabilityEntry};
use stayline_calendar::store::{overwrite_entries, CalendarError, CalendarStore};
use uuid::Uuid;

/// Postgres calendar store.
///
/// Writers normalize inside a transaction holding row locks on the touched
/// range; the `room_calendar_no_double_block` exclusion constraint rejects
/// any overlapping blocking band that two writers could otherwise race in,
/// which surfaces here as CalendarError::Conflict.
pub struct PgCalendar {
    pool: PgPool,
}

impl PgCalendar {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal struct for type-safe querying
#[derive(sqlx::FromRow)]
struct CalendarRow {
    room_id: Uuid,
    start_date: NaiveDate,
    end_date: NaiveDate,
    status: String,
    price_override: Option<i64>,
}

impl CalendarRow {
    fn into_entry(self) -> Result<RoomAvailabilityEntry, CalendarError> {
        let status = AvailabilityStatus::parse(&self.status)
            .ok_or_else(|| CalendarError::Backend(format!("unknown status '{}'", self.status)))?;
        Ok(RoomAvailabilityEntry {
            room_id: self.room_id,
            start_date: self.start_date,
            end_date: self.end_date,
            status,
            price_override: self.price_override,
        })
    }
}

fn map_write_error(e: sqlx::Error) -> Box<dyn std::error::Error + Send + Sync> {
    if let sqlx::Error::Database(ref db_err) = e {
        // 23P01: exclusion constraint violation
        if db_err.code().as_deref() == Some("23P01") {
            return Box::new(CalendarError::Conflict(db_err.message().to_string()));
        }
    }
    Box::new(e)
}

#[async_trait]
impl CalendarStore for PgCalendar {
    async fn entries_intersecting(
        &self,
        room_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RoomAvailabilityEntry>, Box<dyn std::error::Error + Send + Sync>> {
        if start > end {
            return Err(Box::new(CalendarError::InvalidRange(format!(
                "{} > {}",
                start, end
            ))));
        }
        let rows: Vec<CalendarRow> = sqlx::query_as(
            "SELECT room_id, start_date, end_date, status, price_override \
             FROM room_calendar \
             WHERE room_id = $1 AND start_date <= $3 AND end_date >= $2 \
             ORDER BY start_date",
        )
        .bind(room_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                r.into_entry()
                    .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)
            })
            .collect()
    }

    async fn entries_for_room(
        &self,
        room_id: Uuid,
    ) -> Result<Vec<RoomAvailabilityEntry>, Box<dyn std::error::Error + Send + Sync>> {
        let rows: Vec<CalendarRow> = sqlx::query_as(
            "SELECT room_id, start_date, end_date, status, price_override \
             FROM room_calendar WHERE room_id = $1 ORDER BY start_date",
        )
        .bind(room_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                r.into_entry()
                    .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)
            })
            .collect()
    }

    async fn set_range(
        &self,
        room_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        status: AvailabilityStatus,
        price_override: Option<i64>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if start > end {
            return Err(Box::new(CalendarError::InvalidRange(format!(
                "{} > {}",
                start, end
            ))));
        }

        // Widen by one day on each side so adjacent bands participate in the
        // merge, exactly like the in-memory normalization
        let fetch_start = start.checked_sub_days(Days::new(1)).unwrap_or(start);
        let fetch_end = end.checked_add_days(Days::new(1)).unwrap_or(end);

        let mut tx = self.pool.begin().await?;

        let rows: Vec<CalendarRow> = sqlx::query_as(
            "SELECT room_id, start_date, end_date, status, price_override \
             FROM room_calendar \
             WHERE room_id = $1 AND start_date <= $3 AND end_date >= $2 \
             ORDER BY start_date \
             FOR UPDATE",
        )
        .bind(room_id)
        .bind(fetch_start)
        .bind(fetch_end)
        .fetch_all(&mut *tx)
        .await?;

        let mut entries = rows
            .into_iter()
            .map(|r| r.into_entry())
            .collect::<Result<Vec<_>, _>>()?;

        overwrite_entries(
            &mut entries,
            RoomAvailabilityEntry::new(room_id, start, end, status, price_override),
        );

        sqlx::query(
            "DELETE FROM room_calendar \
             WHERE room_id = $1 AND start_date <= $3 AND end_date >= $2",
        )
        .bind(room_id)
        .bind(fetch_start)
        .bind(fetch_end)
        .execute(&mut *tx)
        .await?;

        for entry in &entries {
            sqlx::query(
                "INSERT INTO room_calendar (id, room_id, start_date, end_date, status, price_override) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(Uuid::new_v4())
            .bind(entry.room_id)
            .bind(entry.start_date)
            .bind(entry.end_date)
            .bind(entry.status.as_str())
            .bind(entry.price_override)
            .execute(&mut *tx)
            .await
            .map_err(map_write_error)?;
        }

        tx.commit().await.map_err(map_write_error)?;
        Ok(())
    }
}
