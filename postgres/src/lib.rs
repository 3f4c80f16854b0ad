//! `PostgreSQL` document store for ticketline.
//!
//! Events and bookings are stored as JSONB documents. Every inventory
//! mutation is a single conditional `UPDATE` whose `WHERE` clause carries the
//! business condition, so the check and the mutation are one atomic statement
//! and concurrent reservations against the same event serialize on the row
//! lock. No read-then-write window exists anywhere in this store.
//!
//! # Example
//!
//! ```ignore
//! use ticketline_postgres::PostgresTicketStore;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = PostgresTicketStore::connect("postgres://localhost/ticketline", 10).await?;
//!     store.ensure_schema().await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use ticketline_core::store::{
    BookingFilter, CancelOutcome, EventFilter, Result, StoreError, TicketStore,
};
use ticketline_core::types::{Booking, BookingId, Event, EventId, EventPatch, ModerationStatus};

/// Postgres codes that indicate a retryable concurrency failure.
const RETRYABLE_SQLSTATE: [&str; 2] = [
    "40001", // serialization_failure
    "40P01", // deadlock_detected
];

fn map_sqlx(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if let Some(code) = db.code() {
            if RETRYABLE_SQLSTATE.contains(&code.as_ref()) {
                return StoreError::Conflict;
            }
        }
    }
    StoreError::Backend(err.to_string())
}

fn decode<T: serde::de::DeserializeOwned>(json: serde_json::Value) -> Result<T> {
    serde_json::from_value(json).map_err(|e| StoreError::Backend(format!("bad document: {e}")))
}

fn encode<T: serde::Serialize>(value: &T) -> Result<serde_json::Value> {
    serde_json::to_value(value)
        .map_err(|e| StoreError::Backend(format!("document encoding failed: {e}")))
}

/// JSONB-backed `TicketStore` over a `PostgreSQL` connection pool.
pub struct PostgresTicketStore {
    pool: PgPool,
}

impl PostgresTicketStore {
    /// Wraps an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a new pool to the given database URL.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Backend` if the connection cannot be
    /// established.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(map_sqlx)?;
        Ok(Self::new(pool))
    }

    /// Access the underlying pool (health checks, tests).
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the document tables and indexes if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Backend` if a DDL statement fails.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS events (
                id UUID PRIMARY KEY,
                organizer_id UUID NOT NULL,
                data JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_events_status ON events ((data->>'status'))")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS bookings (
                id UUID PRIMARY KEY,
                event_id UUID NOT NULL,
                user_id UUID NOT NULL,
                data JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_bookings_user ON bookings (user_id)")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_bookings_event ON bookings (event_id)")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;

        Ok(())
    }
}

#[async_trait]
impl TicketStore for PostgresTicketStore {
    #[tracing::instrument(skip(self, event), fields(event_id = %event.id))]
    async fn insert_event(&self, event: &Event) -> Result<()> {
        let json = encode(event)?;
        sqlx::query(
            "INSERT INTO events (id, organizer_id, data, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $4)",
        )
        .bind(event.id.as_uuid())
        .bind(event.organizer_id.as_uuid())
        .bind(&json)
        .bind(event.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn fetch_event(&self, id: EventId) -> Result<Option<Event>> {
        let row: Option<(serde_json::Value,)> =
            sqlx::query_as("SELECT data FROM events WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx)?;
        row.map(|(json,)| decode(json)).transpose()
    }

    async fn list_events(&self, filter: EventFilter) -> Result<Vec<Event>> {
        let status = filter.status.map(|s| s.to_string());
        let rows: Vec<(serde_json::Value,)> = match (status, filter.organizer_id) {
            (Some(status), Some(organizer)) if filter.match_any => sqlx::query_as(
                "SELECT data FROM events
                 WHERE data->>'status' = $1 OR organizer_id = $2
                 ORDER BY created_at DESC",
            )
            .bind(status)
            .bind(organizer.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?,
            (Some(status), Some(organizer)) => sqlx::query_as(
                "SELECT data FROM events
                 WHERE data->>'status' = $1 AND organizer_id = $2
                 ORDER BY created_at DESC",
            )
            .bind(status)
            .bind(organizer.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?,
            (Some(status), None) => sqlx::query_as(
                "SELECT data FROM events
                 WHERE data->>'status' = $1
                 ORDER BY created_at DESC",
            )
            .bind(status)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?,
            (None, Some(organizer)) => sqlx::query_as(
                "SELECT data FROM events
                 WHERE organizer_id = $1
                 ORDER BY created_at DESC",
            )
            .bind(organizer.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?,
            (None, None) => {
                sqlx::query_as("SELECT data FROM events ORDER BY created_at DESC")
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx)?
            }
        };
        rows.into_iter().map(|(json,)| decode(json)).collect()
    }

    async fn update_event_content(&self, id: EventId, patch: &EventPatch) -> Result<bool> {
        // Merge only the provided content fields into the document so a
        // concurrent inventory update is never clobbered. Capacity changes
        // go through try_resize, never through this merge.
        let mut fields = serde_json::Map::new();
        if let Some(title) = &patch.title {
            fields.insert("title".to_string(), encode(title)?);
        }
        if let Some(description) = &patch.description {
            fields.insert("description".to_string(), encode(description)?);
        }
        if let Some(starts_at) = &patch.starts_at {
            fields.insert("starts_at".to_string(), encode(starts_at)?);
        }
        if let Some(location) = &patch.location {
            fields.insert("location".to_string(), encode(location)?);
        }
        if let Some(category) = &patch.category {
            fields.insert("category".to_string(), encode(category)?);
        }
        if let Some(image_url) = &patch.image_url {
            fields.insert("image_url".to_string(), encode(image_url)?);
        }
        if let Some(ticket_price) = &patch.ticket_price {
            fields.insert("ticket_price".to_string(), encode(ticket_price)?);
        }
        if fields.is_empty() {
            // Nothing to merge; report whether the event exists.
            return Ok(self.fetch_event(id).await?.is_some());
        }

        let result = sqlx::query(
            "UPDATE events SET data = data || $2::jsonb, updated_at = now() WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(serde_json::Value::Object(fields))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(result.rows_affected() == 1)
    }

    async fn set_event_status(&self, id: EventId, status: ModerationStatus) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE events
             SET data = jsonb_set(data, '{status}', to_jsonb($2::text), false),
                 updated_at = now()
             WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(status.to_string())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(result.rows_affected() == 1)
    }

    #[tracing::instrument(skip(self))]
    async fn try_reserve(&self, id: EventId, quantity: u32) -> Result<bool> {
        // Check and decrement in one statement: the row lock serializes
        // concurrent reservations, so overselling is impossible.
        let result = sqlx::query(
            "UPDATE events
             SET data = jsonb_set(data, '{remaining_tickets}',
                     to_jsonb((data->>'remaining_tickets')::int - $2::int)),
                 updated_at = now()
             WHERE id = $1
               AND data->>'status' = 'approved'
               AND (data->>'remaining_tickets')::int >= $2::int",
        )
        .bind(id.as_uuid())
        .bind(i64::from(quantity))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(result.rows_affected() == 1)
    }

    #[tracing::instrument(skip(self))]
    async fn release(&self, id: EventId, quantity: u32) -> Result<bool> {
        // Clamped to total_tickets: a duplicate release can never push the
        // count past capacity.
        let result = sqlx::query(
            "UPDATE events
             SET data = jsonb_set(data, '{remaining_tickets}',
                     to_jsonb(LEAST((data->>'remaining_tickets')::int + $2::int,
                                    (data->>'total_tickets')::int))),
                 updated_at = now()
             WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(i64::from(quantity))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(result.rows_affected() == 1)
    }

    #[tracing::instrument(skip(self))]
    async fn try_resize(&self, id: EventId, new_total: u32) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE events
             SET data = jsonb_set(jsonb_set(data, '{remaining_tickets}',
                         to_jsonb(LEAST(GREATEST((data->>'remaining_tickets')::int
                             + ($2::int - (data->>'total_tickets')::int), 0), $2::int))),
                     '{total_tickets}', to_jsonb($2::int)),
                 updated_at = now()
             WHERE id = $1
               AND $2::int >= (data->>'total_tickets')::int
                             - (data->>'remaining_tickets')::int",
        )
        .bind(id.as_uuid())
        .bind(i64::from(new_total))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(result.rows_affected() == 1)
    }

    #[tracing::instrument(skip(self, booking), fields(booking_id = %booking.id))]
    async fn insert_booking(&self, booking: &Booking) -> Result<()> {
        let json = encode(booking)?;
        sqlx::query(
            "INSERT INTO bookings (id, event_id, user_id, data, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(booking.id.as_uuid())
        .bind(booking.event_id.as_uuid())
        .bind(booking.user_id.as_uuid())
        .bind(&json)
        .bind(booking.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn fetch_booking(&self, id: BookingId) -> Result<Option<Booking>> {
        let row: Option<(serde_json::Value,)> =
            sqlx::query_as("SELECT data FROM bookings WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx)?;
        row.map(|(json,)| decode(json)).transpose()
    }

    async fn list_bookings(&self, filter: BookingFilter) -> Result<Vec<Booking>> {
        let rows: Vec<(serde_json::Value,)> = match (filter.user_id, filter.event_id) {
            (Some(user), Some(event)) => sqlx::query_as(
                "SELECT data FROM bookings
                 WHERE user_id = $1 AND event_id = $2
                 ORDER BY created_at DESC",
            )
            .bind(user.as_uuid())
            .bind(event.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?,
            (Some(user), None) => sqlx::query_as(
                "SELECT data FROM bookings WHERE user_id = $1 ORDER BY created_at DESC",
            )
            .bind(user.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?,
            (None, Some(event)) => sqlx::query_as(
                "SELECT data FROM bookings WHERE event_id = $1 ORDER BY created_at DESC",
            )
            .bind(event.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?,
            (None, None) => {
                sqlx::query_as("SELECT data FROM bookings ORDER BY created_at DESC")
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx)?
            }
        };
        rows.into_iter().map(|(json,)| decode(json)).collect()
    }

    #[tracing::instrument(skip(self))]
    async fn cancel_booking(
        &self,
        booking_id: BookingId,
        event_id: EventId,
        quantity: u32,
    ) -> Result<CancelOutcome> {
        // The status flip and the inventory release commit together: a
        // cancelled booking has returned its quantity exactly once.
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        let flipped = sqlx::query(
            "UPDATE bookings
             SET data = jsonb_set(data, '{status}', to_jsonb('cancelled'::text), false)
             WHERE id = $1 AND data->>'status' <> 'cancelled'",
        )
        .bind(booking_id.as_uuid())
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx)?;

        if flipped.rows_affected() == 0 {
            let exists = sqlx::query("SELECT 1 FROM bookings WHERE id = $1")
                .bind(booking_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_sqlx)?
                .is_some();
            tx.rollback().await.map_err(map_sqlx)?;
            return Ok(if exists {
                CancelOutcome::AlreadyCancelled
            } else {
                CancelOutcome::NotFound
            });
        }

        sqlx::query(
            "UPDATE events
             SET data = jsonb_set(data, '{remaining_tickets}',
                     to_jsonb(LEAST((data->>'remaining_tickets')::int + $2::int,
                                    (data->>'total_tickets')::int))),
                 updated_at = now()
             WHERE id = $1",
        )
        .bind(event_id.as_uuid())
        .bind(i64::from(quantity))
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx)?;

        tx.commit().await.map_err(map_sqlx)?;
        Ok(CancelOutcome::Cancelled)
    }
}
