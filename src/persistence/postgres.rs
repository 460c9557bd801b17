//! PostgreSQL implementation of the persistence layer.

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

use crate::domain::{SosEvent, SosRequest};
use crate::error::GatewayError;

/// PostgreSQL-backed persistence layer using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresPersistence {
    pool: PgPool,
}

impl PostgresPersistence {
    /// Creates a new persistence layer with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to the database and prepares the schema.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Persistence`] when the database is
    /// unreachable or the schema cannot be created.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        connect_timeout_secs: u64,
    ) -> Result<Self, GatewayError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(connect_timeout_secs))
            .connect(database_url)
            .await
            .map_err(|e| GatewayError::Persistence(e.to_string()))?;

        let persistence = Self::new(pool);
        persistence.ensure_schema().await?;
        Ok(persistence)
    }

    /// Creates the event log and record mirror tables if absent.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Persistence`] on database failure.
    pub async fn ensure_schema(&self) -> Result<(), GatewayError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS sos_events (\
                 id BIGSERIAL PRIMARY KEY, \
                 sos_id UUID NOT NULL, \
                 event_type TEXT NOT NULL, \
                 payload JSONB NOT NULL, \
                 created_at TIMESTAMPTZ NOT NULL DEFAULT now()\
             )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| GatewayError::Persistence(e.to_string()))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS sos_requests (\
                 id UUID PRIMARY KEY, \
                 record JSONB NOT NULL, \
                 status TEXT NOT NULL, \
                 updated_at TIMESTAMPTZ NOT NULL\
             )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| GatewayError::Persistence(e.to_string()))?;

        Ok(())
    }

    /// Appends a lifecycle event to the event log.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Persistence`] on database failure.
    pub async fn append_event(&self, event: &SosEvent) -> Result<i64, GatewayError> {
        let payload = serde_json::to_value(event)
            .map_err(|e| GatewayError::Persistence(e.to_string()))?;

        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO sos_events (sos_id, event_type, payload) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(uuid::Uuid::from(event.sos_id()))
        .bind(event.event_type_str())
        .bind(payload)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| GatewayError::Persistence(e.to_string()))?;

        Ok(id)
    }

    /// Upserts the current state of a record into the mirror table.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Persistence`] on database failure.
    pub async fn upsert_sos(&self, record: &SosRequest) -> Result<(), GatewayError> {
        let json = serde_json::to_value(record)
            .map_err(|e| GatewayError::Persistence(e.to_string()))?;

        sqlx::query(
            "INSERT INTO sos_requests (id, record, status, updated_at) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (id) DO UPDATE \
             SET record = EXCLUDED.record, status = EXCLUDED.status, updated_at = EXCLUDED.updated_at",
        )
        .bind(uuid::Uuid::from(record.id))
        .bind(json)
        .bind(record.status.to_string())
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| GatewayError::Persistence(e.to_string()))?;

        Ok(())
    }
}
