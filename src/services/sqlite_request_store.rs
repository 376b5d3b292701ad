//! services/sqlite_request_store.rs
//! SQLite-backed request store, for runs that should survive a restart.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};
use tokio::sync::Notify;
use uuid::Uuid;

use crate::errors::StoreError;
use crate::models::request_model::{RequestRecord, RequestStatus, StatusChange};
use crate::services::request_store::RequestStore;

const SELECT_RECORD: &str = r#"
    SELECT local_id, provider_id, status, payload, error_message,
           provider_status, provider_timestamp, usage, created_at, updated_at
    FROM message_requests
"#;

/// Fixed-width RFC 3339 so that text ordering matches time ordering.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(column: &str, raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("{column} '{raw}': {e}")))
}

fn record_from_row(row: &SqliteRow) -> Result<RequestRecord, StoreError> {
    let local_id: String = row.try_get("local_id")?;
    let status: String = row.try_get("status")?;
    let payload: String = row.try_get("payload")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;
    let provider_timestamp: Option<String> = row.try_get("provider_timestamp")?;
    let usage: Option<String> = row.try_get("usage")?;

    Ok(RequestRecord {
        local_id: Uuid::parse_str(&local_id)
            .map_err(|e| StoreError::Corrupt(format!("local_id '{local_id}': {e}")))?,
        provider_id: row.try_get("provider_id")?,
        status: status.parse()?,
        payload: serde_json::from_str(&payload)?,
        error_message: row.try_get("error_message")?,
        provider_status: row.try_get("provider_status")?,
        provider_timestamp: provider_timestamp
            .map(|raw| parse_timestamp("provider_timestamp", &raw))
            .transpose()?,
        usage: usage.map(|raw| serde_json::from_str(&raw)).transpose()?,
        created_at: parse_timestamp("created_at", &created_at)?,
        updated_at: parse_timestamp("updated_at", &updated_at)?,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

pub struct SqliteRequestStore {
    db_pool: Pool<Sqlite>,
    changes: Notify,
}

impl SqliteRequestStore {
    pub fn new(db_pool: Pool<Sqlite>) -> Self {
        Self {
            db_pool,
            changes: Notify::new(),
        }
    }

    /// Opens (creating if needed) the database at `url` and runs migrations.
    /// In-memory URLs need `max_connections == 1`: every connection would
    /// otherwise get its own empty database.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        let db_pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let store = Self::new(db_pool);
        store.run_migrations().await?;
        Ok(store)
    }

    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.db_pool).await?;
        Ok(())
    }

    async fn fetch_by_provider_id(
        &self,
        provider_id: &str,
    ) -> Result<Option<RequestRecord>, StoreError> {
        // Prefer the live holder of the id over failed ones that released it.
        let sql = format!(
            "{SELECT_RECORD} WHERE provider_id = ?1 \
             ORDER BY (status = 'failed'), created_at DESC LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .bind(provider_id)
            .fetch_optional(&self.db_pool)
            .await?;
        row.as_ref().map(record_from_row).transpose()
    }

    /// Writes `record`'s status fields if the stored status is still `expected`.
    /// Returns false when another writer got there first.
    async fn compare_and_set(
        &self,
        record: &RequestRecord,
        expected: RequestStatus,
    ) -> Result<bool, StoreError> {
        let usage = record
            .usage
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let result = sqlx::query(
            r#"
            UPDATE message_requests
            SET status = ?1,
                provider_status = ?2,
                error_message = ?3,
                provider_timestamp = ?4,
                usage = ?5,
                updated_at = MAX(updated_at, ?6)
            WHERE local_id = ?7 AND status = ?8
            "#,
        )
        .bind(record.status.as_str())
        .bind(record.provider_status.as_deref())
        .bind(record.error_message.as_deref())
        .bind(record.provider_timestamp.map(timestamp))
        .bind(usage)
        .bind(timestamp(record.updated_at))
        .bind(record.local_id.to_string())
        .bind(expected.as_str())
        .execute(&self.db_pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Re-reads and re-applies until the write wins. Terminates because every
    /// applied change moves the record forward in an acyclic lifecycle.
    async fn transition(
        &self,
        local_id: Uuid,
        change: &StatusChange,
    ) -> Result<RequestRecord, StoreError> {
        loop {
            let mut record = fetch_by_local_id(&self.db_pool, local_id).await?;
            let expected = record.status;
            if !record.apply(change)? {
                return Ok(record);
            }
            if self.compare_and_set(&record, expected).await? {
                self.changes.notify_waiters();
                // Stored timestamps are truncated; hand back what `get` will see.
                return fetch_by_local_id(&self.db_pool, local_id).await;
            }
            log::debug!(
                "(transition) Lost a concurrent update on request {}, retrying",
                local_id
            );
        }
    }
}

#[async_trait]
impl RequestStore for SqliteRequestStore {
    async fn create(&self, payload: Value) -> Result<Uuid, StoreError> {
        let record = RequestRecord::new(Uuid::new_v4(), payload);
        let created_at = timestamp(record.created_at);

        sqlx::query(
            r#"
            INSERT INTO message_requests (
                local_id, provider_id, status, payload, error_message,
                provider_status, created_at, updated_at
            )
            VALUES (?1, NULL, ?2, ?3, NULL, NULL, ?4, ?4)
            "#,
        )
        .bind(record.local_id.to_string())
        .bind(record.status.as_str())
        .bind(serde_json::to_string(&record.payload)?)
        .bind(created_at)
        .execute(&self.db_pool)
        .await?;

        self.changes.notify_waiters();
        Ok(record.local_id)
    }

    async fn attach_provider_id(
        &self,
        local_id: Uuid,
        provider_id: &str,
    ) -> Result<RequestRecord, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE message_requests
            SET provider_id = ?2,
                status = 'sent',
                updated_at = MAX(updated_at, ?3)
            WHERE local_id = ?1 AND status = 'pending' AND provider_id IS NULL
            "#,
        )
        .bind(local_id.to_string())
        .bind(provider_id)
        .bind(timestamp(Utc::now()))
        .execute(&self.db_pool)
        .await;

        let result = match result {
            Ok(result) => result,
            Err(e) if is_unique_violation(&e) => {
                return Err(StoreError::DuplicateProviderId(provider_id.to_owned()))
            }
            Err(e) => return Err(e.into()),
        };

        let record = self.get(local_id).await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::InvalidTransition {
                local_id,
                from: record.status,
                to: RequestStatus::Sent,
            });
        }

        self.changes.notify_waiters();
        Ok(record)
    }

    async fn mark_failed(&self, local_id: Uuid, reason: &str) -> Result<RequestRecord, StoreError> {
        let change = StatusChange::new(RequestStatus::Failed).with_reason(reason);
        self.transition(local_id, &change).await
    }

    async fn update_status(
        &self,
        provider_id: &str,
        change: StatusChange,
    ) -> Result<RequestRecord, StoreError> {
        let local_id = self
            .fetch_by_provider_id(provider_id)
            .await?
            .map(|record| record.local_id)
            .ok_or_else(|| StoreError::NotFound(provider_id.to_owned()))?;

        self.transition(local_id, &change).await
    }

    async fn get(&self, local_id: Uuid) -> Result<RequestRecord, StoreError> {
        fetch_by_local_id(&self.db_pool, local_id).await
    }

    async fn list(&self) -> Result<Vec<RequestRecord>, StoreError> {
        let rows = sqlx::query(SELECT_RECORD)
            .fetch_all(&self.db_pool)
            .await?;
        rows.iter().map(record_from_row).collect()
    }

    fn changes(&self) -> &Notify {
        &self.changes
    }
}

async fn fetch_by_local_id(
    db_pool: &Pool<Sqlite>,
    local_id: Uuid,
) -> Result<RequestRecord, StoreError> {
    let sql = format!("{SELECT_RECORD} WHERE local_id = ?1");
    let row = sqlx::query(&sql)
        .bind(local_id.to_string())
        .fetch_optional(db_pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(local_id.to_string()))?;
    record_from_row(&row)
}
