use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, info};

use super::{DeleteOutcome, EventStore, StoreError};
use crate::models::{parse_timestamp, Event, NewEvent};

/// Как в таблице хранится колонка времени.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeColumn {
    Text,
    Timestamp,
    TimestampTz,
}

impl TimeColumn {
    /// По `information_schema.columns.data_type`.
    pub fn from_data_type(data_type: &str) -> Option<Self> {
        match data_type {
            "text" | "character varying" | "character" => Some(TimeColumn::Text),
            "timestamp without time zone" => Some(TimeColumn::Timestamp),
            "timestamp with time zone" => Some(TimeColumn::TimestampTz),
            _ => None,
        }
    }

    fn sql_type(self) -> &'static str {
        match self {
            TimeColumn::Text => "text",
            TimeColumn::Timestamp => "timestamp",
            TimeColumn::TimestampTz => "timestamptz",
        }
    }

    // Текст пишется как есть, для timestamp строка сначала нормализуется
    fn encode(self, field: &'static str, value: &str) -> Result<String, StoreError> {
        match self {
            TimeColumn::Text => Ok(value.to_string()),
            TimeColumn::Timestamp | TimeColumn::TimestampTz => parse_timestamp(value)
                .map(|dt| dt.format("%Y-%m-%d %H:%M:%S%.f").to_string())
                .ok_or_else(|| StoreError::InvalidTimestamp {
                    field,
                    value: value.to_string(),
                }),
        }
    }
}

/// Фактическая форма таблицы `events`, прочитанная при старте.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventsSchema {
    pub start: TimeColumn,
    pub end: TimeColumn,
}

impl EventsSchema {
    pub async fn inspect(pool: &PgPool) -> Result<Self, StoreError> {
        let mut conn = pool.acquire().await?;

        let columns = sqlx::query_as::<_, (String, String)>(
            r#"SELECT column_name::text, data_type::text
               FROM information_schema.columns
               WHERE table_schema = current_schema() AND table_name = 'events'"#
        )
        .fetch_all(&mut *conn)
        .await?;

        if columns.is_empty() {
            return Err(StoreError::Schema("table events does not exist".to_string()));
        }

        let data_type = |name: &str| {
            columns
                .iter()
                .find(|(column, _)| column == name)
                .map(|(_, data_type)| data_type.as_str())
                .ok_or_else(|| StoreError::Schema(format!("column events.{} is missing", name)))
        };

        match data_type("id")? {
            "integer" | "bigint" => {}
            other => {
                return Err(StoreError::Schema(format!("events.id has unsupported type {}", other)));
            }
        }
        for text in ["title", "description"] {
            if TimeColumn::from_data_type(data_type(text)?) != Some(TimeColumn::Text) {
                return Err(StoreError::Schema(format!("events.{} must be a text column", text)));
            }
        }

        let time = |name: &str| -> Result<TimeColumn, StoreError> {
            let data_type = data_type(name)?;
            TimeColumn::from_data_type(data_type).ok_or_else(|| {
                StoreError::Schema(format!("events.{} has unsupported type {}", name, data_type))
            })
        };

        Ok(Self {
            start: time("start")?,
            end: time("end")?,
        })
    }
}

/// Хранилище поверх пула Postgres.
///
/// Каждая операция берёт одно соединение из пула в начале и возвращает его
/// при выходе из функции, в том числе по ошибке.
#[derive(Clone)]
pub struct PgEventStore {
    pool: PgPool,
    schema: EventsSchema,
    insert_sql: String,
}

impl PgEventStore {
    pub fn new(pool: PgPool, schema: EventsSchema) -> Self {
        // id приводится к int8, чтобы SERIAL и BIGSERIAL читались одинаково
        let insert_sql = format!(
            r#"INSERT INTO events (title, description, start, "end")
               VALUES ($1, $2, $3::{}, $4::{})
               RETURNING id::int8"#,
            schema.start.sql_type(),
            schema.end.sql_type(),
        );

        Self { pool, schema, insert_sql }
    }

    /// Читает форму таблицы и отказывает сразу, если с ней нельзя работать.
    pub async fn connect(pool: PgPool) -> Result<Self, StoreError> {
        let schema = EventsSchema::inspect(&pool).await?;
        info!("events table: start {:?}, end {:?}", schema.start, schema.end);
        Ok(Self::new(pool, schema))
    }

    pub fn schema(&self) -> EventsSchema {
        self.schema
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn list(&self) -> Result<Vec<Event>, StoreError> {
        let mut conn = self.pool.acquire().await?;

        let events = sqlx::query_as::<_, Event>(
            r#"SELECT id::int8 AS id, title, description,
                      start::text AS start, "end"::text AS "end"
               FROM events ORDER BY id"#
        )
        .fetch_all(&mut *conn)
        .await?;

        debug!("Loaded {} events", events.len());
        Ok(events)
    }

    async fn create(&self, event: &NewEvent) -> Result<i64, StoreError> {
        let start = self.schema.start.encode("start", &event.start)?;
        let end = self.schema.end.encode("end", &event.end)?;

        let mut conn = self.pool.acquire().await?;

        let id = sqlx::query_scalar::<_, i64>(&self.insert_sql)
            .bind(&event.title)
            .bind(&event.description)
            .bind(start)
            .bind(end)
            .fetch_one(&mut *conn)
            .await?;

        Ok(id)
    }

    async fn delete(&self, id: i64) -> Result<DeleteOutcome, StoreError> {
        let mut conn = self.pool.acquire().await?;

        let affected = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?
            .rows_affected();

        Ok(if affected == 0 {
            DeleteOutcome::NotFound
        } else {
            DeleteOutcome::Deleted
        })
    }
}
