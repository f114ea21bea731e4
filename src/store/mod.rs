//! Хранилище событий календаря.
//!
//! Три операции поверх одной таблицы `events`: список, создание и удаление.
//! Идентификаторы выдаёт только хранилище.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Event, NewEvent};

pub mod memory;
pub mod postgres;

pub use memory::MemoryEventStore;
pub use postgres::{EventsSchema, PgEventStore, TimeColumn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Таблица `events` есть, но её колонки не подходят.
    #[error("unsupported events schema: {0}")]
    Schema(String),

    /// Колонка времени типизирована, а значение не разбирается как время.
    #[error("{field} is not a valid timestamp: {value:?}")]
    InvalidTimestamp { field: &'static str, value: String },
}

/// Результат удаления по id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

#[async_trait]
pub trait EventStore: Send + Sync {
    /// Все события в естественном порядке хранилища.
    async fn list(&self) -> Result<Vec<Event>, StoreError>;

    /// Вставляет проверенное событие и возвращает выданный id.
    async fn create(&self, event: &NewEvent) -> Result<i64, StoreError>;

    async fn delete(&self, id: i64) -> Result<DeleteOutcome, StoreError>;
}
