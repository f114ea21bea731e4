use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{DeleteOutcome, EventStore, StoreError};
use crate::models::{Event, NewEvent};

#[derive(Default)]
struct Inner {
    events: BTreeMap<i64, Event>,
    last_id: i64,
}

/// In-memory хранилище для локального запуска и тестов.
/// Id растут монотонно и не переиспользуются после удаления.
#[derive(Clone, Default)]
pub struct MemoryEventStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.events.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn list(&self) -> Result<Vec<Event>, StoreError> {
        Ok(self.inner.read().await.events.values().cloned().collect())
    }

    async fn create(&self, event: &NewEvent) -> Result<i64, StoreError> {
        let mut inner = self.inner.write().await;
        inner.last_id += 1;
        let id = inner.last_id;

        inner.events.insert(
            id,
            Event {
                id,
                title: event.title.clone(),
                description: event.description.clone(),
                start: event.start.clone(),
                end: event.end.clone(),
            },
        );
        Ok(id)
    }

    async fn delete(&self, id: i64) -> Result<DeleteOutcome, StoreError> {
        Ok(match self.inner.write().await.events.remove(&id) {
            Some(_) => DeleteOutcome::Deleted,
            None => DeleteOutcome::NotFound,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn study() -> NewEvent {
        NewEvent {
            title: "Study".to_string(),
            description: "Algorithms".to_string(),
            start: "2024-04-01T09:00".to_string(),
            end: "2024-04-01T10:00".to_string(),
        }
    }

    #[tokio::test]
    async fn ids_are_not_reused_after_delete() {
        let store = MemoryEventStore::new();
        let first = store.create(&study()).await.unwrap();
        assert_eq!(store.delete(first).await.unwrap(), DeleteOutcome::Deleted);

        let second = store.create(&study()).await.unwrap();
        assert_ne!(first, second);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn delete_missing_leaves_store_unchanged() {
        let store = MemoryEventStore::new();
        store.create(&study()).await.unwrap();

        assert_eq!(store.delete(42).await.unwrap(), DeleteOutcome::NotFound);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn list_returns_ascending_ids() {
        let store = MemoryEventStore::new();
        for _ in 0..3 {
            store.create(&study()).await.unwrap();
        }
        let ids: Vec<i64> = store.list().await.unwrap().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }
}
