//! Тесты против настоящего Postgres. Без `DATABASE_URL` пропускаются.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::{SystemTime, UNIX_EPOCH};

use study_planner::models::{parse_timestamp, EventDraft};
use study_planner::store::{DeleteOutcome, EventStore, PgEventStore, StoreError, TimeColumn};

/// Пул, у которого все соединения смотрят в отдельную пустую схему.
async fn isolated_pool(tag: &str) -> Option<(PgPool, String)> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL is not set, skipping");
        return None;
    };

    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    let schema = format!("study_planner_{}_{}_{}", tag, std::process::id(), nanos);

    let admin = PgPoolOptions::new().max_connections(1).connect(&url).await.unwrap();
    sqlx::query(&format!("CREATE SCHEMA {}", schema))
        .execute(&admin)
        .await
        .unwrap();
    admin.close().await;

    let search_path = format!("SET search_path TO {}", schema);
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .after_connect(move |conn, _meta| {
            let search_path = search_path.clone();
            Box::pin(async move {
                sqlx::query(&search_path).execute(conn).await?;
                Ok(())
            })
        })
        .connect(&url)
        .await
        .unwrap();

    Some((pool, schema))
}

async fn drop_schema(pool: PgPool, schema: &str) {
    sqlx::query(&format!("DROP SCHEMA {} CASCADE", schema))
        .execute(&pool)
        .await
        .unwrap();
    pool.close().await;
}

async fn exercise(store: &PgEventStore) {
    let event = EventDraft::new("Study", "Algorithms", "2024-04-01T09:00", "2024-04-01T10:00")
        .into_new_event()
        .unwrap();

    let first = store.create(&event).await.unwrap();
    let second = store.create(&event).await.unwrap();
    assert!(second > first);

    let events = store.list().await.unwrap();
    let ids: Vec<i64> = events.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![first, second]);
    assert_eq!(events[0].title, "Study");
    assert_eq!(events[0].description, "Algorithms");
    assert_eq!(parse_timestamp(&events[0].start), parse_timestamp("2024-04-01T09:00"));
    assert_eq!(parse_timestamp(&events[0].end), parse_timestamp("2024-04-01T10:00"));

    assert_eq!(store.delete(first).await.unwrap(), DeleteOutcome::Deleted);
    assert_eq!(store.delete(first).await.unwrap(), DeleteOutcome::NotFound);
    assert_eq!(store.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn migrated_table_keeps_strings_verbatim() {
    let Some((pool, schema)) = isolated_pool("migrated").await else {
        return;
    };
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();

    let store = PgEventStore::connect(pool.clone()).await.unwrap();
    assert_eq!(store.schema().start, TimeColumn::Text);
    exercise(&store).await;

    let odd = EventDraft::new("a", "b", "after lunch", "later")
        .into_new_event()
        .unwrap();
    let id = store.create(&odd).await.unwrap();
    let stored = store.list().await.unwrap().into_iter().find(|e| e.id == id).unwrap();
    assert_eq!(stored.start, "after lunch");
    assert_eq!(stored.end, "later");

    drop_schema(pool, &schema).await;
}

#[tokio::test]
async fn serial_and_timestamp_table_is_supported() {
    let Some((pool, schema)) = isolated_pool("legacy").await else {
        return;
    };
    sqlx::query(
        r#"CREATE TABLE events (
               id SERIAL PRIMARY KEY,
               title VARCHAR(255) NOT NULL,
               description TEXT NOT NULL,
               start TIMESTAMP NOT NULL,
               "end" TIMESTAMP NOT NULL
           )"#,
    )
    .execute(&pool)
    .await
    .unwrap();
    // Миграция не трогает уже созданную таблицу
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();

    let store = PgEventStore::connect(pool.clone()).await.unwrap();
    assert_eq!(store.schema().start, TimeColumn::Timestamp);
    assert_eq!(store.schema().end, TimeColumn::Timestamp);
    exercise(&store).await;

    let garbage = EventDraft::new("a", "b", "after lunch", "2024-04-01T10:00")
        .into_new_event()
        .unwrap();
    assert!(matches!(
        store.create(&garbage).await,
        Err(StoreError::InvalidTimestamp { field: "start", .. })
    ));

    drop_schema(pool, &schema).await;
}

#[tokio::test]
async fn unusable_table_fails_at_startup() {
    let Some((pool, schema)) = isolated_pool("broken").await else {
        return;
    };

    assert!(matches!(
        PgEventStore::connect(pool.clone()).await,
        Err(StoreError::Schema(_))
    ));

    sqlx::query(
        r#"CREATE TABLE events (
               id SERIAL PRIMARY KEY,
               title TEXT NOT NULL,
               description TEXT NOT NULL,
               start INTEGER NOT NULL,
               "end" INTEGER NOT NULL
           )"#,
    )
    .execute(&pool)
    .await
    .unwrap();

    match PgEventStore::connect(pool.clone()).await {
        Err(StoreError::Schema(message)) => assert!(message.contains("start"), "{}", message),
        Err(other) => panic!("unexpected error: {:?}", other),
        Ok(_) => panic!("integer time columns were accepted"),
    }

    drop_schema(pool, &schema).await;
}
