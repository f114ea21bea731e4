//! events.rs
//!
//! CRUD-эндпоинты календаря поверх таблицы `events`:
//! - `GET    /api/events` - все события;
//! - `POST   /api/events` - создание, id выдаёт хранилище;
//! - `DELETE /api/events` - удаление по `{id}` из тела запроса.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use crate::error::ApiError;
use crate::models::{Event, EventDraft};
use crate::store::DeleteOutcome;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/events", get(list_events).post(create_event).delete(delete_event))
}

/// Тело запроса должно быть JSON-объектом: массив или число дают 400,
/// даже если serde сумел бы разложить его по полям.
fn object_body<T: DeserializeOwned>(payload: Result<Json<Value>, JsonRejection>) -> Result<T, ApiError> {
    let Json(value) = payload?;
    if !value.is_object() {
        return Err(ApiError::Validation("Request body must be a JSON object".to_string()));
    }
    serde_json::from_value(value).map_err(|e| ApiError::Validation(e.to_string()))
}

// GET /api/events
async fn list_events(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Event>>, ApiError> {
    let events = state.store.list().await?;
    Ok(Json(events))
}

// POST /api/events
#[derive(Debug, Serialize)]
struct CreateEventResponse {
    message: &'static str,
    id: i64,
}

async fn create_event(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let draft: EventDraft = object_body(payload)?;
    let event = draft.into_new_event()?;

    if state.config.features.enforce_chronology {
        event.check_chronology()?;
    }

    let id = state.store.create(&event).await?;
    info!("Event {} created: {:?}", id, event.title);

    Ok((
        StatusCode::CREATED,
        Json(CreateEventResponse { message: "Event added successfully", id }),
    ))
}

// DELETE /api/events
#[derive(Debug, Deserialize)]
struct DeleteEventRequest {
    #[serde(default)]
    id: Option<Value>,
}

/// Что клиент прислал в поле `id`.
#[derive(Debug, PartialEq, Eq)]
enum EventRef {
    Id(i64),
    /// Непустое значение, которое не может быть id ни одной строки.
    Unmatchable,
}

fn event_ref(value: Option<Value>) -> Result<EventRef, ApiError> {
    let missing = || ApiError::Validation("Event ID is required".to_string());

    match value {
        None | Some(Value::Null) => Err(missing()),
        Some(Value::Number(n)) => Ok(n
            .as_i64()
            .or_else(|| n.as_f64().and_then(whole))
            .map_or(EventRef::Unmatchable, EventRef::Id)),
        Some(Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                return Err(missing());
            }
            Ok(s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(whole))
                .map_or(EventRef::Unmatchable, EventRef::Id))
        }
        Some(_) => Err(ApiError::Validation(
            "Event ID must be a number or a string".to_string(),
        )),
    }
}

// 7.0 и "7.0" - это тот же id 7, а 1.5 не совпадёт ни с одной строкой
fn whole(value: f64) -> Option<i64> {
    let in_range = (i64::MIN as f64..i64::MAX as f64).contains(&value);
    (in_range && value.fract() == 0.0).then_some(value as i64)
}

async fn delete_event(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let req: DeleteEventRequest = object_body(payload)?;

    let id = match event_ref(req.id)? {
        EventRef::Id(id) => id,
        EventRef::Unmatchable => return Err(ApiError::NotFound("Event not found".to_string())),
    };

    match state.store.delete(id).await? {
        DeleteOutcome::Deleted => {
            info!("Event {} deleted", id);
            Ok(Json(json!({ "message": "Event deleted successfully" })))
        }
        DeleteOutcome::NotFound => Err(ApiError::NotFound("Event not found".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_ids_in_either_shape() {
        assert_eq!(event_ref(Some(json!(7))).unwrap(), EventRef::Id(7));
        assert_eq!(event_ref(Some(json!("7"))).unwrap(), EventRef::Id(7));
        assert_eq!(event_ref(Some(json!(" 12 "))).unwrap(), EventRef::Id(12));
    }

    #[test]
    fn whole_floats_name_the_same_row() {
        assert_eq!(event_ref(Some(json!(7.0))).unwrap(), EventRef::Id(7));
        assert_eq!(event_ref(Some(json!("7.0"))).unwrap(), EventRef::Id(7));
        assert_eq!(event_ref(Some(json!(-0.0))).unwrap(), EventRef::Id(0));
        assert_eq!(event_ref(Some(json!(1e30))).unwrap(), EventRef::Unmatchable);
        assert_eq!(event_ref(Some(json!("NaN"))).unwrap(), EventRef::Unmatchable);
    }

    #[test]
    fn non_numeric_ids_cannot_match() {
        assert_eq!(event_ref(Some(json!("nonexistent"))).unwrap(), EventRef::Unmatchable);
        assert_eq!(event_ref(Some(json!(1.5))).unwrap(), EventRef::Unmatchable);
        assert_eq!(event_ref(Some(json!("7.5"))).unwrap(), EventRef::Unmatchable);
    }

    #[test]
    fn absent_ids_are_rejected() {
        for value in [None, Some(Value::Null), Some(json!("")), Some(json!("   "))] {
            assert!(matches!(event_ref(value), Err(ApiError::Validation(_))));
        }
        assert!(matches!(event_ref(Some(json!([1]))), Err(ApiError::Validation(_))));
    }

    #[test]
    fn bodies_must_be_objects() {
        let draft: Result<EventDraft, _> = object_body(Ok(Json(json!(["Study", "x", "a", "b"]))));
        assert!(matches!(draft, Err(ApiError::Validation(_))));

        let req: Result<DeleteEventRequest, _> = object_body(Ok(Json(json!([5]))));
        assert!(matches!(req, Err(ApiError::Validation(_))));

        let req: DeleteEventRequest = object_body(Ok(Json(json!({ "id": 5 })))).unwrap();
        assert_eq!(req.id, Some(json!(5)));
    }
}
