use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use validator::Validate;

/// Сохранённое событие календаря.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub start: String,
    pub end: String,
}

/// Черновик события: тело POST-запроса и состояние формы клиента.
/// Любое поле может отсутствовать до проверки.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct EventDraft {
    #[validate(required, length(min = 1))]
    #[serde(default)]
    pub title: Option<String>,
    #[validate(required, length(min = 1))]
    #[serde(default)]
    pub description: Option<String>,
    #[validate(required, length(min = 1))]
    #[serde(default)]
    pub start: Option<String>,
    #[validate(required, length(min = 1))]
    #[serde(default)]
    pub end: Option<String>,
}

/// Событие, прошедшее проверку присутствия полей.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("All fields are required (missing: {})", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("{field} is not a recognised timestamp: {value:?}")]
    UnparsableTimestamp { field: &'static str, value: String },

    #[error("start must be before end")]
    EndNotAfterStart,
}

const FIELDS: [&str; 4] = ["title", "description", "start", "end"];

impl EventDraft {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        start: impl Into<String>,
        end: impl Into<String>,
    ) -> Self {
        Self {
            title: Some(title.into()),
            description: Some(description.into()),
            start: Some(start.into()),
            end: Some(end.into()),
        }
    }

    /// Поля, не прошедшие проверку, в порядке объявления.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        match self.validate() {
            Ok(()) => Vec::new(),
            Err(errors) => {
                let failed = errors.field_errors();
                FIELDS
                    .into_iter()
                    .filter(|name| failed.contains_key(*name))
                    .collect()
            }
        }
    }

    /// Проверка присутствия: все четыре поля заданы и непусты.
    pub fn into_new_event(self) -> Result<NewEvent, ValidationError> {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            return Err(ValidationError::MissingFields(missing));
        }

        match (self.title, self.description, self.start, self.end) {
            (Some(title), Some(description), Some(start), Some(end)) => Ok(NewEvent {
                title,
                description,
                start,
                end,
            }),
            _ => Err(ValidationError::MissingFields(FIELDS.to_vec())),
        }
    }
}

impl NewEvent {
    /// Требует, чтобы оба времени разбирались и `start < end`.
    pub fn check_chronology(&self) -> Result<(), ValidationError> {
        let start = parse_timestamp(&self.start).ok_or_else(|| ValidationError::UnparsableTimestamp {
            field: "start",
            value: self.start.clone(),
        })?;
        let end = parse_timestamp(&self.end).ok_or_else(|| ValidationError::UnparsableTimestamp {
            field: "end",
            value: self.end.clone(),
        })?;

        if start >= end {
            return Err(ValidationError::EndNotAfterStart);
        }
        Ok(())
    }
}

/// Разбирает время события: RFC 3339 или `datetime-local` (секунды необязательны).
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_local());
    }
    // Так Postgres печатает timestamptz: `2024-04-01 09:00:00+00`
    if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(dt.naive_local());
    }

    const FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    #[test]
    fn complete_draft_passes() {
        let draft = EventDraft::new("Study", "Algorithms", "2024-04-01T09:00", "2024-04-01T10:00");
        let event = draft.into_new_event().unwrap();
        assert_eq!(event.title, "Study");
        assert_eq!(event.end, "2024-04-01T10:00");
    }

    #[test]
    fn empty_and_absent_fields_are_reported_in_order() {
        let draft = EventDraft {
            title: Some(String::new()),
            description: Some("x".to_string()),
            start: None,
            end: Some("2024-01-01T01:00".to_string()),
        };
        assert_eq!(
            draft.into_new_event(),
            Err(ValidationError::MissingFields(vec!["title", "start"]))
        );
    }

    #[test]
    fn body_without_fields_deserializes_to_empty_draft() {
        let draft: EventDraft = serde_json::from_str(r#"{"title": "Study"}"#).unwrap();
        assert_eq!(draft.missing_fields(), vec!["description", "start", "end"]);
    }

    #[test]
    fn whitespace_counts_as_present() {
        let draft = EventDraft::new(" ", "x", "a", "b");
        assert!(draft.into_new_event().is_ok());
    }

    #[test]
    fn parses_datetime_local_and_rfc3339() {
        let local = parse_timestamp("2024-04-01T09:00").unwrap();
        assert_eq!(local.date(), NaiveDate::from_ymd_opt(2024, 4, 1).unwrap());
        assert_eq!(local.hour(), 9);

        assert!(parse_timestamp("2024-04-01T09:00:30").is_some());
        assert!(parse_timestamp("2024-04-01T09:00:00Z").is_some());
        assert!(parse_timestamp("2024-04-01 09:00").is_some());
        assert_eq!(parse_timestamp("2024-04-01 09:00:00+00"), Some(local));
        assert!(parse_timestamp("next tuesday").is_none());
    }

    #[test]
    fn chronology_rejects_reversed_and_garbage_times() {
        let ok = EventDraft::new("a", "b", "2024-04-01T09:00", "2024-04-01T10:00")
            .into_new_event()
            .unwrap();
        assert!(ok.check_chronology().is_ok());

        let reversed = NewEvent { start: ok.end.clone(), end: ok.start.clone(), ..ok.clone() };
        assert_eq!(reversed.check_chronology(), Err(ValidationError::EndNotAfterStart));

        let same = NewEvent { end: ok.start.clone(), ..ok.clone() };
        assert_eq!(same.check_chronology(), Err(ValidationError::EndNotAfterStart));

        let garbage = NewEvent { end: "soon".to_string(), ..ok };
        assert!(matches!(
            garbage.check_chronology(),
            Err(ValidationError::UnparsableTimestamp { field: "end", .. })
        ));
    }
}
