//! Клиент расписания.
//!
//! [`ScheduleClient`] говорит с `/api/events` по HTTP, а
//! [`ScheduleController`] держит локальное состояние экрана расписания:
//! список событий, форму, выбранную дату и текущую фазу.

use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::ClientConfig;
use crate::models::{Event, NewEvent};
use crate::store::DeleteOutcome;

pub mod calendar;
pub mod controller;

pub use controller::{EventForm, FormField, Notice, Phase, ScheduleController};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid base url {0:?}")]
    InvalidBaseUrl(String),

    #[error("request rejected: {0}")]
    Invalid(String),

    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(reqwest::Error),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else {
            ClientError::Transport(err)
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreatedBody {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    message: String,
}

#[derive(Debug, Serialize)]
struct DeleteBody {
    id: i64,
}

/// HTTP-клиент для эндпоинта событий.
#[derive(Debug, Clone)]
pub struct ScheduleClient {
    http: reqwest::Client,
    events_url: Url,
}

impl ScheduleClient {
    /// `base_url` - корень API, например `http://localhost:8000/api`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let invalid = || ClientError::InvalidBaseUrl(base_url.to_string());

        let mut base = Url::parse(base_url).map_err(|_| invalid())?;
        if base.cannot_be_a_base() {
            return Err(invalid());
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let events_url = base.join("events").map_err(|_| invalid())?;

        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self { http, events_url })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        Self::new(&config.base_url, Duration::from_secs(config.timeout_secs))
    }

    pub fn events_url(&self) -> &Url {
        &self.events_url
    }

    pub async fn list_events(&self) -> Result<Vec<Event>, ClientError> {
        let response = self.http.get(self.events_url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(error_from(response).await);
        }
        Ok(response.json().await?)
    }

    pub async fn create_event(&self, event: &NewEvent) -> Result<i64, ClientError> {
        let response = self
            .http
            .post(self.events_url.clone())
            .json(event)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_from(response).await);
        }

        let body: CreatedBody = response.json().await?;
        debug!("Created event {}", body.id);
        Ok(body.id)
    }

    pub async fn delete_event(&self, id: i64) -> Result<DeleteOutcome, ClientError> {
        let response = self
            .http
            .delete(self.events_url.clone())
            .json(&DeleteBody { id })
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(DeleteOutcome::NotFound),
            status if status.is_success() => Ok(DeleteOutcome::Deleted),
            _ => Err(error_from(response).await),
        }
    }
}

async fn error_from(response: reqwest::Response) -> ClientError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<MessageBody>(&text)
        .map(|body| body.message)
        .unwrap_or(text);

    if status == StatusCode::BAD_REQUEST {
        ClientError::Invalid(message)
    } else {
        ClientError::Server { status: status.as_u16(), message }
    }
}
