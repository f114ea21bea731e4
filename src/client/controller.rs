use chrono::NaiveDate;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use super::{calendar, ClientError, ScheduleClient};
use crate::models::{Event, EventDraft};
use crate::store::DeleteOutcome;

/// Фаза экрана расписания.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Submitting,
    Deleting,
    Fetching,
}

/// Сообщение, которое должен увидеть пользователь.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Блокирующее предупреждение (незаполненная форма).
    Alert(String),
    /// Сетевая ошибка или ошибка сервера.
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Title,
    Description,
    Start,
    End,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventForm {
    pub title: String,
    pub description: String,
    pub start: String,
    pub end: String,
}

impl EventForm {
    pub fn is_empty(&self) -> bool {
        self == &EventForm::default()
    }

    fn to_draft(&self) -> EventDraft {
        EventDraft::new(
            self.title.clone(),
            self.description.clone(),
            self.start.clone(),
            self.end.clone(),
        )
    }
}

/// Владелец всего состояния экрана расписания.
///
/// После каждой успешной мутации список перечитывается целиком.
/// Методы берут `&mut self`, поэтому у одного контроллера не бывает
/// двух запросов одновременно.
pub struct ScheduleController {
    client: ScheduleClient,
    events: Vec<Event>,
    form: EventForm,
    selected_date: NaiveDate,
    phase: Phase,
    notices: Vec<Notice>,
    observers: Vec<mpsc::UnboundedSender<Phase>>,
}

impl ScheduleController {
    pub fn new(client: ScheduleClient, today: NaiveDate) -> Self {
        Self {
            client,
            events: Vec::new(),
            form: EventForm::default(),
            selected_date: today,
            phase: Phase::Idle,
            notices: Vec::new(),
            observers: Vec::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn form(&self) -> &EventForm {
        &self.form
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Поток смен фаз для UI (спиннеры и т.п.).
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<Phase> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.observers.push(tx);
        rx
    }

    pub fn edit(&mut self, field: FormField, value: impl Into<String>) {
        let value = value.into();
        match field {
            FormField::Title => self.form.title = value,
            FormField::Description => self.form.description = value,
            FormField::Start => self.form.start = value,
            FormField::End => self.form.end = value,
        }
    }

    pub async fn mount(&mut self) {
        self.refresh().await;
    }

    /// Перечитывает список. При ошибке остаётся прежний список.
    pub async fn refresh(&mut self) {
        self.transition(Phase::Fetching);

        match self.client.list_events().await {
            Ok(events) => {
                debug!("Fetched {} events", events.len());
                self.events = events;
            }
            Err(e) => self.report("Error fetching events", &e),
        }

        self.transition(Phase::Idle);
    }

    /// Отправляет форму. Возвращает id нового события.
    pub async fn submit(&mut self) -> Option<i64> {
        let event = match self.form.to_draft().into_new_event() {
            Ok(event) => event,
            Err(e) => {
                debug!("Form rejected locally: {}", e);
                self.notices.push(Notice::Alert("All fields are required!".to_string()));
                return None;
            }
        };

        self.transition(Phase::Submitting);

        match self.client.create_event(&event).await {
            Ok(id) => {
                self.form = EventForm::default();
                self.refresh().await;
                Some(id)
            }
            Err(e) => {
                self.report("Error adding event", &e);
                self.transition(Phase::Idle);
                None
            }
        }
    }

    /// Удаляет событие. `NotFound` тоже ведёт к перечитыванию списка.
    pub async fn delete(&mut self, id: i64) -> Option<DeleteOutcome> {
        self.transition(Phase::Deleting);

        match self.client.delete_event(id).await {
            Ok(outcome) => {
                if outcome == DeleteOutcome::NotFound {
                    warn!("Event {} was already gone", id);
                }
                self.refresh().await;
                Some(outcome)
            }
            Err(e) => {
                self.report("Error deleting event", &e);
                self.transition(Phase::Idle);
                None
            }
        }
    }

    pub fn selected_date(&self) -> NaiveDate {
        self.selected_date
    }

    pub fn select_date(&mut self, date: NaiveDate) {
        self.selected_date = date;
    }

    /// События, начинающиеся в указанный день.
    pub fn events_on(&self, date: NaiveDate) -> Vec<&Event> {
        calendar::events_on(&self.events, date)
    }

    pub fn render_month(&self, year: i32, month: u32) -> Option<String> {
        calendar::render_month(year, month, &self.events, Some(self.selected_date))
    }

    fn transition(&mut self, phase: Phase) {
        self.phase = phase;
        self.observers.retain(|tx| tx.send(phase).is_ok());
    }

    fn report(&mut self, context: &str, err: &ClientError) {
        error!("{}: {}", context, err);
        self.notices.push(Notice::Error(format!("{}: {}", context, err)));
    }
}
