pub mod event;

pub use event::{parse_timestamp, Event, EventDraft, NewEvent, ValidationError};
