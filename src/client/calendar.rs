use chrono::{Datelike, Month, NaiveDate};
use std::collections::BTreeSet;

use crate::models::{parse_timestamp, Event};

const WEEKDAYS: [&str; 7] = ["Mo", "Tu", "We", "Th", "Fr", "Sa", "Su"];

/// День начала события, если `start` удалось разобрать.
pub fn event_date(event: &Event) -> Option<NaiveDate> {
    parse_timestamp(&event.start).map(|dt| dt.date())
}

pub fn events_on(events: &[Event], date: NaiveDate) -> Vec<&Event> {
    events
        .iter()
        .filter(|event| event_date(event) == Some(date))
        .collect()
}

/// Текстовая сетка месяца, неделя с понедельника.
///
/// Ячейка занимает четыре символа: `>` перед выбранным днём, `*` после дня
/// с событиями. `None` для несуществующего месяца.
pub fn render_month(
    year: i32,
    month: u32,
    events: &[Event],
    selected: Option<NaiveDate>,
) -> Option<String> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    let name = Month::try_from(month as u8).ok()?.name();

    let busy: BTreeSet<NaiveDate> = events.iter().filter_map(event_date).collect();

    let mut lines = vec![
        format!("{} {}", name, year),
        WEEKDAYS
            .iter()
            .map(|d| format!(" {} ", d))
            .collect::<String>()
            .trim_end()
            .to_string(),
    ];

    let mut week = "    ".repeat(first.weekday().num_days_from_monday() as usize);
    for date in first.iter_days().take_while(|d| *d < next) {
        let marker_left = if Some(date) == selected { '>' } else { ' ' };
        let marker_right = if busy.contains(&date) { '*' } else { ' ' };
        week.push_str(&format!("{}{:>2}{}", marker_left, date.day(), marker_right));

        if date.weekday().num_days_from_monday() == 6 {
            lines.push(week.trim_end().to_string());
            week.clear();
        }
    }
    if !week.trim().is_empty() {
        lines.push(week.trim_end().to_string());
    }

    Some(lines.join("\n"))
}
