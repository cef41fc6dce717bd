//! Season calendar listing.

use chrono::NaiveDate;

use crate::api::{PitwallApi, or_empty};
use crate::model::EventSummary;

/// Events for an optional series and year. A failed request reads as an empty calendar.
pub async fn load_calendar(
    api: &dyn PitwallApi,
    series: Option<&str>,
    year: Option<i32>,
) -> Vec<EventSummary> {
    or_empty(api.calendar(series, year).await, "calendar")
}

/// `"September 2025"` style label of the month an event starts in.
pub fn month_label(date: NaiveDate) -> String {
    date.format("%B %Y").to_string()
}

/// Events grouped by start month. Groups keep the order in which their month is first
/// seen, events keep their order within a group.
pub fn group_by_month(events: &[EventSummary]) -> Vec<(String, Vec<&EventSummary>)> {
    let mut groups: Vec<(String, Vec<&EventSummary>)> = Vec::new();
    for event in events {
        let label = month_label(event.start_date);
        match groups.iter_mut().find(|(existing, _)| *existing == label) {
            Some((_, group)) => group.push(event),
            None => groups.push((label, vec![event])),
        }
    }
    groups
}
