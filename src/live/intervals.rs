//! Gap to the car ahead within one class.
//!
//! The backend gap column is relative to the overall leader, which is meaningless once
//! the results are filtered down to one class of a multi-class race. The intervals here
//! are recomputed from the classified rows themselves, in this order of preference:
//! lap deficit, time difference, the backend gap, nothing.

use itertools::Itertools;

use crate::model::{ResultRow, is_class_based_series};

/// Parse a timing string into seconds.
///
/// Accepts an optional leading `+` followed by `SS`, `MM:SS` or `H:MM:SS`, each with an
/// optional decimal fraction on the last component. Anything else, in particular status
/// words like `DNF` or `1 LAP`, yields `None`.
pub fn parse_timing_to_seconds(raw: Option<&str>) -> Option<f64> {
    let trimmed = raw?.trim();
    let cleaned = trimmed.strip_prefix('+').unwrap_or(trimmed);
    if cleaned.is_empty() || cleaned.chars().any(char::is_alphabetic) {
        return None;
    }

    let (whole, fraction) = match cleaned.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (cleaned, None),
    };
    if let Some(fraction) = fraction {
        if !is_digits(fraction) {
            return None;
        }
    }

    let parts: Vec<&str> = whole.split(':').collect();
    if parts.len() > 3 || !parts.iter().all(|p| is_digits(p)) {
        return None;
    }

    let mut components = parts
        .iter()
        .map(|p| p.parse::<f64>())
        .collect::<Result<Vec<f64>, _>>()
        .ok()?;
    if let (Some(fraction), Some(last)) = (fraction, components.last_mut()) {
        *last = format!("{}.{}", parts[parts.len() - 1], fraction)
            .parse::<f64>()
            .ok()?;
    }

    Some(components.iter().fold(0., |acc, c| acc * 60. + c))
}

fn is_digits(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

/// `+M:SS.sss` from one minute upwards, `+S.sss` below. Negative or non finite input
/// renders as an empty string.
pub fn format_interval_seconds(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0. {
        return String::new();
    }
    if seconds >= 60. {
        let minutes = (seconds / 60.).floor();
        let remainder = seconds - minutes * 60.;
        format!("+{}:{:06.3}", minutes as u64, remainder)
    } else {
        format!("+{:.3}", seconds)
    }
}

/// Interval of `current` to the row classified right ahead of it.
fn interval_to_car_ahead(previous: &ResultRow, current: &ResultRow) -> String {
    if let (Some(previous_laps), Some(current_laps)) = (previous.laps, current.laps) {
        if current_laps < previous_laps {
            return format!("+{}L", previous_laps - current_laps);
        }
    }

    let current_seconds = parse_timing_to_seconds(current.time.as_deref());
    let previous_seconds = parse_timing_to_seconds(previous.time.as_deref());
    if let (Some(current_seconds), Some(previous_seconds)) = (current_seconds, previous_seconds) {
        if current_seconds >= previous_seconds {
            return format_interval_seconds(current_seconds - previous_seconds);
        }
    }

    current.gap.clone().unwrap_or_default()
}

/// One interval per row of a position ordered, single class result list. The class
/// leader always gets an empty interval.
pub fn compute_class_intervals(rows: &[ResultRow]) -> Vec<String> {
    if rows.is_empty() {
        return Vec::new();
    }
    std::iter::once(String::new())
        .chain(
            rows.iter()
                .tuple_windows()
                .map(|(previous, current)| interval_to_car_ahead(previous, current)),
        )
        .collect()
}

/// The gap column as displayed: class intervals for a class-filtered view of a
/// multi-class series, the backend gap otherwise.
pub fn display_gaps(
    rows: &[ResultRow],
    series_slug: &str,
    selected_class: Option<&str>,
) -> Vec<Option<String>> {
    if is_class_based_series(series_slug) && selected_class.is_some() {
        compute_class_intervals(rows).into_iter().map(Some).collect()
    } else {
        rows.iter().map(|r| r.gap.clone()).collect()
    }
}
