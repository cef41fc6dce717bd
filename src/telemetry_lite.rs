//! Per-driver lap summaries built from the lap telemetry of one session.

use itertools::Itertools;

use crate::model::LapTelemetryPoint;

const UNKNOWN_DRIVER: &str = "Unknown";
const DEFAULT_TEAM_COLOR: &str = "#4D4D4D";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DriverOption {
    /// `carNumber|driverName`
    pub key: String,
    pub label: String,
    pub team_color: String,
}

fn driver_name(point: &LapTelemetryPoint) -> &str {
    point
        .driver_name
        .as_deref()
        .filter(|name| !name.is_empty())
        .unwrap_or(UNKNOWN_DRIVER)
}

fn driver_key(point: &LapTelemetryPoint) -> String {
    format!("{}|{}", point.car_number, driver_name(point))
}

/// One option per car and driver pairing, in the order they first appear.
pub fn driver_options(telemetry: &[LapTelemetryPoint]) -> Vec<DriverOption> {
    telemetry
        .iter()
        .unique_by(|point| driver_key(point))
        .map(|point| DriverOption {
            key: driver_key(point),
            label: format!("{} (#{})", driver_name(point), point.car_number),
            team_color: point
                .team_color
                .clone()
                .unwrap_or_else(|| DEFAULT_TEAM_COLOR.to_string()),
        })
        .collect()
}

/// Laps of the driver identified by `key`, ordered by lap number.
pub fn driver_laps<'a>(telemetry: &'a [LapTelemetryPoint], key: &str) -> Vec<&'a LapTelemetryPoint> {
    telemetry
        .iter()
        .filter(|point| driver_key(point) == key)
        .sorted_by_key(|point| point.lap_number)
        .collect()
}

/// `SS.sss` or `M:SS.sss` into seconds.
pub fn parse_lap_time(value: Option<&str>) -> Option<f64> {
    let value = value?.trim();
    // a lap time never has a sign, in either part
    if value.is_empty() || value.contains('-') {
        return None;
    }
    let seconds = match value.split(':').collect::<Vec<_>>().as_slice() {
        [seconds] => seconds.parse::<f64>().ok()?,
        [minutes, seconds] => minutes.parse::<f64>().ok()? * 60. + seconds.parse::<f64>().ok()?,
        _ => return None,
    };
    (seconds.is_finite() && seconds >= 0.).then_some(seconds)
}

/// `M:SS.sss`
pub fn format_lap_time(seconds: f64) -> String {
    let minutes = (seconds / 60.).floor();
    format!("{}:{:06.3}", minutes as u64, seconds - minutes * 60.)
}

/// Headline numbers for one driver.
#[derive(Clone, Debug, PartialEq)]
pub struct DriverSummary {
    pub laps: usize,
    pub best_lap_seconds: Option<f64>,
    pub last_position: Option<u32>,
    pub top_speed_kph: Option<String>,
    /// `(lap, seconds)` for every lap with a readable time
    pub lap_times: Vec<(u32, f64)>,
}

impl DriverSummary {
    pub fn best_lap(&self) -> Option<String> {
        self.best_lap_seconds.map(format_lap_time)
    }
}

pub fn summarize(laps: &[&LapTelemetryPoint]) -> DriverSummary {
    let lap_times: Vec<(u32, f64)> = laps
        .iter()
        .filter_map(|point| {
            parse_lap_time(point.lap_time.as_deref()).map(|seconds| (point.lap_number, seconds))
        })
        .collect();
    let latest = laps.last();
    DriverSummary {
        laps: laps.len(),
        best_lap_seconds: lap_times.iter().map(|(_, seconds)| *seconds).reduce(f64::min),
        last_position: latest.and_then(|point| point.position),
        top_speed_kph: latest
            .and_then(|point| point.top_speed_kph.clone())
            .filter(|speed| !speed.is_empty()),
        lap_times,
    }
}

/// Keep `current` if it is still offered, otherwise fall back to the first option.
pub fn resolve_selected_driver(options: &[DriverOption], current: Option<&str>) -> Option<String> {
    current
        .filter(|key| options.iter().any(|option| option.key == *key))
        .map(str::to_string)
        .or_else(|| options.first().map(|option| option.key.clone()))
}
