pub mod feed;
pub mod series;

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub use feed::{FeedItem, FeedItemType, FeedPage};
pub use series::{ConstructorStanding, DriverStanding, Series, is_class_based_series};

pub type SessionId = i64;

/// Lifecycle shared by events and sessions.
///
/// Values the client does not know about are kept verbatim in `Other` so a new backend
/// status never fails the whole payload.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LifecycleStatus {
    Upcoming,
    Live,
    Completed,
    Other(String),
}

impl LifecycleStatus {
    pub fn is_live(&self) -> bool {
        matches!(self, LifecycleStatus::Live)
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, LifecycleStatus::Completed)
    }

    pub fn as_str(&self) -> &str {
        match self {
            LifecycleStatus::Upcoming => "upcoming",
            LifecycleStatus::Live => "live",
            LifecycleStatus::Completed => "completed",
            LifecycleStatus::Other(value) => value,
        }
    }
}

impl From<String> for LifecycleStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "upcoming" => LifecycleStatus::Upcoming,
            "live" => LifecycleStatus::Live,
            "completed" => LifecycleStatus::Completed,
            _ => LifecycleStatus::Other(value),
        }
    }
}

impl From<LifecycleStatus> for String {
    fn from(value: LifecycleStatus) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleStatus::Live => write!(f, "LIVE"),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SessionType {
    Practice,
    Qualifying,
    Sprint,
    Race,
    Warmup,
    Other(String),
}

impl SessionType {
    pub fn as_str(&self) -> &str {
        match self {
            SessionType::Practice => "practice",
            SessionType::Qualifying => "qualifying",
            SessionType::Sprint => "sprint",
            SessionType::Race => "race",
            SessionType::Warmup => "warmup",
            SessionType::Other(value) => value,
        }
    }

    /// Human readable label, `None` for types the client has no label for.
    pub fn label(&self) -> Option<&'static str> {
        match self {
            SessionType::Practice => Some("Practice"),
            SessionType::Qualifying => Some("Qualifying"),
            SessionType::Sprint => Some("Sprint"),
            SessionType::Race => Some("Race"),
            SessionType::Warmup => Some("Warm Up"),
            SessionType::Other(_) => None,
        }
    }
}

impl From<String> for SessionType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "practice" => SessionType::Practice,
            "qualifying" => SessionType::Qualifying,
            "sprint" => SessionType::Sprint,
            "race" => SessionType::Race,
            "warmup" => SessionType::Warmup,
            _ => SessionType::Other(value),
        }
    }
}

impl From<SessionType> for String {
    fn from(value: SessionType) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: SessionId,
    #[serde(rename = "type")]
    pub session_type: SessionType,
    pub name: String,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    pub status: LifecycleStatus,
}

impl Session {
    /// Label used on result tabs: the type label, falling back to the session name.
    pub fn tab_label(&self) -> &str {
        self.session_type.label().unwrap_or(self.name.as_str())
    }

    /// Label used on the schedule: the session name, falling back to the type label.
    pub fn schedule_label(&self) -> &str {
        if self.name.is_empty() {
            self.session_type.label().unwrap_or(self.session_type.as_str())
        } else {
            &self.name
        }
    }

    /// True when any field shown to the user differs from `other`.
    pub fn differs_from(&self, other: &Session) -> bool {
        self.status != other.status
            || self.name != other.name
            || self.start_time != other.start_time
            || self.end_time != other.end_time
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Circuit {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub track_map_url: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
}

/// A race weekend with its full session schedule.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDetail {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub series: Series,
    pub circuit: Circuit,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: LifecycleStatus,
    #[serde(default)]
    pub sessions: Vec<Session>,
}

impl EventDetail {
    pub fn session(&self, id: SessionId) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    /// Sessions that carry results, in schedule order.
    pub fn result_sessions(&self) -> impl Iterator<Item = &Session> {
        self.sessions
            .iter()
            .filter(|s| s.session_type != SessionType::Practice)
    }

    /// Whether the results tab for `session` can be opened. Practice sessions have no
    /// results tab.
    pub fn is_session_selectable(&self, session: &Session) -> bool {
        session.session_type != SessionType::Practice
            && (session.status.is_completed() || self.status.is_live())
    }

    pub fn race_session(&self) -> Option<&Session> {
        self.sessions
            .iter()
            .find(|s| s.session_type == SessionType::Race)
    }
}

/// Calendar listing entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub series_slug: String,
    pub series_name: String,
    #[serde(default)]
    pub series_color: Option<String>,
    #[serde(default)]
    pub circuit_name: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub city: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: LifecycleStatus,
}

/// One classified entry of a session, ordered by `position`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRow {
    #[serde(default)]
    pub id: i64,
    pub position: u32,
    pub driver_name: String,
    #[serde(default)]
    pub driver_number: Option<u32>,
    #[serde(default)]
    pub team_name: String,
    #[serde(default)]
    pub team_color: Option<String>,
    #[serde(default)]
    pub class_name: Option<String>,
    /// Finishing time for the leader, gap or total time for the others
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub laps: Option<u32>,
    #[serde(default)]
    pub gap: Option<String>,
    #[serde(default)]
    pub status: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LapTelemetryPoint {
    #[serde(default)]
    pub id: i64,
    pub lap_number: u32,
    #[serde(default)]
    pub position: Option<u32>,
    pub car_number: String,
    #[serde(default)]
    pub driver_name: Option<String>,
    #[serde(default)]
    pub driver_number: Option<u32>,
    #[serde(default)]
    pub team_name: Option<String>,
    #[serde(default)]
    pub team_color: Option<String>,
    #[serde(default)]
    pub lap_time: Option<String>,
    #[serde(default)]
    pub sector1_time: Option<String>,
    #[serde(default)]
    pub sector2_time: Option<String>,
    #[serde(default)]
    pub sector3_time: Option<String>,
    #[serde(default)]
    pub sector4_time: Option<String>,
    #[serde(default)]
    pub average_speed_kph: Option<String>,
    #[serde(default)]
    pub top_speed_kph: Option<String>,
    #[serde(default)]
    pub session_elapsed: Option<String>,
    #[serde(default)]
    pub lap_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_valid: Option<bool>,
    #[serde(default)]
    pub crossing_pit_finish_lane: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub email: String,
    pub display_name: String,
}

/// Minimal profile kept on the device after registration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub email: String,
    pub display_name: String,
}
