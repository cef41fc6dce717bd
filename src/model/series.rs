use serde::{Deserialize, Serialize};

/// Accent used when neither the backend nor the known series table has a color.
pub const DEFAULT_ACCENT_COLOR: &str = "#6366f1";

/// Series that classify entries in several simultaneous car categories.
const CLASS_BASED_SERIES: [&str; 2] = ["wec", "imsa"];

const KNOWN_SERIES: [(&str, &str, &str); 5] = [
    ("f1", "Formula 1", "#E10600"),
    ("wec", "WEC", "#00548F"),
    ("imsa", "IMSA", "#DA291C"),
    ("fe", "Formula E", "#00A3E0"),
    ("indycar", "IndyCar", "#1E3A6D"),
];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Series {
    pub id: i64,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub color_primary: Option<String>,
    #[serde(default)]
    pub color_secondary: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
}

impl Series {
    pub fn color(&self) -> String {
        resolve_series_color(&self.slug, self.color_primary.as_deref())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverStanding {
    pub position: u32,
    pub driver_name: String,
    #[serde(default)]
    pub driver_slug: Option<String>,
    #[serde(default)]
    pub driver_number: Option<u32>,
    #[serde(default)]
    pub team_name: String,
    #[serde(default)]
    pub team_color: Option<String>,
    #[serde(default)]
    pub class_name: Option<String>,
    pub points: f64,
    #[serde(default)]
    pub wins: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstructorStanding {
    pub position: u32,
    pub team_name: String,
    #[serde(default)]
    pub team_color: Option<String>,
    #[serde(default)]
    pub class_name: Option<String>,
    pub points: f64,
    #[serde(default)]
    pub wins: u32,
}

pub fn is_class_based_series(slug: &str) -> bool {
    CLASS_BASED_SERIES.contains(&slug)
}

pub fn series_display_name(slug: &str) -> Option<&'static str> {
    KNOWN_SERIES
        .iter()
        .find(|(known, _, _)| *known == slug)
        .map(|(_, name, _)| *name)
}

/// The series' own color when the backend sends one, else the known color for the slug.
pub fn resolve_series_color(slug: &str, primary: Option<&str>) -> String {
    if let Some(color) = primary.filter(|c| !c.trim().is_empty()) {
        return color.to_string();
    }
    KNOWN_SERIES
        .iter()
        .find(|(known, _, _)| *known == slug)
        .map(|(_, _, color)| *color)
        .unwrap_or(DEFAULT_ACCENT_COLOR)
        .to_string()
}
