use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FeedItemType {
    RaceResult,
    Preview,
    Highlight,
    Analysis,
    Other(String),
}

impl FeedItemType {
    pub fn as_str(&self) -> &str {
        match self {
            FeedItemType::RaceResult => "race_result",
            FeedItemType::Preview => "preview",
            FeedItemType::Highlight => "highlight",
            FeedItemType::Analysis => "analysis",
            FeedItemType::Other(value) => value,
        }
    }

    /// Short marker printed in front of the item title.
    pub fn icon(&self) -> Option<&'static str> {
        match self {
            FeedItemType::RaceResult => Some("[result]"),
            FeedItemType::Preview => Some("[preview]"),
            FeedItemType::Highlight => Some("[video]"),
            FeedItemType::Analysis => Some("[analysis]"),
            FeedItemType::Other(_) => None,
        }
    }

    /// Race results and highlights are rendered with emphasis.
    pub fn is_emphasized(&self) -> bool {
        matches!(self, FeedItemType::RaceResult | FeedItemType::Highlight)
    }
}

impl From<String> for FeedItemType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "race_result" => FeedItemType::RaceResult,
            "preview" => FeedItemType::Preview,
            "highlight" => FeedItemType::Highlight,
            "analysis" => FeedItemType::Analysis,
            _ => FeedItemType::Other(value),
        }
    }
}

impl From<FeedItemType> for String {
    fn from(value: FeedItemType) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
    pub id: i64,
    #[serde(rename = "type")]
    pub item_type: FeedItemType,
    #[serde(default)]
    pub series_slug: Option<String>,
    #[serde(default)]
    pub series_name: Option<String>,
    #[serde(default)]
    pub series_color: Option<String>,
    #[serde(default)]
    pub event_id: Option<i64>,
    #[serde(default)]
    pub event_slug: Option<String>,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub content_url: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    pub published_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeedPage {
    pub content: Vec<FeedItem>,
    pub total_pages: u32,
    pub total_elements: u64,
    pub number: u32,
}
