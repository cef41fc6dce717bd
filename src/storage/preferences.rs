use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::PitwallError;

use super::{KeyValueStore, PREFERENCES_KEY, get_json, set_json};

pub const DEFAULT_FOLLOWED_SERIES: [&str; 2] = ["f1", "wec"];

/// Which series the user follows and how they want to be notified.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub followed_series: Vec<String>,
    pub email_notifications: bool,
    pub browser_notifications: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            followed_series: DEFAULT_FOLLOWED_SERIES.iter().map(|s| s.to_string()).collect(),
            email_notifications: true,
            browser_notifications: false,
        }
    }
}

impl Preferences {
    /// Load from the store. Missing or malformed fields take their default value, a
    /// stored value that is not an object yields the defaults altogether.
    pub fn load(store: &dyn KeyValueStore) -> Result<Self, PitwallError> {
        let stored: Option<Value> = get_json(store, PREFERENCES_KEY)?;
        Ok(stored.map(Self::from_value).unwrap_or_default())
    }

    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<(), PitwallError> {
        set_json(store, PREFERENCES_KEY, self)
    }

    fn from_value(value: Value) -> Self {
        let defaults = Self::default();
        let Value::Object(fields) = value else {
            return defaults;
        };
        let followed_series = match fields.get("followedSeries") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect(),
            _ => defaults.followed_series,
        };
        Self {
            followed_series,
            email_notifications: fields
                .get("emailNotifications")
                .and_then(Value::as_bool)
                .unwrap_or(defaults.email_notifications),
            browser_notifications: fields
                .get("browserNotifications")
                .and_then(Value::as_bool)
                .unwrap_or(defaults.browser_notifications),
        }
    }

    pub fn follows(&self, slug: &str) -> bool {
        self.followed_series.iter().any(|s| s == slug)
    }

    /// Follow `slug` if it is not followed yet, unfollow it otherwise. Returns whether
    /// the series is followed afterwards.
    pub fn toggle_series(&mut self, slug: &str) -> bool {
        if self.follows(slug) {
            self.followed_series.retain(|s| s != slug);
            false
        } else {
            self.followed_series.push(slug.to_string());
            true
        }
    }

    pub fn toggle_email_notifications(&mut self) -> bool {
        self.email_notifications = !self.email_notifications;
        self.email_notifications
    }

    pub fn toggle_browser_notifications(&mut self) -> bool {
        self.browser_notifications = !self.browser_notifications;
        self.browser_notifications
    }
}
