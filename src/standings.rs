//! Series pages: series metadata, seasons and championship standings.

use log::warn;

use crate::api::PitwallApi;
use crate::errors::PitwallError;
use crate::model::{ConstructorStanding, DriverStanding, EventSummary, Series, is_class_based_series};

const RECENT_EVENTS: usize = 8;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SeriesContext {
    pub series: Option<Series>,
    /// Seasons as returned by the backend, the first one is the default
    pub years: Vec<i32>,
    pub selected_year: Option<i32>,
}

/// Series metadata and its seasons, fetched together. If either request fails the
/// context is empty.
pub async fn load_series_context(api: &dyn PitwallApi, slug: &str) -> SeriesContext {
    match tokio::try_join!(api.series(slug), api.seasons(slug)) {
        Ok((series, years)) => SeriesContext {
            series: Some(series),
            selected_year: years.first().copied(),
            years,
        },
        Err(e) => {
            warn!("Could not load series {}: {}", slug, e);
            SeriesContext::default()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SeasonStandings {
    pub classes: Vec<String>,
    pub selected_class: Option<String>,
    pub drivers: Vec<DriverStanding>,
    pub constructors: Vec<ConstructorStanding>,
    pub events: Vec<EventSummary>,
}

impl SeasonStandings {
    /// The last completed events of the season, most recent first.
    pub fn recent_completed_events(&self) -> Vec<&EventSummary> {
        recent_completed_events(&self.events)
    }
}

/// Class the standings are shown for: none for single class series or when the season
/// has no classes, the requested one when it exists, the first class otherwise.
pub fn choose_class(slug: &str, classes: &[String], requested: Option<&str>) -> Option<String> {
    if !is_class_based_series(slug) || classes.is_empty() {
        return None;
    }
    requested
        .filter(|class| classes.iter().any(|c| c == class))
        .map(str::to_string)
        .or_else(|| classes.first().cloned())
}

async fn try_load_season(
    api: &dyn PitwallApi,
    slug: &str,
    year: i32,
    requested_class: Option<&str>,
) -> Result<SeasonStandings, PitwallError> {
    let (classes, events) = tokio::try_join!(
        api.standing_classes(slug, year),
        api.calendar(Some(slug), Some(year)),
    )?;
    let selected_class = choose_class(slug, &classes, requested_class);
    let (drivers, constructors) = tokio::try_join!(
        api.driver_standings(slug, year, selected_class.as_deref()),
        api.constructor_standings(slug, year, selected_class.as_deref()),
    )?;
    Ok(SeasonStandings {
        classes,
        selected_class,
        drivers,
        constructors,
        events,
    })
}

/// Standings of one season. Any failing request empties the whole page.
pub async fn load_season_standings(
    api: &dyn PitwallApi,
    slug: &str,
    year: i32,
    requested_class: Option<&str>,
) -> SeasonStandings {
    try_load_season(api, slug, year, requested_class)
        .await
        .unwrap_or_else(|e| {
            warn!("Could not load {} {} standings: {}", slug, year, e);
            SeasonStandings::default()
        })
}

pub fn recent_completed_events(events: &[EventSummary]) -> Vec<&EventSummary> {
    let completed: Vec<&EventSummary> = events.iter().filter(|e| e.status.is_completed()).collect();
    completed
        .iter()
        .rev()
        .take(RECENT_EVENTS)
        .copied()
        .collect()
}
