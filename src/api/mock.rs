use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::Mutex,
    time::Duration,
};

use async_trait::async_trait;
use chrono::Datelike;

use crate::errors::PitwallError;
use crate::model::{
    AuthResponse, ConstructorStanding, DriverStanding, EventDetail, EventSummary, FeedItem,
    FeedPage, LapTelemetryPoint, RegisterRequest, ResultRow, Series, SessionId,
};

use super::PitwallApi;

/// The request kinds served by `PitwallApi`, used to script failures and count calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Event,
    Results,
    ResultClasses,
    Telemetry,
    Calendar,
    Seasons,
    SeriesList,
    Series,
    DriverStandings,
    ConstructorStandings,
    StandingClasses,
    Feed,
    Register,
}

#[derive(Default)]
struct MockState {
    /// Scripted event snapshots, `None` entries fail. The last entry keeps being served.
    events: VecDeque<Option<EventDetail>>,
    results: HashMap<(SessionId, Option<String>), Vec<ResultRow>>,
    result_classes: HashMap<SessionId, Vec<String>>,
    telemetry: HashMap<SessionId, Vec<LapTelemetryPoint>>,
    calendar: Vec<EventSummary>,
    seasons: HashMap<String, Vec<i32>>,
    series: Vec<Series>,
    driver_standings: HashMap<(String, i32, Option<String>), Vec<DriverStanding>>,
    constructor_standings: HashMap<(String, i32, Option<String>), Vec<ConstructorStanding>>,
    standing_classes: HashMap<(String, i32), Vec<String>>,
    feed: Vec<FeedItem>,
    registration: Option<Result<AuthResponse, String>>,
    failing: HashSet<Endpoint>,
    delays: HashMap<Endpoint, Duration>,
    calls: Vec<(Endpoint, Option<SessionId>, Option<String>)>,
}

/// A scripted backend for tests and offline use.
///
/// MockApi serves data registered up front (or while a test runs), records every call
/// it receives and can be told to fail or delay any endpoint. Delays use tokio's clock,
/// so they cooperate with a paused test runtime.
#[derive(Default)]
pub struct MockApi {
    state: Mutex<MockState>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        // a poisoned lock only means another test thread panicked, the data is still usable
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut state)
    }

    /// Queue event snapshots, served one per call. `None` makes that call fail.
    pub fn push_event(&self, event: Option<EventDetail>) {
        self.with_state(|s| s.events.push_back(event));
    }

    pub fn set_results(&self, session_id: SessionId, class_name: Option<&str>, rows: Vec<ResultRow>) {
        self.with_state(|s| {
            s.results
                .insert((session_id, class_name.map(str::to_string)), rows)
        });
    }

    pub fn set_result_classes(&self, session_id: SessionId, classes: Vec<String>) {
        self.with_state(|s| s.result_classes.insert(session_id, classes));
    }

    pub fn set_telemetry(&self, session_id: SessionId, points: Vec<LapTelemetryPoint>) {
        self.with_state(|s| s.telemetry.insert(session_id, points));
    }

    pub fn set_calendar(&self, events: Vec<EventSummary>) {
        self.with_state(|s| s.calendar = events);
    }

    pub fn set_seasons(&self, series: &str, years: Vec<i32>) {
        self.with_state(|s| s.seasons.insert(series.to_string(), years));
    }

    pub fn set_series(&self, series: Vec<Series>) {
        self.with_state(|s| s.series = series);
    }

    pub fn set_driver_standings(
        &self,
        series: &str,
        year: i32,
        class_name: Option<&str>,
        standings: Vec<DriverStanding>,
    ) {
        self.with_state(|s| {
            s.driver_standings.insert(
                (series.to_string(), year, class_name.map(str::to_string)),
                standings,
            )
        });
    }

    pub fn set_constructor_standings(
        &self,
        series: &str,
        year: i32,
        class_name: Option<&str>,
        standings: Vec<ConstructorStanding>,
    ) {
        self.with_state(|s| {
            s.constructor_standings.insert(
                (series.to_string(), year, class_name.map(str::to_string)),
                standings,
            )
        });
    }

    pub fn set_standing_classes(&self, series: &str, year: i32, classes: Vec<String>) {
        self.with_state(|s| s.standing_classes.insert((series.to_string(), year), classes));
    }

    pub fn set_feed(&self, items: Vec<FeedItem>) {
        self.with_state(|s| s.feed = items);
    }

    /// `Err(message)` makes registration answer like a backend rejecting the account.
    pub fn set_registration(&self, outcome: Result<AuthResponse, String>) {
        self.with_state(|s| s.registration = Some(outcome));
    }

    pub fn fail(&self, endpoint: Endpoint) {
        self.with_state(|s| s.failing.insert(endpoint));
    }

    pub fn recover(&self, endpoint: Endpoint) {
        self.with_state(|s| s.failing.remove(&endpoint));
    }

    pub fn delay(&self, endpoint: Endpoint, delay: Duration) {
        self.with_state(|s| s.delays.insert(endpoint, delay));
    }

    pub fn calls(&self, endpoint: Endpoint) -> usize {
        self.with_state(|s| s.calls.iter().filter(|(e, _, _)| *e == endpoint).count())
    }

    pub fn total_calls(&self) -> usize {
        self.with_state(|s| s.calls.len())
    }

    /// Session and class arguments of every results request, in call order.
    pub fn result_requests(&self) -> Vec<(SessionId, Option<String>)> {
        self.with_state(|s| {
            s.calls
                .iter()
                .filter(|(e, _, _)| *e == Endpoint::Results)
                .filter_map(|(_, session, class)| session.map(|id| (id, class.clone())))
                .collect()
        })
    }

    /// Records the call, waits for the scripted delay and reports whether it should fail.
    async fn enter(
        &self,
        endpoint: Endpoint,
        session_id: Option<SessionId>,
        class_name: Option<&str>,
    ) -> Result<(), PitwallError> {
        let delay = self.with_state(|s| {
            s.calls
                .push((endpoint, session_id, class_name.map(str::to_string)));
            s.delays.get(&endpoint).copied()
        });
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.with_state(|s| s.failing.contains(&endpoint)) {
            return Err(PitwallError::HttpStatus {
                status: 503,
                path: format!("{:?}", endpoint),
            });
        }
        Ok(())
    }
}

fn not_found(what: &str) -> PitwallError {
    PitwallError::HttpStatus {
        status: 404,
        path: what.to_string(),
    }
}

#[async_trait]
impl PitwallApi for MockApi {
    async fn event(&self, slug: &str) -> Result<EventDetail, PitwallError> {
        self.enter(Endpoint::Event, None, None).await?;
        let next = self.with_state(|s| {
            if s.events.len() > 1 {
                s.events.pop_front().flatten()
            } else {
                s.events.front().cloned().flatten()
            }
        });
        next.ok_or_else(|| not_found(&format!("/api/events/{}", slug)))
    }

    async fn results(
        &self,
        _slug: &str,
        session_id: SessionId,
        class_name: Option<&str>,
    ) -> Result<Vec<ResultRow>, PitwallError> {
        self.enter(Endpoint::Results, Some(session_id), class_name)
            .await?;
        Ok(self.with_state(|s| {
            s.results
                .get(&(session_id, class_name.map(str::to_string)))
                .cloned()
                .unwrap_or_default()
        }))
    }

    async fn result_classes(
        &self,
        _slug: &str,
        session_id: SessionId,
    ) -> Result<Vec<String>, PitwallError> {
        self.enter(Endpoint::ResultClasses, Some(session_id), None)
            .await?;
        Ok(self.with_state(|s| {
            s.result_classes
                .get(&session_id)
                .cloned()
                .unwrap_or_default()
        }))
    }

    async fn telemetry(
        &self,
        _slug: &str,
        session_id: SessionId,
    ) -> Result<Vec<LapTelemetryPoint>, PitwallError> {
        self.enter(Endpoint::Telemetry, Some(session_id), None)
            .await?;
        Ok(self.with_state(|s| s.telemetry.get(&session_id).cloned().unwrap_or_default()))
    }

    async fn calendar(
        &self,
        series: Option<&str>,
        year: Option<i32>,
    ) -> Result<Vec<EventSummary>, PitwallError> {
        self.enter(Endpoint::Calendar, None, None).await?;
        Ok(self.with_state(|s| {
            s.calendar
                .iter()
                .filter(|e| series.is_none_or(|slug| e.series_slug == slug))
                .filter(|e| year.is_none_or(|y| e.start_date.year() == y))
                .cloned()
                .collect()
        }))
    }

    async fn seasons(&self, series: &str) -> Result<Vec<i32>, PitwallError> {
        self.enter(Endpoint::Seasons, None, None).await?;
        Ok(self.with_state(|s| s.seasons.get(series).cloned().unwrap_or_default()))
    }

    async fn series_list(&self) -> Result<Vec<Series>, PitwallError> {
        self.enter(Endpoint::SeriesList, None, None).await?;
        Ok(self.with_state(|s| s.series.clone()))
    }

    async fn series(&self, slug: &str) -> Result<Series, PitwallError> {
        self.enter(Endpoint::Series, None, None).await?;
        self.with_state(|s| s.series.iter().find(|series| series.slug == slug).cloned())
            .ok_or_else(|| not_found(&format!("/api/series/{}", slug)))
    }

    async fn driver_standings(
        &self,
        series: &str,
        year: i32,
        class_name: Option<&str>,
    ) -> Result<Vec<DriverStanding>, PitwallError> {
        self.enter(Endpoint::DriverStandings, None, class_name)
            .await?;
        Ok(self.with_state(|s| {
            s.driver_standings
                .get(&(series.to_string(), year, class_name.map(str::to_string)))
                .cloned()
                .unwrap_or_default()
        }))
    }

    async fn constructor_standings(
        &self,
        series: &str,
        year: i32,
        class_name: Option<&str>,
    ) -> Result<Vec<ConstructorStanding>, PitwallError> {
        self.enter(Endpoint::ConstructorStandings, None, class_name)
            .await?;
        Ok(self.with_state(|s| {
            s.constructor_standings
                .get(&(series.to_string(), year, class_name.map(str::to_string)))
                .cloned()
                .unwrap_or_default()
        }))
    }

    async fn standing_classes(
        &self,
        series: &str,
        year: i32,
    ) -> Result<Vec<String>, PitwallError> {
        self.enter(Endpoint::StandingClasses, None, None).await?;
        Ok(self.with_state(|s| {
            s.standing_classes
                .get(&(series.to_string(), year))
                .cloned()
                .unwrap_or_default()
        }))
    }

    async fn feed(
        &self,
        page: u32,
        size: u32,
        series: Option<&str>,
    ) -> Result<FeedPage, PitwallError> {
        self.enter(Endpoint::Feed, None, None).await?;
        Ok(self.with_state(|s| {
            let matching: Vec<&FeedItem> = s
                .feed
                .iter()
                .filter(|item| series.is_none_or(|slug| item.series_slug.as_deref() == Some(slug)))
                .collect();
            let size = size.max(1) as usize;
            let total_elements = matching.len();
            FeedPage {
                content: matching
                    .into_iter()
                    .skip(page as usize * size)
                    .take(size)
                    .cloned()
                    .collect(),
                total_pages: total_elements.div_ceil(size) as u32,
                total_elements: total_elements as u64,
                number: page,
            }
        }))
    }

    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, PitwallError> {
        if self.enter(Endpoint::Register, None, None).await.is_err() {
            return Err(PitwallError::RegistrationUnavailable);
        }
        match self.with_state(|s| s.registration.clone()) {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(PitwallError::RegistrationRejected { message }),
            None => Ok(AuthResponse {
                token: format!("mock-token-{}", request.email),
                email: request.email.clone(),
                display_name: request.display_name.clone(),
            }),
        }
    }
}
