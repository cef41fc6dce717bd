pub mod http;
pub mod mock;

use async_trait::async_trait;

use crate::errors::PitwallError;
use crate::model::{
    AuthResponse, ConstructorStanding, DriverStanding, EventDetail, EventSummary, FeedPage,
    LapTelemetryPoint, RegisterRequest, ResultRow, Series, SessionId,
};

pub use http::HttpApi;
pub use mock::{Endpoint, MockApi};

/// Typed access to the Pitwall REST backend.
///
/// Every read maps to exactly one GET request: no retries, no caching and no batching
/// happen behind this trait. Callers decide how a failure degrades, in practice read
/// paths turn errors into empty collections.
///
/// The trait is the seam between the live event logic and the network, `HttpApi` talks
/// to a real backend while `MockApi` serves scripted data for tests.
#[async_trait]
pub trait PitwallApi: Send + Sync {
    /// `GET /api/events/{slug}`
    async fn event(&self, slug: &str) -> Result<EventDetail, PitwallError>;

    /// `GET /api/events/{slug}/results?sessionId=&className=`
    async fn results(
        &self,
        slug: &str,
        session_id: SessionId,
        class_name: Option<&str>,
    ) -> Result<Vec<ResultRow>, PitwallError>;

    /// `GET /api/events/{slug}/result-classes?sessionId=`
    async fn result_classes(
        &self,
        slug: &str,
        session_id: SessionId,
    ) -> Result<Vec<String>, PitwallError>;

    /// `GET /api/events/{slug}/telemetry?sessionId=`
    async fn telemetry(
        &self,
        slug: &str,
        session_id: SessionId,
    ) -> Result<Vec<LapTelemetryPoint>, PitwallError>;

    /// `GET /api/calendar?series=&year=`
    async fn calendar(
        &self,
        series: Option<&str>,
        year: Option<i32>,
    ) -> Result<Vec<EventSummary>, PitwallError>;

    /// `GET /api/calendar/seasons?series=`
    async fn seasons(&self, series: &str) -> Result<Vec<i32>, PitwallError>;

    /// `GET /api/series`
    async fn series_list(&self) -> Result<Vec<Series>, PitwallError>;

    /// `GET /api/series/{slug}`
    async fn series(&self, slug: &str) -> Result<Series, PitwallError>;

    /// `GET /api/series/{slug}/standings?year=&className=`
    async fn driver_standings(
        &self,
        series: &str,
        year: i32,
        class_name: Option<&str>,
    ) -> Result<Vec<DriverStanding>, PitwallError>;

    /// `GET /api/series/{slug}/constructors?year=&className=`
    async fn constructor_standings(
        &self,
        series: &str,
        year: i32,
        class_name: Option<&str>,
    ) -> Result<Vec<ConstructorStanding>, PitwallError>;

    /// `GET /api/series/{slug}/classes?year=`
    async fn standing_classes(&self, series: &str, year: i32)
    -> Result<Vec<String>, PitwallError>;

    /// `GET /api/feed?page=&size=&series=`
    async fn feed(
        &self,
        page: u32,
        size: u32,
        series: Option<&str>,
    ) -> Result<FeedPage, PitwallError>;

    /// `POST /api/auth/register`
    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, PitwallError>;
}

/// Collapses a failed read into the type's empty value, logging what was lost.
pub fn or_empty<T: Default>(result: Result<T, PitwallError>, what: &str) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            log::warn!("Could not load {}: {}", what, e);
            T::default()
        }
    }
}
