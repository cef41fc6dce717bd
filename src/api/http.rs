use async_trait::async_trait;
use log::debug;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, de::DeserializeOwned};
use snafu::ResultExt;

use crate::errors::{HttpDecodeSnafu, HttpTransportSnafu, PitwallError};
use crate::model::{
    AuthResponse, ConstructorStanding, DriverStanding, EventDetail, EventSummary, FeedPage,
    LapTelemetryPoint, RegisterRequest, ResultRow, Series, SessionId,
};

use super::PitwallApi;

pub const DEFAULT_API_URL: &str = "http://localhost:8080";

const REGISTRATION_FAILED_MESSAGE: &str = "Registration failed. Please try again.";

/// Error body returned by the backend for rejected writes
#[derive(Deserialize, Default)]
struct ApiMessage {
    #[serde(default)]
    message: Option<String>,
}

/// The backend's message verbatim, the generic failure text when it sent none.
fn registration_message(body: ApiMessage) -> String {
    body.message
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| REGISTRATION_FAILED_MESSAGE.to_string())
}

/// Interpret a registration response. A body that cannot be read as JSON counts as
/// the server being unreachable, whatever the status.
fn registration_outcome(status: StatusCode, body: &str) -> Result<AuthResponse, PitwallError> {
    if status.is_success() {
        return serde_json::from_str(body).map_err(|e| {
            debug!("Unreadable registration response: {}", e);
            PitwallError::RegistrationUnavailable
        });
    }
    match serde_json::from_str::<ApiMessage>(body) {
        Ok(message) => Err(PitwallError::RegistrationRejected {
            message: registration_message(message),
        }),
        Err(e) => {
            debug!("Unreadable registration error ({}): {}", status, e);
            Err(PitwallError::RegistrationUnavailable)
        }
    }
}

/// `PitwallApi` over HTTP with reqwest.
#[derive(Clone, Debug)]
pub struct HttpApi {
    base_url: Url,
    client: Client,
}

impl HttpApi {
    pub fn new(base_url: &str) -> Result<Self, PitwallError> {
        Self::with_client(base_url, Client::new())
    }

    pub fn with_client(base_url: &str, client: Client) -> Result<Self, PitwallError> {
        let base_url = Url::parse(base_url).map_err(|e| PitwallError::InvalidUserInput {
            field: "api_base_url".to_string(),
            reason: format!("'{}' is not a valid URL: {}", base_url, e),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(PitwallError::InvalidUserInput {
                field: "api_base_url".to_string(),
                reason: format!("'{}' cannot be used as a base URL", base_url),
            });
        }
        Ok(Self { base_url, client })
    }

    /// Builds the request URL, each segment is percent-encoded on its own.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn fetch_api<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<T, PitwallError> {
        let path = format!("/{}", segments.join("/"));
        debug!("GET {} {:?}", path, query);

        let response = self
            .client
            .get(self.url(segments))
            .query(query)
            .send()
            .await
            .context(HttpTransportSnafu { path: path.clone() })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PitwallError::HttpStatus {
                status: status.as_u16(),
                path,
            });
        }

        response.json::<T>().await.context(HttpDecodeSnafu { path })
    }
}

/// Query pairs for the parameters that are present, absent ones are left out of the URL.
fn query_pairs<'a>(params: &[(&'a str, Option<String>)]) -> Vec<(&'a str, String)> {
    params
        .iter()
        .filter_map(|(key, value)| value.clone().map(|v| (*key, v)))
        .collect()
}

#[async_trait]
impl PitwallApi for HttpApi {
    async fn event(&self, slug: &str) -> Result<EventDetail, PitwallError> {
        self.fetch_api(&["api", "events", slug], &[]).await
    }

    async fn results(
        &self,
        slug: &str,
        session_id: SessionId,
        class_name: Option<&str>,
    ) -> Result<Vec<ResultRow>, PitwallError> {
        let query = query_pairs(&[
            ("sessionId", Some(session_id.to_string())),
            ("className", class_name.map(str::to_string)),
        ]);
        self.fetch_api(&["api", "events", slug, "results"], &query)
            .await
    }

    async fn result_classes(
        &self,
        slug: &str,
        session_id: SessionId,
    ) -> Result<Vec<String>, PitwallError> {
        self.fetch_api(
            &["api", "events", slug, "result-classes"],
            &[("sessionId", session_id.to_string())],
        )
        .await
    }

    async fn telemetry(
        &self,
        slug: &str,
        session_id: SessionId,
    ) -> Result<Vec<LapTelemetryPoint>, PitwallError> {
        self.fetch_api(
            &["api", "events", slug, "telemetry"],
            &[("sessionId", session_id.to_string())],
        )
        .await
    }

    async fn calendar(
        &self,
        series: Option<&str>,
        year: Option<i32>,
    ) -> Result<Vec<EventSummary>, PitwallError> {
        let query = query_pairs(&[
            ("series", series.map(str::to_string)),
            ("year", year.map(|y| y.to_string())),
        ]);
        self.fetch_api(&["api", "calendar"], &query).await
    }

    async fn seasons(&self, series: &str) -> Result<Vec<i32>, PitwallError> {
        self.fetch_api(
            &["api", "calendar", "seasons"],
            &[("series", series.to_string())],
        )
        .await
    }

    async fn series_list(&self) -> Result<Vec<Series>, PitwallError> {
        self.fetch_api(&["api", "series"], &[]).await
    }

    async fn series(&self, slug: &str) -> Result<Series, PitwallError> {
        self.fetch_api(&["api", "series", slug], &[]).await
    }

    async fn driver_standings(
        &self,
        series: &str,
        year: i32,
        class_name: Option<&str>,
    ) -> Result<Vec<DriverStanding>, PitwallError> {
        let query = query_pairs(&[
            ("year", Some(year.to_string())),
            ("className", class_name.map(str::to_string)),
        ]);
        self.fetch_api(&["api", "series", series, "standings"], &query)
            .await
    }

    async fn constructor_standings(
        &self,
        series: &str,
        year: i32,
        class_name: Option<&str>,
    ) -> Result<Vec<ConstructorStanding>, PitwallError> {
        let query = query_pairs(&[
            ("year", Some(year.to_string())),
            ("className", class_name.map(str::to_string)),
        ]);
        self.fetch_api(&["api", "series", series, "constructors"], &query)
            .await
    }

    async fn standing_classes(
        &self,
        series: &str,
        year: i32,
    ) -> Result<Vec<String>, PitwallError> {
        self.fetch_api(
            &["api", "series", series, "classes"],
            &[("year", year.to_string())],
        )
        .await
    }

    async fn feed(
        &self,
        page: u32,
        size: u32,
        series: Option<&str>,
    ) -> Result<FeedPage, PitwallError> {
        let query = query_pairs(&[
            ("page", Some(page.to_string())),
            ("size", Some(size.to_string())),
            ("series", series.map(str::to_string)),
        ]);
        self.fetch_api(&["api", "feed"], &query).await
    }

    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, PitwallError> {
        debug!("POST /api/auth/register for {}", request.email);
        let response = self
            .client
            .post(self.url(&["api", "auth", "register"]))
            .json(request)
            .send()
            .await
            .map_err(|e| {
                debug!("Registration request failed: {}", e);
                PitwallError::RegistrationUnavailable
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            debug!("Registration response was cut short: {}", e);
            PitwallError::RegistrationUnavailable
        })?;
        registration_outcome(status, &body)
    }
}
